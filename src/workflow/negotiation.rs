//! Negotiation operations: quote exchange until a deal confirms or dies

use chrono::Utc;

use crate::domain::{
    CreateDealRequest, Deal, DealKind, DealRef, Party, ProductionTracking, Quote,
};
use crate::error::WorkflowError;
use crate::events::Event;
use crate::state_machine::Trigger;
use crate::store::Transaction;

use super::WorkflowService;

impl WorkflowService {
    /// Create a deal in its initial Pending state
    pub async fn create_deal(&self, mut request: CreateDealRequest) -> Result<Deal, WorkflowError> {
        if request.quantity <= 0 {
            return Err(WorkflowError::InvalidInput(
                "quantity must be positive".to_string(),
            ));
        }
        if request.reference.trim().is_empty() {
            return Err(WorkflowError::InvalidInput(
                "reference must not be blank".to_string(),
            ));
        }
        if request.currency.trim().is_empty() {
            request.currency = self.config().negotiation.default_currency.clone();
        }

        let deal = Deal::new(request);
        self.store()
            .commit(Transaction::new().deal(deal.clone(), None))
            .await?;

        tracing::info!(deal = deal.id, reference = %deal.reference, "deal created");
        self.events().publish(Event::DealCreated {
            deal_id: deal.id,
            timestamp: Utc::now(),
        });
        Ok(deal)
    }

    /// Manufacturer acknowledges a new request: Pending -> Reviewed
    pub async fn review(&self, deal_id: i64, actor_id: i64) -> Result<Deal, WorkflowError> {
        let (mut deal, party) = self.negotiation_context(deal_id, actor_id, "review").await?;
        let current = deal.status;

        self.machine()
            .transition(&mut deal, party, Trigger::Review)
            .map_err(|e| Self::map_transition_error(e, current, actor_id, "review"))?;

        let expected = Self::bump_deal(&mut deal);
        self.store()
            .commit(Transaction::new().deal(deal.clone(), Some(expected)))
            .await?;

        tracing::info!(deal = deal.id, "deal reviewed");
        self.events().publish(Event::DealReviewed {
            deal_id: deal.id,
            actor_id,
            timestamp: Utc::now(),
        });
        Ok(deal)
    }

    /// Manufacturer proposes price and lead time: Reviewed -> QuoteSent
    /// (also re-quotes from ManufacturerReviewingQuote)
    pub async fn send_quote(
        &self,
        deal_id: i64,
        actor_id: i64,
        unit_price: f64,
        days: i32,
        note: Option<String>,
    ) -> Result<Deal, WorkflowError> {
        validate_offer(unit_price, days)?;
        let (mut deal, party) = self
            .negotiation_context(deal_id, actor_id, "send_quote")
            .await?;
        let current = deal.status;

        self.machine()
            .transition(&mut deal, party, Trigger::SendQuote)
            .map_err(|e| Self::map_transition_error(e, current, actor_id, "send_quote"))?;

        deal.record_offer(party, Quote::new(unit_price, days, note));

        let expected = Self::bump_deal(&mut deal);
        self.store()
            .commit(Transaction::new().deal(deal.clone(), Some(expected)))
            .await?;

        tracing::info!(deal = deal.id, unit_price, days, "quote sent");
        self.events().publish(Event::QuoteSent {
            deal_id: deal.id,
            by: party,
            unit_price,
            days,
            timestamp: Utc::now(),
        });
        Ok(deal)
    }

    /// The side that does not hold the open offer counters it. Rounds are
    /// unlimited unless a cap is configured; each round replaces that side's
    /// previous proposal.
    pub async fn counter_offer(
        &self,
        deal_id: i64,
        actor_id: i64,
        unit_price: f64,
        days: i32,
        note: Option<String>,
    ) -> Result<Deal, WorkflowError> {
        validate_offer(unit_price, days)?;
        let (mut deal, party) = self
            .negotiation_context(deal_id, actor_id, "counter_offer")
            .await?;
        let current = deal.status;

        self.machine()
            .transition(&mut deal, party, Trigger::CounterOffer)
            .map_err(|e| Self::map_transition_error(e, current, actor_id, "counter_offer"))?;

        deal.record_offer(party, Quote::new(unit_price, days, note));
        deal.negotiation_rounds += 1;

        let expected = Self::bump_deal(&mut deal);
        self.store()
            .commit(Transaction::new().deal(deal.clone(), Some(expected)))
            .await?;

        tracing::info!(
            deal = deal.id,
            by = %party,
            round = deal.negotiation_rounds,
            "counter offer recorded"
        );
        self.events().publish(Event::CounterOfferSent {
            deal_id: deal.id,
            by: party,
            unit_price,
            days,
            round: deal.negotiation_rounds,
            timestamp: Utc::now(),
        });
        Ok(deal)
    }

    /// Accept the open offer and enter production. The deal status flip and
    /// the tracker creation commit together or not at all.
    pub async fn accept_quote(
        &self,
        deal_id: i64,
        actor_id: i64,
        note: Option<String>,
    ) -> Result<Deal, WorkflowError> {
        let (mut deal, party) = self
            .negotiation_context(deal_id, actor_id, "accept_quote")
            .await?;
        let current = deal.status;

        let offer = deal
            .open_offer()
            .cloned()
            .ok_or_else(|| WorkflowError::InvalidTransition {
                current: crate::error::EntityState::Deal(current),
                reason: "no open offer to accept".to_string(),
            })?;

        self.machine()
            .transition(&mut deal, party, Trigger::Accept)
            .map_err(|e| Self::map_transition_error(e, current, actor_id, "accept_quote"))?;

        deal.apply_terms(&offer);
        if note.is_some() {
            deal.note = note;
        }

        let deal_ref = match deal.kind {
            DealKind::Order => DealRef::Order(deal.id),
            DealKind::Sample => DealRef::Sample(deal.id),
        };
        let tracker = ProductionTracking::new(deal_ref, deal.company_id);

        let expected = Self::bump_deal(&mut deal);
        self.store()
            .commit(
                Transaction::new()
                    .deal(deal.clone(), Some(expected))
                    .tracker(tracker.clone(), None),
            )
            .await?;

        tracing::info!(deal = deal.id, tracker = %tracker.id, "deal confirmed, production tracker created");
        self.events().publish(Event::DealConfirmed {
            deal_id: deal.id,
            tracker_id: tracker.id,
            timestamp: Utc::now(),
        });
        Ok(deal)
    }

    /// Reject the deal from any non-terminal state. The reason is mandatory.
    pub async fn reject_quote(
        &self,
        deal_id: i64,
        actor_id: i64,
        reason: &str,
    ) -> Result<Deal, WorkflowError> {
        if reason.trim().is_empty() {
            return Err(WorkflowError::InvalidInput(
                "a rejection reason is required".to_string(),
            ));
        }
        let (mut deal, party) = self
            .negotiation_context(deal_id, actor_id, "reject_quote")
            .await?;
        let current = deal.status;

        let trigger = match party {
            Party::Buyer => Trigger::RejectByBuyer,
            Party::Manufacturer => Trigger::RejectByManufacturer,
        };
        self.machine()
            .transition(&mut deal, party, trigger)
            .map_err(|e| Self::map_transition_error(e, current, actor_id, "reject_quote"))?;

        deal.rejection_reason = Some(reason.trim().to_string());

        let expected = Self::bump_deal(&mut deal);
        self.store()
            .commit(Transaction::new().deal(deal.clone(), Some(expected)))
            .await?;

        tracing::info!(deal = deal.id, by = %party, "deal rejected");
        self.events().publish(Event::DealRejected {
            deal_id: deal.id,
            by: party,
            reason: reason.trim().to_string(),
            timestamp: Utc::now(),
        });
        Ok(deal)
    }

    /// Cancel an early-stage deal (before any counter-offer round)
    pub async fn cancel_deal(&self, deal_id: i64, actor_id: i64) -> Result<Deal, WorkflowError> {
        let (mut deal, party) = self
            .negotiation_context(deal_id, actor_id, "cancel_deal")
            .await?;
        let current = deal.status;

        self.machine()
            .transition(&mut deal, party, Trigger::Cancel)
            .map_err(|e| Self::map_transition_error(e, current, actor_id, "cancel_deal"))?;

        let expected = Self::bump_deal(&mut deal);
        self.store()
            .commit(Transaction::new().deal(deal.clone(), Some(expected)))
            .await?;

        tracing::info!(deal = deal.id, "deal cancelled");
        self.events().publish(Event::DealCancelled {
            deal_id: deal.id,
            timestamp: Utc::now(),
        });
        Ok(deal)
    }
}

fn validate_offer(unit_price: f64, days: i32) -> Result<(), WorkflowError> {
    if unit_price.is_nan() || unit_price <= 0.0 {
        return Err(WorkflowError::InvalidInput(
            "unit price must be positive".to_string(),
        ));
    }
    if days <= 0 {
        return Err(WorkflowError::InvalidInput(
            "production days must be positive".to_string(),
        ));
    }
    Ok(())
}
