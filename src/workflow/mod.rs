//! The workflow service - the narrow call surface over negotiation,
//! production tracking, quality gating and reverts.
//!
//! Every operation is a bounded read-modify-write against the entity store:
//! load, validate, mutate, commit one atomic batch with optimistic version
//! checks, then publish events fire-and-forget.

mod negotiation;
mod production;
mod quality;
mod revision;

use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{Authorizer, Capability};
use crate::config::WorkflowConfig;
use crate::domain::{Deal, DealStatus, Party, ProductionTracking};
use crate::error::{EntityState, WorkflowError};
use crate::events::EventBus;
use crate::state_machine::{Guard, NegotiationMachine, TransitionError};
use crate::store::EntityStore;

/// Orchestrates the deal and production lifecycles
pub struct WorkflowService {
    store: Arc<dyn EntityStore>,
    authorizer: Arc<dyn Authorizer>,
    events: EventBus,
    machine: NegotiationMachine,
    config: WorkflowConfig,
}

impl WorkflowService {
    pub fn new(
        store: Arc<dyn EntityStore>,
        authorizer: Arc<dyn Authorizer>,
        config: WorkflowConfig,
    ) -> Self {
        let events = EventBus::with_capacity(config.events.buffer_size);
        let machine = NegotiationMachine::new(config.negotiation.max_rounds);
        Self {
            store,
            authorizer,
            events,
            machine,
            config,
        }
    }

    /// The bus downstream consumers subscribe to
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Read-side access to the backing store
    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub(crate) fn machine(&self) -> &NegotiationMachine {
        &self.machine
    }

    pub(crate) fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub(crate) async fn load_deal(&self, deal_id: i64) -> Result<Deal, WorkflowError> {
        self.store
            .deal(deal_id)
            .await?
            .ok_or(WorkflowError::NotFound {
                kind: "deal",
                id: deal_id.to_string(),
            })
    }

    pub(crate) async fn load_tracker(
        &self,
        tracker_id: Uuid,
    ) -> Result<ProductionTracking, WorkflowError> {
        self.store
            .tracker(tracker_id)
            .await?
            .ok_or(WorkflowError::NotFound {
                kind: "tracker",
                id: tracker_id.to_string(),
            })
    }

    /// Capability check against the owning company, for production-side
    /// operations. Negotiation operations gate on party identity instead.
    pub(crate) async fn require_capability(
        &self,
        actor_id: i64,
        capability: Capability,
        company_id: i64,
    ) -> Result<(), WorkflowError> {
        if self
            .authorizer
            .authorize(actor_id, capability, company_id)
            .await
        {
            Ok(())
        } else {
            tracing::warn!(actor = actor_id, %capability, company = company_id, "authorization denied");
            Err(WorkflowError::Unauthorized {
                actor_id,
                action: capability.to_string(),
            })
        }
    }

    /// Load a deal and resolve which side the actor negotiates for
    pub(crate) async fn negotiation_context(
        &self,
        deal_id: i64,
        actor_id: i64,
        action: &str,
    ) -> Result<(Deal, Party), WorkflowError> {
        let deal = self.load_deal(deal_id).await?;
        if deal.status.is_terminal() {
            return Err(WorkflowError::TerminalState {
                current: EntityState::Deal(deal.status),
            });
        }
        let party = deal
            .party_of(actor_id)
            .ok_or_else(|| WorkflowError::Unauthorized {
                actor_id,
                action: action.to_string(),
            })?;
        Ok((deal, party))
    }

    /// Bump the deal version for a compare-and-swap write; returns the
    /// version the store must still hold.
    pub(crate) fn bump_deal(deal: &mut Deal) -> u64 {
        let expected = deal.version;
        deal.version += 1;
        deal.updated_at = chrono::Utc::now();
        expected
    }

    /// Same as [`Self::bump_deal`], for trackers
    pub(crate) fn bump_tracker(tracker: &mut ProductionTracking) -> u64 {
        let expected = tracker.version;
        tracker.version += 1;
        tracker.updated_at = chrono::Utc::now();
        expected
    }

    /// Translate a state machine refusal into the caller-facing taxonomy
    pub(crate) fn map_transition_error(
        err: TransitionError,
        current: DealStatus,
        actor_id: i64,
        action: &str,
    ) -> WorkflowError {
        match err {
            TransitionError::InvalidTransition { from, .. } => WorkflowError::InvalidTransition {
                current: EntityState::Deal(from),
                reason: format!("{} is not allowed from {}", action, from),
            },
            TransitionError::GuardFailed { guard } => match guard {
                Guard::ActorIsManufacturer | Guard::ActorIsBuyer => WorkflowError::Unauthorized {
                    actor_id,
                    action: action.to_string(),
                },
                Guard::ActorDidNotMakeLastOffer => WorkflowError::InvalidTransition {
                    current: EntityState::Deal(current),
                    reason: "the side holding the open offer must wait for the other side to respond".to_string(),
                },
                Guard::UnderRoundLimit => WorkflowError::InvalidTransition {
                    current: EntityState::Deal(current),
                    reason: "negotiation round limit reached".to_string(),
                },
            },
        }
    }
}
