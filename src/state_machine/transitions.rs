//! Transition definitions for the negotiation state machine

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::DealStatus;

/// Triggers that move a deal through negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Trigger {
    Review,
    SendQuote,
    CounterOffer,
    Accept,
    RejectByBuyer,
    RejectByManufacturer,
    Cancel,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Review => write!(f, "Review"),
            Trigger::SendQuote => write!(f, "SendQuote"),
            Trigger::CounterOffer => write!(f, "CounterOffer"),
            Trigger::Accept => write!(f, "Accept"),
            Trigger::RejectByBuyer => write!(f, "RejectByBuyer"),
            Trigger::RejectByManufacturer => write!(f, "RejectByManufacturer"),
            Trigger::Cancel => write!(f, "Cancel"),
        }
    }
}

/// Guard conditions that must hold for a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    ActorIsManufacturer,
    ActorIsBuyer,
    /// Only the side that did not make the last open offer may act on it
    ActorDidNotMakeLastOffer,
    /// Configured cap on counter-offer rounds, unlimited by default
    UnderRoundLimit,
}

/// Definition of a negotiation transition
#[derive(Debug, Clone)]
pub struct TransitionDef {
    pub from: DealStatus,
    pub to: DealStatus,
    pub trigger: Trigger,
    pub guards: Vec<Guard>,
}

impl TransitionDef {
    pub fn new(from: DealStatus, trigger: Trigger, to: DealStatus) -> Self {
        Self {
            from,
            to,
            trigger,
            guards: Vec::new(),
        }
    }

    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }
}

/// States a reject or cancel can originate from
const NON_TERMINAL: [DealStatus; 5] = [
    DealStatus::Pending,
    DealStatus::Reviewed,
    DealStatus::QuoteSent,
    DealStatus::CustomerQuoteSent,
    DealStatus::ManufacturerReviewingQuote,
];

/// Build the full negotiation transition table
pub fn build_transitions() -> Vec<TransitionDef> {
    use DealStatus::*;
    use Guard::*;
    use Trigger::*;

    let mut transitions = vec![
        TransitionDef::new(Pending, Review, Reviewed).with_guard(ActorIsManufacturer),
        TransitionDef::new(Reviewed, SendQuote, QuoteSent).with_guard(ActorIsManufacturer),
        // After reviewing a counter, the manufacturer re-quotes to continue
        TransitionDef::new(ManufacturerReviewingQuote, SendQuote, QuoteSent)
            .with_guard(ActorIsManufacturer),
        // Alternation is enforced purely through the open offer: whoever made
        // it must wait, so acting on your own offer is an invalid move rather
        // than a permissions problem
        TransitionDef::new(QuoteSent, CounterOffer, CustomerQuoteSent)
            .with_guard(ActorDidNotMakeLastOffer)
            .with_guard(UnderRoundLimit),
        TransitionDef::new(CustomerQuoteSent, CounterOffer, ManufacturerReviewingQuote)
            .with_guard(ActorDidNotMakeLastOffer)
            .with_guard(UnderRoundLimit),
        TransitionDef::new(QuoteSent, Accept, Confirmed).with_guard(ActorDidNotMakeLastOffer),
        TransitionDef::new(CustomerQuoteSent, Accept, Confirmed)
            .with_guard(ActorDidNotMakeLastOffer),
        TransitionDef::new(Pending, Cancel, Cancelled),
        TransitionDef::new(Reviewed, Cancel, Cancelled),
        TransitionDef::new(QuoteSent, Cancel, Cancelled),
    ];

    // Either side may reject from any non-terminal state
    for state in NON_TERMINAL {
        transitions.push(
            TransitionDef::new(state, RejectByBuyer, RejectedByCustomer).with_guard(ActorIsBuyer),
        );
        transitions.push(
            TransitionDef::new(state, RejectByManufacturer, RejectedByManufacturer)
                .with_guard(ActorIsManufacturer),
        );
    }

    transitions
}

/// Get valid triggers from a given status, ignoring guards
pub fn valid_triggers_for_status(status: DealStatus) -> Vec<Trigger> {
    build_transitions()
        .into_iter()
        .filter(|t| t.from == status)
        .map(|t| t.trigger)
        .collect()
}
