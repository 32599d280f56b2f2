//! Negotiation state machine implementation

use std::collections::HashMap;

use crate::domain::{Deal, DealStatus, Party};
use crate::state_machine::transitions::{build_transitions, Guard, TransitionDef, Trigger};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransitionError {
    #[error("invalid transition from {from} with trigger {trigger}")]
    InvalidTransition { from: DealStatus, trigger: Trigger },

    #[error("guard condition failed: {guard:?}")]
    GuardFailed { guard: Guard },
}

/// The negotiation state machine handles all deal status transitions
pub struct NegotiationMachine {
    transitions: HashMap<(DealStatus, Trigger), TransitionDef>,
    max_rounds: Option<u32>,
}

impl Default for NegotiationMachine {
    fn default() -> Self {
        Self::new(None)
    }
}

impl NegotiationMachine {
    /// Build the machine. `max_rounds` caps counter-offer rounds;
    /// `None` keeps re-negotiation unlimited.
    pub fn new(max_rounds: Option<u32>) -> Self {
        let mut transitions = HashMap::new();

        for def in build_transitions() {
            transitions.insert((def.from, def.trigger), def);
        }

        Self {
            transitions,
            max_rounds,
        }
    }

    /// Check if a transition is valid (without executing it)
    pub fn can_transition(
        &self,
        deal: &Deal,
        actor: Party,
        trigger: Trigger,
    ) -> Result<(), TransitionError> {
        let def = self.transitions.get(&(deal.status, trigger)).ok_or(
            TransitionError::InvalidTransition {
                from: deal.status,
                trigger,
            },
        )?;

        for guard in &def.guards {
            if !self.evaluate_guard(deal, actor, guard) {
                return Err(TransitionError::GuardFailed { guard: *guard });
            }
        }

        Ok(())
    }

    /// Get the target status for a transition (without executing it)
    pub fn get_target_status(&self, current: DealStatus, trigger: Trigger) -> Option<DealStatus> {
        self.transitions.get(&(current, trigger)).map(|def| def.to)
    }

    /// Execute a transition on a deal and return the new status
    pub fn transition(
        &self,
        deal: &mut Deal,
        actor: Party,
        trigger: Trigger,
    ) -> Result<DealStatus, TransitionError> {
        self.can_transition(deal, actor, trigger)?;

        let to = self.transitions[&(deal.status, trigger)].to;
        deal.previous_status = Some(deal.status);
        deal.status = to;
        deal.status_changed_at = Some(chrono::Utc::now());

        Ok(to)
    }

    /// Evaluate a guard condition for a deal and acting party
    fn evaluate_guard(&self, deal: &Deal, actor: Party, guard: &Guard) -> bool {
        match guard {
            Guard::ActorIsManufacturer => actor == Party::Manufacturer,
            Guard::ActorIsBuyer => actor == Party::Buyer,
            Guard::ActorDidNotMakeLastOffer => deal.last_offer_by != Some(actor),
            Guard::UnderRoundLimit => self
                .max_rounds
                .map(|max| deal.negotiation_rounds < max)
                .unwrap_or(true),
        }
    }

    /// All triggers the given party could fire from the deal's current status
    pub fn valid_triggers(&self, deal: &Deal, actor: Party) -> Vec<Trigger> {
        self.transitions
            .iter()
            .filter(|((from, _), def)| {
                *from == deal.status
                    && def
                        .guards
                        .iter()
                        .all(|g| self.evaluate_guard(deal, actor, g))
            })
            .map(|((_, trigger), _)| *trigger)
            .collect()
    }
}
