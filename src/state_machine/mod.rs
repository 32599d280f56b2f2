//! Negotiation state machine for the deal lifecycle

mod machine;
mod transitions;

pub use machine::{NegotiationMachine, TransitionError};
pub use transitions::{build_transitions, valid_triggers_for_status, Guard, TransitionDef, Trigger};
