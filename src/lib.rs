//! Loomline - textile order negotiation and production workflow core

pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod state_machine;
pub mod store;
pub mod workflow;

pub use error::WorkflowError;
pub use workflow::WorkflowService;
