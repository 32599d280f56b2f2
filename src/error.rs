//! Workflow error taxonomy.
//!
//! Every error carries enough state for the caller to resynchronize without a
//! full reload. `ConcurrentModification` is the only retryable kind; the core
//! never auto-retries.

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::domain::{DealStatus, OverallStatus, ProductionStage};

/// The current state attached to transition errors, typed so the caller can
/// resync whichever entity it was acting on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Deal(DealStatus),
    Stage(ProductionStage),
    Tracker(OverallStatus),
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityState::Deal(status) => write!(f, "deal:{}", status),
            EntityState::Stage(stage) => write!(f, "stage:{}", stage),
            EntityState::Tracker(status) => write!(f, "tracker:{}", status),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("actor {actor_id} is not allowed to {action}")]
    Unauthorized { actor_id: i64, action: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid transition: {reason} (current: {current})")]
    InvalidTransition { current: EntityState, reason: String },

    #[error("quality gate blocked on tracker {tracker_id}: submit a passing quality control before completing the quality stage")]
    QualityGateBlocked { tracker_id: Uuid },

    #[error("entity is terminal ({current}); no further mutation is allowed")]
    TerminalState { current: EntityState },

    #[error("invalid revert target {target}; valid targets: {valid_targets:?}")]
    InvalidTarget {
        target: ProductionStage,
        valid_targets: Vec<ProductionStage>,
    },

    #[error("concurrent modification of {entity}; re-read and resubmit")]
    ConcurrentModification { entity: String },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("storage failure: {0}")]
    Storage(String),
}

impl WorkflowError {
    /// Only version conflicts are worth a caller-side re-read and retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkflowError::ConcurrentModification { .. })
    }
}

impl From<crate::store::StoreError> for WorkflowError {
    fn from(err: crate::store::StoreError) -> Self {
        match err {
            crate::store::StoreError::VersionConflict { entity } => {
                WorkflowError::ConcurrentModification { entity }
            }
            // A duplicate insert is a caller mistake, not a store outage
            crate::store::StoreError::Duplicate { entity } => {
                WorkflowError::InvalidInput(format!("duplicate {}", entity))
            }
            crate::store::StoreError::Unavailable(msg) => WorkflowError::Storage(msg),
        }
    }
}
