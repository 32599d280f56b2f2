//! Revision records - the audit trail for stage reverts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::stage::ProductionStage;
use super::tracking::DealRef;

/// Lifecycle of a revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionStatus {
    Pending,
    InProgress,
    Completed,
    Rejected,
}

impl RevisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevisionStatus::Pending => "pending",
            RevisionStatus::InProgress => "in_progress",
            RevisionStatus::Completed => "completed",
            RevisionStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RevisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RevisionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RevisionStatus::Pending),
            "in_progress" => Ok(RevisionStatus::InProgress),
            "completed" => Ok(RevisionStatus::Completed),
            "rejected" => Ok(RevisionStatus::Rejected),
            _ => Err(format!("Unknown revision status: {}", s)),
        }
    }
}

/// One revert of a tracker to an earlier stage. Append-only; every operator
/// action gets its own record even when the resulting state is unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    pub id: Uuid,
    pub tracker_id: Uuid,
    pub deal_ref: DealRef,
    /// Strictly increasing per tracker
    pub revision_number: u32,
    pub from_stage: ProductionStage,
    pub target_stage: ProductionStage,
    pub request_message: Option<String>,
    pub response_message: Option<String>,
    pub status: RevisionStatus,
    pub requested_by: i64,
    pub requested_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Revision {
    pub fn new(
        tracker_id: Uuid,
        deal_ref: DealRef,
        revision_number: u32,
        from_stage: ProductionStage,
        target_stage: ProductionStage,
        requested_by: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tracker_id,
            deal_ref,
            revision_number,
            from_stage,
            target_stage,
            request_message: None,
            response_message: None,
            status: RevisionStatus::InProgress,
            requested_by,
            requested_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Close the revision once its target stage re-completes
    pub fn complete(&mut self) {
        self.status = RevisionStatus::Completed;
        self.completed_at = Some(Utc::now());
    }
}
