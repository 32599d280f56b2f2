//! Production tracking models - tracker and per-stage update records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stage::{OverallStatus, ProductionStage, StageStatus, STAGE_COUNT};

/// Back-reference from a tracker to the deal it tracks.
/// Exactly one of order/sample holds by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealRef {
    Order(i64),
    Sample(i64),
}

impl DealRef {
    pub fn deal_id(&self) -> i64 {
        match self {
            DealRef::Order(id) | DealRef::Sample(id) => *id,
        }
    }
}

/// One production tracker per confirmed deal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionTracking {
    pub id: Uuid,
    pub deal_ref: DealRef,
    pub company_id: i64,
    pub current_stage: ProductionStage,
    pub overall_status: OverallStatus,
    /// 0-100, derived from the completed-stage count
    pub progress: u8,
    pub estimated_start: Option<DateTime<Utc>>,
    pub estimated_end: Option<DateTime<Utc>>,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
    pub sewing_workshop_id: Option<i64>,
    pub packaging_workshop_id: Option<i64>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductionTracking {
    pub fn new(deal_ref: DealRef, company_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            deal_ref,
            company_id,
            current_stage: ProductionStage::Planning,
            overall_status: OverallStatus::InProgress,
            progress: 0,
            estimated_start: None,
            estimated_end: None,
            actual_start: Some(now),
            actual_end: None,
            sewing_workshop_id: None,
            packaging_workshop_id: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Progress is a pure function of the completed-stage count
    pub fn progress_for(completed_stages: usize) -> u8 {
        ((completed_stages as f64 / STAGE_COUNT as f64) * 100.0).round() as u8
    }

    pub fn recompute_progress(&mut self, completed_stages: usize) {
        self.progress = Self::progress_for(completed_stages);
    }
}

/// Whether a stage update is the live record for its stage or audit history
/// left behind by a revert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StageRecordState {
    Active,
    Superseded { revision_id: Uuid },
}

impl StageRecordState {
    pub fn is_active(&self) -> bool {
        matches!(self, StageRecordState::Active)
    }
}

/// Progress record for one stage of one tracker.
///
/// At most one record per (tracker, stage) is active; reverts supersede
/// records instead of deleting them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionStageUpdate {
    pub id: Uuid,
    pub tracker_id: Uuid,
    pub stage: ProductionStage,
    pub status: StageStatus,
    pub actual_start_date: Option<DateTime<Utc>>,
    pub actual_end_date: Option<DateTime<Utc>>,
    pub estimated_days: Option<i32>,
    pub notes: Option<String>,
    pub photos: Vec<String>,
    pub is_revision: bool,
    pub extra_days: i32,
    pub record_state: StageRecordState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductionStageUpdate {
    pub fn new(tracker_id: Uuid, stage: ProductionStage) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tracker_id,
            stage,
            status: StageStatus::NotStarted,
            actual_start_date: None,
            actual_end_date: None,
            estimated_days: None,
            notes: None,
            photos: Vec::new(),
            is_revision: false,
            extra_days: 0,
            record_state: StageRecordState::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.record_state.is_active()
    }

    pub fn supersede(&mut self, revision_id: Uuid) {
        self.record_state = StageRecordState::Superseded { revision_id };
        self.updated_at = Utc::now();
    }
}
