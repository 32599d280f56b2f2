//! Quality control model and the score/classification functions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Defect counts per inspection category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectCounts {
    pub fabric: u32,
    pub sewing: u32,
    pub measurement: u32,
    pub finishing: u32,
}

impl DefectCounts {
    pub fn total(&self) -> u32 {
        self.fabric + self.sewing + self.measurement + self.finishing
    }
}

/// Outcome of a quality inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityResult {
    Pending,
    Passed,
    Failed,
    ConditionalPass,
}

impl QualityResult {
    /// Whether this result lets the QUALITY stage complete
    pub fn permits_advance(&self) -> bool {
        matches!(self, QualityResult::Passed | QualityResult::ConditionalPass)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityResult::Pending => "pending",
            QualityResult::Passed => "passed",
            QualityResult::Failed => "failed",
            QualityResult::ConditionalPass => "conditional_pass",
        }
    }
}

impl fmt::Display for QualityResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for QualityResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(QualityResult::Pending),
            "passed" => Ok(QualityResult::Passed),
            "failed" => Ok(QualityResult::Failed),
            "conditional_pass" => Ok(QualityResult::ConditionalPass),
            _ => Err(format!("Unknown quality result: {}", s)),
        }
    }
}

/// Score is linear in the total defect count, floored at zero:
/// `max(0, 100 - 5 * total_defects)`.
pub fn compute_score(defects: &DefectCounts) -> u8 {
    100u32.saturating_sub(defects.total().saturating_mul(5)).min(100) as u8
}

/// Map a computed score to a terminal classification.
/// PENDING is only the pre-submission default, never produced here.
pub fn classify(score: u8) -> QualityResult {
    if score >= 90 {
        QualityResult::Passed
    } else if score >= 70 {
        QualityResult::ConditionalPass
    } else {
        QualityResult::Failed
    }
}

/// A persisted quality inspection for a tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityControl {
    pub id: Uuid,
    pub tracker_id: Uuid,
    pub result: QualityResult,
    /// Always the computed score, even when `result` was overridden
    pub score: u8,
    pub defects: DefectCounts,
    pub notes: Option<String>,
    pub manual_override: bool,
    /// Set when a revert invalidates this record for gate checks
    pub superseded_by_revision: Option<Uuid>,
    pub submitted_by: i64,
    pub submitted_at: DateTime<Utc>,
}

impl QualityControl {
    /// Build a record from a submission. An explicit override wins over the
    /// classification, but the computed score is kept for audit.
    pub fn from_submission(
        tracker_id: Uuid,
        submitted_by: i64,
        defects: DefectCounts,
        notes: Option<String>,
        override_result: Option<QualityResult>,
    ) -> Self {
        let score = compute_score(&defects);
        let result = override_result.unwrap_or_else(|| classify(score));
        Self {
            id: Uuid::new_v4(),
            tracker_id,
            result,
            score,
            defects,
            notes,
            manual_override: override_result.is_some(),
            superseded_by_revision: None,
            submitted_by,
            submitted_at: Utc::now(),
        }
    }

    /// Whether this record still counts for the quality gate
    pub fn is_active(&self) -> bool {
        self.superseded_by_revision.is_none()
    }
}
