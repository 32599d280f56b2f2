//! Production stage definitions for the seven-step pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of stages in the fixed production pipeline
pub const STAGE_COUNT: usize = 7;

/// The 7 fixed production stages, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionStage {
    Planning,
    Fabric,
    Cutting,
    Sewing,
    Quality,
    Packaging,
    Shipping,
}

impl ProductionStage {
    /// All stages in pipeline order
    pub const ALL: [ProductionStage; STAGE_COUNT] = [
        ProductionStage::Planning,
        ProductionStage::Fabric,
        ProductionStage::Cutting,
        ProductionStage::Sewing,
        ProductionStage::Quality,
        ProductionStage::Packaging,
        ProductionStage::Shipping,
    ];

    /// Zero-based position in the pipeline
    pub fn index(&self) -> usize {
        match self {
            ProductionStage::Planning => 0,
            ProductionStage::Fabric => 1,
            ProductionStage::Cutting => 2,
            ProductionStage::Sewing => 3,
            ProductionStage::Quality => 4,
            ProductionStage::Packaging => 5,
            ProductionStage::Shipping => 6,
        }
    }

    /// Stage at a given pipeline position
    pub fn from_index(index: usize) -> Option<ProductionStage> {
        Self::ALL.get(index).copied()
    }

    /// The stage that follows this one, or None for Shipping
    pub fn next(&self) -> Option<ProductionStage> {
        Self::from_index(self.index() + 1)
    }

    /// Returns the database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductionStage::Planning => "planning",
            ProductionStage::Fabric => "fabric",
            ProductionStage::Cutting => "cutting",
            ProductionStage::Sewing => "sewing",
            ProductionStage::Quality => "quality",
            ProductionStage::Packaging => "packaging",
            ProductionStage::Shipping => "shipping",
        }
    }
}

impl fmt::Display for ProductionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProductionStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planning" => Ok(ProductionStage::Planning),
            "fabric" => Ok(ProductionStage::Fabric),
            "cutting" => Ok(ProductionStage::Cutting),
            "sewing" => Ok(ProductionStage::Sewing),
            "quality" => Ok(ProductionStage::Quality),
            "packaging" => Ok(ProductionStage::Packaging),
            "shipping" => Ok(ProductionStage::Shipping),
            _ => Err(format!("Unknown production stage: {}", s)),
        }
    }
}

/// Status of a single stage within a tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    NotStarted,
    InProgress,
    OnHold,
    Completed,
    RequiresRevision,
}

impl StageStatus {
    /// Whether a stage may move from this status to `next`.
    ///
    /// The per-stage machine is NOT_STARTED -> IN_PROGRESS -> COMPLETED, with a
    /// revision loop IN_PROGRESS -> REQUIRES_REVISION -> IN_PROGRESS and a hold
    /// branch IN_PROGRESS <-> ON_HOLD. COMPLETED only re-opens via a revert.
    pub fn can_become(&self, next: StageStatus) -> bool {
        matches!(
            (self, next),
            (StageStatus::NotStarted, StageStatus::InProgress)
                | (StageStatus::InProgress, StageStatus::Completed)
                | (StageStatus::InProgress, StageStatus::RequiresRevision)
                | (StageStatus::InProgress, StageStatus::OnHold)
                | (StageStatus::OnHold, StageStatus::InProgress)
                | (StageStatus::RequiresRevision, StageStatus::InProgress)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::NotStarted => "not_started",
            StageStatus::InProgress => "in_progress",
            StageStatus::OnHold => "on_hold",
            StageStatus::Completed => "completed",
            StageStatus::RequiresRevision => "requires_revision",
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(StageStatus::NotStarted),
            "in_progress" => Ok(StageStatus::InProgress),
            "on_hold" => Ok(StageStatus::OnHold),
            "completed" => Ok(StageStatus::Completed),
            "requires_revision" => Ok(StageStatus::RequiresRevision),
            _ => Err(format!("Unknown stage status: {}", s)),
        }
    }
}

/// Overall status of a production tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    InProgress,
    Waiting,
    Blocked,
    Completed,
    Cancelled,
}

impl OverallStatus {
    /// Terminal trackers accept no further mutation
    pub fn is_terminal(&self) -> bool {
        matches!(self, OverallStatus::Completed | OverallStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::InProgress => "in_progress",
            OverallStatus::Waiting => "waiting",
            OverallStatus::Blocked => "blocked",
            OverallStatus::Completed => "completed",
            OverallStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OverallStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(OverallStatus::InProgress),
            "waiting" => Ok(OverallStatus::Waiting),
            "blocked" => Ok(OverallStatus::Blocked),
            "completed" => Ok(OverallStatus::Completed),
            "cancelled" => Ok(OverallStatus::Cancelled),
            _ => Err(format!("Unknown overall status: {}", s)),
        }
    }
}
