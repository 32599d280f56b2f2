//! Domain models for deals, production tracking, quality and revisions

mod deal;
mod quality;
mod revision;
mod stage;
mod tracking;

pub use deal::{CreateDealRequest, Deal, DealKind, DealStatus, Party, Quote};
pub use quality::{classify, compute_score, DefectCounts, QualityControl, QualityResult};
pub use revision::{Revision, RevisionStatus};
pub use stage::{OverallStatus, ProductionStage, StageStatus, STAGE_COUNT};
pub use tracking::{DealRef, ProductionStageUpdate, ProductionTracking, StageRecordState};
