//! Entity store seam - transactional key-value-by-id storage with optimistic
//! concurrency. Persistence itself is an external collaborator; the crate
//! ships [`MemoryStore`] as the reference implementation.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    Deal, DealRef, ProductionStageUpdate, ProductionTracking, QualityControl, Revision,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("version conflict on {entity}")]
    VersionConflict { entity: String },

    #[error("duplicate {entity}")]
    Duplicate { entity: String },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// One write inside a transaction. Deal and tracker writes carry an optimistic
/// version precondition; child records are append-or-replace by id.
#[derive(Debug, Clone)]
pub enum Write {
    Deal {
        deal: Deal,
        /// `None` inserts (id must be free); `Some(v)` replaces iff the stored
        /// version equals `v`.
        expected_version: Option<u64>,
    },
    Tracker {
        tracker: ProductionTracking,
        expected_version: Option<u64>,
    },
    StageUpdate(ProductionStageUpdate),
    QualityControl(QualityControl),
    Revision(Revision),
}

/// A batch of writes that commits atomically: every precondition is checked
/// before any write is applied.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    pub writes: Vec<Write>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deal(mut self, deal: Deal, expected_version: Option<u64>) -> Self {
        self.writes.push(Write::Deal {
            deal,
            expected_version,
        });
        self
    }

    pub fn tracker(mut self, tracker: ProductionTracking, expected_version: Option<u64>) -> Self {
        self.writes.push(Write::Tracker {
            tracker,
            expected_version,
        });
        self
    }

    pub fn stage_update(mut self, update: ProductionStageUpdate) -> Self {
        self.writes.push(Write::StageUpdate(update));
        self
    }

    pub fn quality_control(mut self, qc: QualityControl) -> Self {
        self.writes.push(Write::QualityControl(qc));
        self
    }

    pub fn revision(mut self, revision: Revision) -> Self {
        self.writes.push(Write::Revision(revision));
        self
    }
}

/// The storage seam the workflow core writes through
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn deal(&self, id: i64) -> Result<Option<Deal>, StoreError>;

    async fn tracker(&self, id: Uuid) -> Result<Option<ProductionTracking>, StoreError>;

    async fn tracker_for_deal(
        &self,
        deal_ref: DealRef,
    ) -> Result<Option<ProductionTracking>, StoreError>;

    /// All stage update records for a tracker, active and superseded,
    /// ordered by stage then creation time
    async fn stage_updates(
        &self,
        tracker_id: Uuid,
    ) -> Result<Vec<ProductionStageUpdate>, StoreError>;

    /// All quality control records for a tracker, newest first
    async fn quality_controls(&self, tracker_id: Uuid) -> Result<Vec<QualityControl>, StoreError>;

    /// All revisions for a tracker, ordered by revision number
    async fn revisions(&self, tracker_id: Uuid) -> Result<Vec<Revision>, StoreError>;

    /// Commit a batch atomically or fail without applying anything
    async fn commit(&self, txn: Transaction) -> Result<(), StoreError>;
}
