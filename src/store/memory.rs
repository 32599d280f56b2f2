//! In-memory entity store - the reference [`EntityStore`] implementation

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    Deal, DealRef, ProductionStageUpdate, ProductionTracking, QualityControl, Revision,
};

use super::{EntityStore, StoreError, Transaction, Write};

#[derive(Default)]
struct Tables {
    deals: HashMap<i64, Deal>,
    trackers: HashMap<Uuid, ProductionTracking>,
    stage_updates: HashMap<Uuid, ProductionStageUpdate>,
    quality_controls: HashMap<Uuid, QualityControl>,
    revisions: HashMap<Uuid, Revision>,
}

/// All tables behind one lock: a committed batch is observed in full or not
/// at all.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_version(
    entity: &str,
    current: Option<u64>,
    expected: Option<u64>,
) -> Result<(), StoreError> {
    match (current, expected) {
        (None, None) => Ok(()),
        (Some(_), None) => Err(StoreError::Duplicate {
            entity: entity.to_string(),
        }),
        (Some(stored), Some(want)) if stored == want => Ok(()),
        (_, Some(_)) => Err(StoreError::VersionConflict {
            entity: entity.to_string(),
        }),
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn deal(&self, id: i64) -> Result<Option<Deal>, StoreError> {
        Ok(self.tables.read().await.deals.get(&id).cloned())
    }

    async fn tracker(&self, id: Uuid) -> Result<Option<ProductionTracking>, StoreError> {
        Ok(self.tables.read().await.trackers.get(&id).cloned())
    }

    async fn tracker_for_deal(
        &self,
        deal_ref: DealRef,
    ) -> Result<Option<ProductionTracking>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .trackers
            .values()
            .find(|t| t.deal_ref == deal_ref)
            .cloned())
    }

    async fn stage_updates(
        &self,
        tracker_id: Uuid,
    ) -> Result<Vec<ProductionStageUpdate>, StoreError> {
        let tables = self.tables.read().await;
        let mut updates: Vec<ProductionStageUpdate> = tables
            .stage_updates
            .values()
            .filter(|u| u.tracker_id == tracker_id)
            .cloned()
            .collect();
        updates.sort_by_key(|u| (u.stage.index(), u.created_at));
        Ok(updates)
    }

    async fn quality_controls(&self, tracker_id: Uuid) -> Result<Vec<QualityControl>, StoreError> {
        let tables = self.tables.read().await;
        let mut controls: Vec<QualityControl> = tables
            .quality_controls
            .values()
            .filter(|qc| qc.tracker_id == tracker_id)
            .cloned()
            .collect();
        controls.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(controls)
    }

    async fn revisions(&self, tracker_id: Uuid) -> Result<Vec<Revision>, StoreError> {
        let tables = self.tables.read().await;
        let mut revisions: Vec<Revision> = tables
            .revisions
            .values()
            .filter(|r| r.tracker_id == tracker_id)
            .cloned()
            .collect();
        revisions.sort_by_key(|r| r.revision_number);
        Ok(revisions)
    }

    async fn commit(&self, txn: Transaction) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;

        // Validate every precondition before touching anything
        for write in &txn.writes {
            match write {
                Write::Deal {
                    deal,
                    expected_version,
                } => {
                    let current = tables.deals.get(&deal.id).map(|d| d.version);
                    check_version(&format!("deal {}", deal.id), current, *expected_version)?;
                }
                Write::Tracker {
                    tracker,
                    expected_version,
                } => {
                    let current = tables.trackers.get(&tracker.id).map(|t| t.version);
                    check_version(
                        &format!("tracker {}", tracker.id),
                        current,
                        *expected_version,
                    )?;
                }
                Write::StageUpdate(_) | Write::QualityControl(_) | Write::Revision(_) => {}
            }
        }

        for write in txn.writes {
            match write {
                Write::Deal { deal, .. } => {
                    tables.deals.insert(deal.id, deal);
                }
                Write::Tracker { tracker, .. } => {
                    tables.trackers.insert(tracker.id, tracker);
                }
                Write::StageUpdate(update) => {
                    tables.stage_updates.insert(update.id, update);
                }
                Write::QualityControl(qc) => {
                    tables.quality_controls.insert(qc.id, qc);
                }
                Write::Revision(revision) => {
                    tables.revisions.insert(revision.id, revision);
                }
            }
        }

        Ok(())
    }
}
