//! Reverting a tracker to an earlier stage.
//!
//! Reverts never delete history: every stage record at or past the target is
//! superseded, quality controls that gated the undone work are invalidated,
//! and a numbered revision records who went back and from where.

use chrono::Utc;
use uuid::Uuid;

use crate::auth::Capability;
use crate::domain::{
    OverallStatus, ProductionStage, ProductionStageUpdate, ProductionTracking, Revision,
    StageStatus,
};
use crate::error::WorkflowError;
use crate::events::Event;
use crate::store::Transaction;

use super::WorkflowService;

impl WorkflowService {
    /// Send the tracker back to an earlier, previously completed stage.
    ///
    /// Repeating a revert to the stage the tracker already sits on (as a
    /// revision) changes no production state but still appends a revision,
    /// so every operator action stays on the audit trail.
    pub async fn revert_to_stage(
        &self,
        tracker_id: Uuid,
        actor_id: i64,
        target: ProductionStage,
    ) -> Result<ProductionTracking, WorkflowError> {
        let mut tracker = self
            .guarded_tracker(tracker_id, actor_id, Capability::RevertStage)
            .await?;
        let current = tracker.current_stage;

        let updates = self.store().stage_updates(tracker_id).await?;
        let completed = |stage: ProductionStage| {
            updates
                .iter()
                .any(|u| u.stage == stage && u.status == StageStatus::Completed)
        };
        let valid_targets: Vec<ProductionStage> = ProductionStage::ALL
            .iter()
            .copied()
            .filter(|s| s.index() < current.index() && completed(*s))
            .collect();

        let revisions = self.store().revisions(tracker_id).await?;
        let revision_number = revisions
            .last()
            .map(|r| r.revision_number + 1)
            .unwrap_or(1);

        // A repeat revert to the stage already being redone is a no-op on
        // production state; only the audit trail grows.
        if target == current {
            let already_reverted = updates
                .iter()
                .any(|u| u.stage == target && u.is_active() && u.is_revision)
                && completed(target);
            if !already_reverted {
                return Err(WorkflowError::InvalidTarget {
                    target,
                    valid_targets,
                });
            }

            let revision = Revision::new(
                tracker_id,
                tracker.deal_ref,
                revision_number,
                current,
                target,
                actor_id,
            );
            let expected = Self::bump_tracker(&mut tracker);
            self.store()
                .commit(
                    Transaction::new()
                        .revision(revision)
                        .tracker(tracker.clone(), Some(expected)),
                )
                .await?;

            tracing::info!(
                tracker = %tracker_id,
                stage = %target,
                revision = revision_number,
                "repeat revert recorded, state unchanged"
            );
            self.events().publish(Event::StageReverted {
                tracker_id,
                from_stage: current,
                target_stage: target,
                revision_number,
                timestamp: Utc::now(),
            });
            return Ok(tracker);
        }

        if target.index() > current.index() || !completed(target) {
            return Err(WorkflowError::InvalidTarget {
                target,
                valid_targets,
            });
        }

        let revision = Revision::new(
            tracker_id,
            tracker.deal_ref,
            revision_number,
            current,
            target,
            actor_id,
        );
        let now = Utc::now();

        let mut txn = Transaction::new().revision(revision.clone());

        // Everything at or past the target becomes history
        for update in updates.iter().filter(|u| u.is_active()) {
            if update.stage.index() >= target.index() {
                let mut superseded = update.clone();
                superseded.supersede(revision.id);
                txn = txn.stage_update(superseded);
            }
        }

        // The target restarts as a revision pass
        let mut fresh = ProductionStageUpdate::new(tracker_id, target);
        fresh.status = StageStatus::InProgress;
        fresh.is_revision = true;
        fresh.actual_start_date = Some(now);
        txn = txn.stage_update(fresh);

        // Undoing work at or before QUALITY invalidates its inspections
        if target.index() <= ProductionStage::Quality.index() {
            for qc in self.store().quality_controls(tracker_id).await? {
                if qc.is_active() {
                    let mut invalidated = qc;
                    invalidated.superseded_by_revision = Some(revision.id);
                    txn = txn.quality_control(invalidated);
                }
            }
        }

        tracker.current_stage = target;
        tracker.overall_status = OverallStatus::InProgress;
        tracker.actual_end = None;
        let still_completed = updates
            .iter()
            .filter(|u| {
                u.is_active()
                    && u.status == StageStatus::Completed
                    && u.stage.index() < target.index()
            })
            .count();
        tracker.recompute_progress(still_completed);

        let expected = Self::bump_tracker(&mut tracker);
        txn = txn.tracker(tracker.clone(), Some(expected));
        self.store().commit(txn).await?;

        tracing::info!(
            tracker = %tracker_id,
            from = %current,
            target = %target,
            revision = revision_number,
            progress = tracker.progress,
            "tracker reverted"
        );
        self.events().publish(Event::StageReverted {
            tracker_id,
            from_stage: current,
            target_stage: target,
            revision_number,
            timestamp: now,
        });
        Ok(tracker)
    }
}
