//! Production stage operations: advancing, holding and resuming stages

use chrono::Utc;
use uuid::Uuid;

use crate::auth::Capability;
use crate::domain::{
    OverallStatus, ProductionStage, ProductionStageUpdate, ProductionTracking, QualityResult,
    RevisionStatus, StageStatus,
};
use crate::error::{EntityState, WorkflowError};
use crate::events::Event;
use crate::store::Transaction;

use super::WorkflowService;

impl WorkflowService {
    /// Write a stage update for the current stage or start the next one.
    ///
    /// Completing the current stage advances the pointer; completing SHIPPING
    /// completes the tracker. Completing QUALITY consults the quality gate: a
    /// missing or pending control blocks, a failed one forces the stage into
    /// REQUIRES_REVISION instead.
    pub async fn advance_stage(
        &self,
        tracker_id: Uuid,
        actor_id: i64,
        target: ProductionStage,
        status: StageStatus,
        estimated_days: Option<i32>,
        notes: Option<String>,
    ) -> Result<ProductionTracking, WorkflowError> {
        let mut tracker = self
            .guarded_tracker(tracker_id, actor_id, Capability::UpdateStage)
            .await?;

        if matches!(status, StageStatus::NotStarted | StageStatus::OnHold) {
            return Err(WorkflowError::InvalidInput(format!(
                "cannot set a stage to {} through advance_stage",
                status
            )));
        }
        if matches!(estimated_days, Some(days) if days <= 0) {
            return Err(WorkflowError::InvalidInput(
                "estimated days must be positive".to_string(),
            ));
        }

        let current = tracker.current_stage;
        let updates = self.store().stage_updates(tracker_id).await?;
        let active_for = |stage: ProductionStage| {
            updates.iter().find(|u| u.stage == stage && u.is_active())
        };

        let t = target.index();
        let c = current.index();
        if t < c || t > c + 1 {
            return Err(WorkflowError::InvalidTransition {
                current: EntityState::Stage(current),
                reason: format!("stage {} is out of reach from {}", target, current),
            });
        }
        if t == c + 1 {
            let current_done = active_for(current)
                .map(|u| u.status == StageStatus::Completed)
                .unwrap_or(false);
            if !current_done {
                return Err(WorkflowError::InvalidTransition {
                    current: EntityState::Stage(current),
                    reason: format!(
                        "stage {} must complete before {} can start",
                        current, target
                    ),
                });
            }
            tracker.current_stage = target;
        }

        // The quality gate decides whether QUALITY may actually complete
        let mut effective_status = status;
        if target == ProductionStage::Quality && status == StageStatus::Completed {
            let controls = self.store().quality_controls(tracker_id).await?;
            match controls.iter().find(|qc| qc.is_active()) {
                None => return Err(WorkflowError::QualityGateBlocked { tracker_id }),
                Some(qc) if qc.result == QualityResult::Failed => {
                    tracing::warn!(tracker = %tracker_id, score = qc.score, "failed quality control forces revision");
                    effective_status = StageStatus::RequiresRevision;
                }
                Some(qc) if !qc.result.permits_advance() => {
                    return Err(WorkflowError::QualityGateBlocked { tracker_id })
                }
                Some(_) => {}
            }
        }

        let from = active_for(target)
            .map(|u| u.status)
            .unwrap_or(StageStatus::NotStarted);
        // A running stage may take plain progress updates without a transition
        let progress_update =
            from == StageStatus::InProgress && effective_status == StageStatus::InProgress;
        if !progress_update && !from.can_become(effective_status) {
            return Err(WorkflowError::InvalidTransition {
                current: EntityState::Stage(current),
                reason: format!(
                    "stage {} cannot move from {} to {}",
                    target, from, effective_status
                ),
            });
        }

        // Any applied stage write puts the tracker back to work, including a
        // held stage resumed here rather than through resume_stage
        tracker.overall_status = OverallStatus::InProgress;

        let now = Utc::now();
        let mut record = match active_for(target) {
            Some(existing) => existing.clone(),
            None => ProductionStageUpdate::new(tracker_id, target),
        };
        if record.status == StageStatus::NotStarted {
            record.actual_start_date = Some(now);
        }
        record.status = effective_status;
        if let Some(days) = estimated_days {
            record.estimated_days = Some(days);
            if record.is_revision {
                record.extra_days += days;
            }
        }
        if notes.is_some() {
            record.notes = notes;
        }
        if effective_status == StageStatus::Completed {
            record.actual_end_date = Some(now);
        }
        record.updated_at = now;

        let mut txn = Transaction::new().stage_update(record.clone());

        if effective_status == StageStatus::Completed {
            // Close every open revision that targeted this stage; repeat
            // reverts can leave more than one in flight
            for mut open in self
                .store()
                .revisions(tracker_id)
                .await?
                .into_iter()
                .filter(|r| r.status == RevisionStatus::InProgress && r.target_stage == target)
            {
                open.complete();
                txn = txn.revision(open);
            }

            if target == tracker.current_stage {
                match target.next() {
                    Some(next) => tracker.current_stage = next,
                    None => {
                        tracker.overall_status = OverallStatus::Completed;
                        tracker.actual_end = Some(now);
                    }
                }
            }
        }

        let completed = updates
            .iter()
            .filter(|u| u.is_active() && u.status == StageStatus::Completed && u.stage != target)
            .count()
            + usize::from(effective_status == StageStatus::Completed);
        tracker.recompute_progress(completed);

        let expected = Self::bump_tracker(&mut tracker);
        txn = txn.tracker(tracker.clone(), Some(expected));
        self.store().commit(txn).await?;

        tracing::info!(
            tracker = %tracker.id,
            stage = %target,
            status = %effective_status,
            progress = tracker.progress,
            "stage update applied"
        );
        self.events().publish(Event::StageAdvanced {
            tracker_id: tracker.id,
            stage: target,
            status: effective_status,
            progress: tracker.progress,
            timestamp: now,
        });
        if tracker.overall_status == OverallStatus::Completed {
            self.events().publish(Event::ProductionCompleted {
                tracker_id: tracker.id,
                timestamp: now,
            });
        }
        Ok(tracker)
    }

    /// Put the current stage on hold
    pub async fn hold_stage(
        &self,
        tracker_id: Uuid,
        actor_id: i64,
    ) -> Result<ProductionTracking, WorkflowError> {
        let tracker = self
            .toggle_hold(tracker_id, actor_id, StageStatus::InProgress, StageStatus::OnHold)
            .await?;
        self.events().publish(Event::StageHeld {
            tracker_id: tracker.id,
            stage: tracker.current_stage,
            timestamp: Utc::now(),
        });
        Ok(tracker)
    }

    /// Take the current stage off hold
    pub async fn resume_stage(
        &self,
        tracker_id: Uuid,
        actor_id: i64,
    ) -> Result<ProductionTracking, WorkflowError> {
        let tracker = self
            .toggle_hold(tracker_id, actor_id, StageStatus::OnHold, StageStatus::InProgress)
            .await?;
        self.events().publish(Event::StageResumed {
            tracker_id: tracker.id,
            stage: tracker.current_stage,
            timestamp: Utc::now(),
        });
        Ok(tracker)
    }

    async fn toggle_hold(
        &self,
        tracker_id: Uuid,
        actor_id: i64,
        from: StageStatus,
        to: StageStatus,
    ) -> Result<ProductionTracking, WorkflowError> {
        let mut tracker = self
            .guarded_tracker(tracker_id, actor_id, Capability::UpdateStage)
            .await?;
        let current = tracker.current_stage;

        let updates = self.store().stage_updates(tracker_id).await?;
        let mut record = updates
            .iter()
            .find(|u| u.stage == current && u.is_active() && u.status == from)
            .cloned()
            .ok_or_else(|| WorkflowError::InvalidTransition {
                current: EntityState::Stage(current),
                reason: format!("stage {} is not {}", current, from),
            })?;

        let now = Utc::now();
        record.status = to;
        record.updated_at = now;
        tracker.overall_status = if to == StageStatus::OnHold {
            OverallStatus::Waiting
        } else {
            OverallStatus::InProgress
        };

        let expected = Self::bump_tracker(&mut tracker);
        self.store()
            .commit(
                Transaction::new()
                    .stage_update(record)
                    .tracker(tracker.clone(), Some(expected)),
            )
            .await?;

        tracing::info!(tracker = %tracker.id, stage = %current, status = %to, "stage hold toggled");
        Ok(tracker)
    }

    /// Load a tracker, reject terminal ones, and check the actor's capability
    /// against the owning company
    pub(crate) async fn guarded_tracker(
        &self,
        tracker_id: Uuid,
        actor_id: i64,
        capability: Capability,
    ) -> Result<ProductionTracking, WorkflowError> {
        let tracker = self.load_tracker(tracker_id).await?;
        if tracker.overall_status.is_terminal() {
            return Err(WorkflowError::TerminalState {
                current: EntityState::Tracker(tracker.overall_status),
            });
        }
        self.require_capability(actor_id, capability, tracker.company_id)
            .await?;
        Ok(tracker)
    }
}
