//! Quality inspection submission

use chrono::Utc;
use uuid::Uuid;

use crate::auth::Capability;
use crate::domain::{DefectCounts, ProductionStage, QualityControl, QualityResult};
use crate::error::{EntityState, WorkflowError};
use crate::events::Event;
use crate::store::Transaction;

use super::WorkflowService;

impl WorkflowService {
    /// Record a quality inspection for the tracker's QUALITY stage.
    ///
    /// The score is always computed from the defect counts; an explicit
    /// override replaces the classification but never the score, and the
    /// override is flagged on the record for audit.
    pub async fn submit_quality(
        &self,
        tracker_id: Uuid,
        actor_id: i64,
        defects: DefectCounts,
        notes: Option<String>,
        override_result: Option<QualityResult>,
    ) -> Result<QualityControl, WorkflowError> {
        let mut tracker = self
            .guarded_tracker(tracker_id, actor_id, Capability::SubmitQuality)
            .await?;

        if tracker.current_stage != ProductionStage::Quality {
            return Err(WorkflowError::InvalidTransition {
                current: EntityState::Stage(tracker.current_stage),
                reason: "quality controls can only be submitted while the tracker is in the quality stage".to_string(),
            });
        }
        if override_result == Some(QualityResult::Pending) {
            return Err(WorkflowError::InvalidInput(
                "an override must be a terminal result, not pending".to_string(),
            ));
        }

        let qc = QualityControl::from_submission(tracker_id, actor_id, defects, notes, override_result);

        let expected = Self::bump_tracker(&mut tracker);
        self.store()
            .commit(
                Transaction::new()
                    .quality_control(qc.clone())
                    .tracker(tracker.clone(), Some(expected)),
            )
            .await?;

        tracing::info!(
            tracker = %tracker_id,
            result = %qc.result,
            score = qc.score,
            manual_override = qc.manual_override,
            "quality control recorded"
        );
        self.events().publish(Event::QualityResult {
            tracker_id,
            result: qc.result,
            score: qc.score,
            timestamp: Utc::now(),
        });
        Ok(qc)
    }
}
