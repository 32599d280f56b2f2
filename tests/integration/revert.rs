//! Reverting production to an earlier stage and the audit trail it leaves

use loomline::domain::{
    DefectCounts, OverallStatus, ProductionStage, RevisionStatus, StageRecordState, StageStatus,
};
use loomline::WorkflowError;

use crate::common::{
    complete_stage, confirmed_deal, run_production, service, INSPECTOR, PRODUCTION_MANAGER,
};

#[tokio::test]
async fn revert_supersedes_work_and_rewinds_the_pointer() {
    let service = service();
    let (_, tracker) = confirmed_deal(&service, 1).await;
    let tracker_id = tracker.id;
    // Through QUALITY; the pointer now sits at PACKAGING
    run_production(&service, tracker_id, ProductionStage::Quality).await;

    let tracker = service
        .revert_to_stage(tracker_id, PRODUCTION_MANAGER, ProductionStage::Sewing)
        .await
        .unwrap();

    assert_eq!(tracker.current_stage, ProductionStage::Sewing);
    assert_eq!(tracker.overall_status, OverallStatus::InProgress);
    // Planning, Fabric and Cutting still count
    assert_eq!(tracker.progress, 43);

    let updates = service.store().stage_updates(tracker_id).await.unwrap();
    // Nothing was deleted: the old sewing and quality records are history
    for stage in [ProductionStage::Sewing, ProductionStage::Quality] {
        assert!(updates.iter().any(|u| {
            u.stage == stage && matches!(u.record_state, StageRecordState::Superseded { .. })
        }));
    }
    let fresh = updates
        .iter()
        .find(|u| u.stage == ProductionStage::Sewing && u.is_active())
        .unwrap();
    assert!(fresh.is_revision);
    assert_eq!(fresh.status, StageStatus::InProgress);

    // The inspection that passed the undone work no longer gates anything
    let controls = service.store().quality_controls(tracker_id).await.unwrap();
    assert!(controls.iter().all(|qc| !qc.is_active()));

    let revisions = service.store().revisions(tracker_id).await.unwrap();
    assert_eq!(revisions.len(), 1);
    assert_eq!(revisions[0].revision_number, 1);
    assert_eq!(revisions[0].from_stage, ProductionStage::Packaging);
    assert_eq!(revisions[0].target_stage, ProductionStage::Sewing);
    assert_eq!(revisions[0].status, RevisionStatus::InProgress);
}

#[tokio::test]
async fn repeat_revert_only_grows_the_audit_trail() {
    let service = service();
    let (_, tracker) = confirmed_deal(&service, 2).await;
    let tracker_id = tracker.id;
    run_production(&service, tracker_id, ProductionStage::Quality).await;

    let first = service
        .revert_to_stage(tracker_id, PRODUCTION_MANAGER, ProductionStage::Sewing)
        .await
        .unwrap();
    let second = service
        .revert_to_stage(tracker_id, PRODUCTION_MANAGER, ProductionStage::Sewing)
        .await
        .unwrap();

    assert_eq!(second.current_stage, first.current_stage);
    assert_eq!(second.progress, first.progress);
    assert_eq!(second.overall_status, first.overall_status);

    let revisions = service.store().revisions(tracker_id).await.unwrap();
    assert_eq!(revisions.len(), 2);
    assert_eq!(revisions[1].revision_number, 2);

    // The active sewing record was not superseded again
    let updates = service.store().stage_updates(tracker_id).await.unwrap();
    let active_sewing: Vec<_> = updates
        .iter()
        .filter(|u| u.stage == ProductionStage::Sewing && u.is_active())
        .collect();
    assert_eq!(active_sewing.len(), 1);

    // Re-completing the stage closes both open revisions, not just the latest
    complete_stage(&service, tracker_id, ProductionStage::Sewing).await;
    let revisions = service.store().revisions(tracker_id).await.unwrap();
    assert!(revisions
        .iter()
        .all(|r| r.status == RevisionStatus::Completed));
}

#[tokio::test]
async fn reverts_only_target_completed_earlier_stages() {
    let service = service();
    let (_, tracker) = confirmed_deal(&service, 3).await;
    let tracker_id = tracker.id;
    run_production(&service, tracker_id, ProductionStage::Cutting).await;

    // Forward of the pointer
    let err = service
        .revert_to_stage(tracker_id, PRODUCTION_MANAGER, ProductionStage::Quality)
        .await
        .unwrap_err();
    let WorkflowError::InvalidTarget { valid_targets, .. } = err else {
        panic!("expected InvalidTarget");
    };
    assert_eq!(
        valid_targets,
        vec![
            ProductionStage::Planning,
            ProductionStage::Fabric,
            ProductionStage::Cutting,
        ]
    );

    // The pointer stage itself is not a target unless a revert already
    // reopened it
    let err = service
        .revert_to_stage(tracker_id, PRODUCTION_MANAGER, ProductionStage::Sewing)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTarget { .. }));
}

#[tokio::test]
async fn redoing_the_work_closes_the_revision_and_regates_quality() {
    let service = service();
    let (_, tracker) = confirmed_deal(&service, 4).await;
    let tracker_id = tracker.id;
    run_production(&service, tracker_id, ProductionStage::Quality).await;

    service
        .revert_to_stage(tracker_id, PRODUCTION_MANAGER, ProductionStage::Sewing)
        .await
        .unwrap();

    let tracker = complete_stage(&service, tracker_id, ProductionStage::Sewing).await;
    assert_eq!(tracker.current_stage, ProductionStage::Quality);
    assert_eq!(tracker.progress, 57);

    // Re-completing the target stage closes the revision
    let revisions = service.store().revisions(tracker_id).await.unwrap();
    assert_eq!(revisions[0].status, RevisionStatus::Completed);
    assert!(revisions[0].completed_at.is_some());

    // The invalidated inspection does not satisfy the gate; a new one must
    service
        .advance_stage(
            tracker_id,
            PRODUCTION_MANAGER,
            ProductionStage::Quality,
            StageStatus::InProgress,
            Some(2),
            None,
        )
        .await
        .unwrap();
    let err = service
        .advance_stage(
            tracker_id,
            PRODUCTION_MANAGER,
            ProductionStage::Quality,
            StageStatus::Completed,
            None,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::QualityGateBlocked { .. }));

    service
        .submit_quality(tracker_id, INSPECTOR, DefectCounts::default(), None, None)
        .await
        .unwrap();
    let tracker = service
        .advance_stage(
            tracker_id,
            PRODUCTION_MANAGER,
            ProductionStage::Quality,
            StageStatus::Completed,
            None,
            None,
        )
        .await
        .unwrap();
    assert_eq!(tracker.current_stage, ProductionStage::Packaging);
}

#[tokio::test]
async fn revert_from_packaging_keeps_later_stages_clean() {
    let service = service();
    let (_, tracker) = confirmed_deal(&service, 5).await;
    let tracker_id = tracker.id;
    run_production(&service, tracker_id, ProductionStage::Packaging).await;

    let tracker = service
        .revert_to_stage(tracker_id, PRODUCTION_MANAGER, ProductionStage::Quality)
        .await
        .unwrap();
    assert_eq!(tracker.current_stage, ProductionStage::Quality);
    assert_eq!(tracker.progress, 57);

    // Shipping never started, so there is nothing to supersede there
    let updates = service.store().stage_updates(tracker_id).await.unwrap();
    assert!(!updates
        .iter()
        .any(|u| u.stage == ProductionStage::Shipping));
}
