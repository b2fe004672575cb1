//! End-to-end scenarios against a started canvas service

use mural_core::{now_ms, Color, Coord, GridConfig, RejectionError};
use mural_payment::{AuthorizationStatus, ExternalSessionRef, MockProcessor, PaymentProcessor};
use mural_service::{
    CanvasService, Collaborators, JsonFilePersistence, Replica, ServiceConfig,
    SnapshotPersistence, SubmitRequest,
};
use mural_test_utils::{confirmed_bypass, setup_service, test_identities};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn scenario_a_free_placement_round_trips() {
    let (service, _) = setup_service();

    let committed = service
        .submit(SubmitRequest::free("p1".into(), 1, 1, "#ff0000"))
        .await
        .unwrap();
    assert_eq!(committed.x, 1);
    assert_eq!(committed.y, 1);

    let cell = service.cell(Coord::new(1, 1)).unwrap();
    assert_eq!(cell.color, Color::rgb(255, 0, 0));
    assert_eq!(cell.painted_by, "p1".into());
}

#[tokio::test]
async fn scenario_b_immediate_retry_hits_cooldown() {
    let (service, _) = setup_service();

    service
        .submit(SubmitRequest::free("p1".into(), 1, 1, "#ff0000"))
        .await
        .unwrap();
    let result = service
        .submit(SubmitRequest::free("p1".into(), 1, 1, "#00ff00"))
        .await;

    match result {
        Err(RejectionError::Cooldown { retry_after_ms }) => {
            // Submitted right after the first commit; nearly the whole
            // 15-minute window remains.
            assert!(retry_after_ms > 890_000, "retry_after {retry_after_ms}");
            assert!(retry_after_ms <= 900_000, "retry_after {retry_after_ms}");
        }
        other => panic!("expected cooldown, got {other:?}"),
    }

    // The rejected write is invisible.
    assert_eq!(
        service.cell(Coord::new(1, 1)).unwrap().color,
        Color::rgb(255, 0, 0)
    );
}

#[tokio::test]
async fn scenario_c_verified_bypass_beats_cooldown() {
    let (service, processor) = setup_service();

    // Put p1 on cooldown first.
    service
        .submit(SubmitRequest::free("p1".into(), 1, 1, "#ff0000"))
        .await
        .unwrap();

    let authorization = service
        .request_bypass("p1".into(), 2, 2, "#0000ff")
        .await
        .unwrap();
    assert_eq!(
        service.authorization_status(authorization),
        Some(AuthorizationStatus::Pending)
    );

    // An imposter-signed confirmation is rejected and changes nothing.
    let imposter = MockProcessor::new();
    let session = processor.last_session().unwrap();
    let result = service.confirm_payment(&imposter.settle(session, now_ms()));
    assert_eq!(result, Err(RejectionError::PaymentUnverified));
    assert_eq!(
        service.authorization_status(authorization),
        Some(AuthorizationStatus::Pending)
    );

    // The genuine confirmation lands.
    service
        .confirm_payment(&processor.settle(session, now_ms()))
        .unwrap();
    assert_eq!(
        service.authorization_status(authorization),
        Some(AuthorizationStatus::Confirmed)
    );

    // Placement succeeds regardless of the cooldown state.
    let committed = service
        .submit(SubmitRequest::free("p1".into(), 2, 2, "#0000ff").with_bypass(authorization))
        .await
        .unwrap();
    assert_eq!(committed.color, Color::rgb(0, 0, 255));
    assert_eq!(
        service.cell(Coord::new(2, 2)).unwrap().color,
        Color::rgb(0, 0, 255)
    );
}

#[tokio::test]
async fn scenario_d_snapshot_counts_painted_cells() {
    let (service, processor) = setup_service();

    service
        .submit(SubmitRequest::free("p1".into(), 1, 1, "#ff0000"))
        .await
        .unwrap();
    let authorization = confirmed_bypass(&service, &processor, &"p1".into(), 2, 2, "#0000ff").await;
    service
        .submit(SubmitRequest::free("p1".into(), 2, 2, "#0000ff").with_bypass(authorization))
        .await
        .unwrap();

    let snapshot = service.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.taken_at > 0);
}

#[tokio::test]
async fn out_of_bounds_is_rejected_without_mutation() {
    let (service, _) = setup_service();

    let result = service
        .submit(SubmitRequest::free("p1".into(), 4, 1, "#ff0000"))
        .await;
    assert_eq!(result, Err(RejectionError::OutOfBounds { x: 4, y: 1 }));
    assert_eq!(service.cell_count(), 0);
}

#[tokio::test]
async fn bypass_consumed_twice_is_rejected() {
    let (service, processor) = setup_service();

    let authorization = confirmed_bypass(&service, &processor, &"p1".into(), 2, 2, "#0000ff").await;
    service
        .submit(SubmitRequest::free("p1".into(), 2, 2, "#0000ff").with_bypass(authorization))
        .await
        .unwrap();

    let result = service
        .submit(SubmitRequest::free("p1".into(), 2, 2, "#0000ff").with_bypass(authorization))
        .await;
    assert_eq!(result, Err(RejectionError::AlreadyConsumed));
}

#[tokio::test]
async fn bypass_for_foreign_participant_is_invalid() {
    let (service, processor) = setup_service();

    let authorization = confirmed_bypass(&service, &processor, &"p1".into(), 2, 2, "#0000ff").await;
    let result = service
        .submit(SubmitRequest::free("p2".into(), 2, 2, "#0000ff").with_bypass(authorization))
        .await;
    assert!(matches!(result, Err(RejectionError::InvalidBypass(_))));

    // Still consumable by its owner.
    service
        .submit(SubmitRequest::free("p1".into(), 2, 2, "#0000ff").with_bypass(authorization))
        .await
        .unwrap();
}

#[tokio::test]
async fn confirmation_for_unknown_session_is_invalid() {
    let (service, processor) = setup_service();
    let result =
        service.confirm_payment(&processor.settle(ExternalSessionRef::new(), now_ms()));
    assert!(matches!(result, Err(RejectionError::InvalidBypass(_))));
}

#[tokio::test]
async fn participant_profile_tracks_commits() {
    let (service, processor) = setup_service();

    service
        .submit(SubmitRequest::free("p1".into(), 0, 0, "#ff0000"))
        .await
        .unwrap();
    let authorization = confirmed_bypass(&service, &processor, &"p1".into(), 1, 0, "#0000ff").await;
    service
        .submit(SubmitRequest::free("p1".into(), 1, 0, "#0000ff").with_bypass(authorization))
        .await
        .unwrap();

    let profile = service.participant_profile(&"p1".into()).unwrap();
    assert_eq!(profile.display_name, "Pat");
    assert_eq!(profile.mutation_count, 2);
    // Only the free commit moved the cooldown clock.
    assert!(profile.last_free_mutation_at.is_some());
}

#[tokio::test]
async fn snapshot_then_stream_reconciliation_converges() {
    let (service, _) =
        mural_test_utils::setup_service_with_grid(GridConfig::new().with_dimensions(8, 8).with_cooldown_ms(0));

    service
        .submit(SubmitRequest::free("p1".into(), 0, 0, "#111111"))
        .await
        .unwrap();

    // Join: snapshot first, then subscribe.
    let snapshot = service.snapshot();
    let mut stream = service.subscribe();
    let mut replica = Replica::new();
    replica.apply_snapshot(&snapshot);
    assert_eq!(replica.len(), 1);

    // A mutation the snapshot already reflects may be replayed; a no-op.
    for cell in &snapshot.cells {
        replica.apply(cell);
    }
    assert_eq!(replica.len(), 1);

    service
        .submit(SubmitRequest::free("p1".into(), 1, 1, "#222222"))
        .await
        .unwrap();
    let delta = stream.recv().await.unwrap();
    assert!(replica.apply(&delta));
    assert_eq!(replica.len(), 2);
}

#[tokio::test]
async fn export_import_replays_through_store() {
    let (source, _) = setup_service();
    source
        .submit(SubmitRequest::free("p1".into(), 1, 1, "#ff0000"))
        .await
        .unwrap();

    let export = source.export_board();
    assert_eq!(export.width, 4);

    let (target, _) = setup_service();
    let mut observer = target.subscribe();
    let imported = target.import_board(export).await.unwrap();
    assert_eq!(imported, 1);
    assert_eq!(
        target.cell(Coord::new(1, 1)).unwrap().color,
        Color::rgb(255, 0, 0)
    );
    // Imports are republished like any commit.
    assert_eq!(observer.recv().await.unwrap().x, 1);
}

#[tokio::test]
async fn tampered_export_is_rejected() {
    let (source, _) = setup_service();
    source
        .submit(SubmitRequest::free("p1".into(), 1, 1, "#ff0000"))
        .await
        .unwrap();

    let mut export = source.export_board();
    export.cells[0].color = Color::rgb(0, 0, 0);

    let (target, _) = setup_service();
    let result = target.import_board(export).await;
    assert!(matches!(
        result,
        Err(mural_service::ImportError::DigestMismatch)
    ));
    assert_eq!(target.cell_count(), 0);
}

#[tokio::test]
async fn rapid_commits_never_corrupt_the_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let persistence = Arc::new(JsonFilePersistence::new(
        dir.path().join("board.json"),
        dir.path().join("participants.json"),
    ));
    let processor = Arc::new(MockProcessor::new());
    let config = ServiceConfig::new()
        .with_grid(GridConfig::new().with_dimensions(16, 16).with_cooldown_ms(0));

    let service = CanvasService::start(
        config,
        Collaborators {
            identity: Arc::new(test_identities()),
            processor_key: processor.verifying_key(),
            processor: Arc::clone(&processor) as Arc<dyn PaymentProcessor>,
            persistence: Arc::clone(&persistence) as Arc<dyn SnapshotPersistence>,
        },
    );

    // Each commit hands a fresh snapshot to the persistence writer; a burst
    // must never leave a half-written or truncated file behind.
    for i in 0..64u32 {
        service
            .submit(SubmitRequest::free("p1".into(), i % 16, i / 16, "#abcdef"))
            .await
            .unwrap();
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        // Every intermediate load must parse; a corrupt file is a failure
        // even if a later write would repair it.
        let cells = persistence.load().unwrap().cells.len();
        if cells == 64 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "snapshot stalled at {cells} cells"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn state_survives_restart_via_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let persistence = Arc::new(JsonFilePersistence::new(
        dir.path().join("board.json"),
        dir.path().join("participants.json"),
    ));
    let processor = Arc::new(MockProcessor::new());
    let config = ServiceConfig::new().with_grid(GridConfig::new().with_dimensions(4, 4));

    let service = CanvasService::start(
        config.clone(),
        Collaborators {
            identity: Arc::new(test_identities()),
            processor_key: processor.verifying_key(),
            processor: Arc::clone(&processor) as Arc<dyn PaymentProcessor>,
            persistence: Arc::clone(&persistence) as Arc<dyn SnapshotPersistence>,
        },
    );
    service
        .submit(SubmitRequest::free("p1".into(), 1, 1, "#ff0000"))
        .await
        .unwrap();

    // Persistence runs off the commit path; wait for the snapshot to land.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if persistence.load().map(|s| s.cells.len()).unwrap_or(0) == 1 {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "snapshot never landed");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    drop(service);

    let restarted = CanvasService::start(
        config,
        Collaborators {
            identity: Arc::new(test_identities()),
            processor_key: processor.verifying_key(),
            processor,
            persistence,
        },
    );
    let cell = restarted.cell(Coord::new(1, 1)).unwrap();
    assert_eq!(cell.color, Color::rgb(255, 0, 0));

    // The restored cooldown clock still blocks p1.
    let result = restarted
        .submit(SubmitRequest::free("p1".into(), 2, 2, "#00ff00"))
        .await;
    assert!(matches!(result, Err(RejectionError::Cooldown { .. })));
}
