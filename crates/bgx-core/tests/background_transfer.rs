//! Integration test: a transfer backgrounded mid-flight, driven end to end
//! through the in-memory platform.
//!
//! Covers permission, lifecycle coordination, coalesced progress, OS
//! expiration of the grant and delegate chaining together.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use bgx_core::background::{BackgroundExecutionManager, ExecutionState, ExpirationCause};
use bgx_core::config::BgxConfig;
use bgx_core::lifecycle::BackgroundCoordinator;
use bgx_core::notification::{
    Disposition, NotificationEvent, NotificationHandler, ProgressNotificationController,
    SessionPhase,
};
use bgx_core::permission::{PermissionGate, PermissionOutcome};
use bgx_core::platform::memory::MemoryPlatform;
use bgx_core::platform::NotificationCenter;
use bgx_core::transfer::{
    run_progress_loop, ProgressEvent, TransferBridge, TransferEvent, TransferOutcome,
};
use tokio::sync::mpsc;

struct Stack {
    platform: Arc<MemoryPlatform>,
    manager: BackgroundExecutionManager,
    controller: Arc<ProgressNotificationController>,
    coordinator: BackgroundCoordinator,
}

fn stack(cfg: &BgxConfig) -> Stack {
    let platform = Arc::new(MemoryPlatform::new());
    let manager = BackgroundExecutionManager::new(platform.clone());
    let controller = Arc::new(ProgressNotificationController::new(
        platform.clone(),
        manager.clone(),
        cfg,
    ));
    let gate = PermissionGate::new(platform.clone());
    controller.set_permission(gate.request_permission());
    let coordinator = BackgroundCoordinator::new(Arc::clone(&controller));
    Stack {
        platform,
        manager,
        controller,
        coordinator,
    }
}

#[tokio::test]
async fn backgrounded_transfer_completes_and_releases_grant() {
    let mut cfg = BgxConfig::default();
    cfg.throttle.min_interval_ms = 60_000;
    cfg.throttle.min_progress_delta = 0.25;
    let s = stack(&cfg);

    s.coordinator.update_active_task_count(0, 1);
    s.coordinator.on_enter_background();
    assert_eq!(s.manager.state(), ExecutionState::Extended);

    let (tx, rx) = mpsc::channel(64);
    let bridge = TransferBridge::new(Arc::clone(&s.controller), "Downloading");
    let pump = tokio::spawn(run_progress_loop(rx, bridge));

    let steps = 40;
    for i in 0..steps {
        let event = ProgressEvent::new(i as f64 / steps as f64);
        tx.send(TransferEvent::Progress(event)).await.unwrap();
    }
    tx.send(TransferEvent::Progress(ProgressEvent::terminal()))
        .await
        .unwrap();
    tx.send(TransferEvent::Finished(TransferOutcome::Completed))
        .await
        .unwrap();
    assert_eq!(pump.await.unwrap(), Some(TransferOutcome::Completed));

    let posts = s.platform.posts();
    assert!(posts.len() <= steps + 1);
    assert!(posts.len() >= 2);
    assert_eq!(posts.last().unwrap().progress, 1.0);
    assert!(posts.iter().all(|p| p.identifier == "bgx.transfer.progress"));
    assert_eq!(s.controller.phase(), SessionPhase::NoSession);
    assert_eq!(s.platform.outstanding_grants(), 0);
    assert_eq!(s.platform.grants_begun(), 1);
    assert_eq!(s.platform.unknown_ends(), 0);
    assert_eq!(s.platform.prompt_count(), 1);
}

#[tokio::test]
async fn expiration_aborts_transfer_exactly_once() {
    let s = stack(&BgxConfig::default());
    let aborted = Arc::new(AtomicBool::new(false));
    let observed = Arc::new(AtomicUsize::new(0));
    {
        let aborted = Arc::clone(&aborted);
        let observed = Arc::clone(&observed);
        s.manager
            .set_expiration_observer(Arc::new(move |cause: ExpirationCause| {
                assert_eq!(cause, ExpirationCause::Expired);
                observed.fetch_add(1, Ordering::SeqCst);
                aborted.store(true, Ordering::SeqCst);
            }));
    }

    let (tx, rx) = mpsc::channel(16);
    let bridge = TransferBridge::new(Arc::clone(&s.controller), "Downloading");
    let pump = tokio::spawn(run_progress_loop(rx, bridge));

    tx.send(TransferEvent::Progress(ProgressEvent::new(0.1)))
        .await
        .unwrap();
    // Let the pump show the notification (and begin the grant).
    while s.manager.state() != ExecutionState::Extended {
        tokio::task::yield_now().await;
    }

    assert_eq!(s.platform.fire_expiration(), 1);
    assert_eq!(s.platform.outstanding_grants(), 0);
    assert!(aborted.load(Ordering::SeqCst));

    // The engine checkpoints and reports failure; the caller's end is a no-op.
    tx.send(TransferEvent::Finished(TransferOutcome::Failed(
        "execution window closed".to_string(),
    )))
    .await
    .unwrap();
    let outcome = pump.await.unwrap();
    assert!(matches!(outcome, Some(TransferOutcome::Failed(_))));
    assert!(!s.manager.end());

    assert_eq!(observed.load(Ordering::SeqCst), 1);
    assert_eq!(s.platform.grants_ended(), 1);
    assert_eq!(s.platform.unknown_ends(), 0);
    assert!(s.platform.visible(s.controller.identifier()).is_none());
}

#[test]
fn denied_permission_keeps_transfer_silent() {
    let platform = Arc::new(MemoryPlatform::new());
    platform.set_permission_answer(PermissionOutcome::Denied);
    let manager = BackgroundExecutionManager::new(platform.clone());
    let controller = Arc::new(ProgressNotificationController::new(
        platform.clone(),
        manager,
        &BgxConfig::default(),
    ));
    let gate = PermissionGate::new(platform.clone());
    controller.set_permission(gate.request_permission());
    controller.set_permission(gate.request_permission());

    let mut bridge = TransferBridge::new(Arc::clone(&controller), "Downloading");
    bridge.on_progress(&ProgressEvent::new(0.0));
    bridge.on_progress(&ProgressEvent::terminal());
    bridge.on_finished(&TransferOutcome::Completed);

    assert_eq!(platform.prompt_count(), 1);
    assert_eq!(platform.post_count(), 0);
    assert_eq!(platform.grants_begun(), 1);
    assert_eq!(platform.outstanding_grants(), 0);
}

#[test]
fn foreground_display_preserves_host_delegate() {
    struct HostDelegate(AtomicUsize);
    impl NotificationHandler for HostDelegate {
        fn handle(&self, _event: &NotificationEvent) -> Disposition {
            self.0.fetch_add(1, Ordering::SeqCst);
            Disposition::Handled
        }
    }

    let s = stack(&BgxConfig::default());
    let host = Arc::new(HostDelegate(AtomicUsize::new(0)));
    s.platform.set_delegate(host.clone());

    s.controller.enable_foreground_display();
    s.controller.enable_foreground_display();

    let foreign = NotificationEvent::Response {
        identifier: "reminder.daily".to_string(),
        action: "dismiss".to_string(),
    };
    assert_eq!(s.platform.deliver(&foreign), Disposition::Handled);
    assert_eq!(host.0.load(Ordering::SeqCst), 1);

    let ours = NotificationEvent::WillPresent {
        identifier: s.controller.identifier().to_string(),
    };
    assert!(matches!(s.platform.deliver(&ours), Disposition::Present(_)));
    assert_eq!(host.0.load(Ordering::SeqCst), 1);
}
