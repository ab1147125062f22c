//! `bgx simulate` – scripted transfer against the in-memory platform.
//!
//! The app goes to the background with one unfinished transfer, a fake engine
//! streams byte counts through the progress bridge, and at the end every post
//! and grant the platform recorded is printed.

use anyhow::{Context, Result};
use bgx_core::background::{BackgroundExecutionManager, ExpirationCause};
use bgx_core::config::BgxConfig;
use bgx_core::lifecycle::BackgroundCoordinator;
use bgx_core::notification::ProgressNotificationController;
use bgx_core::permission::{PermissionGate, PermissionOutcome};
use bgx_core::platform::memory::MemoryPlatform;
use bgx_core::transfer::{
    run_progress_loop, ProgressEvent, TransferBridge, TransferEvent, TransferOutcome,
    TransferProgress,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Bytes the fake engine moves per step.
const CHUNK_BYTES: u64 = 256 * 1024;

#[derive(Debug, Clone)]
pub struct SimulateOptions {
    pub steps: u32,
    pub step_ms: u64,
    pub expire_at: Option<u32>,
    pub deny_permission: bool,
    pub refuse_grant: bool,
    pub foreground_display: bool,
}

pub async fn run_simulate(cfg: &BgxConfig, opts: &SimulateOptions) -> Result<()> {
    let platform = Arc::new(MemoryPlatform::new());
    if opts.deny_permission {
        platform.set_permission_answer(PermissionOutcome::Denied);
    }
    platform.set_refuse_grants(opts.refuse_grant);

    let manager = BackgroundExecutionManager::new(platform.clone());
    let aborted = Arc::new(AtomicBool::new(false));
    {
        let aborted = Arc::clone(&aborted);
        manager.set_expiration_observer(Arc::new(move |cause: ExpirationCause| {
            tracing::warn!(?cause, "background execution ended early; aborting transfer");
            aborted.store(true, Ordering::SeqCst);
        }));
    }

    let controller = Arc::new(ProgressNotificationController::new(
        platform.clone(),
        manager.clone(),
        cfg,
    ));
    let gate = PermissionGate::new(platform.clone());
    let permission = gate.request_permission();
    controller.set_permission(permission);
    if opts.foreground_display {
        controller.enable_foreground_display();
    }

    let coordinator = BackgroundCoordinator::new(Arc::clone(&controller));
    coordinator.update_active_task_count(0, 1);
    coordinator.on_enter_background();

    let (tx, rx) = mpsc::channel::<TransferEvent>(16);
    let engine = tokio::spawn(run_engine(
        tx,
        Arc::clone(&platform),
        Arc::clone(&aborted),
        opts.clone(),
    ));
    let bridge = TransferBridge::new(Arc::clone(&controller), "Downloading simulated.bin");
    let outcome = run_progress_loop(rx, bridge).await;
    engine.await.context("simulated engine task join")?;

    coordinator.update_active_task_count(1, 1);
    coordinator.on_enter_foreground();

    print_report(&platform, permission, outcome.as_ref());
    Ok(())
}

async fn run_engine(
    tx: mpsc::Sender<TransferEvent>,
    platform: Arc<MemoryPlatform>,
    aborted: Arc<AtomicBool>,
    opts: SimulateOptions,
) {
    let total = u64::from(opts.steps) * CHUNK_BYTES;
    for step in 0..=opts.steps {
        if opts.expire_at == Some(step) {
            let fired = platform.fire_expiration();
            tracing::info!(step, fired, "simulated OS expiration");
        }
        if aborted.load(Ordering::SeqCst) {
            let outcome = TransferOutcome::Failed(format!("execution window closed at step {step}"));
            let _ = tx.send(TransferEvent::Finished(outcome)).await;
            return;
        }

        let event = if step == opts.steps {
            ProgressEvent::terminal()
        } else {
            ProgressEvent::from_stats(TransferProgress {
                bytes_done: u64::from(step) * CHUNK_BYTES,
                total_bytes: Some(total),
                elapsed_secs: f64::from(step) * opts.step_ms as f64 / 1000.0,
            })
        };
        if tx.send(TransferEvent::Progress(event)).await.is_err() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(opts.step_ms)).await;
    }
    let _ = tx
        .send(TransferEvent::Finished(TransferOutcome::Completed))
        .await;
}

fn print_report(
    platform: &MemoryPlatform,
    permission: PermissionOutcome,
    outcome: Option<&TransferOutcome>,
) {
    println!("Permission: {:?}", permission);
    let posts = platform.posts();
    println!("Notifications posted: {}", posts.len());
    for (i, post) in posts.iter().enumerate() {
        println!("  {:>3}  {:>3}%  {}", i + 1, post.percent(), post.body);
    }
    println!(
        "Grants: begun {}, ended {}, outstanding {}",
        platform.grants_begun(),
        platform.grants_ended(),
        platform.outstanding_grants()
    );
    match outcome {
        Some(TransferOutcome::Completed) => println!("Outcome: completed"),
        Some(TransferOutcome::Failed(reason)) => println!("Outcome: failed ({reason})"),
        Some(TransferOutcome::Cancelled) => println!("Outcome: cancelled"),
        None => println!("Outcome: engine stopped without reporting"),
    }
}
