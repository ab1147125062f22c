//! Tests for the execution grant lifecycle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::*;
use crate::error::BgxError;
use crate::platform::memory::MemoryPlatform;
use crate::platform::{ExecutionHost, ExpirationHandler, TaskId};

type Seen = Arc<Mutex<Vec<ExpirationCause>>>;

fn manager_with_counter() -> (Arc<MemoryPlatform>, BackgroundExecutionManager, Seen) {
    let platform = Arc::new(MemoryPlatform::new());
    let manager = BackgroundExecutionManager::new(platform.clone());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    manager.set_expiration_observer(Arc::new(move |cause: ExpirationCause| {
        sink.lock().unwrap().push(cause)
    }));
    (platform, manager, seen)
}

#[test]
fn begin_then_end_releases_once() {
    let (platform, manager, seen) = manager_with_counter();
    assert_eq!(manager.state(), ExecutionState::Idle);
    manager.begin();
    assert_eq!(manager.state(), ExecutionState::Extended);
    assert_eq!(platform.outstanding_grants(), 1);
    assert!(manager.end());
    assert_eq!(manager.state(), ExecutionState::Idle);
    assert_eq!(platform.outstanding_grants(), 0);
    assert_eq!(platform.grants_ended(), 1);
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn double_begin_acquires_once() {
    let (platform, manager, _) = manager_with_counter();
    assert_eq!(manager.try_begin(), BeginOutcome::Acquired);
    assert_eq!(manager.try_begin(), BeginOutcome::AlreadyExtended);
    assert_eq!(platform.grants_begun(), 1);
    assert_eq!(manager.outstanding(), 1);
}

#[test]
fn end_while_idle_is_noop() {
    let (platform, manager, seen) = manager_with_counter();
    assert!(!manager.end());
    manager.begin();
    manager.end();
    assert!(!manager.end());
    assert_eq!(platform.grants_ended(), 1);
    assert_eq!(platform.unknown_ends(), 0);
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn expiration_releases_then_notifies_once() {
    let (platform, manager, seen) = manager_with_counter();
    manager.begin();
    assert_eq!(platform.fire_expiration(), 1);
    assert_eq!(manager.outstanding(), 0);
    assert_eq!(platform.outstanding_grants(), 0);
    assert_eq!(*seen.lock().unwrap(), vec![ExpirationCause::Expired]);

    // Caller's own end() arrives late.
    assert!(!manager.end());
    assert_eq!(platform.unknown_ends(), 0);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn observer_sees_idle_state() {
    let platform = Arc::new(MemoryPlatform::new());
    let manager = BackgroundExecutionManager::new(platform.clone());
    let observed = Arc::new(Mutex::new(None));
    let probe = manager.clone();
    let slot = Arc::clone(&observed);
    manager.set_expiration_observer(Arc::new(move |_: ExpirationCause| {
        *slot.lock().unwrap() = Some(probe.state());
    }));
    manager.begin();
    platform.fire_expiration();
    assert_eq!(*observed.lock().unwrap(), Some(ExecutionState::Idle));
}

#[test]
fn panicking_observer_still_releases() {
    let platform = Arc::new(MemoryPlatform::new());
    let manager = BackgroundExecutionManager::new(platform.clone());
    manager.set_expiration_observer(Arc::new(|_: ExpirationCause| panic!("observer failure")));
    manager.begin();
    platform.fire_expiration();
    assert_eq!(manager.state(), ExecutionState::Idle);
    assert_eq!(platform.outstanding_grants(), 0);
    // The manager keeps working afterwards.
    manager.begin();
    assert_eq!(platform.outstanding_grants(), 1);
}

#[test]
fn refused_grant_reports_unavailable() {
    let (platform, manager, seen) = manager_with_counter();
    platform.set_refuse_grants(true);
    manager.begin();
    assert_eq!(manager.state(), ExecutionState::Idle);
    assert_eq!(*seen.lock().unwrap(), vec![ExpirationCause::Unavailable]);
    assert!(!manager.end());

    platform.set_refuse_grants(false);
    assert_eq!(manager.try_begin(), BeginOutcome::Acquired);
}

/// Host that keeps every expiration handler, so a test can fire one after the
/// task it belongs to was ended (the race the OS can produce).
#[derive(Default)]
struct RetainingHost {
    next: AtomicUsize,
    handlers: Mutex<Vec<ExpirationHandler>>,
    ended: Mutex<Vec<TaskId>>,
}

impl ExecutionHost for RetainingHost {
    fn begin_background_task(&self, on_expire: ExpirationHandler) -> Result<TaskId, BgxError> {
        self.handlers.lock().unwrap().push(on_expire);
        Ok(TaskId(self.next.fetch_add(1, Ordering::SeqCst) as u64))
    }

    fn end_background_task(&self, task: TaskId) {
        self.ended.lock().unwrap().push(task);
    }
}

#[test]
fn stale_expiration_does_not_touch_next_grant() {
    let host = Arc::new(RetainingHost::default());
    let manager = BackgroundExecutionManager::new(host.clone());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    manager.set_expiration_observer(Arc::new(move |_: ExpirationCause| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    manager.begin();
    manager.end();
    manager.begin();
    let first = host.handlers.lock().unwrap().remove(0);
    first();

    assert_eq!(manager.state(), ExecutionState::Extended);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(*host.ended.lock().unwrap(), vec![TaskId(0)]);
}

#[test]
fn dropping_manager_releases_grant() {
    let platform = Arc::new(MemoryPlatform::new());
    {
        let manager = BackgroundExecutionManager::new(platform.clone());
        manager.begin();
        assert_eq!(platform.outstanding_grants(), 1);
    }
    assert_eq!(platform.outstanding_grants(), 0);
}

#[test]
fn grant_count_stays_within_zero_and_one() {
    let (platform, manager, _) = manager_with_counter();
    // Small LCG so the sequence is reproducible.
    let mut seed: u32 = 0x2545_f491;
    for _ in 0..500 {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        match (seed >> 16) % 4 {
            0 | 1 => manager.begin(),
            2 => {
                manager.end();
            }
            _ => {
                platform.fire_expiration();
            }
        }
        let outstanding = platform.outstanding_grants();
        assert!(outstanding <= 1);
        assert_eq!(outstanding, manager.outstanding());
    }
    assert_eq!(platform.unknown_ends(), 0);
}

#[test]
fn concurrent_end_and_expiration_release_once() {
    for _ in 0..50 {
        let (platform, manager, seen) = manager_with_counter();
        manager.begin();
        let ender = manager.clone();
        let expirer = Arc::clone(&platform);
        let a = std::thread::spawn(move || {
            ender.end();
        });
        let b = std::thread::spawn(move || {
            expirer.fire_expiration();
        });
        a.join().unwrap();
        b.join().unwrap();
        assert_eq!(platform.outstanding_grants(), 0);
        assert_eq!(platform.grants_ended(), 1);
        assert_eq!(platform.unknown_ends(), 0);
        assert!(seen.lock().unwrap().len() <= 1);
    }
}
