//! The process-wide execution grant and its Idle/Extended state machine.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use super::grant::ExecutionGrant;
use crate::platform::{ExecutionHost, ExpirationHandler};

/// Why the execution window closed without the caller ending it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirationCause {
    /// The OS budget ran out while the grant was held.
    Expired,
    /// The OS refused to grant an extension at all.
    Unavailable,
}

/// Told when the window closes involuntarily, after the grant is released.
pub type ExpirationObserver = Arc<dyn Fn(ExpirationCause) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Idle,
    Extended,
}

/// Result of [`BackgroundExecutionManager::try_begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginOutcome {
    Acquired,
    AlreadyExtended,
    Unavailable,
}

#[derive(Default)]
struct Slot {
    grant: Option<ExecutionGrant>,
    next_generation: u64,
}

struct Inner {
    host: Arc<dyn ExecutionHost>,
    slot: Mutex<Slot>,
    observer: RwLock<Option<ExpirationObserver>>,
}

impl Inner {
    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop the held grant (ending the OS task) while the slot is locked, so a
    /// concurrent `begin` can never overlap it. With `Some(generation)` only
    /// that grant is released.
    fn release(&self, generation: Option<u64>) -> bool {
        let mut slot = self.lock_slot();
        let matches = match (&slot.grant, generation) {
            (Some(_), None) => true,
            (Some(grant), Some(expected)) => grant.generation() == expected,
            (None, _) => false,
        };
        if !matches {
            return false;
        }
        if let Some(grant) = slot.grant.take() {
            tracing::info!(task = ?grant.task(), generation = grant.generation(), "execution grant released");
            drop(grant);
        }
        true
    }

    fn expire(&self, generation: u64) {
        if !self.release(Some(generation)) {
            tracing::debug!(generation, "expiration for a grant already ended; ignored");
            return;
        }
        tracing::warn!(generation, "execution grant expired before transfer finished");
        self.notify(ExpirationCause::Expired);
    }

    fn notify(&self, cause: ExpirationCause) {
        let observer = self
            .observer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(observer) = observer else {
            return;
        };
        if panic::catch_unwind(AssertUnwindSafe(|| observer(cause))).is_err() {
            tracing::warn!(?cause, "expiration observer panicked; grant was already released");
        }
    }
}

/// Owns the process-wide execution grant. Cloning yields another handle to
/// the same grant.
#[derive(Clone)]
pub struct BackgroundExecutionManager {
    inner: Arc<Inner>,
}

impl BackgroundExecutionManager {
    pub fn new(host: Arc<dyn ExecutionHost>) -> Self {
        Self {
            inner: Arc::new(Inner {
                host,
                slot: Mutex::new(Slot::default()),
                observer: RwLock::new(None),
            }),
        }
    }

    /// Install the observer told about involuntary window closures. Replaces
    /// any previous observer.
    pub fn set_expiration_observer(&self, observer: ExpirationObserver) {
        *self
            .inner
            .observer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(observer);
    }

    /// Idle -> Extended. No-op when a grant is already held. If the OS refuses,
    /// the observer hears `ExpirationCause::Unavailable`.
    pub fn begin(&self) {
        if self.try_begin() == BeginOutcome::Unavailable {
            self.notify_unavailable();
        }
    }

    /// Like [`begin`](Self::begin) but leaves the `Unavailable` notification to
    /// the caller, for callers that hold their own lock and must notify after
    /// releasing it.
    pub fn try_begin(&self) -> BeginOutcome {
        let mut slot = self.inner.lock_slot();
        if slot.grant.is_some() {
            tracing::debug!("execution grant already held; begin ignored");
            return BeginOutcome::AlreadyExtended;
        }
        slot.next_generation += 1;
        let generation = slot.next_generation;

        let weak = Arc::downgrade(&self.inner);
        let on_expire: ExpirationHandler = Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.expire(generation);
            }
        });

        match ExecutionGrant::acquire(&self.inner.host, generation, on_expire) {
            Ok(grant) => {
                tracing::info!(task = ?grant.task(), generation, "execution grant acquired");
                slot.grant = Some(grant);
                BeginOutcome::Acquired
            }
            Err(err) => {
                tracing::warn!(error = %err, "execution window already closed");
                BeginOutcome::Unavailable
            }
        }
    }

    /// Deliver `ExpirationCause::Unavailable` to the observer.
    pub fn notify_unavailable(&self) {
        self.inner.notify(ExpirationCause::Unavailable);
    }

    /// Extended -> Idle. Ending while idle, including after the OS already
    /// expired the grant, does nothing. Returns whether a grant was released.
    pub fn end(&self) -> bool {
        let released = self.inner.release(None);
        if !released {
            tracing::debug!("no execution grant held; end ignored");
        }
        released
    }

    pub fn state(&self) -> ExecutionState {
        if self.inner.lock_slot().grant.is_some() {
            ExecutionState::Extended
        } else {
            ExecutionState::Idle
        }
    }

    /// Grants currently held: always 0 or 1.
    pub fn outstanding(&self) -> usize {
        usize::from(self.inner.lock_slot().grant.is_some())
    }
}
