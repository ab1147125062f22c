//! App visibility and active-task bookkeeping.
//!
//! The execution grant is only worth holding while the app is in the
//! background with unfinished transfers. [`BackgroundCoordinator`] watches
//! both and begins/ends the shared grant accordingly; the controller's own
//! show/hide bracketing uses the same grant, so whichever side ends first wins
//! and the other is a no-op.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::background::BackgroundExecutionManager;
use crate::notification::ProgressNotificationController;

#[derive(Debug, Default)]
struct CoordinatorState {
    completed: usize,
    total: usize,
    in_background: bool,
}

impl CoordinatorState {
    fn has_active_tasks(&self) -> bool {
        self.total > 0 && self.completed < self.total
    }
}

pub struct BackgroundCoordinator {
    execution: BackgroundExecutionManager,
    controller: Arc<ProgressNotificationController>,
    state: Mutex<CoordinatorState>,
}

impl BackgroundCoordinator {
    pub fn new(controller: Arc<ProgressNotificationController>) -> Self {
        Self {
            execution: controller.execution().clone(),
            controller,
            state: Mutex::new(CoordinatorState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Report transfer counts. While in the background this begins the grant
    /// when work appears and ends it once everything has finished.
    pub fn update_active_task_count(&self, completed: usize, total: usize) {
        let (in_background, active) = {
            let mut state = self.lock();
            state.completed = completed;
            state.total = total;
            (state.in_background, state.has_active_tasks())
        };
        tracing::debug!(completed, total, "active task count updated");
        if !in_background {
            return;
        }
        if active {
            self.execution.begin();
        } else {
            self.execution.end();
        }
    }

    pub fn has_active_tasks(&self) -> bool {
        self.lock().has_active_tasks()
    }

    pub fn is_in_background(&self) -> bool {
        self.lock().in_background
    }

    /// Begin the grant if unfinished transfers exist and publish any progress
    /// that was held back while in the foreground.
    pub fn on_enter_background(&self) {
        let active = {
            let mut state = self.lock();
            state.in_background = true;
            state.has_active_tasks()
        };
        self.controller.set_app_foreground(false);
        if active {
            self.execution.begin();
        } else {
            tracing::debug!("entered background with no unfinished transfers; not extending");
        }
    }

    /// End the grant; the app runs normally again.
    pub fn on_enter_foreground(&self) {
        self.lock().in_background = false;
        self.execution.end();
        self.controller.set_app_foreground(true);
    }
}
