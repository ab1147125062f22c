//! RAII grant that ends the background task when dropped.

use std::sync::Arc;

use crate::error::BgxError;
use crate::platform::{ExecutionHost, ExpirationHandler, TaskId};

/// An outstanding execution extension. Only the manager constructs one, and
/// dropping it is the only way the task gets ended.
pub(super) struct ExecutionGrant {
    host: Arc<dyn ExecutionHost>,
    task: TaskId,
    generation: u64,
}

impl ExecutionGrant {
    pub(super) fn acquire(
        host: &Arc<dyn ExecutionHost>,
        generation: u64,
        on_expire: ExpirationHandler,
    ) -> Result<Self, BgxError> {
        let task = host.begin_background_task(on_expire)?;
        Ok(Self {
            host: Arc::clone(host),
            task,
            generation,
        })
    }

    pub(super) fn task(&self) -> TaskId {
        self.task
    }

    /// Distinguishes this grant from earlier ones so a late expiration for an
    /// already-ended grant cannot release its successor.
    pub(super) fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for ExecutionGrant {
    fn drop(&mut self) {
        self.host.end_background_task(self.task);
    }
}
