//! OS seams: execution extension, notification center, permission prompt.
//!
//! The core never talks to the operating system directly. A host application
//! implements these traits over its native bridge; [`memory::MemoryPlatform`]
//! implements all three in-process for the simulator and tests.
//!
//! Implementations must not call back into the core synchronously from inside
//! any of these methods. Expiration handlers and delegate events are delivered
//! later, from whatever context the OS chooses.

pub mod memory;

use std::sync::Arc;

use crate::error::BgxError;
use crate::notification::NotificationHandler;
use crate::permission::PermissionOutcome;

/// Called by the OS when the execution budget runs out before the grant was ended.
pub type ExpirationHandler = Box<dyn FnOnce() + Send + 'static>;

/// OS identifier for one background-task grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

/// Grants and revokes permission to keep running while suspended.
pub trait ExecutionHost: Send + Sync {
    /// Request an extension. `on_expire` fires at most once, only if the task
    /// is still outstanding when the OS budget runs out.
    fn begin_background_task(&self, on_expire: ExpirationHandler) -> Result<TaskId, BgxError>;

    /// Release a previously granted extension.
    fn end_background_task(&self, task: TaskId);
}

/// One post to the OS notification surface.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    /// Stable key; a post with an existing identifier replaces that notification.
    pub identifier: String,
    pub title: String,
    pub body: String,
    /// Fraction complete in [0.0, 1.0].
    pub progress: f64,
    /// Platform icon resource name (ignored where the app icon is always used).
    pub small_icon: Option<String>,
}

impl NotificationRequest {
    /// Progress as a whole percentage, clamped to 0..=100.
    pub fn percent(&self) -> u8 {
        (self.progress * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// Local notification surface plus its single interaction-delegate slot.
pub trait NotificationCenter: Send + Sync {
    fn post(&self, request: &NotificationRequest) -> Result<(), BgxError>;

    fn remove(&self, identifier: &str);

    /// Currently installed interaction delegate, if any.
    fn delegate(&self) -> Option<Arc<dyn NotificationHandler>>;

    fn set_delegate(&self, delegate: Arc<dyn NotificationHandler>);
}

/// User authorization for local notifications.
pub trait PermissionPrompt: Send + Sync {
    /// Answer already on record, without prompting.
    fn authorization_status(&self) -> PermissionOutcome;

    /// Show the system prompt and return the user's answer.
    fn prompt(&self) -> PermissionOutcome;
}
