//! One-shot notification authorization.
//!
//! The OS prompt is shown at most once per gate, and only when no answer is on
//! record yet. Every later call returns the cached outcome.

use std::sync::{Arc, Mutex, PoisonError};

use crate::platform::PermissionPrompt;

/// User's answer to the notification authorization prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionOutcome {
    Granted,
    /// Terminal and user-visible; transfers continue without a notification.
    Denied,
    #[default]
    Undetermined,
}

impl PermissionOutcome {
    /// Whether posting is worth attempting. Only an explicit denial rules it out.
    pub fn allows_posting(self) -> bool {
        !matches!(self, PermissionOutcome::Denied)
    }
}

pub struct PermissionGate {
    prompt: Arc<dyn PermissionPrompt>,
    answer: Mutex<Option<PermissionOutcome>>,
}

impl PermissionGate {
    pub fn new(prompt: Arc<dyn PermissionPrompt>) -> Self {
        Self {
            prompt,
            answer: Mutex::new(None),
        }
    }

    /// Ask for authorization, prompting only if nothing is on record.
    pub fn request_permission(&self) -> PermissionOutcome {
        // Held across the prompt so concurrent callers never prompt twice.
        let mut answer = self.answer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = *answer {
            return cached;
        }

        let outcome = match self.prompt.authorization_status() {
            PermissionOutcome::Undetermined => {
                tracing::debug!("prompting for notification permission");
                self.prompt.prompt()
            }
            recorded => recorded,
        };
        match outcome {
            PermissionOutcome::Granted => tracing::info!("notification permission granted"),
            PermissionOutcome::Denied => {
                tracing::warn!("notification permission denied; progress will not be shown")
            }
            PermissionOutcome::Undetermined => {
                tracing::debug!("notification permission still undetermined")
            }
        }
        *answer = Some(outcome);
        outcome
    }

    /// Outcome of an earlier request, if one was made.
    pub fn cached(&self) -> Option<PermissionOutcome> {
        *self.answer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
