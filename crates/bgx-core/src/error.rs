//! Failures reported by the platform seams.
//!
//! None of these are fatal: the managers log them and degrade to "no visible
//! notification" or "no extended execution window".

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BgxError {
    /// The OS refused to extend execution (e.g. no background budget left).
    #[error("execution grant unavailable: {0}")]
    GrantUnavailable(String),
    /// The notification center rejected a post.
    #[error("notification rejected: {0}")]
    NotificationRejected(String),
}
