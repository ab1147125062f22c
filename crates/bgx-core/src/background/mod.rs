//! Execution-extension lifecycle.
//!
//! [`BackgroundExecutionManager`] owns the single OS grant that keeps the
//! process running while suspended. The grant is released exactly once, by
//! whichever of `end()` or the OS expiration gets there first; the loser is a
//! no-op.

mod grant;
mod manager;

pub use manager::{
    BackgroundExecutionManager, BeginOutcome, ExecutionState, ExpirationCause,
    ExpirationObserver,
};

#[cfg(test)]
mod tests;
