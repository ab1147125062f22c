//! Boundary with the transfer engine.
//!
//! The engine sends [`TransferEvent`]s; [`TransferBridge`] turns them into
//! controller show/update/hide calls and [`run_progress_loop`] drains them
//! from a channel.

mod bridge;
mod progress;

pub use bridge::{run_progress_loop, TransferBridge};
pub use progress::{ProgressEvent, TransferEvent, TransferOutcome, TransferProgress};
