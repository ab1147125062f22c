//! Single progress notification: coalesced updates, grant bracketing and
//! interaction-delegate chaining.

mod controller;
mod delegate;
mod session;
mod throttle;

pub use controller::{ProgressNotificationController, SessionPhase};
pub use delegate::{
    install_chain, DelegateChain, Disposition, ForegroundPresenter, NotificationEvent,
    NotificationHandler, PresentationOptions,
};
pub use session::{clamp_progress, NotificationSession};
pub use throttle::{EmitDecision, EmitReason, ThrottlePolicy};
