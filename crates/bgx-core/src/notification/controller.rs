//! Lifecycle of the single progress notification and its execution grant.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use super::delegate::{install_chain, ForegroundPresenter, NotificationHandler};
use super::session::NotificationSession;
use super::throttle::{EmitDecision, ThrottlePolicy};
use crate::background::{BackgroundExecutionManager, BeginOutcome};
use crate::config::{BgxConfig, DisplayMode, NotificationConfig};
use crate::permission::PermissionOutcome;
use crate::platform::NotificationCenter;

/// Controller state as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NoSession,
    /// Shown and not updated since.
    Shown,
    Updated,
}

#[derive(Default)]
struct ControllerState {
    session: Option<NotificationSession>,
    permission: PermissionOutcome,
    /// Unknown visibility counts as background: the session exists to serve
    /// a suspended app.
    in_foreground: bool,
    chain: Option<Arc<dyn NotificationHandler>>,
}

/// Owns the one progress notification and brackets its lifetime with the
/// execution grant: the first `show` begins the grant, `hide` ends it.
pub struct ProgressNotificationController {
    center: Arc<dyn NotificationCenter>,
    execution: BackgroundExecutionManager,
    policy: ThrottlePolicy,
    notification: NotificationConfig,
    state: Mutex<ControllerState>,
}

impl ProgressNotificationController {
    pub fn new(
        center: Arc<dyn NotificationCenter>,
        execution: BackgroundExecutionManager,
        cfg: &BgxConfig,
    ) -> Self {
        let controller = Self {
            center,
            execution,
            policy: ThrottlePolicy::from(&cfg.throttle),
            notification: cfg.notification.clone(),
            state: Mutex::new(ControllerState::default()),
        };
        if controller.notification.display_mode == DisplayMode::Always {
            controller.enable_foreground_display();
        }
        controller
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn identifier(&self) -> &str {
        &self.notification.identifier
    }

    pub fn execution(&self) -> &BackgroundExecutionManager {
        &self.execution
    }

    /// Record the permission outcome. After a denial nothing is posted, but
    /// sessions still bracket the execution grant.
    pub fn set_permission(&self, outcome: PermissionOutcome) {
        self.lock().permission = outcome;
    }

    pub fn phase(&self) -> SessionPhase {
        match &self.lock().session {
            None => SessionPhase::NoSession,
            Some(session) if session.is_updated() => SessionPhase::Updated,
            Some(_) => SessionPhase::Shown,
        }
    }

    /// Copy of the current session, if any.
    pub fn session(&self) -> Option<NotificationSession> {
        self.lock().session.clone()
    }

    fn surface_allowed(&self, state: &ControllerState) -> bool {
        self.notification.show_notification
            && state.permission.allows_posting()
            && (!state.in_foreground
                || self.notification.display_mode == DisplayMode::Always
                || state.chain.is_some())
    }

    fn post(&self, session: &mut NotificationSession, now: Instant) -> bool {
        let request = session.to_request(self.notification.small_icon_name.as_deref());
        match self.center.post(&request) {
            Ok(()) => {
                session.mark_emitted(now);
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, identifier = %request.identifier, "progress notification post failed");
                false
            }
        }
    }

    /// Create or replace the session and post it immediately. The first show
    /// of a session begins the execution grant. Returns whether the content
    /// reached the OS; a suppressed surface still opens the session.
    pub fn show(&self, title: &str, body: &str, progress: f64) -> bool {
        let (begin, posted) = {
            let mut state = self.lock();
            let begin = if state.session.is_none() {
                tracing::info!(identifier = %self.notification.identifier, "progress notification session started");
                self.execution.try_begin()
            } else {
                tracing::debug!("superseding current progress notification");
                BeginOutcome::AlreadyExtended
            };
            let mut session =
                NotificationSession::new(&self.notification.identifier, title, body, progress);
            let posted =
                self.surface_allowed(&state) && self.post(&mut session, Instant::now());
            state.session = Some(session);
            (begin, posted)
        };
        // Observer runs outside our lock; it may call back into hide().
        if begin == BeginOutcome::Unavailable {
            self.execution.notify_unavailable();
        }
        posted
    }

    /// Mutate the session; returns whether the update reached the OS. Updates
    /// inside the throttle window are folded into the session and dropped,
    /// except terminal ones (progress 1.0). No-op after `hide`.
    pub fn update(&self, title: &str, body: &str, progress: f64) -> bool {
        let mut state = self.lock();
        let allowed = self.surface_allowed(&state);
        let Some(session) = state.session.as_mut() else {
            tracing::debug!("progress update with no session; ignored");
            return false;
        };
        session.apply(title, body, progress);

        let now = Instant::now();
        match self.policy.decide(
            session.last_emitted_at(),
            session.last_emitted_progress(),
            session.progress(),
            now,
        ) {
            EmitDecision::Suppress => {
                tracing::trace!(progress = session.progress(), "progress update coalesced");
                false
            }
            EmitDecision::Emit(reason) => {
                if !allowed {
                    return false;
                }
                tracing::trace!(?reason, progress = session.progress(), "emitting progress update");
                self.post(session, now)
            }
        }
    }

    /// Post the latest coalesced content if it has not reached the OS yet.
    pub fn flush(&self) -> bool {
        let mut state = self.lock();
        let allowed = self.surface_allowed(&state);
        match state.session.as_mut() {
            Some(session) if allowed && session.is_dirty() => self.post(session, Instant::now()),
            _ => false,
        }
    }

    /// Remove the notification and end the execution grant. No-op without a session.
    ///
    /// The grant is shared with [`BackgroundCoordinator`](crate::lifecycle::BackgroundCoordinator),
    /// which ends it on return to the foreground, and the OS may have expired
    /// it. In either case the session still closes and there is nothing to end.
    pub fn hide(&self) {
        let mut state = self.lock();
        let Some(session) = state.session.take() else {
            tracing::debug!("hide with no session; ignored");
            return;
        };
        self.center.remove(session.identifier());
        if !self.execution.end() {
            tracing::debug!("execution grant already released before hide");
        }
        tracing::info!(identifier = %session.identifier(), "progress notification session ended");
    }

    /// Report app visibility. In background-only mode, returning to the
    /// foreground takes the notification off the surface (the session stays)
    /// and going back to the background re-posts the latest content.
    pub fn set_app_foreground(&self, in_foreground: bool) {
        let mut state = self.lock();
        if state.in_foreground == in_foreground {
            return;
        }
        state.in_foreground = in_foreground;
        let allowed = self.surface_allowed(&state);

        let Some(session) = state.session.as_mut() else {
            return;
        };
        if in_foreground {
            if !allowed && session.last_emitted_at().is_some() {
                self.center.remove(session.identifier());
                session.mark_withdrawn();
                tracing::debug!("progress notification withdrawn while in foreground");
            }
        } else if allowed && session.is_dirty() {
            self.post(session, Instant::now());
        }
    }

    /// Present this controller's notification as a banner even in the
    /// foreground. The previously installed delegate keeps receiving every
    /// event for other identifiers. Calling again does nothing.
    pub fn enable_foreground_display(&self) {
        let mut state = self.lock();
        if state.chain.is_some() {
            tracing::debug!("foreground display already enabled");
            return;
        }
        let presenter: Arc<dyn NotificationHandler> =
            Arc::new(ForegroundPresenter::new(&self.notification.identifier));
        state.chain = Some(install_chain(self.center.as_ref(), presenter));
        tracing::info!("foreground display of progress notification enabled");
    }

    pub fn foreground_display_enabled(&self) -> bool {
        self.lock().chain.is_some()
    }
}
