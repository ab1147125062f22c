//! State of the one progress notification.

use std::time::Instant;

use crate::platform::NotificationRequest;

/// Clamp to [0.0, 1.0]; NaN counts as no progress.
pub fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        return 0.0;
    }
    progress.clamp(0.0, 1.0)
}

/// Latest content plus what was last handed to the OS.
#[derive(Debug, Clone)]
pub struct NotificationSession {
    identifier: String,
    title: String,
    body: String,
    progress: f64,
    updated: bool,
    last_emitted_at: Option<Instant>,
    last_emitted_progress: Option<f64>,
    /// Content changed since the last emission.
    dirty: bool,
}

impl NotificationSession {
    pub fn new(identifier: &str, title: &str, body: &str, progress: f64) -> Self {
        Self {
            identifier: identifier.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            progress: clamp_progress(progress),
            updated: false,
            last_emitted_at: None,
            last_emitted_progress: None,
            dirty: true,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Whether `apply` has been called since the session was shown.
    pub fn is_updated(&self) -> bool {
        self.updated
    }

    pub fn last_emitted_at(&self) -> Option<Instant> {
        self.last_emitted_at
    }

    pub fn last_emitted_progress(&self) -> Option<f64> {
        self.last_emitted_progress
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn apply(&mut self, title: &str, body: &str, progress: f64) {
        let progress = clamp_progress(progress);
        if self.title != title || self.body != body || self.progress != progress {
            self.dirty = true;
        }
        self.title = title.to_string();
        self.body = body.to_string();
        self.progress = progress;
        self.updated = true;
    }

    pub fn mark_emitted(&mut self, now: Instant) {
        self.last_emitted_at = Some(now);
        self.last_emitted_progress = Some(self.progress);
        self.dirty = false;
    }

    /// Forget the last emission so the next one is unconditional (used after
    /// the notification was taken off the surface without ending the session).
    pub fn mark_withdrawn(&mut self) {
        self.last_emitted_at = None;
        self.last_emitted_progress = None;
        self.dirty = true;
    }

    pub fn to_request(&self, small_icon: Option<&str>) -> NotificationRequest {
        NotificationRequest {
            identifier: self.identifier.clone(),
            title: self.title.clone(),
            body: self.body.clone(),
            progress: self.progress,
            small_icon: small_icon.map(str::to_string),
        }
    }
}
