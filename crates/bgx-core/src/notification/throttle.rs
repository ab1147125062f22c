//! Rate limit for progress updates.
//!
//! An update goes out when any of these hold: nothing was emitted yet, the
//! progress is terminal (1.0), `min_interval` passed since the last emission,
//! or progress advanced by `min_progress_delta` since the last emission.

use std::time::{Duration, Instant};

use crate::config::ThrottleConfig;

/// Rounding slack for the delta test: an advance of exactly
/// `min_progress_delta` must count even when the subtraction lands just below.
const DELTA_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottlePolicy {
    pub min_interval: Duration,
    pub min_progress_delta: f64,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self::from(&ThrottleConfig::default())
    }
}

impl From<&ThrottleConfig> for ThrottlePolicy {
    fn from(cfg: &ThrottleConfig) -> Self {
        Self {
            min_interval: cfg.min_interval(),
            min_progress_delta: cfg.min_progress_delta.max(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitReason {
    First,
    Terminal,
    Interval,
    Delta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitDecision {
    Emit(EmitReason),
    Suppress,
}

impl ThrottlePolicy {
    /// Decide whether `progress` (already clamped) goes out at `now`.
    pub fn decide(
        &self,
        last_emitted_at: Option<Instant>,
        last_emitted_progress: Option<f64>,
        progress: f64,
        now: Instant,
    ) -> EmitDecision {
        if progress >= 1.0 {
            return EmitDecision::Emit(EmitReason::Terminal);
        }
        let Some(last_at) = last_emitted_at else {
            return EmitDecision::Emit(EmitReason::First);
        };
        if now.saturating_duration_since(last_at) >= self.min_interval {
            return EmitDecision::Emit(EmitReason::Interval);
        }
        let last_progress = last_emitted_progress.unwrap_or(0.0);
        if progress - last_progress + DELTA_EPSILON >= self.min_progress_delta {
            return EmitDecision::Emit(EmitReason::Delta);
        }
        EmitDecision::Suppress
    }
}
