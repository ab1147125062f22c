//! Progress and outcome signals produced by the transfer engine.

/// Byte-level snapshot of one transfer (rate, ETA, display text).
#[derive(Debug, Clone, PartialEq)]
pub struct TransferProgress {
    /// Bytes received so far.
    pub bytes_done: u64,
    /// Total size in bytes, when the server reported one.
    pub total_bytes: Option<u64>,
    /// Elapsed time since the transfer started (seconds).
    pub elapsed_secs: f64,
}

impl TransferProgress {
    /// Transfer rate in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if size unknown or rate is 0).
    pub fn eta_secs(&self) -> Option<f64> {
        let total = self.total_bytes?;
        let remaining = total.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0]; None when the total is unknown.
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes? {
            0 => Some(1.0),
            total => Some((self.bytes_done as f64 / total as f64).min(1.0)),
        }
    }

    /// Notification body, e.g. "12.5 / 40.0 MiB (31%)".
    pub fn describe(&self) -> String {
        let done_mib = self.bytes_done as f64 / 1_048_576.0;
        match (self.total_bytes, self.fraction()) {
            (Some(total), Some(fraction)) => format!(
                "{:.1} / {:.1} MiB ({:.0}%)",
                done_mib,
                total as f64 / 1_048_576.0,
                fraction * 100.0
            ),
            _ => format!("{:.1} MiB", done_mib),
        }
    }
}

/// One progress report from the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub fraction_complete: f64,
    /// Last report of the transfer; shown as complete regardless of throttling.
    pub is_terminal: bool,
    /// Optional byte counts for a richer notification body.
    pub stats: Option<TransferProgress>,
}

impl ProgressEvent {
    pub fn new(fraction_complete: f64) -> Self {
        Self {
            fraction_complete,
            is_terminal: false,
            stats: None,
        }
    }

    pub fn terminal() -> Self {
        Self {
            fraction_complete: 1.0,
            is_terminal: true,
            stats: None,
        }
    }

    /// Build from byte counts; unknown totals report 0.
    pub fn from_stats(stats: TransferProgress) -> Self {
        Self {
            fraction_complete: stats.fraction().unwrap_or(0.0),
            is_terminal: false,
            stats: Some(stats),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Completed,
    Failed(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    Progress(ProgressEvent),
    Finished(TransferOutcome),
}
