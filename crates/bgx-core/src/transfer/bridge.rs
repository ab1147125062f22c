//! Maps engine events onto the progress notification.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::progress::{ProgressEvent, TransferEvent, TransferOutcome};
use crate::notification::{clamp_progress, ProgressNotificationController};

/// Drives one notification session from one transfer's events: the first
/// progress report shows it, later ones update it, the outcome hides it.
pub struct TransferBridge {
    controller: Arc<ProgressNotificationController>,
    title: String,
    started: bool,
    finished: bool,
}

impl TransferBridge {
    pub fn new(controller: Arc<ProgressNotificationController>, title: impl Into<String>) -> Self {
        Self {
            controller,
            title: title.into(),
            started: false,
            finished: false,
        }
    }

    /// Returns whether the report reached the OS surface.
    pub fn on_progress(&mut self, event: &ProgressEvent) -> bool {
        if self.finished {
            tracing::debug!("progress after transfer finished; ignored");
            return false;
        }
        let progress = if event.is_terminal {
            1.0
        } else {
            clamp_progress(event.fraction_complete)
        };
        let body = match &event.stats {
            Some(stats) if !event.is_terminal => stats.describe(),
            _ => format!("{:.0}%", progress * 100.0),
        };
        if !self.started {
            self.started = true;
            return self.controller.show(&self.title, &body, progress);
        }
        self.controller.update(&self.title, &body, progress)
    }

    /// Close the session for any outcome.
    pub fn on_finished(&mut self, outcome: &TransferOutcome) {
        match outcome {
            TransferOutcome::Completed => tracing::info!(title = %self.title, "transfer completed"),
            TransferOutcome::Failed(reason) => {
                tracing::warn!(title = %self.title, %reason, "transfer failed")
            }
            TransferOutcome::Cancelled => tracing::info!(title = %self.title, "transfer cancelled"),
        }
        self.close();
    }

    fn close(&mut self) {
        self.finished = true;
        self.controller.hide();
    }
}

/// Drain engine events until the transfer finishes. If the engine drops its
/// sender without an outcome the session is closed anyway and `None` is
/// returned.
pub async fn run_progress_loop(
    mut events: mpsc::Receiver<TransferEvent>,
    mut bridge: TransferBridge,
) -> Option<TransferOutcome> {
    while let Some(event) = events.recv().await {
        match event {
            TransferEvent::Progress(progress) => {
                bridge.on_progress(&progress);
            }
            TransferEvent::Finished(outcome) => {
                bridge.on_finished(&outcome);
                return Some(outcome);
            }
        }
    }
    tracing::warn!("transfer engine went away without an outcome; closing session");
    bridge.close();
    None
}
