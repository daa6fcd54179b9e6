//! Phase-ordered progress reporting for one export run.

use crate::types::ProgressEvent;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

/// Emits a run's [`ProgressEvent`]s, keeping phases non-decreasing.
///
/// A dropped receiver is not an error: the run continues unobserved.
pub(crate) struct ProgressReporter {
    tx: UnboundedSender<ProgressEvent>,
    last_rank: Option<u8>,
    files_done: usize,
    terminated: bool,
}

impl ProgressReporter {
    pub(crate) fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self {
            tx,
            last_rank: None,
            files_done: 0,
            terminated: false,
        }
    }

    pub(crate) fn emit(&mut self, event: ProgressEvent) {
        if self.terminated {
            warn!(?event, "progress event after terminal event dropped");
            return;
        }

        if let Some(rank) = event.phase_rank() {
            if self.last_rank.is_some_and(|last| rank < last) {
                warn!(?event, "out-of-order progress event dropped");
                return;
            }
            self.last_rank = Some(rank);
        }

        if let ProgressEvent::Downloading { files_done, .. } = &event {
            if *files_done < self.files_done {
                warn!(?event, "regressing files_done dropped");
                return;
            }
            self.files_done = *files_done;
        }

        self.terminated = event.is_terminal();
        // Receiver may be gone, that's fine
        let _ = self.tx.send(event);
    }

    /// Callback for archive serialization, usable off the async runtime
    pub(crate) fn archiving_sink(&mut self) -> impl FnMut(u8) + Send + use<> {
        self.last_rank = self.last_rank.max(ProgressEvent::Archiving { percent: 0 }.phase_rank());
        let tx = self.tx.clone();
        let mut last = 0u8;
        move |percent| {
            if percent > last {
                last = percent;
                let _ = tx.send(ProgressEvent::Archiving { percent });
            }
        }
    }
}
