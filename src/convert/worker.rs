//! Background batch conversion.

use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use super::{BatchReport, Converter};
use crate::utils::{progress_channel, ProgressReceiver, ProgressReporter};

/// A batch conversion running on its own tokio task.
///
/// The caller keeps the progress receiver and a cancel handle; cancellation
/// stops new inputs from being started but lets the current one finish.
#[derive(Debug)]
pub struct ConversionWorker {
    handle: JoinHandle<BatchReport>,
    cancel: CancellationToken,
    progress: Option<ProgressReceiver>,
}

impl ConversionWorker {
    /// Start converting `inputs` in the background
    pub fn spawn(converter: Arc<Converter>, inputs: Vec<String>) -> Self {
        let (tx, rx) = progress_channel();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let reporter = ProgressReporter::new(inputs.len(), Some(tx));
            converter.convert_batch(&inputs, &reporter, &token).await
        });

        Self {
            handle,
            cancel,
            progress: Some(rx),
        }
    }

    /// Take the progress receiver. Returns `None` after the first call.
    pub fn take_progress(&mut self) -> Option<ProgressReceiver> {
        self.progress.take()
    }

    /// A handle that cancels this batch, usable from elsewhere
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the batch to complete
    pub async fn join(self) -> Result<BatchReport, JoinError> {
        self.handle.await
    }
}
