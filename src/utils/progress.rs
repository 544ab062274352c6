//! Progress reporting for batch conversions.
//!
//! Progress flows one way, from the converter to whoever is displaying it.
//! Events are fire-and-forget: a dropped receiver never affects the
//! conversion itself.
//!
//! # Usage
//!
//! ```ignore
//! use doi_cite::utils::{progress_channel, ProgressReporter};
//!
//! let (tx, mut rx) = progress_channel();
//! let reporter = ProgressReporter::new(2, Some(tx));
//! reporter.started();
//! reporter.converted(0, "10.1038/nature12373");
//! reporter.failed(1, "garbage", "No DOI found");
//! reporter.finish();
//! ```

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// One step of a batch conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Started {
        total: usize,
    },
    Converted {
        index: usize,
        id: String,
    },
    Failed {
        index: usize,
        input: String,
        message: String,
    },
    Finished {
        succeeded: usize,
        failed: usize,
    },
}

pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Create an unbounded progress channel
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Counts outcomes and forwards them as [`ProgressEvent`]s.
///
/// Uses atomic counters so clones can be updated from concurrent tasks.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    total: usize,
    succeeded: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
    start_time: Instant,
    sender: Option<ProgressSender>,
}

impl ProgressReporter {
    /// Create a reporter for `total` inputs. Without a sender it only counts.
    pub fn new(total: usize, sender: Option<ProgressSender>) -> Self {
        Self {
            total,
            succeeded: Arc::new(AtomicUsize::new(0)),
            failed: Arc::new(AtomicUsize::new(0)),
            start_time: Instant::now(),
            sender,
        }
    }

    /// A reporter that doesn't emit anything
    pub fn quiet(total: usize) -> Self {
        Self::new(total, None)
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.sender {
            // receiver may be gone; progress is advisory
            let _ = sender.send(event);
        }
    }

    pub fn started(&self) {
        self.emit(ProgressEvent::Started { total: self.total });
    }

    /// Record a successful conversion of input `index`
    pub fn converted(&self, index: usize, id: &str) {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
        self.emit(ProgressEvent::Converted {
            index,
            id: id.to_string(),
        });
    }

    /// Record a failed conversion of input `index`
    pub fn failed(&self, index: usize, input: &str, message: &str) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        self.emit(ProgressEvent::Failed {
            index,
            input: input.to_string(),
            message: message.to_string(),
        });
    }

    /// Emit the final counts
    pub fn finish(&self) {
        let succeeded = self.succeeded();
        let failed = self.failed_count();
        tracing::info!(
            "Batch finished: {} succeeded, {} failed in {:?}",
            succeeded,
            failed,
            self.start_time.elapsed()
        );
        self.emit(ProgressEvent::Finished { succeeded, failed });
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::SeqCst)
    }

    pub fn failed_count(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Inputs processed so far, successful or not
    pub fn current(&self) -> usize {
        self.succeeded() + self.failed_count()
    }

    /// Check if every input has been processed
    pub fn is_done(&self) -> bool {
        self.total > 0 && self.current() >= self.total
    }
}
