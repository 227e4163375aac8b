//! Progress reporting and cancellation support.
//!
//! This module provides [`ProgressCallback`] for monitoring how far into the
//! container an extraction has read, [`CancellationToken`] for cooperative
//! cancellation between chunks, and [`ProgressInfo`] for the snapshots.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mkvsubs::{
//!     ExtractError, ExtractOptions, ProgressCallback, ProgressInfo, SubtitleExtractor,
//! };
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("[{:?}] {pct:.1}% read, {} cues", info.operation, info.cues);
//!         }
//!     }
//! }
//!
//! let options = ExtractOptions::new().with_progress(Arc::new(PrintProgress));
//! let files = SubtitleExtractor::with_options(options).extract_file("input.mkv")?;
//! # Ok::<(), ExtractError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// The kind of operation currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Extracting subtitle tracks and attachments.
    SubtitleExtraction,
    /// Listing tracks.
    Probe,
}

/// A snapshot of extraction progress.
///
/// Delivered to [`ProgressCallback::on_progress`] every
/// [`batch_size`](crate::ExtractOptions::with_batch_size) chunks.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of work is being performed.
    pub operation: OperationType,
    /// Chunks fed to the decoder so far.
    pub chunks: u64,
    /// Bytes fed to the decoder so far.
    pub bytes_read: u64,
    /// Input size, if known ahead of time.
    pub total_bytes: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total_bytes` is known.
    pub percentage: Option<f32>,
    /// Subtitle cues collected so far, across all tracks.
    pub cues: usize,
    /// Wall-clock time elapsed since the operation started.
    pub elapsed: Duration,
    /// Estimated time to read the rest of the input, based on current
    /// throughput. Early termination usually makes this pessimistic.
    pub estimated_remaining: Option<Duration>,
}

/// Trait for receiving progress updates during extraction.
///
/// Implementations must be [`Send`] and [`Sync`] because extraction may run
/// on a worker thread.
///
/// Progress callbacks are **infallible**: they observe but cannot halt
/// the operation. Use [`CancellationToken`] for cooperative cancellation.
pub trait ProgressCallback: Send + Sync {
    /// Called at regular intervals during an extraction operation.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. The default.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone this token and share it between threads; call
/// [`cancel`](CancellationToken::cancel) from any thread to stop the
/// associated extraction before its next chunk. A cancelled extraction
/// fails with [`ExtractError::Cancelled`](crate::ExtractError::Cancelled);
/// nothing collected so far is returned.
///
/// # Example
///
/// ```
/// use mkvsubs::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    ///
    /// All clones of this token will observe the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks progress timing and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total_bytes: Option<u64>,
    chunks: u64,
    bytes_read: u64,
    batch_size: u64,
    start_time: Instant,
    chunks_since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total_bytes: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            total_bytes,
            chunks: 0,
            bytes_read: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            chunks_since_last_report: 0,
        }
    }

    /// Record one chunk of `bytes` and fire the callback if the batch
    /// threshold is reached.
    pub(crate) fn advance(&mut self, bytes: usize, cues: usize) {
        self.chunks += 1;
        self.bytes_read += bytes as u64;
        self.chunks_since_last_report += 1;

        if self.chunks_since_last_report >= self.batch_size {
            self.report(cues);
            self.chunks_since_last_report = 0;
        }
    }

    /// Unconditionally emit a final progress report.
    pub(crate) fn finish(&mut self, cues: usize) {
        self.report(cues);
    }

    fn report(&self, cues: usize) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total_bytes
            .filter(|&t| t > 0)
            .map(|t| (self.bytes_read.min(t) as f32 / t as f32) * 100.0);

        let estimated_remaining = if self.bytes_read > 0 {
            self.total_bytes.map(|t| {
                let remaining = t.saturating_sub(self.bytes_read);
                elapsed.mul_f64(remaining as f64 / self.bytes_read as f64)
            })
        } else {
            None
        };

        let info = ProgressInfo {
            operation: self.operation,
            chunks: self.chunks,
            bytes_read: self.bytes_read,
            total_bytes: self.total_bytes,
            percentage,
            cues,
            elapsed,
            estimated_remaining,
        };

        self.callback.on_progress(&info);
    }
}
