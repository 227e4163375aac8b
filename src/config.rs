//! Extraction configuration.
//!
//! [`ExtractOptions`] is a builder that threads termination thresholds,
//! output normalization, progress callbacks and cancellation tokens through
//! extraction without polluting every function signature.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mkvsubs::{
//!     CancellationToken, ExtractOptions, ProgressCallback, ProgressInfo, SrtOutput,
//!     TerminationPolicy,
//! };
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{:?}: {} bytes read", info.operation, info.bytes_read);
//!     }
//! }
//!
//! let token = CancellationToken::new();
//! let options = ExtractOptions::new()
//!     .with_termination(TerminationPolicy::new().min_entries(200))
//!     .with_srt_output(SrtOutput::Vtt)
//!     .with_progress(Arc::new(LogProgress))
//!     .with_cancellation(token.clone())
//!     .with_batch_size(16);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::ebml::DEFAULT_MAX_ELEMENT_SIZE;
use crate::policy::TerminationPolicy;
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Default number of bytes read per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Format that SRT documents are delivered in.
///
/// Rebuilt SRT tracks and SRT attachments are converted after extraction;
/// ASS documents are always delivered as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SrtOutput {
    /// Keep SRT. This is the default.
    #[default]
    Srt,
    /// Convert to WebVTT, renaming `.srt` to `.vtt`.
    Vtt,
    /// Convert to ASS, renaming `.srt` to `.ass`.
    Ass,
}

/// Configuration for extraction operations.
///
/// All fields have sensible defaults: a default-constructed value applies
/// the default early-termination thresholds, delivers SRT as SRT and reads
/// 64 KiB chunks.
#[derive(Clone)]
pub struct ExtractOptions {
    /// Early-termination thresholds. `None` reads the whole input.
    pub(crate) termination: Option<TerminationPolicy>,
    /// Bytes per chunk fed to the decoder.
    pub(crate) chunk_size: usize,
    /// Output normalization of SRT documents.
    pub(crate) srt_output: SrtOutput,
    /// Largest element the tag reader accepts.
    pub(crate) max_element_size: u64,
    /// Progress callback. Defaults to a no-op.
    pub(crate) progress: Arc<dyn ProgressCallback>,
    /// Cancellation token. `None` means never cancelled.
    pub(crate) cancellation: Option<CancellationToken>,
    /// How often to fire the progress callback (every N chunks).
    pub(crate) batch_size: u64,
}

impl Debug for ExtractOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractOptions")
            .field("termination", &self.termination)
            .field("chunk_size", &self.chunk_size)
            .field("srt_output", &self.srt_output)
            .field("max_element_size", &self.max_element_size)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractOptions {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self {
            termination: Some(TerminationPolicy::default()),
            chunk_size: DEFAULT_CHUNK_SIZE,
            srt_output: SrtOutput::default(),
            max_element_size: DEFAULT_MAX_ELEMENT_SIZE,
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
        }
    }

    /// Set the early-termination thresholds.
    #[must_use]
    pub fn with_termination(mut self, policy: TerminationPolicy) -> Self {
        self.termination = Some(policy);
        self
    }

    /// Read the input to the end instead of stopping once enough cues have
    /// been collected.
    #[must_use]
    pub fn without_early_termination(mut self) -> Self {
        self.termination = None;
        self
    }

    /// Set the read chunk size in bytes. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Choose the format SRT documents are delivered in.
    #[must_use]
    pub fn with_srt_output(mut self, output: SrtOutput) -> Self {
        self.srt_output = output;
        self
    }

    /// Set the largest element the tag reader will accept. Larger
    /// elements fail the extraction with a decode error.
    #[must_use]
    pub fn with_max_element_size(mut self, size: u64) -> Self {
        self.max_element_size = size;
        self
    }

    /// Attach a progress callback.
    ///
    /// The callback is invoked every [`batch_size`](ExtractOptions::with_batch_size)
    /// chunks and once more when extraction finishes.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// When the token is cancelled, extraction stops before the next chunk
    /// and returns [`ExtractError::Cancelled`](crate::ExtractError::Cancelled).
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set how often the progress callback fires, in chunks.
    /// Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// The configured early-termination thresholds.
    pub fn termination(&self) -> Option<&TerminationPolicy> {
        self.termination.as_ref()
    }

    /// The configured chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// The configured SRT output format.
    pub fn srt_output(&self) -> SrtOutput {
        self.srt_output
    }

    /// Returns `true` if cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
