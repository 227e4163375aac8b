//! Error types for the `mkvsubs` crate.
//!
//! This module defines [`ExtractError`], the unified error type returned by
//! every fallible operation in the crate. Each extraction request ends in
//! exactly one success or exactly one of these errors.

use std::io::Error as IoError;

use thiserror::Error;

/// The unified error type for all `mkvsubs` operations.
///
/// Every public method that can fail returns `Result<T, ExtractError>`.
/// Early termination is not an error: a session that stops reading because
/// it already has enough cues finalizes normally.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtractError {
    /// No input bytes were provided. Extraction never started.
    #[error("No file provided")]
    NoInput,

    /// The byte stream violates the EBML grammar.
    ///
    /// Anything accumulated before the failure is discarded.
    #[error("Malformed EBML at byte {offset}: {reason}")]
    Decode {
        /// Stream offset of the last element decoded before the failure.
        offset: u64,
        /// What the tag reader could not accept.
        reason: String,
    },

    /// Parsing finished (fully or early) without producing a single
    /// subtitle document or subtitle attachment.
    #[error("No data found")]
    NoDataFound,

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// An I/O error occurred while reading the input.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// Subtitle text handed to a converter contained no usable cue.
    #[error("Invalid subtitle document: {0}")]
    InvalidSubtitle(String),

    /// The background extraction worker stopped before replying.
    #[error("Extraction worker closed")]
    WorkerClosed,
}

impl ExtractError {
    /// Shorthand used by the tag reader.
    pub(crate) fn decode(offset: u64, reason: impl Into<String>) -> Self {
        ExtractError::Decode {
            offset,
            reason: reason.into(),
        }
    }
}
