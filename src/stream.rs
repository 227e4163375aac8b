//! Async extraction.
//!
//! Two entry points, both behind the `async` feature:
//!
//! - [`ExtractionWorker`] runs extractions on a dedicated blocking thread
//!   and answers every request with exactly one [`ExtractionMessage`].
//! - [`extract_stream`] consumes an async byte stream chunk by chunk. Chunks
//!   cross a one-slot channel to a blocking decoder thread, so the producer
//!   sees backpressure and early termination stops polling.
//!
//! # Example
//!
//! ```no_run
//! use mkvsubs::{ExtractOptions, ExtractionMessage, ExtractionWorker};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let worker = ExtractionWorker::spawn(ExtractOptions::new());
//! let data = std::fs::read("input.mkv")?;
//! match worker.extract(data).await {
//!     ExtractionMessage::Success(files) => println!("{} file(s)", files.len()),
//!     ExtractionMessage::Error(message) => eprintln!("failed: {message}"),
//! }
//! worker.terminate();
//! # Ok(())
//! # }
//! ```

use std::io::{self, Error as IoError};

use bytes::Bytes;
use futures_core::Stream;
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;

use crate::config::ExtractOptions;
use crate::error::ExtractError;
use crate::extractor::{ChunkFeed, SubtitleExtractor, extract_from_feed};
use crate::progress::CancellationToken;
use crate::subtitle::SubtitleFile;

/// Pending requests a worker will queue before `extract` waits.
const DEFAULT_QUEUE_CAPACITY: usize = 4;

/// The single reply to one extraction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionMessage {
    /// Every recovered document and attachment.
    Success(Vec<SubtitleFile>),
    /// Human-readable failure description.
    Error(String),
}

impl ExtractionMessage {
    /// Returns `true` for [`ExtractionMessage::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionMessage::Success(_))
    }

    /// Wire form: `{"type": "success", "files": [...]}` or
    /// `{"type": "error", "message": "..."}`.
    pub fn to_json(&self) -> Value {
        match self {
            ExtractionMessage::Success(files) => json!({
                "type": "success",
                "files": files.iter().map(SubtitleFile::to_json).collect::<Vec<_>>(),
            }),
            ExtractionMessage::Error(message) => json!({
                "type": "error",
                "message": message,
            }),
        }
    }
}

impl From<Result<Vec<SubtitleFile>, ExtractError>> for ExtractionMessage {
    fn from(result: Result<Vec<SubtitleFile>, ExtractError>) -> Self {
        match result {
            Ok(files) => ExtractionMessage::Success(files),
            Err(error) => ExtractionMessage::Error(error.to_string()),
        }
    }
}

struct Request {
    data: Bytes,
    reply: oneshot::Sender<ExtractionMessage>,
}

/// A background extraction context.
///
/// Requests are processed one at a time on a `spawn_blocking` thread. A
/// worker holds no state between requests. To abandon an in-flight
/// extraction, [`terminate`](ExtractionWorker::terminate) the worker and
/// spawn a new one.
pub struct ExtractionWorker {
    requests: mpsc::Sender<Request>,
    cancellation: CancellationToken,
    handle: JoinHandle<()>,
}

impl ExtractionWorker {
    /// Start a worker on the current Tokio runtime.
    ///
    /// Any cancellation token in `options` is replaced by the worker's own.
    pub fn spawn(options: ExtractOptions) -> Self {
        let cancellation = CancellationToken::new();
        let extractor =
            SubtitleExtractor::with_options(options.with_cancellation(cancellation.clone()));
        let (requests, mut receiver) = mpsc::channel::<Request>(DEFAULT_QUEUE_CAPACITY);

        let handle = tokio::task::spawn_blocking(move || {
            while let Some(request) = receiver.blocking_recv() {
                let message = ExtractionMessage::from(extractor.extract_bytes(&request.data));
                // The requester may have given up; nothing to do then.
                let _ = request.reply.send(message);
            }
            log::debug!("Extraction worker stopped");
        });

        Self {
            requests,
            cancellation,
            handle,
        }
    }

    /// Run one extraction. Always resolves to exactly one message.
    pub async fn extract(&self, data: impl Into<Bytes>) -> ExtractionMessage {
        let (reply, response) = oneshot::channel();
        let request = Request {
            data: data.into(),
            reply,
        };
        if self.requests.send(request).await.is_err() {
            return ExtractionMessage::Error(ExtractError::WorkerClosed.to_string());
        }
        response
            .await
            .unwrap_or_else(|_| ExtractionMessage::Error(ExtractError::WorkerClosed.to_string()))
    }

    /// Stop the worker. An extraction in progress is cancelled before its
    /// next chunk; queued requests are answered with an error.
    pub fn terminate(self) {
        self.cancellation.cancel();
        drop(self.requests);
        drop(self.handle);
    }
}

/// Chunks handed over from the async side, pulled on the decoder thread.
struct ChannelFeed {
    chunks: mpsc::Receiver<Result<Bytes, IoError>>,
}

impl ChunkFeed for ChannelFeed {
    fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        self.chunks.blocking_recv().transpose()
    }
}

/// Extract from an async stream of byte chunks.
///
/// Chunks are decoded on a blocking thread as they arrive; once enough cues
/// are collected the stream is dropped without being polled further.
///
/// # Errors
///
/// As [`SubtitleExtractor::extract_reader`](crate::SubtitleExtractor::extract_reader).
pub async fn extract_stream<S, B>(
    mut stream: S,
    options: ExtractOptions,
) -> Result<Vec<SubtitleFile>, ExtractError>
where
    S: Stream<Item = Result<B, IoError>> + Unpin,
    B: AsRef<[u8]>,
{
    let (sender, receiver) = mpsc::channel(1);
    let decoder = tokio::task::spawn_blocking(move || {
        extract_from_feed(ChannelFeed { chunks: receiver }, &options, None)
    });

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map(|chunk| Bytes::copy_from_slice(chunk.as_ref()));
        let failed = chunk.is_err();
        if sender.send(chunk).await.is_err() {
            log::debug!("Stopped polling the byte stream early");
            break;
        }
        if failed {
            break;
        }
    }
    drop(sender);

    decoder
        .await
        .unwrap_or_else(|_| Err(ExtractError::WorkerClosed))
}
