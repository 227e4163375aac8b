//! # mkvsubs
//!
//! Streaming subtitle extraction from Matroska / WebM containers.
//!
//! `mkvsubs` reads an MKV byte stream incrementally, finds its subtitle
//! tracks, rebuilds each one into a complete SRT or ASS document and
//! recovers subtitle files stored as attachments. It never loads the whole
//! container: once every subtitle track has enough cues (or one track hits
//! the cap, or the stream goes quiet) reading stops and the documents are
//! assembled from what was collected.
//!
//! ## Quick Start
//!
//! ### Extract every subtitle
//!
//! ```no_run
//! use mkvsubs::SubtitleExtractor;
//!
//! let files = SubtitleExtractor::new().extract_file("input.mkv").unwrap();
//! for file in files {
//!     if let Some(name) = file.safe_file_name() {
//!         std::fs::write(name, file.data.as_bytes()).unwrap();
//!     }
//! }
//! ```
//!
//! ### Read the whole file and deliver WebVTT
//!
//! ```no_run
//! use mkvsubs::{ExtractOptions, SrtOutput, SubtitleExtractor};
//!
//! let options = ExtractOptions::new()
//!     .without_early_termination()
//!     .with_srt_output(SrtOutput::Vtt);
//! let files = SubtitleExtractor::with_options(options)
//!     .extract_file("input.mkv")
//!     .unwrap();
//! ```
//!
//! ### Convert between formats
//!
//! ```
//! use mkvsubs::convert::srt_to_vtt;
//!
//! let vtt = srt_to_vtt("1\n00:00:01,000 --> 00:00:02,500\nHello\n\n");
//! assert!(vtt.starts_with("WEBVTT\n\n"));
//! ```
//!
//! ## Features
//!
//! - **Pull-based EBML decoding** on `webm_iterable`: bytes are read only
//!   when the next element needs them, chunk boundaries may fall anywhere
//! - **Subtitle tracks**: ASS tracks keep their script header and merge
//!   split dialogue fragments; other text tracks become SRT
//! - **Attachments**: embedded `.srt`, `.ass`/`.ssa` and `.vtt` files are
//!   returned as-is, fonts and other binaries as raw bytes
//! - **Early termination**: configurable per-track minimum, per-track cap
//!   and idle ceiling
//! - **Conversion**: SRT to WebVTT and ASS, WebVTT and ASS back to SRT
//! - **Progress & cancellation**: byte-based callbacks and
//!   `CancellationToken`
//! - **Probing and validation**: list tracks without extracting, sniff the
//!   EBML magic
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `async` | `ExtractionWorker` and `extract_stream` via Tokio |
//! | `full` | Enables all of the above |

pub mod assemble;
pub mod attachment;
pub mod config;
pub mod convert;
pub mod demux;
pub mod ebml;
pub mod error;
pub mod extractor;
pub mod policy;
pub mod probe;
pub mod progress;
pub mod session;
#[cfg(feature = "async")]
pub mod stream;
pub mod subtitle;
pub mod timestamp;
pub mod track;
pub mod validation;

pub use attachment::EmbeddedFile;
pub use config::{DEFAULT_CHUNK_SIZE, ExtractOptions, SrtOutput};
pub use error::ExtractError;
pub use extractor::SubtitleExtractor;
pub use policy::{TerminationPolicy, TerminationReason};
pub use probe::MatroskaProbe;
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use session::{ExtractionSession, Flow, SessionState};
#[cfg(feature = "async")]
pub use stream::{ExtractionMessage, ExtractionWorker, extract_stream};
pub use subtitle::{SubtitleData, SubtitleFile, SubtitleKind};
pub use track::{TrackDescriptor, TrackKind};
pub use validation::ValidationReport;
