//! Byte-source front end.
//!
//! Input arrives as chunks from a [`ChunkFeed`]. A [`TagReader`] pulls
//! those chunks only when the next tag needs more bytes, so reading stops
//! as soon as the session has enough. [`SubtitleExtractor`] drives this
//! loop from a byte slice, a file or any [`Read`] implementation.
//!
//! # Example
//!
//! ```no_run
//! use mkvsubs::{ExtractError, ExtractOptions, SubtitleExtractor, TerminationPolicy};
//!
//! let options = ExtractOptions::new().with_termination(TerminationPolicy::new().max_entries(5000));
//! let files = SubtitleExtractor::with_options(options).extract_file("episode01.mkv")?;
//! for file in &files {
//!     println!("{}: {} bytes", file.name, file.data.len());
//! }
//! # Ok::<(), ExtractError>(())
//! ```

use std::cell::{Cell, RefCell};
use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::Path;
use std::rc::Rc;

use bytes::{Buf, Bytes};

use crate::attachment::AttachmentCollector;
use crate::config::ExtractOptions;
use crate::ebml::TagReader;
use crate::error::ExtractError;
use crate::progress::{OperationType, ProgressTracker};
use crate::session::{ExtractionSession, Flow};
use crate::subtitle::SubtitleFile;

/// Something that hands out input one chunk at a time.
pub(crate) trait ChunkFeed {
    /// The next chunk, or `None` at end of input.
    fn next_chunk(&mut self) -> io::Result<Option<Bytes>>;
}

/// Chunks of at most `chunk_size` bytes read from a [`Read`].
pub(crate) struct ReadFeed<R> {
    reader: R,
    chunk_size: usize,
}

impl<R: Read> ReadFeed<R> {
    pub(crate) fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl<R: Read> ChunkFeed for ReadFeed<R> {
    fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        let mut buffer = vec![0u8; self.chunk_size];
        loop {
            match self.reader.read(&mut buffer) {
                Ok(0) => return Ok(None),
                Ok(read) => {
                    buffer.truncate(read);
                    return Ok(Some(Bytes::from(buffer)));
                }
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => return Err(error),
            }
        }
    }
}

/// Counters shared between the driving loop and the [`ChunkSource`] owned
/// by the tag reader.
pub(crate) struct FeedState {
    bytes_in: Cell<u64>,
    cues: Cell<usize>,
    /// Once set, no further chunk is pulled.
    draining: Cell<bool>,
    /// Why the source stopped, when it was not the end of input.
    failure: RefCell<Option<ExtractError>>,
    progress: RefCell<ProgressTracker>,
}

impl FeedState {
    pub(crate) fn new(progress: ProgressTracker) -> Rc<Self> {
        Rc::new(Self {
            bytes_in: Cell::new(0),
            cues: Cell::new(0),
            draining: Cell::new(false),
            failure: RefCell::new(None),
            progress: RefCell::new(progress),
        })
    }

    pub(crate) fn bytes_in(&self) -> u64 {
        self.bytes_in.get()
    }

    pub(crate) fn set_cues(&self, cues: usize) {
        self.cues.set(cues);
    }

    /// Stop pulling chunks; the reader sees end of input once its buffer
    /// is exhausted.
    pub(crate) fn drain(&self) {
        self.draining.set(true);
    }

    /// The cancellation or I/O error the source ran into, if any.
    pub(crate) fn take_failure(&self) -> Option<ExtractError> {
        self.failure.borrow_mut().take()
    }

    pub(crate) fn finish_progress(&self) {
        self.progress.borrow_mut().finish(self.cues.get());
    }
}

/// [`Read`] adapter the tag reader pulls from.
///
/// Cancellation is checked before every new chunk. Cancellation and I/O
/// failures are recorded in the shared [`FeedState`] so the caller can
/// report them instead of the decode error the reader turns them into.
pub(crate) struct ChunkSource<F> {
    feed: F,
    pending: Bytes,
    state: Rc<FeedState>,
    options: ExtractOptions,
}

impl<F: ChunkFeed> ChunkSource<F> {
    pub(crate) fn new(feed: F, state: Rc<FeedState>, options: &ExtractOptions) -> Self {
        Self {
            feed,
            pending: Bytes::new(),
            state,
            options: options.clone(),
        }
    }

    fn fail(&self, error: ExtractError) -> io::Error {
        let message = error.to_string();
        *self.state.failure.borrow_mut() = Some(error);
        io::Error::other(message)
    }
}

impl<F: ChunkFeed> Read for ChunkSource<F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while !self.pending.has_remaining() {
            if self.state.draining.get() {
                return Ok(0);
            }
            if self.options.is_cancelled() {
                return Err(self.fail(ExtractError::Cancelled));
            }
            match self.feed.next_chunk() {
                Ok(Some(chunk)) => {
                    let read = chunk.len();
                    self.state.bytes_in.set(self.state.bytes_in.get() + read as u64);
                    self.state
                        .progress
                        .borrow_mut()
                        .advance(read, self.state.cues.get());
                    self.pending = chunk;
                }
                Ok(None) => return Ok(0),
                Err(error) => return Err(self.fail(error.into())),
            }
        }

        let count = buf.len().min(self.pending.remaining());
        self.pending.copy_to_slice(&mut buf[..count]);
        Ok(count)
    }
}

/// Run one extraction over `feed`.
///
/// The session sees every event until it asks to stop. After that, only
/// attachment events already buffered by the reader are consumed, and a
/// decode error in that tail is ignored.
pub(crate) fn extract_from_feed<F: ChunkFeed>(
    feed: F,
    options: &ExtractOptions,
    total_bytes: Option<u64>,
) -> Result<Vec<SubtitleFile>, ExtractError> {
    let mut session = ExtractionSession::new(options);
    if options.is_cancelled() {
        return Err(session.fail(ExtractError::Cancelled));
    }

    let state = FeedState::new(ProgressTracker::new(
        options.progress.clone(),
        OperationType::SubtitleExtraction,
        total_bytes,
        options.batch_size,
    ));
    let source = ChunkSource::new(feed, Rc::clone(&state), options);
    let tags = TagReader::with_max_element_size(source, options.max_element_size);

    let mut stopped = false;
    for event in tags {
        match event {
            Ok(event) if stopped => {
                if AttachmentCollector::wants(&event) {
                    session.handle(&event);
                }
            }
            Ok(event) => {
                let flow = session.handle(&event);
                state.set_cues(session.cue_count());
                if flow == Flow::Stop {
                    log::debug!(
                        "Stopped reading after {} bytes; draining buffered attachments",
                        state.bytes_in()
                    );
                    stopped = true;
                    state.drain();
                }
            }
            Err(error) if stopped => {
                log::debug!("Ignoring trailing data after early stop: {error}");
                break;
            }
            Err(error) => {
                let error = state.take_failure().unwrap_or(error);
                return Err(session.fail(error));
            }
        }
    }

    if let Some(error) = state.take_failure() {
        return Err(session.fail(error));
    }
    if state.bytes_in() == 0 {
        return Err(session.fail(ExtractError::NoInput));
    }

    state.finish_progress();
    log::debug!(
        "Finished reading after {} bytes ({})",
        state.bytes_in(),
        session
            .termination_reason()
            .map_or_else(|| "end of input".to_string(), |reason| reason.to_string())
    );
    session.finish()
}

/// Extracts subtitle documents and attachments from Matroska input.
///
/// Cheap to construct; each call runs an independent extraction.
#[derive(Debug, Clone, Default)]
pub struct SubtitleExtractor {
    options: ExtractOptions,
}

impl SubtitleExtractor {
    /// Create an extractor with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor with the given options.
    pub fn with_options(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// The options in use.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract from an in-memory container.
    ///
    /// # Errors
    ///
    /// [`ExtractError::NoInput`] for an empty slice, otherwise as
    /// [`extract_reader`](SubtitleExtractor::extract_reader).
    pub fn extract_bytes(&self, data: &[u8]) -> Result<Vec<SubtitleFile>, ExtractError> {
        if data.is_empty() {
            return Err(ExtractError::NoInput);
        }
        self.run(data, Some(data.len() as u64))
    }

    /// Extract from a file on disk.
    ///
    /// # Errors
    ///
    /// [`ExtractError::IoError`] if the file cannot be opened or read,
    /// [`ExtractError::NoInput`] if it is empty, otherwise as
    /// [`extract_reader`](SubtitleExtractor::extract_reader).
    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<SubtitleFile>, ExtractError> {
        let path = path.as_ref();
        log::debug!("Extracting subtitles from {}", path.display());
        let file = File::open(path)?;
        let total = file.metadata().ok().map(|metadata| metadata.len());
        if total == Some(0) {
            return Err(ExtractError::NoInput);
        }
        self.run(file, total)
    }

    /// Extract from any reader, in chunks of the configured size.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::NoInput`] if the reader yields no bytes.
    /// - [`ExtractError::Decode`] if the input is not well-formed EBML or
    ///   ends in the middle of an element.
    /// - [`ExtractError::NoDataFound`] if no subtitle was recovered.
    /// - [`ExtractError::Cancelled`] if the cancellation token fired.
    /// - [`ExtractError::IoError`] if reading fails.
    pub fn extract_reader<R: Read>(&self, reader: R) -> Result<Vec<SubtitleFile>, ExtractError> {
        self.run(reader, None)
    }

    fn run<R: Read>(
        &self,
        reader: R,
        total_bytes: Option<u64>,
    ) -> Result<Vec<SubtitleFile>, ExtractError> {
        let feed = ReadFeed::new(reader, self.options.chunk_size);
        extract_from_feed(feed, &self.options, total_bytes)
    }
}
