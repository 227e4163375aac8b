//! Lightweight track listing.
//!
//! [`MatroskaProbe`] reads only as far as the end of the `Tracks` section
//! and reports every declared track, whatever its type. Useful for checking
//! what a file carries before extracting from it.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::rc::Rc;

use crate::config::{DEFAULT_CHUNK_SIZE, ExtractOptions};
use crate::ebml::TagReader;
use crate::error::ExtractError;
use crate::extractor::{ChunkSource, FeedState, ReadFeed};
use crate::progress::{OperationType, ProgressTracker};
use crate::track::{ClassifierEvent, TrackClassifier, TrackDescriptor};

/// Lightweight Matroska probe.
///
/// # Example
///
/// ```no_run
/// use mkvsubs::MatroskaProbe;
///
/// for track in MatroskaProbe::probe("movie.mkv")? {
///     println!("#{} {} [{}] {:?}", track.number, track.kind, track.language, track.codec_id);
/// }
/// # Ok::<(), mkvsubs::ExtractError>(())
/// ```
pub struct MatroskaProbe;

impl MatroskaProbe {
    /// List the tracks of a file.
    ///
    /// # Errors
    ///
    /// [`ExtractError::IoError`] if the file cannot be read, otherwise as
    /// [`probe_reader`](MatroskaProbe::probe_reader).
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<Vec<TrackDescriptor>, ExtractError> {
        Self::probe_reader(File::open(path)?)
    }

    /// List the tracks of an in-memory container.
    pub fn probe_bytes(data: &[u8]) -> Result<Vec<TrackDescriptor>, ExtractError> {
        Self::probe_reader(data)
    }

    /// List the tracks found in `reader`, in declaration order.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::NoInput`] if the reader yields no bytes.
    /// - [`ExtractError::Decode`] if the input is not well-formed EBML.
    /// - [`ExtractError::NoDataFound`] if the input has no `Tracks` section.
    pub fn probe_reader<R: Read>(reader: R) -> Result<Vec<TrackDescriptor>, ExtractError> {
        let options = ExtractOptions::new();
        let state = FeedState::new(ProgressTracker::new(
            options.progress.clone(),
            OperationType::Probe,
            None,
            options.batch_size,
        ));
        let source = ChunkSource::new(
            ReadFeed::new(reader, DEFAULT_CHUNK_SIZE),
            Rc::clone(&state),
            &options,
        );

        let mut classifier = TrackClassifier::new();
        let mut tracks = Vec::new();
        for event in TagReader::new(source) {
            let event = match event {
                Ok(event) => event,
                Err(error) => return Err(state.take_failure().unwrap_or(error)),
            };
            match classifier.handle(&event) {
                Some(ClassifierEvent::TrackClosed(track)) => tracks.push(track),
                Some(ClassifierEvent::TracksClosed { .. }) => {
                    log::debug!(
                        "Probe found {} track(s) in {} bytes",
                        tracks.len(),
                        state.bytes_in()
                    );
                    return Ok(tracks);
                }
                None => {}
            }
        }

        if state.bytes_in() == 0 {
            return Err(ExtractError::NoInput);
        }
        if tracks.is_empty() {
            return Err(ExtractError::NoDataFound);
        }
        Ok(tracks)
    }
}
