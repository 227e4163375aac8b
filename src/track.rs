//! Track classification.
//!
//! [`TrackClassifier`] watches the `Tracks` section of the event stream and
//! builds a [`TrackRegistry`] of subtitle tracks. Each `TrackEntry` is
//! collected into a [`TrackEntryBuilder`] that exists only while the entry is
//! open: it is committed or dropped exactly at `end(TrackEntry)`.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::ebml::{ElementId, TagEvent, TagValue};

/// Matroska track type codes.
const TRACK_TYPE_VIDEO: u64 = 1;
const TRACK_TYPE_AUDIO: u64 = 2;
const TRACK_TYPE_SUBTITLE: u64 = 17;

/// Matroska's default when a track carries no `Language` element.
const DEFAULT_LANGUAGE: &str = "eng";

/// Broad category of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
    Subtitle,
    /// Any other type code (buttons, logos, metadata, complex).
    Other(u64),
}

impl TrackKind {
    /// Map a Matroska `TrackType` code.
    pub fn from_code(code: u64) -> Self {
        match code {
            TRACK_TYPE_VIDEO => TrackKind::Video,
            TRACK_TYPE_AUDIO => TrackKind::Audio,
            TRACK_TYPE_SUBTITLE => TrackKind::Subtitle,
            other => TrackKind::Other(other),
        }
    }
}

impl Display for TrackKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TrackKind::Video => write!(f, "video"),
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Subtitle => write!(f, "subtitle"),
            TrackKind::Other(code) => write!(f, "other({code})"),
        }
    }
}

/// A track as declared in the container. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackDescriptor {
    /// Track number used by blocks to refer to this track.
    pub number: u64,
    /// Track type.
    pub kind: TrackKind,
    /// Codec identifier such as `S_TEXT/ASS` or `S_TEXT/UTF8`.
    pub codec_id: Option<String>,
    /// `CodecPrivate` decoded as text. For ASS tracks this is the script
    /// header up to and including the `[Events]` format line.
    pub codec_header: String,
    /// Language code.
    pub language: String,
    /// Human-readable track name.
    pub name: Option<String>,
    /// `DefaultDuration` in nanoseconds.
    pub default_duration_ns: Option<u64>,
}

impl TrackDescriptor {
    /// Returns `true` for subtitle tracks.
    pub fn is_subtitle(&self) -> bool {
        self.kind == TrackKind::Subtitle
    }
}

/// Scratch state for the `TrackEntry` currently open.
#[derive(Debug, Default)]
pub struct TrackEntryBuilder {
    number: Option<u64>,
    type_code: Option<u64>,
    codec_id: Option<String>,
    codec_private: Option<String>,
    language: Option<String>,
    name: Option<String>,
    default_duration_ns: Option<u64>,
}

impl TrackEntryBuilder {
    /// Record one leaf element of the entry. Unrelated tags are ignored.
    pub fn apply(&mut self, id: ElementId, value: &TagValue) {
        match (id, value) {
            (ElementId::TrackNumber, TagValue::Unsigned(number)) => self.number = Some(*number),
            (ElementId::TrackType, TagValue::Unsigned(code)) => self.type_code = Some(*code),
            (ElementId::CodecId, TagValue::Text(codec)) => self.codec_id = Some(codec.clone()),
            (ElementId::CodecPrivate, TagValue::Binary(data)) => {
                self.codec_private = Some(String::from_utf8_lossy(data).into_owned());
            }
            (ElementId::Language, TagValue::Text(language)) => {
                self.language = Some(language.clone());
            }
            (ElementId::Name, TagValue::Text(name)) => self.name = Some(name.clone()),
            (ElementId::DefaultDuration, TagValue::Unsigned(duration)) => {
                self.default_duration_ns = Some(*duration);
            }
            _ => {}
        }
    }

    /// Finish the entry. An entry without a track number cannot be
    /// referenced by any block and is dropped.
    pub fn build(self) -> Option<TrackDescriptor> {
        let number = self.number?;
        Some(TrackDescriptor {
            number,
            kind: TrackKind::from_code(self.type_code.unwrap_or(0)),
            codec_id: self.codec_id,
            codec_header: self.codec_private.unwrap_or_default(),
            language: self
                .language
                .filter(|language| !language.is_empty())
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            name: self.name,
            default_duration_ns: self.default_duration_ns,
        })
    }
}

/// Registered subtitle tracks, in declaration order.
///
/// A track's *position* here (not its container track number) indexes its
/// entry log.
#[derive(Debug, Clone, Default)]
pub struct TrackRegistry {
    tracks: Vec<TrackDescriptor>,
}

impl TrackRegistry {
    /// Position of the track with container number `number`.
    pub fn position(&self, number: u64) -> Option<usize> {
        self.tracks.iter().position(|track| track.number == number)
    }

    /// Track at `position`.
    pub fn get(&self, position: usize) -> Option<&TrackDescriptor> {
        self.tracks.get(position)
    }

    /// Number of registered tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Returns `true` if no subtitle track has been registered.
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Iterate over registered tracks.
    pub fn iter(&self) -> impl Iterator<Item = &TrackDescriptor> {
        self.tracks.iter()
    }

    fn register(&mut self, track: TrackDescriptor) {
        self.tracks.push(track);
    }
}

/// What the classifier observed for one event.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierEvent {
    /// A `TrackEntry` closed. Carries every track type, not just subtitles.
    TrackClosed(TrackDescriptor),
    /// The `Tracks` section closed.
    TracksClosed {
        /// Subtitle tracks registered so far.
        subtitle_tracks: usize,
    },
}

/// Builds the subtitle track registry from `Tracks` section events.
///
/// Only the first `Tracks` section is honoured; re-declared tracks in later
/// sections are ignored.
#[derive(Debug, Default)]
pub struct TrackClassifier {
    in_tracks_section: bool,
    section_done: bool,
    pending: Option<TrackEntryBuilder>,
    registry: TrackRegistry,
}

impl TrackClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while inside the `Tracks` section.
    pub fn in_tracks_section(&self) -> bool {
        self.in_tracks_section
    }

    /// Returns `true` once the `Tracks` section closed with at least one
    /// subtitle track.
    pub fn found_subtitle_track(&self) -> bool {
        self.section_done && !self.registry.is_empty()
    }

    /// The registered subtitle tracks.
    pub fn registry(&self) -> &TrackRegistry {
        &self.registry
    }

    /// Consume the classifier, keeping the registry.
    pub fn into_registry(self) -> TrackRegistry {
        self.registry
    }

    /// Process one event.
    pub fn handle(&mut self, event: &TagEvent) -> Option<ClassifierEvent> {
        match event {
            TagEvent::Start(ElementId::Tracks) if !self.section_done => {
                self.in_tracks_section = true;
                None
            }
            TagEvent::Start(ElementId::TrackEntry) if self.in_tracks_section => {
                self.pending = Some(TrackEntryBuilder::default());
                None
            }
            TagEvent::Tag(id, value) if self.in_tracks_section => {
                if let Some(builder) = self.pending.as_mut() {
                    builder.apply(*id, value);
                }
                None
            }
            TagEvent::End(ElementId::TrackEntry) if self.in_tracks_section => {
                let track = self.pending.take()?.build()?;
                if track.is_subtitle() {
                    log::debug!(
                        "Registered subtitle track {} (language={}, codec={:?})",
                        track.number,
                        track.language,
                        track.codec_id
                    );
                    self.registry.register(track.clone());
                }
                Some(ClassifierEvent::TrackClosed(track))
            }
            TagEvent::End(ElementId::Tracks) if self.in_tracks_section => {
                self.in_tracks_section = false;
                self.section_done = true;
                self.pending = None;
                Some(ClassifierEvent::TracksClosed {
                    subtitle_tracks: self.registry.len(),
                })
            }
            _ => None,
        }
    }
}
