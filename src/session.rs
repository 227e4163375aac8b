//! Per-request extraction state.
//!
//! An [`ExtractionSession`] owns everything one extraction accumulates: the
//! track registry, the per-track entry logs, termination counters and
//! recovered attachments. It is driven one [`TagEvent`] at a time and
//! finalized exactly once by the consuming [`ExtractionSession::finish`].

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::assemble::assemble_track;
use crate::attachment::AttachmentCollector;
use crate::config::{ExtractOptions, SrtOutput};
use crate::convert::{srt_to_ass, srt_to_vtt};
use crate::demux::{BlockDemuxer, DEFAULT_TIMECODE_SCALE};
use crate::ebml::{ElementId, TagEvent, TagValue};
use crate::error::ExtractError;
use crate::policy::{TerminationPolicy, TerminationReason, TerminationTracker};
use crate::subtitle::{SubtitleData, SubtitleFile, SubtitleKind};
use crate::track::{ClassifierEvent, TrackClassifier};

/// Lifecycle of one extraction.
///
/// A live session is `Running` or `Terminating`; the terminal states are
/// reached by consuming it, so finalization cannot happen twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Consuming events.
    Running,
    /// Enough data collected; only attachment events are still consumed.
    Terminating,
    /// Output produced. Terminal.
    Finalized,
    /// Aborted by an error; partial state discarded. Terminal.
    Failed,
}

impl Display for SessionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SessionState::Running => write!(f, "running"),
            SessionState::Terminating => write!(f, "terminating"),
            SessionState::Finalized => write!(f, "finalized"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}

/// Whether the byte source should keep delivering chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop reading and finalize with what has been collected.
    Stop,
}

/// State for a single extraction request.
#[derive(Debug)]
pub struct ExtractionSession {
    state: SessionState,
    classifier: TrackClassifier,
    /// Created once the `Tracks` section closes with subtitle tracks.
    demuxer: Option<BlockDemuxer>,
    policy: Option<TerminationPolicy>,
    tracker: Option<TerminationTracker>,
    attachments: AttachmentCollector,
    timecode_scale: u64,
    srt_output: SrtOutput,
    termination: Option<TerminationReason>,
}

impl ExtractionSession {
    /// Create a session configured by `options`.
    pub fn new(options: &ExtractOptions) -> Self {
        Self {
            state: SessionState::Running,
            classifier: TrackClassifier::new(),
            demuxer: None,
            policy: options.termination,
            tracker: None,
            attachments: AttachmentCollector::new(),
            timecode_scale: DEFAULT_TIMECODE_SCALE,
            srt_output: options.srt_output,
            termination: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Why the session stopped early, if it did.
    pub fn termination_reason(&self) -> Option<TerminationReason> {
        self.termination
    }

    /// Returns `true` once the `Tracks` section closed with at least one
    /// subtitle track.
    pub fn found_subtitle_track(&self) -> bool {
        self.classifier.found_subtitle_track()
    }

    /// Cues collected so far, across all tracks.
    pub fn cue_count(&self) -> usize {
        self.demuxer.as_ref().map_or(0, BlockDemuxer::cue_count)
    }

    /// Attachments completed so far.
    pub fn attachment_count(&self) -> usize {
        self.attachments.files().len()
    }

    /// Process every event in `events`, in order.
    ///
    /// Events after a stop decision are still offered to the session so
    /// that attachments in the same batch are not lost.
    pub fn handle_all<I>(&mut self, events: I) -> Flow
    where
        I: IntoIterator<Item = TagEvent>,
    {
        let mut flow = Flow::Continue;
        for event in events {
            if self.handle(&event) == Flow::Stop {
                flow = Flow::Stop;
            }
        }
        flow
    }

    /// Process one event.
    pub fn handle(&mut self, event: &TagEvent) -> Flow {
        if AttachmentCollector::wants(event) {
            self.attachments.handle(event);
        }

        match self.state {
            SessionState::Running => {}
            SessionState::Terminating | SessionState::Finalized | SessionState::Failed => {
                return Flow::Stop;
            }
        }

        if let TagEvent::Tag(ElementId::TimecodeScale, TagValue::Unsigned(scale)) = event {
            self.timecode_scale = *scale;
            if let Some(demuxer) = self.demuxer.as_mut() {
                demuxer.set_timecode_scale(*scale);
            }
        }

        if let Some(ClassifierEvent::TracksClosed { subtitle_tracks }) =
            self.classifier.handle(event)
        {
            self.activate(subtitle_tracks);
        }

        let Some(demuxer) = self.demuxer.as_mut() else {
            return Flow::Continue;
        };

        let new_cue = match event {
            TagEvent::Start(ElementId::Cluster) => {
                demuxer.set_cluster_timecode(0);
                None
            }
            TagEvent::Tag(ElementId::Timecode, TagValue::Unsigned(ticks)) => {
                demuxer.set_cluster_timecode(*ticks);
                None
            }
            TagEvent::Tag(ElementId::Block | ElementId::SimpleBlock, TagValue::Binary(data)) => {
                demuxer.on_block(self.classifier.registry(), data)
            }
            TagEvent::Tag(ElementId::BlockDuration, TagValue::Unsigned(ticks)) => {
                demuxer.on_block_duration(*ticks);
                None
            }
            TagEvent::End(ElementId::BlockGroup) => {
                demuxer.end_block_group();
                None
            }
            _ => None,
        };

        let Some(tracker) = self.tracker.as_mut() else {
            return Flow::Continue;
        };
        let decision = match new_cue {
            Some(position) => tracker.record_cue(position),
            None => tracker.record_idle(),
        };

        match decision {
            Some(reason) => {
                log::debug!("Stopping early: {reason} (cue counts {:?})", tracker.counts());
                self.termination = Some(reason);
                self.state = SessionState::Terminating;
                Flow::Stop
            }
            None => Flow::Continue,
        }
    }

    fn activate(&mut self, subtitle_tracks: usize) {
        if subtitle_tracks == 0 {
            log::debug!("No subtitle track declared; only attachments will be recovered");
            return;
        }
        if self.demuxer.is_some() {
            return;
        }
        log::debug!("Tracks section closed with {subtitle_tracks} subtitle track(s)");
        self.demuxer = Some(BlockDemuxer::new(subtitle_tracks, self.timecode_scale));
        self.tracker = self
            .policy
            .map(|policy| TerminationTracker::new(policy, subtitle_tracks));
    }

    /// Assemble the output. Attachments come first, then one document per
    /// subtitle track that produced any cue.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::NoDataFound`] when the result holds no text
    /// subtitle at all.
    pub fn finish(self) -> Result<Vec<SubtitleFile>, ExtractError> {
        let mut files: Vec<SubtitleFile> = self
            .attachments
            .into_files()
            .into_iter()
            .map(SubtitleFile::from)
            .collect();

        if let Some(demuxer) = self.demuxer {
            let registry = self.classifier.into_registry();
            for (position, entries) in demuxer.into_logs().into_iter().enumerate() {
                let Some(track) = registry.get(position) else {
                    continue;
                };
                if let Some(file) = assemble_track(position, track, entries) {
                    files.push(file);
                }
            }
        }

        if !files.iter().any(SubtitleFile::is_subtitle) {
            log::debug!("Finalized without any subtitle document");
            return Err(ExtractError::NoDataFound);
        }

        for file in files.iter_mut() {
            normalize_srt(file, self.srt_output);
        }
        log::debug!("Finalized with {} file(s)", files.len());
        Ok(files)
    }

    /// Abandon the session after `error`. Collected state is discarded.
    pub fn fail(self, error: ExtractError) -> ExtractError {
        log::debug!(
            "Extraction failed with {} cue(s) discarded: {error}",
            self.cue_count()
        );
        error
    }
}

fn normalize_srt(file: &mut SubtitleFile, output: SrtOutput) {
    if file.kind != SubtitleKind::Srt {
        return;
    }
    let SubtitleData::Text(text) = &file.data else {
        return;
    };
    let (data, kind) = match output {
        SrtOutput::Srt => return,
        SrtOutput::Vtt => (srt_to_vtt(text), SubtitleKind::Vtt),
        SrtOutput::Ass => (srt_to_ass(text), SubtitleKind::Ass),
    };
    file.name = SubtitleFile::renamed_for(&file.name, kind);
    file.data = SubtitleData::Text(data);
    file.kind = kind;
}
