//! Cue assembly.
//!
//! Rebuilds one complete subtitle document per track from its
//! [`TrackEntryLog`]. ASS tracks keep the script header carried in
//! `CodecPrivate`; everything else is written as SRT.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::demux::{RawCue, TrackEntryLog};
use crate::subtitle::{SubtitleFile, SubtitleKind};
use crate::timestamp::{format_ass_timestamp, format_srt_timestamp};
use crate::track::TrackDescriptor;

static EVENTS_FORMAT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[Events\]\s+Format:([^\r\n]*)").expect("Invalid events format regex")
});

/// Cue layout of a track, detected from its codec header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueFormat {
    /// Blocks are ASS event fields: `ReadOrder,Layer,Style,Name,...,Text`.
    Ass,
    /// Blocks are plain text.
    Srt,
}

impl CueFormat {
    /// A header containing a `Format:` line is an ASS script header.
    pub fn detect(codec_header: &str) -> Self {
        if codec_header.contains("Format:") {
            CueFormat::Ass
        } else {
            CueFormat::Srt
        }
    }
}

/// Build the document for the track at registry `position`.
///
/// Returns `None` when nothing could be reconstructed: an ASS header without
/// an `[Events]` format line, or a log without a single usable cue.
pub fn assemble_track(
    position: usize,
    track: &TrackDescriptor,
    entries: TrackEntryLog,
) -> Option<SubtitleFile> {
    let format = CueFormat::detect(&track.codec_header);
    let fallback_duration = track.default_duration_ns.map(|ns| ns / 1_000_000);

    let (preamble, events_format, trailer) = match format {
        CueFormat::Ass => {
            let Some(found) = EVENTS_FORMAT_REGEX.find(&track.codec_header) else {
                log::debug!(
                    "Skipping track {}: ASS header has no [Events] format line",
                    track.number
                );
                return None;
            };
            (
                &track.codec_header[..found.start()],
                found.as_str(),
                &track.codec_header[found.end()..],
            )
        }
        CueFormat::Srt => ("", "", ""),
    };

    // Fragments that share a line index are merged, in arrival order.
    let mut lines: BTreeMap<u64, String> = BTreeMap::new();
    for (sequence, cue) in entries.into_cues().into_iter().enumerate() {
        let duration = cue_duration(&cue, fallback_duration, track.number);
        let start = cue.start();
        let end = start.saturating_add(duration);

        let rendered = match format {
            CueFormat::Ass => match render_ass_line(&cue.text, start, end) {
                Some(rendered) => rendered,
                None => {
                    log::warn!(
                        "Skipping ASS block without a read order on track {}: {:?}",
                        track.number,
                        cue.text
                    );
                    continue;
                }
            },
            CueFormat::Srt => (
                sequence as u64,
                format!(
                    "{}\n{} --> {}\n{}\n",
                    sequence + 1,
                    format_srt_timestamp(start),
                    format_srt_timestamp(end),
                    cue.text
                ),
            ),
        };

        let (index, line) = rendered;
        lines
            .entry(index)
            .and_modify(|existing| {
                existing.push('\n');
                existing.push_str(&line);
            })
            .or_insert(line);
    }

    if lines.is_empty() {
        log::debug!("Skipping track {}: no cue could be rebuilt", track.number);
        return None;
    }

    let body = lines.into_values().collect::<Vec<_>>().join("\n");
    let (data, kind) = match format {
        CueFormat::Ass => (
            format!("{preamble}{events_format}\n{body}{trailer}\n"),
            SubtitleKind::Ass,
        ),
        CueFormat::Srt => (format!("{body}\n"), SubtitleKind::Srt),
    };
    let extension = kind.extension().unwrap_or_default();

    log::debug!(
        "Assembled track {} as {kind} ({} bytes)",
        track.number,
        data.len()
    );
    Some(SubtitleFile::text(
        format!("{}_{}.{extension}", position + 1, track.language),
        data,
        track.language.clone(),
        kind,
    ))
}

fn cue_duration(cue: &RawCue, fallback: Option<u64>, track_number: u64) -> u64 {
    match cue.duration.or(fallback) {
        Some(duration) => duration,
        None => {
            log::warn!(
                "Cue at {} ms on track {track_number} has no duration; using 0",
                cue.start()
            );
            0
        }
    }
}

/// Turn an ASS block payload into `(line index, Dialogue line)`.
///
/// The payload's first field is the read order, which becomes the line
/// index; the timing fields missing from the payload are spliced in after
/// the layer.
fn render_ass_line(text: &str, start: u64, end: u64) -> Option<(u64, String)> {
    let mut fields = text.splitn(3, ',');
    let index = fields.next()?.trim().parse::<u64>().ok()?;
    let layer = fields.next()?;
    let start = format_ass_timestamp(start);
    let end = format_ass_timestamp(end);

    let line = match fields.next() {
        Some(rest) => format!("Dialogue: {layer},{start},{end},{rest}"),
        None => format!("Dialogue: {layer},{start},{end}"),
    };
    Some((index, line))
}
