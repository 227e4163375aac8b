//! Block demultiplexing.
//!
//! Turns `Block` / `SimpleBlock` payloads belonging to registered subtitle
//! tracks into [`RawCue`]s, one [`TrackEntryLog`] per track. Blocks of any
//! other track are dropped here.

use crate::track::TrackRegistry;

/// Matroska's default timestamp unit: one millisecond, in nanoseconds.
pub const DEFAULT_TIMECODE_SCALE: u64 = 1_000_000;

/// A parsed block header and its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader<'a> {
    /// Container track number.
    pub track_number: u64,
    /// Timestamp relative to the enclosing cluster, in timecode ticks.
    pub relative_timestamp: i16,
    /// Block flag byte (keyframe, lacing, discardable).
    pub flags: u8,
    /// Frame data following the header.
    pub payload: &'a [u8],
}

/// Split a block into header fields and payload.
///
/// Layout: track number vint, big-endian `i16` relative timestamp, one
/// flag byte, payload. Returns `None` if the header is truncated.
pub fn parse_block(data: &[u8]) -> Option<BlockHeader<'_>> {
    let (track_number, length) = track_number_vint(data)?;
    let header_length = length + 3;
    if data.len() < header_length {
        return None;
    }

    let timestamp_bytes = [data[length], data[length + 1]];
    Some(BlockHeader {
        track_number,
        relative_timestamp: i16::from_be_bytes(timestamp_bytes),
        flags: data[length + 2],
        payload: &data[header_length..],
    })
}

/// Decode the track number vint at the start of a block.
///
/// Returns the value with its length marker stripped and the encoded length.
fn track_number_vint(data: &[u8]) -> Option<(u64, usize)> {
    let first = *data.first()?;
    let length = first.leading_zeros() as usize + 1;
    if length > 8 || data.len() < length {
        return None;
    }

    let mut value = u64::from(first) & (0xFF >> length);
    for byte in &data[1..length] {
        value = (value << 8) | u64::from(*byte);
    }
    Some((value, length))
}

/// One subtitle block as recovered from the container, before assembly.
///
/// All times are milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCue {
    /// Block payload decoded as text.
    pub text: String,
    /// Block timestamp relative to its cluster.
    pub relative_timestamp: i64,
    /// Timecode of the enclosing cluster.
    pub cluster_timecode: u64,
    /// `BlockDuration`, when the container provided one.
    pub duration: Option<u64>,
}

impl RawCue {
    /// Absolute start time, clamped at zero.
    pub fn start(&self) -> u64 {
        let cluster = i64::try_from(self.cluster_timecode).unwrap_or(i64::MAX);
        u64::try_from(cluster.saturating_add(self.relative_timestamp)).unwrap_or(0)
    }
}

/// Ordered cues of one subtitle track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackEntryLog {
    cues: Vec<RawCue>,
}

impl TrackEntryLog {
    /// Number of cues collected.
    pub fn len(&self) -> usize {
        self.cues.len()
    }

    /// Returns `true` if no cue has been collected.
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Iterate over collected cues in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &RawCue> {
        self.cues.iter()
    }

    /// Consume the log.
    pub fn into_cues(self) -> Vec<RawCue> {
        self.cues
    }

    fn push(&mut self, cue: RawCue) {
        self.cues.push(cue);
    }

    /// Attach a duration to the most recent cue. Returns `false` if there is
    /// no cue or it already has one.
    fn attach_duration(&mut self, duration: u64) -> bool {
        match self.cues.last_mut() {
            Some(cue) if cue.duration.is_none() => {
                cue.duration = Some(duration);
                true
            }
            _ => false,
        }
    }
}

impl FromIterator<RawCue> for TrackEntryLog {
    fn from_iter<I: IntoIterator<Item = RawCue>>(iter: I) -> Self {
        Self {
            cues: iter.into_iter().collect(),
        }
    }
}

/// Routes subtitle blocks into per-track logs.
#[derive(Debug)]
pub struct BlockDemuxer {
    logs: Vec<TrackEntryLog>,
    timecode_scale: u64,
    /// Current cluster timecode, in ticks.
    cluster_timecode: u64,
    /// Track position of the last block, until its group closes.
    selected: Option<usize>,
}

impl BlockDemuxer {
    /// Create a demuxer with one empty log per registered track.
    pub fn new(track_count: usize, timecode_scale: u64) -> Self {
        Self {
            logs: vec![TrackEntryLog::default(); track_count],
            timecode_scale: timecode_scale.max(1),
            cluster_timecode: 0,
            selected: None,
        }
    }

    /// Update the timestamp unit (`Info/TimecodeScale`, in nanoseconds).
    pub fn set_timecode_scale(&mut self, scale: u64) {
        self.timecode_scale = scale.max(1);
    }

    /// A `Timecode` element opened a new time base.
    pub fn set_cluster_timecode(&mut self, ticks: u64) {
        self.cluster_timecode = ticks;
    }

    /// Handle a `Block` or `SimpleBlock`.
    ///
    /// Returns the track position the cue was appended to, or `None` if the
    /// block belongs to an unregistered track or is malformed.
    pub fn on_block(&mut self, registry: &TrackRegistry, data: &[u8]) -> Option<usize> {
        self.selected = None;

        let Some(block) = parse_block(data) else {
            log::warn!("Ignoring block with a truncated header ({} bytes)", data.len());
            return None;
        };
        let position = registry.position(block.track_number)?;
        let entries = self.logs.get_mut(position)?;

        let text = match std::str::from_utf8(block.payload) {
            Ok(text) => text.to_string(),
            Err(_) => {
                log::warn!(
                    "Subtitle block on track {} is not valid UTF-8; replacing invalid bytes",
                    block.track_number
                );
                String::from_utf8_lossy(block.payload).into_owned()
            }
        };

        let scale = self.timecode_scale;
        entries.push(RawCue {
            text,
            relative_timestamp: scale_signed(i64::from(block.relative_timestamp), scale),
            cluster_timecode: scale_unsigned(self.cluster_timecode, scale),
            duration: None,
        });
        log::trace!(
            "Track {} cue #{} at cluster {} {:+}",
            block.track_number,
            entries.len(),
            self.cluster_timecode,
            block.relative_timestamp
        );

        self.selected = Some(position);
        Some(position)
    }

    /// Handle a `BlockDuration` that follows a block.
    pub fn on_block_duration(&mut self, ticks: u64) {
        let Some(position) = self.selected else {
            return;
        };
        let duration = scale_unsigned(ticks, self.timecode_scale);
        if !self.logs[position].attach_duration(duration) {
            log::warn!("Duplicate BlockDuration for track position {position}");
        }
    }

    /// The enclosing `BlockGroup` closed; later durations belong elsewhere.
    pub fn end_block_group(&mut self) {
        self.selected = None;
    }

    /// Cue counts per track position.
    pub fn counts(&self) -> Vec<usize> {
        self.logs.iter().map(TrackEntryLog::len).collect()
    }

    /// Cues collected across all tracks.
    pub fn cue_count(&self) -> usize {
        self.logs.iter().map(TrackEntryLog::len).sum()
    }

    /// Consume the demuxer, yielding one log per track position.
    pub fn into_logs(self) -> Vec<TrackEntryLog> {
        self.logs
    }
}

fn scale_unsigned(ticks: u64, scale: u64) -> u64 {
    if scale == DEFAULT_TIMECODE_SCALE {
        ticks
    } else {
        let scaled = u128::from(ticks) * u128::from(scale) / u128::from(DEFAULT_TIMECODE_SCALE);
        u64::try_from(scaled).unwrap_or(u64::MAX)
    }
}

fn scale_signed(ticks: i64, scale: u64) -> i64 {
    if scale == DEFAULT_TIMECODE_SCALE {
        ticks
    } else {
        let scaled = i128::from(ticks) * i128::from(scale) / i128::from(DEFAULT_TIMECODE_SCALE);
        i64::try_from(scaled).unwrap_or(if scaled < 0 { i64::MIN } else { i64::MAX })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ebml::{ElementId, TagEvent, TagValue};
    use crate::track::TrackClassifier;

    fn registry_with(numbers: &[u64]) -> TrackRegistry {
        let mut classifier = TrackClassifier::new();
        classifier.handle(&TagEvent::Start(ElementId::Tracks));
        for number in numbers {
            classifier.handle(&TagEvent::Start(ElementId::TrackEntry));
            classifier.handle(&TagEvent::Tag(
                ElementId::TrackNumber,
                TagValue::Unsigned(*number),
            ));
            classifier.handle(&TagEvent::Tag(ElementId::TrackType, TagValue::Unsigned(17)));
            classifier.handle(&TagEvent::End(ElementId::TrackEntry));
        }
        classifier.handle(&TagEvent::End(ElementId::Tracks));
        classifier.into_registry()
    }

    fn block(track: u8, relative: i16, text: &str) -> Vec<u8> {
        let mut data = vec![0x80 | track];
        data.extend_from_slice(&relative.to_be_bytes());
        data.push(0x80);
        data.extend_from_slice(text.as_bytes());
        data
    }

    #[test]
    fn parses_block_header() {
        let data = block(3, -20, "hi");
        let header = parse_block(&data).unwrap();
        assert_eq!(header.track_number, 3);
        assert_eq!(header.relative_timestamp, -20);
        assert_eq!(header.flags, 0x80);
        assert_eq!(header.payload, b"hi");
    }

    #[test]
    fn truncated_block_header() {
        assert!(parse_block(&[0x81, 0x00]).is_none());
        assert!(parse_block(&[0x00, 0x81, 0x00, 0x00]).is_none());
        assert!(parse_block(&[]).is_none());
    }

    #[test]
    fn two_byte_track_number() {
        let header = parse_block(&[0x41, 0x2C, 0x00, 0x0A, 0x00, b'x']).unwrap();
        assert_eq!(header.track_number, 300);
        assert_eq!(header.relative_timestamp, 10);
        assert_eq!(header.payload, b"x");
    }

    #[test]
    fn extreme_timestamps_saturate() {
        let registry = registry_with(&[1]);
        let mut demuxer = BlockDemuxer::new(registry.len(), DEFAULT_TIMECODE_SCALE * 1000);
        demuxer.set_cluster_timecode(u64::MAX);
        demuxer.on_block(&registry, &block(1, i16::MAX, "x"));
        demuxer.on_block_duration(u64::MAX);

        let cue = demuxer.into_logs().remove(0).into_cues().remove(0);
        assert_eq!(cue.cluster_timecode, u64::MAX);
        assert_eq!(cue.duration, Some(u64::MAX));
        assert_eq!(cue.start(), i64::MAX as u64);
    }

    #[test]
    fn cue_timing_from_cluster_and_duration() {
        let registry = registry_with(&[3]);
        let mut demuxer = BlockDemuxer::new(registry.len(), DEFAULT_TIMECODE_SCALE);
        demuxer.set_cluster_timecode(1000);
        assert_eq!(demuxer.on_block(&registry, &block(3, 500, "Hello")), Some(0));
        demuxer.on_block_duration(2000);

        let cue = demuxer.into_logs().remove(0).into_cues().remove(0);
        assert_eq!(cue.text, "Hello");
        assert_eq!(cue.start(), 1500);
        assert_eq!(cue.duration, Some(2000));
    }

    #[test]
    fn foreign_tracks_are_dropped() {
        let registry = registry_with(&[3]);
        let mut demuxer = BlockDemuxer::new(registry.len(), DEFAULT_TIMECODE_SCALE);
        assert_eq!(demuxer.on_block(&registry, &block(1, 0, "video")), None);
        // A duration after a foreign block must not land on a subtitle cue.
        demuxer.on_block_duration(40);
        assert_eq!(demuxer.counts(), vec![0]);
    }

    #[test]
    fn duration_after_group_end_is_ignored() {
        let registry = registry_with(&[2]);
        let mut demuxer = BlockDemuxer::new(registry.len(), DEFAULT_TIMECODE_SCALE);
        demuxer.on_block(&registry, &block(2, 0, "a"));
        demuxer.end_block_group();
        demuxer.on_block_duration(100);
        let cues = demuxer.into_logs().remove(0).into_cues();
        assert_eq!(cues[0].duration, None);
    }

    #[test]
    fn timecode_scale_converts_to_milliseconds() {
        let registry = registry_with(&[1]);
        // 100 µs ticks.
        let mut demuxer = BlockDemuxer::new(registry.len(), 100_000);
        demuxer.set_cluster_timecode(20_000);
        demuxer.on_block(&registry, &block(1, 50, "x"));
        demuxer.on_block_duration(10_000);

        let cue = demuxer.into_logs().remove(0).into_cues().remove(0);
        assert_eq!(cue.cluster_timecode, 2000);
        assert_eq!(cue.relative_timestamp, 5);
        assert_eq!(cue.duration, Some(1000));
    }

    #[test]
    fn negative_start_clamps_to_zero() {
        let cue = RawCue {
            text: String::new(),
            relative_timestamp: -50,
            cluster_timecode: 10,
            duration: None,
        };
        assert_eq!(cue.start(), 0);
    }
}
