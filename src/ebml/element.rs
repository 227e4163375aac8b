//! The Matroska element subset the extractor understands.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Closed set of element identities, plus an `Unknown` case for every ID
/// the extractor has no use for.
///
/// Built from the EBML ID of each decoded [`MatroskaSpec`] tag, so the rest
/// of the crate never matches on the full Matroska vocabulary.
///
/// [`MatroskaSpec`]: webm_iterable::matroska_spec::MatroskaSpec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementId {
    Ebml,
    Segment,
    SeekHead,
    Info,
    TimecodeScale,
    Tracks,
    TrackEntry,
    TrackNumber,
    TrackType,
    CodecId,
    CodecPrivate,
    Language,
    Name,
    DefaultDuration,
    Cluster,
    Timecode,
    BlockGroup,
    Block,
    SimpleBlock,
    BlockDuration,
    Cues,
    Chapters,
    Tags,
    Attachments,
    AttachedFile,
    FileName,
    FileMimeType,
    FileData,
    Unknown(u64),
}

impl ElementId {
    /// Map a raw EBML ID (marker bits included) to its element.
    pub fn from_raw(id: u64) -> Self {
        match id {
            0x1A45_DFA3 => ElementId::Ebml,
            0x1853_8067 => ElementId::Segment,
            0x114D_9B74 => ElementId::SeekHead,
            0x1549_A966 => ElementId::Info,
            0x2A_D7B1 => ElementId::TimecodeScale,
            0x1654_AE6B => ElementId::Tracks,
            0xAE => ElementId::TrackEntry,
            0xD7 => ElementId::TrackNumber,
            0x83 => ElementId::TrackType,
            0x86 => ElementId::CodecId,
            0x63A2 => ElementId::CodecPrivate,
            0x22_B59C => ElementId::Language,
            0x536E => ElementId::Name,
            0x23_E383 => ElementId::DefaultDuration,
            0x1F43_B675 => ElementId::Cluster,
            0xE7 => ElementId::Timecode,
            0xA0 => ElementId::BlockGroup,
            0xA1 => ElementId::Block,
            0xA3 => ElementId::SimpleBlock,
            0x9B => ElementId::BlockDuration,
            0x1C53_BB6B => ElementId::Cues,
            0x1043_A770 => ElementId::Chapters,
            0x1254_C367 => ElementId::Tags,
            0x1941_A469 => ElementId::Attachments,
            0x61A7 => ElementId::AttachedFile,
            0x466E => ElementId::FileName,
            0x4660 => ElementId::FileMimeType,
            0x465C => ElementId::FileData,
            other => ElementId::Unknown(other),
        }
    }

    /// The raw EBML ID.
    pub fn raw(self) -> u64 {
        match self {
            ElementId::Ebml => 0x1A45_DFA3,
            ElementId::Segment => 0x1853_8067,
            ElementId::SeekHead => 0x114D_9B74,
            ElementId::Info => 0x1549_A966,
            ElementId::TimecodeScale => 0x2A_D7B1,
            ElementId::Tracks => 0x1654_AE6B,
            ElementId::TrackEntry => 0xAE,
            ElementId::TrackNumber => 0xD7,
            ElementId::TrackType => 0x83,
            ElementId::CodecId => 0x86,
            ElementId::CodecPrivate => 0x63A2,
            ElementId::Language => 0x22_B59C,
            ElementId::Name => 0x536E,
            ElementId::DefaultDuration => 0x23_E383,
            ElementId::Cluster => 0x1F43_B675,
            ElementId::Timecode => 0xE7,
            ElementId::BlockGroup => 0xA0,
            ElementId::Block => 0xA1,
            ElementId::SimpleBlock => 0xA3,
            ElementId::BlockDuration => 0x9B,
            ElementId::Cues => 0x1C53_BB6B,
            ElementId::Chapters => 0x1043_A770,
            ElementId::Tags => 0x1254_C367,
            ElementId::Attachments => 0x1941_A469,
            ElementId::AttachedFile => 0x61A7,
            ElementId::FileName => 0x466E,
            ElementId::FileMimeType => 0x4660,
            ElementId::FileData => 0x465C,
            ElementId::Unknown(id) => id,
        }
    }
}

impl Display for ElementId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ElementId::Unknown(id) => write!(f, "Unknown(0x{id:X})"),
            other => write!(f, "{other:?}"),
        }
    }
}
