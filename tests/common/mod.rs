//! In-memory Matroska builder shared by the integration tests.
//!
//! Only writes what the extractor reads: element headers with minimal
//! size vints, the track table, clusters with blocks and attachments.

#![allow(dead_code)]

use mkvsubs::ebml::ElementId;

pub const TRACK_TYPE_VIDEO: u64 = 1;
pub const TRACK_TYPE_SUBTITLE: u64 = 17;

pub const ASS_HEADER: &str = "[Script Info]\nScriptType: v4.00+\nPlayResX: 1920\n\n[V4+ Styles]\nFormat: Name, Fontname, Fontsize\nStyle: Default,Arial,48\n\n[Events]\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n";

fn id_bytes(id: ElementId) -> Vec<u8> {
    let raw = id.raw().to_be_bytes();
    let skip = raw.iter().take_while(|byte| **byte == 0).count();
    raw[skip..].to_vec()
}

fn size_bytes(length: usize) -> Vec<u8> {
    if length < 0x7F {
        vec![0x80 | length as u8]
    } else if length < 0x3FFF {
        vec![0x40 | (length >> 8) as u8, length as u8]
    } else {
        let mut bytes = vec![0x01];
        bytes.extend_from_slice(&(length as u64).to_be_bytes()[1..]);
        bytes
    }
}

/// One element with a known size.
pub fn element(id: ElementId, payload: &[u8]) -> Vec<u8> {
    let mut bytes = id_bytes(id);
    bytes.extend(size_bytes(payload.len()));
    bytes.extend_from_slice(payload);
    bytes
}

pub fn uint(id: ElementId, value: u64) -> Vec<u8> {
    let raw = value.to_be_bytes();
    let skip = raw.iter().take_while(|byte| **byte == 0).count().min(7);
    element(id, &raw[skip..])
}

pub fn string(id: ElementId, value: &str) -> Vec<u8> {
    element(id, value.as_bytes())
}

pub fn master(id: ElementId, children: &[Vec<u8>]) -> Vec<u8> {
    element(id, &children.concat())
}

/// A master element written with the reserved "unknown size" value, as
/// live muxers do.
pub fn unknown_size_master(id: ElementId, children: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = id_bytes(id);
    bytes.extend_from_slice(&[0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
    bytes.extend(children.concat());
    bytes
}

pub fn ebml_header() -> Vec<u8> {
    // DocType "matroska" is not interpreted, only skipped.
    let doc_type = [0x42, 0x82, 0x88, b'm', b'a', b't', b'r', b'o', b's', b'k', b'a'];
    element(ElementId::Ebml, &doc_type)
}

/// EBML header followed by a `Segment` holding `children`.
pub fn matroska(children: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = ebml_header();
    bytes.extend(master(ElementId::Segment, children));
    bytes
}

/// Same as [`matroska`] but with an unknown-size `Segment`.
pub fn live_matroska(children: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = ebml_header();
    bytes.extend(unknown_size_master(ElementId::Segment, children));
    bytes
}

pub fn info(timecode_scale: u64) -> Vec<u8> {
    master(
        ElementId::Info,
        &[uint(ElementId::TimecodeScale, timecode_scale)],
    )
}

/// Description of one `TrackEntry`.
#[derive(Debug, Clone)]
pub struct TrackSpec {
    pub number: u64,
    pub type_code: u64,
    pub codec_id: &'static str,
    pub codec_private: Option<String>,
    pub language: Option<&'static str>,
    pub default_duration_ns: Option<u64>,
}

impl TrackSpec {
    pub fn video(number: u64) -> Self {
        Self {
            number,
            type_code: TRACK_TYPE_VIDEO,
            codec_id: "V_MPEG4/ISO/AVC",
            codec_private: None,
            language: None,
            default_duration_ns: None,
        }
    }

    pub fn srt(number: u64, language: &'static str) -> Self {
        Self {
            number,
            type_code: TRACK_TYPE_SUBTITLE,
            codec_id: "S_TEXT/UTF8",
            codec_private: None,
            language: Some(language),
            default_duration_ns: None,
        }
    }

    pub fn ass(number: u64, language: &'static str) -> Self {
        Self {
            number,
            type_code: TRACK_TYPE_SUBTITLE,
            codec_id: "S_TEXT/ASS",
            codec_private: Some(ASS_HEADER.to_string()),
            language: Some(language),
            default_duration_ns: None,
        }
    }

    pub fn with_default_duration(mut self, nanoseconds: u64) -> Self {
        self.default_duration_ns = Some(nanoseconds);
        self
    }

    pub fn with_codec_private(mut self, header: &str) -> Self {
        self.codec_private = Some(header.to_string());
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut children = vec![
            uint(ElementId::TrackNumber, self.number),
            uint(ElementId::TrackType, self.type_code),
            string(ElementId::CodecId, self.codec_id),
        ];
        if let Some(language) = self.language {
            children.push(string(ElementId::Language, language));
        }
        if let Some(duration) = self.default_duration_ns {
            children.push(uint(ElementId::DefaultDuration, duration));
        }
        if let Some(header) = &self.codec_private {
            children.push(element(ElementId::CodecPrivate, header.as_bytes()));
        }
        master(ElementId::TrackEntry, &children)
    }
}

pub fn tracks(entries: &[TrackSpec]) -> Vec<u8> {
    let children: Vec<Vec<u8>> = entries.iter().map(TrackSpec::encode).collect();
    master(ElementId::Tracks, &children)
}

fn block_payload(track: u64, relative: i16, flags: u8, data: &[u8]) -> Vec<u8> {
    let mut payload = vec![0x80 | track as u8];
    payload.extend_from_slice(&relative.to_be_bytes());
    payload.push(flags);
    payload.extend_from_slice(data);
    payload
}

pub fn simple_block(track: u64, relative: i16, text: &str) -> Vec<u8> {
    element(
        ElementId::SimpleBlock,
        &block_payload(track, relative, 0x80, text.as_bytes()),
    )
}

pub fn block_group(track: u64, relative: i16, text: &str, duration: Option<u64>) -> Vec<u8> {
    let mut children = vec![element(
        ElementId::Block,
        &block_payload(track, relative, 0x00, text.as_bytes()),
    )];
    if let Some(duration) = duration {
        children.push(uint(ElementId::BlockDuration, duration));
    }
    master(ElementId::BlockGroup, &children)
}

pub fn cluster(timecode: u64, blocks: &[Vec<u8>]) -> Vec<u8> {
    let mut children = vec![uint(ElementId::Timecode, timecode)];
    children.extend_from_slice(blocks);
    master(ElementId::Cluster, &children)
}

pub fn live_cluster(timecode: u64, blocks: &[Vec<u8>]) -> Vec<u8> {
    let mut children = vec![uint(ElementId::Timecode, timecode)];
    children.extend_from_slice(blocks);
    unknown_size_master(ElementId::Cluster, &children)
}

pub fn attachments(files: &[(&str, &[u8])]) -> Vec<u8> {
    let children: Vec<Vec<u8>> = files
        .iter()
        .map(|(name, data)| {
            master(
                ElementId::AttachedFile,
                &[
                    string(ElementId::FileName, name),
                    string(ElementId::FileMimeType, "application/octet-stream"),
                    element(ElementId::FileData, data),
                ],
            )
        })
        .collect();
    master(ElementId::Attachments, &children)
}

/// One SRT track (number 2, after a video track) with a cue every two
/// seconds, each in its own cluster.
pub fn srt_movie(cue_count: usize) -> Vec<u8> {
    let mut children = vec![
        info(1_000_000),
        tracks(&[TrackSpec::video(1), TrackSpec::srt(2, "eng")]),
    ];
    for index in 0..cue_count {
        let timecode = index as u64 * 2000;
        children.push(cluster(
            timecode,
            &[
                simple_block(1, 0, "frame"),
                block_group(2, 100, &format!("Line {}", index + 1), Some(1500)),
            ],
        ));
    }
    matroska(&children)
}
