//! Structural events derived from decoded Matroska tags.

use bytes::Bytes;
use webm_iterable::matroska_spec::{EbmlTag, Master, MatroskaSpec};

use crate::ebml::element::ElementId;

/// Decoded payload of a leaf element.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
    Binary(Bytes),
}

/// One structural event, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum TagEvent {
    /// A master element opened.
    Start(ElementId),
    /// A master element closed.
    End(ElementId),
    /// A complete leaf element.
    Tag(ElementId, TagValue),
}

impl TagEvent {
    /// Convert one tag emitted by the Matroska iterator.
    ///
    /// Masters arrive as `Start`/`End` pairs because nothing is buffered;
    /// a fully buffered master yields `None`.
    pub fn from_tag(tag: MatroskaSpec) -> Option<TagEvent> {
        let id = ElementId::from_raw(tag.get_id());

        if let Some(master) = tag.as_master() {
            return match master {
                Master::Start => Some(TagEvent::Start(id)),
                Master::End => Some(TagEvent::End(id)),
                Master::Full(_) => None,
            };
        }

        let value = match tag {
            // Frame payloads can be large: move them instead of copying.
            MatroskaSpec::SimpleBlock(data)
            | MatroskaSpec::Block(data)
            | MatroskaSpec::FileData(data) => TagValue::Binary(Bytes::from(data)),
            other => leaf_value(&other)?,
        };
        Some(TagEvent::Tag(id, value))
    }

    /// The element this event belongs to.
    pub fn id(&self) -> ElementId {
        match self {
            TagEvent::Start(id) | TagEvent::End(id) | TagEvent::Tag(id, _) => *id,
        }
    }
}

fn leaf_value(tag: &MatroskaSpec) -> Option<TagValue> {
    if let Some(value) = tag.as_unsigned_int() {
        return Some(TagValue::Unsigned(*value));
    }
    if let Some(text) = tag.as_utf8() {
        return Some(TagValue::Text(text.to_string()));
    }
    if let Some(data) = tag.as_binary() {
        return Some(TagValue::Binary(Bytes::copy_from_slice(data)));
    }
    if let Some(value) = tag.as_signed_int() {
        return Some(TagValue::Signed(*value));
    }
    tag.as_float().map(|value| TagValue::Float(*value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masters_become_start_and_end() {
        assert_eq!(
            TagEvent::from_tag(MatroskaSpec::Cluster(Master::Start)),
            Some(TagEvent::Start(ElementId::Cluster))
        );
        assert_eq!(
            TagEvent::from_tag(MatroskaSpec::Tracks(Master::End)),
            Some(TagEvent::End(ElementId::Tracks))
        );
        assert_eq!(TagEvent::from_tag(MatroskaSpec::Tracks(Master::Full(Vec::new()))), None);
    }

    #[test]
    fn leaves_carry_their_values() {
        assert_eq!(
            TagEvent::from_tag(MatroskaSpec::TrackType(17)),
            Some(TagEvent::Tag(ElementId::TrackType, TagValue::Unsigned(17)))
        );
        assert_eq!(
            TagEvent::from_tag(MatroskaSpec::CodecID("S_TEXT/UTF8".to_string())),
            Some(TagEvent::Tag(
                ElementId::CodecId,
                TagValue::Text("S_TEXT/UTF8".to_string())
            ))
        );
        assert_eq!(
            TagEvent::from_tag(MatroskaSpec::SimpleBlock(vec![0x81, 0, 0, 0x80])),
            Some(TagEvent::Tag(
                ElementId::SimpleBlock,
                TagValue::Binary(Bytes::from_static(&[0x81, 0, 0, 0x80]))
            ))
        );
    }

    #[test]
    fn cluster_timestamp_maps_to_timecode() {
        let event = TagEvent::from_tag(MatroskaSpec::Timestamp(1000)).unwrap();
        assert_eq!(event.id(), ElementId::Timecode);
        assert_eq!(event, TagEvent::Tag(ElementId::Timecode, TagValue::Unsigned(1000)));
    }
}
