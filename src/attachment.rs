//! Embedded attachment capture.
//!
//! Matroska files may carry whole subtitle files (and fonts) under
//! `Attachments/AttachedFile`. These are recovered independently of the
//! track and cluster machinery.

use bytes::Bytes;

use crate::ebml::{ElementId, TagEvent, TagValue};

/// A file stored in the container's `Attachments` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedFile {
    /// `FileName`.
    pub name: String,
    /// `FileData`.
    pub data: Bytes,
    /// `FileMimeType`, when declared.
    pub mime_type: Option<String>,
    /// Attachments carry no language; always empty.
    pub language: String,
}

#[derive(Debug, Default)]
struct PendingFile {
    name: Option<String>,
    data: Option<Bytes>,
    mime_type: Option<String>,
}

/// Collects attachments as their tags stream past.
///
/// A slot is kept when its `AttachedFile` closes with both a name and data;
/// a slot closed with only one of them is dropped.
#[derive(Debug, Default)]
pub struct AttachmentCollector {
    pending: PendingFile,
    files: Vec<EmbeddedFile>,
}

impl AttachmentCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` for events this collector consumes. Such events are
    /// never gated by early termination.
    pub fn wants(event: &TagEvent) -> bool {
        matches!(
            event,
            TagEvent::Tag(
                ElementId::FileName | ElementId::FileData | ElementId::FileMimeType,
                _
            ) | TagEvent::End(ElementId::AttachedFile)
        )
    }

    /// Process one event.
    pub fn handle(&mut self, event: &TagEvent) {
        match event {
            TagEvent::Tag(ElementId::FileName, TagValue::Text(name)) => {
                self.pending.name = Some(name.clone());
            }
            TagEvent::Tag(ElementId::FileData, TagValue::Binary(data)) => {
                self.pending.data = Some(data.clone());
            }
            TagEvent::Tag(ElementId::FileMimeType, TagValue::Text(mime)) => {
                self.pending.mime_type = Some(mime.clone());
            }
            TagEvent::End(ElementId::AttachedFile) => self.close_slot(),
            _ => {}
        }
    }

    fn close_slot(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        match (pending.name, pending.data) {
            (Some(name), Some(data)) => {
                log::debug!("Recovered attachment {name} ({} bytes)", data.len());
                self.files.push(EmbeddedFile {
                    name,
                    data,
                    mime_type: pending.mime_type,
                    language: String::new(),
                });
            }
            (None, None) => {}
            (name, _) => log::warn!("Dropping incomplete attachment {name:?}"),
        }
    }

    /// Attachments completed so far.
    pub fn files(&self) -> &[EmbeddedFile] {
        &self.files
    }

    /// Consume the collector.
    pub fn into_files(self) -> Vec<EmbeddedFile> {
        self.files
    }
}
