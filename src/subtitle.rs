//! Extraction output.
//!
//! Every successful extraction yields a list of [`SubtitleFile`]s: documents
//! rebuilt from subtitle tracks, plus files that were embedded as
//! attachments.
//!
//! # Example
//!
//! ```no_run
//! use mkvsubs::{ExtractError, SubtitleExtractor, SubtitleKind};
//!
//! let files = SubtitleExtractor::new().extract_file("input.mkv")?;
//! for file in files.iter().filter(|f| f.kind != SubtitleKind::Binary) {
//!     println!("{} ({}, {} bytes)", file.name, file.language, file.data.len());
//! }
//! # Ok::<(), ExtractError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;

use bytes::Bytes;
use serde_json::{Value, json};

use crate::attachment::EmbeddedFile;

/// Text subtitle format of a [`SubtitleFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubtitleKind {
    /// SubRip Text (.srt).
    Srt,
    /// Advanced SubStation Alpha (.ass / .ssa).
    Ass,
    /// Web Video Text Tracks (.vtt).
    Vtt,
    /// An attachment that is not a text subtitle (fonts, images).
    Binary,
}

impl SubtitleKind {
    /// Infer the kind from a file name's extension.
    pub fn from_file_name(name: &str) -> Self {
        let extension = name
            .rsplit_once('.')
            .map(|(_, extension)| extension.to_ascii_lowercase());
        match extension.as_deref() {
            Some("srt") => SubtitleKind::Srt,
            Some("ass") | Some("ssa") => SubtitleKind::Ass,
            Some("vtt") => SubtitleKind::Vtt,
            _ => SubtitleKind::Binary,
        }
    }

    /// Conventional file extension, without the dot.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            SubtitleKind::Srt => Some("srt"),
            SubtitleKind::Ass => Some("ass"),
            SubtitleKind::Vtt => Some("vtt"),
            SubtitleKind::Binary => None,
        }
    }
}

impl Display for SubtitleKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SubtitleKind::Srt => write!(f, "srt"),
            SubtitleKind::Ass => write!(f, "ass"),
            SubtitleKind::Vtt => write!(f, "vtt"),
            SubtitleKind::Binary => write!(f, "binary"),
        }
    }
}

/// Payload of a [`SubtitleFile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtitleData {
    /// A complete text document.
    Text(String),
    /// Raw attachment bytes.
    Binary(Bytes),
}

impl SubtitleData {
    /// The document text, if this is a text payload.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SubtitleData::Text(text) => Some(text),
            SubtitleData::Binary(_) => None,
        }
    }

    /// The payload as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            SubtitleData::Text(text) => text.as_bytes(),
            SubtitleData::Binary(bytes) => bytes,
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns `true` for an empty payload.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleFile {
    /// File name, e.g. `1_eng.ass` for a rebuilt track.
    pub name: String,
    /// Document or attachment contents.
    pub data: SubtitleData,
    /// Language code (empty for attachments).
    pub language: String,
    /// Format of `data`.
    pub kind: SubtitleKind,
}

impl SubtitleFile {
    /// Create a text document.
    pub fn text(
        name: impl Into<String>,
        data: impl Into<String>,
        language: impl Into<String>,
        kind: SubtitleKind,
    ) -> Self {
        Self {
            name: name.into(),
            data: SubtitleData::Text(data.into()),
            language: language.into(),
            kind,
        }
    }

    /// Returns `true` for text subtitle documents.
    pub fn is_subtitle(&self) -> bool {
        self.kind != SubtitleKind::Binary
    }

    /// The last path component of `name`, safe to join onto an output
    /// directory.
    ///
    /// Attachment names come from the container and may carry directory
    /// parts in either separator style. Returns `None` when nothing usable
    /// is left.
    pub fn safe_file_name(&self) -> Option<&str> {
        let name = Path::new(&self.name).file_name()?.to_str()?;
        let name = name.rsplit(['/', '\\', ':']).next()?;
        match name {
            "" | "." | ".." => None,
            name => Some(name),
        }
    }

    /// Replace the extension of `name` with the one for `kind`.
    pub(crate) fn renamed_for(name: &str, kind: SubtitleKind) -> String {
        let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
        match kind.extension() {
            Some(extension) => format!("{stem}.{extension}"),
            None => name.to_string(),
        }
    }

    /// JSON form used by the CLI and by worker replies. Binary payloads are
    /// reported by size only.
    pub fn to_json(&self) -> Value {
        let data = match &self.data {
            SubtitleData::Text(text) => json!(text),
            SubtitleData::Binary(bytes) => json!({ "bytes": bytes.len() }),
        };
        json!({
            "name": self.name,
            "type": self.kind.to_string(),
            "language": self.language,
            "data": data,
        })
    }
}

impl From<EmbeddedFile> for SubtitleFile {
    fn from(file: EmbeddedFile) -> Self {
        let kind = SubtitleKind::from_file_name(&file.name);
        let data = match kind {
            SubtitleKind::Binary => SubtitleData::Binary(file.data),
            _ => {
                let text = String::from_utf8_lossy(&file.data);
                SubtitleData::Text(text.trim_start_matches('\u{feff}').to_string())
            }
        };
        Self {
            name: file.name,
            data,
            language: file.language,
            kind,
        }
    }
}
