//! Input sniffing and track validation.
//!
//! The extractor parses whatever it is given; deciding whether a file is
//! worth handing to it is up to the caller. This module provides the
//! checks a caller typically wants: EBML magic sniffing, the file extension
//! test, and a [`ValidationReport`] over probed tracks.
//!
//! # Example
//!
//! ```no_run
//! use mkvsubs::{MatroskaProbe, validation};
//!
//! if validation::looks_like_matroska("input.mkv")? {
//!     let tracks = MatroskaProbe::probe("input.mkv")?;
//!     let report = validation::validate_tracks(&tracks);
//!     print!("{report}");
//! }
//! # Ok::<(), mkvsubs::ExtractError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::ExtractError;
use crate::track::TrackDescriptor;

/// The EBML header ID every Matroska/WebM file starts with.
pub const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

/// Codec IDs whose blocks are text.
const TEXT_CODECS: &[&str] = &["S_TEXT/UTF8", "S_TEXT/ASS", "S_TEXT/SSA", "S_TEXT/WEBVTT", "S_ASS", "S_SSA"];

/// Returns `true` if `header` starts with the EBML magic.
pub fn is_matroska(header: &[u8]) -> bool {
    header.starts_with(&EBML_MAGIC)
}

/// Returns `true` for `.mkv`, `.mka`, `.mks` and `.webm` paths
/// (case-insensitive).
pub fn has_matroska_extension<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            matches!(
                extension.to_ascii_lowercase().as_str(),
                "mkv" | "mka" | "mks" | "webm"
            )
        })
}

/// Returns `true` if the file has a Matroska extension or starts with the
/// EBML magic.
///
/// # Errors
///
/// Returns [`ExtractError::IoError`] if the file cannot be opened.
pub fn looks_like_matroska<P: AsRef<Path>>(path: P) -> Result<bool, ExtractError> {
    let path = path.as_ref();
    if has_matroska_extension(path) {
        return Ok(true);
    }
    let mut header = Vec::with_capacity(EBML_MAGIC.len());
    File::open(path)?
        .take(EBML_MAGIC.len() as u64)
        .read_to_end(&mut header)?;
    Ok(is_matroska(&header))
}

/// Summary of track validation.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Informational notices (not problems).
    pub info: Vec<String>,
    /// Issues that may make some output unusable.
    pub warnings: Vec<String>,
    /// Issues that prevent any track from being extracted.
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Returns `true` if no errors were found.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of issues (info + warnings + errors).
    pub fn issue_count(&self) -> usize {
        self.info.len() + self.warnings.len() + self.errors.len()
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for item in &self.info {
            writeln!(f, "[INFO] {item}")?;
        }
        for item in &self.warnings {
            writeln!(f, "[WARN] {item}")?;
        }
        for item in &self.errors {
            writeln!(f, "[ERROR] {item}")?;
        }
        if self.issue_count() == 0 {
            writeln!(f, "No issues found.")?;
        }
        Ok(())
    }
}

/// Check probed tracks for extraction problems.
pub fn validate_tracks(tracks: &[TrackDescriptor]) -> ValidationReport {
    let mut report = ValidationReport::default();

    if tracks.is_empty() {
        report.errors.push("File declares no tracks".to_string());
        return report;
    }

    let subtitles: Vec<&TrackDescriptor> = tracks.iter().filter(|t| t.is_subtitle()).collect();
    if subtitles.is_empty() {
        report.warnings.push(
            "No subtitle track; only subtitle attachments can be recovered".to_string(),
        );
    }

    for track in subtitles {
        let codec = track.codec_id.as_deref().unwrap_or("unknown codec");
        report.info.push(format!(
            "Subtitle track {}: {codec} ({})",
            track.number, track.language
        ));
        if let Some(codec_id) = &track.codec_id {
            if !TEXT_CODECS.contains(&codec_id.as_str()) {
                report.warnings.push(format!(
                    "Subtitle track {} uses {codec_id}, which is not a text codec; its output will not be readable",
                    track.number
                ));
            }
        }
        if track.codec_header.contains("Format:") && !track.codec_header.contains("[Events]") {
            report.warnings.push(format!(
                "Subtitle track {} has an ASS header without an [Events] section and will be skipped",
                track.number
            ));
        }
    }

    let mut numbers: Vec<u64> = tracks.iter().map(|t| t.number).collect();
    numbers.sort_unstable();
    numbers.dedup();
    if numbers.len() != tracks.len() {
        report
            .warnings
            .push("Duplicate track numbers; blocks go to the first declaration".to_string());
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::TrackKind;

    fn track(number: u64, kind: TrackKind, codec: &str) -> TrackDescriptor {
        TrackDescriptor {
            number,
            kind,
            codec_id: Some(codec.to_string()),
            codec_header: String::new(),
            language: "eng".to_string(),
            name: None,
            default_duration_ns: None,
        }
    }

    #[test]
    fn magic_bytes() {
        assert!(is_matroska(&[0x1A, 0x45, 0xDF, 0xA3, 0x01]));
        assert!(!is_matroska(&[0x1A, 0x45]));
        assert!(!is_matroska(b"RIFF"));
    }

    #[test]
    fn extensions() {
        assert!(has_matroska_extension("a/b/Movie.MKV"));
        assert!(has_matroska_extension("clip.webm"));
        assert!(!has_matroska_extension("clip.mp4"));
        assert!(!has_matroska_extension("mkv"));
    }

    #[test]
    fn image_subtitles_warn() {
        let report = validate_tracks(&[
            track(1, TrackKind::Video, "V_MPEG4/ISO/AVC"),
            track(2, TrackKind::Subtitle, "S_HDMV/PGS"),
        ]);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("S_HDMV/PGS"));
    }

    #[test]
    fn no_tracks_is_an_error() {
        assert!(!validate_tracks(&[]).is_valid());
    }
}
