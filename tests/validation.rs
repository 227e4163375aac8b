//! Probing and validation integration tests.

mod common;

use std::cell::Cell;
use std::io::Read;

use common::{TrackSpec, cluster, matroska, simple_block, srt_movie, tracks};
use mkvsubs::validation::{looks_like_matroska, validate_tracks};
use mkvsubs::{DEFAULT_CHUNK_SIZE, ExtractError, MatroskaProbe, TrackKind};

// ── MatroskaProbe ──────────────────────────────────────────────────

#[test]
fn probe_lists_every_track() {
    let data = matroska(&[tracks(&[
        TrackSpec::video(1),
        TrackSpec::srt(2, "eng"),
        TrackSpec::ass(3, "jpn"),
    ])]);

    let listed = MatroskaProbe::probe_bytes(&data).unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0].kind, TrackKind::Video);
    assert_eq!(listed[1].codec_id.as_deref(), Some("S_TEXT/UTF8"));
    assert_eq!(listed[2].language, "jpn");
    assert!(listed[2].codec_header.contains("[Events]"));
}

/// Counts the bytes handed out.
struct CountingReader<'a> {
    data: &'a [u8],
    served: &'a Cell<usize>,
}

impl Read for CountingReader<'_> {
    fn read(&mut self, buffer: &mut [u8]) -> std::io::Result<usize> {
        let read = self.data.read(buffer)?;
        self.served.set(self.served.get() + read);
        Ok(read)
    }
}

#[test]
fn probe_stops_after_the_track_table() {
    let frame = "v".repeat(1 << 20);
    let data = matroska(&[
        tracks(&[TrackSpec::video(1), TrackSpec::srt(2, "eng")]),
        cluster(0, &[simple_block(1, 0, &frame)]),
    ]);
    let served = Cell::new(0);
    let reader = CountingReader {
        data: &data,
        served: &served,
    };

    let listed = MatroskaProbe::probe_reader(reader).unwrap();
    assert_eq!(listed.len(), 2);
    assert!(served.get() <= 4 * DEFAULT_CHUNK_SIZE, "read {} bytes", served.get());
    assert!(served.get() < data.len());
}

#[test]
fn probe_file_on_disk() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temporary_directory.path().join("movie.mkv");
    std::fs::write(&path, srt_movie(1)).expect("Failed to write fixture");

    let listed = MatroskaProbe::probe(&path).unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed[1].is_subtitle());
}

#[test]
fn probe_without_tracks_is_no_data_found() {
    let data = matroska(&[cluster(0, &[simple_block(1, 0, "frame")])]);
    assert!(matches!(
        MatroskaProbe::probe_bytes(&data),
        Err(ExtractError::NoDataFound)
    ));
    assert!(matches!(
        MatroskaProbe::probe_bytes(&[]),
        Err(ExtractError::NoInput)
    ));
}

// ── Sniffing ───────────────────────────────────────────────────────

#[test]
fn sniffing_by_magic_and_extension() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");

    let named = temporary_directory.path().join("named.webm");
    std::fs::write(&named, b"whatever").unwrap();
    assert!(looks_like_matroska(&named).unwrap());

    let unnamed = temporary_directory.path().join("stream.bin");
    std::fs::write(&unnamed, srt_movie(1)).unwrap();
    assert!(looks_like_matroska(&unnamed).unwrap());

    let other = temporary_directory.path().join("notes.txt");
    std::fs::write(&other, b"plain text").unwrap();
    assert!(!looks_like_matroska(&other).unwrap());

    assert!(looks_like_matroska(temporary_directory.path().join("missing.bin")).is_err());
}

// ── Track validation ───────────────────────────────────────────────

#[test]
fn probed_tracks_validate_cleanly() {
    let data = matroska(&[tracks(&[TrackSpec::video(1), TrackSpec::ass(2, "eng")])]);
    let report = validate_tracks(&MatroskaProbe::probe_bytes(&data).unwrap());

    assert!(report.is_valid());
    assert!(report.warnings.is_empty(), "{report}");
    assert_eq!(report.info.len(), 1);
    assert!(report.to_string().contains("[INFO] Subtitle track 2: S_TEXT/ASS (eng)"));
}

#[test]
fn broken_ass_header_is_reported() {
    let header = "[Script Info]\n[V4+ Styles]\nFormat: Name\n";
    let data = matroska(&[tracks(&[TrackSpec::ass(1, "eng").with_codec_private(header)])]);
    let report = validate_tracks(&MatroskaProbe::probe_bytes(&data).unwrap());

    assert!(report.is_valid());
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("[Events]"));
}

#[test]
fn video_only_file_warns() {
    let data = matroska(&[tracks(&[TrackSpec::video(1)])]);
    let report = validate_tracks(&MatroskaProbe::probe_bytes(&data).unwrap());
    assert!(report.is_valid());
    assert!(report.warnings[0].contains("No subtitle track"));
}

#[test]
fn empty_report_says_so() {
    let report = mkvsubs::ValidationReport::default();
    assert_eq!(report.issue_count(), 0);
    assert_eq!(report.to_string(), "No issues found.\n");
}
