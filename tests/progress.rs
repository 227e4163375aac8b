//! Progress and cancellation integration tests.

mod common;

use std::sync::{Arc, Mutex};

use common::srt_movie;
use mkvsubs::{
    CancellationToken, ExtractError, ExtractOptions, OperationType, ProgressCallback,
    ProgressInfo, SubtitleExtractor,
};

#[derive(Default)]
struct RecordingProgress {
    reports: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.reports.lock().unwrap().push(info.clone());
    }
}

/// Cancels its token from inside the callback after the first report.
struct CancelAfterFirst {
    token: CancellationToken,
}

impl ProgressCallback for CancelAfterFirst {
    fn on_progress(&self, _info: &ProgressInfo) {
        self.token.cancel();
    }
}

// ── CancellationToken ──────────────────────────────────────────────

#[test]
fn cancellation_token_default_not_cancelled() {
    let token = CancellationToken::default();
    assert!(!token.is_cancelled());
}

#[test]
fn cancellation_token_clone_shares_state() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());

    token.cancel();
    assert!(clone.is_cancelled());
}

#[test]
fn cancelled_before_start_returns_error() {
    let token = CancellationToken::new();
    token.cancel();

    let options = ExtractOptions::new().with_cancellation(token);
    let result = SubtitleExtractor::with_options(options).extract_bytes(&srt_movie(3));
    let error = result.unwrap_err();
    assert!(matches!(error, ExtractError::Cancelled));
    assert_eq!(error.to_string(), "Operation cancelled");
}

#[test]
fn cancelled_mid_stream_discards_everything() {
    let token = CancellationToken::new();
    let options = ExtractOptions::new()
        .without_early_termination()
        .with_chunk_size(32)
        .with_cancellation(token.clone())
        .with_progress(Arc::new(CancelAfterFirst { token }));

    let result = SubtitleExtractor::with_options(options).extract_bytes(&srt_movie(10));
    assert!(matches!(result, Err(ExtractError::Cancelled)));
}

// ── Progress callbacks ─────────────────────────────────────────────

#[test]
fn progress_reports_every_batch_and_at_the_end() {
    let data = srt_movie(10);
    let chunk_size = 64;
    let chunks = data.len().div_ceil(chunk_size) as u64;
    let recorder = Arc::new(RecordingProgress::default());

    let options = ExtractOptions::new()
        .without_early_termination()
        .with_chunk_size(chunk_size)
        .with_batch_size(4)
        .with_progress(recorder.clone());
    SubtitleExtractor::with_options(options)
        .extract_bytes(&data)
        .unwrap();

    let reports = recorder.reports.lock().unwrap();
    assert_eq!(reports.len() as u64, chunks / 4 + 1);

    let last = reports.last().unwrap();
    assert_eq!(last.operation, OperationType::SubtitleExtraction);
    assert_eq!(last.chunks, chunks);
    assert_eq!(last.bytes_read, data.len() as u64);
    assert_eq!(last.total_bytes, Some(data.len() as u64));
    assert_eq!(last.percentage, Some(100.0));
    assert_eq!(last.cues, 10);

    let bytes: Vec<u64> = reports.iter().map(|report| report.bytes_read).collect();
    assert!(bytes.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn reader_input_has_no_percentage() {
    let recorder = Arc::new(RecordingProgress::default());
    let options = ExtractOptions::new().with_progress(recorder.clone());
    SubtitleExtractor::with_options(options)
        .extract_reader(std::io::Cursor::new(srt_movie(2)))
        .unwrap();

    let reports = recorder.reports.lock().unwrap();
    assert!(!reports.is_empty());
    assert!(reports.iter().all(|report| report.percentage.is_none()));
}
