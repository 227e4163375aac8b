//! Async worker and stream extraction tests.

#![cfg(feature = "async")]

mod common;

use std::io::Error as IoError;

use common::srt_movie;
use mkvsubs::{
    ExtractError, ExtractOptions, ExtractionMessage, ExtractionWorker, TerminationPolicy,
    extract_stream,
};

fn chunked(data: &[u8], size: usize) -> Vec<Result<Vec<u8>, IoError>> {
    data.chunks(size).map(|chunk| Ok(chunk.to_vec())).collect()
}

// ── ExtractionWorker ───────────────────────────────────────────────

#[tokio::test]
async fn worker_replies_with_success() {
    let worker = ExtractionWorker::spawn(ExtractOptions::new());

    let message = worker.extract(srt_movie(2)).await;
    assert!(message.is_success());
    let ExtractionMessage::Success(files) = &message else {
        panic!("expected success, got {message:?}");
    };
    assert_eq!(files[0].name, "1_eng.srt");

    let json = message.to_json();
    assert_eq!(json["type"], "success");
    assert_eq!(json["files"][0]["name"], "1_eng.srt");

    worker.terminate();
}

#[tokio::test]
async fn worker_replies_with_error() {
    let worker = ExtractionWorker::spawn(ExtractOptions::new());

    let message = worker.extract(Vec::new()).await;
    assert_eq!(message, ExtractionMessage::Error("No file provided".to_string()));
    assert_eq!(message.to_json()["type"], "error");
    assert_eq!(message.to_json()["message"], "No file provided");

    worker.terminate();
}

#[tokio::test]
async fn worker_handles_requests_in_sequence() {
    let worker = ExtractionWorker::spawn(ExtractOptions::new());

    let first = worker.extract(srt_movie(1)).await;
    let second = worker.extract(b"not matroska".to_vec()).await;
    let third = worker.extract(srt_movie(3)).await;

    assert!(first.is_success());
    assert!(!second.is_success());
    assert!(third.is_success());

    worker.terminate();
}

// ── extract_stream ─────────────────────────────────────────────────

#[tokio::test]
async fn stream_extraction_matches_blocking_extraction() {
    let data = srt_movie(4);
    let expected = mkvsubs::SubtitleExtractor::new()
        .extract_bytes(&data)
        .unwrap();

    let stream = tokio_stream::iter(chunked(&data, 7));
    let files = extract_stream(stream, ExtractOptions::new()).await.unwrap();
    assert_eq!(files, expected);
}

#[tokio::test]
async fn stream_stops_polling_once_enough_cues_arrived() {
    let data = srt_movie(40);
    // A failing chunk after the data would surface as an error if polled.
    let mut chunks = chunked(&data, 32);
    chunks.push(Err(IoError::other("polled too far")));

    let options = ExtractOptions::new().with_termination(TerminationPolicy::new().min_entries(3));
    let files = extract_stream(tokio_stream::iter(chunks), options)
        .await
        .unwrap();
    let text = files[0].data.as_text().unwrap();
    assert_eq!(text.matches(" --> ").count(), 3);
}

#[tokio::test]
async fn empty_stream_is_no_input() {
    let stream = tokio_stream::iter(Vec::<Result<Vec<u8>, IoError>>::new());
    let result = extract_stream(stream, ExtractOptions::new()).await;
    assert!(matches!(result, Err(ExtractError::NoInput)));
}

#[tokio::test]
async fn stream_error_is_an_io_error() {
    let mut chunks = chunked(&srt_movie(2)[..20], 10);
    chunks.push(Err(IoError::other("network down")));

    let result = extract_stream(tokio_stream::iter(chunks), ExtractOptions::new()).await;
    assert!(matches!(result, Err(ExtractError::IoError(_))));
}
