//! Async extraction example (feature = "async").
//!
//! Usage:
//!   cargo run --features=async --example async_extraction -- <input_file>

use std::error::Error;

use mkvsubs::{ExtractOptions, ExtractionMessage, ExtractionWorker, extract_stream};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let input_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "input.mkv".to_string());
    let data = std::fs::read(&input_path)?;

    // --- Worker: one reply per request ----------------------------------------
    let worker = ExtractionWorker::spawn(ExtractOptions::new());
    match worker.extract(data.clone()).await {
        ExtractionMessage::Success(files) => {
            for file in &files {
                println!("{} ({}, {} bytes)", file.name, file.kind, file.data.len());
            }
        }
        ExtractionMessage::Error(message) => eprintln!("Worker failed: {message}"),
    }
    worker.terminate();

    // --- Stream: chunks delivered as they "arrive" ----------------------------
    let chunks: Vec<Result<Vec<u8>, std::io::Error>> =
        data.chunks(16 * 1024).map(|chunk| Ok(chunk.to_vec())).collect();
    let files = extract_stream(tokio_stream::iter(chunks), ExtractOptions::new()).await?;
    println!("Stream extraction recovered {} file(s)", files.len());

    Ok(())
}
