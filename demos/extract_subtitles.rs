//! Extract every subtitle track and subtitle attachment from a Matroska
//! file and write them next to it.
//!
//! Usage: `cargo run --example extract_subtitles -- path/to/movie.mkv [--vtt]`

use std::path::Path;

use mkvsubs::{ExtractError, ExtractOptions, MatroskaProbe, SrtOutput, SubtitleExtractor};

fn main() -> Result<(), ExtractError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "input.mkv".to_string());
    let as_vtt = std::env::args().any(|argument| argument == "--vtt");

    println!("Tracks in {path}:");
    for track in MatroskaProbe::probe(&path)? {
        println!(
            "  #{} {} [{}] {}",
            track.number,
            track.kind,
            track.language,
            track.codec_id.as_deref().unwrap_or("-")
        );
    }

    let mut options = ExtractOptions::new();
    if as_vtt {
        options = options.with_srt_output(SrtOutput::Vtt);
    }
    let files = SubtitleExtractor::with_options(options).extract_file(&path)?;

    let directory = Path::new(&path).parent().unwrap_or(Path::new("."));
    for file in &files {
        let Some(name) = file.safe_file_name() else {
            eprintln!("Skipping {:?}: unusable file name", file.name);
            continue;
        };
        let target = directory.join(name);
        std::fs::write(&target, file.data.as_bytes())?;
        println!("Wrote {} ({}, {} bytes)", target.display(), file.kind, file.data.len());
    }

    Ok(())
}
