//! Subtitle timestamp formatting and parsing.
//!
//! All values are milliseconds from the start of the presentation.

/// Format as an ASS timestamp, `H:MM:SS.cc`.
///
/// Rounded to the nearest centisecond; hours are not zero-padded.
pub fn format_ass_timestamp(millis: u64) -> String {
    let centis = millis.saturating_add(5) / 10;
    let hours = centis / 360_000;
    let minutes = (centis % 360_000) / 6000;
    let seconds = (centis % 6000) / 100;
    let centis = centis % 100;
    format!("{hours}:{minutes:02}:{seconds:02}.{centis:02}")
}

/// Format as an SRT timestamp, `HH:MM:SS,mmm`.
pub fn format_srt_timestamp(millis: u64) -> String {
    let (hours, minutes, seconds, millis) = split(millis);
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Format as a WebVTT timestamp, `HH:MM:SS.mmm`.
pub fn format_vtt_timestamp(millis: u64) -> String {
    let (hours, minutes, seconds, millis) = split(millis);
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

fn split(millis: u64) -> (u64, u64, u64, u64) {
    let total_secs = millis / 1000;
    (
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60,
        millis % 1000,
    )
}

/// Parse an SRT or WebVTT timestamp.
///
/// Accepts `HH:MM:SS,mmm`, `HH:MM:SS.mmm` and the WebVTT short form
/// `MM:SS.mmm`.
pub fn parse_srt_timestamp(input: &str) -> Option<u64> {
    let input = input.trim();
    let (clock, fraction) = input.split_once([',', '.'])?;
    if fraction.is_empty() || fraction.len() > 3 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // "5" means 500 ms, as in "00:00:01,5".
    let millis = fraction.parse::<u64>().ok()? * 10u64.pow(3 - fraction.len() as u32);
    parse_clock(clock)?.checked_mul(1000)?.checked_add(millis)
}

/// Parse an ASS timestamp, `H:MM:SS.cc`.
pub fn parse_ass_timestamp(input: &str) -> Option<u64> {
    let input = input.trim();
    let (clock, centis) = input.split_once('.')?;
    if centis.len() != 2 || !centis.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let centis = centis.parse::<u64>().ok()?;
    parse_clock(clock)?.checked_mul(1000)?.checked_add(centis * 10)
}

/// Parse `H:MM:SS` or `MM:SS` into whole seconds.
fn parse_clock(clock: &str) -> Option<u64> {
    let mut fields = clock
        .split(':')
        .map(|field| {
            if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
                None
            } else {
                field.parse::<u64>().ok()
            }
        })
        .collect::<Option<Vec<u64>>>()?;

    let seconds = fields.pop()?;
    let minutes = fields.pop()?;
    let hours = fields.pop().unwrap_or(0);
    if !fields.is_empty() || minutes >= 60 || seconds >= 60 {
        return None;
    }
    hours.checked_mul(3600)?.checked_add(minutes * 60 + seconds)
}
