//! Text subtitle conversion.
//!
//! Pure transforms between SRT, WebVTT and ASS documents. SRT is the pivot
//! format: [`srt_to_vtt`] and [`srt_to_ass`] normalize extractor output,
//! [`vtt_to_srt`] and [`ass_to_srt`] go the other way.
//!
//! # Example
//!
//! ```
//! use mkvsubs::convert::srt_to_vtt;
//!
//! let vtt = srt_to_vtt("1\n00:00:01,000 --> 00:00:02,500\nHello\n\n");
//! assert_eq!(vtt, "WEBVTT\n\n00:00:01.000 --> 00:00:02.500\nHello\n\n");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ExtractError;
use crate::subtitle::SubtitleKind;
use crate::timestamp::{
    format_ass_timestamp, format_srt_timestamp, format_vtt_timestamp, parse_ass_timestamp,
    parse_srt_timestamp,
};

static SRT_BLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\n(\d{2}:\d{2}:\d{2},\d{3}) --> (\d{2}:\d{2}:\d{2},\d{3})\n([\s\S]+)")
        .expect("Invalid SRT block regex")
});

static VTT_TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^((?:\d+:)?\d{2}:\d{2}\.\d{3})\s+-->\s+((?:\d+:)?\d{2}:\d{2}\.\d{3})")
        .expect("Invalid VTT timing regex")
});

static HTML_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?([ibus])>").expect("Invalid HTML tag regex"));

/// MarginV of the upper line of a split two-line cue.
const STACKED_MARGIN_V: u32 = 70;

const ASS_HEADER: &str = "[Script Info]
ScriptType: v4.00+
WrapStyle: 0
ScaledBorderAndShadow: yes
PlayResX: 1920
PlayResY: 1080

[V4+ Styles]
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding
Style: Default,Arial,64,&H00FFFFFF,&H000000FF,&H00000000,&H80000000,0,0,0,0,100,100,0,0,1,3,1,2,40,40,20,1

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
";

/// One timed cue, independent of its source format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    /// Start, in milliseconds.
    pub start: u64,
    /// End, in milliseconds.
    pub end: u64,
    /// Cue text; lines separated by `\n`.
    pub text: String,
}

/// Parse SRT cues in document order.
///
/// Blocks are separated by a blank line and must match
/// `<index>\n<start> --> <end>\n<text>` exactly; anything else is skipped.
pub fn parse_srt(input: &str) -> Vec<Cue> {
    let input = input.replace("\r\n", "\n");
    input
        .split("\n\n")
        .filter_map(|block| {
            let captures = SRT_BLOCK_REGEX.captures(block.trim_start_matches('\n'))?;
            Some(Cue {
                start: parse_srt_timestamp(&captures[2])?,
                end: parse_srt_timestamp(&captures[3])?,
                text: captures[4].trim_end_matches('\n').to_string(),
            })
        })
        .collect()
}

/// Parse WebVTT cues in document order. Header, `NOTE`, `STYLE` and
/// `REGION` blocks are skipped, as are cue settings.
pub fn parse_vtt(input: &str) -> Vec<Cue> {
    let input = input.replace("\r\n", "\n");
    let mut cues = Vec::new();

    for block in input.split("\n\n") {
        let block = block.trim_matches('\n');
        let mut lines = block.lines();
        let Some(mut line) = lines.next() else {
            continue;
        };
        if line.starts_with("WEBVTT")
            || line.starts_with("NOTE")
            || line.starts_with("STYLE")
            || line.starts_with("REGION")
        {
            continue;
        }
        // Optional cue identifier.
        if !line.contains("-->") {
            match lines.next() {
                Some(next) => line = next,
                None => continue,
            }
        }
        let Some(captures) = VTT_TIMING_REGEX.captures(line) else {
            continue;
        };
        let (Some(start), Some(end)) = (
            parse_srt_timestamp(&captures[1]),
            parse_srt_timestamp(&captures[2]),
        ) else {
            continue;
        };
        cues.push(Cue {
            start,
            end,
            text: lines.collect::<Vec<_>>().join("\n"),
        });
    }

    cues
}

/// Parse the `Dialogue:` lines of an ASS/SSA script. Override blocks are
/// removed from the text and `\N` becomes a newline.
pub fn parse_ass(input: &str) -> Vec<Cue> {
    let mut fields: Option<Vec<String>> = None;
    let mut in_events = false;
    let mut cues = Vec::new();

    for line in input.lines() {
        let line = line.trim_end_matches('\r');
        if line.starts_with('[') {
            in_events = line.trim().eq_ignore_ascii_case("[Events]");
            continue;
        }
        if !in_events {
            continue;
        }
        if let Some(format) = line.strip_prefix("Format:") {
            fields = Some(format.split(',').map(|f| f.trim().to_ascii_lowercase()).collect());
            continue;
        }
        let Some(dialogue) = line.strip_prefix("Dialogue:") else {
            continue;
        };

        let names = fields.get_or_insert_with(default_event_fields);
        let values: Vec<&str> = dialogue.trim_start().splitn(names.len(), ',').collect();
        let field = |name: &str| {
            names
                .iter()
                .position(|candidate| candidate == name)
                .and_then(|index| values.get(index))
                .copied()
        };

        let (Some(start), Some(end)) = (
            field("start").and_then(parse_ass_timestamp),
            field("end").and_then(parse_ass_timestamp),
        ) else {
            log::warn!("Skipping Dialogue line with unreadable timing: {line}");
            continue;
        };
        cues.push(Cue {
            start,
            end,
            text: strip_ass_tags(field("text").unwrap_or_default()),
        });
    }

    cues
}

fn default_event_fields() -> Vec<String> {
    [
        "layer", "start", "end", "style", "name", "marginl", "marginr", "marginv", "effect",
        "text",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}

/// Remove `{...}` override blocks and translate ASS line breaks.
fn strip_ass_tags(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut in_tag = false;

    for c in input.chars() {
        if c == '{' && !in_tag {
            in_tag = true;
        } else if c == '}' && in_tag {
            in_tag = false;
        } else if !in_tag {
            result.push(c);
        }
    }

    result
        .replace("\\N", "\n")
        .replace("\\n", "\n")
        .replace("\\h", " ")
        .trim()
        .to_string()
}

/// Render cues as SRT, numbered from 1 in the given order.
pub fn write_srt(cues: &[Cue]) -> String {
    let mut output = String::new();
    for (i, cue) in cues.iter().enumerate() {
        output.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_srt_timestamp(cue.start),
            format_srt_timestamp(cue.end),
            cue.text
        ));
    }
    output
}

/// Render cues as WebVTT, without cue identifiers.
pub fn write_vtt(cues: &[Cue]) -> String {
    let mut output = String::from("WEBVTT\n\n");
    for cue in cues {
        output.push_str(&format!(
            "{} --> {}\n{}\n\n",
            format_vtt_timestamp(cue.start),
            format_vtt_timestamp(cue.end),
            cue.text
        ));
    }
    output
}

/// Render cues as a complete ASS script with a fixed `Default` style,
/// ordered by start time.
///
/// A cue spanning several lines becomes two `Dialogue:` entries with the
/// same timing: the first line raised by a larger vertical margin, the
/// remaining lines below it.
pub fn write_ass(cues: &[Cue]) -> String {
    let mut sorted: Vec<&Cue> = cues.iter().collect();
    sorted.sort_by_key(|cue| cue.start);

    let mut output = String::from(ASS_HEADER);
    for cue in sorted {
        let start = format_ass_timestamp(cue.start);
        let end = format_ass_timestamp(cue.end);
        let text = html_to_ass(&cue.text);

        match text.split_once('\n') {
            Some((first, rest)) => {
                output.push_str(&format!(
                    "Dialogue: 0,{start},{end},Default,,0,0,{STACKED_MARGIN_V},,{first}\n"
                ));
                output.push_str(&format!(
                    "Dialogue: 0,{start},{end},Default,,0,0,0,,{}\n",
                    rest.replace('\n', "\\N")
                ));
            }
            None => {
                output.push_str(&format!("Dialogue: 0,{start},{end},Default,,0,0,0,,{text}\n"));
            }
        }
    }
    output
}

/// Translate SRT `<i>`, `<b>`, `<u>` and `<s>` tags into ASS overrides.
fn html_to_ass(text: &str) -> String {
    HTML_TAG_REGEX
        .replace_all(text, |captures: &regex::Captures<'_>| {
            let state = if captures[0].starts_with("</") { 0 } else { 1 };
            format!("{{\\{}{state}}}", &captures[1])
        })
        .into_owned()
}

/// Convert SRT to WebVTT: prepend the `WEBVTT` header, drop cue indices
/// and switch the millisecond separator to `.`.
pub fn srt_to_vtt(srt: &str) -> String {
    write_vtt(&parse_srt(srt))
}

/// Convert SRT to a complete ASS script. See [`write_ass`].
pub fn srt_to_ass(srt: &str) -> String {
    write_ass(&parse_srt(srt))
}

/// Convert WebVTT to SRT.
pub fn vtt_to_srt(vtt: &str) -> String {
    write_srt(&parse_vtt(vtt))
}

/// Convert an ASS/SSA script to SRT, ordered by start time. Styling is
/// discarded.
pub fn ass_to_srt(ass: &str) -> String {
    let mut cues = parse_ass(ass);
    cues.sort_by_key(|cue| cue.start);
    write_srt(&cues)
}

/// Convert `input` from one text format to another.
///
/// Fails with [`ExtractError::InvalidSubtitle`] when the input holds no
/// readable cue or either side is [`SubtitleKind::Binary`].
pub fn convert(input: &str, from: SubtitleKind, to: SubtitleKind) -> Result<String, ExtractError> {
    let mut cues = match from {
        SubtitleKind::Srt => parse_srt(input),
        SubtitleKind::Vtt => parse_vtt(input),
        SubtitleKind::Ass => parse_ass(input),
        SubtitleKind::Binary => {
            return Err(ExtractError::InvalidSubtitle(
                "binary attachments cannot be converted".to_string(),
            ));
        }
    };
    if cues.is_empty() {
        return Err(ExtractError::InvalidSubtitle(format!(
            "no {from} cue found in input"
        )));
    }
    if from == SubtitleKind::Ass {
        cues.sort_by_key(|cue| cue.start);
    }

    match to {
        SubtitleKind::Srt => Ok(write_srt(&cues)),
        SubtitleKind::Vtt => Ok(write_vtt(&cues)),
        SubtitleKind::Ass => Ok(write_ass(&cues)),
        SubtitleKind::Binary => Err(ExtractError::InvalidSubtitle(
            "cannot convert to a binary attachment".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srt_parse_skips_malformed_blocks() {
        let srt = "1\n00:00:01,000 --> 00:00:02,000\nA\n\nnot a cue\n\n2\n00:00:03,000 --> 00:00:04,000\nB\nC\n";
        let cues = parse_srt(srt);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[1].text, "B\nC");
        assert_eq!(cues[1].start, 3000);
    }

    #[test]
    fn srt_parse_handles_crlf() {
        let cues = parse_srt("1\r\n00:00:01,000 --> 00:00:02,000\r\nHi\r\n\r\n");
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "Hi");
    }

    #[test]
    fn vtt_parse_with_identifier_and_settings() {
        let vtt = "WEBVTT\n\nNOTE hello\n\nintro\n00:01.000 --> 00:02.000 align:start\nHi\n\n";
        let cues = parse_vtt(vtt);
        assert_eq!(
            cues,
            vec![Cue {
                start: 1000,
                end: 2000,
                text: "Hi".to_string()
            }]
        );
    }

    #[test]
    fn ass_parse_respects_format_line() {
        let ass = "[Events]\nFormat: Layer, Start, End, Style, Text\nDialogue: 0,0:00:01.00,0:00:02.50,Default,{\\i1}a, b\\Nc\n";
        let cues = parse_ass(ass);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].end, 2500);
        assert_eq!(cues[0].text, "a, b\nc");
    }

    #[test]
    fn html_tags_become_overrides() {
        assert_eq!(html_to_ass("<i>x</i>"), "{\\i1}x{\\i0}");
    }

    #[test]
    fn convert_rejects_empty_input() {
        assert!(matches!(
            convert("nothing here", SubtitleKind::Srt, SubtitleKind::Vtt),
            Err(ExtractError::InvalidSubtitle(_))
        ));
    }
}
