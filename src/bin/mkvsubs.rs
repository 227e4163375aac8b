use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use mkvsubs::{
    ExtractOptions, MatroskaProbe, ProgressCallback, ProgressInfo, SrtOutput, SubtitleExtractor,
    SubtitleFile, SubtitleKind, TerminationPolicy, convert, validation,
};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  mkvsubs extract movie.mkv --out subs\n  mkvsubs extract movie.mkv --json --srt-as vtt\n  mkvsubs tracks movie.mkv --json\n  mkvsubs convert subs/1_eng.srt --to ass --out subs/1_eng.ass\n  mkvsubs completions zsh > _mkvsubs";

#[derive(Debug, Parser)]
#[command(
    name = "mkvsubs",
    version,
    about = "Extract subtitles and subtitle attachments from Matroska files",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging (overridden by RUST_LOG).
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar while reading.
    #[arg(long)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long)]
    overwrite: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract every subtitle track and subtitle attachment.
    #[command(
        about = "Extract subtitles",
        after_help = "Examples:\n  mkvsubs extract movie.mkv --out subs\n  mkvsubs extract movie.mkv --no-early-stop --srt-as ass"
    )]
    Extract {
        /// Input Matroska / WebM file.
        input: PathBuf,
        /// Output directory. Defaults to the current directory.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print the result as JSON instead of writing files.
        #[arg(long)]
        json: bool,
        /// Deliver SRT documents as srt | vtt | ass.
        #[arg(long, default_value = "srt")]
        srt_as: String,
        /// Stop once every subtitle track has this many cues.
        #[arg(long)]
        min_entries: Option<usize>,
        /// Stop once any subtitle track has this many cues.
        #[arg(long)]
        max_entries: Option<usize>,
        /// Stop after this many consecutive events without a cue.
        #[arg(long)]
        idle_limit: Option<u64>,
        /// Read the whole file.
        #[arg(long)]
        no_early_stop: bool,
        /// Read chunk size in bytes.
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// List the tracks declared in a file.
    #[command(
        about = "List tracks",
        visible_alias = "probe",
        after_help = "Examples:\n  mkvsubs tracks movie.mkv\n  mkvsubs tracks movie.mkv --json"
    )]
    Tracks {
        /// Input Matroska / WebM file.
        input: PathBuf,
        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Convert a subtitle file between srt, vtt and ass.
    #[command(
        about = "Convert a subtitle file",
        after_help = "Examples:\n  mkvsubs convert in.srt --to vtt\n  mkvsubs convert in.ass --to srt --out out.srt"
    )]
    Convert {
        /// Input subtitle file; its format is taken from the extension.
        input: PathBuf,
        /// Target format: srt | vtt | ass.
        #[arg(long)]
        to: String,
        /// Output file. Prints to stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn parse_srt_output(value: &str) -> Option<SrtOutput> {
    match value.to_ascii_lowercase().as_str() {
        "srt" => Some(SrtOutput::Srt),
        "vtt" | "webvtt" => Some(SrtOutput::Vtt),
        "ass" | "ssa" => Some(SrtOutput::Ass),
        _ => None,
    }
}

fn parse_subtitle_kind(value: &str) -> Option<SubtitleKind> {
    match value.to_ascii_lowercase().as_str() {
        "srt" => Some(SubtitleKind::Srt),
        "vtt" | "webvtt" => Some(SubtitleKind::Vtt),
        "ass" | "ssa" => Some(SubtitleKind::Ass),
        _ => None,
    }
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

/// Where `file` is written inside `out`. Directory parts of the stored name
/// are dropped.
fn output_path(out: &Path, file: &SubtitleFile) -> Option<PathBuf> {
    file.safe_file_name().map(|name| out.join(name))
}

fn init_logging(global: &GlobalOptions) {
    let default_level = if global.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new(total_bytes: Option<u64>) -> Result<Self, Box<dyn std::error::Error>> {
        let bar = match total_bytes {
            Some(total) => {
                let bar = ProgressBar::new(total);
                let style = ProgressStyle::with_template(
                    "{spinner:.green} {bar:40.cyan/blue} {bytes}/{total_bytes} {msg}",
                )?;
                bar.set_style(style.progress_chars("##-"));
                bar
            }
            None => ProgressBar::new_spinner(),
        };
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_position(info.bytes_read);
        self.bar.set_message(format!("{} cues", info.cues));
    }
}

fn build_options(
    srt_as: &str,
    min_entries: Option<usize>,
    max_entries: Option<usize>,
    idle_limit: Option<u64>,
    no_early_stop: bool,
    chunk_size: Option<usize>,
) -> Result<ExtractOptions, Box<dyn std::error::Error>> {
    let srt_output =
        parse_srt_output(srt_as).ok_or(format!("unsupported --srt-as format: {srt_as}"))?;
    let mut options = ExtractOptions::new().with_srt_output(srt_output);

    if no_early_stop {
        options = options.without_early_termination();
    } else {
        let mut policy = TerminationPolicy::new();
        if let Some(min) = min_entries {
            policy = policy.min_entries(min);
        }
        if let Some(max) = max_entries {
            if max == 0 {
                return Err("--max-entries must be greater than 0".into());
            }
            policy = policy.max_entries(max);
        }
        if let Some(idle) = idle_limit {
            policy = policy.idle_ceiling(idle).check_interval(idle.min(policy.check_interval));
        }
        options = options.with_termination(policy);
    }

    if let Some(size) = chunk_size {
        if size == 0 {
            return Err("--chunk-size must be greater than 0".into());
        }
        options = options.with_chunk_size(size);
    }

    Ok(options)
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.global);

    match cli.command {
        Commands::Extract {
            input,
            out,
            json,
            srt_as,
            min_entries,
            max_entries,
            idle_limit,
            no_early_stop,
            chunk_size,
        } => {
            let mut options = build_options(
                &srt_as,
                min_entries,
                max_entries,
                idle_limit,
                no_early_stop,
                chunk_size,
            )?;

            if !validation::looks_like_matroska(&input)? {
                eprintln!(
                    "{} {}",
                    "warning:".yellow().bold(),
                    format!("{} does not look like a Matroska file", input.display()).yellow()
                );
            }

            let progress = if cli.global.progress {
                let total = fs::metadata(&input).ok().map(|metadata| metadata.len());
                let progress = Arc::new(TerminalProgress::new(total)?);
                options = options.with_progress(progress.clone());
                Some(progress)
            } else {
                None
            };

            let result = SubtitleExtractor::with_options(options).extract_file(&input);
            if let Some(progress) = progress {
                progress.bar.finish_and_clear();
            }
            let files = result?;

            if json {
                let payload: Vec<_> = files.iter().map(|file| file.to_json()).collect();
                println!("{}", serde_json::to_string_pretty(&payload)?);
                return Ok(());
            }

            let out = out.unwrap_or_else(|| PathBuf::from("."));
            fs::create_dir_all(&out)?;
            for file in &files {
                let Some(path) = output_path(&out, file) else {
                    eprintln!(
                        "{} {}",
                        "warning:".yellow().bold(),
                        format!("skipping attachment with unusable name {:?}", file.name).yellow()
                    );
                    continue;
                };
                ensure_writable_path(&path, cli.global.overwrite)?;
                fs::write(&path, file.data.as_bytes())?;
                println!(
                    "{} {} ({}, {})",
                    "saved".green().bold(),
                    path.display(),
                    file.kind,
                    if file.language.is_empty() {
                        "attachment"
                    } else {
                        file.language.as_str()
                    }
                );
            }
        }
        Commands::Tracks { input, json } => {
            let tracks = MatroskaProbe::probe(&input)?;
            let report = validation::validate_tracks(&tracks);
            if json {
                let payload = json!({
                    "tracks": tracks.iter().map(|track| json!({
                        "number": track.number,
                        "type": track.kind.to_string(),
                        "codec": track.codec_id,
                        "language": track.language,
                        "name": track.name,
                    })).collect::<Vec<_>>(),
                    "warnings": report.warnings,
                    "errors": report.errors,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for track in &tracks {
                    let line = format!(
                        "#{} {} [{}] {}{}",
                        track.number,
                        track.kind,
                        track.language,
                        track.codec_id.as_deref().unwrap_or("?"),
                        track
                            .name
                            .as_deref()
                            .map(|name| format!(" \"{name}\""))
                            .unwrap_or_default()
                    );
                    if track.is_subtitle() {
                        println!("{}", line.green());
                    } else {
                        println!("{line}");
                    }
                }
                for warning in &report.warnings {
                    eprintln!("{} {}", "warning:".yellow().bold(), warning.yellow());
                }
            }
        }
        Commands::Convert { input, to, out } => {
            let from = SubtitleKind::from_file_name(&input.to_string_lossy());
            if from == SubtitleKind::Binary {
                return Err(format!(
                    "cannot tell the subtitle format of {} from its extension",
                    input.display()
                )
                .into());
            }
            let to = parse_subtitle_kind(&to).ok_or(format!("unsupported --to format: {to}"))?;
            let text = fs::read_to_string(&input)?;
            let converted = convert::convert(&text, from, to)?;

            match out {
                Some(path) => {
                    ensure_writable_path(&path, cli.global.overwrite)?;
                    fs::write(&path, converted)?;
                    println!("{} {}", "saved".green().bold(), path.display());
                }
                None => print!("{converted}"),
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "mkvsubs", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use mkvsubs::{SubtitleFile, SubtitleKind};

    use super::{build_options, output_path, parse_srt_output, parse_subtitle_kind};

    #[test]
    fn parse_srt_output_aliases() {
        assert!(parse_srt_output("srt").is_some());
        assert!(parse_srt_output("VTT").is_some());
        assert!(parse_srt_output("webvtt").is_some());
        assert!(parse_srt_output("ssa").is_some());
        assert!(parse_srt_output("txt").is_none());
    }

    #[test]
    fn parse_subtitle_kind_aliases() {
        assert!(parse_subtitle_kind("ass").is_some());
        assert!(parse_subtitle_kind("webvtt").is_some());
        assert!(parse_subtitle_kind("raw").is_none());
    }

    #[test]
    fn build_options_flags() {
        let options = build_options("vtt", Some(5), Some(10), Some(100), false, Some(1024)).unwrap();
        let policy = options.termination().unwrap();
        assert_eq!(policy.min_entries, 5);
        assert_eq!(policy.max_entries, 10);
        assert_eq!(policy.idle_ceiling, 100);
        assert_eq!(policy.check_interval, 100);
        assert_eq!(options.chunk_size(), 1024);

        let options = build_options("srt", None, None, None, true, None).unwrap();
        assert!(options.termination().is_none());

        assert!(build_options("txt", None, None, None, false, None).is_err());
        assert!(build_options("srt", None, Some(0), None, false, None).is_err());
    }

    #[test]
    fn output_paths_stay_inside_the_output_directory() {
        let out = Path::new("subs");
        let file = |name: &str| SubtitleFile::text(name, "", "", SubtitleKind::Srt);

        assert_eq!(
            output_path(out, &file("../../home/user/.bashrc")),
            Some(out.join(".bashrc"))
        );
        assert_eq!(output_path(out, &file("/etc/passwd")), Some(out.join("passwd")));
        assert_eq!(output_path(out, &file("1_eng.srt")), Some(out.join("1_eng.srt")));
        assert_eq!(output_path(out, &file("..")), None);
        assert_eq!(output_path(out, &file("")), None);
    }
}
