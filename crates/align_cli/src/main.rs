//! Align Track to Reference - command-line host
//!
//! Usage:
//!   align-track run --project song.json --reference 1 --target 2
//!   align-track onsets --file bass.wav --mode 100
//!   align-track init-config

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};

use align_core::analysis::OnsetDetector;
use align_core::audio::{probe_wav, WavReader};
use align_core::config::{ConfigManager, ModeParams, Settings};
use align_core::logging::{init_tracing, LogCallback, RunLogger, RunLoggerBuilder};
use align_core::models::{Segment, SegmentId, TrackRef};
use align_core::orchestrator::{run_alignment, AlignRequest, Context, RunOutcome, Scope};
use align_core::timeline::InMemoryTimeline;

const DEFAULT_CONFIG: &str = "align-track.toml";

#[derive(Parser)]
#[command(
    name = "align-track",
    version,
    about = "Align a track to a reference track by onset timing"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Align the target track of a project to the reference track
    Run {
        /// Project document (JSON)
        #[arg(short, long)]
        project: PathBuf,
        /// Reference track number (starting at 1)
        #[arg(short, long)]
        reference: usize,
        /// Target track number (starting at 1)
        #[arg(short, long)]
        target: usize,
        /// Smallest timing error to correct, in ms
        #[arg(long)]
        threshold_ms: Option<f64>,
        /// 0 = smart (musical), 100 = precise (tight)
        #[arg(short, long)]
        mode: Option<f64>,
        /// Only process START:END seconds on both tracks
        #[arg(long, value_parser = parse_time_range)]
        time_range: Option<(f64, f64)>,
        /// Only process these target segment ids
        #[arg(long, value_delimiter = ',')]
        selected: Vec<u64>,
        /// Write the updated project here instead of in place
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Settings file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
        /// Print the run report as JSON on stdout (log goes to stderr)
        #[arg(long)]
        report_json: bool,
        /// Show per-adjustment detail
        #[arg(short, long)]
        verbose: bool,
    },
    /// Print the onsets detected in one WAV file
    Onsets {
        /// WAV file
        #[arg(short, long)]
        file: PathBuf,
        /// Start of the analysed window, in seconds
        #[arg(long, default_value_t = 0.0)]
        offset: f64,
        /// Length of the analysed window, in seconds (default: rest of file)
        #[arg(short, long)]
        length: Option<f64>,
        /// 0 = smart (musical), 100 = precise (tight)
        #[arg(short, long)]
        mode: Option<f64>,
        /// Settings file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },
    /// Write a settings file with default values
    InitConfig {
        /// Settings file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            project,
            reference,
            target,
            threshold_ms,
            mode,
            time_range,
            selected,
            output,
            config,
            report_json,
            verbose,
        } => {
            let manager = load_config(&config)?;
            let settings = manager.settings();

            let request = AlignRequest::new(
                track_number(reference, "reference")?,
                track_number(target, "target")?,
                threshold_ms.unwrap_or(settings.alignment.threshold_ms),
                mode.unwrap_or(settings.alignment.mode),
            )
            .with_scope(Scope::from_selection(
                time_range,
                selected.into_iter().map(SegmentId).collect(),
            ));

            let run_name = format!("align_track{}", target);
            let logger = run_logger(&manager, &run_name, verbose, report_json)?;

            let output = output.unwrap_or_else(|| project.clone());
            align(&project, &output, request, run_name, logger, settings, report_json)
        }
        Commands::Onsets {
            file,
            offset,
            length,
            mode,
            config,
        } => {
            let manager = load_config(&config)?;
            let settings = manager.settings();
            print_onsets(
                &file,
                offset,
                length,
                mode.unwrap_or(settings.alignment.mode),
                settings.alignment.analysis_sample_rate,
            )
        }
        Commands::InitConfig { config } => init_config(&config),
    }
}

fn load_config(path: &Path) -> Result<ConfigManager> {
    let mut manager = ConfigManager::new(path);
    manager
        .load_or_create()
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    init_tracing(manager.settings().logging.level);
    tracing::debug!("Settings loaded from {}", path.display());
    Ok(manager)
}

fn track_number(number: usize, role: &str) -> Result<TrackRef> {
    match TrackRef::from_number(number) {
        Some(track) => Ok(track),
        None => bail!("The {} track number starts at 1", role),
    }
}

fn run_logger(manager: &ConfigManager, run_name: &str, verbose: bool, to_stderr: bool) -> Result<RunLogger> {
    let logging = &manager.settings().logging;

    let callback: LogCallback = if to_stderr {
        Box::new(|line| eprintln!("{}", line))
    } else {
        Box::new(|line| println!("{}", line))
    };

    let mut builder = RunLoggerBuilder::new(run_name)
        .level(logging.level)
        .compact(logging.compact && !verbose)
        .show_timestamps(logging.show_timestamps)
        .callback(callback);
    if logging.write_log_file {
        builder = builder.log_dir(manager.logs_folder());
    }

    builder.build().context("Failed to create run log")
}

fn align(
    project: &Path,
    output: &Path,
    request: AlignRequest,
    run_name: String,
    logger: RunLogger,
    settings: &Settings,
    report_json: bool,
) -> Result<()> {
    let mut timeline = InMemoryTimeline::load(project)
        .with_context(|| format!("Failed to load project {}", project.display()))?;

    let logger = Arc::new(logger);
    let ctx = Context::new(request, run_name, Arc::clone(&logger))
        .with_sample_rate(settings.alignment.analysis_sample_rate);

    let report = run_alignment(&ctx, &mut timeline)?;

    match &report.outcome {
        RunOutcome::Completed => {
            timeline
                .save(output)
                .with_context(|| format!("Failed to write project {}", output.display()))?;
            logger.info(&format!("Saved {}", output.display()));
        }
        RunOutcome::NothingToDo(reason) => {
            logger.info(&format!("Project left unchanged: {}", reason));
        }
    }
    if let Some(path) = logger.log_path() {
        logger.info(&format!("Log written to {}", path.display()));
    }
    logger.close();

    if report_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn print_onsets(file: &Path, offset: f64, length: Option<f64>, mode: f64, sample_rate: u32) -> Result<()> {
    let info = probe_wav(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let length = length.unwrap_or(info.duration_secs - offset);
    if length <= 0.0 {
        bail!("Nothing to analyse: window starts after the end of the file");
    }

    let params = ModeParams::from_mode(mode);
    let reader = WavReader::new(sample_rate);
    let detector = OnsetDetector::new(&reader, params.onset_config());

    // Position the segment at its file offset so onsets print as file times
    let segment = Segment::new(SegmentId(0), offset, length, file, offset);
    let onsets = detector.detect(&[segment]);

    println!(
        "{}: {} onsets ({}, sensitivity {:.1})",
        file.display(),
        onsets.len(),
        params.label(),
        params.onset_threshold_factor
    );
    for onset in onsets {
        println!("{:.3}", onset);
    }
    Ok(())
}

fn init_config(path: &Path) -> Result<()> {
    let existed = path.exists();
    let mut manager = ConfigManager::new(path);
    if existed {
        manager
            .load_or_create()
            .with_context(|| format!("Failed to update {}", path.display()))?;
        println!("Settings file {} is up to date", path.display());
    } else {
        manager
            .save()
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote default settings to {}", path.display());
    }
    Ok(())
}

/// Parse `START:END` in seconds.
fn parse_time_range(value: &str) -> Result<(f64, f64), String> {
    let (start, end) = value
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got '{}'", value))?;
    let start: f64 = start
        .trim()
        .parse()
        .map_err(|_| format!("invalid start time '{}'", start))?;
    let end: f64 = end
        .trim()
        .parse()
        .map_err(|_| format!("invalid end time '{}'", end))?;
    if end <= start {
        return Err(format!("end {} must be after start {}", end, start));
    }
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_time_ranges() {
        assert_eq!(parse_time_range("1.5:4"), Ok((1.5, 4.0)));
        assert_eq!(parse_time_range(" 0 : 10.25 "), Ok((0.0, 10.25)));
        assert!(parse_time_range("4").is_err());
        assert!(parse_time_range("a:4").is_err());
        assert!(parse_time_range("5:5").is_err());
    }

    #[test]
    fn parses_run_arguments() {
        let cli = Cli::try_parse_from([
            "align-track",
            "run",
            "--project",
            "song.json",
            "--reference",
            "1",
            "--target",
            "3",
            "--time-range",
            "2:6",
            "--selected",
            "4,5",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                reference,
                target,
                time_range,
                selected,
                threshold_ms,
                config,
                ..
            } => {
                assert_eq!(reference, 1);
                assert_eq!(target, 3);
                assert_eq!(time_range, Some((2.0, 6.0)));
                assert_eq!(selected, vec![4, 5]);
                assert_eq!(threshold_ms, None);
                assert_eq!(config, PathBuf::from(DEFAULT_CONFIG));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn track_numbers_start_at_one() {
        assert_eq!(track_number(2, "target").unwrap(), TrackRef(1));
        assert!(track_number(0, "reference").is_err());
    }

    #[test]
    fn init_config_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        init_config(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[alignment]"));
        assert!(content.contains("threshold_ms"));
    }
}
