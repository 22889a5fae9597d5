//! cvseq: offline tools for the CV sequencer engine
//!
//! - `render`: render a state (plus an optional command script) to a multichannel WAV
//! - `bench`: measure render cost against the real-time budget
//! - `default-state`: print the default sequencer state as JSON
//! - `validate`: check a state file and optional command script
//!
//! Profile with: samply record ./target/profiling/cvseq bench --frames 4800000

mod bench;
mod render;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use cvseq::EngineConfig;
use cvseq::validation::{validate_command, validate_state};
use cvseq_core::SequencerState;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_FRAMES: u64 = 48000 * 10; // 10 seconds at 48kHz

/// Offline tools for the CV sequencer engine
#[derive(Parser)]
#[command(name = "cvseq")]
#[command(about = "Render, benchmark and validate CV sequencer states")]
#[command(version)]
struct Cli {
    /// Increase log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render to a 32-bit float WAV with one channel per sequencer output
    Render {
        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,

        /// Sequencer state JSON (default state when omitted)
        #[arg(long)]
        state: Option<PathBuf>,

        /// JSON-lines command script: {"at": seconds, "command": {...}} per line
        #[arg(long)]
        script: Option<PathBuf>,

        /// Engine config JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Length of the render in seconds
        #[arg(long, default_value_t = 8.0)]
        seconds: f64,

        /// Sample rate in Hz (overrides config file and CVSEQ_SAMPLE_RATE)
        #[arg(short, long)]
        sample_rate: Option<f32>,
    },

    /// Benchmark the render loop
    Bench {
        /// Sequencer state JSON (default state when omitted)
        #[arg(long)]
        state: Option<PathBuf>,

        /// Number of frames to render
        #[arg(short, long, default_value_t = DEFAULT_FRAMES)]
        frames: u64,

        /// Sample rate in Hz
        #[arg(short, long, default_value_t = 48000.0)]
        sample_rate: f32,

        /// Warmup frames before measurement
        #[arg(short, long, default_value_t = 48000)]
        warmup: u64,

        /// Also benchmark every channel mode on all eight channels
        #[arg(long)]
        per_mode: bool,
    },

    /// Print the default state as JSON
    DefaultState {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a state file and optionally a command script
    Validate {
        /// Sequencer state JSON
        state: PathBuf,

        /// JSON-lines command script
        #[arg(long)]
        script: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::prelude::*;

    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(level);
    let registry = tracing_subscriber::registry().with(fmt_layer);

    #[cfg(feature = "profile")]
    let registry = registry.with(tracing_tracy::TracyLayer::default());

    registry.init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Render {
            output,
            state,
            script,
            config,
            seconds,
            sample_rate,
        } => {
            let state = load_state(state.as_deref())?;
            let script = match script {
                Some(path) => render::load_script(&path)?,
                None => Vec::new(),
            };
            let mut config = load_config(config.as_deref())?;
            if let Some(sample_rate) = sample_rate {
                config.sample_rate = sample_rate;
            }
            let summary = render::render_to_wav(state, &script, config, seconds, &output)?;
            println!("{}", summary);
        }
        Commands::Bench {
            state,
            frames,
            sample_rate,
            warmup,
            per_mode,
        } => {
            let state = load_state(state.as_deref())?;
            let report = bench::run_benchmark(&state, frames, sample_rate, warmup);
            bench::print_report(&report);
            if per_mode {
                bench::print_mode_table(&bench::run_per_mode(frames, sample_rate));
            }
        }
        Commands::DefaultState { output } => {
            let json = SequencerState::default()
                .to_json_pretty()
                .context("Failed to serialize default state")?;
            match output {
                Some(path) => fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{}", json),
            }
        }
        Commands::Validate { state, script } => validate_files(&state, script.as_deref())?,
    }

    Ok(())
}

fn load_state(path: Option<&Path>) -> Result<SequencerState> {
    let Some(path) = path else {
        return Ok(SequencerState::default());
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file {}", path.display()))?;
    SequencerState::from_json_str(&json)
        .with_context(|| format!("Failed to parse state file {}", path.display()))
}

/// Config file (or defaults), then `CVSEQ_SAMPLE_RATE`.
fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            EngineConfig::from_json_str(&json)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    Ok(config.with_env_overrides())
}

fn validate_files(state_path: &Path, script_path: Option<&Path>) -> Result<()> {
    let state = load_state(Some(state_path))?;
    let mut problems = 0;

    for error in validate_state(&state) {
        println!("{} {}", "error:".red().bold(), error);
        problems += 1;
    }

    if let Some(script_path) = script_path {
        for entry in render::load_script(script_path)? {
            for error in validate_command(&entry.command) {
                println!(
                    "{} {} (command at {}s)",
                    "error:".red().bold(),
                    error,
                    entry.at
                );
                problems += 1;
            }
        }
    }

    if problems > 0 {
        bail!("{} validation error(s)", problems);
    }
    println!("{} {}", "ok:".green().bold(), state_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_render_arguments() {
        let cli = Cli::parse_from([
            "cvseq", "-vv", "render", "-o", "out.wav", "--seconds", "2", "--sample-rate", "44100",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Render {
                output,
                seconds,
                sample_rate,
                state,
                ..
            } => {
                assert_eq!(output, PathBuf::from("out.wav"));
                assert_eq!(seconds, 2.0);
                assert_eq!(sample_rate, Some(44100.0));
                assert!(state.is_none());
            }
            _ => panic!("expected render"),
        }
    }

    #[test]
    fn validate_reports_bad_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(
            &path,
            serde_json::json!({"config": {"globalStepCount": 1}}).to_string(),
        )
        .unwrap();
        assert!(validate_files(&path, None).is_err());

        fs::write(&path, SequencerState::default().to_json_pretty().unwrap()).unwrap();
        assert!(validate_files(&path, None).is_ok());
    }

    #[test]
    fn missing_state_file_has_context() {
        let error = load_state(Some(Path::new("/definitely/not/here.json"))).unwrap_err();
        assert!(error.to_string().contains("Failed to read state file"));
    }
}
