//! Offline rendering through the same queue path a live host uses.
//!
//! Script files are JSON lines, one `{"at": seconds, "command": {...}}` per line.
//! Commands are sent once rendering reaches their time and take effect at the
//! next block boundary.

use anyhow::{Context, Result, bail};
use cvseq::{Command, EngineConfig, Event, Sequencer};
use cvseq_core::{CHANNEL_COUNT, SequencerState};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptEntry {
    /// Seconds from the start of the render
    pub at: f64,
    pub command: Command,
}

/// Blank lines and lines starting with `#` are skipped.
pub fn load_script(path: &Path) -> Result<Vec<ScriptEntry>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;

    let mut entries = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let entry: ScriptEntry = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid script entry", path.display(), index + 1))?;
        if !(entry.at.is_finite() && entry.at >= 0.0) {
            bail!(
                "{}:{}: `at` must be a non-negative number of seconds",
                path.display(),
                index + 1
            );
        }
        entries.push(entry);
    }
    Ok(entries)
}

#[derive(Debug, Clone, Default)]
pub struct RenderSummary {
    pub path: PathBuf,
    pub frames: u64,
    pub sample_rate: u32,
    pub commands: usize,
    pub step_changes: usize,
    pub sh_updates: usize,
    pub errors: usize,
    pub dropped_events: u64,
}

impl fmt::Display for RenderSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Rendered {} frames ({:.2}s at {}Hz) to {}",
            self.frames,
            self.frames as f64 / self.sample_rate as f64,
            self.sample_rate,
            self.path.display()
        )?;
        writeln!(f, "  Commands:       {}", self.commands)?;
        writeln!(f, "  Step changes:   {}", self.step_changes)?;
        writeln!(f, "  S&H updates:    {}", self.sh_updates)?;
        writeln!(f, "  Errors:         {}", self.errors)?;
        write!(f, "  Dropped events: {}", self.dropped_events)
    }
}

/// Render `seconds` of output to a 32-bit float WAV, one channel per sequencer
/// output. The transport is started before the first block.
pub fn render_to_wav(
    state: SequencerState,
    script: &[ScriptEntry],
    config: EngineConfig,
    seconds: f64,
    output: &Path,
) -> Result<RenderSummary> {
    if !(seconds.is_finite() && seconds > 0.0) {
        bail!("render length must be a positive number of seconds, got {}", seconds);
    }

    let block_size = config.block_size;
    let queue_capacity = config.command_queue_capacity;
    let (sequencer, mut processor) =
        Sequencer::new(config, state).context("Failed to create sequencer")?;
    let sample_rate = sequencer.config().sample_rate;

    let mut script: Vec<&ScriptEntry> = script.iter().collect();
    script.sort_by(|a, b| a.at.total_cmp(&b.at));

    let spec = hound::WavSpec {
        channels: CHANNEL_COUNT as u16,
        sample_rate: sample_rate.round() as u32,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(output, spec)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let total_frames = (seconds * sample_rate as f64).round() as u64;
    let mut summary = RenderSummary {
        path: output.to_path_buf(),
        sample_rate: spec.sample_rate,
        ..RenderSummary::default()
    };

    sequencer.send(Command::Start)?;
    let mut queued = 1;

    tracing::info!(
        "Rendering {} frames in blocks of {} ({} scripted commands)",
        total_frames,
        block_size,
        script.len()
    );

    let mut block = vec![0.0f32; block_size * CHANNEL_COUNT];
    let mut next = 0;
    while summary.frames < total_frames {
        let now = summary.frames as f64 / sample_rate as f64;
        while next < script.len() && script[next].at <= now {
            if queued == queue_capacity {
                processor.process_commands();
                queued = 0;
            }
            let entry = script[next];
            sequencer
                .send(entry.command.clone())
                .with_context(|| format!("Command at {}s was rejected", entry.at))?;
            queued += 1;
            summary.commands += 1;
            next += 1;
        }

        let frames = (total_frames - summary.frames).min(block_size as u64) as usize;
        let out = &mut block[..frames * CHANNEL_COUNT];
        processor.process_block(out);
        queued = 0;
        for sample in out.iter() {
            writer.write_sample(*sample)?;
        }
        summary.frames += frames as u64;

        for event in sequencer.drain_events() {
            match event {
                Event::StepChange { .. } => summary.step_changes += 1,
                Event::ShValuesUpdated { .. } => summary.sh_updates += 1,
                Event::Error { message } => {
                    tracing::warn!("{}", message);
                    summary.errors += 1;
                }
                Event::Log { .. } => {}
            }
        }
    }

    writer
        .finalize()
        .with_context(|| format!("Failed to finalize {}", output.display()))?;
    summary.dropped_events = sequencer.dropped_events();
    if next < script.len() {
        tracing::warn!(
            "{} scripted commands fall after the end of the render",
            script.len() - next
        );
    }
    Ok(summary)
}
