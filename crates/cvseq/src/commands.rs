//! Control-channel messages.
//!
//! `Command` is the JSON-facing request type. Once validated it is applied to the
//! control-side mirror of the sequencer state, which yields the `EngineCommand`
//! that actually crosses to the audio thread. `Event` is the JSON-facing type for
//! everything coming back.

use cvseq_core::types::{
  ChannelConfig, ChannelMode, LfoParams, RampParams, ShParams, StepCountMode,
};
use cvseq_core::{
  CHANNEL_COUNT, EngineEvent, KEEP_SH_ROWS, Migration, REPLACE_ALL_SH_ROWS, SequencerState,
  ShRowMask,
};
use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// Optional per-mode settings applied together with a mode change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModeParams {
  pub lfo: Option<LfoParams>,
  pub sample_hold: Option<ShParams>,
  pub ramp: Option<RampParams>,
  pub trigger_duration_samples: Option<u32>,
  pub coupled: Option<bool>,
}

impl ModeParams {
  fn apply_to(&self, channel: &mut ChannelConfig) {
    if let Some(lfo) = self.lfo {
      channel.lfo = lfo;
    }
    if let Some(sample_hold) = self.sample_hold {
      channel.sample_hold = sample_hold;
    }
    if let Some(ramp) = self.ramp {
      channel.ramp = ramp;
    }
    if let Some(samples) = self.trigger_duration_samples {
      channel.trigger_duration_samples = samples;
    }
    if let Some(coupled) = self.coupled {
      channel.coupled = coupled;
    }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
  tag = "type",
  rename_all = "kebab-case",
  rename_all_fields = "camelCase"
)]
pub enum Command {
  Start,
  Stop,
  /// Toggles between playing and paused.
  Pause,
  SetCycleTime {
    seconds: f32,
  },
  SetGlobalStepCount {
    count: usize,
  },
  SetChannelMode {
    channel: usize,
    mode: ChannelMode,
    #[serde(default)]
    params: Option<ModeParams>,
  },
  /// `count` sets the custom or polyrhythm count matching `mode` and is required
  /// for those modes; it is ignored for `global`.
  SetChannelStepCount {
    channel: usize,
    mode: StepCountMode,
    #[serde(default)]
    count: Option<usize>,
  },
  UpdatePatternCell {
    channel: usize,
    step: usize,
    active: bool,
  },
  /// Clears every channel when `channel` is omitted.
  ClearPattern {
    #[serde(default)]
    channel: Option<usize>,
  },
  /// `null` semitones makes the step hold the previous pitch.
  UpdatePitch {
    channel: usize,
    step: usize,
    #[serde(default)]
    semitones: Option<i32>,
  },
  UpdateLfoParams {
    channel: usize,
    params: LfoParams,
  },
  UpdateShParams {
    channel: usize,
    params: ShParams,
  },
  /// Overwrites the leading steps; steps past `values.len()` keep their value.
  SetShValues {
    channel: usize,
    values: Vec<f32>,
  },
  SetTriggerDuration {
    channel: usize,
    samples: u32,
  },
  SetMute {
    channel: usize,
    muted: bool,
  },
  SetCoupling {
    channel: usize,
    coupled: bool,
  },
  SetState {
    state: Box<SequencerState>,
  },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportCommand {
  Start,
  Stop,
  Pause,
}

/// Commands sent to the audio thread via the command queue.
#[derive(Debug)]
pub enum EngineCommand {
  Transport(TransportCommand),

  /// Replace the whole snapshot. Allocated on the control thread; the replaced
  /// box comes back through the garbage queue. Sample-and-hold rows are taken
  /// from `state` only for channels in `replace_sh`, so values the audio thread
  /// regenerated after the mirror last heard about them survive.
  Install {
    state: Box<SequencerState>,
    replace_sh: ShRowMask,
  },

  SetPatternCell {
    channel: usize,
    step: usize,
    active: bool,
  },

  SetPitch {
    channel: usize,
    step: usize,
    semitones: Option<i8>,
  },

  SetMute {
    channel: usize,
    muted: bool,
  },
}

/// Result of applying a command to the control-side mirror.
#[derive(Debug)]
pub struct Applied {
  /// The mirror after the command.
  pub next: SequencerState,
  /// What the audio thread needs to reach the same state.
  pub engine: EngineCommand,
  pub migrations: Vec<Migration>,
}

impl Command {
  /// Apply to a copy of `mirror`. Expects a command that passed validation;
  /// out-of-range channels are ignored rather than panicking.
  pub fn apply(self, mirror: &SequencerState) -> Applied {
    let mut next = mirror.clone();
    let mut migrations = Vec::new();

    let engine = match self {
      Command::Start => EngineCommand::Transport(TransportCommand::Start),
      Command::Stop => EngineCommand::Transport(TransportCommand::Stop),
      Command::Pause => EngineCommand::Transport(TransportCommand::Pause),
      Command::SetCycleTime { seconds } => {
        next.config.cycle_time_seconds = seconds;
        install(&next, KEEP_SH_ROWS)
      }
      Command::SetGlobalStepCount { count } => {
        migrations = next.reconfigure(|config, _| config.global_step_count = count);
        install(&next, migrated_rows(&migrations))
      }
      Command::SetChannelMode {
        channel,
        mode,
        params,
      } => {
        migrations = next.reconfigure(|_, channels| {
          if let Some(config) = channels.get_mut(channel) {
            config.mode = mode;
            if let Some(params) = params {
              params.apply_to(config);
            }
          }
        });
        install(&next, migrated_rows(&migrations))
      }
      Command::SetChannelStepCount {
        channel,
        mode,
        count,
      } => {
        migrations = next.reconfigure(|_, channels| {
          if let Some(config) = channels.get_mut(channel) {
            config.step_count_mode = mode;
            match (mode, count) {
              (StepCountMode::Custom, Some(count)) => config.custom_step_count = count,
              (StepCountMode::Polyrhythm, Some(count)) => config.polyrhythm_step_count = count,
              _ => {}
            }
          }
        });
        install(&next, migrated_rows(&migrations))
      }
      Command::UpdatePatternCell {
        channel,
        step,
        active,
      } => {
        next.patterns.set(channel, step, active);
        EngineCommand::SetPatternCell {
          channel,
          step,
          active,
        }
      }
      Command::ClearPattern { channel } => {
        next.clear_pattern(channel);
        install(&next, KEEP_SH_ROWS)
      }
      Command::UpdatePitch {
        channel,
        step,
        semitones,
      } => {
        let semitones = semitones.and_then(|s| i8::try_from(s).ok());
        next.pitches.set(channel, step, semitones);
        EngineCommand::SetPitch {
          channel,
          step,
          semitones,
        }
      }
      Command::UpdateLfoParams { channel, params } => {
        if let Some(config) = next.channels.get_mut(channel) {
          config.lfo = params;
        }
        install(&next, KEEP_SH_ROWS)
      }
      Command::UpdateShParams { channel, params } => {
        if let Some(config) = next.channels.get_mut(channel) {
          config.sample_hold = params;
        }
        install(&next, KEEP_SH_ROWS)
      }
      Command::SetShValues { channel, values } => {
        for (step, value) in values.into_iter().enumerate() {
          next.sample_hold.set(channel, step, value);
        }
        let mut replace_sh = KEEP_SH_ROWS;
        if let Some(slot) = replace_sh.get_mut(channel) {
          *slot = true;
        }
        install(&next, replace_sh)
      }
      Command::SetTriggerDuration { channel, samples } => {
        if let Some(config) = next.channels.get_mut(channel) {
          config.trigger_duration_samples = samples;
        }
        install(&next, KEEP_SH_ROWS)
      }
      Command::SetMute { channel, muted } => {
        if let Some(config) = next.channels.get_mut(channel) {
          config.muted = muted;
        }
        EngineCommand::SetMute { channel, muted }
      }
      Command::SetCoupling { channel, coupled } => {
        migrations = next.reconfigure(|_, channels| {
          if let Some(config) = channels.get_mut(channel) {
            config.coupled = coupled;
          }
        });
        install(&next, migrated_rows(&migrations))
      }
      Command::SetState { state } => {
        next = *state;
        install(&next, REPLACE_ALL_SH_ROWS)
      }
    };

    Applied {
      next,
      engine,
      migrations,
    }
  }
}

fn install(state: &SequencerState, replace_sh: ShRowMask) -> EngineCommand {
  EngineCommand::Install {
    state: Box::new(state.clone()),
    replace_sh,
  }
}

/// Migrated channels get their resampled rows.
fn migrated_rows(migrations: &[Migration]) -> ShRowMask {
  let mut rows = KEEP_SH_ROWS;
  for migration in migrations {
    if migration.channel < CHANNEL_COUNT {
      rows[migration.channel] = true;
    }
  }
  rows
}

/// Messages going back to the control channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
  tag = "type",
  rename_all = "kebab-case",
  rename_all_fields = "camelCase"
)]
pub enum Event {
  StepChange {
    /// `-1` for the master grid.
    channel: i32,
    step: usize,
    is_wrap: bool,
    sample_time: u64,
  },
  ShValuesUpdated {
    channel: usize,
    values: Vec<f32>,
  },
  Log {
    message: String,
  },
  Error {
    message: String,
  },
}

impl From<EngineEvent> for Event {
  fn from(event: EngineEvent) -> Self {
    match event {
      EngineEvent::StepChange {
        channel,
        step,
        is_wrap,
        sample_time,
      } => Event::StepChange {
        channel,
        step,
        is_wrap,
        sample_time,
      },
      EngineEvent::ShValuesUpdated { channel, values } => Event::ShValuesUpdated {
        channel,
        values: values.to_vec(),
      },
      EngineEvent::Log { message } => Event::Log {
        message: message.to_string(),
      },
    }
  }
}

/// Errors returned to the caller of the control handle.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlError {
  /// Rejected at the boundary; nothing was changed.
  Invalid(Vec<ValidationError>),
  /// The message was not a well-formed command.
  Parse(String),
  /// The command queue is full; nothing was changed.
  QueueFull,
}

impl std::fmt::Display for ControlError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ControlError::Invalid(errors) => {
        write!(f, "Invalid command: ")?;
        for (i, error) in errors.iter().enumerate() {
          if i > 0 {
            write!(f, "; ")?;
          }
          write!(f, "{}", error)?;
        }
        Ok(())
      }
      ControlError::Parse(message) => write!(f, "Failed to parse command: {}", message),
      ControlError::QueueFull => {
        write!(f, "Command queue full - audio thread may be overloaded")
      }
    }
  }
}

impl std::error::Error for ControlError {}

/// Capacity for the command queue (control → audio)
pub const COMMAND_QUEUE_CAPACITY: usize = 1024;

/// Capacity for the event queue (audio → control)
pub const EVENT_QUEUE_CAPACITY: usize = 4096;

/// Items to be deallocated on the control thread instead of the audio thread.
/// Fields are never read; the value of this type is in its `Drop`.
#[allow(dead_code)]
#[derive(Debug)]
pub enum GarbageItem {
  /// A snapshot replaced by `EngineCommand::Install`
  State(Box<SequencerState>),
}

/// Capacity for the garbage queue (audio → control).
pub const GARBAGE_QUEUE_CAPACITY: usize = 256;
