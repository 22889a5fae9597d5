use cvseq_core::SequencerState;
use cvseq_core::types::{
  CHANNEL_COUNT, ChannelConfig, FULL_SCALE_VOLTS, LfoParams, MAX_CYCLE_TIME_SECONDS, MAX_LFO_RATE,
  MAX_STEPS, MAX_TRIGGER_DURATION_SAMPLES, MIN_CHANNEL_STEPS, MIN_CYCLE_TIME_SECONDS,
  MIN_GLOBAL_STEPS, MIN_LFO_RATE, MIN_TRIGGER_DURATION_SAMPLES, PITCH_RANGE_SEMITONES, RampParams,
  ShParams, StepCountMode,
};
use serde::{Deserialize, Serialize};

use crate::commands::Command;

/// Detailed validation error for a rejected command or state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
  pub field: String,
  pub message: String,
  pub location: Option<String>,
}

impl ValidationError {
  pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      field: field.into(),
      message: message.into(),
      location: None,
    }
  }

  pub fn at(mut self, location: impl Into<String>) -> Self {
    self.location = Some(location.into());
    self
  }
}

impl std::fmt::Display for ValidationError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if let Some(ref location) = self.location {
      write!(f, "{}: {} (at {})", self.field, self.message, location)
    } else {
      write!(f, "{}: {}", self.field, self.message)
    }
  }
}

impl std::error::Error for ValidationError {}

/// Collects errors for one command or state, optionally under a location prefix.
struct Checker<'a> {
  errors: &'a mut Vec<ValidationError>,
  location: Option<String>,
}

impl Checker<'_> {
  fn push(&mut self, field: &str, message: String) {
    let error = ValidationError::new(field, message);
    self.errors.push(match &self.location {
      Some(location) => error.at(location.clone()),
      None => error,
    });
  }

  fn float(&mut self, field: &str, value: f32, min: f32, max: f32) {
    // NaN fails the range check as well
    if !(min..=max).contains(&value) {
      self.push(field, format!("must be between {} and {}, got {}", min, max, value));
    }
  }

  fn int(&mut self, field: &str, value: i64, min: i64, max: i64) {
    if !(min..=max).contains(&value) {
      self.push(field, format!("must be between {} and {}, got {}", min, max, value));
    }
  }

  fn channel(&mut self, channel: usize) {
    if channel >= CHANNEL_COUNT {
      self.push(
        "channel",
        format!("must be less than {}, got {}", CHANNEL_COUNT, channel),
      );
    }
  }

  fn step(&mut self, step: usize) {
    if step >= MAX_STEPS {
      self.push("step", format!("must be less than {}, got {}", MAX_STEPS, step));
    }
  }

  fn channel_steps(&mut self, field: &str, count: usize) {
    self.int(field, count as i64, MIN_CHANNEL_STEPS as i64, MAX_STEPS as i64);
  }

  fn semitones(&mut self, field: &str, semitones: i32) {
    self.int(
      field,
      semitones as i64,
      -(PITCH_RANGE_SEMITONES as i64),
      PITCH_RANGE_SEMITONES as i64,
    );
  }

  fn trigger_duration(&mut self, field: &str, samples: u32) {
    self.int(
      field,
      samples as i64,
      MIN_TRIGGER_DURATION_SAMPLES as i64,
      MAX_TRIGGER_DURATION_SAMPLES as i64,
    );
  }

  fn sh_value(&mut self, field: &str, value: f32) {
    self.float(field, value, -1.0, 1.0);
  }

  fn lfo(&mut self, prefix: &str, params: &LfoParams) {
    self.float(&format!("{prefix}.rate"), params.rate, MIN_LFO_RATE, MAX_LFO_RATE);
    self.float(&format!("{prefix}.duty"), params.duty, 0.0, 1.0);
    self.float(&format!("{prefix}.width"), params.width, 0.0, 1.0);
    self.float(&format!("{prefix}.phaseOffset"), params.phase_offset, 0.0, 1.0);
  }

  fn sample_hold(&mut self, prefix: &str, params: &ShParams) {
    self.float(&format!("{prefix}.width"), params.width, 0.0, 1.0);
  }

  fn ramp(&mut self, prefix: &str, params: &RampParams) {
    self.float(
      &format!("{prefix}.amplitudeVolts"),
      params.amplitude_volts,
      0.0,
      FULL_SCALE_VOLTS,
    );
  }

  fn channel_config(&mut self, config: &ChannelConfig) {
    self.channel_steps("customStepCount", config.custom_step_count);
    self.channel_steps("polyrhythmStepCount", config.polyrhythm_step_count);
    self.trigger_duration("triggerDurationSamples", config.trigger_duration_samples);
    self.lfo("lfo", &config.lfo);
    self.sample_hold("sampleHold", &config.sample_hold);
    self.ramp("ramp", &config.ramp);
  }
}

/// Check a command against the parameter bounds. An empty result means the
/// command can be applied.
pub fn validate_command(command: &Command) -> Vec<ValidationError> {
  if let Command::SetState { state } = command {
    return validate_state(state);
  }

  let mut errors = Vec::new();
  let mut check = Checker {
    errors: &mut errors,
    location: None,
  };

  match command {
    Command::Start | Command::Stop | Command::Pause => {}
    Command::SetCycleTime { seconds } => {
      check.float(
        "seconds",
        *seconds,
        MIN_CYCLE_TIME_SECONDS,
        MAX_CYCLE_TIME_SECONDS,
      );
    }
    Command::SetGlobalStepCount { count } => {
      check.int(
        "count",
        *count as i64,
        MIN_GLOBAL_STEPS as i64,
        MAX_STEPS as i64,
      );
    }
    Command::SetChannelMode {
      channel, params, ..
    } => {
      check.channel(*channel);
      if let Some(params) = params {
        if let Some(lfo) = &params.lfo {
          check.lfo("params.lfo", lfo);
        }
        if let Some(sample_hold) = &params.sample_hold {
          check.sample_hold("params.sampleHold", sample_hold);
        }
        if let Some(ramp) = &params.ramp {
          check.ramp("params.ramp", ramp);
        }
        if let Some(samples) = params.trigger_duration_samples {
          check.trigger_duration("params.triggerDurationSamples", samples);
        }
      }
    }
    Command::SetChannelStepCount {
      channel,
      mode,
      count,
    } => {
      check.channel(*channel);
      match (mode, count) {
        (_, Some(count)) => check.channel_steps("count", *count),
        (StepCountMode::Custom | StepCountMode::Polyrhythm, None) => {
          check.push("count", "required for custom and polyrhythm step counts".to_string())
        }
        (StepCountMode::Global, None) => {}
      }
    }
    Command::UpdatePatternCell { channel, step, .. } => {
      check.channel(*channel);
      check.step(*step);
    }
    Command::ClearPattern { channel } => {
      if let Some(channel) = channel {
        check.channel(*channel);
      }
    }
    Command::UpdatePitch {
      channel,
      step,
      semitones,
    } => {
      check.channel(*channel);
      check.step(*step);
      if let Some(semitones) = semitones {
        check.semitones("semitones", *semitones);
      }
    }
    Command::UpdateLfoParams { channel, params } => {
      check.channel(*channel);
      check.lfo("params", params);
    }
    Command::UpdateShParams { channel, params } => {
      check.channel(*channel);
      check.sample_hold("params", params);
    }
    Command::SetShValues { channel, values } => {
      check.channel(*channel);
      if values.len() > MAX_STEPS {
        check.push(
          "values",
          format!("must have at most {} entries, got {}", MAX_STEPS, values.len()),
        );
      }
      for (i, value) in values.iter().enumerate() {
        check.sh_value(&format!("values[{i}]"), *value);
      }
    }
    Command::SetTriggerDuration { channel, samples } => {
      check.channel(*channel);
      check.trigger_duration("samples", *samples);
    }
    Command::SetMute { channel, .. } | Command::SetCoupling { channel, .. } => {
      check.channel(*channel);
    }
    Command::SetState { .. } => {}
  }

  errors
}

/// Check a full snapshot: configuration bounds plus every stored step value.
pub fn validate_state(state: &SequencerState) -> Vec<ValidationError> {
  let mut errors = Vec::new();

  let mut check = Checker {
    errors: &mut errors,
    location: Some("config".to_string()),
  };
  check.float(
    "cycleTimeSeconds",
    state.config.cycle_time_seconds,
    MIN_CYCLE_TIME_SECONDS,
    MAX_CYCLE_TIME_SECONDS,
  );
  check.int(
    "globalStepCount",
    state.config.global_step_count as i64,
    MIN_GLOBAL_STEPS as i64,
    MAX_STEPS as i64,
  );

  for (index, channel) in state.channels.iter().enumerate() {
    let mut check = Checker {
      errors: &mut errors,
      location: Some(format!("channels[{index}]")),
    };
    check.channel_config(channel);

    let pitches = state.pitches.row(index).as_slice();
    for (step, semitones) in pitches.iter().enumerate() {
      if let Some(semitones) = semitones {
        check.semitones(&format!("pitches[{step}]"), *semitones as i32);
      }
    }
    let values = state.sample_hold.row(index).as_slice();
    for (step, value) in values.iter().enumerate() {
      check.sh_value(&format!("sampleHold[{step}]"), *value);
    }
  }

  errors
}
