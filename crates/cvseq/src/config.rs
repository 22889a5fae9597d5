//! Host-level engine settings.

use serde::{Deserialize, Serialize};

use crate::commands::{COMMAND_QUEUE_CAPACITY, EVENT_QUEUE_CAPACITY, GARBAGE_QUEUE_CAPACITY};
use crate::validation::ValidationError;

/// Environment variable overriding `EngineConfig::sample_rate`.
pub const SAMPLE_RATE_ENV: &str = "CVSEQ_SAMPLE_RATE";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
  pub sample_rate: f32,
  /// Frames rendered per `AudioProcessor::process_block` call by offline hosts.
  pub block_size: usize,
  pub command_queue_capacity: usize,
  pub event_queue_capacity: usize,
  pub garbage_queue_capacity: usize,
  /// Seed for sample-and-hold randomness.
  pub seed: u64,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      sample_rate: 48_000.0,
      block_size: 128,
      command_queue_capacity: COMMAND_QUEUE_CAPACITY,
      event_queue_capacity: EVENT_QUEUE_CAPACITY,
      garbage_queue_capacity: GARBAGE_QUEUE_CAPACITY,
      seed: 0x5eed_cafe,
    }
  }
}

impl EngineConfig {
  pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(json)
  }

  /// Apply `CVSEQ_SAMPLE_RATE` if it is set.
  pub fn with_env_overrides(self) -> Self {
    let value = std::env::var(SAMPLE_RATE_ENV).ok();
    self.with_sample_rate_override(value.as_deref())
  }

  /// Unparseable values are logged and ignored.
  pub fn with_sample_rate_override(mut self, value: Option<&str>) -> Self {
    let Some(value) = value else {
      return self;
    };
    match value.trim().parse::<f32>() {
      Ok(sample_rate) => {
        tracing::debug!(sample_rate, "sample rate overridden from {}", SAMPLE_RATE_ENV);
        self.sample_rate = sample_rate;
      }
      Err(err) => {
        tracing::warn!("ignoring {}={:?}: {}", SAMPLE_RATE_ENV, value, err);
      }
    }
    self
  }

  pub fn validate(&self) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
      errors.push(ValidationError::new(
        "sampleRate",
        format!("must be a positive number, got {}", self.sample_rate),
      ));
    }
    for (field, value) in [
      ("blockSize", self.block_size),
      ("commandQueueCapacity", self.command_queue_capacity),
      ("eventQueueCapacity", self.event_queue_capacity),
      ("garbageQueueCapacity", self.garbage_queue_capacity),
    ] {
      if value == 0 {
        errors.push(ValidationError::new(field, "must be at least 1"));
      }
    }
    errors
  }
}
