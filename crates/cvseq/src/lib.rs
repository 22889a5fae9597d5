#![deny(clippy::all)]

//! Control-channel adapter for the CV sequencer engine.
//!
//! [`Sequencer`] is the control-thread handle. It validates commands, keeps a
//! mirror of the sequencer state (running pattern migration there, never on the
//! audio thread), and ships snapshots or deltas to the [`AudioProcessor`] over
//! lock-free queues.

pub mod audio;
pub mod commands;
pub mod config;
pub mod validation;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cvseq_core::{Engine, EngineEvent, Migration, SequencerState};
use parking_lot::Mutex;

pub use crate::audio::AudioProcessor;
use crate::audio::{
  CommandProducer, EventConsumer, GarbageConsumer, create_audio_channels,
};
pub use crate::commands::{Command, ControlError, Event, ModeParams};
use crate::commands::Applied;
pub use crate::config::EngineConfig;
pub use crate::validation::ValidationError;
use crate::validation::{validate_command, validate_state};

/// Control thread handle. Sends commands to the audio thread.
pub struct Sequencer {
  config: EngineConfig,
  /// What the engine will render once every queued command has been applied
  mirror: Mutex<SequencerState>,
  /// Command queue producer (control thread → audio thread)
  command_tx: Mutex<CommandProducer>,
  /// Event queue consumer (control thread ← audio thread)
  event_rx: Mutex<EventConsumer>,
  /// Garbage queue consumer - drains deferred deallocations from audio thread
  garbage_rx: Mutex<GarbageConsumer>,
  /// Control-side errors waiting for the next `drain_events`
  pending: Mutex<Vec<Event>>,
  dropped_events: Arc<AtomicU64>,
}

impl Sequencer {
  /// Build the control handle and the audio-side processor sharing its queues.
  /// The engine starts stopped.
  pub fn new(
    config: EngineConfig,
    state: SequencerState,
  ) -> Result<(Self, AudioProcessor), ControlError> {
    let mut errors = config.validate();
    errors.extend(validate_state(&state));
    if !errors.is_empty() {
      return Err(ControlError::Invalid(errors));
    }

    let (command_tx, command_rx, event_tx, event_rx, garbage_tx, garbage_rx) =
      create_audio_channels(&config);
    let dropped_events = Arc::new(AtomicU64::new(0));
    let engine = Engine::new(config.sample_rate, Box::new(state.clone()), config.seed);
    let processor = AudioProcessor::new(
      engine,
      command_rx,
      event_tx,
      garbage_tx,
      dropped_events.clone(),
    );

    tracing::info!(
      "Sequencer: {} Hz, {} channels",
      config.sample_rate,
      cvseq_core::CHANNEL_COUNT
    );

    let sequencer = Self {
      config,
      mirror: Mutex::new(state),
      command_tx: Mutex::new(command_tx),
      event_rx: Mutex::new(event_rx),
      garbage_rx: Mutex::new(garbage_rx),
      pending: Mutex::new(Vec::new()),
      dropped_events,
    };
    Ok((sequencer, processor))
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  /// Copy of the control-side state.
  pub fn state(&self) -> SequencerState {
    self.mirror.lock().clone()
  }

  /// Events the audio thread could not queue.
  pub fn dropped_events(&self) -> u64 {
    self.dropped_events.load(Ordering::Relaxed)
  }

  /// Validate, apply and forward a command. Nothing changes when this fails.
  /// Returns the channels whose step data was migrated.
  pub fn send(&self, command: Command) -> Result<Vec<Migration>, ControlError> {
    let errors = validate_command(&command);
    if !errors.is_empty() {
      for error in &errors {
        tracing::warn!("Rejected command: {}", error);
      }
      self.report(ControlError::Invalid(errors.clone()));
      return Err(ControlError::Invalid(errors));
    }

    let mut mirror = self.mirror.lock();
    let Applied {
      next,
      engine,
      migrations,
    } = command.apply(&mirror);

    if self.command_tx.lock().push(engine).is_err() {
      tracing::warn!("Command queue full, dropping command");
      self.report(ControlError::QueueFull);
      return Err(ControlError::QueueFull);
    }

    for migration in &migrations {
      tracing::debug!(
        "Migrated channel {} from {} to {} steps",
        migration.channel,
        migration.from,
        migration.to
      );
    }
    *mirror = next;
    Ok(migrations)
  }

  /// Parse a JSON command and `send` it.
  pub fn send_json(&self, json: &str) -> Result<Vec<Migration>, ControlError> {
    let command: Command = serde_json::from_str(json).map_err(|err| {
      let error = ControlError::Parse(err.to_string());
      tracing::warn!("{}", error);
      self.report(error.clone());
      error
    })?;
    self.send(command)
  }

  fn report(&self, error: ControlError) {
    self.pending.lock().push(Event::Error {
      message: error.to_string(),
    });
  }

  /// Collect pending control-side errors and everything the audio thread emitted
  /// since the last call. Also releases replaced snapshots.
  pub fn drain_events(&self) -> Vec<Event> {
    let mut events = std::mem::take(&mut *self.pending.lock());
    {
      let mut rx = self.event_rx.lock();
      while let Ok(event) = rx.pop() {
        match &event {
          EngineEvent::ShValuesUpdated { channel, values } => {
            let mut mirror = self.mirror.lock();
            for (step, value) in values.iter().enumerate() {
              mirror.sample_hold.set(*channel, step, *value);
            }
          }
          EngineEvent::Log { message } => tracing::info!("Engine: {}", message),
          EngineEvent::StepChange { .. } => {}
        }
        events.push(Event::from(event));
      }
    }
    self.drain_garbage();
    events
  }

  /// Drain deferred deallocations from the audio thread.
  pub fn drain_garbage(&self) {
    let mut rx = self.garbage_rx.lock();
    while let Ok(_item) = rx.pop() {
      // Item is dropped here on the control thread
    }
  }
}
