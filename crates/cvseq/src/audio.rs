//! Audio-thread side of the control channel.
//!
//! `AudioProcessor` is moved onto whatever thread renders audio. Each block it
//! drains the command queue without blocking, then renders. Events go out through
//! a bounded queue and are dropped, not waited on, when the queue is full.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cvseq_core::{Engine, EngineEvent, EventSink};
use rtrb::{Consumer as RtrbConsumer, Producer as RtrbProducer, RingBuffer};

use crate::commands::{EngineCommand, GarbageItem, TransportCommand};
use crate::config::EngineConfig;

// ============================================================================
// Queues
// ============================================================================

/// Producer end of the command queue (control thread → audio thread)
pub type CommandProducer = RtrbProducer<EngineCommand>;
/// Consumer end of the command queue (audio thread ← control thread)
pub type CommandConsumer = RtrbConsumer<EngineCommand>;

/// Producer end of the event queue (audio thread → control thread)
pub type EventProducer = RtrbProducer<EngineEvent>;
/// Consumer end of the event queue (control thread ← audio thread)
pub type EventConsumer = RtrbConsumer<EngineEvent>;

/// Producer end of the garbage queue (audio thread → control thread)
pub type GarbageProducer = RtrbProducer<GarbageItem>;
/// Consumer end of the garbage queue (control thread ← audio thread)
pub type GarbageConsumer = RtrbConsumer<GarbageItem>;

/// Create the command, event, and garbage queues for audio thread communication
pub fn create_audio_channels(
  config: &EngineConfig,
) -> (
  CommandProducer,
  CommandConsumer,
  EventProducer,
  EventConsumer,
  GarbageProducer,
  GarbageConsumer,
) {
  let (cmd_prod, cmd_cons) = RingBuffer::new(config.command_queue_capacity);
  let (event_prod, event_cons) = RingBuffer::new(config.event_queue_capacity);
  let (garbage_prod, garbage_cons) = RingBuffer::new(config.garbage_queue_capacity);
  (
    cmd_prod,
    cmd_cons,
    event_prod,
    event_cons,
    garbage_prod,
    garbage_cons,
  )
}

/// Event sink over the event queue. Counts events that did not fit.
struct QueueSink<'a> {
  tx: &'a mut EventProducer,
  dropped: &'a AtomicU64,
}

impl EventSink for QueueSink<'_> {
  fn emit(&mut self, event: EngineEvent) {
    if self.tx.push(event).is_err() {
      self.dropped.fetch_add(1, Ordering::Relaxed);
    }
  }
}

// ============================================================================
// AudioProcessor - audio thread side
// ============================================================================

pub struct AudioProcessor {
  engine: Engine,
  command_rx: CommandConsumer,
  event_tx: EventProducer,
  garbage_tx: GarbageProducer,
  /// Shared with the control handle for reporting
  dropped_events: Arc<AtomicU64>,
}

impl AudioProcessor {
  pub fn new(
    engine: Engine,
    command_rx: CommandConsumer,
    event_tx: EventProducer,
    garbage_tx: GarbageProducer,
    dropped_events: Arc<AtomicU64>,
  ) -> Self {
    Self {
      engine,
      command_rx,
      event_tx,
      garbage_tx,
      dropped_events,
    }
  }

  pub fn engine(&self) -> &Engine {
    &self.engine
  }

  /// Apply every queued command. Never blocks.
  pub fn process_commands(&mut self) {
    while let Ok(cmd) = self.command_rx.pop() {
      let mut sink = QueueSink {
        tx: &mut self.event_tx,
        dropped: &self.dropped_events,
      };
      match cmd {
        EngineCommand::Transport(TransportCommand::Start) => self.engine.start(),
        EngineCommand::Transport(TransportCommand::Stop) => self.engine.stop(),
        EngineCommand::Transport(TransportCommand::Pause) => self.engine.pause(),
        EngineCommand::Install { state, replace_sh } => {
          let previous = self.engine.install(state, replace_sh, &mut sink);
          if self.garbage_tx.push(GarbageItem::State(previous)).is_err() {
            // The snapshot is freed here as a fallback
            sink.emit(EngineEvent::Log {
              message: "garbage queue full, snapshot released on the audio thread",
            });
          }
        }
        EngineCommand::SetPatternCell {
          channel,
          step,
          active,
        } => self.engine.set_pattern_cell(channel, step, active),
        EngineCommand::SetPitch {
          channel,
          step,
          semitones,
        } => self.engine.set_pitch(channel, step, semitones),
        EngineCommand::SetMute { channel, muted } => self.engine.set_muted(channel, muted),
      }
    }
  }

  /// Drain commands, then render interleaved frames into `output`.
  pub fn process_block(&mut self, output: &mut [f32]) {
    profiling::scope!("AudioProcessor::process_block");
    {
      profiling::scope!("process_commands");
      self.process_commands();
    }
    let mut sink = QueueSink {
      tx: &mut self.event_tx,
      dropped: &self.dropped_events,
    };
    self.engine.render(output, &mut sink);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use cvseq_core::types::CHANNEL_COUNT;
  use cvseq_core::{REPLACE_ALL_SH_ROWS, SequencerState, Transport};

  type Harness = (AudioProcessor, CommandProducer, EventConsumer, GarbageConsumer);

  fn processor(config: &EngineConfig) -> Harness {
    let (command_tx, command_rx, event_tx, event_rx, garbage_tx, garbage_rx) =
      create_audio_channels(config);
    let engine = Engine::new(1_000.0, Box::new(SequencerState::default()), 1);
    let processor = AudioProcessor::new(
      engine,
      command_rx,
      event_tx,
      garbage_tx,
      Arc::new(AtomicU64::new(0)),
    );
    (processor, command_tx, event_rx, garbage_rx)
  }

  #[test]
  fn install_sends_previous_state_to_garbage() {
    let (mut processor, mut command_tx, _event_rx, mut garbage_rx) =
      processor(&EngineConfig::default());
    let mut next = SequencerState::default();
    next.config.global_step_count = 8;
    command_tx
      .push(EngineCommand::Install {
        state: Box::new(next),
        replace_sh: REPLACE_ALL_SH_ROWS,
      })
      .unwrap();

    processor.process_commands();

    assert_eq!(processor.engine().state().config.global_step_count, 8);
    match garbage_rx.pop() {
      Ok(GarbageItem::State(previous)) => assert_eq!(previous.config.global_step_count, 16),
      Err(_) => panic!("expected a garbage item"),
    }
  }

  #[test]
  fn transport_and_deltas_apply_before_render() {
    let (mut processor, mut command_tx, mut event_rx, _garbage_rx) =
      processor(&EngineConfig::default());
    command_tx
      .push(EngineCommand::SetPatternCell {
        channel: 0,
        step: 0,
        active: true,
      })
      .unwrap();
    command_tx
      .push(EngineCommand::Transport(TransportCommand::Start))
      .unwrap();

    let mut block = vec![0.0; CHANNEL_COUNT * 4];
    processor.process_block(&mut block);

    assert_eq!(processor.engine().transport(), Transport::Playing);
    assert_eq!(block[0], 1.0);
    assert!(event_rx.pop().is_ok());
  }

  #[test]
  fn full_event_queue_drops_and_counts() {
    let config = EngineConfig {
      event_queue_capacity: 2,
      ..EngineConfig::default()
    };
    let (mut processor, mut command_tx, mut event_rx, _garbage_rx) = processor(&config);
    command_tx
      .push(EngineCommand::Transport(TransportCommand::Start))
      .unwrap();

    // First frame emits a global step change plus one per channel
    let mut block = vec![0.0; CHANNEL_COUNT];
    processor.process_block(&mut block);

    assert_eq!(
      processor.dropped_events.load(Ordering::Relaxed),
      (CHANNEL_COUNT + 1 - 2) as u64 + 1
    );
    assert!(event_rx.pop().is_ok());
    assert!(event_rx.pop().is_ok());
    assert!(event_rx.pop().is_err());
  }
}
