//! End-to-end tests through `Sequencer` and `AudioProcessor`.

use std::thread;

use cvseq::{Event, EngineConfig, Sequencer};
use cvseq_core::types::{CHANNEL_COUNT, ChannelMode};
use cvseq_core::SequencerState;
use serde_json::json;

const BLOCK_FRAMES: usize = 64;

fn config() -> EngineConfig {
  EngineConfig {
    sample_rate: 1_000.0,
    ..EngineConfig::default()
  }
}

fn one_second_state() -> SequencerState {
  let mut state = SequencerState::default();
  state.config.cycle_time_seconds = 1.0;
  state.config.global_step_count = 4;
  state
}

fn send(sequencer: &Sequencer, value: serde_json::Value) {
  sequencer
    .send_json(&value.to_string())
    .unwrap_or_else(|e| panic!("{value}: {e}"));
}

fn render(processor: &mut cvseq::AudioProcessor, frames: usize) -> Vec<f32> {
  let mut out = vec![0.0; frames * CHANNEL_COUNT];
  for block in out.chunks_mut(BLOCK_FRAMES * CHANNEL_COUNT) {
    processor.process_block(block);
  }
  out
}

fn channel(samples: &[f32], channel: usize) -> Vec<f32> {
  samples
    .chunks_exact(CHANNEL_COUNT)
    .map(|frame| frame[channel])
    .collect()
}

#[test]
fn json_commands_drive_the_engine() {
  let (sequencer, mut processor) = Sequencer::new(config(), one_second_state()).unwrap();

  send(&sequencer, json!({"type": "update-pattern-cell", "channel": 0, "step": 1, "active": true}));
  send(&sequencer, json!({"type": "set-trigger-duration", "channel": 0, "samples": 20}));
  send(&sequencer, json!({"type": "update-pitch", "channel": 1, "step": 1, "semitones": 24}));
  send(&sequencer, json!({"type": "start"}));

  let samples = render(&mut processor, 1_000);
  let gate = channel(&samples, 0);
  let pitch = channel(&samples, 1);

  assert_eq!(gate.iter().filter(|s| **s == 1.0).count(), 20);
  let first_high = gate.iter().position(|s| *s == 1.0).unwrap();
  assert!(first_high.abs_diff(250) <= 1);
  assert!((pitch[first_high] - 0.2).abs() < 1e-6);
  assert_eq!(pitch[first_high - 1], 0.0);

  let events = sequencer.drain_events();
  let global_steps: Vec<usize> = events
    .iter()
    .filter_map(|event| match event {
      Event::StepChange {
        channel: -1, step, ..
      } => Some(*step),
      _ => None,
    })
    .collect();
  assert_eq!(global_steps, vec![0, 1, 2, 3]);
}

#[test]
fn mode_change_and_clear_reach_the_audio_thread() {
  let (sequencer, mut processor) = Sequencer::new(config(), one_second_state()).unwrap();
  send(&sequencer, json!({"type": "update-pattern-cell", "channel": 2, "step": 0, "active": true}));
  send(
    &sequencer,
    json!({
      "type": "set-channel-mode",
      "channel": 2,
      "mode": "ramp",
      "params": { "ramp": { "polarity": "negative", "amplitudeVolts": 10.0 } }
    }),
  );
  send(&sequencer, json!({"type": "clear-pattern"}));
  send(&sequencer, json!({"type": "start"}));

  let samples = render(&mut processor, 500);
  assert_eq!(processor.engine().state().channels[2].mode, ChannelMode::Ramp);
  assert!(!processor.engine().state().patterns.get(2, 0));
  let ramp = channel(&samples, 2);
  assert_eq!(ramp[0], 1.0);
  assert!(ramp.windows(2).all(|w| w[1] <= w[0]));

  sequencer.drain_events();
  assert_eq!(processor.engine().state(), &sequencer.state());
}

#[test]
fn stop_and_pause_commands() {
  let (sequencer, mut processor) = Sequencer::new(config(), one_second_state()).unwrap();
  send(&sequencer, json!({"type": "start"}));
  render(&mut processor, 100);

  send(&sequencer, json!({"type": "pause"}));
  render(&mut processor, 100);
  assert_eq!(processor.engine().sample_time(), 100);

  send(&sequencer, json!({"type": "pause"}));
  render(&mut processor, 100);
  assert_eq!(processor.engine().sample_time(), 200);

  send(&sequencer, json!({"type": "stop"}));
  let samples = render(&mut processor, 100);
  assert!(samples.iter().all(|s| *s == 0.0));
  assert_eq!(processor.engine().sample_time(), 0);
}

#[test]
fn set_state_replaces_everything() {
  let (sequencer, mut processor) = Sequencer::new(config(), SequencerState::default()).unwrap();
  let mut state = one_second_state();
  state.channels[7].muted = true;
  state.pitches.set(3, 2, Some(-12));

  send(&sequencer, json!({"type": "set-state", "state": state}));
  processor.process_commands();

  assert_eq!(processor.engine().state(), &state);
  assert_eq!(sequencer.state(), state);
}

#[test]
fn processor_runs_on_its_own_thread() {
  let (sequencer, mut processor) = Sequencer::new(config(), one_second_state()).unwrap();
  send(&sequencer, json!({"type": "start"}));

  let audio = thread::spawn(move || {
    let samples = render(&mut processor, 2_000);
    (processor, samples)
  });

  let mut events = Vec::new();
  let (processor, samples) = audio.join().unwrap();
  events.extend(sequencer.drain_events());

  assert_eq!(samples.len(), 2_000 * CHANNEL_COUNT);
  assert_eq!(processor.engine().sample_time(), 2_000);
  let wraps = events
    .iter()
    .filter(|event| {
      matches!(
        event,
        Event::StepChange {
          channel: -1,
          is_wrap: true,
          ..
        }
      )
    })
    .count();
  assert_eq!(wraps, 2);
  assert_eq!(sequencer.dropped_events(), 0);
}

#[test]
fn undrained_sample_hold_values_survive_unrelated_installs() {
  let (sequencer, mut processor) = Sequencer::new(config(), one_second_state()).unwrap();
  send(&sequencer, json!({"type": "start"}));

  let held = *channel(&render(&mut processor, 64), 5).last().unwrap();
  assert_ne!(held, 0.0);

  send(&sequencer, json!({"type": "update-lfo-params", "channel": 4, "params": {"rate": 2.0}}));
  send(&sequencer, json!({"type": "set-trigger-duration", "channel": 0, "samples": 20}));
  let after = channel(&render(&mut processor, 1), 5)[0];
  assert_eq!(after, held);

  sequencer.drain_events();
  assert_eq!(processor.engine().state(), &sequencer.state());
}

#[test]
fn dropped_sample_hold_event_does_not_change_audio() {
  let config = EngineConfig {
    event_queue_capacity: 2,
    ..config()
  };
  let (sequencer, mut processor) = Sequencer::new(config, one_second_state()).unwrap();
  send(&sequencer, json!({"type": "start"}));

  let held = *channel(&render(&mut processor, 64), 5).last().unwrap();
  assert_ne!(held, 0.0);
  let events = sequencer.drain_events();
  assert!(sequencer.dropped_events() > 0);
  assert!(
    !events
      .iter()
      .any(|event| matches!(event, Event::ShValuesUpdated { .. }))
  );

  send(&sequencer, json!({"type": "set-cycle-time", "seconds": 2.0}));
  let after = channel(&render(&mut processor, 1), 5)[0];
  assert_eq!(after, held);
  assert_eq!(processor.engine().state().config, sequencer.state().config);
}

#[test]
fn explicit_sample_hold_values_reach_the_engine() {
  let (sequencer, mut processor) = Sequencer::new(config(), one_second_state()).unwrap();
  send(&sequencer, json!({"type": "start"}));
  render(&mut processor, 64);

  send(
    &sequencer,
    json!({"type": "update-sh-params", "channel": 5, "params": {"mode": "manual", "width": 1.0}}),
  );
  send(&sequencer, json!({"type": "set-sh-values", "channel": 5, "values": [0.25, -0.5]}));
  let after = channel(&render(&mut processor, 1), 5)[0];
  assert_eq!(after, 0.25);
}
