//! Per-sample render loop.
//!
//! The `Engine` owns the installed [`SequencerState`] and all runtime state. Nothing
//! here allocates or blocks once constructed: snapshots arrive pre-boxed and the
//! replaced box is handed back to the caller for disposal elsewhere.

use arrayvec::ArrayVec;

use crate::clock::PhaseClock;
use crate::coupling::{ResolvedChannel, Topology};
use crate::dsp::pitch::{PitchLatch, gate_allows_latch};
use crate::dsp::trigger::TriggerState;
use crate::dsp::utils::LcgRng;
use crate::dsp::{lfo, ramp, sample_and_hold};
use crate::events::{EngineEvent, EventSink, GLOBAL_CHANNEL};
use crate::phase::ChannelPhaseSet;
use crate::state::SequencerState;
use crate::step::{StepDetector, StepEdge};
use crate::types::{
    CHANNEL_COUNT, ChannelConfig, ChannelMode, MAX_STEPS, MIN_CHANNEL_STEPS, ShMode,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Transport {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Generator state of a single output channel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChannelRuntime {
    pub detector: StepDetector,
    pub trigger: TriggerState,
    pub pitch: PitchLatch,
    pub held_sample: f32,
    pub lfo_phase: f64,
}

impl ChannelRuntime {
    /// Drop per-mode state but keep step tracking, so a mode switch does not
    /// produce a spurious step change.
    fn clear_generators(&mut self) {
        let detector = self.detector;
        *self = Self {
            detector,
            ..Self::default()
        };
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RuntimeState {
    pub global: StepDetector,
    pub channels: [ChannelRuntime; CHANNEL_COUNT],
}

/// Channels whose sample-and-hold row is taken from an installed snapshot. The
/// others keep the values the engine holds, which may have been regenerated since
/// the snapshot was built.
pub type ShRowMask = [bool; CHANNEL_COUNT];

/// Take every row from the snapshot.
pub const REPLACE_ALL_SH_ROWS: ShRowMask = [true; CHANNEL_COUNT];
/// Keep every row the engine holds.
pub const KEEP_SH_ROWS: ShRowMask = [false; CHANNEL_COUNT];

const FALLBACK_LOG: &str =
    "coupled pitch channel has no trigger neighbour, using its own step count";

pub struct Engine {
    sample_rate: f32,
    state: Box<SequencerState>,
    topology: Topology,
    global_steps: usize,
    clock: PhaseClock,
    phases: ChannelPhaseSet,
    runtime: RuntimeState,
    transport: Transport,
    rng: LcgRng,
    sample_time: u64,
    outputs: [f32; CHANNEL_COUNT],
}

impl Engine {
    pub fn new(sample_rate: f32, state: Box<SequencerState>, seed: u64) -> Self {
        let topology = state.topology();
        let global_steps = global_step_count(&state);
        let clock = PhaseClock::new(state.config.cycle_time_seconds, sample_rate);
        Self {
            sample_rate,
            state,
            topology,
            global_steps,
            clock,
            phases: ChannelPhaseSet::default(),
            runtime: RuntimeState::default(),
            transport: Transport::Stopped,
            rng: LcgRng::new(seed),
            sample_time: 0,
            outputs: [0.0; CHANNEL_COUNT],
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn runtime(&self) -> &RuntimeState {
        &self.runtime
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Samples rendered since the last start.
    pub fn sample_time(&self) -> u64 {
        self.sample_time
    }

    pub fn master_phase(&self) -> f64 {
        self.clock.phase()
    }

    pub fn channel_phase(&self, channel: usize) -> f64 {
        self.phases.phase(channel)
    }

    /// Outputs of the most recent frame.
    pub fn outputs(&self) -> &[f32; CHANNEL_COUNT] {
        &self.outputs
    }

    pub fn start(&mut self) {
        self.reset_runtime();
        self.transport = Transport::Playing;
    }

    pub fn stop(&mut self) {
        self.reset_runtime();
        self.transport = Transport::Stopped;
    }

    /// Toggle between playing and paused. A stopped engine stays stopped.
    pub fn pause(&mut self) {
        self.transport = match self.transport {
            Transport::Playing => Transport::Paused,
            Transport::Paused => Transport::Playing,
            Transport::Stopped => Transport::Stopped,
        };
    }

    fn reset_runtime(&mut self) {
        self.clock.reset();
        self.phases.reset();
        self.runtime = RuntimeState::default();
        self.sample_time = 0;
        self.outputs = [0.0; CHANNEL_COUNT];
    }

    /// Swap in a new snapshot and return the previous one. Runtime phases and
    /// latches carry over; channels whose mode changed start from idle generators.
    /// Sample-and-hold rows outside `replace_sh` keep the engine's current values.
    pub fn install<E: EventSink>(
        &mut self,
        state: Box<SequencerState>,
        replace_sh: ShRowMask,
        events: &mut E,
    ) -> Box<SequencerState> {
        let previous = std::mem::replace(&mut self.state, state);

        if previous.config.cycle_time_seconds != self.state.config.cycle_time_seconds {
            self.clock
                .set_cycle_time(self.state.config.cycle_time_seconds, self.sample_rate);
        }
        for (channel, runtime) in self.runtime.channels.iter_mut().enumerate() {
            if previous.channels[channel].mode != self.state.channels[channel].mode {
                runtime.clear_generators();
            }
            if !replace_sh[channel] {
                *self.state.sample_hold.row_mut(channel) = *previous.sample_hold.row(channel);
            }
        }

        let had_fallback = self.topology.fallback_channels();
        self.topology = self.state.topology();
        self.global_steps = global_step_count(&self.state);
        let fallback = self.topology.fallback_channels();
        if fallback != had_fallback && fallback.contains(&true) {
            events.emit(EngineEvent::Log {
                message: FALLBACK_LOG,
            });
        }
        previous
    }

    pub fn set_pattern_cell(&mut self, channel: usize, step: usize, active: bool) {
        self.state.patterns.set(channel, step, active);
    }

    pub fn set_pitch(&mut self, channel: usize, step: usize, semitones: Option<i8>) {
        self.state.pitches.set(channel, step, semitones);
    }

    pub fn set_muted(&mut self, channel: usize, muted: bool) {
        if let Some(config) = self.state.channels.get_mut(channel) {
            config.muted = muted;
        }
    }

    /// Render one frame of all channels and advance the clocks by one sample.
    pub fn process_frame<E: EventSink>(&mut self, events: &mut E) -> [f32; CHANNEL_COUNT] {
        match self.transport {
            Transport::Stopped => {
                self.outputs = [0.0; CHANNEL_COUNT];
            }
            Transport::Paused => {
                for (output, config) in self.outputs.iter_mut().zip(&self.state.channels) {
                    if config.mode.is_gate() {
                        *output = 0.0;
                    }
                }
            }
            Transport::Playing => self.render_playing_frame(events),
        }
        self.outputs
    }

    fn render_playing_frame<E: EventSink>(&mut self, events: &mut E) {
        let master_phase = self.clock.phase();
        let sample_time = self.sample_time;

        let global_edge = self.runtime.global.detect(master_phase, self.global_steps);
        if let Some(edge) = global_edge {
            events.emit(EngineEvent::StepChange {
                channel: GLOBAL_CHANNEL,
                step: edge.step,
                is_wrap: edge.is_wrap,
                sample_time,
            });
        }

        for channel in 0..CHANNEL_COUNT {
            let resolved = *self.topology.channel(channel);
            let phase = self.phases.phase(channel);
            let runtime = &mut self.runtime.channels[channel];

            let edge = runtime.detector.detect(phase, resolved.step_count);
            if let Some(edge) = edge {
                events.emit(EngineEvent::StepChange {
                    channel: channel as i32,
                    step: edge.step,
                    is_wrap: edge.is_wrap,
                    sample_time,
                });
            }

            let frame = ChannelFrame {
                channel,
                resolved,
                phase,
                master_phase,
                edge,
                global_edge,
            };
            let value = render_channel(&frame, &mut self.state, runtime, &mut self.rng, events);
            self.outputs[channel] = if self.state.channels[channel].muted {
                0.0
            } else {
                value
            };
        }

        let wrapped = self.clock.advance();
        self.phases.advance(&self.topology, &self.clock, wrapped);
        self.sample_time += 1;
    }

    /// Render interleaved frames into `output`. Trailing samples that do not fill a
    /// whole frame are left untouched.
    pub fn render<E: EventSink>(&mut self, output: &mut [f32], events: &mut E) {
        profiling::scope!("Engine::render");
        for frame in output.chunks_exact_mut(CHANNEL_COUNT) {
            let values = self.process_frame(events);
            frame.copy_from_slice(&values);
        }
    }
}

fn global_step_count(state: &SequencerState) -> usize {
    state
        .config
        .global_step_count
        .clamp(MIN_CHANNEL_STEPS, MAX_STEPS)
}

/// Timing inputs of one channel for the current sample.
struct ChannelFrame {
    channel: usize,
    resolved: ResolvedChannel,
    phase: f64,
    master_phase: f64,
    edge: Option<StepEdge>,
    global_edge: Option<StepEdge>,
}

fn render_channel<E: EventSink>(
    frame: &ChannelFrame,
    state: &mut SequencerState,
    runtime: &mut ChannelRuntime,
    rng: &mut LcgRng,
    events: &mut E,
) -> f32 {
    let channel = frame.channel;
    let config: ChannelConfig = state.channels[channel];

    match config.mode {
        ChannelMode::Trigger => {
            if let Some(edge) = frame.edge
                && state.patterns.get(channel, edge.step)
            {
                runtime.trigger.fire();
            }
            runtime.trigger.tick(config.trigger_duration_samples)
        }
        ChannelMode::Pitch => {
            if let Some(edge) = frame.edge {
                let gate = frame
                    .resolved
                    .coupled_to
                    .map(|partner| state.patterns.get(partner, edge.step));
                if gate_allows_latch(gate)
                    && let Some(semitones) = state.pitches.get(channel, edge.step)
                {
                    runtime.pitch.latch(semitones);
                }
            }
            runtime.pitch.output()
        }
        ChannelMode::Lfo => {
            let (value, effective) = lfo::render(&config.lfo, frame.phase);
            runtime.lfo_phase = effective;
            value
        }
        ChannelMode::SampleHold => {
            if let Some(edge) = frame.edge
                && edge.is_wrap
                && config.sample_hold.mode == ShMode::Random
            {
                let step_count = frame.resolved.step_count;
                let row = state.sample_hold.row_mut(channel);
                sample_and_hold::regenerate(row, step_count, rng);
                let values: ArrayVec<f32, MAX_STEPS> =
                    row.as_slice().iter().take(step_count).copied().collect();
                events.emit(EngineEvent::ShValuesUpdated { channel, values });
            }
            let step = runtime.detector.current_step().unwrap_or(0);
            let value = sample_and_hold::output(
                state.sample_hold.row(channel),
                step,
                config.sample_hold.width,
            );
            runtime.held_sample = value;
            value
        }
        ChannelMode::Ramp => ramp::output(frame.master_phase, &config.ramp),
        ChannelMode::Clock => {
            if frame.global_edge.is_some() {
                runtime.trigger.fire();
            }
            runtime.trigger.tick(config.trigger_duration_samples)
        }
    }
}
