use serde::{Deserialize, Serialize};

/// Number of output channels driven by the engine.
pub const CHANNEL_COUNT: usize = 8;

/// Upper bound of every step domain (global and per-channel).
pub const MAX_STEPS: usize = 96;

pub const MIN_GLOBAL_STEPS: usize = 2;
pub const MIN_CHANNEL_STEPS: usize = 1;

pub const MIN_CYCLE_TIME_SECONDS: f32 = 0.5;
pub const MAX_CYCLE_TIME_SECONDS: f32 = 8.0;

/// Pitch cells are semitone offsets in `[-PITCH_RANGE_SEMITONES, PITCH_RANGE_SEMITONES]`.
/// At 12 semitones per volt this spans ±10V.
pub const PITCH_RANGE_SEMITONES: i32 = 120;

pub const MIN_LFO_RATE: f32 = 1.0;
pub const MAX_LFO_RATE: f32 = 16.0;

pub const MIN_TRIGGER_DURATION_SAMPLES: u32 = 1;
pub const MAX_TRIGGER_DURATION_SAMPLES: u32 = 96_000;

/// Full-scale output voltage; normalized output 1.0 maps to this.
pub const FULL_SCALE_VOLTS: f32 = 10.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChannelMode {
    #[default]
    Trigger,
    Pitch,
    Lfo,
    SampleHold,
    Ramp,
    Clock,
}

impl ChannelMode {
    /// Gate-style modes emit pulses and go low while the transport is paused.
    pub fn is_gate(self) -> bool {
        matches!(self, ChannelMode::Trigger | ChannelMode::Clock)
    }
}

/// How a channel derives its step count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepCountMode {
    #[default]
    Global,
    /// Subdivide the global cycle into `custom_step_count` steps.
    Custom,
    /// Steps last as long as global steps; the loop length follows the step count.
    Polyrhythm,
}

/// Timing behaviour of polyrhythm channels relative to the master clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PolyrhythmTiming {
    /// Independent accumulator, only reset by the transport. Drifts against the master.
    #[default]
    FreeRunning,
    /// Same rate as `FreeRunning`, but re-aligned every time the master wraps.
    MasterLocked,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LfoWaveform {
    #[default]
    Sine,
    Ramp,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LfoParams {
    pub waveform: LfoWaveform,
    /// cycles per owning-channel loop, 1..=16
    pub rate: f32,
    /// rising share of the ramp waveform, 0..=1
    pub duty: f32,
    /// output scale, 0..=1
    pub width: f32,
    /// phase offset in cycles, 0..=1
    pub phase_offset: f32,
}

impl Default for LfoParams {
    fn default() -> Self {
        Self {
            waveform: LfoWaveform::Sine,
            rate: 1.0,
            duty: 0.5,
            width: 1.0,
            phase_offset: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShMode {
    /// Values are regenerated at every loop wrap.
    #[default]
    Random,
    /// Values are only changed by control messages.
    Manual,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShParams {
    pub mode: ShMode,
    pub width: f32,
}

impl Default for ShParams {
    fn default() -> Self {
        Self {
            mode: ShMode::Random,
            width: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RampPolarity {
    #[default]
    Positive,
    Negative,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RampParams {
    pub polarity: RampPolarity,
    /// peak voltage, 0..=10
    pub amplitude_volts: f32,
}

impl Default for RampParams {
    fn default() -> Self {
        Self {
            polarity: RampPolarity::Positive,
            amplitude_volts: FULL_SCALE_VOLTS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChannelConfig {
    pub mode: ChannelMode,
    pub step_count_mode: StepCountMode,
    pub custom_step_count: usize,
    pub polyrhythm_step_count: usize,
    pub trigger_duration_samples: u32,
    pub lfo: LfoParams,
    pub sample_hold: ShParams,
    pub ramp: RampParams,
    /// Only meaningful for pitch channels: follow the trigger channel at index - 1.
    pub coupled: bool,
    pub muted: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            mode: ChannelMode::Trigger,
            step_count_mode: StepCountMode::Global,
            custom_step_count: 16,
            polyrhythm_step_count: 16,
            trigger_duration_samples: 480,
            lfo: LfoParams::default(),
            sample_hold: ShParams::default(),
            ramp: RampParams::default(),
            coupled: false,
            muted: false,
        }
    }
}

impl ChannelConfig {
    pub fn with_mode(mode: ChannelMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

/// Default channel layout: two coupled trigger/pitch pairs, an LFO, a sample-and-hold,
/// and the ramp and clock utility outputs.
pub fn default_channels() -> [ChannelConfig; CHANNEL_COUNT] {
    [
        ChannelConfig::with_mode(ChannelMode::Trigger),
        ChannelConfig {
            coupled: true,
            ..ChannelConfig::with_mode(ChannelMode::Pitch)
        },
        ChannelConfig::with_mode(ChannelMode::Trigger),
        ChannelConfig::with_mode(ChannelMode::Pitch),
        ChannelConfig::with_mode(ChannelMode::Lfo),
        ChannelConfig::with_mode(ChannelMode::SampleHold),
        ChannelConfig::with_mode(ChannelMode::Ramp),
        ChannelConfig::with_mode(ChannelMode::Clock),
    ]
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SequencerConfig {
    pub cycle_time_seconds: f32,
    pub global_step_count: usize,
    pub polyrhythm_timing: PolyrhythmTiming,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            cycle_time_seconds: 2.0,
            global_step_count: 16,
            polyrhythm_timing: PolyrhythmTiming::FreeRunning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn channel_config_deserializes_partial_json() {
        let config: ChannelConfig = serde_json::from_value(json!({
            "mode": "sampleHold",
            "stepCountMode": "polyrhythm",
            "polyrhythmStepCount": 5,
            "lfo": { "waveform": "ramp" }
        }))
        .unwrap();

        assert_eq!(config.mode, ChannelMode::SampleHold);
        assert_eq!(config.step_count_mode, StepCountMode::Polyrhythm);
        assert_eq!(config.polyrhythm_step_count, 5);
        assert_eq!(config.lfo.waveform, LfoWaveform::Ramp);
        // Unspecified LFO fields fall back to defaults
        assert_eq!(config.lfo.rate, 1.0);
        assert_eq!(config.trigger_duration_samples, 480);
    }

    #[test]
    fn default_layout_couples_first_pitch_channel() {
        let channels = default_channels();
        assert_eq!(channels[0].mode, ChannelMode::Trigger);
        assert_eq!(channels[1].mode, ChannelMode::Pitch);
        assert!(channels[1].coupled);
        assert!(!channels[3].coupled);
        assert_eq!(channels[6].mode, ChannelMode::Ramp);
        assert_eq!(channels[7].mode, ChannelMode::Clock);
    }

    #[test]
    fn gate_modes() {
        assert!(ChannelMode::Trigger.is_gate());
        assert!(ChannelMode::Clock.is_gate());
        assert!(!ChannelMode::Pitch.is_gate());
        assert!(!ChannelMode::Lfo.is_gate());
    }
}
