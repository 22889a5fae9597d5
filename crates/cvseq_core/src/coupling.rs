//! Per-channel timing resolution.
//!
//! A `Topology` is computed whenever a configuration is applied. It turns each
//! channel's step-count mode and coupling flag into an effective step count and
//! an explicit phase source, so the render loop never has to follow index links.

use crate::types::{
    CHANNEL_COUNT, ChannelConfig, ChannelMode, MAX_STEPS, MIN_CHANNEL_STEPS, PolyrhythmTiming,
    SequencerConfig, StepCountMode,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChannelTiming {
    /// Phase follows the master clock exactly.
    Locked,
    /// Own accumulator running at `ratio` times the master rate.
    Polyrhythm { ratio: f64, realign_on_wrap: bool },
    /// Phase is copied from another channel (coupled pitch).
    Borrowed { source: usize },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedChannel {
    pub step_count: usize,
    pub timing: ChannelTiming,
    /// Trigger channel gating this pitch channel, when coupling resolved.
    pub coupled_to: Option<usize>,
    /// Coupling was requested but no trigger neighbour exists.
    pub coupling_fallback: bool,
}

impl Default for ResolvedChannel {
    fn default() -> Self {
        Self {
            step_count: MIN_CHANNEL_STEPS,
            timing: ChannelTiming::Locked,
            coupled_to: None,
            coupling_fallback: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Topology {
    channels: [ResolvedChannel; CHANNEL_COUNT],
}

/// Step count a channel uses on its own, ignoring coupling.
pub fn own_step_count(config: &SequencerConfig, channel: &ChannelConfig) -> usize {
    let count = match channel.step_count_mode {
        StepCountMode::Global => config.global_step_count,
        StepCountMode::Custom => channel.custom_step_count,
        StepCountMode::Polyrhythm => channel.polyrhythm_step_count,
    };
    count.clamp(MIN_CHANNEL_STEPS, MAX_STEPS)
}

/// The trigger channel a coupled pitch channel binds to, if the binding is valid.
pub fn coupling_partner(channels: &[ChannelConfig; CHANNEL_COUNT], index: usize) -> Option<usize> {
    let channel = channels.get(index)?;
    if channel.mode != ChannelMode::Pitch || !channel.coupled {
        return None;
    }
    let neighbour = index.checked_sub(1)?;
    (channels[neighbour].mode == ChannelMode::Trigger).then_some(neighbour)
}

impl Topology {
    pub fn resolve(config: &SequencerConfig, channels: &[ChannelConfig; CHANNEL_COUNT]) -> Self {
        let mut topology = Topology::default();
        let global_steps = config.global_step_count.clamp(MIN_CHANNEL_STEPS, MAX_STEPS);

        for (index, channel) in channels.iter().enumerate() {
            let resolved = match coupling_partner(channels, index) {
                // Partners sit at index - 1 and are never coupled themselves,
                // so they are already resolved.
                Some(partner) => ResolvedChannel {
                    step_count: topology.channels[partner].step_count,
                    timing: ChannelTiming::Borrowed { source: partner },
                    coupled_to: Some(partner),
                    coupling_fallback: false,
                },
                None => {
                    let step_count = own_step_count(config, channel);
                    let timing = match channel.step_count_mode {
                        StepCountMode::Global | StepCountMode::Custom => ChannelTiming::Locked,
                        StepCountMode::Polyrhythm => ChannelTiming::Polyrhythm {
                            ratio: global_steps as f64 / step_count as f64,
                            realign_on_wrap: config.polyrhythm_timing
                                == PolyrhythmTiming::MasterLocked,
                        },
                    };
                    ResolvedChannel {
                        step_count,
                        timing,
                        coupled_to: None,
                        coupling_fallback: channel.mode == ChannelMode::Pitch && channel.coupled,
                    }
                }
            };
            topology.channels[index] = resolved;
        }
        topology
    }

    pub fn channel(&self, index: usize) -> &ResolvedChannel {
        &self.channels[index]
    }

    pub fn step_count(&self, index: usize) -> usize {
        self.channels[index].step_count
    }

    pub fn step_counts(&self) -> [usize; CHANNEL_COUNT] {
        self.channels.map(|c| c.step_count)
    }

    pub fn fallback_count(&self) -> usize {
        self.channels.iter().filter(|c| c.coupling_fallback).count()
    }

    pub fn fallback_channels(&self) -> [bool; CHANNEL_COUNT] {
        self.channels.map(|c| c.coupling_fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::default_channels;

    #[test]
    fn coupled_pitch_follows_trigger_neighbour() {
        let config = SequencerConfig::default();
        let mut channels = default_channels();
        channels[0].step_count_mode = StepCountMode::Custom;
        channels[0].custom_step_count = 7;

        let topology = Topology::resolve(&config, &channels);
        assert_eq!(topology.step_count(0), 7);
        assert_eq!(topology.step_count(1), 7);
        assert_eq!(topology.channel(1).coupled_to, Some(0));
        assert_eq!(
            topology.channel(1).timing,
            ChannelTiming::Borrowed { source: 0 }
        );
    }

    #[test]
    fn coupling_without_trigger_neighbour_falls_back() {
        let config = SequencerConfig::default();
        let mut channels = default_channels();
        channels[0].mode = ChannelMode::Lfo;
        channels[1].step_count_mode = StepCountMode::Custom;
        channels[1].custom_step_count = 5;

        let topology = Topology::resolve(&config, &channels);
        assert_eq!(topology.channel(1).coupled_to, None);
        assert!(topology.channel(1).coupling_fallback);
        assert_eq!(topology.step_count(1), 5);
        assert_eq!(topology.fallback_count(), 1);
    }

    #[test]
    fn first_channel_cannot_couple() {
        let config = SequencerConfig::default();
        let mut channels = default_channels();
        channels[0] = ChannelConfig {
            coupled: true,
            ..ChannelConfig::with_mode(ChannelMode::Pitch)
        };
        assert_eq!(coupling_partner(&channels, 0), None);
        let topology = Topology::resolve(&config, &channels);
        assert!(topology.channel(0).coupling_fallback);
    }

    #[test]
    fn polyrhythm_ratio_is_global_over_own() {
        let config = SequencerConfig {
            global_step_count: 4,
            ..SequencerConfig::default()
        };
        let mut channels = default_channels();
        channels[2].step_count_mode = StepCountMode::Polyrhythm;
        channels[2].polyrhythm_step_count = 3;

        let topology = Topology::resolve(&config, &channels);
        match topology.channel(2).timing {
            ChannelTiming::Polyrhythm {
                ratio,
                realign_on_wrap,
            } => {
                assert!((ratio - 4.0 / 3.0).abs() < 1e-12);
                assert!(!realign_on_wrap);
            }
            other => panic!("unexpected timing {other:?}"),
        }
        assert_eq!(topology.step_count(2), 3);
        assert_eq!(topology.step_count(0), 4);
    }

    #[test]
    fn out_of_range_counts_are_clamped() {
        let config = SequencerConfig::default();
        let mut channels = default_channels();
        channels[4].step_count_mode = StepCountMode::Custom;
        channels[4].custom_step_count = 0;
        channels[5].step_count_mode = StepCountMode::Custom;
        channels[5].custom_step_count = 500;
        let topology = Topology::resolve(&config, &channels);
        assert_eq!(topology.step_count(4), 1);
        assert_eq!(topology.step_count(5), MAX_STEPS);
    }
}
