//! The complete sequencer snapshot: configuration plus step stores.
//!
//! This is what the control side edits, what the audio thread renders from, and
//! what state files contain. Edits that change a channel's effective step count go
//! through [`SequencerState::reconfigure`] so step data follows the new grid.

use serde::{Deserialize, Serialize};

use crate::coupling::Topology;
use crate::migrate::{migrate_pattern, migrate_pitches, migrate_sample_hold};
use crate::store::{PatternStore, PitchStore, ShStore, StepRow};
use crate::types::{CHANNEL_COUNT, ChannelConfig, MAX_STEPS, SequencerConfig, default_channels};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SequencerState {
    pub config: SequencerConfig,
    pub channels: [ChannelConfig; CHANNEL_COUNT],
    pub patterns: PatternStore,
    pub pitches: PitchStore,
    pub sample_hold: ShStore,
}

impl Default for SequencerState {
    fn default() -> Self {
        Self {
            config: SequencerConfig::default(),
            channels: default_channels(),
            patterns: PatternStore::default(),
            pitches: PitchStore::default(),
            sample_hold: ShStore::default(),
        }
    }
}

/// A channel whose step data was resampled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Migration {
    pub channel: usize,
    pub from: usize,
    pub to: usize,
}

impl SequencerState {
    pub fn topology(&self) -> Topology {
        Topology::resolve(&self.config, &self.channels)
    }

    pub fn effective_step_counts(&self) -> [usize; CHANNEL_COUNT] {
        self.topology().step_counts()
    }

    /// Apply a configuration edit, then migrate the step data of every channel
    /// whose effective step count changed.
    pub fn reconfigure<F>(&mut self, edit: F) -> Vec<Migration>
    where
        F: FnOnce(&mut SequencerConfig, &mut [ChannelConfig; CHANNEL_COUNT]),
    {
        let before = self.effective_step_counts();
        edit(&mut self.config, &mut self.channels);
        let after = self.effective_step_counts();

        let mut migrations = Vec::new();
        for channel in 0..CHANNEL_COUNT {
            if before[channel] != after[channel] {
                self.migrate_channel(channel, before[channel], after[channel]);
                migrations.push(Migration {
                    channel,
                    from: before[channel],
                    to: after[channel],
                });
            }
        }
        migrations
    }

    /// Resample one channel's pattern, pitch and sample-and-hold rows.
    pub fn migrate_channel(&mut self, channel: usize, from: usize, to: usize) {
        if channel >= CHANNEL_COUNT {
            return;
        }
        let from = from.min(MAX_STEPS);

        let pattern = migrate_pattern(&self.patterns.row(channel).as_slice()[..from], from, to);
        *self.patterns.row_mut(channel) = StepRow::from_slice(&pattern);

        let pitches = migrate_pitches(&self.pitches.row(channel).as_slice()[..from], from, to);
        *self.pitches.row_mut(channel) = StepRow::from_slice(&pitches);

        let values =
            migrate_sample_hold(&self.sample_hold.row(channel).as_slice()[..from], from, to);
        *self.sample_hold.row_mut(channel) = StepRow::from_slice(&values);
    }

    /// Clear one channel's trigger pattern, or every channel's when `channel` is `None`.
    pub fn clear_pattern(&mut self, channel: Option<usize>) {
        match channel {
            Some(channel) => self.patterns.clear_channel(channel),
            None => self.patterns.clear(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
