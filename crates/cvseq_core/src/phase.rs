use crate::clock::PhaseClock;
use crate::coupling::{ChannelTiming, Topology};
use crate::types::CHANNEL_COUNT;

/// Step index for a phase in [0, 1): `floor(phase * step_count) mod step_count`.
#[inline]
pub fn step_index(phase: f64, step_count: usize) -> usize {
    let count = step_count.max(1);
    ((phase * count as f64).floor() as usize) % count
}

#[inline]
fn wrap_unit(phase: f64) -> f64 {
    if phase >= 1.0 { phase.fract() } else { phase }
}

/// One phase accumulator per output channel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChannelPhaseSet {
    phases: [f64; CHANNEL_COUNT],
}

impl ChannelPhaseSet {
    pub fn phase(&self, channel: usize) -> f64 {
        self.phases[channel]
    }

    pub fn reset(&mut self) {
        self.phases = [0.0; CHANNEL_COUNT];
    }

    /// Advance every channel by one sample. Call after `master` has advanced;
    /// `master_wrapped` is what `PhaseClock::advance` returned.
    pub fn advance(&mut self, topology: &Topology, master: &PhaseClock, master_wrapped: bool) {
        for channel in 0..CHANNEL_COUNT {
            self.phases[channel] = match topology.channel(channel).timing {
                ChannelTiming::Locked => master.phase(),
                ChannelTiming::Polyrhythm {
                    ratio,
                    realign_on_wrap,
                } => {
                    if master_wrapped && realign_on_wrap {
                        wrap_unit(master.phase() * ratio)
                    } else {
                        wrap_unit(self.phases[channel] + master.increment() * ratio)
                    }
                }
                // Sources always have a lower index, so they were advanced already.
                ChannelTiming::Borrowed { source } => self.phases[source],
            };
        }
    }
}
