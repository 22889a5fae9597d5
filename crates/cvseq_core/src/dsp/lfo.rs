//! LFO waveforms keyed to the owning channel's phase.

use std::f64::consts::TAU;

use crate::dsp::utils::wrap_phase;
use crate::types::{LfoParams, LfoWaveform};

/// `(phase * rate + phase_offset) mod 1`
#[inline]
pub fn effective_phase(phase: f64, rate: f32, phase_offset: f32) -> f64 {
    wrap_phase(phase * rate as f64 + phase_offset as f64)
}

#[inline]
pub fn sine(effective_phase: f64, width: f32) -> f32 {
    ((TAU * effective_phase).sin() as f32) * width
}

/// Triangle/saw family. Rises from -1 to +1 over `duty` of the cycle and falls back
/// over the rest. The shape is shifted by half the rise so it crosses zero going up
/// at phase 0. A duty of 0 or 1 leaves a pure falling or rising saw.
#[inline]
pub fn ramp(effective_phase: f64, duty: f32, width: f32) -> f32 {
    let duty = duty.clamp(0.0, 1.0) as f64;
    let p = wrap_phase(effective_phase + duty * 0.5);
    let value = if duty >= 1.0 {
        2.0 * p - 1.0
    } else if duty <= 0.0 {
        1.0 - 2.0 * p
    } else if p < duty {
        -1.0 + 2.0 * p / duty
    } else {
        1.0 - 2.0 * (p - duty) / (1.0 - duty)
    };
    value as f32 * width
}

/// Render one sample. Returns the output and the effective phase it was taken at.
#[inline]
pub fn render(params: &LfoParams, phase: f64) -> (f32, f64) {
    let effective = effective_phase(phase, params.rate, params.phase_offset);
    let value = match params.waveform {
        LfoWaveform::Sine => sine(effective, params.width),
        LfoWaveform::Ramp => ramp(effective, params.duty, params.width),
    };
    (value, effective)
}
