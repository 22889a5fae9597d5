//! Cycle-synchronous ramp utility output.

use crate::types::{FULL_SCALE_VOLTS, RampParams, RampPolarity};

/// Rising (or falling) ramp over one master cycle, peaking at `amplitude_volts`.
/// The negative ramp is offset by its amplitude so the output never goes below 0.
#[inline]
pub fn output(master_phase: f64, params: &RampParams) -> f32 {
    let amplitude = params.amplitude_volts.clamp(0.0, FULL_SCALE_VOLTS) / FULL_SCALE_VOLTS;
    let phase = master_phase as f32;
    match params.polarity {
        RampPolarity::Positive => phase * amplitude,
        RampPolarity::Negative => amplitude - phase * amplitude,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_ramp_rises_to_amplitude() {
        let params = RampParams {
            polarity: RampPolarity::Positive,
            amplitude_volts: 5.0,
        };
        assert_eq!(output(0.0, &params), 0.0);
        assert!((output(0.5, &params) - 0.25).abs() < 1e-7);
        assert!((output(0.999, &params) - 0.4995).abs() < 1e-6);
    }

    #[test]
    fn negative_ramp_stays_non_negative() {
        let params = RampParams {
            polarity: RampPolarity::Negative,
            amplitude_volts: 10.0,
        };
        assert_eq!(output(0.0, &params), 1.0);
        assert!((output(0.75, &params) - 0.25).abs() < 1e-7);
        for i in 0..100 {
            assert!(output(i as f64 / 100.0, &params) >= 0.0);
        }
    }
}
