use crate::dsp::utils::LcgRng;
use crate::store::StepRow;

/// Fill the first `step_count` entries with fresh uniform values in [-1, 1].
pub fn regenerate(values: &mut StepRow<f32>, step_count: usize, rng: &mut LcgRng) {
    for value in values.as_mut_slice().iter_mut().take(step_count) {
        *value = rng.next_bipolar();
    }
}

/// Held value for `step`, scaled by `width`.
#[inline]
pub fn output(values: &StepRow<f32>, step: usize, width: f32) -> f32 {
    values.get(step).unwrap_or(0.0) * width
}
