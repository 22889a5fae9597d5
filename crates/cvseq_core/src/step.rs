use crate::phase::step_index;

/// `previous_step` value before the first detection after a reset.
pub const NO_STEP: i32 = -1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepEdge {
    pub step: usize,
    /// The loop restarted (new step is 0).
    pub is_wrap: bool,
}

/// Edge detector on the floored step index of a phase accumulator. A phase that
/// moves backwards counts as a loop restart even when the index is unchanged, so
/// single-step loops still fire once per loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepDetector {
    previous_step: i32,
    previous_phase: f64,
}

impl Default for StepDetector {
    fn default() -> Self {
        Self {
            previous_step: NO_STEP,
            previous_phase: 0.0,
        }
    }
}

impl StepDetector {
    /// Report a step change when the index at `phase` differs from the last one
    /// seen, or when the phase looped.
    #[inline]
    pub fn detect(&mut self, phase: f64, step_count: usize) -> Option<StepEdge> {
        let step = step_index(phase, step_count);
        let looped = phase < self.previous_phase;
        self.previous_phase = phase;
        if step as i32 == self.previous_step && !looped {
            return None;
        }
        self.previous_step = step as i32;
        Some(StepEdge {
            step,
            is_wrap: step == 0,
        })
    }

    /// Step index from the most recent detection.
    pub fn current_step(&self) -> Option<usize> {
        (self.previous_step >= 0).then_some(self.previous_step as usize)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
