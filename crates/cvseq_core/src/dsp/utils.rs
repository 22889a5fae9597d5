/// Wrap a phase into [0, 1).
#[inline]
pub fn wrap_phase(phase: f64) -> f64 {
    let wrapped = phase.rem_euclid(1.0);
    // rem_euclid can round up to exactly 1.0 for tiny negative inputs
    if wrapped >= 1.0 { 0.0 } else { wrapped }
}

/// Allocation-free linear congruential generator for use on the audio thread.
#[derive(Clone, Copy, Debug)]
pub struct LcgRng {
    state: u64,
}

impl LcgRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Uniform value in [-1, 1].
    pub fn next_bipolar(&mut self) -> f32 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let bits = (self.state >> 32) as u32;
        let value = bits as f64 / u32::MAX as f64;
        (value * 2.0 - 1.0) as f32
    }
}
