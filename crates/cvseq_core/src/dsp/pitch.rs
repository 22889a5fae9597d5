use crate::types::PITCH_RANGE_SEMITONES;

/// Held pitch of a pitch channel. Output is normalized so ±120 semitones map to ±1.0
/// (±10V at 12 semitones per volt).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PitchLatch {
    semitones: i8,
}

impl PitchLatch {
    pub fn latch(&mut self, semitones: i8) {
        self.semitones = semitones;
    }

    pub fn semitones(&self) -> i8 {
        self.semitones
    }

    #[inline]
    pub fn output(&self) -> f32 {
        self.semitones as f32 / PITCH_RANGE_SEMITONES as f32
    }
}

/// Whether a pitch channel latches on a step. Uncoupled channels always do;
/// coupled ones only when the gating trigger cell is active.
#[inline]
pub fn gate_allows_latch(coupled_gate: Option<bool>) -> bool {
    coupled_gate.unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_normalized() {
        let mut latch = PitchLatch::default();
        assert_eq!(latch.output(), 0.0);
        latch.latch(12);
        assert!((latch.output() - 0.1).abs() < 1e-7);
        latch.latch(-120);
        assert_eq!(latch.output(), -1.0);
        latch.latch(120);
        assert_eq!(latch.output(), 1.0);
    }

    #[test]
    fn coupling_gate() {
        assert!(gate_allows_latch(None));
        assert!(gate_allows_latch(Some(true)));
        assert!(!gate_allows_latch(Some(false)));
    }
}
