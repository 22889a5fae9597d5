/// Master phase accumulator. One full cycle from 0 to 1 spans `cycle_time_seconds`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseClock {
    phase: f64,
    increment: f64,
}

impl PhaseClock {
    pub fn new(cycle_time_seconds: f32, sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            increment: Self::increment_for(cycle_time_seconds, sample_rate),
        }
    }

    /// Per-sample phase increment. Degenerate inputs freeze the clock instead of
    /// producing a non-finite increment.
    pub fn increment_for(cycle_time_seconds: f32, sample_rate: f32) -> f64 {
        let samples_per_cycle = cycle_time_seconds as f64 * sample_rate as f64;
        if !samples_per_cycle.is_finite() || samples_per_cycle <= 0.0 {
            return 0.0;
        }
        1.0 / samples_per_cycle
    }

    /// Recompute the increment. The in-flight phase is kept as is so the output
    /// stays continuous across the tempo jump.
    pub fn set_cycle_time(&mut self, cycle_time_seconds: f32, sample_rate: f32) {
        self.increment = Self::increment_for(cycle_time_seconds, sample_rate);
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn increment(&self) -> f64 {
        self.increment
    }

    /// Advance by one sample. Returns true when the phase wrapped past 1.
    pub fn advance(&mut self) -> bool {
        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase = self.phase.fract();
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_once_per_cycle() {
        let sr = 48_000.0;
        let mut clock = PhaseClock::new(0.5, sr);
        let mut wraps = 0;
        for _ in 0..(24_000 * 3 + 10) {
            if clock.advance() {
                wraps += 1;
            }
            assert!((0.0..1.0).contains(&clock.phase()));
        }
        assert_eq!(wraps, 3);
    }

    #[test]
    fn cycle_time_change_keeps_phase() {
        let sr = 1_000.0;
        let mut clock = PhaseClock::new(1.0, sr);
        for _ in 0..250 {
            clock.advance();
        }
        let before = clock.phase();
        clock.set_cycle_time(4.0, sr);
        assert_eq!(clock.phase(), before);
        assert!((clock.increment() - 1.0 / 4_000.0).abs() < 1e-15);
    }

    #[test]
    fn degenerate_sample_rate_freezes() {
        let mut clock = PhaseClock::new(2.0, 0.0);
        assert_eq!(clock.increment(), 0.0);
        assert!(!clock.advance());
        assert_eq!(clock.phase(), 0.0);
    }

    #[test]
    fn reset_returns_to_zero() {
        let mut clock = PhaseClock::new(1.0, 100.0);
        for _ in 0..10 {
            clock.advance();
        }
        clock.reset();
        assert_eq!(clock.phase(), 0.0);
    }
}
