/// Fixed-length full-scale pulse, shared by trigger and clock channels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TriggerState {
    active: bool,
    elapsed_samples: u32,
}

impl TriggerState {
    /// Start (or restart) a pulse.
    pub fn fire(&mut self) {
        self.active = true;
        self.elapsed_samples = 0;
    }

    /// Produce one sample of the pulse. Outputs exactly 1.0 for `duration_samples`
    /// consecutive calls after `fire`, then 0.0.
    #[inline]
    pub fn tick(&mut self, duration_samples: u32) -> f32 {
        if !self.active {
            return 0.0;
        }
        let duration = duration_samples.max(1);
        // duration shortened while the pulse was running
        if self.elapsed_samples >= duration {
            self.release();
            return 0.0;
        }
        self.elapsed_samples += 1;
        if self.elapsed_samples >= duration {
            self.release();
        }
        1.0
    }

    pub fn release(&mut self) {
        self.active = false;
        self.elapsed_samples = 0;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn elapsed_samples(&self) -> u32 {
        self.elapsed_samples
    }
}
