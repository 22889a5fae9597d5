//! Per-sample signal generators for each channel mode.
//!
//! The engine's mode dispatcher owns the per-channel state and calls into these
//! on step changes and once per sample.

pub mod lfo;
pub mod pitch;
pub mod ramp;
pub mod sample_and_hold;
pub mod trigger;
pub mod utils;
