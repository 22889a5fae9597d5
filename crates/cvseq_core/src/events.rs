//! Events emitted by the engine while rendering.
//!
//! Payloads are fixed-size so that emitting never allocates on the audio thread.

use arrayvec::ArrayVec;

use crate::types::MAX_STEPS;

/// `channel` value of step changes on the master grid.
pub const GLOBAL_CHANNEL: i32 = -1;

#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    StepChange {
        /// Output channel, or `GLOBAL_CHANNEL` for the master grid.
        channel: i32,
        step: usize,
        is_wrap: bool,
        /// Samples rendered since the transport started.
        sample_time: u64,
    },
    ShValuesUpdated {
        channel: usize,
        values: ArrayVec<f32, MAX_STEPS>,
    },
    Log {
        message: &'static str,
    },
}

/// Receiver of engine events. Implementations on the audio thread must not block;
/// dropping events under backpressure is allowed.
pub trait EventSink {
    fn emit(&mut self, event: EngineEvent);
}

impl EventSink for Vec<EngineEvent> {
    fn emit(&mut self, event: EngineEvent) {
        self.push(event);
    }
}

/// Sink that drops everything, for benchmarks and offline rendering.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardEvents;

impl EventSink for DiscardEvents {
    fn emit(&mut self, _event: EngineEvent) {}
}
