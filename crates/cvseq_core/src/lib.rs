//! CV sequencer core library
//!
//! This crate provides the real-time signal generation engine for a multi-channel
//! CV/gate step sequencer. It is a pure library with no I/O, threading, or queue
//! concerns. Those responsibilities belong in the control layer.

extern crate arrayvec;
extern crate serde;
extern crate serde_json;

pub mod clock;
pub mod coupling;
pub mod dsp;
pub mod engine;
pub mod events;
pub mod migrate;
pub mod phase;
pub mod state;
pub mod step;
pub mod store;
pub mod types;

// Re-export commonly used items
pub use engine::{Engine, KEEP_SH_ROWS, REPLACE_ALL_SH_ROWS, ShRowMask, Transport};
pub use events::{EngineEvent, EventSink, GLOBAL_CHANNEL};
pub use state::{Migration, SequencerState};
pub use store::{PatternStore, PitchStore, ShStore, StepRow};

pub use types::{
    CHANNEL_COUNT, ChannelConfig, ChannelMode, LfoParams, LfoWaveform, MAX_STEPS,
    PolyrhythmTiming, RampParams, RampPolarity, SequencerConfig, ShMode, ShParams,
    StepCountMode,
};
