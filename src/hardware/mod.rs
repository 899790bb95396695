//! Hardware abstraction layer.
//!
//! This module contains the device capability traits consumed by the overlap
//! procedure, the bounce-scaled delay stage wrapper, and mock implementations
//! for testing and simulation without physical hardware.

pub mod capabilities;
pub mod delay_stage;
pub mod mock;

pub use capabilities::{DelayActuator, Movable, SampleCount, WaveformSource};
pub use delay_stage::DelayStage;
pub use mock::{MockDelayLine, MockSampleCount, MockWaveformChannel};
