//! Mock Hardware Implementations
//!
//! Provides simulated devices for testing and simulation without physical
//! hardware. All mocks use async-safe operations (tokio::time::sleep, not
//! std::thread::sleep).
//!
//! # Available Mocks
//!
//! - `MockDelayLine` - Simulated delay actuator with a shared position cell
//! - `MockWaveformChannel` - Simulated digitizer channel whose trace depends
//!   on the current delay
//! - `MockSampleCount` - Simulated buffer-length report
//!
//! The delay line exposes its position cell so waveform channels can respond
//! to motion, which is what the closed-loop tests need. Mocks also count
//! moves and reads so tests can assert on device traffic.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use tokio::sync::RwLock;
use tokio::time::{sleep, Duration};

use crate::hardware::capabilities::{DelayActuator, SampleCount, WaveformSource};

/// Shared mock delay position, in seconds.
pub type SharedDelay = Arc<RwLock<f64>>;

/// Mock delay actuator with instantaneous moves and an optional settle sleep.
pub struct MockDelayLine {
    position: SharedDelay,
    settle: Duration,
    move_count: Arc<RwLock<u32>>,
}

impl MockDelayLine {
    /// Create a mock delay line at the given starting delay.
    pub fn new(start: f64) -> Self {
        Self::with_settle(start, Duration::ZERO)
    }

    /// Create a mock delay line that sleeps for `settle` on every move.
    pub fn with_settle(start: f64, settle: Duration) -> Self {
        Self {
            position: Arc::new(RwLock::new(start)),
            settle,
            move_count: Arc::new(RwLock::new(0)),
        }
    }

    /// Handle to the position cell, for wiring up waveform channels.
    pub fn shared_position(&self) -> SharedDelay {
        self.position.clone()
    }

    /// Number of moves commanded so far.
    pub async fn move_count(&self) -> u32 {
        *self.move_count.read().await
    }
}

#[async_trait]
impl DelayActuator for MockDelayLine {
    async fn delay(&self) -> Result<f64> {
        Ok(*self.position.read().await)
    }

    async fn set_delay(&self, delay: f64) -> Result<()> {
        sleep(self.settle).await;
        *self.position.write().await = delay;
        *self.move_count.write().await += 1;
        Ok(())
    }

    async fn adjust_delay(&self, delta: f64) -> Result<()> {
        let current = *self.position.read().await;
        self.set_delay(current + delta).await
    }
}

type Profile = dyn Fn(f64) -> Vec<f64> + Send + Sync;

/// Mock digitizer channel.
///
/// Each read evaluates a profile function at the current delay, optionally
/// adds uniform noise, and returns the resulting trace.
pub struct MockWaveformChannel {
    name: String,
    delay: SharedDelay,
    profile: Box<Profile>,
    noise: f64,
    read_count: Arc<RwLock<u64>>,
}

impl MockWaveformChannel {
    /// Create a channel whose trace is computed from the current delay.
    pub fn new(
        name: impl Into<String>,
        delay: SharedDelay,
        profile: impl Fn(f64) -> Vec<f64> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            delay,
            profile: Box::new(profile),
            noise: 0.0,
            read_count: Arc::new(RwLock::new(0)),
        }
    }

    /// Create a channel that returns the same trace at every delay.
    pub fn constant(name: impl Into<String>, delay: SharedDelay, trace: Vec<f64>) -> Self {
        Self::new(name, delay, move |_| trace.clone())
    }

    /// Add uniform noise of the given amplitude to every sample.
    pub fn with_noise(mut self, amplitude: f64) -> Self {
        self.noise = amplitude;
        self
    }

    /// Number of snapshots taken so far.
    pub async fn read_count(&self) -> u64 {
        *self.read_count.read().await
    }
}

#[async_trait]
impl WaveformSource for MockWaveformChannel {
    fn channel(&self) -> &str {
        &self.name
    }

    async fn read(&self) -> Result<Vec<f64>> {
        let delay = *self.delay.read().await;
        let mut trace = (self.profile)(delay);
        if self.noise > 0.0 {
            let mut rng = rand::thread_rng();
            for sample in &mut trace {
                *sample += rng.gen_range(-self.noise..self.noise);
            }
        }
        *self.read_count.write().await += 1;
        Ok(trace)
    }
}

/// Mock buffer-length report.
pub struct MockSampleCount {
    length: Arc<RwLock<usize>>,
}

impl MockSampleCount {
    /// Create a report with a fixed useful length.
    pub fn new(length: usize) -> Self {
        Self {
            length: Arc::new(RwLock::new(length)),
        }
    }

    /// Change the reported useful length.
    pub async fn set_length(&self, length: usize) {
        *self.length.write().await = length;
    }
}

#[async_trait]
impl SampleCount for MockSampleCount {
    async fn useful_length(&self) -> Result<usize> {
        Ok(*self.length.read().await)
    }
}
