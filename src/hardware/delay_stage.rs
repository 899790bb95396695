//! Bounce-scaled delay stage.
//!
//! An optical delay line folds the beam path over a retroreflector: each
//! bounce doubles the path-length change per unit of stage travel, so a
//! commanded delay `t` maps to stage travel `x = t * c / (2 * n_bounces)`.
//! `DelayStage` performs that conversion over any [`Movable`] linear stage
//! and exposes the result as a [`DelayActuator`] in time units.

use anyhow::{ensure, Result};
use async_trait::async_trait;
use log::debug;

use crate::hardware::capabilities::{DelayActuator, Movable};

/// Speed of light in millimetres per second.
const SPEED_OF_LIGHT_MM_PER_S: f64 = 2.997_924_58e11;

/// Adapter mapping optical delay (seconds) onto linear stage travel (mm).
pub struct DelayStage<M> {
    stage: M,
    n_bounces: u32,
}

impl<M: Movable> DelayStage<M> {
    /// Wrap a linear stage with the given bounce count.
    pub fn new(stage: M, n_bounces: u32) -> Result<Self> {
        ensure!(n_bounces >= 1, "bounce count must be at least 1");
        Ok(Self { stage, n_bounces })
    }

    fn mm_per_second(&self) -> f64 {
        SPEED_OF_LIGHT_MM_PER_S / (2.0 * f64::from(self.n_bounces))
    }

    fn delay_to_mm(&self, delay: f64) -> f64 {
        delay * self.mm_per_second()
    }

    fn mm_to_delay(&self, mm: f64) -> f64 {
        mm / self.mm_per_second()
    }
}

#[async_trait]
impl<M: Movable> DelayActuator for DelayStage<M> {
    async fn delay(&self) -> Result<f64> {
        Ok(self.mm_to_delay(self.stage.position().await?))
    }

    async fn set_delay(&self, delay: f64) -> Result<()> {
        let target = self.delay_to_mm(delay);
        debug!("delay {:e} s -> stage target {:.6} mm", delay, target);
        self.stage.move_abs(target).await?;
        self.stage.wait_settled().await
    }

    async fn adjust_delay(&self, delta: f64) -> Result<()> {
        let distance = self.delay_to_mm(delta);
        debug!("delay offset {:e} s -> stage travel {:.6} mm", delta, distance);
        self.stage.move_rel(distance).await?;
        self.stage.wait_settled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    struct RecordingStage {
        position: Arc<RwLock<f64>>,
        settles: Arc<RwLock<u32>>,
    }

    impl RecordingStage {
        fn new() -> Self {
            Self {
                position: Arc::new(RwLock::new(0.0)),
                settles: Arc::new(RwLock::new(0)),
            }
        }
    }

    #[async_trait]
    impl Movable for RecordingStage {
        async fn move_abs(&self, target: f64) -> Result<()> {
            *self.position.write().await = target;
            Ok(())
        }

        async fn move_rel(&self, distance: f64) -> Result<()> {
            *self.position.write().await += distance;
            Ok(())
        }

        async fn position(&self) -> Result<f64> {
            Ok(*self.position.read().await)
        }

        async fn wait_settled(&self) -> Result<()> {
            *self.settles.write().await += 1;
            Ok(())
        }
    }

    #[test]
    fn test_zero_bounces_rejected() {
        assert!(DelayStage::new(RecordingStage::new(), 0).is_err());
    }

    #[tokio::test]
    async fn test_delay_maps_to_stage_travel() {
        let stage = RecordingStage::new();
        let position = stage.position.clone();
        let delay_line = DelayStage::new(stage, 4).unwrap();

        delay_line.set_delay(1.0e-12).await.unwrap();

        // 1 ps of delay over 4 bounces: x = t*c/8 = 0.03747... mm
        let mm = *position.read().await;
        assert!((mm - 0.037_474_057_25).abs() < 1e-9, "stage at {mm} mm");
    }

    #[tokio::test]
    async fn test_round_trip_and_relative_moves() {
        let stage = RecordingStage::new();
        let settles = stage.settles.clone();
        let delay_line = DelayStage::new(stage, 4).unwrap();

        delay_line.set_delay(2.5e-12).await.unwrap();
        let read_back = delay_line.delay().await.unwrap();
        assert!((read_back - 2.5e-12).abs() < 1e-24);

        delay_line.adjust_delay(-1.0e-12).await.unwrap();
        let read_back = delay_line.delay().await.unwrap();
        assert!((read_back - 1.5e-12).abs() < 1e-24);

        // Both moves waited for the stage to settle.
        assert_eq!(*settles.read().await, 2);
    }
}
