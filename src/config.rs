//! Layered application settings.
//!
//! Settings are assembled with `figment`: built-in defaults, then an optional
//! TOML file, then `TCBOC_`-prefixed environment variables (nested fields are
//! separated with `__`, e.g. `TCBOC_MONITOR__THRESHOLD=40000`). Parsing and
//! merging errors surface as [`OverlapError::Config`]; values that parse but
//! are logically invalid are caught by [`Settings::validate`].
//!
//! ```toml
//! [search]
//! low = -5.0e-12
//! high = 5.0e-12
//!
//! [monitor]
//! threshold = 35000.0
//! coarse_step = 1.0e-12
//! navg = 20
//! max_attempts = 3
//!
//! [scan]
//! half_window = 1.0e-12
//! fine_step = 0.01e-12
//! navg = 20
//! nbaseline = 10
//!
//! [acquisition]
//! refresh = "100ms"
//!
//! [stage]
//! n_bounces = 4
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{AlignResult, OverlapError};

/// Inclusive delay search range, in seconds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchSettings {
    pub low: f64,
    pub high: f64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            low: -5.0e-12,
            high: 5.0e-12,
        }
    }
}

/// Monitor-channel optimization parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Peak value, in ADC counts, an averaged monitor waveform must exceed.
    pub threshold: f64,
    /// Coarse delay step for the optimization sweeps, in seconds.
    pub coarse_step: f64,
    /// Waveforms averaged before each threshold test.
    pub navg: usize,
    /// Attempt budget for the optimize-then-retest loop.
    pub max_attempts: u32,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            threshold: 35000.0,
            coarse_step: 1.0e-12,
            navg: 20,
            max_attempts: 3,
        }
    }
}

/// Error-curve scan parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Half-width of the scan window around the current delay, in seconds.
    pub half_window: f64,
    /// Fine delay step between error measurements, in seconds.
    pub fine_step: f64,
    /// Waveforms averaged per error measurement.
    pub navg: usize,
    /// Leading samples used for the baseline estimate.
    pub nbaseline: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            half_window: 1.0e-12,
            fine_step: 0.01e-12,
            navg: 20,
            nbaseline: 10,
        }
    }
}

/// Waveform acquisition timing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AcquisitionSettings {
    /// Idle period between averaged readings, matching the digitizer's
    /// natural refresh rate (10 Hz nominal).
    #[serde(with = "humantime_serde")]
    pub refresh: Duration,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            refresh: Duration::from_millis(100),
        }
    }
}

/// Delay-stage geometry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StageSettings {
    /// Bounce count of the optical delay line; each bounce doubles the path
    /// length change per unit of stage travel.
    pub n_bounces: u32,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self { n_bounces: 4 }
    }
}

/// Output locations for measurement artifacts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory for persisted error curves.
    pub default_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            default_path: PathBuf::from("data"),
        }
    }
}

/// Top-level application settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub search: SearchSettings,
    pub monitor: MonitorSettings,
    pub scan: ScanSettings,
    pub acquisition: AcquisitionSettings,
    pub stage: StageSettings,
    pub storage: StorageSettings,
}

impl Settings {
    /// Load settings from defaults, an optional TOML file, and the
    /// environment, then validate them.
    pub fn new(path: Option<&Path>) -> AlignResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        let settings: Settings = figment
            .merge(Env::prefixed("TCBOC_").split("__"))
            .extract()
            .map_err(|err| OverlapError::Config(err.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Semantic validation of values that parse but make no physical sense.
    pub fn validate(&self) -> AlignResult<()> {
        if !(self.search.low < self.search.high) {
            return Err(OverlapError::Config(format!(
                "search range is inverted: low {:e} >= high {:e}",
                self.search.low, self.search.high
            )));
        }
        if !(self.monitor.coarse_step > 0.0) {
            return Err(OverlapError::Config(format!(
                "monitor.coarse_step must be positive, got {:e}",
                self.monitor.coarse_step
            )));
        }
        if !(self.scan.fine_step > 0.0) {
            return Err(OverlapError::Config(format!(
                "scan.fine_step must be positive, got {:e}",
                self.scan.fine_step
            )));
        }
        if !(self.scan.half_window > 0.0) {
            return Err(OverlapError::Config(format!(
                "scan.half_window must be positive, got {:e}",
                self.scan.half_window
            )));
        }
        if !self.monitor.threshold.is_finite() {
            return Err(OverlapError::Config(format!(
                "monitor.threshold must be finite, got {}",
                self.monitor.threshold
            )));
        }
        if self.monitor.navg == 0 || self.scan.navg == 0 {
            return Err(OverlapError::Config(
                "navg must be at least 1".to_string(),
            ));
        }
        if self.monitor.max_attempts == 0 {
            return Err(OverlapError::Config(
                "monitor.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.stage.n_bounces == 0 {
            return Err(OverlapError::Config(
                "stage.n_bounces must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
