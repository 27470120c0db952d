//! Application context – holds the clock capability and engine settings.

use crate::functions::AngleMode;
use crate::particles::ParticleSettings;
use crate::platform::{ManualClock, SystemClock};
use crate::traits::Clock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Tunables for a calculator session. Front-ends usually load these from
/// their configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// How long "Error" stays on the display before resetting to "0".
    pub error_reset_ms: u64,
    /// Angle mode a fresh session starts in.
    pub angle_mode: AngleMode,
    pub particles: ParticleSettings,
    /// Fixed seed for particle generation; `None` seeds from entropy.
    pub rng_seed: Option<u64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            error_reset_ms: 1000,
            angle_mode: AngleMode::Radians,
            particles: ParticleSettings::default(),
            rng_seed: None,
        }
    }
}

/// Central context a [`crate::Calculator`] is built from.
///
/// Holds the clock as a trait object so callers (CLI / tests / scenarios)
/// can swap real time for manual time.
pub struct AppContext {
    clock: Arc<dyn Clock>,
    pub settings: EngineSettings,
}

impl AppContext {
    pub fn new(clock: Arc<dyn Clock>, settings: EngineSettings) -> Self {
        Self { clock, settings }
    }

    /// Context backed by the system clock.
    pub fn default_platform(settings: EngineSettings) -> Self {
        Self::new(Arc::new(SystemClock), settings)
    }

    /// Context backed by a manual clock; the returned handle advances it.
    pub fn with_manual_clock(settings: EngineSettings) -> (Self, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (Self::new(clock.clone(), settings), clock)
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn error_reset_delay(&self) -> Duration {
        Duration::from_millis(self.settings.error_reset_ms)
    }
}
