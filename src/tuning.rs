//! Data-driven simulation tuning
//!
//! Loaded from JSON by the host; every value is validated before the core
//! sees it, so a bad config file surfaces as one configuration error at
//! startup instead of a misbehaving loop.

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_PANIC_THRESHOLD_MS, DEFAULT_TICK_HZ};
use crate::sim::{Scheduler, SimError};

/// Scheduler tuning
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopTuning {
    /// Logic tick rate (Hz, > 0)
    pub tick_hz: f64,
    /// Stall clamp (ms, > 0); conventionally several times the fixed step
    pub panic_threshold_ms: f64,
}

impl Default for LoopTuning {
    fn default() -> Self {
        LoopTuning {
            tick_hz: DEFAULT_TICK_HZ,
            panic_threshold_ms: DEFAULT_PANIC_THRESHOLD_MS,
        }
    }
}

impl LoopTuning {
    /// Build a scheduler from this tuning, validating both fields.
    pub fn build(&self) -> Result<Scheduler, SimError> {
        Scheduler::new(self.tick_hz, self.panic_threshold_ms)
    }
}

/// Object pool sizing
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolTuning {
    /// Free-list entries created up front
    pub initial_size: usize,
    /// Soft cap on retained free-list entries
    pub max_size: usize,
}

impl Default for PoolTuning {
    fn default() -> Self {
        PoolTuning {
            initial_size: 16,
            max_size: 64,
        }
    }
}

/// Top-level tuning surface
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub scheduler: LoopTuning,
    pub projectile_pool: PoolTuning,
    pub particle_pool: PoolTuning,
}

impl Tuning {
    /// Parse and validate a JSON tuning document. Parse failures and
    /// out-of-range values both surface as configuration errors.
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let tuning: Tuning = serde_json::from_str(json)
            .map_err(|e| SimError::Config(format!("bad tuning JSON: {e}")))?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        // Scheduler::new carries the range checks; pool sizes are usize, so
        // the negative-size failure mode is unrepresentable here.
        self.scheduler.build().map(|_| ())
    }
}
