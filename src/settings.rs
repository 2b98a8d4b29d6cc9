//! Match and pilot settings
//!
//! Loaded from a JSON file; any field left out keeps its default.

use std::num::NonZeroUsize;
use std::path::Path;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::planner::ActionSpace;
pub use crate::sim::WorldConfig;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Longest cycle budget or lookahead honored (one hour)
const MAX_PLAN_MS: u64 = 60 * 60 * 1000;

/// Decision cycle tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotSettings {
    /// Wall-clock budget of one decision cycle
    pub budget_ms: u64,
    /// Speed multiplier used inside rollouts
    pub sim_speed: u32,
    /// Angular spacing of candidate impulses (degrees)
    pub angle_step: u32,
    /// Impulse strength tiers
    pub magnitudes: Vec<f32>,
    /// Rollout workers; available parallelism when unset
    pub workers: Option<usize>,
    /// Fixed catalog shuffle seed; fresh each cycle when unset
    pub seed: Option<u64>,
    /// How far ahead of the snapshot to plan from; the budget when unset
    pub lookahead_ms: Option<u64>,
}

impl Default for PilotSettings {
    fn default() -> Self {
        Self {
            budget_ms: 250,
            sim_speed: 10,
            angle_step: 4,
            magnitudes: vec![10.0, 50.0, 100.0, 200.0, 300.0],
            workers: None,
            seed: None,
            lookahead_ms: None,
        }
    }
}

impl PilotSettings {
    /// Cycle budget, clamped to an hour
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms.min(MAX_PLAN_MS))
    }

    /// Lookahead, clamped like the budget
    pub fn lookahead(&self) -> Duration {
        Duration::from_millis(self.lookahead_ms.unwrap_or(self.budget_ms).min(MAX_PLAN_MS))
    }

    /// Worker count, never zero
    pub fn workers(&self) -> usize {
        self.workers.filter(|&w| w > 0).unwrap_or_else(|| {
            thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        })
    }

    pub fn action_space(&self) -> ActionSpace {
        ActionSpace::new(self.magnitudes.clone(), self.angle_step)
    }
}

/// Everything a local match needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub world: WorldConfig,
    pub pilot: PilotSettings,
    /// Pilots spawned into the arena
    pub players: u32,
    /// Starting mass of each player cloud
    pub player_mass: f32,
    /// World generation seed; random when unset
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            pilot: PilotSettings::default(),
            players: 2,
            player_mass: 400.0,
            seed: None,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
