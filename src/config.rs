//! JSON-loadable simulation configuration.
//!
//! Every field has a default, and loading is lenient: a missing or broken
//! file (or an unknown/missing field) falls back to defaults instead of
//! failing the run.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::erosion::{HydraulicParams, ThermalParams};
use crate::hydrology::HydrologySettings;

/// Demo terrain synthesis parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub seed: u64,
    pub width: usize,
    pub height: usize,
    /// Base elevation added to the noise field.
    pub base_height: f32,
    /// fBm frequency of the lowest octave.
    pub noise_frequency: f64,
    pub noise_octaves: usize,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 1337,
            width: 512,
            height: 512,
            base_height: 0.0,
            noise_frequency: 0.004,
            noise_octaves: 6,
        }
    }
}

/// Top-level configuration for a full simulation run.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub terrain: TerrainConfig,
    pub hydrology: HydrologySettings,
    pub hydraulic: HydraulicParams,
    pub thermal: ThermalParams,
}

impl SimulationConfig {
    /// Load from a JSON file; any failure falls back to defaults so a run
    /// never dies on configuration.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(_) => {
                println!(
                    "config: could not open {}, using defaults",
                    path.display()
                );
                return Self::default();
            }
        };
        match serde_json::from_str(&text) {
            Ok(cfg) => cfg,
            Err(err) => {
                println!(
                    "config: parse error in {} ({err}), using defaults",
                    path.display()
                );
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
