//! Seed management for the simulation stages.
//!
//! Each stage gets its own seed, derived from a master seed by default, so
//! varying one stage (say, rainfall dithering) never perturbs another
//! (flow-routing tie breaks).

use crate::rand::hash64;

/// Seeds for every stage that consumes randomness.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageSeeds {
    /// Master seed (kept for display/reference).
    pub master: u64,
    /// Flat tie-break jitter in flow routing.
    pub routing: u64,
    /// Rainfall dithering in hydraulic erosion.
    pub rainfall: u64,
    /// Demo terrain synthesis.
    pub terrain: u64,
}

impl StageSeeds {
    /// Derive all stage seeds deterministically from a master seed.
    pub fn from_master(master: u64) -> Self {
        Self {
            master,
            routing: derive_seed(master, "routing"),
            rainfall: derive_seed(master, "rainfall"),
            terrain: derive_seed(master, "terrain"),
        }
    }

    /// Override the routing seed, keeping the rest derived.
    pub fn with_routing(mut self, seed: u64) -> Self {
        self.routing = seed;
        self
    }

    /// Override the rainfall seed, keeping the rest derived.
    pub fn with_rainfall(mut self, seed: u64) -> Self {
        self.rainfall = seed;
        self
    }
}

impl Default for StageSeeds {
    fn default() -> Self {
        Self::from_master(rand::random())
    }
}

/// Derive a sub-seed from a master seed and a stage tag. Mixing the tag
/// bytes through SplitMix64 keeps stages decorrelated but reproducible.
fn derive_seed(master: u64, stage: &str) -> u64 {
    let mut acc = hash64(master);
    for &b in stage.as_bytes() {
        acc = hash64(acc ^ b as u64);
    }
    acc
}
