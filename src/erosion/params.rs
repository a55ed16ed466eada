//! Tunable parameters for the erosion passes.

use serde::{Deserialize, Serialize};

/// Virtual-pipes hydraulic erosion parameters.
///
/// Rates are per iteration and assume heights in roughly unit scale; scale
/// `rainfall` and `sediment_capacity_k` together if your terrain uses a
/// larger range.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydraulicParams {
    pub iterations: u32,
    /// Water added per cell per iteration (before jitter).
    pub rainfall: f32,
    /// Pipe flow constant; keep at or below 0.25 so a cell cannot push
    /// more than its own column to its 4 neighbors in one step.
    pub pipe_k: f32,
    /// Fraction of water removed per iteration.
    pub evaporation: f32,
    /// Slope floor for the capacity term, keeps flats from locking up.
    pub min_slope: f32,
    pub sediment_capacity_k: f32,
    /// Rate at which excess sediment settles out.
    pub deposit_rate: f32,
    /// Rate at which spare capacity dissolves terrain.
    pub dissolve_rate: f32,
    /// Per-iteration sediment damping, avoids runaway transport.
    pub friction: f32,
    /// Rainfall jitter seed; 0 selects a fixed default stream.
    pub seed: u64,
}

impl Default for HydraulicParams {
    fn default() -> Self {
        Self {
            iterations: 64,
            rainfall: 0.01,
            pipe_k: 0.25,
            evaporation: 0.05,
            min_slope: 0.01,
            sediment_capacity_k: 2.0,
            deposit_rate: 0.05,
            dissolve_rate: 0.05,
            friction: 0.01,
            seed: 0,
        }
    }
}

/// Thermal (talus) erosion parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalParams {
    pub iterations: u32,
    /// Critical height difference to a cardinal neighbor; slopes steeper
    /// than this shed material.
    pub talus: f32,
    /// Fraction of the excess moved per iteration. Keep below 0.5 so
    /// opposing flows cannot overshoot.
    pub carry: f32,
}

impl Default for ThermalParams {
    fn default() -> Self {
        Self {
            iterations: 50,
            talus: 0.02,
            carry: 0.25,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_stable_rates() {
        let h = HydraulicParams::default();
        assert!(h.pipe_k <= 0.25);
        assert!((0.0..1.0).contains(&h.evaporation));
        assert!((0.0..1.0).contains(&h.friction));

        let t = ThermalParams::default();
        assert!(t.carry < 0.5);
        assert!(t.talus > 0.0);
    }
}
