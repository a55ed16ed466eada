//! Erosion passes over a heightfield.
//!
//! Two complementary techniques:
//! - **Hydraulic erosion**: virtual-pipes water flow with sediment
//!   dissolve/deposit, CPU only
//! - **Thermal erosion**: talus-angle material slumping, with matching CPU
//!   and GPU (wgpu compute) implementations behind [`ErosionEngine`]

pub mod gpu;
pub mod hydraulic;
pub mod params;
pub mod thermal;

pub use gpu::GpuThermalErosion;
pub use hydraulic::hydraulic_erode;
pub use params::{HydraulicParams, ThermalParams};
pub use thermal::{thermal_erode_cpu, CpuThermalErosion};

use crate::tilemap::Tilemap;

/// A thermal erosion backend. Returns false when the pass could not run
/// (GPU setup failure); the heightfield is untouched in that case.
pub trait ErosionEngine {
    fn thermal_erode(&mut self, height: &mut Tilemap<f32>, params: &ThermalParams) -> bool;
}

/// Aggregate material movement of an erosion pass.
#[derive(Clone, Debug, Default)]
pub struct ErosionStats {
    pub total_eroded: f64,
    pub total_deposited: f64,
    pub max_erosion: f32,
    pub max_deposition: f32,
    pub iterations: u32,
}

impl ErosionStats {
    /// Compare heights before and after a pass.
    pub fn from_diff(before: &[f32], after: &[f32], iterations: u32) -> Self {
        let mut stats = Self {
            iterations,
            ..Default::default()
        };
        for (&old, &new) in before.iter().zip(after) {
            let diff = new - old;
            if diff < 0.0 {
                stats.total_eroded += f64::from(-diff);
                stats.max_erosion = stats.max_erosion.max(-diff);
            } else if diff > 0.0 {
                stats.total_deposited += f64::from(diff);
                stats.max_deposition = stats.max_deposition.max(diff);
            }
        }
        stats
    }

    pub fn print_summary(&self, label: &str) {
        println!("{label}: {} iterations", self.iterations);
        println!(
            "  eroded {:.3} (max {:.4}), deposited {:.3} (max {:.4})",
            self.total_eroded, self.max_erosion, self.total_deposited, self.max_deposition
        );
    }
}

/// Run thermal erosion on the GPU when available, falling back to the CPU
/// implementation otherwise.
pub fn thermal_erode_gpu_or_cpu(height: &mut Tilemap<f32>, params: &ThermalParams) -> bool {
    if let Some(mut gpu) = GpuThermalErosion::new() {
        println!("Using GPU thermal erosion");
        if gpu.thermal_erode(height, params) {
            return true;
        }
        println!("GPU thermal pass failed, falling back to CPU");
    }
    CpuThermalErosion.thermal_erode(height, params)
}
