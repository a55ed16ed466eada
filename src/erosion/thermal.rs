//! Thermal (talus) erosion on the CPU.
//!
//! Material slumps from a cell to each cardinal neighbor whose drop
//! exceeds the talus threshold. All moves for an iteration are gathered in
//! a delta buffer and applied at once, so the scan order never matters and
//! total material is conserved.

use crate::tilemap::Tilemap;

use super::{ErosionEngine, ThermalParams};

/// Run `params.iterations` talus-slump passes in-place.
pub fn thermal_erode_cpu(height: &mut Tilemap<f32>, params: &ThermalParams) {
    let w = height.width;
    let h = height.height;
    let n = w * h;
    if n == 0 {
        return;
    }

    let mut delta = vec![0.0f32; n];

    for _ in 0..params.iterations {
        delta.fill(0.0);

        for y in 0..h {
            for x in 0..w {
                let i = y * w + x;
                let hc = height.data[i];

                // Off-grid neighbors mirror the center: no flow off the map.
                let neighbors: [(i32, i32, f32); 4] = [
                    (-1, 0, if x > 0 { height.data[i - 1] } else { hc }),
                    (1, 0, if x + 1 < w { height.data[i + 1] } else { hc }),
                    (0, -1, if y > 0 { height.data[i - w] } else { hc }),
                    (0, 1, if y + 1 < h { height.data[i + w] } else { hc }),
                ];

                let mut excess = [0.0f32; 4];
                let mut total = 0.0f32;
                for (k, &(_, _, nh)) in neighbors.iter().enumerate() {
                    let diff = (hc - nh) - params.talus;
                    if diff > 0.0 {
                        excess[k] = diff;
                        total += diff;
                    }
                }
                if total <= 0.0 {
                    continue;
                }

                for (k, &(dx, dy, _)) in neighbors.iter().enumerate() {
                    if excess[k] <= 0.0 {
                        continue;
                    }
                    let moved = params.carry * excess[k];
                    delta[i] -= moved;
                    let nx = (x as i32 + dx).clamp(0, w as i32 - 1) as usize;
                    let ny = (y as i32 + dy).clamp(0, h as i32 - 1) as usize;
                    delta[ny * w + nx] += moved;
                }
            }
        }

        for (cell, d) in height.data.iter_mut().zip(&delta) {
            *cell += d;
        }
    }
}

/// CPU backend for the [`ErosionEngine`] trait.
pub struct CpuThermalErosion;

impl ErosionEngine for CpuThermalErosion {
    fn thermal_erode(&mut self, height: &mut Tilemap<f32>, params: &ThermalParams) -> bool {
        thermal_erode_cpu(height, params);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spike(w: usize, h: usize) -> Tilemap<f32> {
        let mut map = Tilemap::new_with(w, h, 0.0f32);
        map.set(w / 2, h / 2, 10.0);
        map
    }

    #[test]
    fn test_material_is_conserved() {
        let mut map = spike(9, 9);
        let before: f32 = map.as_slice().iter().sum();
        thermal_erode_cpu(
            &mut map,
            &ThermalParams {
                iterations: 100,
                talus: 0.1,
                carry: 0.25,
            },
        );
        let after: f32 = map.as_slice().iter().sum();
        assert!((before - after).abs() < 1e-3, "material lost: {before} -> {after}");
    }

    #[test]
    fn test_spike_flattens_toward_talus() {
        let mut map = spike(9, 9);
        thermal_erode_cpu(
            &mut map,
            &ThermalParams {
                iterations: 500,
                talus: 0.1,
                carry: 0.25,
            },
        );
        // After convergence no cardinal slope should exceed the talus
        // threshold by more than a hair.
        for y in 0..9usize {
            for x in 0..9usize {
                let hc = *map.get(x, y);
                if x + 1 < 9 {
                    assert!((hc - *map.get(x + 1, y)).abs() <= 0.1 + 1e-3);
                }
                if y + 1 < 9 {
                    assert!((hc - *map.get(x, y + 1)).abs() <= 0.1 + 1e-3);
                }
            }
        }
    }

    #[test]
    fn test_below_talus_slope_untouched() {
        // Gentle ramp with every step below the threshold: nothing moves.
        let mut map = Tilemap::new(8, 8);
        for y in 0..8 {
            for x in 0..8 {
                map.set(x, y, x as f32 * 0.05);
            }
        }
        let before = map.as_slice().to_vec();
        thermal_erode_cpu(
            &mut map,
            &ThermalParams {
                iterations: 10,
                talus: 0.1,
                carry: 0.25,
            },
        );
        assert_eq!(map.as_slice(), &before[..]);
    }

    #[test]
    fn test_engine_trait_reports_success() {
        let mut map = spike(5, 5);
        let ok = CpuThermalErosion.thermal_erode(&mut map, &ThermalParams::default());
        assert!(ok);
    }
}
