//! Virtual-pipes hydraulic erosion (CPU).
//!
//! Each iteration: rain falls with light deterministic jitter, water
//! pushes outflow flux through four pipes per cell, moves with evaporation,
//! then dissolves or deposits sediment against a slope-and-water capacity.

use crate::rand::Pcg32;
use crate::tilemap::Tilemap;

use super::{ErosionStats, HydraulicParams};

const DEFAULT_SEED: u64 = 0xC01D_5EED_F10D;
const RAIN_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

// Flux channel layout per cell: 0:+x (right), 1:-x (left), 2:-y (up), 3:+y (down).

/// Run the full hydraulic pass in-place and report material movement.
pub fn hydraulic_erode(height: &mut Tilemap<f32>, p: &HydraulicParams) -> ErosionStats {
    let w = height.width;
    let h = height.height;
    let n = w * h;
    if n == 0 || p.iterations == 0 {
        return ErosionStats::default();
    }

    let before = height.as_slice().to_vec();

    let mut water = vec![0.0f32; n];
    let mut sed = vec![0.0f32; n];
    let mut flux = vec![0.0f32; n * 4];
    let mut water_new = vec![0.0f32; n];

    let seed = if p.seed != 0 { p.seed } else { DEFAULT_SEED };
    let mut rng = Pcg32::new(seed, RAIN_STREAM);

    // Neighbor read with edge clamp, for the slope stencil only.
    let clamped = |z: &Tilemap<f32>, x: i32, y: i32| -> f32 {
        let cx = x.clamp(0, w as i32 - 1) as usize;
        let cy = y.clamp(0, h as i32 - 1) as usize;
        z.data[cy * w + cx]
    };

    for _ in 0..p.iterations {
        // 1) Rainfall with jitter factor in [0.875, 1.125) to break symmetry.
        for cell in water.iter_mut() {
            let jitter = rng.next_f32() * 0.25 + 0.875;
            *cell += p.rainfall * jitter;
        }

        // 2) Outflow fluxes through four pipes, limited to available water.
        for y in 0..h {
            for x in 0..w {
                let i = y * w + x;
                let total = height.data[i] + water[i];

                // Off-grid neighbors mirror our own column: no flow off the map.
                let hx1 = if x + 1 < w {
                    height.data[i + 1] + water[i + 1]
                } else {
                    total
                };
                let hx0 = if x > 0 {
                    height.data[i - 1] + water[i - 1]
                } else {
                    total
                };
                let hy1 = if y + 1 < h {
                    height.data[i + w] + water[i + w]
                } else {
                    total
                };
                let hy0 = if y > 0 {
                    height.data[i - w] + water[i - w]
                } else {
                    total
                };

                let mut f = [0.0f32; 4];
                let mut sum_pos = 0.0f32;
                for (slot, head) in [(0usize, hx1), (1, hx0), (2, hy0), (3, hy1)] {
                    let d = total - head;
                    if d > 0.0 {
                        f[slot] = p.pipe_k * d;
                        sum_pos += f[slot];
                    }
                }

                let scale = if sum_pos > water[i] {
                    water[i] / (sum_pos + 1e-8)
                } else {
                    1.0
                };
                flux[i * 4] = f[0] * scale;
                flux[i * 4 + 1] = f[1] * scale;
                flux[i * 4 + 2] = f[2] * scale;
                flux[i * 4 + 3] = f[3] * scale;
            }
        }

        // 3) Water update from inflow minus outflow, then evaporation.
        for y in 0..h {
            for x in 0..w {
                let i = y * w + x;
                let out_sum = flux[i * 4] + flux[i * 4 + 1] + flux[i * 4 + 2] + flux[i * 4 + 3];

                let mut in_sum = 0.0f32;
                if x > 0 {
                    in_sum += flux[(i - 1) * 4]; // left cell flowing right
                }
                if x + 1 < w {
                    in_sum += flux[(i + 1) * 4 + 1]; // right cell flowing left
                }
                if y > 0 {
                    in_sum += flux[(i - w) * 4 + 3]; // cell above flowing down
                }
                if y + 1 < h {
                    in_sum += flux[(i + w) * 4 + 2]; // cell below flowing up
                }

                let mut wtr = (water[i] + in_sum - out_sum).max(0.0);
                wtr *= 1.0 - p.evaporation;
                water_new[i] = wtr;
            }
        }
        std::mem::swap(&mut water, &mut water_new);

        // 4) Dissolve or deposit against capacity ~ slope * water.
        for y in 0..h {
            for x in 0..w {
                let i = y * w + x;
                let wtr = water[i];

                let hl = clamped(height, x as i32 - 1, y as i32);
                let hr = clamped(height, x as i32 + 1, y as i32);
                let hu = clamped(height, x as i32, y as i32 - 1);
                let hd = clamped(height, x as i32, y as i32 + 1);

                let dhdx = (hr - hl) * 0.5;
                let dhdy = (hd - hu) * 0.5;
                let slope = (dhdx * dhdx + dhdy * dhdy).sqrt();

                let capacity = slope.max(p.min_slope) * wtr * p.sediment_capacity_k;

                if sed[i] > capacity {
                    let amount = p.deposit_rate * (sed[i] - capacity);
                    sed[i] -= amount;
                    height.data[i] += amount;
                } else {
                    // Bound dissolution by the remaining column height.
                    let amount =
                        (p.dissolve_rate * (capacity - sed[i])).min(height.data[i]);
                    sed[i] += amount;
                    height.data[i] -= amount;
                }
            }
        }

        // 5) Friction-like sediment damping against runaway transport.
        for s in sed.iter_mut() {
            *s *= 1.0 - p.friction;
        }
    }

    ErosionStats::from_diff(&before, height.as_slice(), p.iterations)
}
