//! D8 flow routing and topological flow accumulation.

use std::collections::VecDeque;

use crate::rand::{hash32, u01};
use crate::tilemap::Tilemap;

use super::{neighbor_index, DIST8, DX8, DY8, FLOW_SEA, FLOW_SINK};

/// Compute D8 downslope directions with deterministic tie-break jitter.
///
/// Every cell at or below `sea_level` becomes [`FLOW_SEA`]. Land cells pick
/// the neighbor with the lowest jittered height, but only if it strictly
/// decreases; otherwise the cell is a [`FLOW_SINK`]. Sea neighbors get a
/// small extra bias so drainage finds the ocean even on near-flat coasts.
pub fn route(height: &Tilemap<f32>, sea_level: f32, jitter_amp: f32, seed: u32) -> Vec<i8> {
    let w = height.width;
    let h = height.height;
    let n = w * h;
    let mut flow_dir = vec![FLOW_SINK; n];

    // Jittered effective height, stable across calls for a given seed.
    let eff = |i: usize| -> f32 {
        let base = height.data[i];
        if jitter_amp <= 0.0 {
            return base;
        }
        let r = u01(hash32(seed ^ i as u32)) * 2.0 - 1.0; // [-1, 1)
        base + r * jitter_amp
    };

    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let raw = height.data[i];

            if raw <= sea_level {
                flow_dir[i] = FLOW_SEA;
                continue;
            }

            let cur = eff(i);
            let mut best_dir: i8 = -1;
            let mut best = cur;

            for d in 0..8 {
                let Some(ni) = neighbor_index(w, h, x, y, d) else {
                    continue;
                };
                let nh_raw = height.data[ni];

                if nh_raw <= sea_level {
                    // Land may flow straight into sea when that is the
                    // lowest option; bias it slightly downward.
                    let nh_eff = eff(ni) - jitter_amp * 0.25;
                    if nh_eff < best {
                        best = nh_eff;
                        best_dir = d as i8;
                    }
                    continue;
                }

                let nh = eff(ni);
                if nh < best {
                    best = nh;
                    best_dir = d as i8;
                }
            }

            // Only accept a direction that strictly decreases effective
            // height, everything else stays a sink.
            flow_dir[i] = if best_dir >= 0 && best < cur {
                best_dir
            } else {
                FLOW_SINK
            };
        }
    }

    flow_dir
}

#[inline]
fn dst_index(flow_dir: &[i8], w: usize, h: usize, i: usize) -> Option<usize> {
    let dir = flow_dir[i];
    if dir < 0 {
        return None;
    }
    neighbor_index(w, h, i % w, i / w, dir as usize)
}

/// Kahn-style topological flow accumulation over precomputed directions.
///
/// Each land cell contributes one unit of rainfall; sea cells contribute
/// none but still collect inflow. The FIFO processing order makes the pass
/// O(n) and bit-reproducible.
pub fn accumulate(flow_dir: &[i8], w: usize, h: usize) -> Vec<f32> {
    let n = w * h;
    let mut acc = vec![0.0f32; n];
    if n == 0 {
        return acc;
    }

    let mut indeg = vec![0u32; n];
    for i in 0..n {
        if let Some(d) = dst_index(flow_dir, w, h, i) {
            indeg[d] += 1;
        }
    }

    for i in 0..n {
        acc[i] = if flow_dir[i] == FLOW_SEA { 0.0 } else { 1.0 };
    }

    let mut q: VecDeque<usize> = (0..n).filter(|&i| indeg[i] == 0).collect();

    while let Some(i) = q.pop_front() {
        if let Some(d) = dst_index(flow_dir, w, h, i) {
            acc[d] += acc[i];
            indeg[d] -= 1;
            if indeg[d] == 0 {
                q.push_back(d);
            }
        }
    }

    acc
}

/// Multiple-flow-direction accumulation (Freeman/Quinn family).
///
/// Processes cells in descending height order (stable sort, so ties keep
/// index order) and splits each cell's load across all downslope neighbors
/// with weights proportional to slope^p. Expects depression-free heights.
pub fn accumulate_mfd(height: &Tilemap<f32>, exponent: f32) -> Vec<f32> {
    let w = height.width;
    let h = height.height;
    let n = w * h;
    let mut acc = vec![0.0f32; n];
    if n == 0 {
        return acc;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| height.data[b].total_cmp(&height.data[a]));

    let p = exponent.max(1.0);

    for &i in &order {
        acc[i] += 1.0;
        let zi = height.data[i];
        let x = i % w;
        let y = i / w;

        let mut weights = [0.0f32; 8];
        let mut targets = [0usize; 8];
        let mut m = 0usize;
        let mut weight_sum = 0.0f32;

        for k in 0..8 {
            let nx = x as i32 + DX8[k];
            let ny = y as i32 + DY8[k];
            if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                continue;
            }
            let j = ny as usize * w + nx as usize;
            let dz = zi - height.data[j];
            if dz <= 0.0 {
                continue;
            }
            let ww = (dz / DIST8[k]).powf(p);
            weights[m] = ww;
            targets[m] = j;
            weight_sum += ww;
            m += 1;
        }

        if m == 0 {
            continue; // local minimum or outlet
        }
        let inv = if weight_sum > 0.0 { 1.0 / weight_sum } else { 0.0 };
        let a = acc[i];
        for t in 0..m {
            acc[targets[t]] += a * (weights[t] * inv);
        }
    }

    acc
}
