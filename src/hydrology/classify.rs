//! Percentile-based water classification: rivers from accumulation,
//! lakes promoted from high-accumulation sinks.

use std::collections::VecDeque;

use crate::tilemap::Tilemap;

use super::{HydrologyResult, HydrologySettings, WaterKind, FLOW_SEA, FLOW_SINK};

/// Percentile by partial selection on a copy of the values. `p01` is
/// clamped to [0, 1]; an empty slice yields 0.
pub fn percentile(values: &[f32], p01: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut v = values.to_vec();
    let p = p01.clamp(0.0, 1.0);
    let k = (p * (v.len() - 1) as f32).floor() as usize;
    let (_, kth, _) = v.select_nth_unstable_by(k, |a, b| a.total_cmp(b));
    *kth
}

/// Mark the top `river_cell_fraction` of land cells (by accumulation) as
/// rivers. Sea cells and below-sea terrain never qualify.
pub fn classify_rivers(height: &Tilemap<f32>, out: &mut HydrologyResult, s: &HydrologySettings) {
    let n = out.flow_dir.len();

    let land_acc: Vec<f32> = (0..n)
        .filter(|&i| out.flow_dir[i] != FLOW_SEA)
        .map(|i| out.accumulation[i])
        .collect();

    let frac = s.river_cell_fraction.clamp(0.0, 1.0);
    let river_thresh = if !land_acc.is_empty() && frac > 0.0 {
        // Threshold at percentile (1 - frac): keep the top frac.
        percentile(&land_acc, 1.0 - frac)
    } else {
        f32::INFINITY
    };

    for i in 0..n {
        if out.flow_dir[i] == FLOW_SEA {
            continue;
        }
        if height.data[i] <= out.sea_level {
            continue;
        }
        if out.accumulation[i] >= river_thresh {
            out.water[i] = WaterKind::River;
        }
    }
}

/// Promote the highest-accumulation sinks to lakes, expanding a small disk
/// of land cells around each chosen sink.
pub fn promote_lakes(height: &Tilemap<f32>, out: &mut HydrologyResult, s: &HydrologySettings) {
    let w = out.width;
    let h = out.height;
    let n = out.flow_dir.len();

    let mut sink_idx: Vec<usize> = Vec::new();
    let mut sink_acc: Vec<f32> = Vec::new();
    for i in 0..n {
        if out.flow_dir[i] != FLOW_SINK {
            continue;
        }
        if height.data[i] <= out.sea_level {
            continue;
        }
        sink_idx.push(i);
        sink_acc.push(out.accumulation[i]);
    }

    let lake_frac = s.lake_sink_fraction.clamp(0.0, 1.0);
    let lake_thresh = if !sink_acc.is_empty() && lake_frac > 0.0 {
        percentile(&sink_acc, 1.0 - lake_frac)
    } else {
        f32::INFINITY
    };

    let r = s.lake_expand_radius.max(0);
    for &i in &sink_idx {
        if out.accumulation[i] < lake_thresh {
            continue;
        }
        let cx = (i % w) as i32;
        let cy = (i / w) as i32;

        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy > r * r {
                    continue;
                }
                let nx = cx + dx;
                let ny = cy + dy;
                if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                    continue;
                }
                let j = ny as usize * w + nx as usize;
                if out.flow_dir[j] == FLOW_SEA {
                    continue; // never overwrite sea
                }
                if height.data[j] <= out.sea_level {
                    continue;
                }
                out.water[j] = WaterKind::Lake;
            }
        }
    }
}

/// Strahler stream order over the river network. Non-river cells stay 0,
/// headwater river cells are order 1, and the order rises only where two
/// tributaries of equal order meet. Kahn traversal over the D8 successor
/// graph restricted to river cells.
pub fn strahler_order(out: &HydrologyResult) -> Vec<u8> {
    let n = out.water.len();
    let mut order = vec![0u8; n];
    let mut indeg = vec![0u32; n];
    let mut max_ord = vec![0u8; n];
    let mut cnt_max = vec![0u32; n];

    let is_stream = |i: usize| out.water[i] == WaterKind::River;

    for i in 0..n {
        if !is_stream(i) {
            continue;
        }
        if let Some(v) = out.downstream(i) {
            if is_stream(v) {
                indeg[v] += 1;
            }
        }
    }

    let mut q: VecDeque<usize> = VecDeque::new();
    for i in 0..n {
        if is_stream(i) && indeg[i] == 0 {
            order[i] = 1;
            q.push_back(i);
        }
    }

    while let Some(u) = q.pop_front() {
        let Some(v) = out.downstream(u) else {
            continue;
        };
        if !is_stream(v) {
            continue;
        }
        if order[u] > max_ord[v] {
            max_ord[v] = order[u];
            cnt_max[v] = 1;
        } else if order[u] == max_ord[v] {
            cnt_max[v] += 1;
        }
        indeg[v] -= 1;
        if indeg[v] == 0 {
            order[v] = if cnt_max[v] >= 2 {
                max_ord[v].saturating_add(1)
            } else {
                max_ord[v]
            };
            q.push_back(v);
        }
    }

    order
}

/// Map river accumulation to width classes 1..=max_width. Width follows
/// (acc / max_acc)^width_exponent, rounded to the nearest class, then
/// widened by one class per Strahler order above the headwaters so
/// higher-order channels read wider.
pub fn assign_river_widths(out: &mut HydrologyResult, s: &HydrologySettings) {
    let n = out.water.len();

    let mut max_river_acc = 0.0f32;
    for i in 0..n {
        if out.water[i] == WaterKind::River {
            max_river_acc = max_river_acc.max(out.accumulation[i]);
        }
    }
    if max_river_acc <= 0.0 {
        return;
    }

    let max_w = s.max_width.max(1) as i32;
    let exp = s.width_exponent.max(0.01);

    for i in 0..n {
        if out.water[i] != WaterKind::River {
            continue;
        }
        let t = (out.accumulation[i] / max_river_acc).clamp(0.0, 1.0);
        let w01 = t.powf(exp);
        let base = 1 + (w01 * (max_w - 1) as f32 + 0.5).floor() as i32;
        let order_bump = (out.stream_order[i].max(1) - 1) as i32;
        out.river_width[i] = (base + order_bump).clamp(1, max_w) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrology::{generate_hydrology, HydrologySettings};

    #[test]
    fn test_percentile_bounds() {
        let v = [5.0, 1.0, 3.0, 2.0, 4.0];
        assert_eq!(percentile(&v, 0.0), 1.0);
        assert_eq!(percentile(&v, 1.0), 5.0);
        assert_eq!(percentile(&v, 0.5), 3.0);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_percentile_clamps_input() {
        let v = [1.0, 2.0, 3.0];
        assert_eq!(percentile(&v, -1.0), 1.0);
        assert_eq!(percentile(&v, 2.0), 3.0);
    }

    fn valley(w: usize, h: usize) -> Tilemap<f32> {
        // V-shaped valley running south, draining to a low south edge.
        let mut map = Tilemap::new(w, h);
        let cx = w as f32 / 2.0;
        for y in 0..h {
            for x in 0..w {
                let side = (x as f32 - cx).abs() * 4.0;
                let along = (h - y) as f32;
                map.set(x, y, 1.0 + side + along);
            }
        }
        map
    }

    #[test]
    fn test_river_fraction_respected() {
        let map = valley(64, 64);
        let s = HydrologySettings {
            sea_level_percentile: 0.05,
            river_cell_fraction: 0.02,
            lake_sink_fraction: 0.0,
            ..Default::default()
        };
        let out = generate_hydrology(&map, &s);

        let land = out.flow_dir.iter().filter(|&&d| d != FLOW_SEA).count();
        let rivers = out.water.iter().filter(|&&k| k == WaterKind::River).count();
        // Percentile thresholds admit ties, so allow generous slack around
        // the requested 2%.
        let expected = land as f32 * 0.02;
        assert!(
            rivers as f32 <= expected * 3.0 + 8.0,
            "too many rivers: {rivers} of {land} land cells"
        );
        assert!(rivers > 0, "no rivers classified at all");
    }

    #[test]
    fn test_river_widths_in_range() {
        let map = valley(64, 64);
        let s = HydrologySettings::default();
        let out = generate_hydrology(&map, &s);
        for i in 0..out.water.len() {
            match out.water[i] {
                WaterKind::River => {
                    assert!((1..=s.max_width).contains(&out.river_width[i]));
                }
                _ => assert_eq!(out.river_width[i], 0),
            }
        }
    }

    #[test]
    fn test_widest_river_at_max_accumulation() {
        let map = valley(64, 64);
        let s = HydrologySettings::default();
        let out = generate_hydrology(&map, &s);
        let mut best_i = None;
        let mut best_acc = 0.0f32;
        for i in 0..out.water.len() {
            if out.water[i] == WaterKind::River && out.accumulation[i] > best_acc {
                best_acc = out.accumulation[i];
                best_i = Some(i);
            }
        }
        let i = best_i.expect("valley should have rivers");
        assert_eq!(out.river_width[i], s.max_width);
    }

    fn synthetic(w: usize, h: usize, flow_dir: Vec<i8>, rivers: &[usize]) -> HydrologyResult {
        let n = w * h;
        let mut water = vec![WaterKind::None; n];
        for &i in rivers {
            water[i] = WaterKind::River;
        }
        HydrologyResult {
            width: w,
            height: h,
            sea_level: 0.0,
            flow_dir,
            accumulation: vec![1.0; n],
            water,
            river_width: vec![0; n],
            stream_order: vec![0; n],
        }
    }

    #[test]
    fn test_strahler_equal_order_junction() {
        // Two order-1 branches meeting at (1,1), draining east to (2,1).
        let mut flow = vec![FLOW_SINK; 9];
        flow[0] = 7; // (0,0) southeast into the junction
        flow[6] = 1; // (0,2) northeast into the junction
        flow[4] = 0; // junction east to the outlet
        let out = synthetic(3, 3, flow, &[0, 6, 4, 5]);
        let order = strahler_order(&out);
        assert_eq!(order[0], 1);
        assert_eq!(order[6], 1);
        assert_eq!(order[4], 2, "equal-order junction must bump the order");
        assert_eq!(order[5], 2, "order persists downstream of the junction");
        assert_eq!(order[1], 0, "dry cells stay order 0");
    }

    #[test]
    fn test_strahler_chain_stays_order_one() {
        // A single channel without tributaries never rises above order 1.
        let mut flow = vec![0i8; 5];
        flow[4] = FLOW_SINK;
        let out = synthetic(5, 1, flow, &[0, 1, 2, 3, 4]);
        let order = strahler_order(&out);
        assert!(order.iter().all(|&o| o == 1));
    }

    #[test]
    fn test_stream_order_matches_river_mask() {
        let map = valley(64, 64);
        let out = generate_hydrology(&map, &HydrologySettings::default());
        for i in 0..out.water.len() {
            match out.water[i] {
                WaterKind::River => assert!(out.stream_order[i] >= 1),
                _ => assert_eq!(out.stream_order[i], 0),
            }
            // Order never drops moving downstream along the network.
            if out.water[i] == WaterKind::River {
                if let Some(v) = out.downstream(i) {
                    if out.water[v] == WaterKind::River {
                        assert!(out.stream_order[v] >= out.stream_order[i]);
                    }
                }
            }
        }
    }

    #[test]
    fn test_lakes_never_overwrite_sea() {
        let mut map = valley(48, 48);
        // Punch an interior basin so a sink with real accumulation exists.
        for y in 18..24 {
            for x in 20..26 {
                map.set(x, y, 0.9);
            }
        }
        let s = HydrologySettings {
            lake_sink_fraction: 1.0,
            lake_expand_radius: 4,
            ..Default::default()
        };
        let out = generate_hydrology(&map, &s);
        for i in 0..out.water.len() {
            if out.flow_dir[i] == FLOW_SEA {
                assert_eq!(out.water[i], WaterKind::Sea);
            }
        }
    }
}
