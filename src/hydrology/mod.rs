//! Hydrology solver: drainage, rivers, lakes, and moisture from a heightfield.
//!
//! The pipeline runs in fixed stages:
//! 1. Depression filling (priority-flood) so every cell can drain
//! 2. D8 flow direction with tiny deterministic jitter to break flats
//! 3. Flow accumulation (topological, no cycles)
//! 4. River classification from an accumulation percentile
//! 5. Lake promotion from high-accumulation sinks
//!
//! Height values can be any scale; sea level and thresholds are
//! percentile-based, never absolute.

pub mod carve;
pub mod classify;
pub mod fill;
pub mod flow;
pub mod moisture;

pub use carve::carve_channels;
pub use fill::{fill_depressions, BorderMode, FillOptions};
pub use flow::{accumulate, accumulate_mfd, route};
pub use moisture::compute_moisture;

use serde::{Deserialize, Serialize};

use crate::tilemap::Tilemap;

/// D8 direction order (clockwise from east): E, NE, N, NW, W, SW, S, SE.
pub const DX8: [i32; 8] = [1, 1, 0, -1, -1, -1, 0, 1];
pub const DY8: [i32; 8] = [0, -1, -1, -1, 0, 1, 1, 1];
/// Step distance per direction (diagonals are sqrt(2)).
pub const DIST8: [f32; 8] = [
    1.0, 1.414_213_6, 1.0, 1.414_213_6, 1.0, 1.414_213_6, 1.0, 1.414_213_6,
];

/// Flow-direction sentinel: cell is sea, never routed.
pub const FLOW_SEA: i8 = -2;
/// Flow-direction sentinel: sink with no downhill neighbor.
pub const FLOW_SINK: i8 = -1;

/// Linear index of the D8 neighbor, or None outside the grid (no wrap).
#[inline]
pub fn neighbor_index(w: usize, h: usize, x: usize, y: usize, dir: usize) -> Option<usize> {
    let nx = x as i32 + DX8[dir];
    let ny = y as i32 + DY8[dir];
    if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
        return None;
    }
    Some(ny as usize * w + nx as usize)
}

/// Water classification, one byte per tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum WaterKind {
    #[default]
    None = 0,
    Sea = 1,
    River = 2,
    Lake = 3,
}

/// Tuning knobs for the hydrology solve. Every field has a sensible
/// default; all thresholds are fractions/percentiles so the settings work
/// regardless of the height scale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydrologySettings {
    /// Seed used only for tie-breaking on flats (tiny jitter).
    pub seed: u32,

    /// Sea level computed as this percentile of the input height
    /// distribution. 0.12 => lowest ~12% of tiles are sea; 0 or below
    /// disables sea entirely.
    pub sea_level_percentile: f32,

    /// Fraction of land tiles to classify as river by flow accumulation.
    /// 0.02 => top ~2% highest-accumulation land tiles become rivers.
    pub river_cell_fraction: f32,

    /// Fraction of sink tiles (local minima) promoted into lakes.
    pub lake_sink_fraction: f32,

    /// Radius in tiles to expand a lake around a chosen sink.
    pub lake_expand_radius: i32,

    /// Max visual width class for rivers (1..=max_width), derived from
    /// accumulation.
    pub max_width: u8,

    /// Width mapping exponent. < 1.0 gives more medium rivers; > 1.0 gives
    /// mostly thin rivers with a few thick ones.
    pub width_exponent: f32,

    /// Flat tie-break jitter as a fraction of (max_height - min_height).
    /// Keeps large flats from degenerating into fields of sinks without
    /// visibly changing the terrain.
    pub flat_jitter_fraction: f32,

    /// Moisture falloff distance in tiles, see [`compute_moisture`].
    pub moisture_falloff: f32,

    /// Whether sea tiles act as water sources for moisture.
    pub include_sea_in_moisture: bool,

    /// Use 8-neighborhood for moisture distance (diagonal steps count
    /// as 1). If false, uses 4-neighborhood.
    pub moisture_use_8_way: bool,
}

impl Default for HydrologySettings {
    fn default() -> Self {
        Self {
            seed: 1337,
            sea_level_percentile: 0.12,
            river_cell_fraction: 0.02,
            lake_sink_fraction: 0.002,
            lake_expand_radius: 2,
            max_width: 8,
            width_exponent: 0.55,
            flat_jitter_fraction: 1e-4,
            moisture_falloff: 32.0,
            include_sea_in_moisture: true,
            moisture_use_8_way: false,
        }
    }
}

/// Output of the hydrology solve. All grids are flat row-major vectors of
/// length `width * height`; an empty result (zero dims) signals that the
/// input was rejected.
#[derive(Clone, Debug, Default)]
pub struct HydrologyResult {
    pub width: usize,
    pub height: usize,

    pub sea_level: f32,

    /// D8 downslope direction per tile: [`FLOW_SEA`], [`FLOW_SINK`], or 0..=7.
    pub flow_dir: Vec<i8>,

    /// Flow accumulation (arbitrary units) per tile.
    pub accumulation: Vec<f32>,

    /// Water classification per tile.
    pub water: Vec<WaterKind>,

    /// River width class: 0 for non-river, otherwise 1..=max_width.
    pub river_width: Vec<u8>,

    /// Strahler stream order: 0 off the river network, 1 at headwaters,
    /// increasing only where two equal-order tributaries join.
    pub stream_order: Vec<u8>,
}

impl HydrologyResult {
    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Linear index of the downstream cell, or None for sea/sink.
    pub fn downstream(&self, i: usize) -> Option<usize> {
        let dir = self.flow_dir[i];
        if dir < 0 {
            return None;
        }
        let x = i % self.width;
        let y = i / self.width;
        neighbor_index(self.width, self.height, x, y, dir as usize)
    }
}

/// Run the full hydrology solve on a heightfield.
///
/// The input is expected to be depression-filled already (see
/// [`generate_with_filled_routing`] for the one-call variant). Degenerate
/// input (zero dims, or a buffer whose length disagrees with the dims)
/// yields a default result; callers should check `result.width` before use.
pub fn generate_hydrology(height: &Tilemap<f32>, s: &HydrologySettings) -> HydrologyResult {
    let w = height.width;
    let h = height.height;
    let n = w * h;
    if n == 0 || height.data.len() != n {
        return HydrologyResult::default();
    }

    let (min_h, max_h) = height.min_max();
    let range = (max_h - min_h).max(0.0);
    let jitter_amp = range * s.flat_jitter_fraction.max(0.0);

    // A non-positive percentile disables sea entirely; the percentile of 0
    // would land on the global minimum and drown constant terrain.
    let sea_level = if s.sea_level_percentile > 0.0 {
        classify::percentile(height.as_slice(), s.sea_level_percentile)
    } else {
        min_h - 1.0
    };

    let flow_dir = flow::route(height, sea_level, jitter_amp, s.seed);
    let accumulation = flow::accumulate(&flow_dir, w, h);

    let mut out = HydrologyResult {
        width: w,
        height: h,
        sea_level,
        flow_dir,
        accumulation,
        water: vec![WaterKind::None; n],
        river_width: vec![0; n],
        stream_order: vec![0; n],
    };

    for i in 0..n {
        if out.flow_dir[i] == FLOW_SEA {
            out.water[i] = WaterKind::Sea;
        }
    }

    classify::classify_rivers(height, &mut out, s);
    classify::promote_lakes(height, &mut out, s);
    out.stream_order = classify::strahler_order(&out);
    classify::assign_river_widths(&mut out, s);

    out
}

/// Depression-fill, then solve hydrology on the filled surface.
/// Returns the filled heightfield alongside the result so callers can
/// carve or render against the same surface the routing saw.
pub fn generate_with_filled_routing(
    height: &Tilemap<f32>,
    s: &HydrologySettings,
) -> (Tilemap<f32>, HydrologyResult) {
    let filled = fill::fill_depressions(height, &FillOptions::default());
    let result = generate_hydrology(&filled, s);
    (filled, result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(w: usize, h: usize) -> Tilemap<f32> {
        // South edge low, north edge high.
        let mut map = Tilemap::new(w, h);
        for y in 0..h {
            for x in 0..w {
                map.set(x, y, (h - y) as f32 * 10.0);
            }
        }
        map
    }

    #[test]
    fn test_empty_input_rejected() {
        let map = Tilemap::new(0, 0);
        let out = generate_hydrology(&map, &HydrologySettings::default());
        assert_eq!(out.width, 0);
        assert!(out.flow_dir.is_empty());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        // The flat buffer is public, so a caller can hand over a map whose
        // buffer disagrees with its dims; that must not reach the kernels.
        let mut map = Tilemap::new_with(8, 8, 1.0f32);
        map.data.truncate(32);
        let out = generate_hydrology(&map, &HydrologySettings::default());
        assert_eq!(out.width, 0);
        assert!(out.flow_dir.is_empty());
    }

    #[test]
    fn test_sea_matches_water_kind() {
        let map = ramp(16, 16);
        let out = generate_hydrology(&map, &HydrologySettings::default());
        for i in 0..out.flow_dir.len() {
            assert_eq!(
                out.flow_dir[i] == FLOW_SEA,
                out.water[i] == WaterKind::Sea,
                "sea sentinel and water kind disagree at {i}"
            );
        }
    }

    #[test]
    fn test_acyclic_routing() {
        let map = ramp(24, 24);
        let out = generate_hydrology(&map, &HydrologySettings::default());
        let n = out.flow_dir.len();
        for start in 0..n {
            let mut i = start;
            let mut steps = 0;
            while let Some(next) = out.downstream(i) {
                i = next;
                steps += 1;
                assert!(steps <= n, "cycle reached from cell {start}");
            }
        }
    }

    /// Flat plateau at 1.0 with a single 0.0 drain in the corner; the sea
    /// percentile is tiny so only the drain cell lands at or below sea
    /// level, and everything else must route by jitter.
    fn near_flat(w: usize, h: usize) -> (Tilemap<f32>, HydrologySettings) {
        let mut map = Tilemap::new_with(w, h, 1.0f32);
        map.set(0, 0, 0.0);
        let s = HydrologySettings {
            sea_level_percentile: 0.0005,
            ..Default::default()
        };
        (map, s)
    }

    /// Every rainfall unit must reach exactly one terminal (sea or sink).
    fn assert_mass_conserved(out: &HydrologyResult) {
        let land = out.flow_dir.iter().filter(|&&d| d != FLOW_SEA).count();
        let terminal: f32 = out
            .flow_dir
            .iter()
            .zip(&out.accumulation)
            .filter(|(&d, _)| d == FLOW_SEA || d == FLOW_SINK)
            .map(|(_, &a)| a)
            .sum();
        assert!(
            (terminal - land as f32).abs() < 1e-2,
            "terminal accumulation {terminal} != land cells {land}"
        );
    }

    #[test]
    fn test_constant_4x4_is_all_land() {
        // Perfectly flat 1.0 terrain with the sea disabled: sea level drops
        // below the field, every cell is land, and each rainfall unit is
        // accounted for exactly once.
        let map = Tilemap::new_with(4, 4, 1.0f32);
        let s = HydrologySettings {
            sea_level_percentile: 0.0,
            ..Default::default()
        };
        let out = generate_hydrology(&map, &s);

        assert!(out.sea_level < 1.0);
        assert!(out.flow_dir.iter().all(|&d| d != FLOW_SEA));
        assert_mass_conserved(&out);
        let total: f32 = out.accumulation.iter().sum();
        assert!(total >= 16.0);
    }

    #[test]
    fn test_single_drain_4x4_end_to_end() {
        let (map, s) = near_flat(4, 4);
        let out = generate_hydrology(&map, &s);

        assert_eq!(out.water[0], WaterKind::Sea);
        let land = out.flow_dir.iter().filter(|&&d| d != FLOW_SEA).count();
        assert_eq!(land, 15, "only the drain cell should be sea");
        assert_mass_conserved(&out);
    }

    #[test]
    fn test_ramp_mass_conserved() {
        let map = ramp(24, 24);
        let out = generate_hydrology(&map, &HydrologySettings::default());
        assert_mass_conserved(&out);
    }

    #[test]
    fn test_route_is_deterministic() {
        let (map, s) = near_flat(32, 32);
        let a = generate_hydrology(&map, &s);
        let b = generate_hydrology(&map, &s);
        assert_eq!(a.flow_dir, b.flow_dir);
        assert_eq!(a.river_width, b.river_width);
    }

    #[test]
    fn test_seed_changes_jitter_not_shape() {
        let (map, s) = near_flat(32, 32);
        let a = generate_hydrology(&map, &s);
        let b = generate_hydrology(&map, &HydrologySettings { seed: 9001, ..s });
        // Different tie-breaks, same structural guarantees.
        assert_ne!(a.flow_dir, b.flow_dir);
        let n = b.flow_dir.len();
        for start in 0..n {
            let mut i = start;
            let mut steps = 0;
            while let Some(next) = b.downstream(i) {
                i = next;
                steps += 1;
                assert!(steps <= n);
            }
        }
        assert_mass_conserved(&b);
    }
}
