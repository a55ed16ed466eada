//! Channel carving: lower terrain along rivers and lakes so water reads
//! as channels in the final heightfield. Purely cosmetic; rendering water
//! on top of the raw heights works too.

use crate::tilemap::Tilemap;

use super::{HydrologyResult, WaterKind};

const DX4: [i32; 4] = [1, -1, 0, 0];
const DY4: [i32; 4] = [0, 0, 1, -1];

/// Carve channels in-place. Rivers deepen proportionally to their width
/// class, lakes get a flat 60% of `carve_depth`, and a second pass blends
/// water-cell banks toward their 4-neighbor average by `bank_blend`.
///
/// A non-positive `carve_depth` is a no-op that leaves the heights
/// bit-identical.
pub fn carve_channels(
    height: &mut Tilemap<f32>,
    hydro: &HydrologyResult,
    carve_depth: f32,
    bank_blend: f32,
) {
    let w = hydro.width;
    let h = hydro.height;
    if w == 0 || h == 0 {
        return;
    }
    let n = w * h;
    if height.len() != n || hydro.water.len() != n || hydro.river_width.len() != n {
        return;
    }
    if carve_depth <= 0.0 {
        return;
    }

    let max_river_w = hydro
        .river_width
        .iter()
        .copied()
        .max()
        .unwrap_or(0)
        .max(1) as f32;

    // First pass: carve the main channel.
    for i in 0..n {
        match hydro.water[i] {
            WaterKind::River => {
                let w01 = (hydro.river_width[i].max(1)) as f32 / max_river_w;
                height.data[i] -= carve_depth * w01;
            }
            WaterKind::Lake => {
                height.data[i] -= carve_depth * 0.6;
            }
            _ => {}
        }
    }

    // Second pass: soften banks with a small blur on water tiles.
    if bank_blend <= 0.0 {
        return;
    }
    let blend = bank_blend.clamp(0.0, 1.0);
    let copy = height.data.clone();

    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            if hydro.water[i] == WaterKind::None {
                continue;
            }

            let mut sum = copy[i];
            let mut count = 1.0f32;
            for d in 0..4 {
                let nx = x as i32 + DX4[d];
                let ny = y as i32 + DY4[d];
                if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                    continue;
                }
                sum += copy[ny as usize * w + nx as usize];
                count += 1.0;
            }

            let avg = sum / count;
            height.data[i] = copy[i] * (1.0 - blend) + avg * blend;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrology::{generate_hydrology, HydrologySettings};

    fn valley() -> (Tilemap<f32>, HydrologyResult) {
        let mut map = Tilemap::new(32, 32);
        for y in 0..32 {
            for x in 0..32 {
                let side = (x as f32 - 16.0).abs() * 3.0;
                map.set(x, y, 1.0 + side + (32 - y) as f32);
            }
        }
        let out = generate_hydrology(&map, &HydrologySettings::default());
        (map, out)
    }

    #[test]
    fn test_zero_depth_is_bit_identical() {
        let (mut map, out) = valley();
        let before = map.as_slice().to_vec();
        carve_channels(&mut map, &out, 0.0, 0.25);
        assert_eq!(map.as_slice(), &before[..]);
    }

    #[test]
    fn test_rivers_get_lower() {
        let (mut map, out) = valley();
        let before = map.as_slice().to_vec();
        carve_channels(&mut map, &out, 0.5, 0.0);
        let mut carved = 0;
        for i in 0..before.len() {
            match out.water[i] {
                WaterKind::River => {
                    assert!(map.data[i] < before[i], "river cell {i} not lowered");
                    carved += 1;
                }
                WaterKind::Lake => assert!(map.data[i] < before[i]),
                _ => assert_eq!(map.data[i], before[i], "dry cell {i} changed"),
            }
        }
        assert!(carved > 0);
    }

    #[test]
    fn test_bank_blend_only_touches_water() {
        let (mut map, out) = valley();
        let before = map.as_slice().to_vec();
        carve_channels(&mut map, &out, 0.5, 0.25);
        for i in 0..before.len() {
            if out.water[i] == WaterKind::None {
                assert_eq!(map.data[i], before[i], "dry cell {i} blurred");
            }
        }
    }

    #[test]
    fn test_mismatched_dims_is_noop() {
        let (_, out) = valley();
        let mut small = Tilemap::new_with(4, 4, 7.0f32);
        carve_channels(&mut small, &out, 0.5, 0.25);
        assert!(small.as_slice().iter().all(|&v| v == 7.0));
    }
}
