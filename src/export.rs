//! Debug PNG export of simulation fields.

use std::path::Path;

use image::{ImageBuffer, Rgb};

use crate::hydrology::{HydrologyResult, WaterKind};
use crate::tilemap::Tilemap;

/// Relief palette: ocean blues below sea level, land green to brown to
/// white with elevation.
pub fn height_color(h: f32, min_h: f32, max_h: f32, sea_level: f32) -> Rgb<u8> {
    if h <= sea_level {
        let depth_span = (sea_level - min_h).max(1e-6);
        let depth_ratio = ((h - min_h) / depth_span).clamp(0.0, 1.0);
        let blue = (100.0 + 155.0 * depth_ratio) as u8;
        return Rgb([20, 50, blue]);
    }

    let land_span = (max_h - sea_level).max(1e-6);
    let elev_ratio = ((h - sea_level) / land_span).clamp(0.0, 1.0);
    if elev_ratio < 0.3 {
        Rgb([
            (50.0 + 100.0 * elev_ratio) as u8,
            (120.0 + 80.0 * elev_ratio) as u8,
            50,
        ])
    } else if elev_ratio < 0.7 {
        let t = (elev_ratio - 0.3) / 0.4;
        Rgb([
            (80.0 + 80.0 * t) as u8,
            (150.0 - 50.0 * t) as u8,
            (50.0 + 30.0 * t) as u8,
        ])
    } else {
        let t = (elev_ratio - 0.7) / 0.3;
        Rgb([
            (160.0 + 95.0 * t) as u8,
            (100.0 + 155.0 * t) as u8,
            (80.0 + 175.0 * t) as u8,
        ])
    }
}

/// Shaded-relief heightmap.
pub fn export_heightmap<P: AsRef<Path>>(
    height: &Tilemap<f32>,
    sea_level: f32,
    path: P,
) -> image::ImageResult<()> {
    let (min_h, max_h) = height.min_max();
    let img = ImageBuffer::from_fn(height.width as u32, height.height as u32, |x, y| {
        height_color(*height.get(x as usize, y as usize), min_h, max_h, sea_level)
    });
    img.save(path)
}

/// River shade brightening with the width class relative to the widest
/// river actually present.
pub fn river_color(width_class: u8, max_class: u8) -> Rgb<u8> {
    let t = (width_class as f32 / max_class.max(1) as f32).clamp(0.0, 1.0);
    Rgb([40, (100.0 + 80.0 * t) as u8, 255])
}

/// Water classification over the relief palette: rivers brighten with
/// width class, lakes are teal.
pub fn export_water_map<P: AsRef<Path>>(
    height: &Tilemap<f32>,
    hydro: &HydrologyResult,
    path: P,
) -> image::ImageResult<()> {
    let (min_h, max_h) = height.min_max();
    let max_class = hydro.river_width.iter().copied().max().unwrap_or(0);
    let img = ImageBuffer::from_fn(hydro.width as u32, hydro.height as u32, |x, y| {
        let i = hydro.idx(x as usize, y as usize);
        match hydro.water[i] {
            WaterKind::Sea => Rgb([20, 50, 140]),
            WaterKind::River => river_color(hydro.river_width[i], max_class),
            WaterKind::Lake => Rgb([40, 160, 170]),
            WaterKind::None => {
                height_color(*height.get(x as usize, y as usize), min_h, max_h, hydro.sea_level)
            }
        }
    });
    img.save(path)
}

/// Moisture as grayscale (white = saturated).
pub fn export_moisture_map<P: AsRef<Path>>(
    moisture: &[f32],
    width: usize,
    height: usize,
    path: P,
) -> image::ImageResult<()> {
    let img = ImageBuffer::from_fn(width as u32, height as u32, |x, y| {
        let v = moisture[y as usize * width + x as usize].clamp(0.0, 1.0);
        let g = (v * 255.0) as u8;
        Rgb([g, g, g])
    });
    img.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_bands() {
        // Below sea: blue dominates.
        let c = height_color(-5.0, -10.0, 10.0, 0.0);
        assert!(c[2] > c[0] && c[2] > c[1]);
        // Low land: green dominates.
        let c = height_color(1.0, -10.0, 10.0, 0.0);
        assert!(c[1] > c[0] && c[1] > c[2]);
        // High land: bright, near white.
        let c = height_color(10.0, -10.0, 10.0, 0.0);
        assert!(c[0] > 200 && c[1] > 200 && c[2] > 200);
    }

    #[test]
    fn test_river_shade_tracks_actual_max_width() {
        // The widest river present renders at full brightness no matter
        // what the configured maximum class was.
        assert_eq!(river_color(3, 3), river_color(8, 8));
        let thin = river_color(1, 8);
        let wide = river_color(8, 8);
        assert!(wide[1] > thin[1]);
        // Degenerate mask with no rivers must not divide by zero.
        let c = river_color(0, 0);
        assert_eq!(c[2], 255);
    }

    #[test]
    fn test_palette_handles_degenerate_range() {
        // All-flat terrain must not divide by zero.
        let c = height_color(1.0, 1.0, 1.0, 1.0);
        assert_eq!(c, Rgb([20, 50, 100]));
    }
}
