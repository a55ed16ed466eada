//! Multi-source distance-to-water moisture field.

use std::collections::VecDeque;

use super::{WaterKind, DX8, DY8};

const DX4: [i32; 4] = [1, -1, 0, 0];
const DY4: [i32; 4] = [0, 0, 1, -1];

/// Moisture is 1.0 at water sources and decays exponentially with BFS
/// distance: `exp(-d / falloff)`. With `falloff <= 0` the field is a hard
/// 0/1 mask. Cells unreachable from any source stay at 0.
pub fn compute_moisture(
    w: usize,
    h: usize,
    water: &[WaterKind],
    falloff: f32,
    include_sea: bool,
    use_8_way: bool,
) -> Vec<f32> {
    let n = w * h;
    let mut dist = vec![-1i32; n];
    let mut q: VecDeque<usize> = VecDeque::new();

    let is_source = |k: WaterKind| -> bool {
        match k {
            WaterKind::River | WaterKind::Lake => true,
            WaterKind::Sea => include_sea,
            WaterKind::None => false,
        }
    };

    for i in 0..n {
        if is_source(water[i]) {
            dist[i] = 0;
            q.push_back(i);
        }
    }

    let (dx, dy): (&[i32], &[i32]) = if use_8_way { (&DX8, &DY8) } else { (&DX4, &DY4) };

    while let Some(i) = q.pop_front() {
        let x = (i % w) as i32;
        let y = (i / w) as i32;
        for d in 0..dx.len() {
            let nx = x + dx[d];
            let ny = y + dy[d];
            if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                continue;
            }
            let j = ny as usize * w + nx as usize;
            if dist[j] >= 0 {
                continue;
            }
            dist[j] = dist[i] + 1;
            q.push_back(j);
        }
    }

    let mut moisture = vec![0.0f32; n];
    if falloff <= 0.0 {
        for i in 0..n {
            moisture[i] = if dist[i] == 0 { 1.0 } else { 0.0 };
        }
        return moisture;
    }

    for i in 0..n {
        if dist[i] >= 0 {
            moisture[i] = (-(dist[i] as f32) / falloff).exp();
        }
    }
    moisture
}
