//! Priority-flood depression filling (Barnes et al.).
//!
//! Raises every cell until it can drain to the grid border (or to the
//! global minimum in torus mode), so D8 routing afterwards never strands
//! water in a pit it never meant to keep.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use crate::tilemap::Tilemap;

use super::{DX8, DY8};

const DX4: [i32; 4] = [1, -1, 0, 0];
const DY4: [i32; 4] = [0, 0, 1, -1];

/// How the grid edge behaves during filling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BorderMode {
    /// Water drains off the edges; the flood is seeded from all border cells.
    #[default]
    Open,
    /// Periodic wrapping; the flood is seeded from the global minimum so it
    /// always makes progress.
    Torus,
}

#[derive(Clone, Copy, Debug)]
pub struct FillOptions {
    pub border: BorderMode,
    /// Use the full 8-neighborhood (default) or 4-neighborhood.
    pub use_8_way: bool,
    /// When set, filled cells are raised epsilon above their spill height,
    /// creating a gentle monotone drain across flats instead of an exactly
    /// level lake floor.
    pub monotone_epsilon: Option<f32>,
    /// When set, every cell at or below this level also seeds the flood
    /// ("ocean" seeding), so inland basins connected to sea level are
    /// treated as drained.
    pub seed_below: Option<f32>,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            border: BorderMode::Open,
            use_8_way: true,
            monotone_epsilon: None,
            seed_below: None,
        }
    }
}

/// Min-heap entry ordered by height; index breaks ties for determinism.
#[derive(Clone, Copy)]
struct HeapCell {
    h: f32,
    i: usize,
}

impl PartialEq for HeapCell {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for HeapCell {}
impl PartialOrd for HeapCell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapCell {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the lowest cell first.
        other
            .h
            .total_cmp(&self.h)
            .then_with(|| other.i.cmp(&self.i))
    }
}

/// Fill depressions in-place. See [`fill_depressions`] for the copying form.
pub fn fill_depressions_in_place(z: &mut Tilemap<f32>, opt: &FillOptions) {
    let w = z.width;
    let h = z.height;
    let n = w * h;
    if n == 0 || z.data.len() != n {
        return;
    }

    let mut heap: BinaryHeap<HeapCell> = BinaryHeap::new();
    let mut visited = vec![false; n];
    // Plain FIFO for depression interiors: once a cell has been raised to
    // its spill height, its whole flat can be swept at O(1) per cell.
    let mut q: VecDeque<usize> = VecDeque::new();

    match opt.border {
        BorderMode::Open => {
            let mut seed = |x: usize, y: usize, heap: &mut BinaryHeap<HeapCell>| {
                let i = y * w + x;
                if !visited[i] {
                    visited[i] = true;
                    heap.push(HeapCell { h: z.data[i], i });
                }
            };
            for x in 0..w {
                seed(x, 0, &mut heap);
                seed(x, h - 1, &mut heap);
            }
            for y in 1..h.saturating_sub(1) {
                seed(0, y, &mut heap);
                seed(w - 1, y, &mut heap);
            }
        }
        BorderMode::Torus => {
            let mut argmin = 0usize;
            for i in 1..n {
                if z.data[i] < z.data[argmin] {
                    argmin = i;
                }
            }
            visited[argmin] = true;
            heap.push(HeapCell {
                h: z.data[argmin],
                i: argmin,
            });
        }
    }

    if let Some(level) = opt.seed_below {
        for i in 0..n {
            if !visited[i] && z.data[i] <= level {
                visited[i] = true;
                heap.push(HeapCell { h: z.data[i], i });
            }
        }
    }

    let (dx, dy): (&[i32], &[i32]) = if opt.use_8_way {
        (&DX8, &DY8)
    } else {
        (&DX4, &DY4)
    };
    let torus = opt.border == BorderMode::Torus;

    let neighbor = |i: usize, k: usize| -> Option<usize> {
        let mut nx = (i % w) as i32 + dx[k];
        let mut ny = (i / w) as i32 + dy[k];
        if torus {
            nx = nx.rem_euclid(w as i32);
            ny = ny.rem_euclid(h as i32);
        } else if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
            return None;
        }
        Some(ny as usize * w + nx as usize)
    };

    // Raise a newly reached neighbor to the reference spill height if it
    // sits below it; flat/below cells continue through the FIFO, everything
    // else goes back on the heap.
    let raise = |nb: usize,
                 refh: f32,
                 z: &mut Tilemap<f32>,
                 heap: &mut BinaryHeap<HeapCell>,
                 q: &mut VecDeque<usize>| {
        if z.data[nb] <= refh {
            z.data[nb] = match opt.monotone_epsilon {
                Some(eps) => refh + eps,
                None => refh,
            };
            q.push_back(nb);
        } else {
            heap.push(HeapCell { h: z.data[nb], i: nb });
        }
    };

    while let Some(cell) = heap.pop() {
        for k in 0..dx.len() {
            if let Some(nb) = neighbor(cell.i, k) {
                if !visited[nb] {
                    visited[nb] = true;
                    raise(nb, cell.h, z, &mut heap, &mut q);
                }
            }
        }

        while let Some(u) = q.pop_front() {
            let uh = z.data[u];
            for k in 0..dx.len() {
                if let Some(v) = neighbor(u, k) {
                    if !visited[v] {
                        visited[v] = true;
                        raise(v, uh, z, &mut heap, &mut q);
                    }
                }
            }
        }
    }
}

/// Copying variant: returns a depression-filled clone of the input.
pub fn fill_depressions(z: &Tilemap<f32>, opt: &FillOptions) -> Tilemap<f32> {
    let mut out = z.clone();
    fill_depressions_in_place(&mut out, opt);
    out
}
