use std::collections::{HashMap, HashSet};

use glam::Vec3;

use crate::{
    config::{BROADPHASE_MAX_PROXY_CELLS, DEFAULT_BROADPHASE_CELL_SIZE},
    core::{mesh::Aabb, rigidbody::BodyHandle},
};

/// Body bounds submitted to the broad-phase for one step.
#[derive(Debug, Clone, Copy)]
pub struct BroadPhaseProxy {
    pub body: BodyHandle,
    pub bounds: Aabb,
    /// Static or sleeping proxies never pair with each other.
    pub passive: bool,
}

/// Uniform grid spatial partitioning used by the broad-phase.
pub struct SpatialGrid {
    cell_size: f32,
    grid: HashMap<(i32, i32, i32), Vec<usize>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(1e-3),
            grid: HashMap::new(),
        }
    }

    fn world_to_grid(&self, pos: Vec3) -> (i32, i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
            (pos.z / self.cell_size).floor() as i32,
        )
    }

    /// Number of cells `bounds` would occupy.
    pub fn cell_span(&self, bounds: &Aabb) -> usize {
        let min = self.world_to_grid(bounds.min);
        let max = self.world_to_grid(bounds.max);
        let span = |lo: i32, hi: i32| (hi as i64 - lo as i64 + 1).max(1) as usize;
        span(min.0, max.0)
            .saturating_mul(span(min.1, max.1))
            .saturating_mul(span(min.2, max.2))
    }

    pub fn insert(&mut self, proxy: usize, bounds: &Aabb) {
        let min_cell = self.world_to_grid(bounds.min);
        let max_cell = self.world_to_grid(bounds.max);

        for x in min_cell.0..=max_cell.0 {
            for y in min_cell.1..=max_cell.1 {
                for z in min_cell.2..=max_cell.2 {
                    self.grid.entry((x, y, z)).or_default().push(proxy);
                }
            }
        }
    }

    pub fn query(&self, bounds: &Aabb) -> Vec<usize> {
        let mut results = Vec::new();
        let min_cell = self.world_to_grid(bounds.min);
        let max_cell = self.world_to_grid(bounds.max);

        for x in min_cell.0..=max_cell.0 {
            for y in min_cell.1..=max_cell.1 {
                for z in min_cell.2..=max_cell.2 {
                    if let Some(entries) = self.grid.get(&(x, y, z)) {
                        results.extend(entries);
                    }
                }
            }
        }

        results.sort_unstable();
        results.dedup();
        results
    }

    pub fn clear(&mut self) {
        self.grid.clear();
    }
}

/// Broad phase driver returning potentially overlapping body pairs.
pub struct BroadPhase {
    grid: SpatialGrid,
    oversized: Vec<usize>,
}

impl Default for BroadPhase {
    fn default() -> Self {
        Self::new(DEFAULT_BROADPHASE_CELL_SIZE)
    }
}

impl BroadPhase {
    pub fn new(cell_size: f32) -> Self {
        Self {
            grid: SpatialGrid::new(cell_size),
            oversized: Vec::new(),
        }
    }

    /// Pairs whose bounds overlap, ordered `(lower handle, higher handle)`.
    pub fn find_pairs(&mut self, proxies: &[BroadPhaseProxy]) -> Vec<(BodyHandle, BodyHandle)> {
        self.grid.clear();
        self.oversized.clear();

        for (index, proxy) in proxies.iter().enumerate() {
            if !proxy.bounds.is_valid() {
                continue;
            }
            // Level geometry can cover thousands of cells; test it brute force instead.
            if self.grid.cell_span(&proxy.bounds) > BROADPHASE_MAX_PROXY_CELLS {
                self.oversized.push(index);
            } else {
                self.grid.insert(index, &proxy.bounds);
            }
        }

        let mut pairs = Vec::new();
        let mut checked = HashSet::new();
        let mut consider = |a: usize, b: usize, pairs: &mut Vec<(BodyHandle, BodyHandle)>| {
            if a == b {
                return;
            }
            let (pa, pb) = (&proxies[a], &proxies[b]);
            if pa.passive && pb.passive {
                return;
            }
            let key = if a < b { (a, b) } else { (b, a) };
            if !checked.insert(key) || !pa.bounds.intersects(&pb.bounds) {
                return;
            }
            pairs.push(if pa.body < pb.body {
                (pa.body, pb.body)
            } else {
                (pb.body, pa.body)
            });
        };

        for (index, proxy) in proxies.iter().enumerate() {
            if !proxy.bounds.is_valid() || self.oversized.contains(&index) {
                continue;
            }
            for other in self.grid.query(&proxy.bounds) {
                consider(index, other, &mut pairs);
            }
        }
        for &big in &self.oversized {
            for other in 0..proxies.len() {
                if proxies[other].bounds.is_valid() {
                    consider(big, other, &mut pairs);
                }
            }
        }

        pairs
    }
}
