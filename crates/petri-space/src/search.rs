//! Fixed-radius pair search over a [`BinGrid`].
//!
//! Each point scans its 27-bin neighborhood and emits an edge `(i, j)`
//! for every candidate with `i < j` that satisfies the predicate, so no
//! pair is reported twice and self-pairs never appear. Edges are written
//! into a per-point slab of fixed width; overflow is detected through the
//! true per-point counts and recovered by doubling the width and
//! rerunning. Within a slab row the write order is the bin scan order,
//! but callers must not rely on edge ordering.

use crate::bins::BinGrid;
use petri_core::Vec3;
use rayon::prelude::*;

/// An edge list plus the slab width that sufficed to produce it.
#[derive(Clone, Debug)]
pub struct SearchResult {
    /// Undirected edges with `edge.0 < edge.1`.
    pub edges: Vec<(u32, u32)>,
    /// Per-point slab width after any doubling; callers persist this as
    /// the next search's hint.
    pub max_per_cell: usize,
}

/// Edges between points within `distance` of each other.
///
/// This is the proximity predicate: `‖x_i − x_j‖ ≤ distance`.
pub fn pairs_within(
    grid: &BinGrid,
    locations: &[Vec3],
    distance: f64,
    per_cell_hint: usize,
) -> SearchResult {
    slab_search(grid, locations.len(), per_cell_hint, |i, j| {
        locations[i].distance(locations[j]) <= distance
    })
}

/// Edges between points whose spheres touch or overlap.
///
/// This is the contact predicate: `r_i + r_j − ‖x_i − x_j‖ ≥ 0`. The grid
/// must have been binned at a distance of at least `2 · max(radii)` for
/// the neighborhood scan to be exhaustive.
pub fn contact_pairs(
    grid: &BinGrid,
    locations: &[Vec3],
    radii: &[f64],
    per_cell_hint: usize,
) -> SearchResult {
    slab_search(grid, locations.len(), per_cell_hint, |i, j| {
        radii[i] + radii[j] - locations[i].distance(locations[j]) >= 0.0
    })
}

/// Slab-based parallel pair search with doubling retry.
///
/// Every point owns a disjoint row of the slab, so the parallel fill has
/// no write contention. The predicate sees `(focus, candidate)` with
/// `focus < candidate`.
fn slab_search<P>(grid: &BinGrid, points: usize, per_cell_hint: usize, predicate: P) -> SearchResult
where
    P: Fn(usize, usize) -> bool + Sync,
{
    let mut width = per_cell_hint.max(1);
    loop {
        let mut slab = vec![(0u32, 0u32); points * width];
        let mut counts = vec![0u32; points];

        slab.par_chunks_mut(width)
            .zip(counts.par_iter_mut())
            .enumerate()
            .for_each(|(focus, (row, count))| {
                let mut found = 0usize;
                for candidate in grid.cells_near(focus) {
                    let candidate = candidate as usize;
                    if focus < candidate && predicate(focus, candidate) {
                        if found < width {
                            row[found] = (focus as u32, candidate as u32);
                        }
                        found += 1;
                    }
                }
                *count = found as u32;
            });

        let deepest = counts.iter().copied().max().unwrap_or(0) as usize;
        if deepest > width {
            width = deepest * 2;
            continue;
        }

        let total: usize = counts.iter().map(|&c| c as usize).sum();
        let mut edges = Vec::with_capacity(total);
        for (focus, &count) in counts.iter().enumerate() {
            let start = focus * width;
            edges.extend_from_slice(&slab[start..start + count as usize]);
        }
        return SearchResult {
            edges,
            max_per_cell: width,
        };
    }
}
