//! Uniform bin grid over moving points.
//!
//! The grid side equals the search distance, so any pair within that
//! distance lies in the same bin or in adjacent bins. One padding bin on
//! every side (the `+1` index offset plus the `+3` sizing term) guarantees
//! that every in-domain point has a full 27-bin neighborhood without
//! bounds checks.

use petri_core::Vec3;

/// Points generalized onto a uniform grid of cubic bins.
///
/// Built fresh for each search from current positions. Bin occupancy is
/// capped at a per-bin `capacity`; when an assignment overflows it, the
/// capacity is doubled and assignment retried, and the final value is
/// reported so callers can persist it as the next step's hint.
#[derive(Clone, Debug)]
pub struct BinGrid {
    dims: [usize; 3],
    capacity: usize,
    counts: Vec<u32>,
    slots: Vec<u32>,
    cell_bins: Vec<[usize; 3]>,
}

impl BinGrid {
    /// Assign every location to a bin of side `distance`.
    ///
    /// `capacity_hint` seeds the per-bin occupancy cap; it grows by
    /// doubling until all points fit.
    ///
    /// # Panics
    ///
    /// Panics if `distance` is not finite and positive.
    pub fn assign(locations: &[Vec3], size: Vec3, distance: f64, capacity_hint: usize) -> BinGrid {
        assert!(
            distance.is_finite() && distance > 0.0,
            "search distance must be finite and positive, got {distance}"
        );

        let dims = [
            (size.x / distance).ceil() as usize + 3,
            (size.y / distance).ceil() as usize + 3,
            (size.z / distance).ceil() as usize + 3,
        ];
        let bin_count = dims[0] * dims[1] * dims[2];

        // Generalize each location once; the +1 offset keeps a padding bin
        // on the low side of every axis.
        let cell_bins: Vec<[usize; 3]> = locations
            .iter()
            .map(|loc| {
                [
                    bin_coord(loc.x, distance, dims[0]),
                    bin_coord(loc.y, distance, dims[1]),
                    bin_coord(loc.z, distance, dims[2]),
                ]
            })
            .collect();

        let mut capacity = capacity_hint.max(1);
        loop {
            let mut counts = vec![0u32; bin_count];
            let mut slots = vec![0u32; bin_count * capacity];
            let mut overflowed = 0usize;

            for (index, bin) in cell_bins.iter().enumerate() {
                let flat = flat_index(&dims, *bin);
                let occupancy = counts[flat] as usize;
                if occupancy < capacity {
                    slots[flat * capacity + occupancy] = index as u32;
                } else {
                    overflowed = overflowed.max(occupancy + 1);
                }
                counts[flat] += 1;
            }

            if overflowed > 0 {
                capacity = overflowed * 2;
                continue;
            }

            return BinGrid {
                dims,
                capacity,
                counts,
                slots,
                cell_bins,
            };
        }
    }

    /// The per-bin capacity that sufficed, to be reused as the next hint.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bin coordinate of a point, offset included.
    pub fn cell_bin(&self, cell: usize) -> [usize; 3] {
        self.cell_bins[cell]
    }

    /// Number of points assigned.
    pub fn len(&self) -> usize {
        self.cell_bins.len()
    }

    /// `true` when no points were assigned.
    pub fn is_empty(&self) -> bool {
        self.cell_bins.is_empty()
    }

    /// All points in the 27-bin neighborhood of `cell`, including `cell`
    /// itself.
    pub fn cells_near(&self, cell: usize) -> impl Iterator<Item = u32> + '_ {
        let [x, y, z] = self.cell_bins[cell];
        (x - 1..=x + 1).flat_map(move |bx| {
            (y - 1..=y + 1).flat_map(move |by| {
                (z - 1..=z + 1).flat_map(move |bz| {
                    let flat = flat_index(&self.dims, [bx, by, bz]);
                    let count = self.counts[flat] as usize;
                    let start = flat * self.capacity;
                    self.slots[start..start + count].iter().copied()
                })
            })
        })
    }
}

/// Generalize one coordinate, clamped into the padded index range so a
/// point sitting exactly on the domain boundary still lands in-grid with
/// a full neighborhood on both sides.
fn bin_coord(value: f64, distance: f64, dim: usize) -> usize {
    let offset = (value / distance).floor() as isize + 1;
    offset.clamp(1, dim as isize - 2) as usize
}

fn flat_index(dims: &[usize; 3], [x, y, z]: [usize; 3]) -> usize {
    (x * dims[1] + y) * dims[2] + z
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_of(points: &[(f64, f64, f64)], size: (f64, f64, f64), d: f64) -> BinGrid {
        let locations: Vec<Vec3> = points.iter().map(|&(x, y, z)| Vec3::new(x, y, z)).collect();
        BinGrid::assign(&locations, Vec3::new(size.0, size.1, size.2), d, 1)
    }

    #[test]
    fn every_point_appears_in_its_own_neighborhood() {
        let grid = grid_of(
            &[(0.0, 0.0, 0.0), (5.0, 5.0, 0.0), (9.9, 9.9, 0.0)],
            (10.0, 10.0, 0.0),
            1.0,
        );
        for i in 0..3 {
            assert!(
                grid.cells_near(i).any(|c| c as usize == i),
                "point {i} missing from its own neighborhood"
            );
        }
    }

    #[test]
    fn capacity_doubles_until_everything_fits() {
        // 20 coincident points in one bin with a hint of 1.
        let points: Vec<(f64, f64, f64)> = (0..20).map(|_| (0.5, 0.5, 0.0)).collect();
        let grid = grid_of(&points, (10.0, 10.0, 0.0), 1.0);
        assert!(grid.capacity() >= 20);
        assert_eq!(grid.cells_near(0).count(), 20);
    }

    #[test]
    fn boundary_points_have_full_neighborhoods() {
        // Corner and far-corner points must not push indexing out of the
        // padded grid.
        let grid = grid_of(
            &[(0.0, 0.0, 0.0), (10.0, 10.0, 10.0)],
            (10.0, 10.0, 10.0),
            2.5,
        );
        assert_eq!(grid.cells_near(0).count(), 1);
        assert_eq!(grid.cells_near(1).count(), 1);
    }

    #[test]
    fn adjacent_points_see_each_other() {
        // 0.9 apart with bin side 1.0: same or adjacent bins either way.
        let grid = grid_of(&[(3.05, 5.0, 0.0), (3.95, 5.0, 0.0)], (10.0, 10.0, 0.0), 1.0);
        assert!(grid.cells_near(0).any(|c| c == 1));
        assert!(grid.cells_near(1).any(|c| c == 0));
    }

    #[test]
    fn two_d_mode_uses_a_degenerate_z_axis() {
        let grid = grid_of(&[(1.0, 1.0, 0.0)], (10.0, 10.0, 0.0), 1.0);
        assert_eq!(grid.cell_bin(0)[2], 1);
    }

    #[test]
    #[should_panic(expected = "search distance must be finite")]
    fn rejects_zero_distance() {
        grid_of(&[(0.0, 0.0, 0.0)], (1.0, 1.0, 0.0), 0.0);
    }
}
