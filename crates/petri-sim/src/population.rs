//! The cell population as a structure-of-arrays.
//!
//! Every per-cell quantity lives in its own dense array keyed by the cell
//! index `i ∈ [0, N)`. Arrays grow by append and shrink by compact-delete;
//! indices are therefore not stable across structural mutation, and the
//! stable `ids` array exists for anything that must survive reshuffling
//! (RNG streams, external logs).

use petri_core::{CellState, Fds, Vec3};

/// One cell's full record, used for seeding and division.
#[derive(Clone, Debug)]
pub struct Cell {
    /// Stable identity, never reused within a run.
    pub id: u64,
    /// Position in space.
    pub location: Vec3,
    /// Mechanical radius.
    pub radius: f64,
    /// Velocity from the most recent integration sub-step.
    pub velocity: Vec3,
    /// Accumulated active motility force.
    pub motility_force: Vec3,
    /// Accumulated adhesive/repulsive contact force.
    pub jkr_force: Vec3,
    /// Whether the cell applies active motility this step.
    pub motion: bool,
    /// Cell-type tag.
    pub state: CellState,
    /// Discrete regulatory state.
    pub fds: Fds,
    /// Cell mass; constant after setup.
    pub mass: f64,
    /// Steps accumulated toward division.
    pub div_counter: u32,
    /// Steps accumulated toward differentiation.
    pub diff_counter: u32,
    /// Steps accumulated toward death.
    pub death_counter: u32,
    /// Steps since the last regulatory update.
    pub fds_counter: u32,
    /// Cached nearest GATA6-high cell, if any within the search radius.
    pub nearest_gata6: Option<u32>,
    /// Cached nearest NANOG-high cell, if any within the search radius.
    pub nearest_nanog: Option<u32>,
    /// Cached nearest differentiated cell, if any within the search radius.
    pub nearest_diff: Option<u32>,
}

/// Structure-of-arrays over all live cells.
///
/// All arrays have identical length at phase boundaries; the step driver
/// checks this invariant once per macro-step.
#[derive(Clone, Debug, Default)]
pub struct Population {
    /// Stable per-cell identities.
    pub ids: Vec<u64>,
    /// Positions.
    pub locations: Vec<Vec3>,
    /// Mechanical radii.
    pub radii: Vec<f64>,
    /// Last sub-step velocities, for snapshots.
    pub velocities: Vec<Vec3>,
    /// Active motility forces, zeroed after each `handle_movement`.
    pub motility_forces: Vec<Vec3>,
    /// Contact forces, zeroed after each integration sub-step.
    pub jkr_forces: Vec<Vec3>,
    /// Active-motility flags.
    pub motion: Vec<bool>,
    /// Cell-type tags.
    pub states: Vec<CellState>,
    /// Discrete regulatory states.
    pub fds: Vec<Fds>,
    /// Masses; read at setup, reported in snapshots, never updated.
    pub masses: Vec<f64>,
    /// Division counters.
    pub div_counters: Vec<u32>,
    /// Differentiation counters.
    pub diff_counters: Vec<u32>,
    /// Death counters.
    pub death_counters: Vec<u32>,
    /// Regulatory-update counters.
    pub fds_counters: Vec<u32>,
    /// Cached nearest GATA6-high indices.
    pub nearest_gata6: Vec<Option<u32>>,
    /// Cached nearest NANOG-high indices.
    pub nearest_nanog: Vec<Option<u32>>,
    /// Cached nearest differentiated indices.
    pub nearest_diff: Vec<Option<u32>>,
}

impl Population {
    /// An empty population.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live cells.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// `true` when no cells are live.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Append one cell at the end of every array.
    pub fn push(&mut self, cell: Cell) {
        self.ids.push(cell.id);
        self.locations.push(cell.location);
        self.radii.push(cell.radius);
        self.velocities.push(cell.velocity);
        self.motility_forces.push(cell.motility_force);
        self.jkr_forces.push(cell.jkr_force);
        self.motion.push(cell.motion);
        self.states.push(cell.state);
        self.fds.push(cell.fds);
        self.masses.push(cell.mass);
        self.div_counters.push(cell.div_counter);
        self.diff_counters.push(cell.diff_counter);
        self.death_counters.push(cell.death_counter);
        self.fds_counters.push(cell.fds_counter);
        self.nearest_gata6.push(cell.nearest_gata6);
        self.nearest_nanog.push(cell.nearest_nanog);
        self.nearest_diff.push(cell.nearest_diff);
    }

    /// Copy out one cell's full record.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn cell(&self, index: usize) -> Cell {
        Cell {
            id: self.ids[index],
            location: self.locations[index],
            radius: self.radii[index],
            velocity: self.velocities[index],
            motility_force: self.motility_forces[index],
            jkr_force: self.jkr_forces[index],
            motion: self.motion[index],
            state: self.states[index],
            fds: self.fds[index],
            mass: self.masses[index],
            div_counter: self.div_counters[index],
            diff_counter: self.diff_counters[index],
            death_counter: self.death_counters[index],
            fds_counter: self.fds_counters[index],
            nearest_gata6: self.nearest_gata6[index],
            nearest_nanog: self.nearest_nanog[index],
            nearest_diff: self.nearest_diff[index],
        }
    }

    /// Delete a set of cells and compact every array, preserving the
    /// relative order of survivors. Indices must be in range; duplicates
    /// are tolerated.
    pub fn compact(&mut self, remove: &[usize]) {
        if remove.is_empty() {
            return;
        }
        let n = self.len();
        let mut keep = vec![true; n];
        for &index in remove {
            assert!(index < n, "cell {index} out of range for population of {n}");
            keep[index] = false;
        }

        retain_by_mask(&mut self.ids, &keep);
        retain_by_mask(&mut self.locations, &keep);
        retain_by_mask(&mut self.radii, &keep);
        retain_by_mask(&mut self.velocities, &keep);
        retain_by_mask(&mut self.motility_forces, &keep);
        retain_by_mask(&mut self.jkr_forces, &keep);
        retain_by_mask(&mut self.motion, &keep);
        retain_by_mask(&mut self.states, &keep);
        retain_by_mask(&mut self.fds, &keep);
        retain_by_mask(&mut self.masses, &keep);
        retain_by_mask(&mut self.div_counters, &keep);
        retain_by_mask(&mut self.diff_counters, &keep);
        retain_by_mask(&mut self.death_counters, &keep);
        retain_by_mask(&mut self.fds_counters, &keep);
        retain_by_mask(&mut self.nearest_gata6, &keep);
        retain_by_mask(&mut self.nearest_nanog, &keep);
        retain_by_mask(&mut self.nearest_diff, &keep);
    }

    /// Report the first misaligned array, if any. All arrays must match
    /// the length of `ids`.
    pub fn alignment_error(&self) -> Option<String> {
        let n = self.ids.len();
        let checks: [(&str, usize); 16] = [
            ("locations", self.locations.len()),
            ("radii", self.radii.len()),
            ("velocities", self.velocities.len()),
            ("motility_forces", self.motility_forces.len()),
            ("jkr_forces", self.jkr_forces.len()),
            ("motion", self.motion.len()),
            ("states", self.states.len()),
            ("fds", self.fds.len()),
            ("masses", self.masses.len()),
            ("div_counters", self.div_counters.len()),
            ("diff_counters", self.diff_counters.len()),
            ("death_counters", self.death_counters.len()),
            ("fds_counters", self.fds_counters.len()),
            ("nearest_gata6", self.nearest_gata6.len()),
            ("nearest_nanog", self.nearest_nanog.len()),
            ("nearest_diff", self.nearest_diff.len()),
        ];
        checks
            .iter()
            .find(|(_, len)| *len != n)
            .map(|(name, len)| format!("{name} has length {len}, expected {n}"))
    }
}

fn retain_by_mask<T>(values: &mut Vec<T>, keep: &[bool]) {
    let mut index = 0;
    values.retain(|_| {
        let keep_this = keep[index];
        index += 1;
        keep_this
    });
}
