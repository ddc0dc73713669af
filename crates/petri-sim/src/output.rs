//! Snapshot emission.
//!
//! The step driver hands every registered [`SnapshotSink`] a borrowed
//! per-cell view once per macro-step. Rendering (PNG frames, end-of-run
//! video) lives outside the kernel behind the same trait; the kernel
//! ships the CSV sink.

use crate::population::Population;
use petri_core::{CellState, Fds, Vec3};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Borrowed view of the population at the end of one macro-step.
#[derive(Clone, Copy, Debug)]
pub struct SnapshotView<'a> {
    /// Macro-step counter (0-based).
    pub step: u64,
    /// Simulation clock in seconds.
    pub time: f64,
    /// Stable cell identities.
    pub ids: &'a [u64],
    /// Positions.
    pub locations: &'a [Vec3],
    /// Last sub-step velocities.
    pub velocities: &'a [Vec3],
    /// Active-motility flags.
    pub motion: &'a [bool],
    /// Masses.
    pub masses: &'a [f64],
    /// Radii.
    pub radii: &'a [f64],
    /// Regulatory states.
    pub fds: &'a [Fds],
    /// Cell-type tags.
    pub states: &'a [CellState],
    /// Differentiation counters.
    pub diff_counters: &'a [u32],
    /// Division counters.
    pub div_counters: &'a [u32],
    /// Death counters.
    pub death_counters: &'a [u32],
}

impl<'a> SnapshotView<'a> {
    /// Build a view over a population.
    pub fn over(population: &'a Population, step: u64, time: f64) -> Self {
        Self {
            step,
            time,
            ids: &population.ids,
            locations: &population.locations,
            velocities: &population.velocities,
            motion: &population.motion,
            masses: &population.masses,
            radii: &population.radii,
            fds: &population.fds,
            states: &population.states,
            diff_counters: &population.diff_counters,
            div_counters: &population.div_counters,
            death_counters: &population.death_counters,
        }
    }

    /// Number of cells in the view.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// `true` when the population is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// A per-step snapshot consumer.
///
/// Implementations must not retain the view beyond the call. Renderers
/// (PNG, video assembly) implement this trait outside the kernel.
pub trait SnapshotSink {
    /// Consume one step's view.
    fn write(&mut self, view: &SnapshotView<'_>) -> io::Result<()>;

    /// Called once after the final step.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes one CSV file per step: `<name>_values_<step>.csv` with one row
/// per cell.
#[derive(Clone, Debug)]
pub struct CsvSink {
    directory: PathBuf,
    name: String,
}

impl CsvSink {
    /// Create the sink, creating `directory` if needed.
    pub fn new(directory: impl Into<PathBuf>, name: impl Into<String>) -> io::Result<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            name: name.into(),
        })
    }
}

impl SnapshotSink for CsvSink {
    fn write(&mut self, view: &SnapshotView<'_>) -> io::Result<()> {
        let path = self
            .directory
            .join(format!("{}_values_{}.csv", self.name, view.step));
        let mut out = BufWriter::new(File::create(path)?);

        writeln!(
            out,
            "X_position,Y_position,Z_position,X_velocity,Y_velocity,Z_velocity,Motion,Mass,\
             Radius,FGFR,ERK,GATA6,NANOG,State,Differentiation_counter,Division_counter,\
             Death_counter"
        )?;
        for i in 0..view.len() {
            let loc = view.locations[i];
            let vel = view.velocities[i];
            let fds = view.fds[i];
            writeln!(
                out,
                "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
                loc.x,
                loc.y,
                loc.z,
                vel.x,
                vel.y,
                vel.z,
                view.motion[i],
                view.masses[i],
                view.radii[i],
                fds.fgfr,
                fds.erk,
                fds.gata6,
                fds.nanog,
                view.states[i],
                view.diff_counters[i],
                view.div_counters[i],
                view.death_counters[i],
            )?;
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::Cell;

    fn sample_population() -> Population {
        let mut pop = Population::new();
        pop.push(Cell {
            id: 0,
            location: Vec3::new(1e-5, 2e-5, 0.0),
            radius: 5e-6,
            velocity: Vec3::new(1e-9, 0.0, 0.0),
            motility_force: Vec3::ZERO,
            jkr_force: Vec3::ZERO,
            motion: true,
            state: CellState::Pluripotent,
            fds: Fds {
                fgfr: 0,
                erk: 1,
                gata6: 0,
                nanog: 1,
            },
            mass: 1e-12,
            div_counter: 3,
            diff_counter: 0,
            death_counter: 0,
            fds_counter: 0,
            nearest_gata6: None,
            nearest_nanog: None,
            nearest_diff: None,
        });
        pop
    }

    #[test]
    fn csv_sink_writes_header_and_rows() {
        let dir = std::env::temp_dir().join("petri_csv_sink_test");
        let mut sink = CsvSink::new(&dir, "unit").unwrap();
        let pop = sample_population();
        let view = SnapshotView::over(&pop, 4, 7200.0);
        sink.write(&view).unwrap();

        let text = std::fs::read_to_string(dir.join("unit_values_4.csv")).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("X_position,Y_position,Z_position"));
        assert!(header.ends_with("Death_counter"));

        let row = lines.next().unwrap();
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields.len(), 17);
        assert_eq!(fields[6], "true");
        assert_eq!(fields[13], "Pluripotent");
        assert_eq!(fields[15], "3");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn view_tracks_population_length() {
        let pop = sample_population();
        let view = SnapshotView::over(&pop, 0, 0.0);
        assert_eq!(view.len(), 1);
        assert!(!view.is_empty());
    }
}
