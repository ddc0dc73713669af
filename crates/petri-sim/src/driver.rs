//! The step driver: phase ordering, counters, and snapshot emission.
//!
//! Each macro-step executes the same phase sequence:
//!
//! 1. `check_neighbors` — rebuild the proximity graph at `r_n`
//! 2. `cache_nearest` — cache nearest-of-type indices at `r_near`
//! 3. `cell_death`, `cell_diff_surround`, `cell_growth`,
//!    `cell_division`, `cell_pathway`
//! 4. `cell_motility`
//! 5. `update_diffusion`
//! 6. `update_queue` — bulk divide/remove, staggered by `group_size`
//! 7. `handle_movement` — unless `update_queue` already moved the batches
//! 8. snapshot, invariant check, clock increment
//!
//! No phase observes the structural mutation of a later phase; cell
//! indices captured before `update_queue` are invalid afterwards.

use crate::config::{ConfigError, SimConfig};
use crate::output::{CsvSink, SnapshotSink, SnapshotView};
use crate::population::{Cell, Population};
use petri_core::rng::{self, Stream};
use petri_core::{CellState, Fds, Mode, Phase, SimError, Vec3};
use petri_field::{Gradient, GradientSet};
use petri_graph::CellGraph;
use petri_space::{pairs_within, BinGrid};
use rand::Rng;

/// Consecutive snapshot failures tolerated before the run aborts.
const MAX_SNAPSHOT_FAILURES: u32 = 3;

/// Cumulative run counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepMetrics {
    /// Total `handle_movement` invocations, including the staggered calls
    /// made during division batches.
    pub movement_calls: u64,
    /// Total daughters appended.
    pub total_divided: u64,
    /// Total cells removed.
    pub total_removed: u64,
}

/// Search-capacity high-water marks.
///
/// These persist across steps and only ever grow (by doubling inside the
/// binning and search layers), trading space for allocation-free steady
/// state.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SearchCapacities {
    pub neighbor_bin: usize,
    pub neighbor_edges: usize,
    pub contact_bin: usize,
    pub contact_edges: usize,
    pub nearest_bin: usize,
}

impl Default for SearchCapacities {
    fn default() -> Self {
        Self {
            neighbor_bin: 5,
            neighbor_edges: 5,
            contact_bin: 5,
            contact_edges: 5,
            nearest_bin: 5,
        }
    }
}

/// A running simulation: population, graphs, gradients, and clock.
pub struct Simulation {
    pub(crate) config: SimConfig,
    pub(crate) pop: Population,
    pub(crate) proximity: CellGraph,
    pub(crate) contact: CellGraph,
    pub(crate) gradients: GradientSet,
    pub(crate) step: u64,
    pub(crate) time: f64,
    pub(crate) to_divide: Vec<usize>,
    pub(crate) to_remove: Vec<usize>,
    pub(crate) caps: SearchCapacities,
    pub(crate) next_id: u64,
    pub(crate) metrics: StepMetrics,
    sinks: Vec<Box<dyn SnapshotSink>>,
    snapshot_failures: u32,
}

impl Simulation {
    /// Build a simulation with the configured initial population:
    /// `num_nanog_high` NANOG-high and `num_gata6_high` GATA6-high
    /// pluripotent cells at seeded-random positions, with randomized
    /// counters so that transitions desynchronize.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let space = config.state_space();
        let high = space.high();
        let modulus = space.modulus();
        let total = config.num_nanog_high + config.num_gata6_high;

        let mut cells = Vec::with_capacity(total);
        for index in 0..total {
            let mut rng = rng::stream_rng(config.seed, 0, index as u64, Stream::Setup);
            let location = Vec3::new(
                rng.random::<f64>() * config.size[0],
                rng.random::<f64>() * config.size[1],
                match config.mode() {
                    Mode::TwoD => 0.0,
                    Mode::ThreeD => rng.random::<f64>() * config.size[2],
                },
            );
            let nanog_high = index < config.num_nanog_high;
            let fds = Fds {
                fgfr: rng.random_range(0..modulus),
                erk: rng.random_range(0..modulus),
                gata6: if nanog_high { 0 } else { high },
                nanog: if nanog_high { high } else { 0 },
            };
            let div_counter = rng.random_range(0..config.pluri_div_thresh.max(1));
            let death_counter = rng.random_range(0..config.death_thresh.max(1));
            let diff_counter = rng.random_range(0..(config.pluri_to_diff / 2).max(1));
            let radius = (config.min_radius + config.pluri_growth() * f64::from(div_counter))
                .min(config.max_radius);

            cells.push(Cell {
                id: index as u64,
                location,
                radius,
                velocity: Vec3::ZERO,
                motility_force: Vec3::ZERO,
                jkr_force: Vec3::ZERO,
                motion: true,
                state: CellState::Pluripotent,
                fds,
                mass: config.cell_mass,
                div_counter,
                diff_counter,
                death_counter,
                fds_counter: 0,
                nearest_gata6: None,
                nearest_nanog: None,
                nearest_diff: None,
            });
        }
        Self::with_cells(config, cells)
    }

    /// Build a simulation over an explicit initial population. Used by
    /// scenario setups and tests that need exact placements.
    pub fn with_cells(config: SimConfig, cells: Vec<Cell>) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut gradients = GradientSet::new();
        for def in &config.gradients {
            gradients.insert(Gradient::new(
                def.name.as_str(),
                config.size_vec(),
                config.mode(),
                config.resolution,
                def.diffusivity,
                config.max_concentration,
                def.initial,
            ));
        }

        let mut pop = Population::new();
        let mut next_id = 0u64;
        for cell in cells {
            next_id = next_id.max(cell.id + 1);
            pop.push(cell);
        }
        let count = pop.len();

        Ok(Self {
            config,
            pop,
            proximity: CellGraph::with_vertices(count),
            contact: CellGraph::with_vertices(count),
            gradients,
            step: 0,
            time: 0.0,
            to_divide: Vec::new(),
            to_remove: Vec::new(),
            caps: SearchCapacities::default(),
            next_id,
            metrics: StepMetrics::default(),
            sinks: Vec::new(),
            snapshot_failures: 0,
        })
    }

    /// Register a snapshot sink.
    pub fn add_sink(&mut self, sink: Box<dyn SnapshotSink>) {
        self.sinks.push(sink);
    }

    /// Register the standard CSV sink, writing under
    /// `<output_dir>/<name>/`.
    pub fn add_csv_sink(&mut self) -> std::io::Result<()> {
        let directory = self.config.output_dir.join(&self.config.name);
        let sink = CsvSink::new(directory, self.config.name.clone())?;
        self.add_sink(Box::new(sink));
        Ok(())
    }

    /// The configuration this simulation runs under.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Current macro-step counter.
    pub fn current_step(&self) -> u64 {
        self.step
    }

    /// Current simulation time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Cumulative run counters.
    pub fn metrics(&self) -> StepMetrics {
        self.metrics
    }

    /// The live population.
    pub fn population(&self) -> &Population {
        &self.pop
    }

    /// Mutable access to the population, for scenario setup.
    pub fn population_mut(&mut self) -> &mut Population {
        &mut self.pop
    }

    /// The proximity graph as of the last `check_neighbors`.
    pub fn proximity(&self) -> &CellGraph {
        &self.proximity
    }

    /// The contact (adhesion) graph.
    pub fn contact(&self) -> &CellGraph {
        &self.contact
    }

    /// The morphogen gradients.
    pub fn gradients(&self) -> &GradientSet {
        &self.gradients
    }

    /// Mutable access to the gradients, for scenario setup.
    pub fn gradients_mut(&mut self) -> &mut GradientSet {
        &mut self.gradients
    }

    /// Advance the simulation to `end_time`, emitting one snapshot per
    /// macro-step.
    pub fn run(&mut self) -> Result<(), SimError> {
        while self.time < self.config.end_time {
            self.step()?;
        }
        for sink in &mut self.sinks {
            if let Err(err) = sink.finish() {
                log::warn!("snapshot sink finish failed: {err}");
            }
        }
        Ok(())
    }

    /// Execute one macro-step.
    pub fn step(&mut self) -> Result<(), SimError> {
        log::debug!("step {}: {} cells", self.step, self.pop.len());

        self.check_neighbors();
        self.cache_nearest();
        self.cell_death();
        self.cell_diff_surround();
        self.cell_growth();
        self.cell_division();
        self.cell_pathway();
        self.cell_motility();
        self.update_diffusion();
        let moved_in_queue = self.update_queue();
        if !moved_in_queue {
            self.handle_movement();
        }

        self.verify_invariants()?;
        self.emit_snapshot()?;

        self.step += 1;
        self.time += self.config.step_dt;
        Ok(())
    }

    /// Rebuild the proximity graph: clear all edges, then add every pair
    /// within `neighbor_distance`.
    pub fn check_neighbors(&mut self) {
        self.proximity.clear_edges();
        let grid = BinGrid::assign(
            &self.pop.locations,
            self.config.size_vec(),
            self.config.neighbor_distance,
            self.caps.neighbor_bin,
        );
        self.caps.neighbor_bin = grid.capacity();
        let found = pairs_within(
            &grid,
            &self.pop.locations,
            self.config.neighbor_distance,
            self.caps.neighbor_edges,
        );
        self.caps.neighbor_edges = found.max_per_cell;
        self.proximity.add_edges(&found.edges);
    }

    /// Advance every gradient by one macro-step of diffusion.
    pub fn update_diffusion(&mut self) {
        let (step_dt, diffuse_dt) = (self.config.step_dt, self.config.diffuse_dt);
        for gradient in self.gradients.iter_mut() {
            gradient.diffuse(step_dt, diffuse_dt);
        }
    }

    /// Check the structural invariants that must hold at the end of every
    /// macro-step.
    fn verify_invariants(&self) -> Result<(), SimError> {
        let count = self.pop.len();
        if let Some(reason) = self.pop.alignment_error() {
            return Err(SimError::InvariantViolation {
                phase: Phase::UpdateQueue,
                step: self.step,
                cell: None,
                reason,
            });
        }
        for (graph, name) in [(&self.proximity, "proximity"), (&self.contact, "contact")] {
            if graph.vertex_count() != count {
                return Err(SimError::InvariantViolation {
                    phase: Phase::UpdateQueue,
                    step: self.step,
                    cell: None,
                    reason: format!(
                        "{name} graph has {} vertices, expected {count}",
                        graph.vertex_count()
                    ),
                });
            }
        }

        let bound = self.config.size_vec();
        for (index, location) in self.pop.locations.iter().enumerate() {
            if !location.within_box(bound) {
                return Err(SimError::InvariantViolation {
                    phase: Phase::HandleMovement,
                    step: self.step,
                    cell: Some(index),
                    reason: format!("position {location:?} outside the domain after clamping"),
                });
            }
        }
        for (index, &radius) in self.pop.radii.iter().enumerate() {
            if !(self.config.min_radius..=self.config.max_radius).contains(&radius) {
                return Err(SimError::InvariantViolation {
                    phase: Phase::CellGrowth,
                    step: self.step,
                    cell: Some(index),
                    reason: format!("radius {radius} outside the configured bounds"),
                });
            }
        }
        Ok(())
    }

    /// Hand the current population to every registered sink.
    ///
    /// Individual failures are logged; the run only aborts after
    /// [`MAX_SNAPSHOT_FAILURES`] consecutive failing steps.
    fn emit_snapshot(&mut self) -> Result<(), SimError> {
        if self.sinks.is_empty() {
            return Ok(());
        }
        let view = SnapshotView::over(&self.pop, self.step, self.time);
        let mut last_failure = None;
        for sink in &mut self.sinks {
            if let Err(err) = sink.write(&view) {
                log::warn!("snapshot failed at step {}: {err}", view.step);
                last_failure = Some(err.to_string());
            }
        }
        match last_failure {
            Some(reason) => {
                self.snapshot_failures += 1;
                if self.snapshot_failures >= MAX_SNAPSHOT_FAILURES {
                    return Err(SimError::SnapshotIo {
                        step: self.step,
                        reason,
                    });
                }
            }
            None => self.snapshot_failures = 0,
        }
        Ok(())
    }
}
