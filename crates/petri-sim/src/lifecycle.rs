//! Life-cycle marking and the bulk add/remove protocol.
//!
//! The marking passes (`cell_death`, `cell_diff_surround`,
//! `cell_growth`, `cell_division`) only read the proximity graph and
//! write counters or the two mark arrays; all structural mutation is
//! deferred to `update_queue`, which appends daughters (optionally in
//! staggered groups with a movement pass between them) and then compacts
//! the removal set out of the arrays and both graphs in one atomic step.

use crate::driver::Simulation;
use petri_core::rng::{coin, stream_rng, unit_vector, Stream};
use petri_core::CellState;

impl Simulation {
    /// Lonely pluripotent cells accumulate death; crowded ones recover.
    pub fn cell_death(&mut self) {
        for i in 0..self.pop.len() {
            if self.pop.states[i] != CellState::Pluripotent {
                continue;
            }
            if (self.proximity.degree(i) as u32) < self.config.lonely_threshold {
                self.pop.death_counters[i] += 1;
            } else {
                self.pop.death_counters[i] = 0;
            }
            if self.pop.death_counters[i] >= self.config.death_thresh {
                self.to_remove.push(i);
            }
        }
    }

    /// Differentiated neighbors force a pluripotent cell's GATA6 high.
    pub fn cell_diff_surround(&mut self) {
        let high = self.config.state_space().high();
        let threshold = self.config.diff_surround_threshold as usize;
        for i in 0..self.pop.len() {
            if self.pop.states[i] != CellState::Pluripotent || self.pop.fds[i].gata6 >= high {
                continue;
            }
            let surrounding = self
                .proximity
                .neighbors(i)
                .iter()
                .filter(|&&neighbor| {
                    self.pop.states[neighbor as usize] == CellState::Differentiated
                })
                .count();
            if surrounding >= threshold {
                self.pop.fds[i].gata6 = high;
                self.pop.fds[i].nanog = 0;
            }
        }
    }

    /// Linear radius growth from the division counter, capped at
    /// `max_radius`.
    pub fn cell_growth(&mut self) {
        let max = self.config.max_radius;
        let min = self.config.min_radius;
        let pluri_rate = self.config.pluri_growth();
        let diff_rate = self.config.diff_growth();
        for i in 0..self.pop.len() {
            if self.pop.radii[i] >= max {
                continue;
            }
            let rate = match self.pop.states[i] {
                CellState::Pluripotent => pluri_rate,
                CellState::Differentiated => diff_rate,
            };
            self.pop.radii[i] = (min + rate * f64::from(self.pop.div_counters[i])).min(max);
        }
    }

    /// Mark cells whose division counter crossed its threshold; others
    /// stochastically accumulate. Differentiated division is contact
    /// inhibited.
    pub fn cell_division(&mut self) {
        for i in 0..self.pop.len() {
            let ready = match self.pop.states[i] {
                CellState::Pluripotent => {
                    self.pop.div_counters[i] >= self.config.pluri_div_thresh
                }
                CellState::Differentiated => {
                    self.pop.div_counters[i] >= self.config.diff_div_thresh
                        && (self.proximity.degree(i) as u32) < self.config.contact_inhibition
                }
            };
            if ready {
                self.to_divide.push(i);
            } else {
                let mut rng = stream_rng(
                    self.config.seed,
                    self.step,
                    self.pop.ids[i],
                    Stream::Division,
                );
                self.pop.div_counters[i] += coin(&mut rng);
            }
        }
    }

    /// Apply the accumulated division and removal marks.
    ///
    /// Daughters are staged first so every separation axis uses the
    /// parent's pre-division position, then appended — in batches of
    /// `group_size` with a movement pass after each batch, or all at
    /// once when `group_size` is zero. Removals then compact the arrays
    /// and both graphs together. Returns `true` if any movement pass ran
    /// here, so the step driver can skip its own.
    pub fn update_queue(&mut self) -> bool {
        let dividing = std::mem::take(&mut self.to_divide);
        let mut removing = std::mem::take(&mut self.to_remove);
        if !dividing.is_empty() || !removing.is_empty() {
            log::info!(
                "step {}: adding {} cells, removing {} cells",
                self.step,
                dividing.len(),
                removing.len()
            );
        }

        let spread = self.config.max_radius - self.config.min_radius;
        let bound = self.config.size_vec();
        let mode = self.config.mode();

        let mut daughters = Vec::with_capacity(dividing.len());
        for &parent in &dividing {
            let mut rng = stream_rng(
                self.config.seed,
                self.step,
                self.pop.ids[parent],
                Stream::DivisionAxis,
            );
            let axis = unit_vector(&mut rng, mode) * spread;
            let base = self.pop.locations[parent];

            self.pop.locations[parent] = (base + axis).clamp_to_box(bound);
            self.pop.radii[parent] = self.config.min_radius;
            self.pop.div_counters[parent] = 0;

            // Copied after the parent reset, so the daughter inherits the
            // minimum radius and a cleared counter.
            let mut daughter = self.pop.cell(parent);
            daughter.id = self.next_id;
            self.next_id += 1;
            daughter.location = (base - axis).clamp_to_box(bound);
            daughters.push(daughter);
        }
        self.metrics.total_divided += daughters.len() as u64;

        let mut moved = false;
        let group = self.config.group_size;
        if group > 0 {
            let mut start = 0;
            while start < daughters.len() {
                let end = (start + group).min(daughters.len());
                for daughter in &daughters[start..end] {
                    self.pop.push(daughter.clone());
                }
                self.proximity.add_vertices(end - start);
                self.contact.add_vertices(end - start);
                self.handle_movement();
                moved = true;
                start = end;
            }
        } else {
            let added = daughters.len();
            for daughter in daughters {
                self.pop.push(daughter);
            }
            self.proximity.add_vertices(added);
            self.contact.add_vertices(added);
        }

        removing.sort_unstable();
        removing.dedup();
        self.metrics.total_removed += removing.len() as u64;
        self.pop.compact(&removing);
        self.proximity.delete_vertices(&removing);
        self.contact.delete_vertices(&removing);

        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::population::Cell;
    use petri_core::{Fds, Vec3};

    fn config() -> SimConfig {
        SimConfig {
            size: [4e-4, 4e-4, 0.0],
            resolution: 1e-5,
            num_nanog_high: 0,
            num_gata6_high: 0,
            neighbor_distance: 1e-5,
            lonely_threshold: 1,
            death_thresh: 3,
            pluri_div_thresh: 10,
            diff_div_thresh: 10,
            contact_inhibition: 6,
            diff_surround_threshold: 2,
            motility_force: 0.0,
            induction_step: u64::MAX,
            step_dt: 36.0,
            move_dt: 2.0,
            diffuse_dt: 1.0,
            ..SimConfig::default()
        }
    }

    fn cell(id: u64, x: f64, y: f64, state: CellState) -> Cell {
        Cell {
            id,
            location: Vec3::new(x, y, 0.0),
            radius: 5e-6,
            velocity: Vec3::ZERO,
            motility_force: Vec3::ZERO,
            jkr_force: Vec3::ZERO,
            motion: false,
            state,
            fds: Fds::default(),
            mass: 1e-12,
            div_counter: 0,
            diff_counter: 0,
            death_counter: 0,
            fds_counter: 0,
            nearest_gata6: None,
            nearest_nanog: None,
            nearest_diff: None,
        }
    }

    #[test]
    fn lonely_cells_accumulate_death_and_neighbors_reset_it() {
        let mut sim = Simulation::with_cells(
            config(),
            vec![
                cell(0, 1e-4, 1e-4, CellState::Pluripotent),
                cell(1, 3e-4, 3e-4, CellState::Pluripotent),
            ],
        )
        .unwrap();
        sim.check_neighbors();
        sim.cell_death();
        assert_eq!(sim.population().death_counters, vec![1, 1]);

        // Bring them together: counters reset.
        sim.population_mut().locations[1] = Vec3::new(1.05e-4, 1e-4, 0.0);
        sim.check_neighbors();
        sim.cell_death();
        assert_eq!(sim.population().death_counters, vec![0, 0]);
    }

    #[test]
    fn death_threshold_marks_for_removal() {
        let mut sim =
            Simulation::with_cells(config(), vec![cell(0, 1e-4, 1e-4, CellState::Pluripotent)])
                .unwrap();
        sim.check_neighbors();
        for _ in 0..3 {
            sim.cell_death();
        }
        assert_eq!(sim.to_remove, vec![0]);
    }

    #[test]
    fn differentiated_cells_never_die_of_loneliness() {
        let mut sim =
            Simulation::with_cells(config(), vec![cell(0, 1e-4, 1e-4, CellState::Differentiated)])
                .unwrap();
        sim.check_neighbors();
        for _ in 0..5 {
            sim.cell_death();
        }
        assert!(sim.to_remove.is_empty());
    }

    #[test]
    fn surrounded_pluripotent_cells_turn_gata6_high() {
        let mut sim = Simulation::with_cells(
            config(),
            vec![
                cell(0, 1e-4, 1e-4, CellState::Pluripotent),
                cell(1, 1.05e-4, 1e-4, CellState::Differentiated),
                cell(2, 0.95e-4, 1e-4, CellState::Differentiated),
            ],
        )
        .unwrap();
        sim.population_mut().fds[0].nanog = 1;
        sim.check_neighbors();
        sim.cell_diff_surround();
        let fds = sim.population().fds[0];
        assert_eq!(fds.gata6, 1);
        assert_eq!(fds.nanog, 0);
        // The state tag itself does not flip here.
        assert_eq!(sim.population().states[0], CellState::Pluripotent);
    }

    #[test]
    fn growth_tracks_the_division_counter() {
        let mut sim =
            Simulation::with_cells(config(), vec![cell(0, 1e-4, 1e-4, CellState::Pluripotent)])
                .unwrap();
        sim.population_mut().div_counters[0] = 5;
        sim.cell_growth();
        let expected = 5e-6 + sim.config().pluri_growth() * 5.0;
        assert!((sim.population().radii[0] - expected).abs() < 1e-18);

        // Far past the threshold the radius caps at the maximum.
        sim.population_mut().div_counters[0] = 1_000;
        sim.cell_growth();
        assert_eq!(sim.population().radii[0], sim.config().max_radius);
    }

    #[test]
    fn division_marks_ready_cells() {
        let mut sim = Simulation::with_cells(
            config(),
            vec![
                cell(0, 1e-4, 1e-4, CellState::Pluripotent),
                cell(1, 3e-4, 3e-4, CellState::Pluripotent),
            ],
        )
        .unwrap();
        sim.population_mut().div_counters[0] = 10;
        sim.check_neighbors();
        sim.cell_division();
        assert_eq!(sim.to_divide, vec![0]);
    }

    #[test]
    fn crowded_differentiated_cells_are_contact_inhibited() {
        // Seven differentiated cells packed within r_n of the center.
        let mut cells = vec![cell(0, 2e-4, 2e-4, CellState::Differentiated)];
        for index in 0..6u64 {
            let angle = index as f64 * std::f64::consts::TAU / 6.0;
            cells.push(cell(
                index + 1,
                2e-4 + 9e-6 * angle.cos(),
                2e-4 + 9e-6 * angle.sin(),
                CellState::Differentiated,
            ));
        }
        let mut sim = Simulation::with_cells(config(), cells).unwrap();
        sim.population_mut().div_counters[0] = 10;
        sim.check_neighbors();
        sim.cell_division();
        assert!(
            !sim.to_divide.contains(&0),
            "crowded differentiated cell must not divide"
        );
    }

    #[test]
    fn update_queue_appends_daughters_and_clears_marks() {
        let mut sim = Simulation::with_cells(
            config(),
            vec![
                cell(0, 1e-4, 1e-4, CellState::Pluripotent),
                cell(1, 3e-4, 3e-4, CellState::Pluripotent),
            ],
        )
        .unwrap();
        sim.to_divide.push(0);
        let moved = sim.update_queue();

        assert!(!moved, "group_size 0 defers movement to the step driver");
        let pop = sim.population();
        assert_eq!(pop.len(), 3);
        assert_eq!(pop.ids[2], 2, "daughter gets a fresh id");
        assert_eq!(pop.radii[0], 5e-6);
        assert_eq!(pop.radii[2], 5e-6);
        assert_eq!(pop.div_counters[0], 0);
        assert_eq!(pop.div_counters[2], 0);
        assert_eq!(sim.proximity().vertex_count(), 3);
        assert_eq!(sim.contact().vertex_count(), 3);
        assert!(sim.to_divide.is_empty());

        // Parent and daughter sit 2·(r_max − r_min) apart.
        let gap = pop.locations[0].distance(pop.locations[2]);
        assert!((gap - 2e-6).abs() < 1e-12);
    }

    #[test]
    fn update_queue_removes_marked_cells_from_arrays_and_graphs() {
        let mut sim = Simulation::with_cells(
            config(),
            vec![
                cell(0, 1e-4, 1e-4, CellState::Pluripotent),
                cell(1, 1.05e-4, 1e-4, CellState::Pluripotent),
                cell(2, 3e-4, 3e-4, CellState::Pluripotent),
            ],
        )
        .unwrap();
        sim.check_neighbors();
        assert!(sim.proximity().contains_edge(0, 1));

        sim.to_remove.push(1);
        sim.update_queue();

        let pop = sim.population();
        assert_eq!(pop.len(), 2);
        assert_eq!(pop.ids, vec![0, 2]);
        assert_eq!(sim.proximity().vertex_count(), 2);
        assert_eq!(sim.contact().vertex_count(), 2);
        assert_eq!(sim.proximity().edge_count(), 0);
    }

    #[test]
    fn population_balance_matches_the_marks() {
        let mut sim = Simulation::with_cells(
            config(),
            vec![
                cell(0, 1e-4, 1e-4, CellState::Pluripotent),
                cell(1, 2e-4, 2e-4, CellState::Pluripotent),
                cell(2, 3e-4, 3e-4, CellState::Pluripotent),
            ],
        )
        .unwrap();
        sim.to_divide.extend([0, 2]);
        sim.to_remove.push(1);
        sim.update_queue();

        // N' = N + |to_divide| − |to_remove|.
        assert_eq!(sim.population().len(), 4);
        assert_eq!(sim.metrics().total_divided, 2);
        assert_eq!(sim.metrics().total_removed, 1);
        // Fresh vertices carry no edges.
        for vertex in 0..4 {
            assert_eq!(sim.contact().degree(vertex), 0);
        }
    }

    proptest::proptest! {
        #[test]
        fn queue_balance_holds_for_random_marks(
            population in 1usize..24,
            divide_marks in proptest::collection::btree_set(0usize..24, 0..8),
            remove_marks in proptest::collection::btree_set(0usize..24, 0..8),
        ) {
            let mut cells = Vec::new();
            for index in 0..population as u64 {
                let column = (index % 5) as f64;
                let row = (index / 5) as f64;
                cells.push(cell(
                    index,
                    4e-5 + column * 7e-5,
                    4e-5 + row * 7e-5,
                    CellState::Pluripotent,
                ));
            }
            let mut sim = Simulation::with_cells(config(), cells).unwrap();
            sim.check_neighbors();

            let divide: Vec<usize> =
                divide_marks.into_iter().map(|i| i % population).collect();
            let remove: Vec<usize> =
                remove_marks.into_iter().map(|i| i % population).collect();
            // Marks come from distinct passes over distinct cells, so the
            // modulo fold can alias; dedup the way the passes would.
            let divide: std::collections::BTreeSet<usize> = divide.into_iter().collect();
            let remove: std::collections::BTreeSet<usize> = remove.into_iter().collect();

            sim.to_divide.extend(divide.iter().copied());
            sim.to_remove.extend(remove.iter().copied());
            sim.update_queue();

            // N' = N + |to_divide| − |to_remove|.
            proptest::prop_assert_eq!(
                sim.population().len(),
                population + divide.len() - remove.len()
            );
            proptest::prop_assert!(sim.population().alignment_error().is_none());
            proptest::prop_assert_eq!(
                sim.proximity().vertex_count(),
                sim.population().len()
            );
            proptest::prop_assert_eq!(
                sim.contact().vertex_count(),
                sim.population().len()
            );
            // Every appended daughter starts with no edges in either graph.
            for vertex in population - remove.len()..sim.population().len() {
                proptest::prop_assert_eq!(sim.contact().degree(vertex), 0);
            }
        }
    }

    #[test]
    fn grouped_appends_run_movement_between_batches() {
        let mut cfg = config();
        cfg.group_size = 4;
        let mut cells = Vec::new();
        for index in 0..10u64 {
            let column = (index % 4) as f64;
            let row = (index / 4) as f64;
            cells.push(cell(
                index,
                5e-5 + column * 8e-5,
                5e-5 + row * 8e-5,
                CellState::Pluripotent,
            ));
        }
        let mut sim = Simulation::with_cells(cfg, cells).unwrap();
        sim.to_divide.extend(0..10);
        let moved = sim.update_queue();

        assert!(moved);
        assert_eq!(sim.population().len(), 20);
        // ceil(10 / 4) = 3 staggered movement passes.
        assert_eq!(sim.metrics().movement_calls, 3);
    }
}
