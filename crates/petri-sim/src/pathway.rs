//! The per-cell regulatory update and its coupling to the FGF4 field.
//!
//! Order per cell: secrete FGF4 in proportion to NANOG, sample and
//! quantize the local concentration, advance the discrete network every
//! `T_fds` steps, deduct any FGFR increase from the field (receptor
//! binding; decreases are not refunded), then accumulate the stochastic
//! differentiation counter while GATA6 sits at the high level.

use crate::config::FGF4;
use crate::driver::Simulation;
use petri_core::rng::{coin, stream_rng, Stream};
use petri_core::CellState;

impl Simulation {
    /// Advance every cell's regulatory state one macro-step.
    pub fn cell_pathway(&mut self) {
        let space = self.config.state_space();
        let c_max = self.config.max_concentration;
        let update_every = self.config.fds_thresh.max(1);
        let induced = self.step >= self.config.induction_step;
        let pluri_to_diff = self.config.pluri_to_diff;
        let seed = self.config.seed;
        let step = self.step;

        let pop = &mut self.pop;
        let Some(fgf4) = self.gradients.get_mut(FGF4) else {
            // Construction guarantees the gradient; nothing to do without it.
            return;
        };

        for i in 0..pop.len() {
            let location = pop.locations[i];

            // NANOG-high cells source FGF4 into their own grid point.
            if pop.fds[i].nanog > 0 {
                fgf4.adjust_nearest(location, f64::from(pop.fds[i].nanog));
            }

            if !induced {
                continue;
            }

            let concentration = fgf4.concentration_at(location);
            let quantized = space.quantize(concentration, c_max);

            if pop.fds_counters[i] % update_every == 0 {
                let previous_fgfr = pop.fds[i].fgfr;
                let next = pop.fds[i].advance(quantized, space);
                // Receptor binding consumes the FGF4 that raised FGFR.
                if next.fgfr > previous_fgfr {
                    fgf4.adjust_nearest(location, -f64::from(next.fgfr - previous_fgfr));
                }
                pop.fds[i] = next;
            }
            pop.fds_counters[i] += 1;

            if pop.fds[i].gata6 == space.high() && pop.states[i] == CellState::Pluripotent {
                let mut rng = stream_rng(seed, step, pop.ids[i], Stream::Differentiation);
                pop.diff_counters[i] += coin(&mut rng);
                if pop.diff_counters[i] >= pluri_to_diff {
                    pop.states[i] = CellState::Differentiated;
                    pop.fds[i].nanog = 0;
                    pop.motion[i] = true;
                }
            }
        }
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
            size: [1e-4, 1e-4, 0.0],
            resolution: 1e-5,
            num_nanog_high: 0,
            num_gata6_high: 0,
            max_concentration: 30.0,
            fds_thresh: 1,
            pluri_to_diff: 2,
            motility_force: 0.0,
            ..SimConfig::default()
        }
    }

    fn cell(id: u64, fds: Fds) -> Cell {
        Cell {
            id,
            location: Vec3::new(5e-5, 5e-5, 0.0),
            radius: 5e-6,
            velocity: Vec3::ZERO,
            motility_force: Vec3::ZERO,
            jkr_force: Vec3::ZERO,
            motion: false,
            state: CellState::Pluripotent,
            fds,
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
    fn nanog_high_cells_secrete_fgf4() {
        let mut sim = Simulation::with_cells(
            config(),
            vec![cell(
                0,
                Fds {
                    fgfr: 0,
                    erk: 0,
                    gata6: 0,
                    nanog: 1,
                },
            )],
        )
        .unwrap();
        sim.cell_pathway();
        let fgf4 = sim.gradients().get("fgf4").unwrap();
        assert!(
            fgf4.concentration_at(Vec3::new(5e-5, 5e-5, 0.0)) >= 1.0,
            "secretion must deposit at the cell's grid point"
        );
    }

    #[test]
    fn induction_gate_defers_the_network() {
        let mut cfg = config();
        cfg.induction_step = 100;
        let mut sim = Simulation::with_cells(
            cfg,
            vec![cell(
                0,
                Fds {
                    fgfr: 0,
                    erk: 0,
                    gata6: 0,
                    nanog: 1,
                },
            )],
        )
        .unwrap();
        sim.cell_pathway();
        let pop = sim.population();
        // Secretion still happened, but no update ran.
        assert_eq!(pop.fds_counters[0], 0);
        assert_eq!(pop.fds[0].nanog, 1);
        assert!(
            sim.gradients()
                .get("fgf4")
                .unwrap()
                .concentration_at(Vec3::new(5e-5, 5e-5, 0.0))
                >= 1.0
        );
    }

    #[test]
    fn fgfr_increase_binds_fgf4_from_the_field() {
        // Saturate the field so quantization reads high, with GATA6 high
        // so FGFR' = fgf4·gata6 = 1.
        let mut sim = Simulation::with_cells(
            config(),
            vec![cell(
                0,
                Fds {
                    fgfr: 0,
                    erk: 0,
                    gata6: 1,
                    nanog: 0,
                },
            )],
        )
        .unwrap();
        let location = Vec3::new(5e-5, 5e-5, 0.0);
        sim.gradients_mut()
            .get_mut("fgf4")
            .unwrap()
            .adjust_nearest(location, 30.0);

        sim.cell_pathway();

        let pop = sim.population();
        assert_eq!(pop.fds[0].fgfr, 1, "FGFR should rise on high FGF4");
        let remaining = sim
            .gradients()
            .get("fgf4")
            .unwrap()
            .concentration_at(location);
        assert!(
            (remaining - 29.0).abs() < 1e-12,
            "binding should deduct the FGFR increase, left {remaining}"
        );
    }

    #[test]
    fn fgfr_decrease_is_not_refunded() {
        // FGFR falls from 1 to 0 with no FGF4 around; the field stays
        // untouched.
        let mut sim = Simulation::with_cells(
            config(),
            vec![cell(
                0,
                Fds {
                    fgfr: 1,
                    erk: 0,
                    gata6: 0,
                    nanog: 0,
                },
            )],
        )
        .unwrap();
        sim.cell_pathway();
        let pop = sim.population();
        assert_eq!(pop.fds[0].fgfr, 0);
        let fgf4 = sim.gradients().get("fgf4").unwrap();
        assert_eq!(fgf4.total_mass(), 0.0);
    }

    #[test]
    fn fds_updates_respect_the_update_interval() {
        let mut cfg = config();
        cfg.fds_thresh = 3;
        let mut sim = Simulation::with_cells(
            cfg,
            vec![cell(
                0,
                Fds {
                    fgfr: 0,
                    erk: 0,
                    gata6: 0,
                    nanog: 0,
                },
            )],
        )
        .unwrap();
        // All-zero state maps to GATA6 = 1 on update. Counter 0 updates,
        // counters 1 and 2 do not.
        sim.cell_pathway();
        assert_eq!(sim.population().fds[0].gata6, 1);
        let reverted = Fds {
            fgfr: 0,
            erk: 0,
            gata6: 0,
            nanog: 0,
        };
        sim.population_mut().fds[0] = reverted;
        sim.cell_pathway();
        assert_eq!(sim.population().fds[0].gata6, 0, "no update at counter 1");
        sim.cell_pathway();
        assert_eq!(sim.population().fds[0].gata6, 0, "no update at counter 2");
        sim.cell_pathway();
        assert_eq!(sim.population().fds[0].gata6, 1, "update at counter 3");
    }

    #[test]
    fn gata6_high_cells_eventually_differentiate() {
        // GATA6 held high by its own update rule (x4²(x5+1)… keeps 1 for
        // the Boolean network) drives the differentiation counter.
        let mut sim = Simulation::with_cells(
            config(),
            vec![cell(
                0,
                Fds {
                    fgfr: 0,
                    erk: 0,
                    gata6: 1,
                    nanog: 0,
                },
            )],
        )
        .unwrap();
        for _ in 0..64 {
            sim.cell_pathway();
            sim.step += 1;
            if sim.population().states[0] == CellState::Differentiated {
                break;
            }
        }
        let pop = sim.population();
        assert_eq!(pop.states[0], CellState::Differentiated);
        assert_eq!(pop.fds[0].nanog, 0);
        assert!(pop.motion[0], "differentiation re-enables motion");
    }
}
