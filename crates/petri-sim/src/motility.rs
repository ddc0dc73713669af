//! Active motility: nearest-of-type caching and the two rulesets.
//!
//! Both rulesets share the crowding rule (six or more proximity
//! neighbors suppresses active motion) and fall back to a random unit
//! direction whenever no guidance target exists. The standard ruleset is
//! the default; the NetLogo-style alternate only re-evaluates cells that
//! were already moving.

use crate::config::MotilityRuleset;
use crate::driver::Simulation;
use petri_core::rng::{stream_rng, unit_vector, Stream};
use petri_core::{CellState, Vec3};
use petri_space::BinGrid;
use rayon::prelude::*;

/// Proximity degree at which crowding suppresses active motion.
const CROWDING_DEGREE: usize = 6;

impl Simulation {
    /// Cache, for every cell, the nearest GATA6-high, NANOG-high, and
    /// differentiated cell within `nearest_distance`.
    ///
    /// A cell classifies as differentiated first; otherwise by whichever
    /// of GATA6/NANOG dominates. Ties classify as neither.
    pub fn cache_nearest(&mut self) {
        let count = self.pop.len();
        if count == 0 {
            return;
        }
        let reach = self.config.nearest_distance;
        let grid = BinGrid::assign(
            &self.pop.locations,
            self.config.size_vec(),
            reach,
            self.caps.nearest_bin,
        );
        self.caps.nearest_bin = grid.capacity();

        let locations = &self.pop.locations;
        let states = &self.pop.states;
        let fds = &self.pop.fds;
        let nearest: Vec<[Option<u32>; 3]> = (0..count)
            .into_par_iter()
            .map(|focus| {
                // Best-so-far per slot: GATA6-high, NANOG-high,
                // differentiated. Distances start at twice the reach.
                let mut best: [(Option<u32>, f64); 3] = [(None, reach * 2.0); 3];
                for candidate in grid.cells_near(focus) {
                    let candidate = candidate as usize;
                    if candidate == focus {
                        continue;
                    }
                    let mag = locations[focus].distance(locations[candidate]);
                    if mag > reach {
                        continue;
                    }
                    let slot = if states[candidate] == CellState::Differentiated {
                        2
                    } else if fds[candidate].gata6 > fds[candidate].nanog {
                        0
                    } else if fds[candidate].nanog > fds[candidate].gata6 {
                        1
                    } else {
                        continue;
                    };
                    if mag < best[slot].1 {
                        best[slot] = (Some(candidate as u32), mag);
                    }
                }
                [best[0].0, best[1].0, best[2].0]
            })
            .collect();

        for (index, [gata6, nanog, diff]) in nearest.into_iter().enumerate() {
            self.pop.nearest_gata6[index] = gata6;
            self.pop.nearest_nanog[index] = nanog;
            self.pop.nearest_diff[index] = diff;
        }
    }

    /// Write this step's active motility forces.
    pub fn cell_motility(&mut self) {
        match self.config.motility_ruleset {
            MotilityRuleset::Standard => self.motility_standard(),
            MotilityRuleset::Netlogo => self.motility_netlogo(),
        }
    }

    fn motility_standard(&mut self) {
        let f_mot = self.config.motility_force;
        let mode = self.config.mode();
        let seed = self.config.seed;
        let step = self.step;
        let guye = self.config.guye_move;
        let eunbi = self.config.eunbi_move;

        let pop = &mut self.pop;
        let proximity = &self.proximity;
        let locations = &pop.locations;
        let states = &pop.states;
        let fds = &pop.fds;
        let ids = &pop.ids;
        let nearest_gata6 = &pop.nearest_gata6;
        let nearest_nanog = &pop.nearest_nanog;
        let nearest_diff = &pop.nearest_diff;

        pop.motility_forces
            .par_iter_mut()
            .zip(pop.motion.par_iter_mut())
            .enumerate()
            .for_each(|(i, (force, moving))| {
                if proximity.degree(i) >= CROWDING_DEGREE {
                    *moving = false;
                    return;
                }
                *moving = true;

                let random_direction = || {
                    let mut rng = stream_rng(seed, step, ids[i], Stream::Motility);
                    unit_vector(&mut rng, mode)
                };
                let toward = |target: u32| (locations[target as usize] - locations[i]).normalized();

                if states[i] == CellState::Differentiated {
                    // Flee the surrounding NANOG-high cells as a group.
                    let mut sum = Vec3::ZERO;
                    let mut found = 0usize;
                    for &neighbor in proximity.neighbors(i) {
                        let neighbor = neighbor as usize;
                        if fds[neighbor].nanog > fds[neighbor].gata6 {
                            found += 1;
                            sum += (locations[neighbor] - locations[i]).normalized();
                        }
                    }
                    if found > 0 {
                        *force += -(sum.normalized() * f_mot);
                    } else {
                        *force += random_direction() * f_mot;
                    }
                } else if fds[i].gata6 > fds[i].nanog {
                    match nearest_diff[i] {
                        Some(target) if guye => *force += toward(target) * f_mot,
                        _ => *force += random_direction() * f_mot,
                    }
                } else if fds[i].nanog > fds[i].gata6 {
                    if eunbi {
                        if let Some(target) = nearest_gata6[i] {
                            *force += -(toward(target) * f_mot);
                        } else if let Some(target) = nearest_nanog[i] {
                            *force += toward(target) * f_mot;
                        } else {
                            *force += random_direction() * f_mot;
                        }
                    } else {
                        *force += random_direction() * f_mot;
                    }
                } else {
                    *force += random_direction() * f_mot;
                }
            });
    }

    fn motility_netlogo(&mut self) {
        let f_mot = self.config.motility_force;
        let mode = self.config.mode();
        let seed = self.config.seed;
        let step = self.step;

        let pop = &mut self.pop;
        let proximity = &self.proximity;
        let locations = &pop.locations;
        let states = &pop.states;
        let fds = &pop.fds;
        let ids = &pop.ids;
        let nearest_gata6 = &pop.nearest_gata6;
        let nearest_nanog = &pop.nearest_nanog;
        let nearest_diff = &pop.nearest_diff;

        pop.motility_forces
            .par_iter_mut()
            .zip(pop.motion.par_iter_mut())
            .enumerate()
            .for_each(|(i, (force, moving))| {
                if !*moving {
                    return;
                }
                if proximity.degree(i) >= CROWDING_DEGREE {
                    *moving = false;
                    return;
                }

                let random_direction = || {
                    let mut rng = stream_rng(seed, step, ids[i], Stream::Motility);
                    unit_vector(&mut rng, mode)
                };
                let toward = |target: u32| (locations[target as usize] - locations[i]).normalized();

                if states[i] == CellState::Differentiated {
                    match nearest_nanog[i] {
                        Some(target) => *force += -(toward(target) * f_mot),
                        None => *force += random_direction() * f_mot,
                    }
                } else if fds[i].gata6 > fds[i].nanog {
                    match nearest_diff[i] {
                        Some(target) => *force += toward(target) * f_mot,
                        None => *force += random_direction() * f_mot,
                    }
                } else if fds[i].nanog > fds[i].gata6 {
                    // Mostly guided with a small random component.
                    if let Some(target) = nearest_nanog[i] {
                        *force += toward(target) * (f_mot * 0.8);
                        *force += random_direction() * (f_mot * 0.2);
                    } else if let Some(target) = nearest_gata6[i] {
                        *force += -(toward(target) * f_mot);
                    } else {
                        *force += random_direction() * f_mot;
                    }
                } else {
                    *force += random_direction() * f_mot;
                }
            });
    }
}
