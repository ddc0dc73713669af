//! Adhesive/repulsive contact mechanics and the motion integrator.
//!
//! Forces follow the JKR contact model in its polynomial nondimensional
//! approximation. Adhesive bonds are edges of the contact graph: the
//! graph is additive across sub-steps (tension must be able to develop
//! over several sub-steps) and an edge is only removed once the
//! nondimensional overlap falls past the bond-break point.
//!
//! Positions integrate under Stokes drag and clamp componentwise to the
//! domain; boundary handling is sticky, never reflective.

use crate::driver::Simulation;
use crate::population::Population;
use petri_core::Vec3;
use petri_space::{contact_pairs, BinGrid};
use rayon::prelude::*;
use std::f64::consts::PI;

/// Poisson's ratio of a cell; 0.5 is incompressible.
pub const POISSON_RATIO: f64 = 0.5;
/// Young's modulus of a cell in Pa.
pub const YOUNGS_MODULUS: f64 = 1_000.0;
/// Adhesion constant γ in kg/s, from P. Pathmanathan et al.
pub const ADHESION_CONSTANT: f64 = 1.07e-4;
/// Viscosity of the medium in Ns/m, for Stokes friction.
pub const MEDIUM_VISCOSITY: f64 = 10_000.0;
/// Nondimensional overlap below which an adhesive bond breaks.
pub const BOND_BREAK_OVERLAP: f64 = -0.360_562;

/// Polynomial approximation of the nondimensionalized JKR force.
///
/// Positive values are repulsive, negative adhesive; the physical force
/// is `f(d) · π·γ·R̂`.
pub fn nondimensional_force(d: f64) -> f64 {
    -0.0204 * d * d * d + 0.4942 * d * d + 1.0801 * d - 1.324
}

/// Outcome of evaluating one contact edge.
enum Bond {
    /// Apply this force to the first endpoint (negated for the second).
    Hold(Vec3),
    /// The bond snapped; prune the edge and apply no force.
    Break,
}

/// Evaluate the JKR interaction across one edge.
fn evaluate_bond(locations: &[Vec3], radii: &[f64], a: usize, b: usize) -> Bond {
    let separation = locations[a] - locations[b];
    let mag = separation.magnitude();
    let overlap = radii[a] + radii[b] - mag;

    let e_hat = 1.0
        / ((1.0 - POISSON_RATIO * POISSON_RATIO) / YOUNGS_MODULUS
            + (1.0 - POISSON_RATIO * POISSON_RATIO) / YOUNGS_MODULUS);
    let r_hat = 1.0 / (1.0 / radii[a] + 1.0 / radii[b]);

    // Overlap scale at which adhesion normalizes, δ₀.
    let overlap_scale = ((PI * ADHESION_CONSTANT) / e_hat).powf(2.0 / 3.0) * r_hat.powf(1.0 / 3.0);
    let d = overlap / overlap_scale;

    if d > BOND_BREAK_OVERLAP {
        let magnitude = nondimensional_force(d) * PI * ADHESION_CONSTANT * r_hat;
        // Coincident centers leave the direction undefined; apply nothing
        // along it rather than propagate a NaN.
        let normal = if mag != 0.0 {
            separation * (1.0 / mag)
        } else {
            Vec3::ZERO
        };
        Bond::Hold(normal * magnitude)
    } else {
        Bond::Break
    }
}

impl Simulation {
    /// Run the sub-stepped motion loop for one macro-step window.
    ///
    /// Performs `ceil(Δt_step / Δt_move)` sub-steps of contact-graph
    /// refresh, force evaluation, bond pruning, and integration, then
    /// zeroes the per-step motility forces.
    pub fn handle_movement(&mut self) {
        let substeps = self.config.move_substeps();
        for _ in 0..substeps {
            self.refresh_contact_bonds();
            self.apply_bond_forces();
            self.integrate_positions();
        }
        for force in &mut self.pop.motility_forces {
            *force = Vec3::ZERO;
        }
        self.metrics.movement_calls += 1;
    }

    /// Add newly touching pairs to the contact graph.
    ///
    /// Existing edges are kept: bonds persist until they break.
    fn refresh_contact_bonds(&mut self) {
        let reach = 2.0 * self.config.max_radius;
        let grid = BinGrid::assign(
            &self.pop.locations,
            self.config.size_vec(),
            reach,
            self.caps.contact_bin,
        );
        self.caps.contact_bin = grid.capacity();
        let found = contact_pairs(
            &grid,
            &self.pop.locations,
            &self.pop.radii,
            self.caps.contact_edges,
        );
        self.caps.contact_edges = found.max_per_cell;
        self.contact.add_edges(&found.edges);
    }

    /// Evaluate every contact edge, accumulate pair forces, and prune
    /// snapped bonds.
    fn apply_bond_forces(&mut self) {
        let edges = self.contact.edge_list();
        if edges.is_empty() {
            return;
        }

        let locations = &self.pop.locations;
        let radii = &self.pop.radii;
        let bonds: Vec<Bond> = edges
            .par_iter()
            .map(|&(a, b)| evaluate_bond(locations, radii, a as usize, b as usize))
            .collect();

        let mut broken = Vec::new();
        for (&(a, b), bond) in edges.iter().zip(&bonds) {
            match bond {
                Bond::Hold(force) => {
                    self.pop.jkr_forces[a as usize] += *force;
                    self.pop.jkr_forces[b as usize] -= *force;
                }
                Bond::Break => broken.push((a, b)),
            }
        }
        self.contact.delete_edges(&broken);
    }

    /// Integrate one sub-step of overdamped motion and clamp to the
    /// domain. Contact forces are consumed here and reset for the next
    /// sub-step.
    fn integrate_positions(&mut self) {
        let bound = self.config.size_vec();
        let dt = self.config.move_dt;
        let Population {
            locations,
            velocities,
            radii,
            motility_forces,
            jkr_forces,
            ..
        } = &mut self.pop;

        locations
            .par_iter_mut()
            .zip(velocities.par_iter_mut())
            .zip(radii.par_iter())
            .zip(motility_forces.par_iter())
            .zip(jkr_forces.par_iter())
            .for_each(|((((location, velocity), radius), motility), jkr)| {
                let friction = 6.0 * PI * MEDIUM_VISCOSITY * *radius;
                let v = (*motility + *jkr) * (1.0 / friction);
                *velocity = v;
                *location = (*location + v * dt).clamp_to_box(bound);
            });

        for force in jkr_forces.iter_mut() {
            *force = Vec3::ZERO;
        }
    }
}
