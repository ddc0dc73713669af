//! Deterministic per-cell RNG streams.
//!
//! Every stochastic draw in the simulator (Bernoulli counter increments,
//! random unit vectors, division axes) comes from a ChaCha8 generator
//! seeded from `(config seed, step, cell id, stream)`. Because the seed
//! depends only on those four values, results are independent of the
//! parallel schedule and of population ordering — a global RNG consumed
//! inside a parallel-for would not be.

use crate::cell::Mode;
use crate::vec3::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Independent randomness streams, so that draws made in different phases
/// of the same step never alias.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum Stream {
    /// Initial population placement and state.
    Setup = 1,
    /// Division-counter Bernoulli increments.
    Division = 2,
    /// Differentiation-counter Bernoulli increments.
    Differentiation = 3,
    /// Random motility directions.
    Motility = 4,
    /// Parent/daughter separation axis on division.
    DivisionAxis = 5,
}

/// SplitMix64 finalizer, used to mix the seed words.
fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Build the generator for one `(seed, step, cell, stream)` tuple.
///
/// `cell` is the stable cell id, not the dense index — indices are
/// reshuffled by structural mutation, ids are not.
pub fn stream_rng(seed: u64, step: u64, cell: u64, stream: Stream) -> ChaCha8Rng {
    let mut state = splitmix64(seed ^ step);
    state = splitmix64(state ^ cell);
    state = splitmix64(state ^ stream as u64);
    ChaCha8Rng::seed_from_u64(state)
}

/// A random unit vector in the plane (2D) or on the sphere (3D).
///
/// In 3D the polar angle is drawn uniformly rather than area-weighted,
/// so the distribution mildly favors the poles.
pub fn unit_vector(rng: &mut ChaCha8Rng, mode: Mode) -> Vec3 {
    let theta = rng.random::<f64>() * std::f64::consts::TAU;
    match mode {
        Mode::TwoD => Vec3::new(theta.cos(), theta.sin(), 0.0),
        Mode::ThreeD => {
            let phi = rng.random::<f64>() * std::f64::consts::TAU;
            let radius = phi.cos();
            Vec3::new(radius * theta.cos(), radius * theta.sin(), phi.sin())
        }
    }
}

/// A fair coin returned as 0 or 1, for the stochastic counter increments.
pub fn coin(rng: &mut ChaCha8Rng) -> u32 {
    u32::from(rng.random_bool(0.5))
}
