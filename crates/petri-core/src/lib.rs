//! Core types for the petri cell-colony simulator.
//!
//! This is the leaf crate with no internal petri dependencies. It defines
//! the fundamental vocabulary used throughout the workspace: the spatial
//! vector type, cell state and regulatory-network types, error types, and
//! the deterministic per-cell RNG streams.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cell;
pub mod error;
pub mod rng;
pub mod vec3;

// Re-export core types at crate root for convenience.
pub use cell::{CellState, Fds, Mode, StateSpace};
pub use error::{Phase, SimError};
pub use rng::{stream_rng, unit_vector, Stream};
pub use vec3::Vec3;
