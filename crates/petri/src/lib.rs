//! Petri: an agent-based simulator of stem-cell colonies.
//!
//! Cells are mobile deformable spheres in a bounded 2D or 3D domain.
//! They interact mechanically through adhesive JKR contact, chemically
//! through diffusible morphogen fields, and demographically through
//! division, death, and differentiation driven by a discrete regulatory
//! network. The simulator advances a global clock in fixed macro-steps
//! and emits per-step tabular snapshots through pluggable sinks.
//!
//! This is the facade crate re-exporting the public API of the
//! workspace's sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use petri::prelude::*;
//!
//! let config = SimConfig {
//!     name: "demo".into(),
//!     num_nanog_high: 30,
//!     num_gata6_high: 10,
//!     size: [2e-4, 2e-4, 0.0],
//!     end_time: 3_600.0,
//!     step_dt: 1_800.0,
//!     move_dt: 600.0,
//!     diffuse_dt: 2.0,
//!     seed: 7,
//!     ..SimConfig::default()
//! };
//! let mut sim = Simulation::new(config).unwrap();
//! sim.run().unwrap();
//! assert_eq!(sim.current_step(), 2);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `petri-core` | vectors, cell state, RNG streams, errors |
//! | [`space`] | `petri-space` | spatial binning and pair search |
//! | [`graph`] | `petri-graph` | cell-indexed undirected graphs |
//! | [`field`] | `petri-field` | morphogen gradients and diffusion |
//! | [`sim`] | `petri-sim` | population, mechanics, life cycle, driver |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, RNG streams, and errors (`petri-core`).
pub use petri_core as types;

/// Spatial binning and fixed-radius pair search (`petri-space`).
pub use petri_space as space;

/// Cell-indexed undirected graphs (`petri-graph`).
pub use petri_graph as graph;

/// Morphogen gradients and explicit diffusion (`petri-field`).
pub use petri_field as field;

/// Population, contact mechanics, life cycle, and the step driver
/// (`petri-sim`).
pub use petri_sim as sim;

/// Common imports for typical usage.
pub mod prelude {
    pub use petri_core::{CellState, Fds, Mode, Phase, SimError, StateSpace, Vec3};
    pub use petri_field::{Gradient, GradientSet};
    pub use petri_graph::CellGraph;
    pub use petri_sim::{
        Cell, ConfigError, CsvSink, GradientConfig, MotilityRuleset, Population, SimConfig,
        Simulation, SnapshotSink, SnapshotView, StepMetrics,
    };
}
