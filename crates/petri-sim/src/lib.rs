//! The per-step simulation kernel of the petri cell simulator.
//!
//! A [`Simulation`] owns the cell population (a structure-of-arrays), the
//! proximity and contact graphs, and the morphogen gradients, and advances
//! them in fixed macro-steps. Each macro-step runs the same phase
//! sequence: proximity rebuild, nearest-of-type caching, life-cycle
//! marking, regulatory update, motility, diffusion, bulk structural
//! mutation, and sub-stepped contact mechanics, ending with a snapshot.
//!
//! Construction goes through [`SimConfig`], which validates the domain,
//! the time steps, and the diffusion stability bound before anything is
//! allocated.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod driver;
mod lifecycle;
pub mod mechanics;
mod motility;
mod pathway;
pub mod output;
pub mod population;

pub use config::{ConfigError, GradientConfig, MotilityRuleset, SimConfig};
pub use driver::{Simulation, StepMetrics};
pub use output::{CsvSink, SnapshotSink, SnapshotView};
pub use population::{Cell, Population};
