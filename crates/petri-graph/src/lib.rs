//! Cell-indexed undirected graphs.
//!
//! The simulation keeps two of these per run: the proximity graph,
//! rebuilt from scratch every macro-step, and the contact graph, which
//! accumulates adhesive bonds across sub-steps. Both are keyed by the
//! dense cell index, so vertex deletion compacts indices exactly the way
//! the population's structure-of-arrays does — callers apply the same
//! deletion set to the arrays and to both graphs as one atomic step.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod graph;

pub use graph::CellGraph;
