//! Spatial binning and fixed-radius pair search.
//!
//! Moving points are generalized onto a uniform grid of bins whose side
//! equals the search distance ([`BinGrid`]), so that every fixed-radius
//! query only inspects a point's own bin and the 26 surrounding bins.
//! [`search`] builds undirected edge lists from the binned points for the
//! two consumers of the kernel: the proximity graph and the contact graph.
//!
//! Both layers recover from capacity misestimates by doubling and
//! retrying; final capacities are reported back so callers can persist
//! them across steps.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bins;
pub mod search;

pub use bins::BinGrid;
pub use search::{contact_pairs, pairs_within, SearchResult};
