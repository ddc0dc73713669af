//! Extracellular morphogen fields.
//!
//! Each diffusible molecule is a scalar concentration on a regular grid
//! spanning the simulation domain ([`Gradient`]), advanced by an explicit
//! forward-Euler discretization of `∂c/∂t = D∇²c` with reflective
//! (zero-gradient) boundaries. Cells read and write concentrations at
//! their own positions; everything else is grid-local.
//!
//! [`GradientSet`] keys the gradients by name in a deterministic order.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod grid;
mod registry;

pub use grid::Gradient;
pub use registry::GradientSet;
