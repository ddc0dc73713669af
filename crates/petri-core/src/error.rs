//! Error types for the simulation kernel.
//!
//! Capacity overflows (bin occupancy, edge slabs) are recovered internally
//! by doubling and retrying and never appear here. Everything else is
//! surfaced with the step number, the phase, and the offending cell where
//! one exists.

use std::error::Error;
use std::fmt;

/// The named phases of a macro-step, used in diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Proximity-graph rebuild.
    CheckNeighbors,
    /// Nearest-of-type caching.
    Nearest,
    /// Death marking.
    CellDeath,
    /// Contact-induced differentiation.
    CellDiffSurround,
    /// Radius update from the division counter.
    CellGrowth,
    /// Division marking.
    CellDivision,
    /// Regulatory-network update.
    CellPathway,
    /// Active motility force assignment.
    CellMotility,
    /// Morphogen diffusion.
    UpdateDiffusion,
    /// Bulk structural mutation (divide/remove).
    UpdateQueue,
    /// Sub-stepped contact mechanics.
    HandleMovement,
    /// Snapshot emission.
    Snapshot,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CheckNeighbors => "check_neighbors",
            Self::Nearest => "nearest",
            Self::CellDeath => "cell_death",
            Self::CellDiffSurround => "cell_diff_surround",
            Self::CellGrowth => "cell_growth",
            Self::CellDivision => "cell_division",
            Self::CellPathway => "cell_pathway",
            Self::CellMotility => "cell_motility",
            Self::UpdateDiffusion => "update_diffusion",
            Self::UpdateQueue => "update_queue",
            Self::HandleMovement => "handle_movement",
            Self::Snapshot => "snapshot",
        };
        write!(f, "{name}")
    }
}

/// Fatal errors raised while stepping a simulation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimError {
    /// A structural invariant was violated (misaligned arrays, a position
    /// outside the domain after clamping, a graph out of sync with the
    /// population). Always a bug, never recoverable.
    InvariantViolation {
        /// Phase that detected the violation.
        phase: Phase,
        /// Macro-step counter at the time of the violation.
        step: u64,
        /// Offending cell index, when one is identifiable.
        cell: Option<usize>,
        /// Human-readable description.
        reason: String,
    },
    /// Snapshot output kept failing; the run cannot make durable progress.
    SnapshotIo {
        /// Macro-step counter at the time of the failure.
        step: u64,
        /// Description of the underlying I/O failure.
        reason: String,
    },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvariantViolation {
                phase,
                step,
                cell,
                reason,
            } => {
                write!(f, "invariant violation in {phase} at step {step}")?;
                if let Some(cell) = cell {
                    write!(f, " (cell {cell})")?;
                }
                write!(f, ": {reason}")
            }
            Self::SnapshotIo { step, reason } => {
                write!(f, "persistent snapshot failure at step {step}: {reason}")
            }
        }
    }
}

impl Error for SimError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_phase_step_and_cell() {
        let err = SimError::InvariantViolation {
            phase: Phase::HandleMovement,
            step: 7,
            cell: Some(13),
            reason: "position outside domain".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("handle_movement"));
        assert!(msg.contains("step 7"));
        assert!(msg.contains("cell 13"));
    }

    #[test]
    fn display_omits_cell_when_absent() {
        let err = SimError::InvariantViolation {
            phase: Phase::UpdateQueue,
            step: 2,
            cell: None,
            reason: "graph vertex count mismatch".into(),
        };
        assert!(!err.to_string().contains("cell"));
    }
}
