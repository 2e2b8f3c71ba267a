//! Solver-service errors.

use idxinteract_core::InteractionError;
use thiserror::Error;

/// Failures reported by a solver backend.
///
/// Infeasibility is not an error; see [`crate::SolveOutcome::Infeasible`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    /// The search gave up before proving feasibility or infeasibility.
    #[error("search node limit of {limit} exceeded")]
    NodeLimitExceeded { limit: u64 },

    /// A coefficient or right-hand side is not a finite number.
    #[error("numerical error: {0}")]
    Numerical(String),

    #[error("unknown variable handle {0}")]
    UnknownVariable(u32),

    #[error("unknown constraint handle {0}")]
    UnknownConstraint(u32),
}

impl From<SolverError> for InteractionError {
    fn from(err: SolverError) -> Self {
        InteractionError::Solver(err.to_string())
    }
}
