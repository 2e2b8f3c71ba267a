//! Error types for idxinteract

use thiserror::Error;

use crate::index::{IndexRef, StatementId};

/// Main error type for interaction analysis.
#[derive(Debug, Error)]
pub enum InteractionError {
    /// Input contract violation detected at the plan cost model boundary.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The constraint builder referenced something it never created.
    #[error("Model construction error: {0}")]
    Model(#[from] ModelError),

    /// The solver service failed (resource exhaustion, numerical trouble).
    #[error("Solver error: {0}")]
    Solver(String),

    /// Error in analysis configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not occur in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Contract violations raised while a program is being assembled.
///
/// These are programming-level invariant failures; they are never retried
/// and never defaulted to zero.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("variable {name} referenced before it was created")]
    UnregisteredVariable { name: String },

    #[error("variable {name} created twice")]
    DuplicateVariable { name: String },

    #[error("template {template} out of range (statement has {template_count})")]
    UnknownTemplate {
        template: usize,
        template_count: usize,
    },

    #[error("slot {slot} out of range (statement has {slot_count})")]
    UnknownSlot { slot: usize, slot_count: usize },

    #[error("index {index} is not exposed by statement {statement}")]
    UnknownIndex {
        index: IndexRef,
        statement: StatementId,
    },

    #[error("constraint {0} is not part of the model")]
    UnknownConstraint(String),
}

/// Result type alias for idxinteract operations
pub type Result<T> = std::result::Result<T, InteractionError>;
