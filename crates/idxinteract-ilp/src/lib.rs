//! idxinteract ILP - Solver-service boundary
//!
//! This crate provides the interface the interaction builder talks to, and a
//! built-in backend:
//! - Linear terms, relations and named constraints
//! - [`SolverService`] / [`IlpModel`] traits (create, add, retract, solve, clear)
//! - [`BranchAndBoundSolver`]: exact 0/1 feasibility search with bound propagation
//! - LP text rendering for debugging
//!
//! Programs are pure feasibility queries: there is no objective.

pub mod bnb;
pub mod error;
pub mod expr;
pub mod lp;
pub mod model;

pub use bnb::{BranchAndBoundModel, BranchAndBoundSolver};
pub use error::SolverError;
pub use expr::{ConstraintHandle, LinearConstraint, Relation, Term, VarHandle};
pub use lp::render_lp;
pub use model::{Assignment, IlpModel, SolveOutcome, SolverService};
