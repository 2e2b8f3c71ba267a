//! Solver-service traits.
//!
//! A [`SolverService`] hands out independent [`IlpModel`]s. One pair
//! evaluation owns one model exclusively for its lifetime:
//! construct, add variables and constraints, solve, clear, drop.

use crate::error::SolverError;
use crate::expr::{ConstraintHandle, LinearConstraint, Term, VarHandle};

/// Values of every variable in a feasible solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    values: Vec<bool>,
}

impl Assignment {
    pub fn new(values: Vec<bool>) -> Self {
        Self { values }
    }

    /// Value of `var`; unknown handles read as 0.
    #[inline]
    pub fn value(&self, var: VarHandle) -> bool {
        self.values.get(var.index()).copied().unwrap_or(false)
    }

    /// Evaluates `Σ coef * var` under this assignment.
    pub fn evaluate(&self, terms: &[Term]) -> f64 {
        terms
            .iter()
            .filter(|t| self.value(t.var))
            .map(|t| t.coef)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Result of one feasibility query.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    /// A witness satisfying every live constraint.
    Feasible(Assignment),
    /// No assignment satisfies the live constraints.
    Infeasible,
    /// The backend could not decide.
    Error(SolverError),
}

impl SolveOutcome {
    pub fn is_feasible(&self) -> bool {
        matches!(self, SolveOutcome::Feasible(_))
    }
}

/// A mutable 0/1 program owned by a single evaluation.
pub trait IlpModel: Send {
    /// Declares a new binary variable.
    fn add_binary_variable(&mut self, name: &str) -> VarHandle;

    /// Adds a named linear constraint over declared variables.
    fn add_linear_constraint(
        &mut self,
        constraint: LinearConstraint,
    ) -> Result<ConstraintHandle, SolverError>;

    /// Retracts a previously added constraint from the live model.
    fn remove_constraint(&mut self, handle: ConstraintHandle) -> Result<(), SolverError>;

    /// Decides feasibility of the live constraints.
    fn solve(&mut self) -> SolveOutcome;

    /// Drops every variable and constraint.
    fn clear(&mut self);

    fn variable_count(&self) -> usize;

    /// Number of live (not removed) constraints.
    fn constraint_count(&self) -> usize;

    fn variable_name(&self, var: VarHandle) -> Option<&str>;

    /// Search nodes spent by the most recent solve, if the backend tracks them.
    fn last_solve_nodes(&self) -> u64 {
        0
    }
}

/// Factory for independent models.
///
/// Services are shared across worker threads; models are not.
pub trait SolverService: Send + Sync {
    type Model: IlpModel;

    fn create_model(&self) -> Self::Model;
}
