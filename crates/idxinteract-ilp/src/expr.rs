//! Linear terms and constraints.

use std::fmt;

/// Handle to a binary variable inside one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarHandle(pub(crate) u32);

impl VarHandle {
    /// Dense position of the variable in its model.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a constraint inside one model; stays valid until removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConstraintHandle(pub(crate) u32);

impl ConstraintHandle {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// `coef * var`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Term {
    pub var: VarHandle,
    pub coef: f64,
}

impl Term {
    pub fn new(var: VarHandle, coef: f64) -> Self {
        Self { var, coef }
    }
}

/// Comparison between a linear expression and its right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Le,
    Eq,
    Ge,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Le => f.write_str("<="),
            Relation::Eq => f.write_str("="),
            Relation::Ge => f.write_str(">="),
        }
    }
}

/// A named linear (in)equality `Σ terms  rel  rhs`.
///
/// # Example
///
/// ```
/// use idxinteract_ilp::{BranchAndBoundSolver, IlpModel, LinearConstraint, Relation, SolverService, Term};
///
/// let mut model = BranchAndBoundSolver::default().create_model();
/// let x = model.add_binary_variable("x");
/// let y = model.add_binary_variable("y");
///
/// let c = LinearConstraint::new("pick_one", vec![Term::new(x, 1.0), Term::new(y, 1.0)], Relation::Eq, 1.0);
/// assert_eq!(c.to_string(), "pick_one: +1 v0 +1 v1 = 1");
/// model.add_linear_constraint(c).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub name: String,
    pub terms: Vec<Term>,
    pub relation: Relation,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn new(name: impl Into<String>, terms: Vec<Term>, relation: Relation, rhs: f64) -> Self {
        Self {
            name: name.into(),
            terms,
            relation,
            rhs,
        }
    }

    pub fn le(name: impl Into<String>, terms: Vec<Term>, rhs: f64) -> Self {
        Self::new(name, terms, Relation::Le, rhs)
    }

    pub fn eq(name: impl Into<String>, terms: Vec<Term>, rhs: f64) -> Self {
        Self::new(name, terms, Relation::Eq, rhs)
    }

    pub fn ge(name: impl Into<String>, terms: Vec<Term>, rhs: f64) -> Self {
        Self::new(name, terms, Relation::Ge, rhs)
    }

    /// Merges repeated variables and drops zero coefficients.
    pub fn normalized(mut self) -> Self {
        self.terms.sort_by_key(|t| t.var);
        let mut merged: Vec<Term> = Vec::with_capacity(self.terms.len());
        for term in self.terms {
            match merged.last_mut() {
                Some(last) if last.var == term.var => last.coef += term.coef,
                _ => merged.push(term),
            }
        }
        merged.retain(|t| t.coef != 0.0);
        self.terms = merged;
        self
    }
}

impl fmt::Display for LinearConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.name)?;
        if self.terms.is_empty() {
            write!(f, " 0")?;
        }
        for term in &self.terms {
            write!(f, " {:+} v{}", term.coef, term.var.0)?;
        }
        write!(f, " {} {}", self.relation, self.rhs)
    }
}
