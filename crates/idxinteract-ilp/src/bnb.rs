//! Exact 0/1 feasibility search using branch-and-bound.
//!
//! Every live constraint is rewritten as one or two `Σ a·x ≤ b` rows. The
//! search keeps, per row, the minimum activity reachable from the current
//! partial assignment. A row whose minimum activity exceeds its bound prunes
//! the node; a free variable whose coefficient exceeds the row's slack is
//! forced to the value that keeps the activity minimal. Branching is depth
//! first over variables ordered by how many rows they appear in.
//!
//! The search is exhaustive: `Infeasible` is only reported once the whole
//! tree has been refuted.

use smallvec::SmallVec;
use tracing::trace;

use crate::error::SolverError;
use crate::expr::{ConstraintHandle, LinearConstraint, Relation, VarHandle};
use crate::model::{Assignment, IlpModel, SolveOutcome, SolverService};

/// Default absolute tolerance for `≤` rows.
pub const DEFAULT_TOLERANCE: f64 = 1e-7;

/// Default maximum number of search nodes per solve.
pub const DEFAULT_NODE_LIMIT: u64 = 2_000_000;

const UNASSIGNED: i8 = -1;

/// Solver service producing [`BranchAndBoundModel`]s.
///
/// # Example
///
/// ```
/// use idxinteract_ilp::{BranchAndBoundSolver, IlpModel, LinearConstraint, SolveOutcome, SolverService, Term};
///
/// let solver = BranchAndBoundSolver::default();
/// let mut model = solver.create_model();
/// let x = model.add_binary_variable("x");
/// let y = model.add_binary_variable("y");
/// model.add_linear_constraint(LinearConstraint::eq("one", vec![Term::new(x, 1.0), Term::new(y, 1.0)], 1.0)).unwrap();
/// model.add_linear_constraint(LinearConstraint::le("no_x", vec![Term::new(x, 1.0)], 0.0)).unwrap();
///
/// match model.solve() {
///     SolveOutcome::Feasible(values) => assert!(values.value(y)),
///     other => panic!("unexpected {:?}", other),
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchAndBoundSolver {
    node_limit: Option<u64>,
    tolerance: f64,
}

impl Default for BranchAndBoundSolver {
    fn default() -> Self {
        Self {
            node_limit: Some(DEFAULT_NODE_LIMIT),
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl BranchAndBoundSolver {
    pub fn new(node_limit: Option<u64>, tolerance: f64) -> Self {
        Self {
            node_limit,
            tolerance,
        }
    }

    pub fn with_node_limit(mut self, limit: Option<u64>) -> Self {
        self.node_limit = limit;
        self
    }

    pub fn node_limit(&self) -> Option<u64> {
        self.node_limit
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

impl SolverService for BranchAndBoundSolver {
    type Model = BranchAndBoundModel;

    fn create_model(&self) -> BranchAndBoundModel {
        BranchAndBoundModel::new(self.node_limit, self.tolerance)
    }
}

/// A 0/1 program solved by exhaustive branch-and-bound.
#[derive(Debug, Clone)]
pub struct BranchAndBoundModel {
    names: Vec<String>,
    constraints: Vec<Option<LinearConstraint>>,
    live: usize,
    node_limit: Option<u64>,
    tolerance: f64,
    last_nodes: u64,
}

impl BranchAndBoundModel {
    pub fn new(node_limit: Option<u64>, tolerance: f64) -> Self {
        Self {
            names: Vec::new(),
            constraints: Vec::new(),
            live: 0,
            node_limit,
            tolerance,
            last_nodes: 0,
        }
    }

    /// Live constraints with their handles, in insertion order.
    pub fn constraints(&self) -> impl Iterator<Item = (ConstraintHandle, &LinearConstraint)> {
        self.constraints
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|c| (ConstraintHandle(i as u32), c)))
    }

    pub fn constraint(&self, handle: ConstraintHandle) -> Option<&LinearConstraint> {
        self.constraints.get(handle.index()).and_then(Option::as_ref)
    }

    /// Declared variables with their names.
    pub fn variables(&self) -> impl Iterator<Item = (VarHandle, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (VarHandle(i as u32), n.as_str()))
    }

    fn check(&self, constraint: &LinearConstraint) -> Result<(), SolverError> {
        if !constraint.rhs.is_finite() {
            return Err(SolverError::Numerical(format!(
                "constraint {} has right-hand side {}",
                constraint.name, constraint.rhs
            )));
        }
        for term in &constraint.terms {
            if term.var.index() >= self.names.len() {
                return Err(SolverError::UnknownVariable(term.var.0));
            }
            if !term.coef.is_finite() {
                return Err(SolverError::Numerical(format!(
                    "constraint {} has coefficient {} on {}",
                    constraint.name, term.coef, self.names[term.var.index()]
                )));
            }
        }
        Ok(())
    }
}

impl IlpModel for BranchAndBoundModel {
    fn add_binary_variable(&mut self, name: &str) -> VarHandle {
        let handle = VarHandle(self.names.len() as u32);
        self.names.push(name.to_string());
        handle
    }

    fn add_linear_constraint(
        &mut self,
        constraint: LinearConstraint,
    ) -> Result<ConstraintHandle, SolverError> {
        self.check(&constraint)?;
        let handle = ConstraintHandle(self.constraints.len() as u32);
        self.constraints.push(Some(constraint.normalized()));
        self.live += 1;
        Ok(handle)
    }

    fn remove_constraint(&mut self, handle: ConstraintHandle) -> Result<(), SolverError> {
        match self.constraints.get_mut(handle.index()) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                self.live -= 1;
                Ok(())
            }
            _ => Err(SolverError::UnknownConstraint(handle.0)),
        }
    }

    fn solve(&mut self) -> SolveOutcome {
        let mut search = Search::new(
            self.names.len(),
            self.constraints.iter().flatten(),
            self.tolerance,
            self.node_limit,
        );
        let result = search.run();
        self.last_nodes = search.nodes;

        trace!(
            event = "bnb_solve",
            variables = self.names.len(),
            constraints = self.live,
            nodes = search.nodes,
            feasible = matches!(result, Ok(Some(_))),
        );

        match result {
            Ok(Some(values)) => SolveOutcome::Feasible(Assignment::new(values)),
            Ok(None) => SolveOutcome::Infeasible,
            Err(err) => SolveOutcome::Error(err),
        }
    }

    fn clear(&mut self) {
        self.names.clear();
        self.constraints.clear();
        self.live = 0;
        self.last_nodes = 0;
    }

    fn variable_count(&self) -> usize {
        self.names.len()
    }

    fn constraint_count(&self) -> usize {
        self.live
    }

    fn variable_name(&self, var: VarHandle) -> Option<&str> {
        self.names.get(var.index()).map(String::as_str)
    }

    fn last_solve_nodes(&self) -> u64 {
        self.last_nodes
    }
}

/// `Σ a·x ≤ rhs`
struct Row {
    terms: Vec<(u32, f64)>,
    rhs: f64,
}

#[derive(Clone, Copy)]
struct Decision {
    var: u32,
    mark: usize,
    exhausted: bool,
}

struct Search {
    rows: Vec<Row>,
    occurrences: Vec<SmallVec<[(u32, f64); 8]>>,
    order: Vec<u32>,
    values: Vec<i8>,
    min_activity: Vec<f64>,
    trail: Vec<u32>,
    queue: Vec<u32>,
    queued: Vec<bool>,
    tolerance: f64,
    node_limit: Option<u64>,
    nodes: u64,
}

impl Search {
    fn new<'a>(
        variable_count: usize,
        constraints: impl Iterator<Item = &'a LinearConstraint>,
        tolerance: f64,
        node_limit: Option<u64>,
    ) -> Self {
        let mut rows = Vec::new();
        for c in constraints {
            let terms: Vec<(u32, f64)> = c.terms.iter().map(|t| (t.var.0, t.coef)).collect();
            if matches!(c.relation, Relation::Le | Relation::Eq) {
                rows.push(Row {
                    terms: terms.clone(),
                    rhs: c.rhs,
                });
            }
            if matches!(c.relation, Relation::Ge | Relation::Eq) {
                rows.push(Row {
                    terms: terms.iter().map(|&(v, a)| (v, -a)).collect(),
                    rhs: -c.rhs,
                });
            }
        }

        let mut occurrences: Vec<SmallVec<[(u32, f64); 8]>> =
            vec![SmallVec::new(); variable_count];
        let mut min_activity = Vec::with_capacity(rows.len());
        for (r, row) in rows.iter().enumerate() {
            let mut act = 0.0;
            for &(v, a) in &row.terms {
                occurrences[v as usize].push((r as u32, a));
                act += a.min(0.0);
            }
            min_activity.push(act);
        }

        let mut order: Vec<u32> = (0..variable_count as u32).collect();
        order.sort_by(|a, b| {
            occurrences[*b as usize]
                .len()
                .cmp(&occurrences[*a as usize].len())
                .then(a.cmp(b))
        });

        let row_count = rows.len();
        Self {
            rows,
            occurrences,
            order,
            values: vec![UNASSIGNED; variable_count],
            min_activity,
            trail: Vec::with_capacity(variable_count),
            queue: Vec::with_capacity(row_count),
            queued: vec![false; row_count],
            tolerance,
            node_limit,
            nodes: 0,
        }
    }

    fn run(&mut self) -> Result<Option<Vec<bool>>, SolverError> {
        for r in 0..self.rows.len() {
            self.queued[r] = true;
            self.queue.push(r as u32);
        }
        if !self.propagate() {
            return Ok(None);
        }

        let mut stack: Vec<Decision> = Vec::new();
        loop {
            let Some(var) = self.next_unassigned() else {
                return Ok(Some(self.values.iter().map(|&v| v == 1).collect()));
            };

            self.count_node()?;
            let mark = self.trail.len();
            stack.push(Decision {
                var,
                mark,
                exhausted: false,
            });
            if self.try_value(var, true) {
                continue;
            }

            // Backtrack to the deepest decision with an untried value.
            loop {
                let Some(decision) = stack.pop() else {
                    return Ok(None);
                };
                self.undo_to(decision.mark);
                if decision.exhausted {
                    continue;
                }
                self.count_node()?;
                stack.push(Decision {
                    exhausted: true,
                    ..decision
                });
                if self.try_value(decision.var, false) {
                    break;
                }
            }
        }
    }

    fn count_node(&mut self) -> Result<(), SolverError> {
        self.nodes += 1;
        match self.node_limit {
            Some(limit) if self.nodes > limit => Err(SolverError::NodeLimitExceeded { limit }),
            _ => Ok(()),
        }
    }

    fn next_unassigned(&self) -> Option<u32> {
        self.order
            .iter()
            .copied()
            .find(|&v| self.values[v as usize] == UNASSIGNED)
    }

    fn try_value(&mut self, var: u32, value: bool) -> bool {
        self.reset_queue();
        self.assign(var, value);
        let ok = self.propagate();
        if !ok {
            self.reset_queue();
        }
        ok
    }

    fn assign(&mut self, var: u32, value: bool) {
        let v = var as usize;
        self.values[v] = value as i8;
        self.trail.push(var);
        let x = if value { 1.0 } else { 0.0 };
        for &(r, a) in self.occurrences[v].iter() {
            let r = r as usize;
            self.min_activity[r] += a * x - a.min(0.0);
            if !self.queued[r] {
                self.queued[r] = true;
                self.queue.push(r as u32);
            }
        }
    }

    fn propagate(&mut self) -> bool {
        while let Some(r) = self.queue.pop() {
            let r = r as usize;
            self.queued[r] = false;
            let slack = self.rows[r].rhs + self.tolerance - self.min_activity[r];
            if slack < 0.0 {
                return false;
            }
            for i in 0..self.rows[r].terms.len() {
                let (var, a) = self.rows[r].terms[i];
                if self.values[var as usize] == UNASSIGNED && a.abs() > slack {
                    // The other value would push the minimum activity past the bound.
                    self.assign(var, a < 0.0);
                }
            }
        }
        true
    }

    fn reset_queue(&mut self) {
        for &r in &self.queue {
            self.queued[r as usize] = false;
        }
        self.queue.clear();
    }

    fn undo_to(&mut self, mark: usize) {
        while self.trail.len() > mark {
            let Some(var) = self.trail.pop() else {
                break;
            };
            let v = var as usize;
            let x = if self.values[v] == 1 { 1.0 } else { 0.0 };
            for &(r, a) in self.occurrences[v].iter() {
                self.min_activity[r as usize] -= a * x - a.min(0.0);
            }
            self.values[v] = UNASSIGNED;
        }
    }
}

#[cfg(test)]
mod tests;
