//! The complementary interaction inequality.

use idxinteract_ilp::{LinearConstraint, Term};

use crate::cost::CostExpressions;

/// Builds `Cost(C) + Cost(D) − Cost(EMPTY) + (δ−1)·Cost(CD) ≤ 0` from
/// retained cost expressions.
///
/// Terms keep their variable identity: `EMPTY` terms are negated, `C` and
/// `D` terms kept, `CD` terms scaled by `δ−1`.
#[derive(Debug, Clone, Copy)]
pub struct AlternativeConstraintBuilder<'a> {
    costs: &'a CostExpressions,
}

impl<'a> AlternativeConstraintBuilder<'a> {
    pub fn new(costs: &'a CostExpressions) -> Self {
        Self { costs }
    }

    /// Left-hand side of the inequality.
    pub fn terms(&self, delta: f64) -> Vec<Term> {
        self.costs.combine([-1.0, 1.0, 1.0, delta - 1.0])
    }

    pub fn inequality(&self, name: impl Into<String>, delta: f64) -> LinearConstraint {
        LinearConstraint::le(name, self.terms(delta), 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idxinteract_core::ConfigurationVariant;
    use idxinteract_ilp::{BranchAndBoundSolver, IlpModel, SolverService};

    fn expressions() -> (CostExpressions, Vec<idxinteract_ilp::VarHandle>) {
        let mut model = BranchAndBoundSolver::default().create_model();
        let mut costs = CostExpressions::new();
        let mut vars = Vec::new();
        for (k, theta) in ConfigurationVariant::ALL.into_iter().enumerate() {
            let v = model.add_binary_variable(&format!("x{k}"));
            costs.push(theta, Term::new(v, 10.0 * (k as f64 + 1.0)));
            vars.push(v);
        }
        (costs, vars)
    }

    #[test]
    fn test_sign_flips() {
        let (costs, v) = expressions();
        let terms = AlternativeConstraintBuilder::new(&costs).terms(0.25);
        assert_eq!(
            terms,
            vec![
                Term::new(v[0], -10.0),
                Term::new(v[1], 20.0),
                Term::new(v[2], 30.0),
                Term::new(v[3], 40.0 * -0.75),
            ]
        );
    }

    #[test]
    fn test_delta_one_drops_cd() {
        let (costs, v) = expressions();
        let c = AlternativeConstraintBuilder::new(&costs)
            .inequality("alt", 1.0)
            .normalized();
        assert!(c.terms.iter().all(|t| t.var != v[3]));
        assert_eq!(c.terms.len(), 3);
    }
}
