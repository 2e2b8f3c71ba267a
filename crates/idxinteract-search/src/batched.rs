//! One combined program per pair covering every shared statement.
//!
//! Each statement contributes its full certification program plus an
//! indicator per interaction inequality it admits. An indicator set to 1
//! activates its inequality; a cover row asks for at least one active
//! indicator. Inactive inequalities are relaxed by a big-M constant that
//! bounds their left-hand side.

use tracing::{debug, trace, warn};

use idxinteract_core::{IndexId, PlanCostModel, Result, StatementId};
use idxinteract_iip::{
    AlternativeConstraintBuilder, ConstraintBuilder, PairRequest, Phase, ProtocolSettings,
    VariantCosts, Verdict,
};
use idxinteract_ilp::{
    IlpModel, LinearConstraint, SolveOutcome, SolverError, SolverService, Term, VarHandle,
};

/// Relaxation constant for one statement at threshold `delta`.
///
/// Every cost expression of `plan` lies in `[0, U]` with
/// `U = max_template_cost`, so both inequalities stay below
/// `(3 + |δ|)·U` whatever the assignment.
pub fn big_m(plan: &PlanCostModel, delta: f64) -> f64 {
    (3.0 + delta.abs()) * plan.max_template_cost() + 1.0
}

/// Outcome of one batched program.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchedEvaluation {
    pub c: IndexId,
    pub d: IndexId,
    /// `Interacting` never carries a degree here.
    pub verdict: Verdict,
    /// First statement whose indicator is set in the witness.
    pub statement_id: Option<StatementId>,
    pub witness: Option<VariantCosts>,
    pub statements: usize,
    pub indicators: usize,
    pub solves: u32,
    pub solver_errors: u32,
    pub retries: u32,
    pub nodes: u64,
}

impl BatchedEvaluation {
    fn new(c: IndexId, d: IndexId, statements: usize) -> Self {
        Self {
            c,
            d,
            verdict: Verdict::NotInteracting,
            statement_id: None,
            witness: None,
            statements,
            indicators: 0,
            solves: 0,
            solver_errors: 0,
            retries: 0,
            nodes: 0,
        }
    }
}

struct Indicator {
    statement: usize,
    phase: Phase,
    var: VarHandle,
}

enum Attempt {
    Decided,
    SolverFailed(SolverError),
}

/// Builds and solves the combined program of one pair.
#[derive(Debug)]
pub struct BatchedProgram<'s, S> {
    service: &'s S,
    settings: ProtocolSettings,
}

impl<'s, S: SolverService> BatchedProgram<'s, S> {
    pub fn new(service: &'s S, settings: ProtocolSettings) -> Self {
        Self { service, settings }
    }

    /// Evaluates `(c, d)` over `plans`, which must all expose both indexes.
    ///
    /// # Errors
    ///
    /// Model-construction errors are returned without retrying; solver
    /// failures become [`Verdict::Undetermined`] once retries run out.
    pub fn evaluate(&self, plans: &[&PlanCostModel], c: IndexId, d: IndexId) -> Result<BatchedEvaluation> {
        let mut eval = BatchedEvaluation::new(c, d, plans.len());
        let mut attempt = 0;
        loop {
            let mut model = self.service.create_model();
            let result = self.run(&mut model, plans, c, d, &mut eval);
            model.clear();

            match result? {
                Attempt::Decided => return Ok(eval),
                Attempt::SolverFailed(err) => {
                    eval.solver_errors += 1;
                    if attempt < self.settings.solver_retries {
                        attempt += 1;
                        eval.retries += 1;
                        warn!(
                            event = "solver_retry",
                            c = %c,
                            d = %d,
                            statements = plans.len(),
                            attempt = attempt,
                            error = %err,
                        );
                        continue;
                    }
                    eval.verdict = Verdict::Undetermined {
                        reason: err.to_string(),
                    };
                    return Ok(eval);
                }
            }
        }
    }

    fn run<M: IlpModel>(
        &self,
        model: &mut M,
        plans: &[&PlanCostModel],
        c: IndexId,
        d: IndexId,
        eval: &mut BatchedEvaluation,
    ) -> Result<Attempt> {
        let delta = self.settings.delta;

        let mut builders = Vec::with_capacity(plans.len());
        for plan in plans {
            let request = PairRequest::resolve(plan, c, d, delta)?;
            let mut builder = ConstraintBuilder::new(plan, request)?;
            builder.build(model)?;
            builders.push(builder);
        }

        let mut indicators = Vec::with_capacity(2 * builders.len());
        for (pos, builder) in builders.iter().enumerate() {
            let q = builder.statement_id();
            let m = big_m(builder.plan(), delta);

            if !builder.request().same_slot() {
                let z = model.add_binary_variable(&format!("zprim({q})"));
                let mut terms = builder.primary_terms(delta);
                terms.push(Term::new(z, m));
                model.add_linear_constraint(LinearConstraint::le(
                    format!("activate_primary_{q}"),
                    terms,
                    m,
                ))?;
                indicators.push(Indicator {
                    statement: pos,
                    phase: Phase::Primary,
                    var: z,
                });
            }

            let z = model.add_binary_variable(&format!("zalt({q})"));
            let mut terms = AlternativeConstraintBuilder::new(builder.cost_expressions()).terms(delta);
            terms.push(Term::new(z, m));
            model.add_linear_constraint(LinearConstraint::le(
                format!("activate_alternative_{q}"),
                terms,
                m,
            ))?;
            indicators.push(Indicator {
                statement: pos,
                phase: Phase::Alternative,
                var: z,
            });
        }

        let cover = indicators.iter().map(|z| Term::new(z.var, 1.0)).collect();
        model.add_linear_constraint(LinearConstraint::ge(format!("cover_{c}_{d}"), cover, 1.0))?;
        eval.indicators = indicators.len();

        trace!(
            event = "batched_program",
            c = %c,
            d = %d,
            statements = builders.len(),
            indicators = indicators.len(),
            variables = model.variable_count(),
            constraints = model.constraint_count(),
        );

        eval.solves += 1;
        let outcome = model.solve();
        eval.nodes += model.last_solve_nodes();
        match outcome {
            SolveOutcome::Feasible(values) => {
                if let Some(z) = indicators.iter().find(|z| values.value(z.var)) {
                    let builder = &builders[z.statement];
                    eval.verdict = Verdict::Interacting {
                        phase: z.phase,
                        degree: None,
                    };
                    eval.statement_id = Some(builder.statement_id());
                    eval.witness = Some(builder.cost_expressions().evaluate(&values));
                }
            }
            SolveOutcome::Infeasible => eval.verdict = Verdict::NotInteracting,
            SolveOutcome::Error(err) => return Ok(Attempt::SolverFailed(err)),
        }

        debug!(
            event = "phase_result",
            c = %c,
            d = %d,
            phase = "batched",
            feasible = eval.verdict.is_interacting(),
        );
        Ok(Attempt::Decided)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idxinteract_core::InteractionError;
    use idxinteract_ilp::BranchAndBoundSolver;
    use idxinteract_test::scenario::{
        complementary_with, same_slot_with, scenario_a_with, scenario_b_with, C, D,
    };

    fn settings(delta: f64) -> ProtocolSettings {
        ProtocolSettings::default().with_delta(delta)
    }

    #[test]
    fn test_big_m() {
        let plan = scenario_a_with(StatementId(1));
        // Single template: 100 + 50.
        assert!((big_m(&plan, 0.1) - 466.0).abs() < 1e-9);
        assert_eq!(big_m(&plan, -0.1), big_m(&plan, 0.1));
    }

    #[test]
    fn test_non_interacting_statement_alone() {
        let solver = BranchAndBoundSolver::default();
        let a = scenario_a_with(StatementId(1));
        let eval = BatchedProgram::new(&solver, settings(0.1))
            .evaluate(&[&a], C, D)
            .unwrap();

        assert_eq!(eval.verdict, Verdict::NotInteracting);
        assert_eq!(eval.statement_id, None);
        assert_eq!(eval.indicators, 2);
        assert_eq!(eval.solves, 1);
    }

    #[test]
    fn test_witness_statement_is_the_interacting_one() {
        let solver = BranchAndBoundSolver::default();
        let a = scenario_a_with(StatementId(1));
        let k = complementary_with(StatementId(3));
        let eval = BatchedProgram::new(&solver, settings(0.1))
            .evaluate(&[&a, &k], C, D)
            .unwrap();

        assert_eq!(
            eval.verdict,
            Verdict::Interacting {
                phase: Phase::Primary,
                degree: None
            }
        );
        assert_eq!(eval.statement_id, Some(StatementId(3)));
        let witness = eval.witness.unwrap();
        assert_eq!(witness.degree(), 9.0);
    }

    #[test]
    fn test_same_slot_has_no_primary_indicator() {
        let solver = BranchAndBoundSolver::default();
        let s = same_slot_with(StatementId(4));
        let b = scenario_b_with(StatementId(2));
        let eval = BatchedProgram::new(&solver, settings(0.1))
            .evaluate(&[&b, &s], C, D)
            .unwrap();

        assert_eq!(eval.indicators, 3);
        assert!(eval.verdict.is_interacting());
    }

    #[test]
    fn test_missing_index_is_a_model_error() {
        let solver = BranchAndBoundSolver::default();
        let a = scenario_a_with(StatementId(1));
        let err = BatchedProgram::new(&solver, settings(0.1))
            .evaluate(&[&a], C, IndexId(77))
            .unwrap_err();
        assert!(matches!(err, InteractionError::Model(_)));
    }
}
