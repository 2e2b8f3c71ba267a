//! Two-phase solve protocol for one (pair, statement) evaluation.
//!
//! ```text
//! BuildPrimary -> SolvePrimary -> Interacting
//!                      |
//!                      v
//!              BuildAlternative -> SolveAlternative -> Interacting | NotInteracting
//!                                                            |
//!                                                          Clear
//! ```
//!
//! When `c` and `d` share a slot the protocol starts at `BuildAlternative`.
//! The primary inequality is retracted from the live model before the
//! alternative one is added. `Clear` runs after every attempt, successful
//! or not.

use std::fmt;

use tracing::{debug, warn};

use idxinteract_config::InteractionConfig;
use idxinteract_core::{IndexId, PlanCostModel, Result, StatementId};
use idxinteract_ilp::{ConstraintHandle, IlpModel, SolveOutcome, SolverError, SolverService};

use crate::builder::ConstraintBuilder;
use crate::cost::VariantCosts;
use crate::request::PairRequest;

/// Which inequality produced a witness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Primary,
    Alternative,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Primary => write!(f, "primary"),
            Phase::Alternative => write!(f, "alternative"),
        }
    }
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// A witness exists. `degree` is set when degree measurement is on.
    Interacting { phase: Phase, degree: Option<f64> },
    NotInteracting,
    /// The solver failed on every attempt.
    Undetermined { reason: String },
}

impl Verdict {
    pub fn is_interacting(&self) -> bool {
        matches!(self, Verdict::Interacting { .. })
    }

    pub fn is_undetermined(&self) -> bool {
        matches!(self, Verdict::Undetermined { .. })
    }

    pub fn degree(&self) -> Option<f64> {
        match self {
            Verdict::Interacting { degree, .. } => *degree,
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Interacting {
                phase,
                degree: Some(doi),
            } => write!(f, "interacting ({phase}, degree {doi:.4})"),
            Verdict::Interacting { phase, degree: None } => write!(f, "interacting ({phase})"),
            Verdict::NotInteracting => write!(f, "not interacting"),
            Verdict::Undetermined { reason } => write!(f, "undetermined: {reason}"),
        }
    }
}

/// States visited by the protocol, recorded for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    BuildPrimary,
    SolvePrimary,
    BuildAlternative,
    SolveAlternative,
    Interacting,
    NotInteracting,
    Clear,
}

/// Protocol parameters, usually taken from [`InteractionConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolSettings {
    pub delta: f64,
    pub measure_degree: bool,
    pub degree_refinement_limit: usize,
    pub solver_retries: u32,
    /// Smallest `|net|` a refinement witness must show; kept above the
    /// solver's constraint tolerance.
    pub net_epsilon: f64,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self::from(&InteractionConfig::default())
    }
}

impl From<&InteractionConfig> for ProtocolSettings {
    fn from(config: &InteractionConfig) -> Self {
        Self {
            delta: config.delta,
            measure_degree: config.measure_degree,
            degree_refinement_limit: config.degree_refinement_limit,
            solver_retries: config.solver_retries,
            net_epsilon: 10.0 * config.solver.tolerance,
        }
    }
}

impl ProtocolSettings {
    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    pub fn with_measure_degree(mut self, measure: bool) -> Self {
        self.measure_degree = measure;
        self
    }

    pub fn with_solver_retries(mut self, retries: u32) -> Self {
        self.solver_retries = retries;
        self
    }
}

/// Everything one evaluation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PairEvaluation {
    pub statement_id: StatementId,
    pub c: IndexId,
    pub d: IndexId,
    pub verdict: Verdict,
    /// Variant costs of the reported witness.
    pub witness: Option<VariantCosts>,
    /// States of the final attempt.
    pub states: Vec<ProtocolState>,
    pub primary_solves: u32,
    pub alternative_solves: u32,
    pub refinement_solves: u32,
    pub solver_errors: u32,
    pub retries: u32,
    pub nodes: u64,
}

impl PairEvaluation {
    fn new(statement_id: StatementId, c: IndexId, d: IndexId) -> Self {
        Self {
            statement_id,
            c,
            d,
            verdict: Verdict::NotInteracting,
            witness: None,
            states: Vec::new(),
            primary_solves: 0,
            alternative_solves: 0,
            refinement_solves: 0,
            solver_errors: 0,
            retries: 0,
            nodes: 0,
        }
    }
}

enum Attempt {
    Decided {
        verdict: Verdict,
        witness: Option<VariantCosts>,
    },
    SolverFailed(SolverError),
}

/// Decides one (pair, statement) evaluation against a solver service.
///
/// Each attempt owns a fresh model from the service and clears it on exit.
///
/// # Example
///
/// ```
/// use idxinteract_core::{IndexId, PlanCostModel, SlotBuilder, StatementId};
/// use idxinteract_iip::{Phase, ProtocolSettings, SolveProtocol, Verdict};
/// use idxinteract_ilp::BranchAndBoundSolver;
///
/// // Both indexes compete for one slot.
/// let plan = PlanCostModel::builder(StatementId(4), 1)
///     .slot(
///         SlotBuilder::new()
///             .index(IndexId(1), [10.0])
///             .index(IndexId(2), [20.0])
///             .full_scan([100.0]),
///     )
///     .build()
///     .unwrap();
///
/// let solver = BranchAndBoundSolver::default();
/// let protocol = SolveProtocol::new(&solver, ProtocolSettings::default());
/// let eval = protocol.evaluate(&plan, IndexId(1), IndexId(2)).unwrap();
///
/// assert_eq!(eval.verdict, Verdict::Interacting { phase: Phase::Alternative, degree: None });
/// assert_eq!(eval.primary_solves, 0);
/// ```
#[derive(Debug)]
pub struct SolveProtocol<'s, S> {
    service: &'s S,
    settings: ProtocolSettings,
}

impl<'s, S: SolverService> SolveProtocol<'s, S> {
    pub fn new(service: &'s S, settings: ProtocolSettings) -> Self {
        Self { service, settings }
    }

    pub fn from_config(service: &'s S, config: &InteractionConfig) -> Self {
        Self::new(service, ProtocolSettings::from(config))
    }

    pub fn settings(&self) -> &ProtocolSettings {
        &self.settings
    }

    /// Evaluates `(c, d)` on `plan` at the configured threshold.
    pub fn evaluate(&self, plan: &PlanCostModel, c: IndexId, d: IndexId) -> Result<PairEvaluation> {
        let request = PairRequest::resolve(plan, c, d, self.settings.delta)?;
        self.evaluate_request(plan, request)
    }

    /// Runs the protocol, retrying solver failures with a fresh model.
    ///
    /// # Errors
    ///
    /// Model-construction errors are returned immediately and never retried.
    /// Solver failures become [`Verdict::Undetermined`] once the retries are
    /// used up.
    pub fn evaluate_request(&self, plan: &PlanCostModel, request: PairRequest) -> Result<PairEvaluation> {
        let mut eval = PairEvaluation::new(plan.statement_id(), request.c, request.d);
        let mut attempt = 0;
        loop {
            eval.states.clear();
            let mut model = self.service.create_model();
            let result = self.run(&mut model, plan, &request, &mut eval);
            model.clear();
            eval.states.push(ProtocolState::Clear);

            match result? {
                Attempt::Decided { verdict, witness } => {
                    eval.verdict = verdict;
                    eval.witness = witness;
                    debug!(
                        event = "statement_verdict",
                        statement = %eval.statement_id,
                        c = %eval.c,
                        d = %eval.d,
                        verdict = %eval.verdict,
                    );
                    return Ok(eval);
                }
                Attempt::SolverFailed(err) => {
                    eval.solver_errors += 1;
                    if attempt < self.settings.solver_retries {
                        attempt += 1;
                        eval.retries += 1;
                        warn!(
                            event = "solver_retry",
                            statement = %eval.statement_id,
                            c = %eval.c,
                            d = %eval.d,
                            attempt = attempt,
                            error = %err,
                        );
                        continue;
                    }
                    eval.verdict = Verdict::Undetermined {
                        reason: err.to_string(),
                    };
                    warn!(
                        event = "statement_undetermined",
                        statement = %eval.statement_id,
                        c = %eval.c,
                        d = %eval.d,
                        error = %err,
                    );
                    return Ok(eval);
                }
            }
        }
    }

    fn run<M: IlpModel>(
        &self,
        model: &mut M,
        plan: &PlanCostModel,
        request: &PairRequest,
        eval: &mut PairEvaluation,
    ) -> Result<Attempt> {
        let delta = request.delta;
        let mut builder = ConstraintBuilder::new(plan, request.clone())?;
        builder.build(model)?;

        let mut found: Option<(Phase, VariantCosts, ConstraintHandle)> = None;
        if let Some(primary) = builder.primary_inequality(delta) {
            eval.states.push(ProtocolState::BuildPrimary);
            let handle = model.add_linear_constraint(primary)?;
            eval.states.push(ProtocolState::SolvePrimary);
            eval.primary_solves += 1;
            match self.solve(model, eval) {
                SolveOutcome::Feasible(values) => {
                    let costs = builder.cost_expressions().evaluate(&values);
                    found = Some((Phase::Primary, costs, handle));
                }
                SolveOutcome::Infeasible => model.remove_constraint(handle)?,
                SolveOutcome::Error(err) => return Ok(Attempt::SolverFailed(err)),
            }
            debug!(
                event = "phase_result",
                statement = %plan.statement_id(),
                phase = %Phase::Primary,
                feasible = found.is_some(),
            );
        }

        if found.is_none() {
            eval.states.push(ProtocolState::BuildAlternative);
            let handle = model.add_linear_constraint(builder.alternative_inequality(delta))?;
            eval.states.push(ProtocolState::SolveAlternative);
            eval.alternative_solves += 1;
            match self.solve(model, eval) {
                SolveOutcome::Feasible(values) => {
                    let costs = builder.cost_expressions().evaluate(&values);
                    found = Some((Phase::Alternative, costs, handle));
                }
                SolveOutcome::Infeasible => {}
                SolveOutcome::Error(err) => return Ok(Attempt::SolverFailed(err)),
            }
            debug!(
                event = "phase_result",
                statement = %plan.statement_id(),
                phase = %Phase::Alternative,
                feasible = found.is_some(),
            );
        }

        let Some((phase, costs, live)) = found else {
            eval.states.push(ProtocolState::NotInteracting);
            return Ok(Attempt::Decided {
                verdict: Verdict::NotInteracting,
                witness: None,
            });
        };
        eval.states.push(ProtocolState::Interacting);

        if !self.settings.measure_degree {
            return Ok(Attempt::Decided {
                verdict: Verdict::Interacting {
                    phase,
                    degree: None,
                },
                witness: Some(costs),
            });
        }

        let best = self.refine(model, &mut builder, live, costs, eval)?;
        Ok(Attempt::Decided {
            verdict: Verdict::Interacting {
                phase,
                degree: Some(best.degree()),
            },
            witness: Some(best),
        })
    }

    /// Raises the threshold just above the best degree found until neither
    /// inequality admits a witness, so the reported degree is the maximum
    /// over all base configurations.
    ///
    /// Each refined inequality comes with a row forcing `net` away from
    /// zero in its direction; without it a base configuration whose four
    /// variant costs are all zero satisfies `0 ≤ 0` at every threshold.
    fn refine<M: IlpModel>(
        &self,
        model: &mut M,
        builder: &mut ConstraintBuilder<'_>,
        live: ConstraintHandle,
        mut best: VariantCosts,
        eval: &mut PairEvaluation,
    ) -> Result<VariantCosts> {
        let epsilon = self.settings.net_epsilon;
        let mut live = vec![live];
        for _ in 0..self.settings.degree_refinement_limit {
            let degree = best.degree();
            if !degree.is_finite() {
                break;
            }
            let target = degree * (1.0 + 1e-6) + 1e-9;
            for handle in live.drain(..) {
                model.remove_constraint(handle)?;
            }

            let mut improved = None;
            for phase in [Phase::Primary, Phase::Alternative] {
                let inequality = match phase {
                    Phase::Primary => builder.primary_inequality(target),
                    Phase::Alternative => Some(builder.alternative_inequality(target)),
                };
                let Some(inequality) = inequality else {
                    continue;
                };
                let handles = [
                    model.add_linear_constraint(inequality)?,
                    model.add_linear_constraint(builder.nonzero_net_row(phase, epsilon))?,
                ];
                eval.refinement_solves += 1;
                match self.solve(model, eval) {
                    SolveOutcome::Feasible(values) => {
                        improved = Some((builder.cost_expressions().evaluate(&values), handles));
                        break;
                    }
                    SolveOutcome::Infeasible => {
                        for handle in handles {
                            model.remove_constraint(handle)?;
                        }
                    }
                    SolveOutcome::Error(err) => {
                        // Keep the best witness found so far.
                        warn!(
                            event = "refinement_stopped",
                            statement = %builder.statement_id(),
                            degree = degree,
                            error = %err,
                        );
                        return Ok(best);
                    }
                }
            }

            match improved {
                Some((costs, handles)) if costs.degree() > degree => {
                    best = costs;
                    live.extend(handles);
                }
                _ => break,
            }
        }
        Ok(best)
    }

    fn solve<M: IlpModel>(&self, model: &mut M, eval: &mut PairEvaluation) -> SolveOutcome {
        let outcome = model.solve();
        eval.nodes += model.last_solve_nodes();
        outcome
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
