//! Pair search over a workload.
//!
//! Pairs are independent: each worker evaluates a pair with models of its
//! own, so the search parallelizes over pairs on a rayon pool sized by
//! [`ThreadCount`](idxinteract_config::ThreadCount).

use rayon::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use idxinteract_config::{InteractionConfig, SolveMode};
use idxinteract_core::{IndexId, InteractionError, PlanCostModel, Result, Workload};
use idxinteract_iip::{ProtocolSettings, SolveProtocol, Verdict};
use idxinteract_ilp::{BranchAndBoundSolver, SolverService};

use crate::batched::BatchedProgram;
use crate::outcome::{InteractingPair, PairSearchOutcome, PairVerdict, UndeterminedPair};
use crate::stats::StatsCollector;

/// All unordered pairs `(c, d)` with `c < d` over `indexes`.
pub fn candidate_pairs(indexes: &[IndexId]) -> Vec<(IndexId, IndexId)> {
    let mut sorted = indexes.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let mut pairs = Vec::with_capacity(sorted.len() * sorted.len().saturating_sub(1) / 2);
    for (i, &c) in sorted.iter().enumerate() {
        for &d in &sorted[i + 1..] {
            pairs.push((c, d));
        }
    }
    pairs
}

fn ordered(a: IndexId, b: IndexId) -> (IndexId, IndexId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Finds every interacting pair of candidate indexes in a workload.
///
/// # Example
///
/// ```
/// use idxinteract_config::InteractionConfig;
/// use idxinteract_core::{IndexId, PlanCostModel, SlotBuilder, StatementId, Workload};
/// use idxinteract_search::PairSearchDriver;
///
/// let q = PlanCostModel::builder(StatementId(1), 1)
///     .slot(
///         SlotBuilder::new()
///             .index(IndexId(1), [10.0])
///             .index(IndexId(2), [20.0])
///             .full_scan([100.0]),
///     )
///     .build()
///     .unwrap();
/// let workload = Workload::new(vec![q]).unwrap();
///
/// let outcome = PairSearchDriver::new(InteractionConfig::default())
///     .search(&workload)
///     .unwrap();
/// assert!(outcome.contains(IndexId(1), IndexId(2)));
/// ```
#[derive(Debug)]
pub struct PairSearchDriver<S = BranchAndBoundSolver> {
    service: S,
    config: InteractionConfig,
}

impl PairSearchDriver<BranchAndBoundSolver> {
    /// Creates a driver on the built-in backend configured by `config.solver`.
    pub fn new(config: InteractionConfig) -> Self {
        let service = BranchAndBoundSolver::new(config.solver.node_limit, config.solver.tolerance);
        Self { service, config }
    }
}

impl<S: SolverService> PairSearchDriver<S> {
    pub fn with_service(service: S, config: InteractionConfig) -> Self {
        Self { service, config }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Runs the search and returns every confirmed pair.
    pub fn search(&self, workload: &Workload) -> Result<PairSearchOutcome> {
        let (sender, _receiver) = mpsc::unbounded_channel();
        self.search_with_channel(workload, sender)
    }

    /// Runs the search, sending each confirmed pair through `sender` as
    /// soon as its worker finds it.
    ///
    /// Send failures (receiver dropped) are ignored.
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration or if the worker pool cannot start.
    /// Per-pair failures never abort the search; they are reported in
    /// [`PairSearchOutcome::undetermined`].
    pub fn search_with_channel(
        &self,
        workload: &Workload,
        sender: mpsc::UnboundedSender<InteractingPair>,
    ) -> Result<PairSearchOutcome> {
        self.config.validate()?;

        let stats = StatsCollector::new();
        let candidates: Vec<IndexId> = workload.candidate_indexes().collect();
        let pairs = candidate_pairs(&candidates);
        stats.record_candidates(candidates.len() as u64);
        stats.record_pairs(pairs.len() as u64);

        let threads = self.config.thread_count.resolve(pairs.len());
        info!(
            event = "search_start",
            statements = workload.len(),
            candidate_indexes = candidates.len(),
            pairs = pairs.len(),
            threads = threads,
            mode = ?self.config.solve_mode,
            delta = self.config.delta,
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("idxinteract-worker-{i}"))
            .build()
            .map_err(|e| InteractionError::Internal(format!("failed to start worker pool: {e}")))?;

        let verdicts: Vec<PairVerdict> = pool.install(|| {
            pairs
                .par_iter()
                .map(|&(c, d)| {
                    let verdict = self.evaluate_with(workload, c, d, &stats);
                    if let PairVerdict::Interacting(pair) = &verdict {
                        let _ = sender.send(pair.clone());
                    }
                    verdict
                })
                .collect()
        });

        let mut outcome = PairSearchOutcome::default();
        for verdict in verdicts {
            match verdict {
                PairVerdict::Interacting(pair) => outcome.interacting.push(pair),
                PairVerdict::Undetermined(pair) => outcome.undetermined.push(pair),
                PairVerdict::NotInteracting | PairVerdict::Pruned => {}
            }
        }
        outcome.interacting.sort_by_key(|p| (p.c, p.d));
        outcome.undetermined.sort_by_key(|p| (p.c, p.d));
        outcome.stats = stats.snapshot();

        info!(
            event = "search_end",
            pairs = outcome.stats.pairs_considered,
            pruned = outcome.stats.pairs_pruned,
            interacting = outcome.interacting.len(),
            undetermined = outcome.undetermined.len(),
            solver_errors = outcome.stats.solver_errors,
            duration_ms = outcome.stats.elapsed.as_millis() as u64,
        );
        Ok(outcome)
    }

    /// Evaluates a single pair, in either order, against the workload.
    pub fn evaluate_pair(&self, workload: &Workload, c: IndexId, d: IndexId) -> PairVerdict {
        self.evaluate_with(workload, c, d, &StatsCollector::new())
    }

    fn evaluate_with(
        &self,
        workload: &Workload,
        c: IndexId,
        d: IndexId,
        stats: &StatsCollector,
    ) -> PairVerdict {
        let shared = workload.shared_statements(c, d);
        if shared.is_empty() {
            stats.record_pruned();
            debug!(event = "pair_pruned", c = %c, d = %d);
            return PairVerdict::Pruned;
        }
        let plans: Vec<&PlanCostModel> = shared.iter().filter_map(|&q| workload.statement(q)).collect();

        let verdict = match self.config.solve_mode {
            SolveMode::PerStatement => self.per_statement(&plans, c, d, stats),
            SolveMode::Batched => self.batched(&plans, c, d, stats),
        };
        match &verdict {
            PairVerdict::Interacting(_) => stats.record_interacting(),
            PairVerdict::Undetermined(_) => stats.record_undetermined(),
            PairVerdict::NotInteracting | PairVerdict::Pruned => {}
        }
        debug!(
            event = "pair_verdict",
            c = %c,
            d = %d,
            statements = plans.len(),
            verdict = verdict.label(),
        );
        verdict
    }

    /// Runs the protocol statement by statement.
    ///
    /// Without degree measurement the first interacting statement decides.
    /// With it, every shared statement is evaluated and the one with the
    /// largest degree is reported.
    fn per_statement(
        &self,
        plans: &[&PlanCostModel],
        c: IndexId,
        d: IndexId,
        stats: &StatsCollector,
    ) -> PairVerdict {
        let (lo, hi) = ordered(c, d);
        let protocol = SolveProtocol::from_config(&self.service, &self.config);
        let mut best: Option<InteractingPair> = None;
        let mut failure: Option<UndeterminedPair> = None;

        for plan in plans {
            let q = plan.statement_id();
            let eval = match protocol.evaluate(plan, c, d) {
                Ok(eval) => eval,
                Err(err) => {
                    // A witness from an earlier statement still stands.
                    if let Some(pair) = best {
                        warn!(
                            event = "statement_failed",
                            statement = %q,
                            c = %c,
                            d = %d,
                            error = %err,
                        );
                        return PairVerdict::Interacting(pair);
                    }
                    return PairVerdict::Undetermined(UndeterminedPair {
                        c: lo,
                        d: hi,
                        statement_id: Some(q),
                        reason: err.to_string(),
                    });
                }
            };
            stats.record_evaluation(&eval);

            match eval.verdict {
                Verdict::Interacting { phase, degree } => {
                    let pair = InteractingPair {
                        c: lo,
                        d: hi,
                        statement_id: q,
                        phase,
                        degree,
                    };
                    if !self.config.measure_degree {
                        return PairVerdict::Interacting(pair);
                    }
                    let better = match &best {
                        Some(b) => degree.unwrap_or(0.0) > b.degree.unwrap_or(0.0),
                        None => true,
                    };
                    if better {
                        best = Some(pair);
                    }
                }
                Verdict::NotInteracting => {}
                Verdict::Undetermined { reason } => {
                    if failure.is_none() {
                        failure = Some(UndeterminedPair {
                            c: lo,
                            d: hi,
                            statement_id: Some(q),
                            reason,
                        });
                    }
                }
            }
        }

        match (best, failure) {
            (Some(pair), _) => PairVerdict::Interacting(pair),
            (None, Some(pair)) => PairVerdict::Undetermined(pair),
            (None, None) => PairVerdict::NotInteracting,
        }
    }

    /// Folds all shared statements into one program.
    ///
    /// Degree measurement falls back to the per-statement refinement once
    /// the pair is confirmed.
    fn batched(
        &self,
        plans: &[&PlanCostModel],
        c: IndexId,
        d: IndexId,
        stats: &StatsCollector,
    ) -> PairVerdict {
        let (lo, hi) = ordered(c, d);
        stats.record_batched_program();
        let program = BatchedProgram::new(&self.service, ProtocolSettings::from(&self.config));
        let eval = match program.evaluate(plans, c, d) {
            Ok(eval) => eval,
            Err(err) => {
                return PairVerdict::Undetermined(UndeterminedPair {
                    c: lo,
                    d: hi,
                    statement_id: None,
                    reason: err.to_string(),
                });
            }
        };
        stats.record_failures(eval.solver_errors as u64, eval.retries as u64);
        stats.record_nodes(eval.nodes);

        match (eval.verdict, eval.statement_id) {
            (Verdict::Interacting { phase, .. }, Some(statement_id)) => {
                let pair = InteractingPair {
                    c: lo,
                    d: hi,
                    statement_id,
                    phase,
                    degree: None,
                };
                if !self.config.measure_degree {
                    return PairVerdict::Interacting(pair);
                }
                match self.per_statement(plans, c, d, stats) {
                    measured @ PairVerdict::Interacting(_) => measured,
                    _ => PairVerdict::Interacting(pair),
                }
            }
            (Verdict::Undetermined { reason }, _) => PairVerdict::Undetermined(UndeterminedPair {
                c: lo,
                d: hi,
                statement_id: None,
                reason,
            }),
            _ => PairVerdict::NotInteracting,
        }
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
