//! Pair search statistics.
//!
//! [`StatsCollector`] is shared by the worker threads of one search and
//! updated with relaxed atomics. [`SearchStats`] is a plain snapshot of it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use idxinteract_iip::PairEvaluation;

/// Counters of one pair search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Indexes usable by at least one statement.
    pub candidate_indexes: u64,
    /// Unordered pairs enumerated.
    pub pairs_considered: u64,
    /// Pairs skipped because they share no statement.
    pub pairs_pruned: u64,
    /// (pair, statement) programs built in per-statement mode.
    pub statement_evaluations: u64,
    /// Combined programs built in batched mode.
    pub batched_programs: u64,
    pub primary_solves: u64,
    pub alternative_solves: u64,
    pub refinement_solves: u64,
    pub solver_errors: u64,
    pub retries: u64,
    /// Branch-and-bound nodes across all solves.
    pub nodes: u64,
    pub interacting: u64,
    pub undetermined: u64,
    pub elapsed: Duration,
}

impl SearchStats {
    /// Pairs that reached the solver.
    pub fn pairs_evaluated(&self) -> u64 {
        self.pairs_considered - self.pairs_pruned
    }

    /// Fraction of enumerated pairs removed by pruning.
    pub fn prune_rate(&self) -> f64 {
        if self.pairs_considered == 0 {
            0.0
        } else {
            self.pairs_pruned as f64 / self.pairs_considered as f64
        }
    }
}

/// Thread-safe collector behind [`SearchStats`].
#[derive(Debug)]
pub struct StatsCollector {
    start_time: Instant,
    candidate_indexes: AtomicU64,
    pairs_considered: AtomicU64,
    pairs_pruned: AtomicU64,
    statement_evaluations: AtomicU64,
    batched_programs: AtomicU64,
    primary_solves: AtomicU64,
    alternative_solves: AtomicU64,
    refinement_solves: AtomicU64,
    solver_errors: AtomicU64,
    retries: AtomicU64,
    nodes: AtomicU64,
    interacting: AtomicU64,
    undetermined: AtomicU64,
}

impl StatsCollector {
    /// Creates a collector; the start time is recorded now.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            candidate_indexes: AtomicU64::new(0),
            pairs_considered: AtomicU64::new(0),
            pairs_pruned: AtomicU64::new(0),
            statement_evaluations: AtomicU64::new(0),
            batched_programs: AtomicU64::new(0),
            primary_solves: AtomicU64::new(0),
            alternative_solves: AtomicU64::new(0),
            refinement_solves: AtomicU64::new(0),
            solver_errors: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            nodes: AtomicU64::new(0),
            interacting: AtomicU64::new(0),
            undetermined: AtomicU64::new(0),
        }
    }

    pub fn record_candidates(&self, count: u64) {
        self.candidate_indexes.store(count, Ordering::Relaxed);
    }

    pub fn record_pairs(&self, considered: u64) {
        self.pairs_considered.fetch_add(considered, Ordering::Relaxed);
    }

    pub fn record_pruned(&self) {
        self.pairs_pruned.fetch_add(1, Ordering::Relaxed);
    }

    /// Folds the solver counters of one statement-level evaluation.
    pub fn record_evaluation(&self, eval: &PairEvaluation) {
        self.statement_evaluations.fetch_add(1, Ordering::Relaxed);
        self.record_solves(
            eval.primary_solves as u64,
            eval.alternative_solves as u64,
            eval.refinement_solves as u64,
        );
        self.record_failures(eval.solver_errors as u64, eval.retries as u64);
        self.nodes.fetch_add(eval.nodes, Ordering::Relaxed);
    }

    pub fn record_batched_program(&self) {
        self.batched_programs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_solves(&self, primary: u64, alternative: u64, refinement: u64) {
        self.primary_solves.fetch_add(primary, Ordering::Relaxed);
        self.alternative_solves.fetch_add(alternative, Ordering::Relaxed);
        self.refinement_solves.fetch_add(refinement, Ordering::Relaxed);
    }

    pub fn record_failures(&self, solver_errors: u64, retries: u64) {
        self.solver_errors.fetch_add(solver_errors, Ordering::Relaxed);
        self.retries.fetch_add(retries, Ordering::Relaxed);
    }

    pub fn record_nodes(&self, nodes: u64) {
        self.nodes.fetch_add(nodes, Ordering::Relaxed);
    }

    pub fn record_interacting(&self) {
        self.interacting.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_undetermined(&self) {
        self.undetermined.fetch_add(1, Ordering::Relaxed);
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Takes a snapshot without consuming the collector.
    pub fn snapshot(&self) -> SearchStats {
        SearchStats {
            candidate_indexes: self.candidate_indexes.load(Ordering::Relaxed),
            pairs_considered: self.pairs_considered.load(Ordering::Relaxed),
            pairs_pruned: self.pairs_pruned.load(Ordering::Relaxed),
            statement_evaluations: self.statement_evaluations.load(Ordering::Relaxed),
            batched_programs: self.batched_programs.load(Ordering::Relaxed),
            primary_solves: self.primary_solves.load(Ordering::Relaxed),
            alternative_solves: self.alternative_solves.load(Ordering::Relaxed),
            refinement_solves: self.refinement_solves.load(Ordering::Relaxed),
            solver_errors: self.solver_errors.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            nodes: self.nodes.load(Ordering::Relaxed),
            interacting: self.interacting.load(Ordering::Relaxed),
            undetermined: self.undetermined.load(Ordering::Relaxed),
            elapsed: self.start_time.elapsed(),
        }
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}
