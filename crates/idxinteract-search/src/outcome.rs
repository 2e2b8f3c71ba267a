//! Search results.

use std::fmt;

use idxinteract_core::{IndexId, StatementId};
use idxinteract_iip::Phase;

use crate::stats::SearchStats;

/// A pair confirmed to interact, with the statement that proves it.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractingPair {
    pub c: IndexId,
    pub d: IndexId,
    pub statement_id: StatementId,
    pub phase: Phase,
    /// Degree of interaction, when measured.
    pub degree: Option<f64>,
}

impl fmt::Display for InteractingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) in {} via {}", self.c, self.d, self.statement_id, self.phase)?;
        if let Some(degree) = self.degree {
            write!(f, ", degree {degree:.4}")?;
        }
        Ok(())
    }
}

/// A pair whose evaluation failed without a confirmed witness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndeterminedPair {
    pub c: IndexId,
    pub d: IndexId,
    /// Statement whose evaluation failed, if the failure was statement-level.
    pub statement_id: Option<StatementId>,
    pub reason: String,
}

/// What the driver concluded for one pair.
#[derive(Debug, Clone, PartialEq)]
pub enum PairVerdict {
    Interacting(InteractingPair),
    NotInteracting,
    Undetermined(UndeterminedPair),
    /// The pair shares no statement.
    Pruned,
}

impl PairVerdict {
    pub fn is_interacting(&self) -> bool {
        matches!(self, PairVerdict::Interacting(_))
    }

    pub fn interacting(&self) -> Option<&InteractingPair> {
        match self {
            PairVerdict::Interacting(pair) => Some(pair),
            _ => None,
        }
    }

    /// Short name used in log events.
    pub fn label(&self) -> &'static str {
        match self {
            PairVerdict::Interacting(_) => "interacting",
            PairVerdict::NotInteracting => "not_interacting",
            PairVerdict::Undetermined(_) => "undetermined",
            PairVerdict::Pruned => "pruned",
        }
    }
}

/// Result of a full pair search.
///
/// Both lists are sorted by `(c, d)` with `c < d`.
#[derive(Debug, Clone, Default)]
pub struct PairSearchOutcome {
    pub interacting: Vec<InteractingPair>,
    pub undetermined: Vec<UndeterminedPair>,
    pub stats: SearchStats,
}

impl PairSearchOutcome {
    /// The interacting pairs as `(c, d)` tuples.
    pub fn pairs(&self) -> Vec<(IndexId, IndexId)> {
        self.interacting.iter().map(|p| (p.c, p.d)).collect()
    }

    pub fn contains(&self, a: IndexId, b: IndexId) -> bool {
        let (c, d) = if a < b { (a, b) } else { (b, a) };
        self.interacting.iter().any(|p| p.c == c && p.d == d)
    }
}
