//! Pair requests.

use std::collections::BTreeSet;

use idxinteract_core::{IndexId, InteractionError, PlanCostModel, Result};

/// One candidate pair evaluated against one statement.
///
/// `candidates`, when set, restricts the base configuration to the listed
/// indexes; every other index of the statement is held absent.
#[derive(Debug, Clone, PartialEq)]
pub struct PairRequest {
    pub c: IndexId,
    pub slot_of_c: usize,
    pub d: IndexId,
    pub slot_of_d: usize,
    pub delta: f64,
    pub candidates: Option<BTreeSet<IndexId>>,
}

impl PairRequest {
    /// Builds a request for `(c, d)`, reading their slots from `plan`.
    ///
    /// # Errors
    ///
    /// Fails if `c == d`, if `delta` is not finite, or if the statement does
    /// not expose one of the indexes.
    pub fn resolve(plan: &PlanCostModel, c: IndexId, d: IndexId, delta: f64) -> Result<Self> {
        if c == d {
            return Err(InteractionError::InvalidInput(format!(
                "pair ({c}, {d}) names the same index twice"
            )));
        }
        if !delta.is_finite() {
            return Err(InteractionError::InvalidInput(format!(
                "interaction threshold {delta} is not finite"
            )));
        }
        Ok(Self {
            c,
            slot_of_c: plan.slot_of(c)?,
            d,
            slot_of_d: plan.slot_of(d)?,
            delta,
            candidates: None,
        })
    }

    pub fn with_candidates(mut self, candidates: BTreeSet<IndexId>) -> Self {
        self.candidates = Some(candidates);
        self
    }

    /// Returns true if both indexes compete for one slot.
    pub fn same_slot(&self) -> bool {
        self.slot_of_c == self.slot_of_d
    }

    /// Returns true if `index` may appear in the base configuration.
    pub fn admits(&self, index: IndexId) -> bool {
        self.candidates
            .as_ref()
            .map_or(true, |set| set.contains(&index))
    }
}
