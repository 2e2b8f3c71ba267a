//! Workload of statements and index membership.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{InteractionError, Result};
use crate::index::{IndexId, StatementId};
use crate::plan::PlanCostModel;

/// The statements under analysis, with the statements each index can serve.
///
/// # Example
///
/// ```
/// use idxinteract_core::{IndexId, PlanCostModel, SlotBuilder, StatementId, Workload};
///
/// let q1 = PlanCostModel::builder(StatementId(1), 1)
///     .slot(SlotBuilder::new().index(IndexId(1), [1.0]).full_scan([9.0]))
///     .build()
///     .unwrap();
/// let workload = Workload::new(vec![q1]).unwrap();
///
/// assert_eq!(workload.statements_using(IndexId(1)).len(), 1);
/// assert!(workload.statements_using(IndexId(2)).is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Workload {
    statements: Vec<PlanCostModel>,
    usage: BTreeMap<IndexId, BTreeSet<StatementId>>,
    positions: BTreeMap<StatementId, usize>,
}

impl Workload {
    /// Creates a workload; statement ids must be unique.
    pub fn new(statements: Vec<PlanCostModel>) -> Result<Self> {
        let mut usage: BTreeMap<IndexId, BTreeSet<StatementId>> = BTreeMap::new();
        let mut positions = BTreeMap::new();
        for (pos, model) in statements.iter().enumerate() {
            let q = model.statement_id();
            if positions.insert(q, pos).is_some() {
                return Err(InteractionError::InvalidInput(format!(
                    "statement {q} appears more than once in the workload"
                )));
            }
            for id in model.candidate_indexes() {
                if model.is_compatible(id) {
                    usage.entry(id).or_default().insert(q);
                }
            }
        }
        Ok(Self {
            statements,
            usage,
            positions,
        })
    }

    pub fn statements(&self) -> &[PlanCostModel] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn statement(&self, id: StatementId) -> Option<&PlanCostModel> {
        self.positions.get(&id).map(|&pos| &self.statements[pos])
    }

    /// Indexes compatible with at least one slot of at least one statement.
    pub fn candidate_indexes(&self) -> impl Iterator<Item = IndexId> + '_ {
        self.usage.keys().copied()
    }

    /// Statements in which `index` is usable. Empty for unknown indexes.
    pub fn statements_using(&self, index: IndexId) -> BTreeSet<StatementId> {
        self.usage.get(&index).cloned().unwrap_or_default()
    }

    /// Statements in which both indexes are usable.
    pub fn shared_statements(&self, c: IndexId, d: IndexId) -> BTreeSet<StatementId> {
        match (self.usage.get(&c), self.usage.get(&d)) {
            (Some(sc), Some(sd)) => sc.intersection(sd).copied().collect(),
            _ => BTreeSet::new(),
        }
    }
}
