//! Variable pool for one statement's interaction program.
//!
//! Keys are flattened into a dense arena with strides computed from the
//! statement's template, slot and entry counts. Within one variant block:
//!
//! ```text
//! PlanSelect          [0, T)
//! SlotIndexUse        T + t*N + e
//! IndexPresent        T + T*N + e
//! OptimalCertificate  T + T*N + N + t*N + e
//! ```
//!
//! where `N` is the total number of slot entries and `e` the flattened
//! position of an entry.

use std::fmt;

use idxinteract_core::{ConfigurationVariant, IndexId, IndexRef, ModelError, PlanCostModel, StatementId};
use idxinteract_ilp::{IlpModel, VarHandle};

/// Family a decision variable belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VariableKind {
    /// Template `t` realizes the variant's optimal cost.
    PlanSelect,
    /// Template `t` uses an entry at a slot.
    SlotIndexUse,
    /// A candidate index is part of the variant's configuration.
    IndexPresent,
    /// Template `t` paired with an entry is the cheapest present access.
    OptimalCertificate,
}

impl VariableKind {
    pub const ALL: [VariableKind; 4] = [
        VariableKind::PlanSelect,
        VariableKind::SlotIndexUse,
        VariableKind::IndexPresent,
        VariableKind::OptimalCertificate,
    ];

    /// One-letter prefix used in variable names.
    pub fn prefix(self) -> &'static str {
        match self {
            VariableKind::PlanSelect => "x",
            VariableKind::SlotIndexUse => "s",
            VariableKind::IndexPresent => "y",
            VariableKind::OptimalCertificate => "u",
        }
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableKind::PlanSelect => write!(f, "PlanSelect"),
            VariableKind::SlotIndexUse => write!(f, "SlotIndexUse"),
            VariableKind::IndexPresent => write!(f, "IndexPresent"),
            VariableKind::OptimalCertificate => write!(f, "OptimalCertificate"),
        }
    }
}

/// `(theta, kind, template?, slot?, index?)`
///
/// Only the constructors can build a key, so every key carries exactly
/// the components its kind needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableKey {
    theta: ConfigurationVariant,
    kind: VariableKind,
    template: Option<usize>,
    slot: Option<usize>,
    index: Option<IndexRef>,
}

impl VariableKey {
    pub fn plan_select(theta: ConfigurationVariant, template: usize) -> Self {
        Self {
            theta,
            kind: VariableKind::PlanSelect,
            template: Some(template),
            slot: None,
            index: None,
        }
    }

    pub fn slot_index_use(theta: ConfigurationVariant, template: usize, slot: usize, index: IndexRef) -> Self {
        Self {
            theta,
            kind: VariableKind::SlotIndexUse,
            template: Some(template),
            slot: Some(slot),
            index: Some(index),
        }
    }

    pub fn index_present(theta: ConfigurationVariant, slot: usize, index: IndexId) -> Self {
        Self {
            theta,
            kind: VariableKind::IndexPresent,
            template: None,
            slot: Some(slot),
            index: Some(IndexRef::Index(index)),
        }
    }

    pub fn certificate(theta: ConfigurationVariant, template: usize, slot: usize, index: IndexRef) -> Self {
        Self {
            theta,
            kind: VariableKind::OptimalCertificate,
            template: Some(template),
            slot: Some(slot),
            index: Some(index),
        }
    }

    pub fn theta(&self) -> ConfigurationVariant {
        self.theta
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    pub fn template(&self) -> Option<usize> {
        self.template
    }

    pub fn slot(&self) -> Option<usize> {
        self.slot
    }

    pub fn index(&self) -> Option<IndexRef> {
        self.index
    }
}

/// Owns the identity of every binary variable of one statement's program.
///
/// The pool borrows the statement's [`PlanCostModel`] to validate keys and
/// derive names; the solver model only ever sees the names.
///
/// # Example
///
/// ```
/// use idxinteract_core::{ConfigurationVariant, IndexId, IndexRef, PlanCostModel, SlotBuilder, StatementId};
/// use idxinteract_iip::{VariableKey, VariablePool};
/// use idxinteract_ilp::{BranchAndBoundSolver, SolverService};
///
/// let plan = PlanCostModel::builder(StatementId(3), 1)
///     .slot(SlotBuilder::new().index(IndexId(7), [1.0]).full_scan([9.0]))
///     .build()
///     .unwrap();
/// let mut model = BranchAndBoundSolver::default().create_model();
/// let mut pool = VariablePool::new(&plan);
///
/// let key = VariableKey::index_present(ConfigurationVariant::CD, 0, IndexId(7));
/// let var = pool.create_and_store(&mut model, key).unwrap();
/// assert_eq!(pool.get(key).unwrap(), var);
/// assert_eq!(pool.name(&key), "y(CD,q3,0,i7)");
/// ```
#[derive(Debug, Clone)]
pub struct VariablePool<'m> {
    plan: &'m PlanCostModel,
    slot_offsets: Vec<usize>,
    entry_count: usize,
    block: usize,
    handles: Vec<Option<VarHandle>>,
    created: Vec<(VariableKey, VarHandle)>,
}

impl<'m> VariablePool<'m> {
    pub fn new(plan: &'m PlanCostModel) -> Self {
        let mut slot_offsets = Vec::with_capacity(plan.slot_count());
        let mut entry_count = 0;
        for slot in plan.slots() {
            slot_offsets.push(entry_count);
            entry_count += slot.len();
        }
        let t = plan.template_count();
        let block = t + 2 * t * entry_count + entry_count;
        Self {
            plan,
            slot_offsets,
            entry_count,
            block,
            handles: vec![None; block * ConfigurationVariant::ALL.len()],
            created: Vec::new(),
        }
    }

    pub fn statement_id(&self) -> StatementId {
        self.plan.statement_id()
    }

    pub fn plan(&self) -> &'m PlanCostModel {
        self.plan
    }

    /// Declares the variable for `key` in `model` and records it.
    ///
    /// # Errors
    ///
    /// [`ModelError::DuplicateVariable`] if the key was already created, or
    /// a lookup error if the key names a template, slot or index the
    /// statement does not expose.
    pub fn create_and_store<M: IlpModel>(
        &mut self,
        model: &mut M,
        key: VariableKey,
    ) -> Result<VarHandle, ModelError> {
        let pos = self.position(&key)?;
        if self.handles[pos].is_some() {
            return Err(ModelError::DuplicateVariable {
                name: self.name(&key),
            });
        }
        let var = model.add_binary_variable(&self.name(&key));
        self.handles[pos] = Some(var);
        self.created.push((key, var));
        Ok(var)
    }

    /// Looks up a previously created variable.
    ///
    /// # Errors
    ///
    /// [`ModelError::UnregisteredVariable`] if `key` was never created.
    pub fn get(&self, key: VariableKey) -> Result<VarHandle, ModelError> {
        let pos = self.position(&key)?;
        self.handles[pos].ok_or_else(|| ModelError::UnregisteredVariable {
            name: self.name(&key),
        })
    }

    /// Every created variable, in creation order.
    pub fn enumerate(&self) -> impl Iterator<Item = (VariableKey, VarHandle)> + '_ {
        self.created.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.created.len()
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }

    /// Forgets every variable.
    pub fn clear(&mut self) {
        self.handles.iter_mut().for_each(|h| *h = None);
        self.created.clear();
    }

    /// Human-readable name encoding all key components.
    pub fn name(&self, key: &VariableKey) -> String {
        let q = self.plan.statement_id();
        let mut name = format!("{}({},{}", key.kind.prefix(), key.theta, q);
        if let Some(t) = key.template {
            name.push_str(&format!(",t{t}"));
        }
        if let Some(slot) = key.slot {
            name.push_str(&format!(",{slot}"));
        }
        if let Some(index) = key.index {
            name.push_str(&format!(",{index}"));
        }
        name.push(')');
        name
    }

    fn position(&self, key: &VariableKey) -> Result<usize, ModelError> {
        let t_count = self.plan.template_count();
        let n = self.entry_count;
        let base = key.theta.ordinal() * self.block;

        let template = match key.template {
            Some(t) if t >= t_count => {
                return Err(ModelError::UnknownTemplate {
                    template: t,
                    template_count: t_count,
                })
            }
            other => other.unwrap_or(0),
        };
        match key.kind {
            VariableKind::PlanSelect => Ok(base + template),
            VariableKind::SlotIndexUse => Ok(base + t_count + template * n + self.entry(key)?),
            VariableKind::IndexPresent => Ok(base + t_count + t_count * n + self.entry(key)?),
            VariableKind::OptimalCertificate => {
                Ok(base + t_count + t_count * n + n + template * n + self.entry(key)?)
            }
        }
    }

    // Flattened entry position of the key's (slot, index).
    fn entry(&self, key: &VariableKey) -> Result<usize, ModelError> {
        let slot = key.slot.unwrap_or(0);
        if slot >= self.plan.slot_count() {
            return Err(ModelError::UnknownSlot {
                slot,
                slot_count: self.plan.slot_count(),
            });
        }
        let index = key.index.unwrap_or(IndexRef::FullScan { slot });
        let unknown = ModelError::UnknownIndex {
            index,
            statement: self.plan.statement_id(),
        };
        if key.kind == VariableKind::IndexPresent && index.is_full_scan() {
            // Full scans are always present and have no variable.
            return Err(unknown);
        }
        let (at, pos) = self.plan.locate(index)?;
        if at != slot {
            return Err(unknown);
        }
        Ok(self.slot_offsets[slot] + pos)
    }
}
