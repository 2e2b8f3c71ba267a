//! Per-statement plan cost model.
//!
//! A statement's plan space is reduced to a finite set of templates. Every
//! template shares the same slots (table-access points); each slot lists the
//! indexes usable there, followed by the slot's full-scan sentinel. The model
//! knows each template's internal cost and the access cost of every slot
//! entry under every template.
//!
//! An access cost of `f64::INFINITY` marks an index that a template cannot
//! use. Full scans are always usable.

use std::collections::{BTreeSet, HashMap};

use crate::error::{InteractionError, ModelError, Result};
use crate::index::{IndexId, IndexRef, StatementId};

/// One fillable choice at a slot, with its access cost per template.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotEntry {
    index: IndexRef,
    costs: Vec<f64>,
}

impl SlotEntry {
    pub fn index(&self) -> IndexRef {
        self.index
    }

    /// Access cost under template `template`.
    ///
    /// Callers iterate templates of the owning model, so the index is
    /// always in range.
    #[inline]
    pub fn cost(&self, template: usize) -> f64 {
        self.costs[template]
    }

    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    /// Returns true if the template can use this entry at all.
    #[inline]
    pub fn is_usable(&self, template: usize) -> bool {
        self.costs[template].is_finite()
    }
}

/// A table-access point. The last entry is always the full scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    entries: Vec<SlotEntry>,
}

impl Slot {
    pub fn entries(&self) -> &[SlotEntry] {
        &self.entries
    }

    /// Entries other than the full scan.
    pub fn candidates(&self) -> &[SlotEntry] {
        &self.entries[..self.entries.len() - 1]
    }

    pub fn full_scan(&self) -> &SlotEntry {
        &self.entries[self.entries.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // Cheapest entry whose index is in `config` (or is the full scan).
    fn best_cost(&self, template: usize, config: &BTreeSet<IndexId>) -> f64 {
        self.entries
            .iter()
            .filter(|e| match e.index {
                IndexRef::Index(id) => config.contains(&id),
                IndexRef::FullScan { .. } => true,
            })
            .map(|e| e.cost(template))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Read-only view of one statement's templates, slots and costs.
///
/// # Example
///
/// ```
/// use idxinteract_core::{IndexId, IndexRef, PlanCostModel, SlotBuilder, StatementId};
///
/// let model = PlanCostModel::builder(StatementId(1), 1)
///     .slot(SlotBuilder::new().index(IndexId(1), [10.0]).full_scan([100.0]))
///     .slot(SlotBuilder::new().index(IndexId(2), [5.0]).full_scan([50.0]))
///     .build()
///     .unwrap();
///
/// assert_eq!(model.slot_count(), 2);
/// assert_eq!(model.slot_of(IndexId(2)).unwrap(), 1);
/// assert_eq!(model.access_cost(0, IndexRef::FullScan { slot: 0 }).unwrap(), 100.0);
/// ```
#[derive(Debug, Clone)]
pub struct PlanCostModel {
    statement_id: StatementId,
    internal_costs: Vec<f64>,
    slots: Vec<Slot>,
    locations: HashMap<IndexId, (usize, usize)>,
}

impl PlanCostModel {
    /// Starts building a model with `template_count` templates.
    pub fn builder(statement_id: StatementId, template_count: usize) -> PlanCostModelBuilder {
        PlanCostModelBuilder::new(statement_id, template_count)
    }

    pub fn statement_id(&self) -> StatementId {
        self.statement_id
    }

    pub fn template_count(&self) -> usize {
        self.internal_costs.len()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn internal_costs(&self) -> &[f64] {
        &self.internal_costs
    }

    /// Cost of template `template` excluding index access.
    pub fn internal_cost(&self, template: usize) -> std::result::Result<f64, ModelError> {
        self.internal_costs
            .get(template)
            .copied()
            .ok_or(ModelError::UnknownTemplate {
                template,
                template_count: self.template_count(),
            })
    }

    /// Ordered entries usable at `slot`; the full scan is last.
    pub fn indexes_at_slot(&self, slot: usize) -> std::result::Result<&[SlotEntry], ModelError> {
        self.slots
            .get(slot)
            .map(Slot::entries)
            .ok_or(ModelError::UnknownSlot {
                slot,
                slot_count: self.slot_count(),
            })
    }

    /// Returns `(slot, position)` of an entry.
    pub fn locate(&self, index: IndexRef) -> std::result::Result<(usize, usize), ModelError> {
        match index {
            IndexRef::Index(id) => self
                .locations
                .get(&id)
                .copied()
                .ok_or(ModelError::UnknownIndex {
                    index,
                    statement: self.statement_id,
                }),
            IndexRef::FullScan { slot } => {
                let entries = self.indexes_at_slot(slot)?;
                Ok((slot, entries.len() - 1))
            }
        }
    }

    /// Slot at which a candidate index can be used.
    pub fn slot_of(&self, index: IndexId) -> std::result::Result<usize, ModelError> {
        self.locate(IndexRef::Index(index)).map(|(slot, _)| slot)
    }

    /// Cost of using `index` at its slot under `template`.
    pub fn access_cost(
        &self,
        template: usize,
        index: IndexRef,
    ) -> std::result::Result<f64, ModelError> {
        if template >= self.template_count() {
            return Err(ModelError::UnknownTemplate {
                template,
                template_count: self.template_count(),
            });
        }
        let (slot, pos) = self.locate(index)?;
        Ok(self.slots[slot].entries[pos].cost(template))
    }

    /// Candidate indexes exposed by this statement, in slot order.
    pub fn candidate_indexes(&self) -> impl Iterator<Item = IndexId> + '_ {
        self.slots
            .iter()
            .flat_map(|s| s.candidates().iter())
            .filter_map(|e| e.index.index_id())
    }

    /// Returns true if some template can use `index`.
    pub fn is_compatible(&self, index: IndexId) -> bool {
        match self.locations.get(&index) {
            Some(&(slot, pos)) => self.slots[slot].entries[pos]
                .costs
                .iter()
                .any(|c| c.is_finite()),
            None => false,
        }
    }

    /// Best cost of one template under the configuration `config`.
    pub fn template_cost(&self, template: usize, config: &BTreeSet<IndexId>) -> f64 {
        self.internal_costs[template]
            + self
                .slots
                .iter()
                .map(|s| s.best_cost(template, config))
                .sum::<f64>()
    }

    /// Optimal statement cost under `config`: the minimum over templates.
    pub fn cost(&self, config: &BTreeSet<IndexId>) -> f64 {
        (0..self.template_count())
            .map(|t| self.template_cost(t, config))
            .fold(f64::INFINITY, f64::min)
    }

    /// Largest finite cost any single template can reach.
    ///
    /// Bounds every cost expression of this statement.
    pub fn max_template_cost(&self) -> f64 {
        (0..self.template_count())
            .map(|t| {
                self.internal_costs[t]
                    + self
                        .slots
                        .iter()
                        .map(|s| {
                            s.entries
                                .iter()
                                .map(|e| e.cost(t))
                                .filter(|c| c.is_finite())
                                .fold(0.0, f64::max)
                        })
                        .sum::<f64>()
            })
            .fold(0.0, f64::max)
    }
}

/// Builder for one slot's entries.
#[derive(Debug, Clone, Default)]
pub struct SlotBuilder {
    indexes: Vec<(IndexId, Vec<f64>)>,
    full_scan: Option<Vec<f64>>,
}

impl SlotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a candidate index with its access cost per template.
    pub fn index(mut self, id: IndexId, costs: impl Into<Vec<f64>>) -> Self {
        self.indexes.push((id, costs.into()));
        self
    }

    /// Sets the full-scan cost per template.
    pub fn full_scan(mut self, costs: impl Into<Vec<f64>>) -> Self {
        self.full_scan = Some(costs.into());
        self
    }
}

/// Builder for [`PlanCostModel`]; validates the input contract on `build`.
#[derive(Debug, Clone)]
pub struct PlanCostModelBuilder {
    statement_id: StatementId,
    template_count: usize,
    internal_costs: Option<Vec<f64>>,
    slots: Vec<SlotBuilder>,
}

impl PlanCostModelBuilder {
    pub fn new(statement_id: StatementId, template_count: usize) -> Self {
        Self {
            statement_id,
            template_count,
            internal_costs: None,
            slots: Vec::new(),
        }
    }

    /// Internal cost per template. Defaults to all zero.
    pub fn internal_costs(mut self, costs: impl Into<Vec<f64>>) -> Self {
        self.internal_costs = Some(costs.into());
        self
    }

    pub fn slot(mut self, slot: SlotBuilder) -> Self {
        self.slots.push(slot);
        self
    }

    /// Validates the input and produces the model.
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::InvalidInput`] for a zero template count,
    /// cost vectors of the wrong length, negative or NaN costs, infinite
    /// internal or full-scan costs, a slot without full scan, or an index
    /// listed twice.
    pub fn build(self) -> Result<PlanCostModel> {
        let t = self.template_count;
        let q = self.statement_id;
        if t == 0 {
            return Err(InteractionError::InvalidInput(format!(
                "statement {q} has no plan templates"
            )));
        }

        let internal_costs = self.internal_costs.unwrap_or_else(|| vec![0.0; t]);
        check_costs(&format!("{q} internal cost"), &internal_costs, t, false)?;

        let mut slots = Vec::with_capacity(self.slots.len());
        let mut locations = HashMap::new();
        for (slot_idx, slot) in self.slots.into_iter().enumerate() {
            let full_scan = slot.full_scan.ok_or_else(|| {
                InteractionError::InvalidInput(format!(
                    "{q} slot {slot_idx} has no full-scan entry"
                ))
            })?;

            let mut entries = Vec::with_capacity(slot.indexes.len() + 1);
            for (id, costs) in slot.indexes {
                check_costs(&format!("{q} access cost of {id}"), &costs, t, true)?;
                if locations.insert(id, (slot_idx, entries.len())).is_some() {
                    return Err(InteractionError::InvalidInput(format!(
                        "{q} lists index {id} more than once"
                    )));
                }
                entries.push(SlotEntry {
                    index: IndexRef::Index(id),
                    costs,
                });
            }

            check_costs(
                &format!("{q} full-scan cost of slot {slot_idx}"),
                &full_scan,
                t,
                false,
            )?;
            entries.push(SlotEntry {
                index: IndexRef::FullScan { slot: slot_idx },
                costs: full_scan,
            });
            slots.push(Slot { entries });
        }

        Ok(PlanCostModel {
            statement_id: q,
            internal_costs,
            slots,
            locations,
        })
    }
}

fn check_costs(what: &str, costs: &[f64], template_count: usize, allow_infinite: bool) -> Result<()> {
    if costs.len() != template_count {
        return Err(InteractionError::InvalidInput(format!(
            "{what}: expected {template_count} values, got {}",
            costs.len()
        )));
    }
    for &c in costs {
        if c.is_nan() || c < 0.0 {
            return Err(InteractionError::InvalidInput(format!(
                "{what}: cost {c} must be non-negative"
            )));
        }
        if c.is_infinite() && !allow_infinite {
            return Err(InteractionError::InvalidInput(format!(
                "{what}: cost must be finite"
            )));
        }
    }
    Ok(())
}
