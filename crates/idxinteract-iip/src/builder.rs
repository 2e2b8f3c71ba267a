//! Constraint builder for one statement's interaction program.
//!
//! For every configuration variant the builder emits:
//!
//! - **Atomic configuration**: one template per variant, one entry per
//!   slot of the chosen template, entries only if present, at most one
//!   index per slot in the base configuration.
//! - **Preconditions and base sharing**: `c` absent from `EMPTY` and `D`,
//!   `d` absent from `EMPTY` and `C`, pinned present elsewhere; every other
//!   index has the same presence in all four variants.
//! - **Optimality certification**: the modeled cost is no worse than any
//!   single template's cheapest present access, so it equals the minimum.
//! - **Tie-break**: certificates pick the cheapest present entry, with the
//!   full scan as guaranteed fallback.
//!
//! The interaction inequalities are produced on demand so that the solve
//! protocol can add and retract them on a live model.

use std::collections::BTreeMap;

use smallvec::SmallVec;
use tracing::trace;

use idxinteract_core::{
    ConfigurationVariant, IndexId, IndexRef, InteractionError, ModelError, PlanCostModel, Result, SlotEntry,
    StatementId,
};
use idxinteract_ilp::{ConstraintHandle, IlpModel, LinearConstraint, Relation, Term, VarHandle};

use crate::alternative::AlternativeConstraintBuilder;
use crate::cost::CostExpressions;
use crate::pool::{VariableKey, VariablePool};
use crate::protocol::Phase;
use crate::request::PairRequest;

use ConfigurationVariant::{Empty, C, CD, D};

/// Whether an entry is available under a variant.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Presence {
    /// Full scan, or a pinned index of the pair.
    Always,
    /// An index of the pair the variant must not contain.
    Never,
    Var(VarHandle),
}

/// Emits the constraint system of one (pair, statement) evaluation.
///
/// Constraint names carry a sequence number owned by the builder, so two
/// builders never share naming state.
///
/// # Example
///
/// ```
/// use idxinteract_core::{IndexId, PlanCostModel, SlotBuilder, StatementId};
/// use idxinteract_iip::{ConstraintBuilder, PairRequest};
/// use idxinteract_ilp::{BranchAndBoundSolver, IlpModel, SolverService};
///
/// let plan = PlanCostModel::builder(StatementId(1), 1)
///     .slot(SlotBuilder::new().index(IndexId(1), [10.0]).full_scan([100.0]))
///     .slot(SlotBuilder::new().index(IndexId(2), [5.0]).full_scan([50.0]))
///     .build()
///     .unwrap();
/// let request = PairRequest::resolve(&plan, IndexId(1), IndexId(2), 0.1).unwrap();
///
/// let mut model = BranchAndBoundSolver::default().create_model();
/// let mut builder = ConstraintBuilder::new(&plan, request).unwrap();
/// builder.build(&mut model).unwrap();
///
/// // Without an interaction inequality the program is always feasible.
/// assert!(model.solve().is_feasible());
///
/// let primary = builder.primary_inequality(0.1).unwrap();
/// model.add_linear_constraint(primary).unwrap();
/// assert!(!model.solve().is_feasible());
/// ```
#[derive(Debug)]
pub struct ConstraintBuilder<'m> {
    plan: &'m PlanCostModel,
    request: PairRequest,
    pool: VariablePool<'m>,
    costs: CostExpressions,
    sequence: u32,
    groups: BTreeMap<&'static str, usize>,
    built: bool,
}

impl<'m> ConstraintBuilder<'m> {
    /// Creates a builder after checking the request against `plan`.
    pub fn new(plan: &'m PlanCostModel, request: PairRequest) -> Result<Self> {
        if request.c == request.d {
            return Err(InteractionError::InvalidInput(format!(
                "pair ({}, {}) names the same index twice",
                request.c, request.d
            )));
        }
        for (index, slot) in [
            (request.c, request.slot_of_c),
            (request.d, request.slot_of_d),
        ] {
            let actual = plan.slot_of(index)?;
            if actual != slot {
                return Err(InteractionError::InvalidInput(format!(
                    "{index} sits at slot {actual} of {}, not slot {slot}",
                    plan.statement_id()
                )));
            }
        }

        Ok(Self {
            plan,
            request,
            pool: VariablePool::new(plan),
            costs: CostExpressions::new(),
            sequence: 0,
            groups: BTreeMap::new(),
            built: false,
        })
    }

    pub fn plan(&self) -> &'m PlanCostModel {
        self.plan
    }

    pub fn statement_id(&self) -> StatementId {
        self.plan.statement_id()
    }

    pub fn request(&self) -> &PairRequest {
        &self.request
    }

    pub fn pool(&self) -> &VariablePool<'m> {
        &self.pool
    }

    /// `Cost(theta)` term lists, available after [`build`](Self::build).
    pub fn cost_expressions(&self) -> &CostExpressions {
        &self.costs
    }

    /// Number of constraints emitted by `build`.
    pub fn constraint_count(&self) -> usize {
        self.groups.values().sum()
    }

    /// Number of constraints emitted for one group, e.g. `"tie_break"`.
    pub fn group_size(&self, group: &str) -> usize {
        self.groups.get(group).copied().unwrap_or(0)
    }

    /// Declares every variable and emits every constraint group except the
    /// interaction inequalities.
    ///
    /// # Errors
    ///
    /// Model-construction errors abort the build; they are never retried.
    /// Calling `build` twice is an internal error.
    pub fn build<M: IlpModel>(&mut self, model: &mut M) -> Result<()> {
        if self.built {
            return Err(InteractionError::Internal(format!(
                "program for {} already built",
                self.statement_id()
            )));
        }
        self.built = true;

        self.declare_variables(model)?;
        self.collect_cost_expressions()?;
        for theta in ConfigurationVariant::ALL {
            self.add_atomic_configuration(model, theta)?;
        }
        self.add_interaction_preconditions(model)?;
        self.add_shared_base(model)?;
        self.add_unusable_accesses(model)?;
        for theta in ConfigurationVariant::ALL {
            self.add_optimality_certification(model, theta)?;
            self.add_selection_tie_break(model, theta)?;
        }

        trace!(
            event = "program_built",
            statement = %self.statement_id(),
            c = %self.request.c,
            d = %self.request.d,
            variables = self.pool.len(),
            constraints = self.constraint_count(),
            groups = ?self.groups,
        );
        Ok(())
    }

    /// `Cost(EMPTY) + (1+δ)·Cost(CD) − Cost(C) − Cost(D)` as a term list.
    pub fn primary_terms(&self, delta: f64) -> Vec<Term> {
        self.costs.combine([1.0, -1.0, -1.0, 1.0 + delta])
    }

    /// The primary inequality `primary_terms(δ) ≤ 0`.
    ///
    /// Returns `None` when `c` and `d` share a slot: the left side is then
    /// never negative and the phase is skipped.
    pub fn primary_inequality(&mut self, delta: f64) -> Option<LinearConstraint> {
        if self.request.same_slot() {
            return None;
        }
        let name = self.next_name("primary", None);
        Some(LinearConstraint::le(name, self.primary_terms(delta), 0.0))
    }

    /// The complementary inequality over the same cost expressions.
    pub fn alternative_inequality(&mut self, delta: f64) -> LinearConstraint {
        let name = self.next_name("alternative", None);
        AlternativeConstraintBuilder::new(&self.costs).inequality(name, delta)
    }

    /// `net ≤ −ε` for [`Phase::Primary`], `net ≥ ε` for
    /// [`Phase::Alternative`], where `net = Cost(EMPTY) − Cost(C) − Cost(D) + Cost(CD)`.
    ///
    /// Paired with an interaction inequality, it rules out witnesses whose
    /// net effect is zero.
    pub fn nonzero_net_row(&mut self, phase: Phase, epsilon: f64) -> LinearConstraint {
        let net = self.costs.combine([1.0, -1.0, -1.0, 1.0]);
        match phase {
            Phase::Primary => {
                let name = self.next_name("net_negative", None);
                LinearConstraint::le(name, net, -epsilon)
            }
            Phase::Alternative => {
                let name = self.next_name("net_positive", None);
                LinearConstraint::ge(name, net, epsilon)
            }
        }
    }

    /// Forgets all variables, cost terms and naming state.
    pub fn clear(&mut self) {
        self.pool.clear();
        self.costs.clear();
        self.sequence = 0;
        self.groups.clear();
        self.built = false;
    }

    fn declare_variables<M: IlpModel>(&mut self, model: &mut M) -> Result<()> {
        let plan = self.plan;
        let templates = plan.template_count();
        for theta in ConfigurationVariant::ALL {
            for t in 0..templates {
                self.pool
                    .create_and_store(model, VariableKey::plan_select(theta, t))?;
            }
            for t in 0..templates {
                for (i, slot) in plan.slots().iter().enumerate() {
                    for entry in slot.entries() {
                        self.pool.create_and_store(
                            model,
                            VariableKey::slot_index_use(theta, t, i, entry.index()),
                        )?;
                    }
                }
            }
            for (i, slot) in plan.slots().iter().enumerate() {
                for id in candidate_ids(slot.candidates()) {
                    self.pool
                        .create_and_store(model, VariableKey::index_present(theta, i, id))?;
                }
            }
            for t in 0..templates {
                for (i, slot) in plan.slots().iter().enumerate() {
                    for entry in slot.entries() {
                        self.pool.create_and_store(
                            model,
                            VariableKey::certificate(theta, t, i, entry.index()),
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    fn collect_cost_expressions(&mut self) -> Result<()> {
        let plan = self.plan;
        for theta in ConfigurationVariant::ALL {
            for t in 0..plan.template_count() {
                let x = self.pool.get(VariableKey::plan_select(theta, t))?;
                self.costs.push(theta, Term::new(x, plan.internal_cost(t)?));
            }
            for t in 0..plan.template_count() {
                for (i, slot) in plan.slots().iter().enumerate() {
                    for entry in slot.entries().iter().filter(|e| e.is_usable(t)) {
                        let s = self
                            .pool
                            .get(VariableKey::slot_index_use(theta, t, i, entry.index()))?;
                        self.costs.push(theta, Term::new(s, entry.cost(t)));
                    }
                }
            }
        }
        Ok(())
    }

    fn add_atomic_configuration<M: IlpModel>(
        &mut self,
        model: &mut M,
        theta: ConfigurationVariant,
    ) -> Result<()> {
        let plan = self.plan;
        let x = (0..plan.template_count())
            .map(|t| self.pool.get(VariableKey::plan_select(theta, t)))
            .collect::<std::result::Result<Vec<_>, ModelError>>()?;

        let one_template = x.iter().map(|&v| Term::new(v, 1.0)).collect();
        self.emit(model, "plan_select", Some(theta), one_template, Relation::Eq, 1.0)?;

        for (t, &plan_var) in x.iter().enumerate() {
            for (i, slot) in plan.slots().iter().enumerate() {
                let mut fill = Vec::with_capacity(slot.len() + 1);
                for entry in slot.entries() {
                    let s = self
                        .pool
                        .get(VariableKey::slot_index_use(theta, t, i, entry.index()))?;
                    fill.push(Term::new(s, 1.0));
                }
                fill.push(Term::new(plan_var, -1.0));
                self.emit(model, "slot_fill", Some(theta), fill, Relation::Eq, 0.0)?;

                // Unusable entries are fixed to zero separately.
                for entry in slot.candidates().iter().filter(|e| e.is_usable(t)) {
                    let Some(id) = entry.index().index_id() else {
                        continue;
                    };
                    let s = self
                        .pool
                        .get(VariableKey::slot_index_use(theta, t, i, entry.index()))?;
                    let y = self.pool.get(VariableKey::index_present(theta, i, id))?;
                    self.emit(
                        model,
                        "use_present",
                        Some(theta),
                        vec![Term::new(s, 1.0), Term::new(y, -1.0)],
                        Relation::Le,
                        0.0,
                    )?;
                }
            }
        }

        // c and d are added on top of an atomic base configuration.
        for (i, slot) in plan.slots().iter().enumerate() {
            let mut present = Vec::new();
            for id in candidate_ids(slot.candidates()) {
                if (id == self.request.c && theta.contains_c())
                    || (id == self.request.d && theta.contains_d())
                {
                    continue;
                }
                let y = self.pool.get(VariableKey::index_present(theta, i, id))?;
                present.push(Term::new(y, 1.0));
            }
            if present.len() > 1 {
                self.emit(model, "atomic_slot", Some(theta), present, Relation::Le, 1.0)?;
            }
        }
        Ok(())
    }

    fn add_interaction_preconditions<M: IlpModel>(&mut self, model: &mut M) -> Result<()> {
        let PairRequest {
            c,
            slot_of_c,
            d,
            slot_of_d,
            ..
        } = self.request;
        for (theta, index, slot) in [
            (Empty, c, slot_of_c),
            (D, c, slot_of_c),
            (Empty, d, slot_of_d),
            (C, d, slot_of_d),
        ] {
            let y = self.pool.get(VariableKey::index_present(theta, slot, index))?;
            self.emit(
                model,
                "precondition",
                Some(theta),
                vec![Term::new(y, 1.0)],
                Relation::Eq,
                0.0,
            )?;
        }
        Ok(())
    }

    fn add_shared_base<M: IlpModel>(&mut self, model: &mut M) -> Result<()> {
        let PairRequest {
            c,
            slot_of_c,
            d,
            slot_of_d,
            ..
        } = self.request;
        for (theta, index, slot) in [
            (C, c, slot_of_c),
            (CD, c, slot_of_c),
            (D, d, slot_of_d),
            (CD, d, slot_of_d),
        ] {
            let y = self.pool.get(VariableKey::index_present(theta, slot, index))?;
            self.emit(
                model,
                "pin",
                Some(theta),
                vec![Term::new(y, 1.0)],
                Relation::Eq,
                1.0,
            )?;
        }

        let plan = self.plan;
        for (i, slot) in plan.slots().iter().enumerate() {
            for id in candidate_ids(slot.candidates()) {
                if id == c || id == d {
                    continue;
                }
                let base = self.pool.get(VariableKey::index_present(Empty, i, id))?;
                if !self.request.admits(id) {
                    self.emit(
                        model,
                        "excluded",
                        Some(Empty),
                        vec![Term::new(base, 1.0)],
                        Relation::Eq,
                        0.0,
                    )?;
                }
                for theta in [C, D, CD] {
                    let y = self.pool.get(VariableKey::index_present(theta, i, id))?;
                    self.emit(
                        model,
                        "base_link",
                        Some(theta),
                        vec![Term::new(y, 1.0), Term::new(base, -1.0)],
                        Relation::Eq,
                        0.0,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn add_unusable_accesses<M: IlpModel>(&mut self, model: &mut M) -> Result<()> {
        let plan = self.plan;
        for theta in ConfigurationVariant::ALL {
            for t in 0..plan.template_count() {
                for (i, slot) in plan.slots().iter().enumerate() {
                    for entry in slot.entries().iter().filter(|e| !e.is_usable(t)) {
                        let s = self
                            .pool
                            .get(VariableKey::slot_index_use(theta, t, i, entry.index()))?;
                        let u = self
                            .pool
                            .get(VariableKey::certificate(theta, t, i, entry.index()))?;
                        self.emit(
                            model,
                            "unusable",
                            Some(theta),
                            vec![Term::new(s, 1.0), Term::new(u, 1.0)],
                            Relation::Le,
                            0.0,
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    fn add_optimality_certification<M: IlpModel>(
        &mut self,
        model: &mut M,
        theta: ConfigurationVariant,
    ) -> Result<()> {
        let plan = self.plan;
        let cost = self.costs.get(theta).to_vec();

        for t in 0..plan.template_count() {
            let mut bound = cost.clone();
            for (i, slot) in plan.slots().iter().enumerate() {
                for entry in slot.entries().iter().filter(|e| e.is_usable(t)) {
                    let u = self
                        .pool
                        .get(VariableKey::certificate(theta, t, i, entry.index()))?;
                    bound.push(Term::new(u, -entry.cost(t)));
                }
            }
            self.emit(
                model,
                "optimal",
                Some(theta),
                bound,
                Relation::Le,
                plan.internal_cost(t)?,
            )?;

            for (i, slot) in plan.slots().iter().enumerate() {
                let mut one = Vec::with_capacity(slot.len());
                for entry in slot.entries() {
                    let u = self
                        .pool
                        .get(VariableKey::certificate(theta, t, i, entry.index()))?;
                    one.push(Term::new(u, 1.0));
                }
                self.emit(model, "certificate_one", Some(theta), one, Relation::Eq, 1.0)?;

                for entry in slot.candidates().iter().filter(|e| e.is_usable(t)) {
                    let u = self
                        .pool
                        .get(VariableKey::certificate(theta, t, i, entry.index()))?;
                    let terms = match self.presence(theta, i, entry.index())? {
                        Presence::Always => continue,
                        Presence::Never => vec![Term::new(u, 1.0)],
                        Presence::Var(y) => vec![Term::new(u, 1.0), Term::new(y, -1.0)],
                    };
                    self.emit(
                        model,
                        "certificate_present",
                        Some(theta),
                        terms,
                        Relation::Le,
                        0.0,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn add_selection_tie_break<M: IlpModel>(
        &mut self,
        model: &mut M,
        theta: ConfigurationVariant,
    ) -> Result<()> {
        let plan = self.plan;
        for t in 0..plan.template_count() {
            for (i, slot) in plan.slots().iter().enumerate() {
                // Cheapest first; a stable sort keeps slot order among ties.
                let mut order: SmallVec<[&SlotEntry; 8]> =
                    slot.entries().iter().filter(|e| e.is_usable(t)).collect();
                order.sort_by(|a, b| a.cost(t).total_cmp(&b.cost(t)));

                let mut prefix: Vec<Term> = Vec::with_capacity(order.len());
                for entry in order {
                    let u = self
                        .pool
                        .get(VariableKey::certificate(theta, t, i, entry.index()))?;
                    prefix.push(Term::new(u, 1.0));
                    match self.presence(theta, i, entry.index())? {
                        Presence::Always => {
                            self.emit(
                                model,
                                "tie_break",
                                Some(theta),
                                prefix.clone(),
                                Relation::Eq,
                                1.0,
                            )?;
                            break;
                        }
                        Presence::Never => {}
                        Presence::Var(y) => {
                            let mut terms = prefix.clone();
                            terms.push(Term::new(y, -1.0));
                            self.emit(model, "tie_break", Some(theta), terms, Relation::Ge, 0.0)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn presence(
        &self,
        theta: ConfigurationVariant,
        slot: usize,
        index: IndexRef,
    ) -> std::result::Result<Presence, ModelError> {
        let pinned = |present: bool| {
            if present {
                Presence::Always
            } else {
                Presence::Never
            }
        };
        match index {
            IndexRef::FullScan { .. } => Ok(Presence::Always),
            IndexRef::Index(id) if id == self.request.c => Ok(pinned(theta.contains_c())),
            IndexRef::Index(id) if id == self.request.d => Ok(pinned(theta.contains_d())),
            IndexRef::Index(id) => self
                .pool
                .get(VariableKey::index_present(theta, slot, id))
                .map(Presence::Var),
        }
    }

    fn emit<M: IlpModel>(
        &mut self,
        model: &mut M,
        group: &'static str,
        theta: Option<ConfigurationVariant>,
        terms: Vec<Term>,
        relation: Relation,
        rhs: f64,
    ) -> Result<ConstraintHandle> {
        let name = self.next_name(group, theta);
        let handle = model.add_linear_constraint(LinearConstraint::new(name, terms, relation, rhs))?;
        *self.groups.entry(group).or_insert(0) += 1;
        Ok(handle)
    }

    fn next_name(&mut self, group: &str, theta: Option<ConfigurationVariant>) -> String {
        self.sequence += 1;
        let q = self.plan.statement_id();
        match theta {
            Some(theta) => format!("{group}_{theta}_{q}_{}", self.sequence),
            None => format!("{group}_{q}_{}", self.sequence),
        }
    }
}

fn candidate_ids(entries: &[SlotEntry]) -> impl Iterator<Item = IndexId> + '_ {
    entries.iter().filter_map(|e| e.index().index_id())
}

#[cfg(test)]
mod tests;
