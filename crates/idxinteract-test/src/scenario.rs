//! Hand-built statements with known interaction outcomes.
//!
//! Every fixture exposes the pair [`C`], [`D`]. The comment on each
//! function lists the optimal statement cost under the four variants
//! `E = cost(∅)`, `C = cost({c})`, `D = cost({d})`, `CD = cost({c, d})`.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeSet;
//! use idxinteract_test::scenario::{scenario_b, C, D};
//!
//! let q = scenario_b();
//! assert_eq!(q.cost(&BTreeSet::new()), 160.0);
//! assert_eq!(q.cost(&BTreeSet::from([C, D])), 61.0);
//! ```

use idxinteract_core::{IndexId, PlanCostModel, SlotBuilder, StatementId};

/// First index of the fixture pair.
pub const C: IndexId = IndexId(1);

/// Second index of the fixture pair.
pub const D: IndexId = IndexId(2);

fn build(builder: idxinteract_core::PlanCostModelBuilder) -> PlanCostModel {
    match builder.build() {
        Ok(model) => model,
        Err(err) => panic!("fixture is invalid: {err}"),
    }
}

/// One template, `c` alone at slot 0, `d` alone at slot 1.
///
/// E = 150, C = 60, D = 105, CD = 15. The benefits are additive.
pub fn scenario_a() -> PlanCostModel {
    scenario_a_with(StatementId(1))
}

pub fn scenario_a_with(statement: StatementId) -> PlanCostModel {
    build(
        PlanCostModel::builder(statement, 1)
            .slot(SlotBuilder::new().index(C, [10.0]).full_scan([100.0]))
            .slot(SlotBuilder::new().index(D, [5.0]).full_scan([50.0])),
    )
}

/// Two templates, each short-circuited by one of the indexes.
///
/// E = 160, C = D = CD = 61. Either index alone captures the whole
/// benefit, so the pair interacts through the alternative inequality.
pub fn scenario_b() -> PlanCostModel {
    scenario_b_with(StatementId(2))
}

pub fn scenario_b_with(statement: StatementId) -> PlanCostModel {
    build(
        PlanCostModel::builder(statement, 2)
            .internal_costs([10.0, 10.0])
            .slot(
                SlotBuilder::new()
                    .index(C, [1.0, 50.0])
                    .full_scan([100.0, 50.0]),
            )
            .slot(
                SlotBuilder::new()
                    .index(D, [50.0, 1.0])
                    .full_scan([50.0, 100.0]),
            ),
    )
}

/// Template 1 only pays off when both indexes exist.
///
/// E = C = D = 200, CD = 20. Interacts through the primary inequality.
pub fn complementary() -> PlanCostModel {
    complementary_with(StatementId(3))
}

pub fn complementary_with(statement: StatementId) -> PlanCostModel {
    build(
        PlanCostModel::builder(statement, 2)
            .internal_costs([100.0, 10.0])
            .slot(
                SlotBuilder::new()
                    .index(C, [50.0, 5.0])
                    .full_scan([50.0, 1000.0]),
            )
            .slot(
                SlotBuilder::new()
                    .index(D, [50.0, 5.0])
                    .full_scan([50.0, 1000.0]),
            ),
    )
}

/// `c` and `d` compete for the only slot.
///
/// E = 100, C = 10, D = 20, CD = 10.
pub fn same_slot() -> PlanCostModel {
    same_slot_with(StatementId(4))
}

pub fn same_slot_with(statement: StatementId) -> PlanCostModel {
    build(
        PlanCostModel::builder(statement, 1).slot(
            SlotBuilder::new()
                .index(C, [10.0])
                .index(D, [20.0])
                .full_scan([100.0]),
        ),
    )
}

/// Uses `c` at slot 0 and an unrelated index at slot 1; `d` is absent.
pub fn without_d(statement: StatementId) -> PlanCostModel {
    build(
        PlanCostModel::builder(statement, 1)
            .slot(SlotBuilder::new().index(C, [3.0]).full_scan([30.0]))
            .slot(
                SlotBuilder::new()
                    .index(IndexId(9), [4.0])
                    .full_scan([40.0]),
            ),
    )
}
