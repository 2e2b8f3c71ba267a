//! Tests for the constraint builder.
//!
//! Most tests pin the base configuration with extra constraints and check
//! that every feasible point models the true optimal cost of each variant.

use std::collections::{BTreeSet, HashSet};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use idxinteract_core::SlotBuilder;
use idxinteract_ilp::{
    render_lp, Assignment, BranchAndBoundModel, BranchAndBoundSolver, SolveOutcome, SolverService,
};
use idxinteract_test::brute;
use idxinteract_test::random::random_plan;
use idxinteract_test::scenario::{self as fx, complementary, same_slot, scenario_a, scenario_b};

use super::*;

fn model() -> BranchAndBoundModel {
    BranchAndBoundSolver::default().create_model()
}

fn builder_for<'p>(plan: &'p PlanCostModel, model: &mut BranchAndBoundModel) -> ConstraintBuilder<'p> {
    let request = PairRequest::resolve(plan, fx::C, fx::D, 0.1).unwrap();
    let mut builder = ConstraintBuilder::new(plan, request).unwrap();
    builder.build(model).unwrap();
    builder
}

fn value(builder: &ConstraintBuilder<'_>, values: &Assignment, key: VariableKey) -> bool {
    values.value(builder.pool().get(key).unwrap())
}

fn assert_structure(builder: &ConstraintBuilder<'_>, values: &Assignment) {
    let plan = builder.plan();
    let (ic, id) = (builder.request().slot_of_c, builder.request().slot_of_d);

    // Preconditions and pins.
    assert!(!value(builder, values, VariableKey::index_present(Empty, ic, fx::C)));
    assert!(!value(builder, values, VariableKey::index_present(D, ic, fx::C)));
    assert!(!value(builder, values, VariableKey::index_present(Empty, id, fx::D)));
    assert!(!value(builder, values, VariableKey::index_present(C, id, fx::D)));
    assert!(value(builder, values, VariableKey::index_present(CD, ic, fx::C)));
    assert!(value(builder, values, VariableKey::index_present(CD, id, fx::D)));

    // Atomicity.
    for theta in ConfigurationVariant::ALL {
        let chosen: Vec<bool> = (0..plan.template_count())
            .map(|t| value(builder, values, VariableKey::plan_select(theta, t)))
            .collect();
        assert_eq!(chosen.iter().filter(|&&x| x).count(), 1, "{theta}");
        for (t, &x) in chosen.iter().enumerate() {
            for (i, slot) in plan.slots().iter().enumerate() {
                let used = slot
                    .entries()
                    .iter()
                    .filter(|e| value(builder, values, VariableKey::slot_index_use(theta, t, i, e.index())))
                    .count();
                assert_eq!(used, x as usize, "{theta} t{t} slot {i}");
            }
        }
    }
}

/// Pins `y(EMPTY, a)` for every non-pair index to membership in `base`.
fn pin_base(
    builder: &ConstraintBuilder<'_>,
    model: &mut BranchAndBoundModel,
    base: &BTreeSet<IndexId>,
) -> Vec<ConstraintHandle> {
    let mut handles = Vec::new();
    for (i, slot) in builder.plan().slots().iter().enumerate() {
        for id in candidate_ids(slot.candidates()) {
            if id == fx::C || id == fx::D {
                continue;
            }
            let y = builder
                .pool()
                .get(VariableKey::index_present(Empty, i, id))
                .unwrap();
            let v = if base.contains(&id) { 1.0 } else { 0.0 };
            handles.push(
                model
                    .add_linear_constraint(LinearConstraint::eq("base", vec![Term::new(y, 1.0)], v))
                    .unwrap(),
            );
        }
    }
    handles
}

fn assert_certified(plan: &PlanCostModel) {
    let mut m = model();
    let builder = builder_for(plan, &mut m);
    for base in brute::base_configurations(plan, fx::C, fx::D) {
        let pins = pin_base(&builder, &mut m, &base);
        let values = match m.solve() {
            SolveOutcome::Feasible(values) => values,
            other => panic!("{} base {:?}: {:?}", plan.statement_id(), base, other),
        };
        assert_structure(&builder, &values);

        let modeled = builder.cost_expressions().evaluate(&values);
        let expected = brute::variant_costs(plan, &base, fx::C, fx::D);
        for (got, want) in [
            (modeled.empty, expected.empty),
            (modeled.c, expected.c),
            (modeled.d, expected.d),
            (modeled.cd, expected.cd),
        ] {
            assert!((got - want).abs() < 1e-6, "base {:?}: {got} != {want}", base);
        }
        for h in pins {
            m.remove_constraint(h).unwrap();
        }
    }
}

#[test]
fn test_modeled_costs_are_optimal_costs() {
    for plan in [scenario_a(), scenario_b(), complementary(), same_slot()] {
        assert_certified(&plan);
    }
}

#[test]
fn test_modeled_costs_on_random_plans() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let ids = [fx::C, fx::D, IndexId(3), IndexId(4), IndexId(5)];
    for q in 0..40 {
        let plan = random_plan(&mut rng, StatementId(q), &ids);
        assert_certified(&plan);
    }
}

#[test]
fn test_scenario_witness_costs() {
    let plan = scenario_a();
    let mut m = model();
    let builder = builder_for(&plan, &mut m);
    let SolveOutcome::Feasible(values) = m.solve() else {
        panic!("base program must be feasible");
    };
    let k = builder.cost_expressions().evaluate(&values);
    assert_eq!((k.empty, k.c, k.d, k.cd), (150.0, 60.0, 105.0, 15.0));
    assert_eq!(k.net(), 0.0);
}

#[test]
fn test_primary_and_alternative_on_scenarios() {
    // (plan, primary feasible, alternative feasible) at delta = 0.1
    let cases = [
        (scenario_a(), false, false),
        (scenario_b(), false, true),
        (complementary(), true, false),
    ];
    for (plan, primary, alternative) in cases {
        let mut m = model();
        let mut builder = builder_for(&plan, &mut m);

        let p = m
            .add_linear_constraint(builder.primary_inequality(0.1).unwrap())
            .unwrap();
        assert_eq!(m.solve().is_feasible(), primary, "{} primary", plan.statement_id());
        m.remove_constraint(p).unwrap();

        m.add_linear_constraint(builder.alternative_inequality(0.1))
            .unwrap();
        assert_eq!(
            m.solve().is_feasible(),
            alternative,
            "{} alternative",
            plan.statement_id()
        );
    }
}

#[test]
fn test_same_slot_skips_primary() {
    let plan = same_slot();
    let mut m = model();
    let mut builder = builder_for(&plan, &mut m);
    assert!(builder.request().same_slot());
    assert!(builder.primary_inequality(0.1).is_none());

    m.add_linear_constraint(builder.alternative_inequality(0.1))
        .unwrap();
    assert!(m.solve().is_feasible());
}

#[test]
fn test_same_slot_left_side_is_never_negative() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let ids = [fx::C, fx::D, IndexId(3), IndexId(4)];
    let mut checked = 0;
    for q in 0..200 {
        let plan = random_plan(&mut rng, StatementId(q), &ids);
        if plan.slot_of(fx::C).unwrap() != plan.slot_of(fx::D).unwrap() {
            continue;
        }
        let mut m = model();
        let builder = builder_for(&plan, &mut m);
        // E + CD - C - D <= -0.001
        m.add_linear_constraint(LinearConstraint::le("negative", builder.primary_terms(0.0), -1e-3))
            .unwrap();
        assert_eq!(m.solve(), SolveOutcome::Infeasible, "{}", plan.statement_id());
        checked += 1;
    }
    assert!(checked > 10);
}

#[test]
fn test_group_sizes() {
    let plan = scenario_a();
    let mut m = model();
    let builder = builder_for(&plan, &mut m);

    assert_eq!(builder.group_size("plan_select"), 4);
    // 4 variants x 1 template x 2 slots
    assert_eq!(builder.group_size("slot_fill"), 8);
    assert_eq!(builder.group_size("precondition"), 4);
    assert_eq!(builder.group_size("pin"), 4);
    assert_eq!(builder.group_size("base_link"), 0);
    assert_eq!(builder.group_size("atomic_slot"), 0);
    assert_eq!(builder.group_size("optimal"), 4);
    assert_eq!(builder.group_size("certificate_one"), 8);
    assert_eq!(builder.constraint_count(), m.constraint_count());
    // x, s, y, u per variant: 1 + 4 + 2 + 4
    assert_eq!(builder.pool().len(), 4 * 11);
}

#[test]
fn test_constraint_names_are_unique_and_builder_scoped() {
    let plan = scenario_b();
    let mut first = model();
    builder_for(&plan, &mut first);
    let mut second = model();
    builder_for(&plan, &mut second);

    // Same input, same program text: no naming state survives a builder.
    assert_eq!(render_lp(&first), render_lp(&second));

    let names: HashSet<&str> = first.constraints().map(|(_, c)| c.name.as_str()).collect();
    assert_eq!(names.len(), first.constraint_count());
}

#[test]
fn test_excluded_candidates_stay_absent() {
    let plan = PlanCostModel::builder(StatementId(8), 1)
        .slot(SlotBuilder::new().index(fx::C, [10.0]).full_scan([100.0]))
        .slot(
            SlotBuilder::new()
                .index(fx::D, [5.0])
                .index(IndexId(7), [1.0])
                .full_scan([50.0]),
        )
        .build()
        .unwrap();
    let request = PairRequest::resolve(&plan, fx::C, fx::D, 0.1)
        .unwrap()
        .with_candidates(BTreeSet::new());
    let mut m = model();
    let mut builder = ConstraintBuilder::new(&plan, request).unwrap();
    builder.build(&mut m).unwrap();
    assert_eq!(builder.group_size("excluded"), 1);

    // Forcing i7 into the base configuration contradicts the exclusion.
    let y = builder
        .pool()
        .get(VariableKey::index_present(Empty, 1, IndexId(7)))
        .unwrap();
    m.add_linear_constraint(LinearConstraint::eq("force", vec![Term::new(y, 1.0)], 1.0))
        .unwrap();
    assert_eq!(m.solve(), SolveOutcome::Infeasible);
}

#[test]
fn test_unusable_access_is_never_selected() {
    // Template 0 cannot use c; template 1 can, at a high internal cost.
    let plan = PlanCostModel::builder(StatementId(9), 2)
        .internal_costs([0.0, 30.0])
        .slot(
            SlotBuilder::new()
                .index(fx::C, [f64::INFINITY, 1.0])
                .full_scan([40.0, 40.0]),
        )
        .slot(SlotBuilder::new().index(fx::D, [2.0, 2.0]).full_scan([20.0, 20.0]))
        .build()
        .unwrap();
    assert_certified(&plan);

    let mut m = model();
    let builder = builder_for(&plan, &mut m);
    assert_eq!(builder.group_size("unusable"), 4);
    let SolveOutcome::Feasible(values) = m.solve() else {
        panic!("base program must be feasible");
    };
    for theta in ConfigurationVariant::ALL {
        assert!(!value(
            &builder,
            &values,
            VariableKey::slot_index_use(theta, 0, 0, IndexRef::Index(fx::C))
        ));
    }
}

#[test]
fn test_rejects_inconsistent_requests() {
    let plan = scenario_a();
    let mut request = PairRequest::resolve(&plan, fx::C, fx::D, 0.1).unwrap();
    request.slot_of_d = 0;
    assert!(matches!(
        ConstraintBuilder::new(&plan, request),
        Err(InteractionError::InvalidInput(_))
    ));

    let err = PairRequest::resolve(&plan, fx::C, IndexId(99), 0.1).unwrap_err();
    assert!(matches!(
        err,
        InteractionError::Model(ModelError::UnknownIndex { .. })
    ));

    assert!(PairRequest::resolve(&plan, fx::C, fx::C, 0.1).is_err());
}

#[test]
fn test_build_twice_is_an_error() {
    let plan = scenario_a();
    let mut m = model();
    let mut builder = builder_for(&plan, &mut m);
    assert!(matches!(
        builder.build(&mut m),
        Err(InteractionError::Internal(_))
    ));

    builder.clear();
    let mut fresh = model();
    builder.build(&mut fresh).unwrap();
    assert_eq!(builder.constraint_count(), fresh.constraint_count());
}
