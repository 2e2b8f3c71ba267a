//! Tests for the branch-and-bound backend.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::*;
use crate::expr::Term;

fn model() -> BranchAndBoundModel {
    BranchAndBoundSolver::default().create_model()
}

fn vars(model: &mut BranchAndBoundModel, n: usize) -> Vec<VarHandle> {
    (0..n)
        .map(|i| model.add_binary_variable(&format!("x{i}")))
        .collect()
}

fn satisfies(values: &Assignment, constraint: &LinearConstraint) -> bool {
    let lhs = values.evaluate(&constraint.terms);
    match constraint.relation {
        Relation::Le => lhs <= constraint.rhs + 1e-9,
        Relation::Eq => (lhs - constraint.rhs).abs() <= 1e-9,
        Relation::Ge => lhs >= constraint.rhs - 1e-9,
    }
}

#[test]
fn test_empty_model_is_feasible() {
    let mut m = model();
    assert!(m.solve().is_feasible());
}

#[test]
fn test_forced_solution() {
    let mut m = model();
    let x = vars(&mut m, 3);
    // x0 + x1 + x2 = 2, x0 + x1 <= 1, 3 x0 + 2 x1 >= 3
    m.add_linear_constraint(LinearConstraint::eq(
        "two",
        x.iter().map(|&v| Term::new(v, 1.0)).collect(),
        2.0,
    ))
    .unwrap();
    m.add_linear_constraint(LinearConstraint::le(
        "pair",
        vec![Term::new(x[0], 1.0), Term::new(x[1], 1.0)],
        1.0,
    ))
    .unwrap();
    m.add_linear_constraint(LinearConstraint::ge(
        "weight",
        vec![Term::new(x[0], 3.0), Term::new(x[1], 2.0)],
        3.0,
    ))
    .unwrap();

    match m.solve() {
        SolveOutcome::Feasible(values) => {
            assert!(values.value(x[0]));
            assert!(!values.value(x[1]));
            assert!(values.value(x[2]));
        }
        other => panic!("expected feasible, got {:?}", other),
    }
}

#[test]
fn test_infeasible() {
    let mut m = model();
    let x = vars(&mut m, 2);
    m.add_linear_constraint(LinearConstraint::ge(
        "both",
        vec![Term::new(x[0], 1.0), Term::new(x[1], 1.0)],
        2.0,
    ))
    .unwrap();
    m.add_linear_constraint(LinearConstraint::le(
        "at_most_one",
        vec![Term::new(x[0], 1.0), Term::new(x[1], 1.0)],
        1.0,
    ))
    .unwrap();
    assert_eq!(m.solve(), SolveOutcome::Infeasible);
}

#[test]
fn test_constant_row_infeasible() {
    let mut m = model();
    m.add_linear_constraint(LinearConstraint::le("neg", Vec::new(), -1.0))
        .unwrap();
    assert_eq!(m.solve(), SolveOutcome::Infeasible);
}

#[test]
fn test_remove_constraint_restores_feasibility() {
    let mut m = model();
    let x = vars(&mut m, 1);
    let on = m
        .add_linear_constraint(LinearConstraint::ge("on", vec![Term::new(x[0], 1.0)], 1.0))
        .unwrap();
    m.add_linear_constraint(LinearConstraint::le("off", vec![Term::new(x[0], 1.0)], 0.0))
        .unwrap();
    assert_eq!(m.solve(), SolveOutcome::Infeasible);
    assert_eq!(m.constraint_count(), 2);

    m.remove_constraint(on).unwrap();
    assert_eq!(m.constraint_count(), 1);
    assert!(m.solve().is_feasible());

    assert_eq!(
        m.remove_constraint(on),
        Err(SolverError::UnknownConstraint(0))
    );
}

#[test]
fn test_rejects_unknown_variable() {
    let mut m = model();
    let mut other = model();
    vars(&mut other, 3);
    let foreign = other.add_binary_variable("foreign");

    let result = m.add_linear_constraint(LinearConstraint::le(
        "bad",
        vec![Term::new(foreign, 1.0)],
        1.0,
    ));
    assert_eq!(result, Err(SolverError::UnknownVariable(3)));
}

#[test]
fn test_rejects_non_finite_coefficient() {
    let mut m = model();
    let x = vars(&mut m, 1);
    let result = m.add_linear_constraint(LinearConstraint::le(
        "bad",
        vec![Term::new(x[0], f64::INFINITY)],
        1.0,
    ));
    assert!(matches!(result, Err(SolverError::Numerical(_))));
}

#[test]
fn test_node_limit() {
    // Pigeonhole: 4 pigeons, 3 holes. Needs real search to refute.
    let mut m = BranchAndBoundSolver::default()
        .with_node_limit(Some(2))
        .create_model();
    let mut p = Vec::new();
    for i in 0..4 {
        let row: Vec<VarHandle> = (0..3)
            .map(|h| m.add_binary_variable(&format!("p{i}h{h}")))
            .collect();
        m.add_linear_constraint(LinearConstraint::eq(
            format!("pigeon{i}"),
            row.iter().map(|&v| Term::new(v, 1.0)).collect(),
            1.0,
        ))
        .unwrap();
        p.push(row);
    }
    for h in 0..3 {
        m.add_linear_constraint(LinearConstraint::le(
            format!("hole{h}"),
            p.iter().map(|row| Term::new(row[h], 1.0)).collect(),
            1.0,
        ))
        .unwrap();
    }

    assert_eq!(
        m.solve(),
        SolveOutcome::Error(SolverError::NodeLimitExceeded { limit: 2 })
    );

    let mut unlimited = m.clone();
    unlimited.node_limit = None;
    assert_eq!(unlimited.solve(), SolveOutcome::Infeasible);
    assert!(unlimited.last_solve_nodes() > 2);
}

#[test]
fn test_clear() {
    let mut m = model();
    let x = vars(&mut m, 2);
    m.add_linear_constraint(LinearConstraint::le("c", vec![Term::new(x[0], 1.0)], 0.0))
        .unwrap();
    m.clear();
    assert_eq!(m.variable_count(), 0);
    assert_eq!(m.constraint_count(), 0);
    assert!(m.solve().is_feasible());
}

#[test]
fn test_agrees_with_brute_force() {
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    for round in 0..200 {
        let n = rng.random_range(1..=6usize);
        let mut m = model();
        let x = vars(&mut m, n);
        let mut constraints = Vec::new();
        for k in 0..rng.random_range(1..=5usize) {
            let mut terms = Vec::new();
            for &v in &x {
                if rng.random_bool(0.7) {
                    terms.push(Term::new(v, rng.random_range(-4i32..=4) as f64 * 0.5));
                }
            }
            let relation = match rng.random_range(0u8..3) {
                0 => Relation::Le,
                1 => Relation::Eq,
                _ => Relation::Ge,
            };
            let rhs = rng.random_range(-4i32..=4) as f64 * 0.5;
            let c = LinearConstraint::new(format!("r{round}c{k}"), terms, relation, rhs);
            m.add_linear_constraint(c.clone()).unwrap();
            constraints.push(c);
        }

        let brute = (0u32..(1 << n)).any(|mask| {
            let values = Assignment::new((0..n).map(|i| mask & (1 << i) != 0).collect());
            constraints.iter().all(|c| satisfies(&values, c))
        });

        match m.solve() {
            SolveOutcome::Feasible(values) => {
                assert!(brute, "round {round}: solver found a witness brute force did not");
                for c in &constraints {
                    assert!(satisfies(&values, c), "round {round}: witness violates {c}");
                }
            }
            SolveOutcome::Infeasible => assert!(!brute, "round {round}: missed a witness"),
            SolveOutcome::Error(err) => panic!("round {round}: {err}"),
        }
    }
}
