//! Integration tests for the public entry points.

use idxinteract::prelude::*;
use idxinteract::{find_interactions_with_channel, PairVerdict, PairSearchDriver};
use idxinteract_test::scenario::{
    complementary_with, same_slot_with, scenario_a_with, scenario_b_with, C, D,
};

fn workload() -> Workload {
    Workload::new(vec![
        scenario_a_with(StatementId(1)),
        scenario_b_with(StatementId(2)),
        complementary_with(StatementId(3)),
        same_slot_with(StatementId(4)),
    ])
    .unwrap()
}

#[test]
fn test_find_interactions() {
    let outcome = find_interactions(&workload(), &InteractionConfig::default()).unwrap();

    assert_eq!(outcome.pairs(), vec![(C, D)]);
    assert_eq!(outcome.interacting[0].statement_id, StatementId(2));
    assert_eq!(outcome.interacting[0].phase, Phase::Alternative);
    assert_eq!(outcome.stats.candidate_indexes, 2);
}

#[test]
fn test_threshold_above_every_degree() {
    // Degrees: q2 = 99/61, q3 = 9, q4 = 8.
    let config = InteractionConfig::default().with_delta(9.5);
    let outcome = find_interactions(&workload(), &config).unwrap();
    assert!(outcome.interacting.is_empty());

    let config = InteractionConfig::default().with_delta(8.5);
    let outcome = find_interactions(&workload(), &config).unwrap();
    assert_eq!(outcome.interacting[0].statement_id, StatementId(3));
}

#[test]
fn test_degree_measurement() {
    let config = InteractionConfig::default().with_measure_degree(true);
    let outcome = find_interactions(&workload(), &config).unwrap();
    assert_eq!(outcome.interacting[0].degree, Some(9.0));
}

#[test]
fn test_channel_entry_point() {
    let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
    let outcome = find_interactions_with_channel(&workload(), &InteractionConfig::default(), sender).unwrap();

    let streamed = receiver.try_recv().unwrap();
    assert_eq!(streamed, outcome.interacting[0]);
    assert!(receiver.try_recv().is_err());
}

#[test]
fn test_driver_is_reexported() {
    let driver = PairSearchDriver::new(InteractionConfig::default());
    let verdict = driver.evaluate_pair(&workload(), D, C);
    assert!(matches!(verdict, PairVerdict::Interacting(_)));
}

#[test]
fn test_config_from_toml() {
    let config = InteractionConfig::from_toml_str(
        r#"
        delta = 0.1
        solve_mode = "batched"
        thread_count = { specific = 2 }
        "#,
    )
    .unwrap();
    let outcome = find_interactions(&workload(), &config).unwrap();
    assert_eq!(outcome.pairs(), vec![(C, D)]);
    assert_eq!(outcome.stats.batched_programs, 1);
}
