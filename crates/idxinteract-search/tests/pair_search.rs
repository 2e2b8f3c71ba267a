//! Integration tests for the pair search.
//!
//! These tests run the driver on seeded random workloads and check its
//! results against exhaustive evaluation of every base configuration.

use std::collections::BTreeSet;

use idxinteract_config::{InteractionConfig, SolveMode, ThreadCount};
use idxinteract_core::{IndexId, Workload};
use idxinteract_search::{candidate_pairs, InteractingPair, PairSearchDriver, PairVerdict};
use idxinteract_test::brute;
use idxinteract_test::random::random_workload;

/// Pairs that interact in at least one shared statement.
fn reference_pairs(workload: &Workload, delta: f64) -> Vec<(IndexId, IndexId)> {
    let candidates: Vec<IndexId> = workload.candidate_indexes().collect();
    candidate_pairs(&candidates)
        .into_iter()
        .filter(|&(c, d)| {
            workload
                .shared_statements(c, d)
                .iter()
                .filter_map(|&q| workload.statement(q))
                .any(|plan| brute::interacts(plan, c, d, delta))
        })
        .collect()
}

fn config(delta: f64) -> InteractionConfig {
    InteractionConfig::default()
        .with_delta(delta)
        .with_thread_count(ThreadCount::Specific(3))
}

#[test]
fn test_matches_exhaustive_reference() {
    for seed in [1, 2, 3] {
        let workload = random_workload(seed, 6, 6);
        let outcome = PairSearchDriver::new(config(0.1)).search(&workload).unwrap();

        assert!(outcome.undetermined.is_empty(), "seed {seed}: {:?}", outcome.undetermined);
        assert_eq!(outcome.pairs(), reference_pairs(&workload, 0.1), "seed {seed}");
    }
}

#[test]
fn test_reported_statement_proves_interaction() {
    let workload = random_workload(8, 8, 5);
    let outcome = PairSearchDriver::new(config(0.2)).search(&workload).unwrap();

    for pair in &outcome.interacting {
        let plan = workload.statement(pair.statement_id).unwrap();
        assert!(brute::interacts(plan, pair.c, pair.d, 0.2), "{pair}");
    }
}

#[test]
fn test_search_is_idempotent() {
    let workload = random_workload(21, 6, 6);
    let driver = PairSearchDriver::new(config(0.1).with_measure_degree(true));

    let first = driver.search(&workload).unwrap();
    let second = driver.search(&workload).unwrap();

    assert_eq!(first.pairs(), second.pairs());
    for (a, b) in first.interacting.iter().zip(&second.interacting) {
        assert_eq!(a.statement_id, b.statement_id);
        assert_eq!(a.degree, b.degree);
    }
    assert_eq!(first.stats.pairs_pruned, second.stats.pairs_pruned);
}

#[test]
fn test_thread_count_does_not_change_result() {
    let workload = random_workload(4, 7, 6);
    let single = PairSearchDriver::new(config(0.1).with_thread_count(ThreadCount::Specific(1)))
        .search(&workload)
        .unwrap();
    let many = PairSearchDriver::new(config(0.1).with_thread_count(ThreadCount::Unlimited))
        .search(&workload)
        .unwrap();
    assert_eq!(single.interacting, many.interacting);
}

#[test]
fn test_pair_order_is_irrelevant() {
    let workload = random_workload(13, 5, 5);
    let driver = PairSearchDriver::new(config(0.1).with_measure_degree(true));
    let candidates: Vec<IndexId> = workload.candidate_indexes().collect();

    for (c, d) in candidate_pairs(&candidates) {
        let forward = driver.evaluate_pair(&workload, c, d);
        let backward = driver.evaluate_pair(&workload, d, c);
        assert_eq!(forward.label(), backward.label(), "({c}, {d})");
        if let (PairVerdict::Interacting(a), PairVerdict::Interacting(b)) = (&forward, &backward) {
            let (da, db) = (a.degree.unwrap(), b.degree.unwrap());
            if da.is_finite() {
                assert!((da - db).abs() <= 1e-4 * da.max(1.0), "({c}, {d}): {da} != {db}");
            } else {
                assert_eq!(da, db);
            }
        }
    }
}

#[test]
fn test_batched_agrees_with_per_statement() {
    // At delta = 1 the alternative inequality loses its CD terms.
    for delta in [1.0, 0.1, 0.5, 2.0] {
        for seed in [5, 6] {
            let workload = random_workload(seed, 6, 5);
            let per_statement = PairSearchDriver::new(config(delta)).search(&workload).unwrap();
            let batched = PairSearchDriver::new(config(delta).with_solve_mode(SolveMode::Batched))
                .search(&workload)
                .unwrap();

            assert_eq!(
                per_statement.pairs(),
                batched.pairs(),
                "seed {seed}, delta {delta}"
            );
            for pair in &batched.interacting {
                let plan = workload.statement(pair.statement_id).unwrap();
                assert!(brute::interacts(plan, pair.c, pair.d, delta), "{pair}");
            }
        }
    }
}

#[test]
fn test_channel_receives_every_confirmed_pair() {
    let workload = random_workload(9, 6, 6);
    let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();

    let outcome = PairSearchDriver::new(config(0.1))
        .search_with_channel(&workload, sender)
        .unwrap();

    let mut streamed: Vec<InteractingPair> = Vec::new();
    while let Ok(pair) = receiver.try_recv() {
        streamed.push(pair);
    }
    streamed.sort_by_key(|p| (p.c, p.d));
    assert_eq!(streamed, outcome.interacting);
}

#[tokio::test]
async fn test_channel_streams_to_async_consumer() {
    let workload = random_workload(10, 5, 5);
    let expected: BTreeSet<(IndexId, IndexId)> =
        reference_pairs(&workload, 0.1).into_iter().collect();
    let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();

    let search = tokio::task::spawn_blocking(move || {
        PairSearchDriver::new(config(0.1)).search_with_channel(&workload, sender)
    });

    let mut received = BTreeSet::new();
    while let Some(pair) = receiver.recv().await {
        received.insert((pair.c, pair.d));
    }
    let outcome = search.await.unwrap().unwrap();

    assert_eq!(received, expected);
    assert_eq!(outcome.interacting.len(), received.len());
}
