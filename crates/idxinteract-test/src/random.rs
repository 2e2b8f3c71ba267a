//! Seeded random statements and workloads.
//!
//! Costs are small integers so that interaction inequalities rarely sit
//! exactly on their bound.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use idxinteract_core::{IndexId, PlanCostModel, SlotBuilder, StatementId, Workload};

/// Builds a statement that exposes every index in `indexes`, each at a
/// random slot.
///
/// About one access cost in eight is infinite (index unusable by that
/// template). Internal and full-scan costs are zero about one time in
/// five, so some base configurations cost nothing under every variant.
pub fn random_plan<R: Rng>(rng: &mut R, statement: StatementId, indexes: &[IndexId]) -> PlanCostModel {
    let templates = rng.random_range(1..=3usize);
    let slot_count = rng.random_range(1..=3usize).min(indexes.len().max(1));

    let mut slots: Vec<Vec<IndexId>> = vec![Vec::new(); slot_count];
    for &id in indexes {
        slots[rng.random_range(0..slot_count)].push(id);
    }

    let internal: Vec<f64> = (0..templates)
        .map(|_| zero_or(rng, 1..=40))
        .collect();
    let mut builder = PlanCostModel::builder(statement, templates).internal_costs(internal);
    for ids in slots {
        let mut slot = SlotBuilder::new();
        for id in ids {
            let costs: Vec<f64> = (0..templates)
                .map(|_| {
                    if rng.random_bool(0.125) {
                        f64::INFINITY
                    } else {
                        rng.random_range(0..=60u32) as f64
                    }
                })
                .collect();
            slot = slot.index(id, costs);
        }
        let full_scan: Vec<f64> = (0..templates)
            .map(|_| zero_or(rng, 20..=120))
            .collect();
        builder = builder.slot(slot.full_scan(full_scan));
    }

    match builder.build() {
        Ok(model) => model,
        Err(err) => panic!("random plan is invalid: {err}"),
    }
}

fn zero_or<R: Rng>(rng: &mut R, range: std::ops::RangeInclusive<u32>) -> f64 {
    if rng.random_bool(0.2) {
        0.0
    } else {
        rng.random_range(range) as f64
    }
}

/// A workload of `statements` statements over indexes `i1..=i{index_count}`.
///
/// Each statement exposes a random subset of two to four indexes.
pub fn random_workload(seed: u64, statements: usize, index_count: u32) -> Workload {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let models = (0..statements)
        .map(|q| {
            let mut chosen: Vec<IndexId> = Vec::new();
            let want = rng.random_range(2..=4usize).min(index_count as usize);
            while chosen.len() < want {
                let id = IndexId(rng.random_range(1..=index_count));
                if !chosen.contains(&id) {
                    chosen.push(id);
                }
            }
            random_plan(&mut rng, StatementId(q as u32 + 1), &chosen)
        })
        .collect();

    match Workload::new(models) {
        Ok(workload) => workload,
        Err(err) => panic!("random workload is invalid: {err}"),
    }
}
