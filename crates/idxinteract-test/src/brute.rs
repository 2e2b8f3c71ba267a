//! Exhaustive reference evaluation of a pair over every base configuration.
//!
//! A base configuration holds at most one index per slot and never holds
//! `c` or `d`. These functions enumerate all of them and evaluate the
//! interaction inequalities directly on `PlanCostModel::cost`.

use std::collections::BTreeSet;

use idxinteract_core::{IndexId, PlanCostModel};

const TOLERANCE: f64 = 1e-7;

/// Optimal statement cost under the four variants of one base configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Costs {
    pub empty: f64,
    pub c: f64,
    pub d: f64,
    pub cd: f64,
}

impl Costs {
    pub fn net(&self) -> f64 {
        self.empty - self.c - self.d + self.cd
    }

    pub fn degree(&self) -> f64 {
        let net = self.net().abs();
        if self.cd > 0.0 {
            net / self.cd
        } else if net <= 1e-9 {
            0.0
        } else {
            f64::INFINITY
        }
    }
}

/// Every atomic base configuration of `plan` that excludes `c` and `d`.
pub fn base_configurations(plan: &PlanCostModel, c: IndexId, d: IndexId) -> Vec<BTreeSet<IndexId>> {
    let mut configs = vec![BTreeSet::new()];
    for slot in plan.slots() {
        let choices: Vec<IndexId> = slot
            .candidates()
            .iter()
            .filter_map(|e| e.index().index_id())
            .filter(|&id| id != c && id != d)
            .collect();
        let mut next = Vec::with_capacity(configs.len() * (choices.len() + 1));
        for config in &configs {
            next.push(config.clone());
            for &id in &choices {
                let mut extended = config.clone();
                extended.insert(id);
                next.push(extended);
            }
        }
        configs = next;
    }
    configs
}

pub fn variant_costs(plan: &PlanCostModel, base: &BTreeSet<IndexId>, c: IndexId, d: IndexId) -> Costs {
    let with = |ids: &[IndexId]| {
        let mut config = base.clone();
        config.extend(ids.iter().copied());
        plan.cost(&config)
    };
    Costs {
        empty: with(&[]),
        c: with(&[c]),
        d: with(&[d]),
        cd: with(&[c, d]),
    }
}

/// Returns true if some base configuration satisfies the primary
/// inequality (only when `c` and `d` sit at different slots) or the
/// alternative inequality at threshold `delta`.
pub fn interacts(plan: &PlanCostModel, c: IndexId, d: IndexId, delta: f64) -> bool {
    let same_slot = match (plan.slot_of(c), plan.slot_of(d)) {
        (Ok(a), Ok(b)) => a == b,
        _ => return false,
    };
    base_configurations(plan, c, d).iter().any(|base| {
        let k = variant_costs(plan, base, c, d);
        let primary = k.empty + (1.0 + delta) * k.cd - k.c - k.d;
        let alternative = k.c + k.d - k.empty + (delta - 1.0) * k.cd;
        (!same_slot && primary <= TOLERANCE) || alternative <= TOLERANCE
    })
}

/// Largest degree of interaction over all base configurations.
pub fn max_degree(plan: &PlanCostModel, c: IndexId, d: IndexId) -> f64 {
    base_configurations(plan, c, d)
        .iter()
        .map(|base| variant_costs(plan, base, c, d).degree())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{complementary, same_slot, scenario_a, scenario_b, C, D};

    #[test]
    fn test_scenario_costs() {
        let empty = BTreeSet::new();
        let a = variant_costs(&scenario_a(), &empty, C, D);
        assert_eq!(
            a,
            Costs {
                empty: 150.0,
                c: 60.0,
                d: 105.0,
                cd: 15.0
            }
        );
        assert_eq!(a.net(), 0.0);

        let b = variant_costs(&scenario_b(), &empty, C, D);
        assert_eq!(b.net(), 99.0);

        let k = variant_costs(&complementary(), &empty, C, D);
        assert_eq!(k.net(), -180.0);
        assert_eq!(k.degree(), 9.0);
    }

    #[test]
    fn test_reference_verdicts() {
        assert!(!interacts(&scenario_a(), C, D, 0.1));
        assert!(interacts(&scenario_b(), C, D, 0.1));
        assert!(interacts(&complementary(), C, D, 0.1));
        assert!(interacts(&same_slot(), C, D, 0.1));
    }

    #[test]
    fn test_base_configurations_are_atomic() {
        let plan = crate::scenario::without_d(idxinteract_core::StatementId(5));
        // Slot 1 offers i9 or nothing; slot 0 only offers c, which is excluded.
        assert_eq!(base_configurations(&plan, C, D).len(), 2);
    }
}
