//! idxinteract - Certified detection of interacting index pairs
//!
//! Given the plan cost models of a workload, finds every pair of candidate
//! indexes whose benefits are not additive in some statement, and proves it
//! with a 0/1 feasibility witness.
//!
//! # Example
//!
//! ```rust
//! use idxinteract::prelude::*;
//!
//! // Either index alone captures the whole benefit of the statement.
//! let q = PlanCostModel::builder(StatementId(1), 2)
//!     .internal_costs([10.0, 10.0])
//!     .slot(SlotBuilder::new().index(IndexId(1), [1.0, 50.0]).full_scan([100.0, 50.0]))
//!     .slot(SlotBuilder::new().index(IndexId(2), [50.0, 1.0]).full_scan([50.0, 100.0]))
//!     .build()
//!     .unwrap();
//! let workload = Workload::new(vec![q]).unwrap();
//!
//! let outcome = find_interactions(&workload, &InteractionConfig::default()).unwrap();
//! assert_eq!(outcome.pairs(), vec![(IndexId(1), IndexId(2))]);
//! ```

pub use idxinteract_config::{
    ConfigError, InteractionConfig, SolveMode, SolverSettings, ThreadCount, DEFAULT_DELTA,
};
pub use idxinteract_core::{
    ConfigurationVariant, IndexId, IndexRef, InteractionError, ModelError, PlanCostModel,
    PlanCostModelBuilder, Result, SlotBuilder, StatementId, Workload,
};
pub use idxinteract_iip::{
    ConstraintBuilder, PairEvaluation, Phase, ProtocolSettings, SolveProtocol, VariantCosts,
    Verdict,
};
pub use idxinteract_ilp::{BranchAndBoundSolver, IlpModel, SolveOutcome, SolverError, SolverService};
pub use idxinteract_search::{
    InteractingPair, PairSearchDriver, PairSearchOutcome, PairVerdict, SearchStats,
    UndeterminedPair,
};

pub mod console;

mod search;
pub use search::{find_interactions, find_interactions_with_channel, run_search};

pub mod prelude {
    pub use super::{find_interactions, run_search};
    pub use super::{IndexId, PlanCostModel, SlotBuilder, StatementId, Workload};
    pub use super::{InteractionConfig, SolveMode, ThreadCount};
    pub use super::{InteractingPair, PairSearchOutcome, Phase};
}
