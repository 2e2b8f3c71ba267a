//! idxinteract Search - Pair search driver
//!
//! Enumerates unordered pairs of candidate indexes, prunes pairs that share
//! no statement, and certifies the rest:
//! - [`PairSearchDriver`]: parallel search over pairs, per-statement or batched
//! - [`BatchedProgram`]: one program per pair with big-M indicator activation
//! - [`SearchStats`]: counters for one search

pub mod batched;
pub mod driver;
pub mod outcome;
pub mod stats;

pub use batched::{big_m, BatchedEvaluation, BatchedProgram};
pub use driver::{candidate_pairs, PairSearchDriver};
pub use outcome::{InteractingPair, PairSearchOutcome, PairVerdict, UndeterminedPair};
pub use stats::{SearchStats, StatsCollector};
