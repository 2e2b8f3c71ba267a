//! idxinteract IIP - Interaction-certification program
//!
//! Translates one statement's plan cost model and a candidate index pair
//! into a 0/1 feasibility program whose witnesses prove that the pair
//! interacts:
//! - [`VariablePool`]: dense, statement-scoped variable identities
//! - [`ConstraintBuilder`]: atomic-configuration, precondition, optimality
//!   and tie-break constraints, plus the primary inequality
//! - [`AlternativeConstraintBuilder`]: the complementary inequality
//! - [`SolveProtocol`]: primary, then alternative, with retraction, retry
//!   and optional degree measurement

pub mod alternative;
pub mod builder;
pub mod cost;
pub mod pool;
pub mod protocol;
pub mod request;

pub use alternative::AlternativeConstraintBuilder;
pub use builder::ConstraintBuilder;
pub use cost::{CostExpressions, VariantCosts};
pub use pool::{VariableKey, VariableKind, VariablePool};
pub use protocol::{PairEvaluation, Phase, ProtocolSettings, ProtocolState, SolveProtocol, Verdict};
pub use request::PairRequest;
