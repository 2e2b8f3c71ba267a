//! idxinteract Core - Core types for index-interaction certification
//!
//! This crate provides the fundamental abstractions shared by the
//! interaction IP builder and the pair search:
//! - Index references, including the per-slot full-scan sentinel
//! - The four configuration variants compared by one program
//! - The per-statement plan cost model (templates, slots, access costs)
//! - The workload of statements and its index-to-statement membership

pub mod error;
pub mod index;
pub mod plan;
pub mod variant;
pub mod workload;


pub use error::{InteractionError, ModelError, Result};
pub use index::{IndexId, IndexRef, StatementId};
pub use plan::{PlanCostModel, PlanCostModelBuilder, Slot, SlotBuilder, SlotEntry};
pub use variant::ConfigurationVariant;
pub use workload::Workload;
