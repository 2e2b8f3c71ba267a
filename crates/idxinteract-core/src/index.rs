//! Index and statement identifiers.

use std::fmt;

/// Identifier of a candidate index.
///
/// # Example
///
/// ```
/// use idxinteract_core::IndexId;
///
/// assert_eq!(IndexId(7).to_string(), "i7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexId(pub u32);

impl fmt::Display for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

/// Identifier of a workload statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatementId(pub u32);

impl fmt::Display for StatementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// Something that can fill a slot: a real index or the slot's full scan.
///
/// Every slot exposes exactly one full-scan sentinel, always listed last.
///
/// # Example
///
/// ```
/// use idxinteract_core::{IndexId, IndexRef};
///
/// let idx = IndexRef::Index(IndexId(3));
/// let fts = IndexRef::FullScan { slot: 1 };
///
/// assert_eq!(idx.index_id(), Some(IndexId(3)));
/// assert!(fts.is_full_scan());
/// assert_eq!(fts.to_string(), "fts@1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IndexRef {
    Index(IndexId),
    FullScan { slot: usize },
}

impl IndexRef {
    pub fn is_full_scan(&self) -> bool {
        matches!(self, IndexRef::FullScan { .. })
    }

    /// Returns the candidate index id, or `None` for a full scan.
    pub fn index_id(&self) -> Option<IndexId> {
        match self {
            IndexRef::Index(id) => Some(*id),
            IndexRef::FullScan { .. } => None,
        }
    }
}

impl From<IndexId> for IndexRef {
    fn from(id: IndexId) -> Self {
        IndexRef::Index(id)
    }
}

impl fmt::Display for IndexRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexRef::Index(id) => write!(f, "{}", id),
            IndexRef::FullScan { slot } => write!(f, "fts@{}", slot),
        }
    }
}
