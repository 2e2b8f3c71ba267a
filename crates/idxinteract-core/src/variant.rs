//! Configuration variants compared within one interaction program.

use std::fmt;

/// One of the four hypothetical configurations built on a shared base `X`:
/// `X`, `X + c`, `X + d` and `X + c + d`.
///
/// Each variant owns an independent copy of every decision-variable family.
///
/// # Example
///
/// ```
/// use idxinteract_core::ConfigurationVariant;
///
/// assert!(ConfigurationVariant::CD.contains_c());
/// assert!(!ConfigurationVariant::D.contains_c());
/// assert_eq!(ConfigurationVariant::ALL.len(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigurationVariant {
    Empty,
    C,
    D,
    CD,
}

impl ConfigurationVariant {
    /// All variants in their canonical order.
    pub const ALL: [ConfigurationVariant; 4] = [
        ConfigurationVariant::Empty,
        ConfigurationVariant::C,
        ConfigurationVariant::D,
        ConfigurationVariant::CD,
    ];

    /// Dense position in `ALL`.
    #[inline]
    pub fn ordinal(self) -> usize {
        match self {
            ConfigurationVariant::Empty => 0,
            ConfigurationVariant::C => 1,
            ConfigurationVariant::D => 2,
            ConfigurationVariant::CD => 3,
        }
    }

    /// Returns true if index `c` is pinned present in this variant.
    #[inline]
    pub fn contains_c(self) -> bool {
        matches!(self, ConfigurationVariant::C | ConfigurationVariant::CD)
    }

    /// Returns true if index `d` is pinned present in this variant.
    #[inline]
    pub fn contains_d(self) -> bool {
        matches!(self, ConfigurationVariant::D | ConfigurationVariant::CD)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigurationVariant::Empty => "EMPTY",
            ConfigurationVariant::C => "C",
            ConfigurationVariant::D => "D",
            ConfigurationVariant::CD => "CD",
        }
    }
}

impl fmt::Display for ConfigurationVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals_follow_all() {
        for (i, theta) in ConfigurationVariant::ALL.iter().enumerate() {
            assert_eq!(theta.ordinal(), i);
        }
    }

    #[test]
    fn test_membership() {
        use ConfigurationVariant::*;
        assert!(!Empty.contains_c() && !Empty.contains_d());
        assert!(C.contains_c() && !C.contains_d());
        assert!(!D.contains_c() && D.contains_d());
        assert!(CD.contains_c() && CD.contains_d());
    }
}
