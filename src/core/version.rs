//! Loose version strings from external tools.
//!
//! Tools report versions in every shape imaginable (`2.8svn`,
//! `bison (GNU Bison) 2.4.1`, `4.2.1`). We only care about the digit
//! groups, in order.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Serializer};

static DIGIT_GROUPS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// An ordered tuple of numeric version components.
///
/// Ordering is lexicographic by component, and a version that is a strict
/// prefix of another sorts *before* it: `4 < 4.0 < 4.1`. A missing trailing
/// component is absent, never an implicit zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ToolVersion(Vec<u64>);

impl ToolVersion {
    /// Extract every digit group from `s`.
    pub fn parse(s: &str) -> Self {
        ToolVersion(
            DIGIT_GROUPS
                .find_iter(s)
                .map(|m| m.as_str().parse().unwrap_or(u64::MAX))
                .collect(),
        )
    }

    pub fn components(&self) -> &[u64] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this version satisfies `minimum`.
    ///
    /// `4` does not satisfy `4.1`; `4.2` satisfies `4.1.0`.
    pub fn meets_minimum(&self, minimum: &ToolVersion) -> bool {
        !self.is_empty() && self >= minimum
    }

    /// Integer API identifier, `major * 100 + minor`.
    ///
    /// `2.8` is `208`, `2.10` is `210`. A bare major uses a zero minor.
    pub fn api_version(&self) -> Option<u32> {
        let major = u32::try_from(*self.0.first()?).ok()?;
        let minor = u32::try_from(self.0.get(1).copied().unwrap_or(0)).ok()?;
        major.checked_mul(100)?.checked_add(minor)
    }
}

impl From<&str> for ToolVersion {
    fn from(s: &str) -> Self {
        ToolVersion::parse(s)
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl Serialize for ToolVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
