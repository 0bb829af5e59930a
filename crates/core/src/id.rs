//! Identifiers for tracked items.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Error returned when a string is not a valid item identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid item id: {0:?}")]
pub struct InvalidItemId(pub String);

fn bvid_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(r"^BV[0-9A-Za-z]{10}$").expect("static pattern is valid")
    })
}

/// Identifier of a tracked video (a `BV...` id).
///
/// The id doubles as the storage key, so only the canonical 12 character
/// alphanumeric form is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId(String);

impl ItemId {
    /// Parse and validate an id.
    pub fn new(s: impl AsRef<str>) -> Result<Self, InvalidItemId> {
        let s = s.as_ref().trim();
        if bvid_pattern().is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidItemId(s.to_string()))
        }
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ItemId {
    type Err = InvalidItemId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ItemId {
    type Error = InvalidItemId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_canonical_bvid() {
        let id: ItemId = "BV1xx411c7mD".parse().unwrap();
        assert_eq!(id.as_str(), "BV1xx411c7mD");
    }

    #[test]
    fn test_trims_whitespace() {
        let id = ItemId::new("  BV1GJ411x7h7 ").unwrap();
        assert_eq!(id.to_string(), "BV1GJ411x7h7");
    }

    #[test]
    fn test_rejects_malformed_ids() {
        assert!(ItemId::new("").is_err());
        assert!(ItemId::new("av170001").is_err());
        assert!(ItemId::new("BV1xx411c7m").is_err());
        assert!(ItemId::new("BV1xx411c7mD/../x").is_err());
    }

    #[test]
    fn test_serde_validates() {
        let ok: ItemId = serde_json::from_str("\"BV1xx411c7mD\"").unwrap();
        assert_eq!(ok.as_str(), "BV1xx411c7mD");
        assert!(serde_json::from_str::<ItemId>("\"nope\"").is_err());
    }
}
