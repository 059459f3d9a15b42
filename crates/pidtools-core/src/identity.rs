//! # Identifier Newtypes
//!
//! `Doi` and `ContentItemId` keep the two identifier namespaces apart: a
//! content item id can never be passed where a DOI is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A Digital Object Identifier such as `10.1234/ab12`.
///
/// Assigned by the registration service on create and immutable afterwards.
/// The constructor only checks shape (`10.` directory indicator, a `/`
/// separating non-empty prefix and suffix); the service decides validity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Doi(String);

impl Doi {
    /// Validate and wrap a DOI string. Surrounding whitespace is trimmed.
    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        let trimmed = value.trim();
        let invalid = |reason| CoreError::InvalidDoi {
            value: value.clone(),
            reason,
        };
        if !trimmed.starts_with("10.") {
            return Err(invalid("must start with the 10. directory indicator"));
        }
        let (prefix, suffix) = trimmed
            .split_once('/')
            .ok_or_else(|| invalid("missing '/' between prefix and suffix"))?;
        if prefix.len() <= 3 {
            return Err(invalid("empty registrant code"));
        }
        if suffix.is_empty() {
            return Err(invalid("empty suffix"));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(invalid("contains whitespace"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The registrant prefix, e.g. `10.1234`.
    pub fn prefix(&self) -> &str {
        self.0.split_once('/').map(|(p, _)| p).unwrap_or(&self.0)
    }

    /// The item suffix, e.g. `ab12`.
    pub fn suffix(&self) -> &str {
        self.0.split_once('/').map(|(_, s)| s).unwrap_or("")
    }

    /// Borrow the DOI string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Doi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Doi {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Doi {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Doi> for String {
    fn from(doi: Doi) -> Self {
        doi.0
    }
}

impl AsRef<str> for Doi {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of a content item in the content repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentItemId(pub u64);

impl ContentItemId {
    /// Access the inner numeric id.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContentItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ContentItemId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doi_splits_prefix_and_suffix() {
        let doi = Doi::new("10.1234/ab12").unwrap();
        assert_eq!(doi.prefix(), "10.1234");
        assert_eq!(doi.suffix(), "ab12");
        assert_eq!(doi.to_string(), "10.1234/ab12");
    }

    #[test]
    fn doi_suffix_may_contain_slashes() {
        let doi = Doi::new("10.1234/ehri/blog-42").unwrap();
        assert_eq!(doi.prefix(), "10.1234");
        assert_eq!(doi.suffix(), "ehri/blog-42");
    }

    #[test]
    fn doi_trims_surrounding_whitespace() {
        let doi = Doi::new("  10.1234/ab12\n").unwrap();
        assert_eq!(doi.as_str(), "10.1234/ab12");
    }

    #[test]
    fn doi_rejects_malformed_input() {
        for bad in ["", "11.1234/x", "10.1234", "10./x", "10.1234/", "10.1234/a b"] {
            assert!(Doi::new(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn doi_serde_round_trips_as_plain_string() {
        let doi = Doi::new("10.1234/ab12").unwrap();
        let json = serde_json::to_string(&doi).unwrap();
        assert_eq!(json, "\"10.1234/ab12\"");
        let back: Doi = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doi);
        assert!(serde_json::from_str::<Doi>("\"nope\"").is_err());
    }

    #[test]
    fn content_item_id_is_transparent() {
        let id = ContentItemId(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        assert_eq!(id.to_string(), "42");
    }
}
