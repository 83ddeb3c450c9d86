//! Ontology term identifiers and lookup/annotation results.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Label returned by lookups that could not resolve a term.
pub const NOT_FOUND_LABEL: &str = "TERM NOT FOUND";

/// Prefix of Environment Ontology identifiers.
pub const ENVO_PREFIX: &str = "ENVO";

/// `PREFIX:` followed by exactly eight digits.
static TERM_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9]*):(\d{8})$").expect("Invalid term id regex")
});

/// A validated ontology term identifier in `PREFIX:########` form.
///
/// The prefix is upper-cased on parse, so `envo:00000097` and
/// `ENVO:00000097` produce the same id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TermId {
    prefix: String,
    code: String,
}

impl TermId {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let captures = TERM_ID_REGEX
            .captures(trimmed)
            .ok_or_else(|| ModelError::InvalidTermId(raw.to_string()))?;
        Ok(Self {
            prefix: captures[1].to_ascii_uppercase(),
            code: captures[2].to_string(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.prefix.eq_ignore_ascii_case(prefix)
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.code)
    }
}

impl FromStr for TermId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TermId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<TermId> for String {
    fn from(value: TermId) -> Self {
        value.to_string()
    }
}

/// Key used to compare a mapped id with an asserted id.
///
/// Only `:` is rewritten to `_`; case and synonym ids are not reconciled.
pub fn agreement_key(id: &str) -> String {
    id.replace(':', "_")
}

/// Canonical information about a single ontology term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvoLookupResult {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub is_obsolete: bool,
    #[serde(default)]
    pub definition: Option<String>,
}

impl EnvoLookupResult {
    /// Placeholder result for an id the ontology does not know.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: NOT_FOUND_LABEL.to_string(),
            is_obsolete: false,
            definition: None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.label == NOT_FOUND_LABEL
    }

    /// True when the term can back an emitted mapping.
    pub fn is_usable(&self) -> bool {
        !self.is_not_found() && !self.is_obsolete && !self.label.trim().is_empty()
    }
}

/// One recognised term span inside annotated text.
///
/// `start`/`end` are byte offsets into the annotated text, end exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationMatch {
    pub id: String,
    pub label: String,
    #[serde(rename = "match")]
    pub matched: String,
    pub start: usize,
    pub end: usize,
}

impl AnnotationMatch {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnnotationResult {
    pub text: String,
    pub matches: Vec<AnnotationMatch>,
    /// Fraction of characters covered by merged match spans, in `[0, 1]`.
    pub coverage: f64,
}

impl TextAnnotationResult {
    pub fn empty(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            matches: Vec::new(),
            coverage: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_prefix() {
        let id = TermId::parse("envo:00000097").unwrap();
        assert_eq!(id.to_string(), "ENVO:00000097");
        assert!(id.has_prefix(ENVO_PREFIX));
        assert_eq!(id.code(), "00000097");
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(TermId::parse("ENVO_00000097").is_err());
        assert!(TermId::parse("ENVO:123").is_err());
        assert!(TermId::parse("ENVO:000000971").is_err());
        assert!(TermId::parse("").is_err());
    }

    #[test]
    fn agreement_key_only_swaps_separator() {
        assert_eq!(agreement_key("ENVO:00002006"), "ENVO_00002006");
        assert_eq!(agreement_key("ENVO_00002006"), "ENVO_00002006");
        assert_ne!(agreement_key("envo:00002006"), agreement_key("ENVO:00002006"));
    }

    #[test]
    fn not_found_is_not_usable() {
        let missing = EnvoLookupResult::not_found("ENVO:99999999");
        assert!(missing.is_not_found());
        assert!(!missing.is_usable());

        let obsolete = EnvoLookupResult {
            id: "ENVO:00000001".to_string(),
            label: "old term".to_string(),
            is_obsolete: true,
            definition: None,
        };
        assert!(!obsolete.is_usable());
    }
}
