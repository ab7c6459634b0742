//! Preference record types
//!
//! Defines the persisted user profile and the case-insensitive keyword
//! set used for its language and tool fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Shown by the view when nothing has been learned about the user yet
pub const EMPTY_SUMMARY: &str =
    "No preferences saved yet. Ask me about technologies to get started!";

/// An insertion-ordered set of strings with case-insensitive membership
///
/// The first spelling inserted for a term is the one kept. Entries are
/// never removed, so a set only grows over the lifetime of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<Vec<String>>", into = "Vec<String>")]
pub struct KeywordSet {
    entries: Vec<String>,
}

impl KeywordSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a term unless an entry equal to it ignoring case exists
    ///
    /// Returns true if the term was added.
    pub fn insert(&mut self, term: impl Into<String>) -> bool {
        let term = term.into();
        if term.trim().is_empty() || self.contains(&term) {
            return false;
        }
        self.entries.push(term);
        true
    }

    /// Check membership ignoring case
    pub fn contains(&self, term: &str) -> bool {
        let lowered = term.to_lowercase();
        self.entries.iter().any(|e| e.to_lowercase() == lowered)
    }

    /// Check that every entry of `other` is also in this set
    pub fn is_superset_of(&self, other: &KeywordSet) -> bool {
        other.iter().all(|term| self.contains(term))
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Join the entries in insertion order
    pub fn join(&self, separator: &str) -> String {
        self.entries.join(separator)
    }
}

impl<S: Into<String>> Extend<S> for KeywordSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for term in iter {
            self.insert(term);
        }
    }
}

impl<S: Into<String>> FromIterator<S> for KeywordSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = KeywordSet::new();
        set.extend(iter);
        set
    }
}

impl From<Option<Vec<String>>> for KeywordSet {
    fn from(entries: Option<Vec<String>>) -> Self {
        entries.unwrap_or_default().into_iter().collect()
    }
}

impl From<KeywordSet> for Vec<String> {
    fn from(set: KeywordSet) -> Self {
        set.entries
    }
}

/// The persisted profile of a user's inferred technical background
///
/// Serialized with camelCase keys. A missing project type is written as
/// an empty string and an empty string reads back as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceRecord {
    /// Programming languages the user has mentioned
    #[serde(default)]
    pub preferred_languages: KeywordSet,
    /// Tools and frameworks the user has mentioned
    #[serde(default)]
    pub previous_tools: KeywordSet,
    /// Reserved for future extraction rules; always present
    #[serde(default, deserialize_with = "null_as_empty")]
    pub project_requirements: BTreeMap<String, serde_json::Value>,
    /// Most recently detected project type
    #[serde(default, with = "empty_as_none")]
    pub last_project_type: Option<String>,
}

impl PreferenceRecord {
    /// Check whether nothing has been learned yet
    pub fn is_empty(&self) -> bool {
        self.preferred_languages.is_empty()
            && self.previous_tools.is_empty()
            && self.last_project_type.is_none()
    }

    /// Human-readable summary lines for the view
    pub fn summary_lines(&self) -> Vec<String> {
        if self.is_empty() {
            return vec![EMPTY_SUMMARY.to_string()];
        }

        let mut lines = Vec::new();
        if !self.preferred_languages.is_empty() {
            lines.push(format!(
                "Languages: {}",
                self.preferred_languages.join(", ")
            ));
        }
        if !self.previous_tools.is_empty() {
            lines.push(format!(
                "Experience with: {}",
                self.previous_tools.join(", ")
            ));
        }
        if let Some(project_type) = &self.last_project_type {
            lines.push(format!("Last Project: {project_type}"));
        }
        lines
    }
}

fn null_as_empty<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

mod empty_as_none {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.filter(|v| !v.trim().is_empty()))
    }
}
