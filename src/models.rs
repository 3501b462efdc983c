//! Core data models used throughout the drifter pipeline.
//!
//! A [`Snapshot`] is the walker's view of a repository; a [`HistoryRecord`]
//! is one stored generation result.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Identifier assigned by the history store. Never reused.
pub type RecordId = i64;

/// Ordered mapping from relative path (forward slashes) to truncated text.
///
/// Backed by a `BTreeMap`, so iteration and serialization follow sorted path
/// order regardless of how the filesystem enumerated entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    files: BTreeMap<String, String>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, path: String, content: String) {
        self.files.insert(path, content);
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Total characters of file content held.
    pub fn total_chars(&self) -> usize {
        self.files.values().map(|c| c.chars().count()).sum()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            files: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// One immutable row of generation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRecord {
    pub id: RecordId,
    /// Where the document came from, usually a repository URL.
    pub source_identifier: String,
    /// The generated document text.
    pub artifact: String,
    pub created_at: DateTime<Utc>,
}
