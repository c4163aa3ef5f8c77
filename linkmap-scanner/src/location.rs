//! Location normalization and block-list filtering.

use serde::{Deserialize, Serialize};

/// Very basic normalization so the same page is not admitted twice.
///
/// Strips exactly one trailing `/`. Query strings and fragments are left
/// alone (`a.com/?q=1` does not become `a.com?q=1`) and repeated slashes
/// are not collapsed (`a.com//` becomes `a.com/`).
pub fn normalize(location: &str) -> String {
    location
        .strip_suffix('/')
        .unwrap_or(location)
        .to_string()
}

/// Substrings that exclude a location from being crawled.
///
/// Matching is a plain substring test, so blocking `rl.com` also blocks
/// `viral.com`. Edges to blocked locations are still recorded; the list only
/// decides whether a location is fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockList {
    entries: Vec<String>,
}

impl BlockList {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_allowed(&self, location: &str) -> bool {
        !self
            .entries
            .iter()
            .any(|entry| location.contains(entry.as_str()))
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<S: Into<String>> FromIterator<S> for BlockList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}
