//! Bundle identifiers
//!
//! Ids are human-readable: `{version}-{sanitized_tag}-{random8}`. The random
//! suffix is drawn from 62 alphanumeric characters, so collisions are left to
//! the store's primary key rather than checked up front.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of the random suffix of a generated id.
pub const RANDOM_SUFFIX_LEN: usize = 8;

/// Unique identifier for a bundle
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundleId(String);

impl BundleId {
    /// Wrap an existing id (e.g. one read back from storage or sent by a client).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id for a bundle of `version` under `tag`.
    pub fn generate(version: &str, tag: &str) -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(RANDOM_SUFFIX_LEN)
            .map(char::from)
            .collect();
        Self(format!("{}-{}-{}", version, sanitize_tag(tag), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BundleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for BundleId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for BundleId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl PartialEq<str> for BundleId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for BundleId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Replace every run of whitespace with a single `_`, then lower-case.
pub fn sanitize_tag(tag: &str) -> String {
    let mut out = String::with_capacity(tag.len());
    let mut in_whitespace = false;
    for c in tag.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
        } else {
            out.push(c);
            in_whitespace = false;
        }
    }
    out.to_lowercase()
}
