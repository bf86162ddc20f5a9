//! Canonical symbol keys.
//!
//! A key is `M:<owner/name>:<descriptor>` for a method and `F:<owner/name>`
//! for a field. Generated placeholder names (`func_*`, `field_*`) are stable
//! across renaming generations while their owners are not, so for those the
//! owner is dropped and only the placeholder is kept.

use std::borrow::Borrow;
use std::fmt;

/// Prefix of machine-generated method names
pub const METHOD_PLACEHOLDER_PREFIX: &str = "func_";

/// Prefix of machine-generated field names
pub const FIELD_PLACEHOLDER_PREFIX: &str = "field_";

/// Canonical string form of one method or field reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolKey(String);

impl SymbolKey {
    /// Key for a method given as `owner/name` plus its descriptor
    pub fn method(qualified_name: &str, descriptor: &str) -> Self {
        let simple = simple_name(qualified_name);
        let name = if simple.starts_with(METHOD_PLACEHOLDER_PREFIX) {
            simple
        } else {
            qualified_name
        };
        Self(format!("M:{}:{}", name, descriptor))
    }

    /// Key for a field given as `owner/name`
    pub fn field(qualified_name: &str) -> Self {
        let simple = simple_name(qualified_name);
        let name = if simple.starts_with(FIELD_PLACEHOLDER_PREFIX) {
            simple
        } else {
            qualified_name
        };
        Self(format!("F:{}", name))
    }

    /// Wraps an already-canonical key, e.g. a line of a cache file
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The canonical string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn simple_name(qualified_name: &str) -> &str {
    qualified_name
        .rsplit_once('/')
        .map_or(qualified_name, |(_, simple)| simple)
}

impl Borrow<str> for SymbolKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
