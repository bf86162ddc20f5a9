//! The per-container metadata record and its dependency map.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Name under which the game itself appears in a dependency map
pub const PLATFORM_DEPENDENCY: &str = "minecraft";

/// Version constraint meaning "any version"
pub const WILDCARD: &str = "*";

/// The platform context a build targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Client-only build
    Client,
    /// Dedicated-server-only build
    Server,
    /// Runs on both
    Universal,
}

impl Side {
    /// Returns the lowercase name used in output
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Client => "client",
            Side::Server => "server",
            Side::Universal => "universal",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping from dependency name to version constraint (`*` = unconstrained)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Dependencies(BTreeMap<String, String>);

impl Dependencies {
    /// Creates an empty dependency map
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a dependency given as `name` or `name@constraint`.
    ///
    /// A new name is inserted as-is. An existing wildcard entry is upgraded
    /// to a concrete constraint; every other existing entry is left alone.
    pub fn add(&mut self, dependency: &str) {
        let (name, constraint) = match dependency.split_once('@') {
            Some((name, constraint)) => (name.trim(), constraint.trim()),
            None => (dependency.trim(), WILDCARD),
        };
        if name.is_empty() {
            return;
        }
        let constraint = if constraint.is_empty() {
            WILDCARD
        } else {
            constraint
        };

        match self.0.get_mut(name) {
            Some(existing) => {
                if constraint != WILDCARD && *existing == WILDCARD {
                    *existing = constraint.to_string();
                }
            }
            None => {
                self.0.insert(name.to_string(), constraint.to_string());
            }
        }
    }

    /// Registers a dependency on the platform itself at `version`
    pub fn add_platform(&mut self, version: &str) {
        self.add(&format!("{}@{}", PLATFORM_DEPENDENCY, version));
    }

    /// Returns the constraint registered for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Returns the platform constraint, if one is declared and is not a wildcard
    pub fn explicit_platform(&self) -> Option<&str> {
        self.get(PLATFORM_DEPENDENCY).filter(|v| *v != WILDCARD)
    }

    /// Returns true if `name` is present
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Removes `name`, returning its constraint
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(name)
    }

    /// Number of dependencies
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no dependencies
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates `(name, constraint)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Identity metadata recovered for one container
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModMetadata {
    /// Primary identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modid: Option<String>,
    /// Secondary identifiers this unit also satisfies
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<String>,
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-form description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Resolved version string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Project homepage URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    /// Targeted side, unknown until declared or inferred
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    /// File name of the analyzed container
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Hex blake3 digest of the container file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    /// Authors in first-seen order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    /// Declared and inferred dependencies
    #[serde(skip_serializing_if = "Dependencies::is_empty")]
    pub dependencies: Dependencies,
    /// Set when the manifest declares a core (loader) plugin
    pub has_coremod: bool,
    /// Set once any source has positively contributed
    #[serde(skip)]
    pub valid: bool,
}

impl ModMetadata {
    /// Creates an empty record
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_keeps_concrete_constraint() {
        let mut deps = Dependencies::new();
        deps.add("foo@1.0");
        deps.add("foo");
        assert_eq!(deps.get("foo"), Some("1.0"));
    }

    #[test]
    fn test_add_upgrades_wildcard() {
        let mut deps = Dependencies::new();
        deps.add("foo");
        assert_eq!(deps.get("foo"), Some("*"));
        deps.add("foo@1.0");
        assert_eq!(deps.get("foo"), Some("1.0"));
        deps.add("foo@2.0");
        assert_eq!(deps.get("foo"), Some("1.0"));
    }

    #[test]
    fn test_add_splits_on_first_at_and_trims() {
        let mut deps = Dependencies::new();
        deps.add(" Forge @ [10.13,) ");
        deps.add("odd@1@2");
        deps.add("   ");
        assert_eq!(deps.get("Forge"), Some("[10.13,)"));
        assert_eq!(deps.get("odd"), Some("1@2"));
        assert_eq!(deps.len(), 2);
    }

    #[test]
    fn test_explicit_platform() {
        let mut deps = Dependencies::new();
        deps.add(PLATFORM_DEPENDENCY);
        assert_eq!(deps.explicit_platform(), None);
        deps.add_platform("1.7.10");
        assert_eq!(deps.explicit_platform(), Some("1.7.10"));
    }

    #[test]
    fn test_serialized_shape() {
        let mut meta = ModMetadata::new();
        meta.modid = Some("acme".into());
        meta.side = Some(Side::Universal);
        meta.dependencies.add("minecraft@1.7.10");
        meta.valid = true;

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "modid": "acme",
                "side": "universal",
                "dependencies": { "minecraft": "1.7.10" },
                "hasCoremod": false
            })
        );
    }
}
