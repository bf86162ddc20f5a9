//! Aggregation of a batch of records for output.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::metadata::ModMetadata;

/// Prefix of keys synthesized for records that lack one
pub const UNKNOWN_PREFIX: &str = "UNKNOWN-";

/// How records are keyed in a [`ModIndex`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GroupBy {
    /// `modid -> version -> record`
    #[default]
    Id,
    /// `modid -> [record]`, ordered by version
    IdList,
    /// `filename -> record`
    Filename,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
enum Group {
    Versions(BTreeMap<String, ModMetadata>),
    List(Vec<ModMetadata>),
    Single(ModMetadata),
}

/// Records of one batch, grouped for output.
///
/// Serializes as a plain JSON object. Records without a usable key, and
/// records that never became valid, are dropped unless unknown entries are
/// included, in which case they are filed under `UNKNOWN-<n>`.
#[derive(Debug, Clone, Default)]
pub struct ModIndex {
    group_by: GroupBy,
    include_unknown: bool,
    groups: BTreeMap<String, Group>,
}

/// Returns `UNKNOWN-<n>` for the smallest `n` not already taken
fn unknown_key(taken: impl Fn(&str) -> bool) -> String {
    (0..)
        .map(|n| format!("{}{}", UNKNOWN_PREFIX, n))
        .find(|key| !taken(key))
        .unwrap_or_else(|| UNKNOWN_PREFIX.to_string())
}

impl ModIndex {
    /// Creates an empty index
    pub fn new(group_by: GroupBy) -> Self {
        Self {
            group_by,
            ..Self::default()
        }
    }

    /// Includes records without identifier or version under synthetic keys
    pub fn include_unknown(mut self, include: bool) -> Self {
        self.include_unknown = include;
        self
    }

    /// Number of top-level keys
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if nothing was indexed
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Top-level keys in output order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Files one record; returns whether it was kept
    pub fn insert(&mut self, metadata: ModMetadata) -> bool {
        if !metadata.valid && !self.include_unknown {
            return false;
        }

        let key = match self.group_by {
            GroupBy::Id | GroupBy::IdList => metadata.modid.clone(),
            GroupBy::Filename => metadata.filename.clone(),
        };
        let key = match key {
            Some(key) => key,
            None if self.include_unknown => unknown_key(|k| self.groups.contains_key(k)),
            None => return false,
        };

        match self.group_by {
            GroupBy::Id => {
                let version = match metadata.version.clone() {
                    Some(version) => version,
                    None if self.include_unknown => {
                        let existing = match self.groups.get(&key) {
                            Some(Group::Versions(versions)) => Some(versions),
                            _ => None,
                        };
                        unknown_key(|k| existing.map_or(false, |v| v.contains_key(k)))
                    }
                    None => return false,
                };
                let group = self
                    .groups
                    .entry(key)
                    .or_insert_with(|| Group::Versions(BTreeMap::new()));
                if let Group::Versions(versions) = group {
                    versions.insert(version, metadata);
                }
            }
            GroupBy::IdList => {
                let group = self.groups.entry(key).or_insert_with(|| Group::List(Vec::new()));
                if let Group::List(list) = group {
                    list.push(metadata);
                    list.sort_by(|a, b| a.version.cmp(&b.version));
                }
            }
            GroupBy::Filename => {
                self.groups.insert(key, Group::Single(metadata));
            }
        }
        true
    }
}

impl Extend<ModMetadata> for ModIndex {
    fn extend<I: IntoIterator<Item = ModMetadata>>(&mut self, iter: I) {
        for metadata in iter {
            self.insert(metadata);
        }
    }
}

impl Serialize for ModIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.groups.serialize(serializer)
    }
}
