//! Platform version inference from symbol references.
//!
//! Every known version/side pair is scored by how many of the observed
//! [`SymbolKey`]s its mapping table contains. The pairs sharing the top score
//! win, unless they are every known pair, which tells us nothing.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashSet;
use tracing::debug;

use crate::mapping::{Dist, MappingStore, SymbolKey};
use crate::metadata::Side;
use crate::processors::ModAnnotation;

/// Versions whose tables flatten every game package into `net/minecraft/src`
const FLAT_PACKAGE_VERSIONS: &[&str] = &["1.5", "1.6"];

static GAME_PACKAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"net/minecraft/([a-z/]+)/([A-Z])").expect("game package pattern is valid")
});

/// The outcome of a successful inference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeuristicMatch {
    /// Every version/side pair sharing the top score, in known-version order
    pub pairs: Vec<(String, Dist)>,
    /// Distinct versions among `pairs`
    pub versions: Vec<String>,
    /// Side implied by the matched pairs
    pub side: Side,
    /// A single version, or `{a, b, ...}` when several tie
    pub label: String,
}

/// Scores symbol sets against the tables of a [`MappingStore`]
#[derive(Debug, Clone, Copy)]
pub struct VersionHeuristics<'a> {
    store: &'a MappingStore,
}

impl<'a> VersionHeuristics<'a> {
    /// Creates an engine backed by `store`
    pub fn new(store: &'a MappingStore) -> Self {
        Self { store }
    }

    /// Counts, per candidate version/side, how many keys its table contains.
    ///
    /// When a mod annotation was seen, versions it could never have targeted
    /// are not candidates at all.
    pub fn score(
        &self,
        keys: &HashSet<SymbolKey>,
        annotation: Option<ModAnnotation>,
    ) -> Vec<(String, Dist, usize)> {
        let flattened: Vec<Cow<'_, str>> = keys
            .iter()
            .map(|key| GAME_PACKAGE.replace_all(key.as_str(), "net/minecraft/src/$2"))
            .collect();

        let mut scores = Vec::new();
        for source in self.store.versions() {
            let version = source.version.as_str();
            if annotation.map_or(false, |a| !a.accepts_version(version)) {
                continue;
            }
            let flat = FLAT_PACKAGE_VERSIONS.iter().any(|p| version.starts_with(p));

            for dist in Dist::ALL {
                let table = self.store.table(version, dist);
                let count = if flat {
                    flattened.iter().filter(|k| table.contains::<str>(k)).count()
                } else {
                    keys.iter().filter(|k| table.contains(k.as_str())).count()
                };
                scores.push((version.to_string(), dist, count));
            }
        }
        scores
    }

    /// Infers the platform version(s) and side the keys were compiled against.
    ///
    /// Returns `None` when nothing matched or when the best score is shared
    /// by every known version/side pair. Pairs excluded by the annotation
    /// still count as known.
    pub fn infer(
        &self,
        keys: &HashSet<SymbolKey>,
        annotation: Option<ModAnnotation>,
    ) -> Option<HeuristicMatch> {
        if keys.is_empty() {
            return None;
        }

        let scores = self.score(keys, annotation);
        let max = scores.iter().map(|(_, _, count)| *count).max()?;
        if max == 0 {
            return None;
        }

        let pairs: Vec<(String, Dist)> = scores
            .iter()
            .filter(|(_, _, count)| *count == max)
            .map(|(version, dist, _)| (version.clone(), *dist))
            .collect();
        let known_pairs = self.store.versions().len() * Dist::ALL.len();
        if pairs.len() == known_pairs {
            debug!("Heuristics: all {} known pairs tied at {}", known_pairs, max);
            return None;
        }

        let mut versions: Vec<String> = Vec::new();
        for (version, _) in &pairs {
            if !versions.contains(version) {
                versions.push(version.clone());
            }
        }

        let has_client = pairs.iter().any(|(_, d)| *d == Dist::Client);
        let has_server = pairs.iter().any(|(_, d)| *d == Dist::Server);
        let has_sides = versions.iter().any(|v| self.store.has_sides(v));
        let side = if !has_sides || has_client == has_server {
            Side::Universal
        } else if has_client {
            Side::Client
        } else {
            Side::Server
        };

        let label = match versions.as_slice() {
            [single] => single.clone(),
            many => format!("{{{}}}", many.join(", ")),
        };

        debug!("Heuristics: {} ({}) with {} hits", label, side, max);
        Some(HeuristicMatch {
            pairs,
            versions,
            side,
            label,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::VersionSource;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    /// Builds a store whose tables come straight from cache files
    fn store(dir: &TempDir, tables: &[(&str, bool, &str, &str)]) -> MappingStore {
        let store = MappingStore::new(dir.path()).with_versions(
            tables
                .iter()
                .map(|(v, sides, _, _)| VersionSource::new(*v, &[], *sides))
                .collect(),
        );
        for (version, _, client, server) in tables {
            fs::write(store.cache_path(version, Dist::Client), client).unwrap();
            fs::write(store.cache_path(version, Dist::Server), server).unwrap();
        }
        store
    }

    fn keys(raw: &[&str]) -> HashSet<SymbolKey> {
        raw.iter().map(|k| SymbolKey::from_raw(*k)).collect()
    }

    #[test]
    fn test_unique_table_wins() {
        let dir = TempDir::new().unwrap();
        let store = store(
            &dir,
            &[
                ("b1.7.3", true, "M:func_1_a:()V\nM:func_2_b:()V\n", "M:func_1_a:()V\n"),
                ("1.2.5", true, "M:func_1_a:()V\n", ""),
            ],
        );

        let found = VersionHeuristics::new(&store)
            .infer(&keys(&["M:func_1_a:()V", "M:func_2_b:()V"]), None)
            .unwrap();
        assert_eq!(found.pairs, vec![("b1.7.3".to_string(), Dist::Client)]);
        assert_eq!(found.side, Side::Client);
        assert_eq!(found.label, "b1.7.3");
    }

    #[test]
    fn test_tie_across_versions_builds_label() {
        let dir = TempDir::new().unwrap();
        let store = store(
            &dir,
            &[
                ("1.7.2", false, "M:func_1_a:()V\n", "M:func_1_a:()V\n"),
                ("1.7.10", false, "M:func_1_a:()V\n", "M:func_1_a:()V\n"),
                ("1.8", false, "", ""),
            ],
        );

        let found = VersionHeuristics::new(&store)
            .infer(&keys(&["M:func_1_a:()V"]), None)
            .unwrap();
        assert_eq!(found.versions, vec!["1.7.2", "1.7.10"]);
        assert_eq!(found.label, "{1.7.2, 1.7.10}");
        assert_eq!(found.side, Side::Universal);
    }

    #[test]
    fn test_no_discrimination_is_no_match() {
        let dir = TempDir::new().unwrap();
        let store = store(
            &dir,
            &[
                ("1.7.10", false, "M:func_1_a:()V\n", "M:func_1_a:()V\n"),
                ("1.8", false, "M:func_1_a:()V\n", "M:func_1_a:()V\n"),
            ],
        );
        let engine = VersionHeuristics::new(&store);
        assert_eq!(engine.infer(&keys(&["M:func_1_a:()V"]), None), None);
        assert_eq!(engine.infer(&keys(&["M:unknown:()V"]), None), None);
        assert_eq!(engine.infer(&HashSet::new(), None), None);
    }

    #[test]
    fn test_annotation_restricts_candidates() {
        let dir = TempDir::new().unwrap();
        let store = store(
            &dir,
            &[
                ("1.7.10", false, "M:func_1_a:()V\nM:func_2_b:()V\n", "M:func_1_a:()V\nM:func_2_b:()V\n"),
                ("1.8", false, "M:func_1_a:()V\n", "M:func_1_a:()V\n"),
                ("1.12", false, "", ""),
            ],
        );
        let observed = keys(&["M:func_1_a:()V", "M:func_2_b:()V"]);
        let engine = VersionHeuristics::new(&store);

        assert_eq!(engine.infer(&observed, None).unwrap().label, "1.7.10");
        let forge = engine.infer(&observed, Some(ModAnnotation::Forge)).unwrap();
        assert_eq!(forge.label, "1.8");
        assert_eq!(forge.side, Side::Universal);
    }

    #[test]
    fn test_tie_within_annotation_range_still_matches() {
        let dir = TempDir::new().unwrap();
        let store = store(
            &dir,
            &[
                ("1.7.10", false, "", ""),
                ("1.8", false, "M:func_1_a:()V\n", "M:func_1_a:()V\n"),
                ("1.12", false, "M:func_1_a:()V\n", "M:func_1_a:()V\n"),
            ],
        );
        let observed = keys(&["M:func_1_a:()V"]);
        let engine = VersionHeuristics::new(&store);

        let forge = engine.infer(&observed, Some(ModAnnotation::Forge)).unwrap();
        assert_eq!(forge.versions, vec!["1.8", "1.12"]);
        assert_eq!(forge.label, "{1.8, 1.12}");
        assert_eq!(forge.side, Side::Universal);
        assert_eq!(engine.infer(&observed, None).unwrap().label, "{1.8, 1.12}");
    }

    #[test]
    fn test_flat_package_rewrite() {
        let dir = TempDir::new().unwrap();
        let store = store(
            &dir,
            &[
                ("1.5.2", false, "M:net/minecraft/src/World/tick:()V\n", ""),
                ("1.7.10", false, "", ""),
            ],
        );

        let found = VersionHeuristics::new(&store)
            .infer(&keys(&["M:net/minecraft/world/World/tick:()V"]), None)
            .unwrap();
        assert_eq!(found.pairs, vec![("1.5.2".to_string(), Dist::Client)]);
        // 1.5.2 does not distinguish sides
        assert_eq!(found.side, Side::Universal);
    }
}
