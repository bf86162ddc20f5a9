//! Finalization of a scanned record.
//!
//! Runs once per container after every entry was scanned: removes
//! self-references, settles the side, falls back to version inference and
//! picks one version string out of the collected candidates.

use tracing::debug;

use crate::context::ScanContext;
use crate::heuristics::VersionHeuristics;
use crate::mapping::MappingStore;
use crate::metadata::{ModMetadata, Side};

/// Chooses the version to report from every candidate seen.
///
/// Candidates that appear verbatim in the filename are preferred when exactly
/// one does. Otherwise the longest candidate wins, ties going to the
/// lexicographically last.
pub fn resolve_version(candidates: &[String], filename: Option<&str>) -> Option<String> {
    match candidates {
        [] => None,
        [only] => Some(only.clone()),
        _ => {
            if let Some(filename) = filename {
                let mut in_name = candidates.iter().filter(|c| filename.contains(c.as_str()));
                if let (Some(only), None) = (in_name.next(), in_name.next()) {
                    return Some(only.clone());
                }
            }

            // Only maximum-length candidates compete on ordering; a shorter
            // but lexicographically later string such as "9" never wins.
            let longest = candidates.iter().map(String::len).max()?;
            candidates
                .iter()
                .filter(|c| c.len() == longest)
                .max()
                .cloned()
        }
    }
}

/// Removes the record's own identifiers from `provides` and `dependencies`.
///
/// Anything left in either marks the record valid.
pub fn prune_self_references(metadata: &mut ModMetadata) {
    if let Some(modid) = metadata.modid.as_deref() {
        metadata.provides.retain(|p| p != modid);
        metadata.dependencies.remove(modid);
    }
    if !metadata.provides.is_empty() {
        metadata.valid = true;
    }

    for id in &metadata.provides {
        metadata.dependencies.remove(id);
    }
    if !metadata.dependencies.is_empty() {
        metadata.valid = true;
    }
}

/// Completes a scanned context into its final record
#[derive(Debug, Clone, Copy)]
pub struct Reconciler<'a> {
    store: &'a MappingStore,
    version_heuristics: bool,
}

impl<'a> Reconciler<'a> {
    /// Creates a reconciler consulting `store` for side and version facts
    pub fn new(store: &'a MappingStore) -> Self {
        Self {
            store,
            version_heuristics: true,
        }
    }

    /// Enables or disables version inference
    pub fn version_heuristics(mut self, enabled: bool) -> Self {
        self.version_heuristics = enabled;
        self
    }

    /// Finalizes `ctx`. `filename` is the container's own file name, used to
    /// pick among version candidates.
    pub fn finalize(&self, ctx: ScanContext, filename: Option<&str>) -> ModMetadata {
        let ScanContext {
            mut metadata,
            version_candidates,
            symbol_keys,
            mod_annotation,
        } = ctx;

        prune_self_references(&mut metadata);

        if metadata.side.is_none() {
            if let Some(platform) = metadata.dependencies.explicit_platform() {
                if !self.store.has_sides(platform) {
                    metadata.side = Some(Side::Universal);
                }
            }
        }

        if self.version_heuristics
            && (metadata.side.is_none() || metadata.dependencies.explicit_platform().is_none())
        {
            if let Some(found) = VersionHeuristics::new(self.store).infer(&symbol_keys, mod_annotation) {
                metadata.valid = true;
                if metadata.side.is_none() {
                    metadata.side = Some(found.side);
                } else {
                    debug!("Keeping declared side over inferred {}", found.side);
                }
                metadata.dependencies.add_platform(&found.label);
            }
        }

        if let Some(version) = resolve_version(&version_candidates, filename) {
            metadata.version = Some(version);
        }

        metadata
    }
}
