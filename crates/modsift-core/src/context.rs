//! Mutable state accumulated while scanning one container.

use crate::mapping::SymbolKey;
use crate::metadata::ModMetadata;
use crate::processors::ModAnnotation;
use std::collections::HashSet;

/// Everything the scanners contribute for one container.
///
/// Created empty per container, threaded through every scanner, and consumed
/// by [`Reconciler::finalize`](crate::reconcile::Reconciler::finalize).
#[derive(Debug, Clone, Default)]
pub struct ScanContext {
    /// The record being built
    pub metadata: ModMetadata,
    /// Raw version strings seen so far, in discovery order
    pub version_candidates: Vec<String>,
    /// Symbol references collected for version inference
    pub symbol_keys: HashSet<SymbolKey>,
    /// Generation of the last mod annotation seen
    pub mod_annotation: Option<ModAnnotation>,
}

impl ScanContext {
    /// Creates an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a version candidate if it is non-empty
    pub fn add_version_candidate(&mut self, version: &str) {
        if !version.is_empty() {
            self.version_candidates.push(version.to_string());
        }
    }
}
