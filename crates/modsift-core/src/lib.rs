//! # modsift-core
//!
//! A library for recovering mod identity metadata from packaged Minecraft mods.
//!
//! Mods from different eras declare who they are in different places, if at
//! all: a bundled `mcmod.info` descriptor, a `@Mod` annotation on a class, a
//! legacy base class, or nothing. This crate reads every source found in a
//! container, merges them under fixed conflict rules and, when no platform
//! version is declared, infers one by matching the game symbols the code
//! references against historical mapping tables.
//!
//! ## Architecture
//!
//! - [`analyzer`]: container walking, nested containers and their merge
//! - [`classfile`]: structural class file reading and the visitor interface
//! - [`processors`]: class visitors extracting metadata and symbol references
//! - [`descriptor`] and [`manifest`]: the non-class metadata sources
//! - [`reconcile`]: finalization of one record
//! - [`heuristics`] and [`mapping`]: version inference and its tables
//! - [`index`]: grouping a batch of records for output
//! - [`error`]: error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use modsift_core::{AnalyzerConfig, MappingStore, ModAnalyzer};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MappingStore::new("./mcp/"));
//! let analyzer = ModAnalyzer::with_config(store, AnalyzerConfig::new().generate_hash(true));
//!
//! if let Some(metadata) = analyzer.analyze_path(Path::new("mods/acme-1.0.jar")) {
//!     println!("{}", serde_json::to_string_pretty(&metadata)?);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! Class scanning is built on [`ClassVisitor`]; any number of visitors can be
//! composed over a single traversal of a class.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod analyzer;
pub mod classfile;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod heuristics;
pub mod index;
pub mod manifest;
pub mod mapping;
pub mod merge;
pub mod metadata;
pub mod processors;
pub mod reconcile;

#[cfg(test)]
mod test_support;

// Re-export primary types for convenience
pub use analyzer::{AnalyzerConfig, ModAnalyzer};
pub use classfile::{ClassFile, ClassVisitor};
pub use context::ScanContext;
pub use error::{Error, Result};
pub use heuristics::{HeuristicMatch, VersionHeuristics};
pub use index::{GroupBy, ModIndex};
pub use mapping::{Dist, MappingStore, SymbolKey, VersionSource};
pub use metadata::{Dependencies, ModMetadata, Side};
pub use reconcile::Reconciler;

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
