//! Historical symbol-mapping tables.
//!
//! A mapping table is the set of [`SymbolKey`]s known for one platform
//! version and side. Tables are derived from legacy mapping archives found in
//! an archive directory, persisted as `<version>-<side>.map` cache files, and
//! held in memory by a [`MappingStore`] for the lifetime of the store.
//!
//! ## Sharing
//!
//! The store is an explicit service object. Loaded tables live behind a
//! read-mostly lock and are handed out as `Arc`s, so one store can back
//! analyzers on several threads. Call [`MappingStore::preload`] before
//! fanning out to avoid serializing the first lookups on the write lock.

mod key;
mod loader;

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Error;

pub use key::{SymbolKey, FIELD_PLACEHOLDER_PREFIX, METHOD_PLACEHOLDER_PREFIX};

/// The set of canonical keys for one version/side
pub type MappingTable = HashSet<SymbolKey>;

/// Default location of mapping archives and cache files
pub const DEFAULT_MAPPING_DIR: &str = "./mcp/";

/// Extension of mapping cache files
const CACHE_EXTENSION: &str = "map";

/// Physical distribution a mapping table belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dist {
    /// The game client
    Client,
    /// The dedicated server
    Server,
}

impl Dist {
    /// Both distributions, client first
    pub const ALL: [Dist; 2] = [Dist::Client, Dist::Server];

    /// Returns the lowercase name used in cache file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Dist::Client => "client",
            Dist::Server => "server",
        }
    }
}

impl fmt::Display for Dist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A known platform version and where its mappings come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSource {
    /// Platform version, e.g. `1.7.10`
    pub version: String,
    /// Candidate archive file names, most preferred first
    pub archives: Vec<String>,
    /// Whether client and server builds of this version differ
    pub has_sides: bool,
}

impl VersionSource {
    /// Creates a new version source
    pub fn new(version: impl Into<String>, archives: &[&str], has_sides: bool) -> Self {
        Self {
            version: version.into(),
            archives: archives.iter().map(|s| s.to_string()).collect(),
            has_sides,
        }
    }
}

/// Every platform version with published mappings, oldest first
const KNOWN_VERSIONS: &[(&str, &[&str], bool)] = &[
    ("b1.4_01", &["mcp30.zip"], true),
    ("b1.5_01", &["mcp31.zip"], true),
    ("b1.6.4", &["mcp32.zip"], true),
    ("b1.6.5", &["mcp33.zip"], true),
    ("b1.6.6", &["mcp41.zip", "mcp40.zip", "mcp34.zip"], true),
    ("b1.7.2", &["mcp42.zip"], true),
    ("b1.7.3", &["mcp43.zip"], true),
    ("b1.8.1", &["mcp44.zip"], true),
    ("1.0.0", &["mcp50.zip"], true),
    ("1.1", &["mcp56.zip"], true),
    ("1.2.3", &["mcp60.zip"], true),
    ("1.2.4", &["mcp61.zip"], true),
    ("1.2.5", &["mcp62.zip"], true),
    ("1.3.1", &["mcp70a.zip"], false),
    ("1.3.2", &["mcp72.zip"], false),
    ("1.4.2", &["mcp719.zip"], false),
    ("1.4.4", &["mcp721.zip"], false),
    ("1.4.5", &["mcp723.zip"], false),
    ("1.4.6", &["mcp725.zip"], false),
    ("1.4.7", &["mcp726a.zip"], false),
    ("1.5", &["mcp742.zip"], false),
    ("1.5.1", &["mcp744.zip"], false),
    ("1.5.2", &["mcp751.zip"], false),
    ("1.6.1", &["mcp803.zip"], false),
    ("1.6.2", &["mcp805.zip"], false),
    ("1.6.4", &["mcp811.zip"], false),
    ("1.7.2", &["mcp903.zip"], false),
    ("1.7.10", &["mcp908.zip"], false),
    ("1.8", &["mcp910.zip"], false),
    ("1.8.8", &["mcp918.zip"], false),
    ("1.9", &["mcp924_1.zip", "mcp924.zip"], false),
    ("1.9.4", &["mcp928_1.zip", "mcp928.zip"], false),
    ("1.10", &["mcp931.zip"], false),
    ("1.11.2", &["mcp937.zip"], false),
    ("1.12", &["mcp940.zip"], false),
];

/// Returns the built-in table of known versions
pub fn default_versions() -> Vec<VersionSource> {
    KNOWN_VERSIONS
        .iter()
        .map(|(version, archives, has_sides)| VersionSource::new(*version, archives, *has_sides))
        .collect()
}

/// Loads, caches and serves mapping tables
#[derive(Debug)]
pub struct MappingStore {
    archive_dir: PathBuf,
    cache_dir: PathBuf,
    versions: Vec<VersionSource>,
    tables: RwLock<HashMap<(String, Dist), Arc<MappingTable>>>,
}

impl Default for MappingStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAPPING_DIR)
    }
}

impl MappingStore {
    /// Creates a store reading archives from `archive_dir` and caching next to them
    pub fn new(archive_dir: impl Into<PathBuf>) -> Self {
        let archive_dir = archive_dir.into();
        Self {
            cache_dir: archive_dir.clone(),
            archive_dir,
            versions: default_versions(),
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Sets the directory cache files are read from and written to
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Replaces the table of known versions
    pub fn with_versions(mut self, versions: Vec<VersionSource>) -> Self {
        self.versions = versions;
        self
    }

    /// Directory searched for mapping archives
    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// Directory holding cache files
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Known versions, oldest first
    pub fn versions(&self) -> &[VersionSource] {
        &self.versions
    }

    /// Whether a version distinguishes client and server builds.
    ///
    /// Any `-suffix` is ignored. Unknown versions are assumed side-split only
    /// for betas (`b` prefix).
    pub fn has_sides(&self, version: &str) -> bool {
        let base = version.split('-').next().unwrap_or(version);
        self.versions
            .iter()
            .find(|v| v.version == base)
            .map_or_else(|| base.starts_with('b'), |v| v.has_sides)
    }

    /// Path of the cache file for one version/side
    pub fn cache_path(&self, version: &str, dist: Dist) -> PathBuf {
        self.cache_dir
            .join(format!("{}-{}.{}", version, dist, CACHE_EXTENSION))
    }

    /// Returns the table for a version/side, loading it on first use
    pub fn table(&self, version: &str, dist: Dist) -> Arc<MappingTable> {
        let key = (version.to_string(), dist);
        if let Some(table) = self.tables.read().get(&key) {
            return Arc::clone(table);
        }

        let mut tables = self.tables.write();
        if let Some(table) = tables.get(&key) {
            return Arc::clone(table);
        }

        let (client, server) = self.load_version(version);
        let client = Arc::new(client);
        let server = Arc::new(server);
        tables.insert((version.to_string(), Dist::Client), Arc::clone(&client));
        tables.insert((version.to_string(), Dist::Server), Arc::clone(&server));

        match dist {
            Dist::Client => client,
            Dist::Server => server,
        }
    }

    /// Loads every known version up front
    pub fn preload(&self) {
        for source in &self.versions {
            self.table(&source.version, Dist::Client);
        }
    }

    fn load_version(&self, version: &str) -> (MappingTable, MappingTable) {
        let client_cache = self.cache_path(version, Dist::Client);
        let server_cache = self.cache_path(version, Dist::Server);

        if client_cache.is_file() && server_cache.is_file() {
            match (loader::read_cache(&client_cache), loader::read_cache(&server_cache)) {
                (Ok(client), Ok(server)) => {
                    debug!("Loaded cached mappings for {}", version);
                    return (client, server);
                }
                (Err(e), _) | (_, Err(e)) => {
                    warn!("Ignoring unreadable mapping cache for {}: {}", version, e);
                }
            }
        }

        let Some(source) = self.versions.iter().find(|v| v.version == version) else {
            warn!("No mapping source known for Minecraft {}", version);
            return (MappingTable::new(), MappingTable::new());
        };

        let Some(archive) = source
            .archives
            .iter()
            .map(|name| self.archive_dir.join(name))
            .find(|path| path.is_file())
        else {
            warn!(
                "MCP file for Minecraft {} ({}) not found!",
                version,
                source.archives.join(", ")
            );
            return (MappingTable::new(), MappingTable::new());
        };

        let tables = match loader::load_archive(&archive) {
            Ok(tables) => tables,
            Err(e @ Error::UnknownMappingLayout { .. }) => {
                warn!("MCP file for Minecraft {}: {}", version, e);
                loader::SidedTables::default()
            }
            Err(e) => {
                warn!("Failed to load mappings for Minecraft {}: {}", version, e);
                return (MappingTable::new(), MappingTable::new());
            }
        };

        for (path, table) in [(&client_cache, &tables.client), (&server_cache, &tables.server)] {
            if let Err(e) = loader::write_cache(path, table) {
                warn!("Failed to persist mapping cache: {}", e);
            }
        }

        (tables.client, tables.server)
    }
}
