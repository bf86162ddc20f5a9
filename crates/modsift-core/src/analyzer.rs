//! Container walking.
//!
//! A container (jar or zip) is read entry by entry. Each entry is dispatched
//! by name to the descriptor parser, the manifest scanner or the class
//! scanner, all accumulating into one [`ScanContext`]. Nested containers are
//! analyzed recursively into records of their own, which are only consulted
//! when the container itself yields nothing.
//!
//! The central directory is used when present. Containers whose directory is
//! missing or truncated are read front to back from their local headers.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use zip::read::read_zipfile_from_stream;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::context::ScanContext;
use crate::descriptor::Descriptor;
use crate::error::{Error, Result};
use crate::manifest;
use crate::mapping::MappingStore;
use crate::metadata::{ModMetadata, Side};
use crate::processors::scan_class;
use crate::reconcile::Reconciler;

/// Name of the legacy descriptor entry
pub const DESCRIPTOR_ENTRY: &str = "mcmod.info";
/// Name of the manifest entry
pub const MANIFEST_ENTRY: &str = "META-INF/MANIFEST.MF";
/// Extension of compiled classes
pub const CLASS_EXTENSION: &str = ".class";
/// Extensions of nested containers
pub const NESTED_EXTENSIONS: &[&str] = &[".jar", ".zip"];

/// Default limit on container nesting
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Configuration for the analyzer
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Infer platform version and side from symbol references
    pub version_heuristics: bool,
    /// Compute a content digest of each top-level container
    pub generate_hash: bool,
    /// Record the container's file name
    pub store_filenames: bool,
    /// How many levels of nested containers are followed (0 = none)
    pub max_depth: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            version_heuristics: true,
            generate_hash: false,
            store_filenames: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl AnalyzerConfig {
    /// Creates a new analyzer config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables version inference
    pub fn version_heuristics(mut self, enabled: bool) -> Self {
        self.version_heuristics = enabled;
        self
    }

    /// Enables or disables content digests
    pub fn generate_hash(mut self, enabled: bool) -> Self {
        self.generate_hash = enabled;
        self
    }

    /// Enables or disables recording file names
    pub fn store_filenames(mut self, enabled: bool) -> Self {
        self.store_filenames = enabled;
        self
    }

    /// Sets the nesting limit
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Extracts one [`ModMetadata`] per container
#[derive(Debug, Clone)]
pub struct ModAnalyzer {
    config: AnalyzerConfig,
    store: Arc<MappingStore>,
}

impl ModAnalyzer {
    /// Creates an analyzer with default configuration
    pub fn new(store: Arc<MappingStore>) -> Self {
        Self::with_config(store, AnalyzerConfig::default())
    }

    /// Creates an analyzer with custom configuration
    pub fn with_config(store: Arc<MappingStore>, config: AnalyzerConfig) -> Self {
        Self { config, store }
    }

    /// The active configuration
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// The mapping store consulted for version inference
    pub fn store(&self) -> &MappingStore {
        &self.store
    }

    /// Analyzes a container file, treating any failure as "no mod here"
    pub fn analyze_path(&self, path: &Path) -> Option<ModMetadata> {
        match self.analyze_file(path) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                debug!("Skipping {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Analyzes a container file
    pub fn analyze_file(&self, path: &Path) -> Result<ModMetadata> {
        debug!("Analyzing {}", path.display());
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        let file = File::open(path).map_err(|e| Error::file_read(path, e))?;
        let mut metadata = self.analyze_reader(BufReader::new(file), filename.as_deref())?;

        if self.config.store_filenames {
            metadata.filename = filename;
        }
        if self.config.generate_hash {
            metadata.digest = Some(digest_file(path)?);
        }
        Ok(metadata)
    }

    /// Analyzes a container from any seekable source.
    ///
    /// `filename` is only used to choose among version candidates.
    pub fn analyze_reader<R: Read + Seek>(&self, reader: R, filename: Option<&str>) -> Result<ModMetadata> {
        self.analyze_container(reader, filename, 0)
    }

    fn analyze_container<R: Read + Seek>(
        &self,
        mut reader: R,
        filename: Option<&str>,
        depth: usize,
    ) -> Result<ModMetadata> {
        let mut walk = Walk {
            ctx: ScanContext::new(),
            nested: Vec::new(),
            filename,
            depth,
        };

        let central_error = match ZipArchive::new(&mut reader) {
            Ok(mut archive) => {
                for index in 0..archive.len() {
                    let mut entry = archive.by_index(index)?;
                    if entry.is_dir() {
                        continue;
                    }
                    let name = entry.name().to_string();
                    self.scan_entry(&mut walk, &name, &mut entry)?;
                }
                None
            }
            Err(e) => Some(e),
        };

        if let Some(e) = central_error {
            debug!(
                "{}: no usable central directory ({}), reading local headers",
                filename.unwrap_or("<container>"),
                e
            );
            reader.rewind().map_err(ZipError::from)?;
            self.stream_entries(&mut walk, &mut reader, e)?;
        }

        let Walk { mut ctx, nested, .. } = walk;
        if !ctx.metadata.valid {
            if let Some(adopted) = merge_nested(nested) {
                ctx.metadata = adopted;
            }
        }

        Ok(Reconciler::new(&self.store)
            .version_heuristics(self.config.version_heuristics)
            .finalize(ctx, filename))
    }

    /// Reads entries front to back from their local headers.
    ///
    /// Stops quietly at the first unreadable header once something was read;
    /// if nothing was, the container is rejected with `central_error`.
    fn stream_entries<R: Read>(
        &self,
        walk: &mut Walk<'_>,
        reader: &mut R,
        central_error: ZipError,
    ) -> Result<()> {
        let mut read_any = false;
        loop {
            let mut entry = match read_zipfile_from_stream(reader) {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) if read_any => {
                    debug!("Stopping at unreadable local header: {}", e);
                    break;
                }
                Err(_) => return Err(central_error.into()),
            };
            read_any = true;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            self.scan_entry(walk, &name, &mut entry)?;
        }
        Ok(())
    }

    fn scan_entry(&self, walk: &mut Walk<'_>, name: &str, entry: &mut impl Read) -> Result<()> {
        trace!("{}: {}", walk.filename.unwrap_or("<container>"), name);

        if name == DESCRIPTOR_ENTRY {
            let text = read_text(entry, name)?;
            match Descriptor::parse(&text) {
                Ok(descriptor) => descriptor.apply(&mut walk.ctx),
                Err(e) if e.is_recoverable() => debug!("Ignoring unreadable {}: {}", name, e),
                Err(e) => return Err(e),
            }
        } else if name == MANIFEST_ENTRY {
            manifest::apply(&mut walk.ctx, &read_text(entry, name)?);
        } else if name.ends_with(CLASS_EXTENSION) {
            let bytes = read_bytes(entry, name)?;
            match scan_class(&bytes, &mut walk.ctx, self.config.version_heuristics) {
                Ok(()) => {}
                Err(e) if e.is_recoverable() => debug!("Skipping class {}: {}", name, e),
                Err(e) => return Err(e),
            }
        } else if NESTED_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
            if walk.depth >= self.config.max_depth {
                warn!(
                    "Not descending into {}: nesting limit {} reached",
                    name, self.config.max_depth
                );
                return Ok(());
            }
            let bytes = read_bytes(entry, name)?;
            let nested_name = name.rsplit('/').next().unwrap_or(name);
            // A broken nested container only costs its own record
            match self.analyze_container(Cursor::new(bytes), Some(nested_name), walk.depth + 1) {
                Ok(metadata) if metadata.valid => walk.nested.push(metadata),
                Ok(_) => {}
                Err(e) => debug!("Skipping nested container {}: {}", name, e),
            }
        }
        Ok(())
    }
}

/// State of one container walk
struct Walk<'a> {
    ctx: ScanContext,
    nested: Vec<ModMetadata>,
    filename: Option<&'a str>,
    depth: usize,
}

/// Picks the record to stand in for a container that declared nothing itself.
///
/// A single valid nested record is adopted as-is. Two records for the same
/// identifier, one client-only and one server-only, are the two halves of one
/// mod and merge into a universal record.
pub fn merge_nested(mut records: Vec<ModMetadata>) -> Option<ModMetadata> {
    match records.len() {
        1 => records.pop(),
        2 => {
            let (a, b) = (&records[0], &records[1]);
            let same_mod = a.modid.is_some() && a.modid == b.modid;
            let split = matches!(
                (a.side, b.side),
                (Some(Side::Client), Some(Side::Server)) | (Some(Side::Server), Some(Side::Client))
            );
            if same_mod && split {
                let mut merged = records.swap_remove(0);
                merged.side = Some(Side::Universal);
                Some(merged)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Hex blake3 digest of a file's contents
pub fn digest_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| Error::file_read(path, e))?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher).map_err(|e| Error::file_read(path, e))?;
    Ok(hasher.finalize().to_hex().to_string())
}

fn read_bytes(entry: &mut impl Read, name: &str) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| Error::entry_read(name, e))?;
    Ok(bytes)
}

fn read_text(entry: &mut impl Read, name: &str) -> Result<String> {
    let bytes = read_bytes(entry, name)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
