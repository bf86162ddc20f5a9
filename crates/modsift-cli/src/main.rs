//! modsift - Recover identity metadata from Minecraft mod archives
//!
//! This tool analyzes mod jars (or directories of them), works out each mod's
//! identifier, version, side and dependencies, and prints the result as JSON.

use anyhow::{bail, Context, Result};
use clap::Parser;
use modsift_core::mapping::DEFAULT_MAPPING_DIR;
use modsift_core::{AnalyzerConfig, GroupBy, MappingStore, ModAnalyzer, ModIndex, ModMetadata};
use std::collections::HashSet;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Local file header signature every zip/jar starts with
const ZIP_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];

/// Recover identity metadata from Minecraft mod archives
#[derive(Parser, Debug)]
#[command(name = "modsift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Input files and directories
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Include a blake3 digest of each file
    #[arg(short = 'H', long)]
    hash: bool,

    /// Index by mod ID, listing every version
    #[arg(short = 'I', long, conflicts_with = "sort_filename")]
    sort_id: bool,

    /// Index by file name (implies --filename)
    #[arg(short = 'F', long)]
    sort_filename: bool,

    /// Store each mod's file name
    #[arg(short = 'f', long)]
    filename: bool,

    /// List mods with unknown IDs and versions
    #[arg(short = 'U', long)]
    unknown: bool,

    /// Directory holding MCP mapping archives
    #[arg(short, long, env = "MODSIFT_MAPPINGS")]
    mappings: Option<PathBuf>,

    /// Directory for mapping cache files (defaults to the mappings directory)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Do not infer Minecraft versions from code references
    #[arg(long)]
    no_heuristics: bool,

    /// Maximum nesting depth of jars within jars
    #[arg(long, default_value_t = modsift_core::analyzer::DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn group_by(&self) -> GroupBy {
        if self.sort_filename {
            GroupBy::Filename
        } else if self.sort_id {
            GroupBy::IdList
        } else {
            GroupBy::Id
        }
    }

    fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig::new()
            .version_heuristics(!self.no_heuristics)
            .generate_hash(self.hash)
            .store_filenames(self.filename || self.sort_filename)
            .max_depth(self.max_depth)
    }

    fn mapping_store(&self) -> Result<MappingStore> {
        let archive_dir = match &self.mappings {
            Some(dir) => {
                if !dir.is_dir() {
                    bail!("Not a directory: {}", dir.display());
                }
                dir.clone()
            }
            None => PathBuf::from(DEFAULT_MAPPING_DIR),
        };

        let mut store = MappingStore::new(archive_dir);
        if let Some(cache_dir) = &self.cache_dir {
            store = store.with_cache_dir(cache_dir);
        }
        Ok(store)
    }
}

/// Files to analyze, after expanding directories
#[derive(Debug, Default)]
struct Inputs {
    files: Vec<PathBuf>,
    saw_directory: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let store = Arc::new(cli.mapping_store()?);
    debug!(
        "Mappings from {}, cache in {}",
        store.archive_dir().display(),
        store.cache_dir().display()
    );
    let analyzer = ModAnalyzer::with_config(store, cli.analyzer_config());

    let inputs = collect_inputs(&cli.paths);
    info!("Analyzing {} file(s)", inputs.files.len());

    let records: Vec<ModMetadata> = inputs
        .files
        .iter()
        .filter_map(|path| {
            info!("[*] {}", path.display());
            analyzer.analyze_path(path)
        })
        .collect();

    if records.is_empty() {
        error!("No mods found!");
        return Ok(());
    }

    let output = if !inputs.saw_directory && cli.paths.len() == 1 && records.len() == 1 {
        serde_json::to_string_pretty(&records[0])
    } else {
        let mut index = ModIndex::new(cli.group_by()).include_unknown(cli.unknown);
        index.extend(records);
        if index.is_empty() {
            warn!("No mod could be identified; use --unknown to list them anyway");
        }
        serde_json::to_string_pretty(&index)
    }
    .context("Failed to serialize output")?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", output).context("Failed to write output")?;
    Ok(())
}

/// Expands directories recursively and drops duplicate files
fn collect_inputs(paths: &[PathBuf]) -> Inputs {
    let mut inputs = Inputs::default();
    let mut seen = HashSet::new();
    let mut push = |path: &Path, files: &mut Vec<PathBuf>| {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if seen.insert(key) {
            files.push(path.to_path_buf());
        }
    };

    for path in paths {
        if path.is_dir() {
            inputs.saw_directory = true;
            for entry in WalkDir::new(path)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();

                // Skip directories
                if !path.is_file() {
                    continue;
                }

                // Skip hidden files
                if path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with('.'))
                    .unwrap_or(false)
                {
                    continue;
                }

                if !is_likely_container(path) {
                    trace!("Skipping non-archive: {}", path.display());
                    continue;
                }

                push(path, &mut inputs.files);
            }
        } else if path.is_file() {
            push(path, &mut inputs.files);
        } else {
            warn!("Input does not exist: {}", path.display());
        }
    }

    inputs
}

/// Checks for the zip signature, which jars share
fn is_likely_container(path: &Path) -> bool {
    let Ok(mut file) = fs::File::open(path) else {
        return false;
    };
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic).is_ok() && magic == ZIP_MAGIC
}
