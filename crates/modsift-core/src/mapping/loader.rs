//! Deriving mapping tables from legacy mapping archives, and the on-disk cache.
//!
//! ## Archive Layouts
//!
//! Tried in order; the first layout whose entries all exist wins:
//!
//! 1. `conf/joined.srg`: one table, lines tagged `#C` (client-only) or
//!    `#S` (server-only)
//! 2. `conf/client.srg` + `conf/server.srg`: one table per side
//! 3. `conf/fields.csv` + `conf/methods.csv`: tabular, side in column 9
//!
//! Older archives were built on Windows, so each path is also tried with
//! backslash separators.

use super::key::SymbolKey;
use super::MappingTable;
use crate::error::{Error, Result};
use std::fs;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::Path;
use tracing::{debug, trace};
use zip::result::ZipError;
use zip::ZipArchive;

const JOINED_SRG: &str = "conf/joined.srg";
const CLIENT_SRG: &str = "conf/client.srg";
const SERVER_SRG: &str = "conf/server.srg";
const FIELDS_CSV: &str = "conf/fields.csv";
const METHODS_CSV: &str = "conf/methods.csv";

const CLIENT_ONLY_MARKER: &str = "#C";
const SERVER_ONLY_MARKER: &str = "#S";

/// Client and server tables derived from one archive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SidedTables {
    pub(crate) client: MappingTable,
    pub(crate) server: MappingTable,
}

/// Reads and parses a mapping archive in whichever layout it uses
pub(crate) fn load_archive(path: &Path) -> Result<SidedTables> {
    let file = fs::File::open(path).map_err(|e| Error::file_read(path, e))?;
    let mut archive = ZipArchive::new(std::io::BufReader::new(file))?;

    if let Some(joined) = read_entry(&mut archive, JOINED_SRG)? {
        debug!("{}: joined SRG layout", path.display());
        return Ok(parse_joined_srg(&joined));
    }

    let client = read_entry(&mut archive, CLIENT_SRG)?;
    let server = read_entry(&mut archive, SERVER_SRG)?;
    if let (Some(client), Some(server)) = (client, server) {
        debug!("{}: split SRG layout", path.display());
        return Ok(SidedTables {
            client: parse_srg(&client),
            server: parse_srg(&server),
        });
    }

    let fields = read_entry(&mut archive, FIELDS_CSV)?;
    let methods = read_entry(&mut archive, METHODS_CSV)?;
    if let (Some(fields), Some(methods)) = (fields, methods) {
        debug!("{}: CSV layout", path.display());
        return Ok(parse_csv(&fields, &methods));
    }

    Err(Error::unknown_mapping_layout(path))
}

/// Reads an entry as text, trying both separator styles
fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    for candidate in [name.to_string(), name.replace('/', "\\")] {
        match archive.by_name(&candidate) {
            Ok(mut entry) => {
                let mut bytes = Vec::new();
                entry
                    .read_to_end(&mut bytes)
                    .map_err(|e| Error::entry_read(candidate.as_str(), e))?;
                return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()));
            }
            Err(ZipError::FileNotFound) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(None)
}

/// Adds the keys of one `FD:`/`MD:` line, both obfuscated and named halves
fn add_srg_line(line: &str, table: &mut MappingTable) {
    let parts: Vec<&str> = line.split(' ').collect();
    if line.starts_with("FD:") && parts.len() >= 3 {
        table.insert(SymbolKey::field(parts[1]));
        table.insert(SymbolKey::field(parts[2]));
    } else if line.starts_with("MD:") && parts.len() >= 5 {
        table.insert(SymbolKey::method(parts[1], parts[2]));
        table.insert(SymbolKey::method(parts[3], parts[4]));
    }
}

pub(crate) fn parse_joined_srg(text: &str) -> SidedTables {
    let mut tables = SidedTables::default();
    for line in text.lines() {
        if !line.ends_with(SERVER_ONLY_MARKER) {
            add_srg_line(line, &mut tables.client);
        }
        if !line.ends_with(CLIENT_ONLY_MARKER) {
            add_srg_line(line, &mut tables.server);
        }
    }
    tables
}

pub(crate) fn parse_srg(text: &str) -> MappingTable {
    let mut table = MappingTable::new();
    for line in text.lines() {
        add_srg_line(line, &mut table);
    }
    table
}

/// Splits a CSV row, dropping quotes and trailing empty columns
fn split_csv(line: &str) -> Vec<String> {
    let mut columns: Vec<String> = line.split(',').map(|c| c.replace('"', "")).collect();
    while columns.last().map_or(false, |c| c.is_empty()) {
        columns.pop();
    }
    columns
}

pub(crate) fn parse_csv(fields: &str, methods: &str) -> SidedTables {
    let mut tables = SidedTables::default();

    for line in fields.lines().skip(1) {
        let cols = split_csv(line);
        if cols.len() == 9 {
            let target = if cols[8] == "1" {
                &mut tables.server
            } else {
                &mut tables.client
            };
            target.insert(SymbolKey::field(&format!("{}/{}", cols[6], cols[2])));
        }
    }

    for line in methods.lines().skip(1) {
        let cols = split_csv(line);
        if cols.len() == 9 {
            let target = if cols[8] == "1" {
                &mut tables.server
            } else {
                &mut tables.client
            };
            target.insert(SymbolKey::method(&format!("{}/{}", cols[6], cols[2]), &cols[4]));
        }
    }

    tables
}

/// Reads a cache file, one key per line
pub(crate) fn read_cache(path: &Path) -> Result<MappingTable> {
    let text = fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
    Ok(text
        .lines()
        .filter(|line| !line.is_empty())
        .map(SymbolKey::from_raw)
        .collect())
}

/// Writes a cache file, keys sorted so regenerated files diff cleanly
pub(crate) fn write_cache(path: &Path, table: &MappingTable) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::directory_create(parent, e))?;
    }

    let mut keys: Vec<&SymbolKey> = table.iter().collect();
    keys.sort();

    let file = fs::File::create(path).map_err(|e| Error::file_write(path, e))?;
    let mut writer = BufWriter::new(file);
    for key in keys {
        writeln!(writer, "{}", key).map_err(|e| Error::file_write(path, e))?;
    }
    writer.flush().map_err(|e| Error::file_write(path, e))?;

    trace!("Wrote {} keys to {}", table.len(), path.display());
    Ok(())
}
