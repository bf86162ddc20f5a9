//! Error types for the modsift-core library.
//!
//! This module provides error handling using the `thiserror` crate, with
//! variants for the different failure modes of container, class-file and
//! mapping-table processing.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for modsift operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all modsift operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to open or read an input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a mapping cache file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to create the mapping cache directory
    #[error("failed to create directory '{path}': {source}")]
    DirectoryCreate {
        /// Path to the directory that failed to create
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while consuming an archive entry
    #[error("failed to read archive entry '{entry}': {source}")]
    EntryRead {
        /// Name of the entry inside the archive
        entry: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The container is not a readable zip archive
    #[error("invalid container: {0}")]
    Container(#[from] zip::result::ZipError),

    /// Malformed class file
    #[error("invalid class file at offset {offset}: {details}")]
    ClassFormat {
        /// Byte offset where the error occurred
        offset: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// Legacy descriptor that matches neither known layout
    #[error("failed to decode mod descriptor: {0}")]
    Descriptor(#[from] serde_json::Error),

    /// Mapping archive found, but in none of the supported layouts
    #[error("mapping archive '{path}' uses an unknown layout")]
    UnknownMappingLayout {
        /// Path to the mapping archive
        path: PathBuf,
    },
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new directory creation error
    pub fn directory_create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            source,
        }
    }

    /// Creates a new archive entry read error
    pub fn entry_read(entry: impl Into<String>, source: std::io::Error) -> Self {
        Self::EntryRead {
            entry: entry.into(),
            source,
        }
    }

    /// Creates a new class format error
    pub fn class_format(offset: usize, details: impl Into<String>) -> Self {
        Self::ClassFormat {
            offset,
            details: details.into(),
        }
    }

    /// Creates a new unknown mapping layout error
    pub fn unknown_mapping_layout(path: impl Into<PathBuf>) -> Self {
        Self::UnknownMappingLayout { path: path.into() }
    }

    /// Returns true if this error is scoped to a single entry and should be skipped
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ClassFormat { .. } | Self::Descriptor(_) | Self::UnknownMappingLayout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::class_format(12, "bad magic");
        assert!(err.to_string().contains("offset 12"));
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::class_format(0, "test").is_recoverable());
        assert!(Error::unknown_mapping_layout("/tmp/mcp.zip").is_recoverable());
        assert!(!Error::file_read("/tmp/a.jar", std::io::ErrorKind::NotFound.into()).is_recoverable());
    }
}
