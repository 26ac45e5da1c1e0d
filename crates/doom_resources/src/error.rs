//! Error types that can be emitted from this library

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// Transparent wrapper for [`walkdir::Error`]
    #[error(transparent)]
    WalkDirError(#[from] walkdir::Error),

    /// index file could not be parsed
    #[error("index is corrupt: {0}")]
    #[diagnostic(help("is this a DOOM .index/.pindex file?"))]
    CorruptIndex(String),

    /// a single entry record could not be parsed
    #[error("malformed entry: {0}")]
    MalformedEntry(String),

    /// data file for a referenced patch level is not present
    #[error("data file for patch level {level} is missing: {}", .path.display())]
    MissingPhysicalFile {
        /// The patch level that was requested
        level: u8,
        /// Where the data file was expected
        path: PathBuf,
    },

    /// unable to find an entry
    #[error("unable to find entry {0}")]
    EntryNotFound(String),

    /// two override files resolve to the same entry
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// a line of the id manifest could not be parsed
    #[error("invalid id manifest line {line}: {reason}")]
    InvalidIdManifest {
        /// 1-based line number
        line: usize,
        /// What was wrong with it
        reason: String,
    },

    /// refusing to write into a directory that already has files
    #[error("destination {} is not empty", .0.display())]
    #[diagnostic(help("pass --force to write into it anyway"))]
    DestinationNotEmpty(PathBuf),

    /// {0}
    #[error("{0}")]
    CustomError(String),
}

/// Two loose files that resolve to the same entry name when compared case-insensitively
///
/// Conflicts are not fatal, the file discovered last wins.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
#[error("{name} is provided by both {} and {}", .first.display(), .second.display())]
pub struct ConflictError {
    /// The entry name both files resolve to
    pub name: String,
    /// The file that was replaced
    pub first: PathBuf,
    /// The file that is used
    pub second: PathBuf,
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
