//! Error types shared by every stage of a fortune lookup.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Broad class of a [`FortuneError`], used by callers that only care about
/// what went wrong at a coarse level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Filesystem,
    Format,
    EmptySource,
    /// Nothing is installed; reported to the user but not a failure.
    NoSource,
}

#[derive(Debug, Error)]
pub enum FortuneError {
    #[error("Empty fortune path list")]
    EmptyInput,

    #[error("Error reading fortune directory {}: {source}", dir.display())]
    DirectoryUnreadable {
        dir: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("No fortune .dat files found in {}", dir.display())]
    NoIndexFiles { dir: PathBuf },

    #[error("Error opening fortune dat file {}: {source}", path.display())]
    IndexOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error reading fortune dat header from {}: file is truncated", path.display())]
    IndexTruncated { path: PathBuf },

    #[error("Unsupported .dat header version {version} in {}", path.display())]
    UnsupportedVersion { path: PathBuf, version: u32 },

    #[error("Fortune dat file {} holds no fortunes", path.display())]
    EmptyIndex { path: PathBuf },

    #[error("Corrupt fortune dat file {}: {reason}", path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("Error opening fortune file {}: {source}", path.display())]
    SourceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error seeking to offset {offset} in {}: {source}", path.display())]
    Seek {
        path: PathBuf,
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("Error reading fortune from {}: expected {expected} bytes", path.display())]
    ShortRead { path: PathBuf, expected: u64 },

    #[error("Error reading fortune from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error reading fortune from {} at offset {offset}: delimiter not found", path.display())]
    DelimiterNotFound { path: PathBuf, offset: u64 },

    #[error("No fortunes found")]
    NoFortuneSourceAvailable,
}

impl FortuneError {
    pub fn kind(&self) -> ErrorKind {
        use FortuneError::*;
        match self {
            EmptyInput => ErrorKind::Input,
            DirectoryUnreadable { .. }
            | IndexOpen { .. }
            | SourceOpen { .. }
            | Seek { .. }
            | ShortRead { .. }
            | Read { .. } => ErrorKind::Filesystem,
            IndexTruncated { .. }
            | UnsupportedVersion { .. }
            | CorruptIndex { .. }
            | DelimiterNotFound { .. } => ErrorKind::Format,
            EmptyIndex { .. } | NoIndexFiles { .. } => ErrorKind::EmptySource,
            NoFortuneSourceAvailable => ErrorKind::NoSource,
        }
    }
}

pub type Result<T> = std::result::Result<T, FortuneError>;
