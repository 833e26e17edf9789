//! Index storage errors

use std::io;

use thiserror::Error;

pub type IndexResult<T> = Result<T, IndexError>;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Index I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Index serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Journal line whose checksum does not match its payload
    #[error("Index journal corrupted at line {line}: checksum {actual:08x}, expected {expected:08x}")]
    ChecksumMismatch { line: usize, expected: u32, actual: u32 },

    /// Journal line that cannot be decoded
    #[error("Index journal corrupted at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("Invalid LIKE pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Index storage is closed")]
    Closed,

    /// A failed append could not be rolled back; the journal tail is unknown
    #[error("Index journal at {0} is unusable after a failed append")]
    JournalFailed(String),

    #[error("Index storage lock poisoned")]
    Poisoned,
}

impl IndexError {
    pub fn code(&self) -> &'static str {
        match self {
            IndexError::Io(_) => "INDEX_IO_ERROR",
            IndexError::Serialization(_) => "INDEX_SERIALIZATION_ERROR",
            IndexError::ChecksumMismatch { .. } | IndexError::MalformedRecord { .. } => {
                "INDEX_JOURNAL_CORRUPTED"
            }
            IndexError::InvalidPattern { .. } => "INDEX_INVALID_PATTERN",
            IndexError::Closed => "INDEX_CLOSED",
            IndexError::JournalFailed(_) => "INDEX_JOURNAL_FAILED",
            IndexError::Poisoned => "INDEX_POISONED",
        }
    }

    /// Corruption is fatal for `open()`
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            IndexError::ChecksumMismatch { .. } | IndexError::MalformedRecord { .. }
        )
    }
}
