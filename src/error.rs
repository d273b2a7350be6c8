//! Error taxonomy shared by every fallible operation in the crate.
//!
//! Each operation reports failure directly through its return value; there
//! is no process-wide error slot to poll afterwards, so errors compose
//! across independent stores without any synchronization.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Failure kinds reported by the table, the store and the snapshot codec.
///
/// `Memory` and `KeyNotFound` are expected, recoverable outcomes; the
/// operation that reported them leaves the table exactly as it was.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An allocation could not be satisfied. Prior state is intact.
    #[error("memory allocation failed")]
    Memory,

    /// Lookup or delete on a key that is not present.
    #[error("key not found")]
    KeyNotFound,

    /// Caller programming error, e.g. storing the reserved tombstone key.
    #[error("invalid parameter")]
    InvalidParam,

    /// The underlying file could not be opened, read or written.
    #[error("file I/O error: {0}")]
    FileIo(#[from] std::io::Error),

    /// A snapshot failed validation before or while decoding.
    #[error("data corruption detected: {0}")]
    Corruption(&'static str),

    /// Unexpected internal state. Should not be observable.
    #[error("unknown error")]
    Unknown,
}
