//! Error types for the mvccdb engine.
//!
//! This module defines the unified error type returned by every public
//! operation in §6 of the specification, plus the one internal error that
//! is never expected to surface in normal operation (see [`Error::Corruption`]).

use thiserror::Error;

/// Result type alias for mvccdb operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the mvccdb engine.
///
/// Five kinds cover the entire public surface; see §7 of the specification
/// for the rationale behind each.
#[derive(Debug, Error)]
pub enum Error {
    /// Allocation failed on some path. The caller may retry later; any
    /// transaction touched by the failed allocation is left in a consistent
    /// state and the caller is responsible for disposing of it.
    #[error("out of memory")]
    OutOfMemory,

    /// The requested key is absent, or resolved to a tombstone.
    #[error("key not found")]
    NotFound,

    /// Commit lost the optimistic write-write race. The transaction has
    /// already been fully cleaned up by the time the caller observes this;
    /// a fresh transaction may be allocated and the operation replayed.
    #[error("transaction conflict, retry with a new transaction")]
    ConflictRetry,

    /// A committed-chain read found no version visible to any snapshot for a
    /// key present in the index. Under the commit ordering of §4.3 this
    /// cannot happen; reaching it means an invariant has been violated
    /// elsewhere, so it is treated as fatal rather than recoverable.
    #[error("invariant violation: key present in index but no visible committed version")]
    Corruption,

    /// A key or value exceeded the 16-bit length ceiling from §6.
    #[error("byte string too large: {len} bytes exceeds the {max} limit")]
    TooLarge {
        /// The length the caller attempted to store.
        len: usize,
        /// The maximum permitted length (`u16::MAX`).
        max: usize,
    },
}

impl Error {
    /// True if the commit should simply be retried with a fresh transaction.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::ConflictRetry)
    }

    /// True if the key was simply absent, rather than a failure of the engine.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }

    /// True if this represents a violated internal invariant rather than an
    /// ordinary, expected outcome.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption)
    }
}
