//! Error types for the Lumen HAL
//!
//! Every operation on the command/registry surface returns the same
//! `Result` type. Success is `Ok(())`; every other status of the HAL
//! contract is a variant of [`Error`].

use std::fmt;

use crate::object_id::ObjectId;

/// Result type for Lumen HAL operations
pub type Result<T> = std::result::Result<T, Error>;

/// Lumen HAL errors
///
/// One variant per non-success status of the HAL contract. `NothingToDo`
/// is a soft status rather than a failure: it reports that an operation
/// completed vacuously (e.g. executing an empty command list).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The backend cannot express the requested operation
    Unsupported(String),

    /// The operation is part of the contract but not implemented by this backend
    Unimplemented(&'static str),

    /// The operation had no work to perform
    NothingToDo,

    /// A singleton (backend, pipeline) was initialized twice
    AlreadyInitialized,

    /// The pipeline has no backend attached
    NotInitialized,

    /// A command referenced a source object that is not registered
    UnknownSource(ObjectId),

    /// A required argument was absent (empty name, empty descriptor batch)
    UnexpectedNull(&'static str),

    /// A byte range exceeds the addressable size of its target
    RangeOverflow {
        /// Requested start offset
        offset: u64,
        /// Requested length in bytes
        bytes: u64,
        /// Addressable size of the target region
        capacity: u64,
    },

    /// A bounded wait expired before the GPU signalled
    Timeout,

    /// An object with this name is already registered
    DuplicateName(String),

    /// No object with this name is registered
    UnknownName(String),

    /// Allocation or driver failure reported by the backend
    BackendFailure(String),

    /// A source object exists but is in an unusable state
    BrokenSource(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Unsupported(msg) => write!(f, "Unsupported operation: {}", msg),
            Error::Unimplemented(what) => write!(f, "Not implemented: {}", what),
            Error::NothingToDo => write!(f, "Nothing to do"),
            Error::AlreadyInitialized => write!(f, "Already initialized"),
            Error::NotInitialized => write!(f, "Not initialized"),
            Error::UnknownSource(id) => write!(f, "Unknown source object: {}", id),
            Error::UnexpectedNull(what) => write!(f, "Unexpected null argument: {}", what),
            Error::RangeOverflow { offset, bytes, capacity } => write!(
                f,
                "Range overflow: offset {} + {} bytes exceeds capacity {}",
                offset, bytes, capacity
            ),
            Error::Timeout => write!(f, "Timed out waiting for the GPU"),
            Error::DuplicateName(name) => write!(f, "Duplicate object name: '{}'", name),
            Error::UnknownName(name) => write!(f, "Unknown object name: '{}'", name),
            Error::BackendFailure(msg) => write!(f, "Backend failure: {}", msg),
            Error::BrokenSource(msg) => write!(f, "Broken source object: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
