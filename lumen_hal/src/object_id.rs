//! Object identifiers - deterministic name hashing
//!
//! Commands never hold references to GPU resources. They store an
//! [`ObjectId`], the deterministic hash of the resource's name, and the
//! backend resolves it through its registry at execution time.

use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

/// Opaque identifier for a named GPU object
///
/// Two identifiers are equal iff the source names are equal. Distinct
/// names that happen to hash to the same value silently alias the same
/// registry slot; this collision risk is accepted and not handled.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Compute the identifier for a resource name
    ///
    /// The hash is deterministic: the same name always produces the same
    /// identifier, within a process and across processes.
    pub fn from_name(name: &str) -> Self {
        let mut hasher = FxHasher::default();
        name.hash(&mut hasher);
        ObjectId(hasher.finish())
    }

    /// Raw hash value
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({:#018x})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
#[path = "object_id_tests.rs"]
mod tests;
