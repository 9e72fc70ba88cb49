//! Object descriptors - declarative intent for named GPU objects
//!
//! A descriptor declares a GPU object before it exists. Descriptors are
//! consumed exactly once, at object-creation time, and then owned by the
//! created object.

use bitflags::bitflags;

/// Memory residency hint for a buffer
///
/// Advisory only: the backend may still place a `Sysram` buffer in device
/// memory, but `Sysram` additionally guarantees that a CPU-writable
/// mapping must succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryStorage {
    /// Prefer system memory; CPU-writable mapping is guaranteed
    Sysram,
    /// Prefer device-local memory
    Vram,
}

bitflags! {
    /// Buffer usage pattern
    ///
    /// Exactly one of `STREAMING` or `PERSISTENT` must be set; a buffer
    /// created with neither (or both) fails construction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufferUsage: u32 {
        /// Whole slice rewritten every cycle, directly CPU-mapped
        const STREAMING = 1 << 0;
        /// Large, infrequently updated, written through a staging ring
        const PERSISTENT = 1 << 1;
    }
}

/// Descriptor for creating a named buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Stable name; its hash is the buffer's identity
    pub name: String,
    /// Requested byte size (per slice for streaming buffers, total for
    /// persistent buffers)
    pub size: u64,
    /// Memory residency hint
    pub storage: MemoryStorage,
    /// Usage pattern
    pub usage: BufferUsage,
}

/// Descriptor for any named GPU object
///
/// Tagged variant over the supported resource kinds. Buffers are the only
/// kind today; the registry dispatches on the tag at creation time.
#[derive(Debug, Clone)]
pub enum ObjectDesc {
    /// A GPU buffer
    Buffer(BufferDesc),
}

impl ObjectDesc {
    /// Name of the object this descriptor declares
    pub fn name(&self) -> &str {
        match self {
            ObjectDesc::Buffer(desc) => &desc.name,
        }
    }
}
