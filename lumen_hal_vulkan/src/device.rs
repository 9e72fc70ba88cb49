//! GpuDevice - the raw device seam underneath the buffer subsystem
//!
//! Everything above this trait (ring slicing, staging growth, fence
//! rotation, the object registry) is device-independent and unit-testable;
//! everything below it touches the driver. Exactly one production
//! implementation exists (`VulkanDevice`); tests substitute `MockDevice`.

use std::time::Duration;

use lumen_hal::backend::BindTarget;
use lumen_hal::command::{ColorBlendState, StencilState};
use lumen_hal::descriptor::MemoryStorage;
use lumen_hal::error::Result;

/// Raw GPU device operations
///
/// Handles are opaque to the caller; the device owns their lifetime rules
/// but the caller drives them explicitly (`destroy_buffer`,
/// `release_fence`). No operation on this trait blocks except the fence
/// waits.
pub trait GpuDevice {
    /// Opaque buffer handle
    type Buffer;
    /// Opaque fence handle
    type Fence;

    // ===== BUFFERS =====

    /// Create a buffer of `size` bytes
    ///
    /// # Arguments
    ///
    /// * `name` - Debug name attached to the allocation
    /// * `size` - Byte size
    /// * `storage` - Residency hint; `Sysram` guarantees a mapping
    /// * `mapped` - Require a CPU-writable mapping
    fn create_buffer(
        &mut self,
        name: &str,
        size: u64,
        storage: MemoryStorage,
        mapped: bool,
    ) -> Result<Self::Buffer>;

    /// Destroy a buffer and free its memory
    fn destroy_buffer(&mut self, buffer: Self::Buffer);

    /// Write bytes through a buffer's CPU mapping
    ///
    /// Fails with `BackendFailure` if the buffer carries no mapping. The
    /// caller has already range-checked `offset + data.len()`.
    fn write_buffer(&mut self, buffer: &Self::Buffer, offset: u64, data: &[u8]) -> Result<()>;

    /// Record a buffer-to-buffer copy into the current GPU work stream
    fn copy_buffer(
        &mut self,
        src: &Self::Buffer,
        src_offset: u64,
        dst: &Self::Buffer,
        dst_offset: u64,
        bytes: u64,
    ) -> Result<()>;

    // ===== FENCES =====

    /// Submit all work recorded so far and return a fence that signals
    /// when the GPU has retired it
    fn place_fence(&mut self) -> Result<Self::Fence>;

    /// Block until a fence signals (unbounded)
    fn wait_fence(&mut self, fence: &Self::Fence) -> Result<()>;

    /// Block until a fence signals or the timeout expires
    ///
    /// Returns `Ok(true)` when signalled, `Ok(false)` on expiry.
    fn wait_fence_timeout(&mut self, fence: &Self::Fence, timeout: Duration) -> Result<bool>;

    /// Query a fence without waiting
    fn fence_status(&mut self, fence: &Self::Fence) -> Result<bool>;

    /// Release a fence handle
    fn release_fence(&mut self, fence: Self::Fence);

    // ===== DRAW STREAM =====

    /// Bind a buffer range for subsequent draws
    fn bind_buffer(
        &mut self,
        target: BindTarget,
        slot: u32,
        buffer: &Self::Buffer,
        offset: u64,
        bytes: u64,
    ) -> Result<()>;

    /// Record a non-indexed draw
    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()>;

    /// Record an indexed draw
    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32)
        -> Result<()>;

    /// Record an indirect draw reading parameters from the bound indirect buffer
    fn draw_indirect(
        &mut self,
        buffer: &Self::Buffer,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> Result<()>;

    /// Record an indexed indirect draw
    fn draw_indexed_indirect(
        &mut self,
        buffer: &Self::Buffer,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> Result<()>;

    // ===== PIPELINE STATE =====

    /// Set the color blending state for subsequent draws
    fn set_blending(&mut self, state: &ColorBlendState) -> Result<()>;

    /// Set the stencil testing state for subsequent draws
    fn set_stencil(&mut self, state: &StencilState) -> Result<()>;
}
