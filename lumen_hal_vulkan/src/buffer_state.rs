//! BufferState - per-buffer runtime state and CPU/GPU synchronization
//!
//! Owns the main GPU allocation, the optional staging allocation, and the
//! triple-buffered ring of slices that lets the CPU write one slice while
//! the GPU reads another.
//!
//! Streaming buffers ring over the main allocation itself: the CPU writes
//! the active slice through a persistent mapping, no GPU copy involved.
//! Persistent buffers keep a single flat main allocation and ring over a
//! smaller staging allocation instead: uploads land in the active staging
//! slice at an advancing cursor and are promoted into the main allocation
//! by a GPU-side copy. The staging ring grows by amortized doubling and
//! never shrinks.
//!
//! `sync()` rotates the ring once per logical cycle. The wait inside it
//! is unbounded: if the GPU falls a full rotation behind, the caller
//! stalls until the slice it is about to reuse has been retired. That
//! stall is the backpressure contract of the whole subsystem.

use lumen_hal::backend::BindTarget;
use lumen_hal::descriptor::{BufferDesc, BufferUsage, MemoryStorage};
use lumen_hal::error::{Error, Result};
use lumen_hal::hal_trace;

use crate::device::GpuDevice;

/// Ring depth: one slice written by the CPU, one in flight, one retiring
pub const SLICE_COUNT: usize = 3;

/// Staging slice size a persistent buffer starts with, before any growth
const INITIAL_STAGING_SLICE: u64 = 64 * 1024;

/// One ring entry: a byte offset into the ringed allocation and the fence
/// guarding the GPU's last read of it
struct Slice<F> {
    offset: u64,
    fence: Option<F>,
}

/// Runtime state of one named GPU buffer
pub struct BufferState<D: GpuDevice> {
    /// Buffer name (kept for debug names on reallocation)
    name: String,
    /// Usable byte size: one slice for streaming, the whole main
    /// allocation for persistent
    size: u64,
    /// Usage kind, validated at construction
    usage: BufferUsage,
    /// Main allocation (size x SLICE_COUNT for streaming, flat otherwise)
    main: Option<D::Buffer>,
    /// Staging ring, persistent buffers only
    staging: Option<D::Buffer>,
    /// Ring slices over main (streaming) or staging (persistent)
    slices: [Slice<D::Fence>; SLICE_COUNT],
    /// Index of the slice the CPU currently writes
    active: usize,
    /// Write offset within the active staging slice, reset every cycle
    staging_cursor: u64,
    /// Current staging slice capacity in bytes
    staging_slice_size: u64,
}

impl<D: GpuDevice> BufferState<D> {
    // ===== CONSTRUCTION / DESTRUCTION =====

    /// Create the runtime state for a buffer descriptor
    ///
    /// Allocates the main region immediately; persistent buffers also get
    /// their initial staging ring here so a constructed buffer is always
    /// valid. Frees everything already allocated if a later step fails.
    pub fn new(device: &mut D, desc: &BufferDesc) -> Result<Self> {
        let streaming = desc.usage.contains(BufferUsage::STREAMING);
        let persistent = desc.usage.contains(BufferUsage::PERSISTENT);
        if streaming == persistent {
            return Err(Error::BrokenSource(format!(
                "Buffer '{}' must be exactly one of streaming or persistent",
                desc.name
            )));
        }
        if desc.size == 0 {
            return Err(Error::BrokenSource(format!(
                "Buffer '{}' has zero size",
                desc.name
            )));
        }

        if streaming {
            // One mapped allocation holding all three slices back to back
            let main = device.create_buffer(
                &desc.name,
                desc.size * SLICE_COUNT as u64,
                desc.storage,
                true,
            )?;

            hal_trace!(
                "lumen::buffer",
                "Created streaming buffer '{}' ({} bytes x {})",
                desc.name,
                desc.size,
                SLICE_COUNT
            );

            return Ok(Self {
                name: desc.name.clone(),
                size: desc.size,
                usage: desc.usage,
                main: Some(main),
                staging: None,
                slices: std::array::from_fn(|i| Slice {
                    offset: i as u64 * desc.size,
                    fence: None,
                }),
                active: 0,
                staging_cursor: 0,
                staging_slice_size: 0,
            });
        }

        // Persistent: flat main allocation, unmapped, ringed staging
        let main = device.create_buffer(&desc.name, desc.size, desc.storage, false)?;
        let mut state = Self {
            name: desc.name.clone(),
            size: desc.size,
            usage: desc.usage,
            main: Some(main),
            staging: None,
            slices: std::array::from_fn(|_| Slice { offset: 0, fence: None }),
            active: 0,
            staging_cursor: 0,
            staging_slice_size: 0,
        };

        let initial_slice = desc.size.min(INITIAL_STAGING_SLICE);
        if let Err(err) = state.prepare_staging_buffer(device, initial_slice) {
            state.destroy(device);
            return Err(err);
        }

        hal_trace!(
            "lumen::buffer",
            "Created persistent buffer '{}' ({} bytes, staging slice {})",
            desc.name,
            desc.size,
            initial_slice
        );

        Ok(state)
    }

    /// Release every GPU resource this state owns
    ///
    /// Waits out outstanding slice fences first so nothing is freed while
    /// the GPU may still read it. Safe to call more than once.
    pub fn destroy(&mut self, device: &mut D) {
        for slice in &mut self.slices {
            if let Some(fence) = slice.fence.take() {
                device.wait_fence(&fence).ok();
                device.release_fence(fence);
            }
        }
        if let Some(staging) = self.staging.take() {
            device.destroy_buffer(staging);
        }
        if let Some(main) = self.main.take() {
            device.destroy_buffer(main);
        }
    }

    // ===== QUERIES =====

    /// True if every allocation this buffer's kind requires exists
    pub fn is_valid(&self) -> bool {
        let streaming = self.usage.contains(BufferUsage::STREAMING);
        let persistent = self.usage.contains(BufferUsage::PERSISTENT);
        if streaming == persistent {
            return false;
        }
        if self.main.is_none() {
            return false;
        }
        if persistent && self.staging.is_none() {
            return false;
        }
        true
    }

    /// Buffer name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Usable byte size for uploads and range-restricted binds
    pub fn usable_size(&self) -> u64 {
        self.size
    }

    fn main(&self) -> Result<&D::Buffer> {
        self.main
            .as_ref()
            .ok_or_else(|| Error::BrokenSource(format!("Buffer '{}' has no allocation", self.name)))
    }

    /// Raw device handle of the main allocation (indirect draw sources)
    pub(crate) fn device_buffer(&self) -> Result<&D::Buffer> {
        self.main()
    }

    fn is_streaming(&self) -> bool {
        self.usage.contains(BufferUsage::STREAMING)
    }

    // ===== BINDING =====

    /// Bind the whole main allocation
    pub fn bind_to(&self, device: &mut D, target: BindTarget) -> Result<()> {
        let total = if self.is_streaming() {
            self.size * SLICE_COUNT as u64
        } else {
            self.size
        };
        device.bind_buffer(target, 0, self.main()?, 0, total)
    }

    /// Bind the currently active slice
    ///
    /// For streaming buffers this exposes per-cycle data without a
    /// re-upload; persistent buffers are addressed flatly, so the whole
    /// main allocation is bound.
    pub fn bind_to_slot(&self, device: &mut D, target: BindTarget, slot: u32) -> Result<()> {
        self.bind_to_slot_range(device, target, slot, 0, self.size)
    }

    /// Bind a sub-range of the currently active slice
    ///
    /// Fails with `RangeOverflow` when `offset + bytes` exceeds the
    /// usable size.
    pub fn bind_to_slot_range(
        &self,
        device: &mut D,
        target: BindTarget,
        slot: u32,
        offset: u64,
        bytes: u64,
    ) -> Result<()> {
        self.check_range(offset, bytes)?;
        let base = if self.is_streaming() {
            self.slices[self.active].offset
        } else {
            0
        };
        device.bind_buffer(target, slot, self.main()?, base + offset, bytes)
    }

    // ===== UPLOAD =====

    /// Upload bytes at a destination offset
    ///
    /// Streaming: direct CPU write into the active slice of the mapped
    /// main allocation. Persistent: staged write promoted into the main
    /// allocation by a GPU copy. Range checks run before any write.
    ///
    /// # Arguments
    ///
    /// * `device` - Device the allocations live on
    /// * `address` - Destination byte offset (slice-relative for
    ///   streaming, allocation-relative for persistent)
    /// * `data` - Bytes to write
    pub fn upload(&mut self, device: &mut D, address: u64, data: &[u8]) -> Result<()> {
        self.check_range(address, data.len() as u64)?;
        if self.is_streaming() {
            let offset = self.slices[self.active].offset + address;
            device.write_buffer(self.main()?, offset, data)
        } else {
            self.upload_staged(device, address, data)
        }
    }

    /// Staged upload path for persistent buffers
    ///
    /// Reserves space at the staging cursor, growing the staging ring by
    /// doubling when the reservation does not fit. Growth failure leaves
    /// the cursor untouched so a smaller retry remains possible.
    fn upload_staged(&mut self, device: &mut D, address: u64, data: &[u8]) -> Result<()> {
        let bytes = data.len() as u64;

        let needed = self.staging_cursor + bytes;
        if self.staging.is_none() || needed > self.staging_slice_size {
            // Doubling the post-reservation cursor keeps growth amortized;
            // prepare_staging_buffer resets the cursor on success
            self.prepare_staging_buffer(device, needed * 2)?;
        }

        let reserved = self.slices[self.active].offset + self.staging_cursor;
        let staging = self
            .staging
            .as_ref()
            .ok_or_else(|| Error::BrokenSource(format!("Buffer '{}' has no staging", self.name)))?;
        device.write_buffer(staging, reserved, data)?;

        let main = self
            .main
            .as_ref()
            .ok_or_else(|| Error::BrokenSource(format!("Buffer '{}' has no allocation", self.name)))?;
        device.copy_buffer(staging, reserved, main, address, bytes)?;

        self.staging_cursor += bytes;
        Ok(())
    }

    /// Replace the staging ring with one of `slice_size` bytes per slice
    ///
    /// Retires every outstanding GPU read of the old ring before freeing
    /// it, then allocates the new mapped ring and recomputes the slice
    /// offsets. Allocation failure leaves the old ring and the cursor
    /// intact.
    fn prepare_staging_buffer(&mut self, device: &mut D, slice_size: u64) -> Result<()> {
        if self.staging.is_some() {
            // Flush recorded copies and wait them out; the old ring may
            // still be a copy source until then
            let fence = device.place_fence()?;
            let waited = device.wait_fence(&fence);
            device.release_fence(fence);
            waited?;

            for slice in &mut self.slices {
                if let Some(fence) = slice.fence.take() {
                    let waited = device.wait_fence(&fence);
                    device.release_fence(fence);
                    waited?;
                }
            }
        }

        let staging = device.create_buffer(
            &format!("{}_staging", self.name),
            slice_size * SLICE_COUNT as u64,
            MemoryStorage::Sysram,
            true,
        )?;
        if let Some(old) = self.staging.replace(staging) {
            device.destroy_buffer(old);
        }

        self.staging_slice_size = slice_size;
        for (i, slice) in self.slices.iter_mut().enumerate() {
            slice.offset = i as u64 * slice_size;
        }
        self.staging_cursor = 0;

        hal_trace!(
            "lumen::buffer",
            "Buffer '{}' staging ring now {} bytes per slice",
            self.name,
            slice_size
        );
        Ok(())
    }

    // ===== SYNCHRONIZATION =====

    /// Rotate the ring: hand the active slice to the GPU and claim the
    /// next one for the CPU
    ///
    /// Called once per logical cycle. Places a fence on the slice just
    /// written, advances the ring, resets the staging cursor, and blocks
    /// until the newly active slice's previous fence signals. The wait is
    /// unbounded; on a fresh buffer no wait happens until the ring wraps
    /// back to a slice that already carries a fence.
    pub fn sync(&mut self, device: &mut D) -> Result<()> {
        let fence = device.place_fence()?;
        if let Some(old) = self.slices[self.active].fence.replace(fence) {
            device.release_fence(old);
        }

        self.active = (self.active + 1) % SLICE_COUNT;
        self.staging_cursor = 0;

        if let Some(fence) = self.slices[self.active].fence.take() {
            let waited = device.wait_fence(&fence);
            device.release_fence(fence);
            waited?;
        }
        Ok(())
    }

    // ===== INTERNAL =====

    fn check_range(&self, offset: u64, bytes: u64) -> Result<()> {
        match offset.checked_add(bytes) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(Error::RangeOverflow {
                offset,
                bytes,
                capacity: self.size,
            }),
        }
    }
}

#[cfg(test)]
#[path = "buffer_state_tests.rs"]
mod tests;
