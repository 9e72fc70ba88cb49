//! Mock GpuDevice for unit tests (no GPU required)
//!
//! Buffers are plain byte vectors addressed by index handles; copies are
//! performed eagerly so round-trip tests can read back real bytes. Fences
//! are serial numbers against a `completed` watermark the test advances
//! to play the GPU's role. Every wait and release is recorded so tests
//! can assert on the synchronization protocol itself.

use std::time::Duration;

use lumen_hal::backend::BindTarget;
use lumen_hal::command::{ColorBlendState, StencilState};
use lumen_hal::descriptor::MemoryStorage;
use lumen_hal::error::{Error, Result};

use crate::device::GpuDevice;

struct MockBuffer {
    bytes: Vec<u8>,
    mapped: bool,
}

/// GpuDevice double backed by host memory
#[derive(Default)]
pub struct MockDevice {
    buffers: Vec<Option<MockBuffer>>,
    /// Serial of the next fence `place_fence` hands out (first is 1)
    next_fence: u64,
    /// Highest fence serial the simulated GPU has retired
    pub completed: u64,
    /// Fence serials passed to `wait_fence`, in call order
    pub waits: Vec<u64>,
    /// Fence serials released
    pub released: Vec<u64>,
    /// Number of `create_buffer` calls
    pub allocations: usize,
    /// Number of `destroy_buffer` calls
    pub frees: usize,
    /// Recorded draw/bind/state calls
    pub calls: Vec<String>,
    /// Fail the `create_buffer` call with this zero-based index
    pub fail_alloc_at: Option<usize>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Byte contents of a live buffer
    pub fn contents(&self, handle: usize) -> &[u8] {
        self.buffers[handle]
            .as_ref()
            .map(|b| b.bytes.as_slice())
            .unwrap_or(&[])
    }

    /// Number of currently live buffers
    pub fn live_buffers(&self) -> usize {
        self.buffers.iter().filter(|b| b.is_some()).count()
    }

    /// Capacity of a live buffer
    pub fn buffer_size(&self, handle: usize) -> u64 {
        self.buffers[handle]
            .as_ref()
            .map(|b| b.bytes.len() as u64)
            .unwrap_or(0)
    }

    fn buffer(&self, handle: usize) -> Result<&MockBuffer> {
        self.buffers
            .get(handle)
            .and_then(|b| b.as_ref())
            .ok_or_else(|| Error::BackendFailure(format!("Dead buffer handle {}", handle)))
    }
}

impl GpuDevice for MockDevice {
    type Buffer = usize;
    type Fence = u64;

    fn create_buffer(
        &mut self,
        _name: &str,
        size: u64,
        _storage: MemoryStorage,
        mapped: bool,
    ) -> Result<Self::Buffer> {
        if self.fail_alloc_at == Some(self.allocations) {
            self.allocations += 1;
            return Err(Error::BackendFailure("Scripted allocation failure".to_string()));
        }
        self.allocations += 1;
        self.buffers.push(Some(MockBuffer {
            bytes: vec![0; size as usize],
            mapped,
        }));
        Ok(self.buffers.len() - 1)
    }

    fn destroy_buffer(&mut self, buffer: Self::Buffer) {
        if let Some(slot) = self.buffers.get_mut(buffer) {
            *slot = None;
            self.frees += 1;
        }
    }

    fn write_buffer(&mut self, buffer: &Self::Buffer, offset: u64, data: &[u8]) -> Result<()> {
        let handle = *buffer;
        {
            let target = self.buffer(handle)?;
            if !target.mapped {
                return Err(Error::BackendFailure(format!(
                    "Buffer {} is not CPU-accessible",
                    handle
                )));
            }
            if offset as usize + data.len() > target.bytes.len() {
                return Err(Error::BackendFailure(format!(
                    "Write past the end of buffer {}",
                    handle
                )));
            }
        }
        let target = self.buffers[handle].as_mut().unwrap();
        target.bytes[offset as usize..offset as usize + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn copy_buffer(
        &mut self,
        src: &Self::Buffer,
        src_offset: u64,
        dst: &Self::Buffer,
        dst_offset: u64,
        bytes: u64,
    ) -> Result<()> {
        let chunk = {
            let source = self.buffer(*src)?;
            if src_offset as usize + bytes as usize > source.bytes.len() {
                return Err(Error::BackendFailure(format!(
                    "Copy past the end of buffer {}",
                    src
                )));
            }
            source.bytes[src_offset as usize..(src_offset + bytes) as usize].to_vec()
        };
        let target = self
            .buffers
            .get_mut(*dst)
            .and_then(|b| b.as_mut())
            .ok_or_else(|| Error::BackendFailure(format!("Dead buffer handle {}", dst)))?;
        if dst_offset as usize + bytes as usize > target.bytes.len() {
            return Err(Error::BackendFailure(format!(
                "Copy past the end of buffer {}",
                dst
            )));
        }
        target.bytes[dst_offset as usize..(dst_offset + bytes) as usize].copy_from_slice(&chunk);
        self.calls.push(format!("copy:{}:{}", src_offset, dst_offset));
        Ok(())
    }

    fn place_fence(&mut self) -> Result<Self::Fence> {
        self.next_fence += 1;
        Ok(self.next_fence)
    }

    fn wait_fence(&mut self, fence: &Self::Fence) -> Result<()> {
        self.waits.push(*fence);
        // Pretend the GPU catches up rather than deadlocking the test
        if *fence > self.completed {
            self.completed = *fence;
        }
        Ok(())
    }

    fn wait_fence_timeout(&mut self, fence: &Self::Fence, _timeout: Duration) -> Result<bool> {
        Ok(*fence <= self.completed)
    }

    fn fence_status(&mut self, fence: &Self::Fence) -> Result<bool> {
        Ok(*fence <= self.completed)
    }

    fn release_fence(&mut self, fence: Self::Fence) {
        self.released.push(fence);
    }

    fn bind_buffer(
        &mut self,
        target: BindTarget,
        slot: u32,
        buffer: &Self::Buffer,
        offset: u64,
        bytes: u64,
    ) -> Result<()> {
        self.calls.push(format!(
            "bind:{:?}:{}:{}:{}:{}",
            target, slot, buffer, offset, bytes
        ));
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.calls.push(format!("draw:{}:{}", vertex_count, first_vertex));
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        first_index: u32,
        vertex_offset: i32,
    ) -> Result<()> {
        self.calls.push(format!(
            "draw_indexed:{}:{}:{}",
            index_count, first_index, vertex_offset
        ));
        Ok(())
    }

    fn draw_indirect(
        &mut self,
        buffer: &Self::Buffer,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> Result<()> {
        self.calls.push(format!(
            "draw_indirect:{}:{}:{}:{}",
            buffer, offset, draw_count, stride
        ));
        Ok(())
    }

    fn draw_indexed_indirect(
        &mut self,
        buffer: &Self::Buffer,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> Result<()> {
        self.calls.push(format!(
            "draw_indexed_indirect:{}:{}:{}:{}",
            buffer, offset, draw_count, stride
        ));
        Ok(())
    }

    fn set_blending(&mut self, state: &ColorBlendState) -> Result<()> {
        self.calls.push(format!("set_blending:{}", state.blend_enable));
        Ok(())
    }

    fn set_stencil(&mut self, state: &StencilState) -> Result<()> {
        self.calls.push(format!("set_stencil:{}", state.test_enable));
        Ok(())
    }
}
