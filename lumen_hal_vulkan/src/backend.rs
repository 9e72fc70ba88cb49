//! GpuBackend - object registry and command dispatch over a GpuDevice
//!
//! Implements the `Backend` contract: named objects are keyed by their
//! name hash and never merged on collision, draw commands resolve every
//! source before any GPU work is issued, and command lists stop at the
//! first failing command.

use std::time::Duration;

use lumen_hal::backend::{Backend, BindTarget, SignalStatus};
use lumen_hal::command::{Command, CommandList};
use lumen_hal::descriptor::ObjectDesc;
use lumen_hal::error::{Error, Result};
use lumen_hal::object_id::ObjectId;
use lumen_hal::{hal_debug, hal_info};
use rustc_hash::FxHashMap;

use crate::buffer_state::BufferState;
use crate::device::GpuDevice;

/// Backend implementation generic over the raw device layer
///
/// The hash of an object's name is its sole identity: two distinct names
/// that hash equal would silently alias the same slot. That collision
/// risk is accepted and left unhandled.
pub struct GpuBackend<D: GpuDevice> {
    device: D,
    buffers: FxHashMap<ObjectId, BufferState<D>>,
    lists: FxHashMap<ObjectId, CommandList>,
    signals: FxHashMap<ObjectId, D::Fence>,
}

impl<D: GpuDevice> GpuBackend<D> {
    /// Wrap a raw device into a backend with an empty registry
    pub fn with_device(device: D) -> Self {
        Self {
            device,
            buffers: FxHashMap::default(),
            lists: FxHashMap::default(),
            signals: FxHashMap::default(),
        }
    }

    /// Access the raw device (GPU tests, readback)
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Number of registered buffers
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    fn resolve(&self, id: ObjectId) -> Result<&BufferState<D>> {
        self.buffers.get(&id).ok_or(Error::UnknownSource(id))
    }

    /// Check that every source of a draw command is registered
    ///
    /// Runs before any bind or draw so an unresolved name never leaves
    /// partial GPU work behind.
    fn resolve_sources(&self, command: &Command) -> Result<()> {
        match *command {
            Command::Draw { vertex_source, .. } => {
                self.resolve(vertex_source)?;
            }
            Command::DrawIndexed { vertex_source, index_source, .. } => {
                self.resolve(vertex_source)?;
                self.resolve(index_source)?;
            }
            Command::DrawIndirect { vertex_source, indirect_source, .. } => {
                self.resolve(vertex_source)?;
                self.resolve(indirect_source)?;
            }
            Command::DrawIndexedIndirect {
                vertex_source,
                index_source,
                indirect_source,
                ..
            } => {
                self.resolve(vertex_source)?;
                self.resolve(index_source)?;
                self.resolve(indirect_source)?;
            }
            Command::SetBlending(_) | Command::SetStencil(_) => {}
        }
        Ok(())
    }
}

fn lookup<D: GpuDevice>(
    buffers: &FxHashMap<ObjectId, BufferState<D>>,
    id: ObjectId,
) -> Result<&BufferState<D>> {
    buffers.get(&id).ok_or(Error::UnknownSource(id))
}

impl<D> Backend for GpuBackend<D>
where
    D: GpuDevice + Send + Sync,
    D::Buffer: Send + Sync,
    D::Fence: Send + Sync,
{
    // ===== OBJECT REGISTRY =====

    fn create_objects(&mut self, descriptors: &[ObjectDesc]) -> Result<()> {
        if descriptors.is_empty() {
            return Err(Error::NothingToDo);
        }
        for desc in descriptors {
            let id = ObjectId::from_name(desc.name());
            if self.buffers.contains_key(&id) {
                return Err(Error::DuplicateName(desc.name().to_string()));
            }
            match desc {
                ObjectDesc::Buffer(buffer_desc) => {
                    let state = BufferState::new(&mut self.device, buffer_desc)?;
                    self.buffers.insert(id, state);
                    hal_debug!(
                        "lumen::backend",
                        "Registered buffer '{}' as {}",
                        buffer_desc.name,
                        id
                    );
                }
            }
        }
        Ok(())
    }

    fn delete_object(&mut self, name: &str) -> Result<()> {
        let id = ObjectId::from_name(name);
        let mut state = self
            .buffers
            .remove(&id)
            .ok_or_else(|| Error::UnknownName(name.to_string()))?;
        state.destroy(&mut self.device);
        hal_debug!("lumen::backend", "Deleted buffer '{}'", name);
        Ok(())
    }

    // ===== BUFFER ACCESS =====

    fn upload_data(&mut self, name: &str, address: u64, data: &[u8]) -> Result<()> {
        let Self { device, buffers, .. } = self;
        let id = ObjectId::from_name(name);
        buffers
            .get_mut(&id)
            .ok_or_else(|| Error::UnknownName(name.to_string()))?
            .upload(device, address, data)
    }

    fn sync_buffer(&mut self, name: &str) -> Result<()> {
        let Self { device, buffers, .. } = self;
        let id = ObjectId::from_name(name);
        buffers
            .get_mut(&id)
            .ok_or_else(|| Error::UnknownName(name.to_string()))?
            .sync(device)
    }

    fn sync_all(&mut self) -> Result<()> {
        let Self { device, buffers, .. } = self;
        for state in buffers.values_mut() {
            state.sync(device)?;
        }
        Ok(())
    }

    // ===== COMMAND EXECUTION =====

    fn execute_command(&mut self, command: &Command) -> Result<()> {
        self.resolve_sources(command)?;

        let Self { device, buffers, .. } = self;
        match *command {
            Command::Draw { vertex_source, vertex_count, first_vertex } => {
                lookup(buffers, vertex_source)?.bind_to_slot(device, BindTarget::Vertex, 0)?;
                device.draw(vertex_count, first_vertex)
            }

            Command::DrawIndexed {
                vertex_source,
                index_source,
                index_kind,
                index_count,
                first_index,
                vertex_offset,
            } => {
                lookup(buffers, vertex_source)?.bind_to_slot(device, BindTarget::Vertex, 0)?;
                lookup(buffers, index_source)?.bind_to_slot(device, BindTarget::Index(index_kind), 0)?;
                device.draw_indexed(index_count, first_index, vertex_offset)
            }

            Command::DrawIndirect {
                vertex_source,
                indirect_source,
                indirect_offset,
                draw_count,
                stride,
            } => {
                lookup(buffers, vertex_source)?.bind_to_slot(device, BindTarget::Vertex, 0)?;
                let indirect = lookup(buffers, indirect_source)?.device_buffer()?;
                device.draw_indirect(indirect, indirect_offset, draw_count, stride)
            }

            Command::DrawIndexedIndirect {
                vertex_source,
                index_source,
                index_kind,
                indirect_source,
                indirect_offset,
                draw_count,
                stride,
            } => {
                lookup(buffers, vertex_source)?.bind_to_slot(device, BindTarget::Vertex, 0)?;
                lookup(buffers, index_source)?.bind_to_slot(device, BindTarget::Index(index_kind), 0)?;
                let indirect = lookup(buffers, indirect_source)?.device_buffer()?;
                device.draw_indexed_indirect(indirect, indirect_offset, draw_count, stride)
            }

            Command::SetBlending(state) => device.set_blending(&state),
            Command::SetStencil(state) => device.set_stencil(&state),
        }
    }

    fn execute_temp_command_buffer(&mut self, commands: &CommandList) -> Result<()> {
        if commands.is_empty() {
            return Err(Error::NothingToDo);
        }
        for command in commands {
            self.execute_command(command)?;
        }
        Ok(())
    }

    // ===== NAMED COMMAND LISTS =====

    fn create_command_buffer(&mut self, name: &str) -> Result<()> {
        let id = ObjectId::from_name(name);
        if self.lists.contains_key(&id) {
            return Err(Error::DuplicateName(name.to_string()));
        }
        self.lists.insert(id, CommandList::new());
        Ok(())
    }

    fn attach_to_command_buffer(&mut self, name: &str, commands: &CommandList) -> Result<()> {
        let id = ObjectId::from_name(name);
        let list = self
            .lists
            .get_mut(&id)
            .ok_or_else(|| Error::UnknownName(name.to_string()))?;
        list.extend(commands.iter().copied());
        Ok(())
    }

    fn execute_command_buffer(&mut self, name: &str) -> Result<()> {
        let id = ObjectId::from_name(name);
        // Cloned so the registry stays borrowable during execution
        let list = self
            .lists
            .get(&id)
            .ok_or_else(|| Error::UnknownName(name.to_string()))?
            .clone();
        self.execute_temp_command_buffer(&list)
    }

    fn delete_command_buffer(&mut self, name: &str) -> Result<()> {
        let id = ObjectId::from_name(name);
        self.lists
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::UnknownName(name.to_string()))
    }

    // ===== SIGNALS =====

    fn place_signal(&mut self, name: &str) -> Result<()> {
        let id = ObjectId::from_name(name);
        let fence = self.device.place_fence()?;
        if let Some(old) = self.signals.insert(id, fence) {
            self.device.release_fence(old);
        }
        Ok(())
    }

    fn check_signal(&mut self, name: &str) -> SignalStatus {
        let Self { device, signals, .. } = self;
        let id = ObjectId::from_name(name);
        match signals.get(&id) {
            None => SignalStatus::UnknownSignal,
            Some(fence) => match device.fence_status(fence) {
                Ok(true) => SignalStatus::Signalled,
                Ok(false) => SignalStatus::NotSignalled,
                Err(_) => SignalStatus::UnknownSignal,
            },
        }
    }

    fn wait_signal(&mut self, name: &str, timeout: Duration) -> SignalStatus {
        let Self { device, signals, .. } = self;
        let id = ObjectId::from_name(name);
        match signals.get(&id) {
            None => SignalStatus::UnknownSignal,
            Some(fence) => match device.wait_fence_timeout(fence, timeout) {
                Ok(true) => SignalStatus::Signalled,
                Ok(false) => SignalStatus::TimedOut,
                Err(_) => SignalStatus::UnknownSignal,
            },
        }
    }
}

impl<D: GpuDevice> Drop for GpuBackend<D> {
    fn drop(&mut self) {
        let Self { device, buffers, signals, .. } = self;
        for state in buffers.values_mut() {
            state.destroy(device);
        }
        for (_, fence) in signals.drain() {
            device.release_fence(fence);
        }
        hal_info!("lumen::backend", "Backend shut down");
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
