/*!
# Lumen HAL - Vulkan Backend

Vulkan implementation of the Lumen hardware-abstraction layer, built on
the Ash bindings and gpu-allocator for memory management.

The interesting part lives in [`buffer_state`]: triple-ring streaming
buffers, staged persistent uploads with amortized staging growth, and the
explicit CPU/GPU fence protocol. Everything device-specific sits behind
the [`GpuDevice`] trait so the whole protocol is unit-testable without a
GPU; [`VulkanDevice`] is the production implementation.
*/

mod backend;
mod buffer_state;
mod device;
mod vulkan_device;
mod vulkan_state;

#[cfg(feature = "vulkan-validation")]
mod vulkan_debug;

#[cfg(test)]
mod mock_device;

pub use backend::GpuBackend;
pub use buffer_state::{BufferState, SLICE_COUNT};
pub use device::GpuDevice;
pub use vulkan_device::{VulkanBuffer, VulkanDevice, VulkanFence};

/// The production backend: registry + dispatch over a Vulkan device
pub type VulkanBackend = GpuBackend<VulkanDevice>;

impl VulkanBackend {
    /// Create a Vulkan backend from a configuration
    pub fn new(config: &lumen_hal::Config) -> lumen_hal::Result<Self> {
        Ok(GpuBackend::with_device(VulkanDevice::new(config)?))
    }
}
