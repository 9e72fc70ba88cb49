//! VulkanDevice - GpuDevice implementation over ash + gpu-allocator
//!
//! Headless device: instance, first physical device, one graphics queue,
//! a GPU memory allocator, and a transient command pool. GPU work is
//! recorded lazily into a one-shot command buffer; placing a fence ends
//! the recording and submits it, so the fence protocol of the buffer
//! subsystem maps directly onto queue submissions.

use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::sync::Mutex;
use std::time::Duration;

use ash::vk;
use gpu_allocator::vulkan::{
    Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc,
};
use gpu_allocator::MemoryLocation;
use lumen_hal::backend::BindTarget;
use lumen_hal::command::{ColorBlendState, StencilState};
use lumen_hal::descriptor::MemoryStorage;
use lumen_hal::error::{Error, Result};
use lumen_hal::{hal_err, hal_info};
use lumen_hal::config::Config;

use crate::device::GpuDevice;
use crate::vulkan_state::{
    vk_blend_factor, vk_blend_op, vk_color_write_mask, vk_compare_op, vk_index_type,
    vk_stencil_op,
};

const SRC: &str = "lumen::vulkan";

/// Vulkan buffer with its memory allocation
pub struct VulkanBuffer {
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: u64,
}

impl VulkanBuffer {
    /// Raw Vulkan handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Allocation size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read back through the CPU mapping (readback tests)
    pub fn read_mapped(&self, offset: u64, out: &mut [u8]) -> Result<()> {
        let allocation = self
            .allocation
            .as_ref()
            .ok_or_else(|| Error::BackendFailure("Buffer has no allocation".to_string()))?;
        let ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| Error::BackendFailure("Buffer is not CPU-accessible".to_string()))?
            .as_ptr() as *const u8;
        unsafe {
            std::ptr::copy_nonoverlapping(ptr.add(offset as usize), out.as_mut_ptr(), out.len());
        }
        Ok(())
    }
}

/// Fence for one queue submission, with the command buffer it retires
pub struct VulkanFence {
    fence: vk::Fence,
    command_buffer: Option<vk::CommandBuffer>,
}

/// Headless Vulkan device
pub struct VulkanDevice {
    _entry: ash::Entry,
    instance: ash::Instance,
    #[allow(dead_code)]
    physical_device: vk::PhysicalDevice,
    device: ash::Device,

    queue: vk::Queue,
    #[allow(dead_code)]
    queue_family: u32,

    /// GPU memory allocator (dropped before the device)
    allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Transient pool for one-shot recordings
    command_pool: vk::CommandPool,
    /// Command buffer currently recording, begun on first use
    recording: Option<vk::CommandBuffer>,

    /// Released fences whose submissions may still be in flight; reaped
    /// once signalled
    retired: Vec<(vk::Fence, Option<vk::CommandBuffer>)>,

    /// Blend state applied to pipelines built after the last SetBlending
    /// (core Vulkan has no dynamic blend state)
    blend_attachment: vk::PipelineColorBlendAttachmentState,

    #[cfg(feature = "vulkan-validation")]
    debug_utils: Option<ash::ext::debug_utils::Instance>,
    #[cfg(feature = "vulkan-validation")]
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl VulkanDevice {
    /// Create a headless device on the first Vulkan-capable GPU
    pub fn new(config: &Config) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| hal_err!(SRC, "Failed to load Vulkan library: {:?}", e))?;

            let app_name = CString::new(config.app_name.as_str())
                .map_err(|e| hal_err!(SRC, "Invalid application name: {:?}", e))?;
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Lumen")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            #[allow(unused_mut)]
            let mut extension_names: Vec<*const std::os::raw::c_char> = Vec::new();
            #[allow(unused_mut)]
            let mut layer_names: Vec<*const std::os::raw::c_char> = Vec::new();

            #[cfg(feature = "vulkan-validation")]
            if config.enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
                layer_names.push(c"VK_LAYER_KHRONOS_validation".as_ptr());
            }

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| hal_err!(SRC, "Failed to create instance: {:?}", e))?;

            #[cfg(feature = "vulkan-validation")]
            let (debug_utils, debug_messenger) = if config.enable_validation {
                let (utils, messenger) =
                    crate::vulkan_debug::create_debug_messenger(&entry, &instance, config)?;
                (Some(utils), Some(messenger))
            } else {
                (None, None)
            };

            // Pick Physical Device
            let physical_devices = instance
                .enumerate_physical_devices()
                .map_err(|e| hal_err!(SRC, "Failed to enumerate physical devices: {:?}", e))?;
            let physical_device = physical_devices
                .into_iter()
                .next()
                .ok_or_else(|| hal_err!(SRC, "No Vulkan-capable GPU found"))?;

            // Find a graphics queue family (graphics implies transfer)
            let queue_families =
                instance.get_physical_device_queue_family_properties(physical_device);
            let queue_family = queue_families
                .iter()
                .enumerate()
                .find(|(_, qf)| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                .map(|(i, _)| i as u32)
                .ok_or_else(|| hal_err!(SRC, "No graphics queue family found"))?;

            // Create Logical Device
            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(queue_family)
                .queue_priorities(&queue_priorities)];

            let device_create_info =
                vk::DeviceCreateInfo::default().queue_create_infos(&queue_create_infos);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| hal_err!(SRC, "Failed to create logical device: {:?}", e))?;

            let queue = device.get_device_queue(queue_family, 0);

            // Create GPU allocator
            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| hal_err!(SRC, "Failed to create GPU allocator: {:?}", e))?;

            // Transient pool for one-shot recordings
            let pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(queue_family)
                .flags(
                    vk::CommandPoolCreateFlags::TRANSIENT
                        | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
                );
            let command_pool = device
                .create_command_pool(&pool_create_info, None)
                .map_err(|e| hal_err!(SRC, "Failed to create command pool: {:?}", e))?;

            hal_info!(SRC, "Vulkan device initialized for '{}'", config.app_name);

            Ok(Self {
                _entry: entry,
                instance,
                physical_device,
                device,
                queue,
                queue_family,
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                command_pool,
                recording: None,
                retired: Vec::new(),
                blend_attachment: vk::PipelineColorBlendAttachmentState::default()
                    .color_write_mask(vk::ColorComponentFlags::RGBA),
                #[cfg(feature = "vulkan-validation")]
                debug_utils,
                #[cfg(feature = "vulkan-validation")]
                debug_messenger,
            })
        }
    }

    /// Blend state pipelines built against this device would use
    pub fn blend_attachment(&self) -> vk::PipelineColorBlendAttachmentState {
        self.blend_attachment
    }

    /// Begin a one-shot command buffer if none is recording
    fn ensure_recording(&mut self) -> Result<vk::CommandBuffer> {
        if let Some(cmd) = self.recording {
            return Ok(cmd);
        }
        unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(self.command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let cmd = self
                .device
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| hal_err!(SRC, "Failed to allocate command buffer: {:?}", e))?[0];

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.device
                .begin_command_buffer(cmd, &begin_info)
                .map_err(|e| hal_err!(SRC, "Failed to begin command buffer: {:?}", e))?;

            self.recording = Some(cmd);
            Ok(cmd)
        }
    }

    /// Destroy released fences whose submissions have retired
    fn collect_retired(&mut self) {
        unsafe {
            let device = &self.device;
            let pool = self.command_pool;
            self.retired.retain(|(fence, cmd)| {
                match device.get_fence_status(*fence) {
                    Ok(true) => {
                        device.destroy_fence(*fence, None);
                        if let Some(cmd) = cmd {
                            device.free_command_buffers(pool, &[*cmd]);
                        }
                        false
                    }
                    _ => true,
                }
            });
        }
    }
}

impl GpuDevice for VulkanDevice {
    type Buffer = VulkanBuffer;
    type Fence = VulkanFence;

    fn create_buffer(
        &mut self,
        name: &str,
        size: u64,
        storage: MemoryStorage,
        mapped: bool,
    ) -> Result<VulkanBuffer> {
        unsafe {
            // Generic usage: any buffer may serve as vertex/index/indirect
            // source or as a transfer endpoint
            let usage = vk::BufferUsageFlags::VERTEX_BUFFER
                | vk::BufferUsageFlags::INDEX_BUFFER
                | vk::BufferUsageFlags::INDIRECT_BUFFER
                | vk::BufferUsageFlags::UNIFORM_BUFFER
                | vk::BufferUsageFlags::STORAGE_BUFFER
                | vk::BufferUsageFlags::TRANSFER_SRC
                | vk::BufferUsageFlags::TRANSFER_DST;

            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = self
                .device
                .create_buffer(&buffer_create_info, None)
                .map_err(|e| {
                    hal_err!(SRC, "Failed to create buffer of size {} bytes: {:?}", size, e)
                })?;

            let requirements = self.device.get_buffer_memory_requirements(buffer);
            let location = if mapped || storage == MemoryStorage::Sysram {
                MemoryLocation::CpuToGpu
            } else {
                MemoryLocation::GpuOnly
            };

            let allocation = match self
                .allocator
                .lock()
                .map_err(|_| hal_err!(SRC, "Allocator lock poisoned"))?
                .allocate(&AllocationCreateDesc {
                    name,
                    requirements,
                    location,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                }) {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.device.destroy_buffer(buffer, None);
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    return Err(hal_err!(
                        SRC,
                        "Out of GPU memory for buffer '{}' (required: {:.2} MB): {:?}",
                        name,
                        size_mb,
                        e
                    ));
                }
            };

            if mapped && allocation.mapped_ptr().is_none() {
                if let Ok(mut allocator) = self.allocator.lock() {
                    allocator.free(allocation).ok();
                }
                self.device.destroy_buffer(buffer, None);
                return Err(hal_err!(SRC, "Buffer '{}' could not be CPU-mapped", name));
            }

            if let Err(e) = self
                .device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
            {
                if let Ok(mut allocator) = self.allocator.lock() {
                    allocator.free(allocation).ok();
                }
                self.device.destroy_buffer(buffer, None);
                return Err(hal_err!(SRC, "Failed to bind buffer memory: {:?}", e));
            }

            Ok(VulkanBuffer {
                buffer,
                allocation: Some(allocation),
                size,
            })
        }
    }

    fn destroy_buffer(&mut self, mut buffer: VulkanBuffer) {
        unsafe {
            if let Some(allocation) = buffer.allocation.take() {
                if let Ok(mut allocator) = self.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            self.device.destroy_buffer(buffer.buffer, None);
        }
    }

    fn write_buffer(&mut self, buffer: &VulkanBuffer, offset: u64, data: &[u8]) -> Result<()> {
        let allocation = buffer
            .allocation
            .as_ref()
            .ok_or_else(|| hal_err!(SRC, "Buffer has no allocation"))?;
        let ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| hal_err!(SRC, "Buffer is not CPU-accessible"))?
            .as_ptr() as *mut u8;
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.add(offset as usize), data.len());
        }
        Ok(())
    }

    fn copy_buffer(
        &mut self,
        src: &VulkanBuffer,
        src_offset: u64,
        dst: &VulkanBuffer,
        dst_offset: u64,
        bytes: u64,
    ) -> Result<()> {
        let cmd = self.ensure_recording()?;
        unsafe {
            let region = vk::BufferCopy::default()
                .src_offset(src_offset)
                .dst_offset(dst_offset)
                .size(bytes);
            self.device.cmd_copy_buffer(cmd, src.buffer, dst.buffer, &[region]);

            // Copied data must be visible to subsequent draws
            let barrier = vk::MemoryBarrier::default()
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(
                    vk::AccessFlags::VERTEX_ATTRIBUTE_READ
                        | vk::AccessFlags::INDEX_READ
                        | vk::AccessFlags::INDIRECT_COMMAND_READ
                        | vk::AccessFlags::SHADER_READ,
                );
            self.device.cmd_pipeline_barrier(
                cmd,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::VERTEX_INPUT
                    | vk::PipelineStageFlags::DRAW_INDIRECT
                    | vk::PipelineStageFlags::VERTEX_SHADER,
                vk::DependencyFlags::empty(),
                &[barrier],
                &[],
                &[],
            );
        }
        Ok(())
    }

    fn place_fence(&mut self) -> Result<VulkanFence> {
        self.collect_retired();
        unsafe {
            let fence = self
                .device
                .create_fence(&vk::FenceCreateInfo::default(), None)
                .map_err(|e| hal_err!(SRC, "Failed to create fence: {:?}", e))?;

            let command_buffer = self.recording.take();
            let submit_result = if let Some(cmd) = command_buffer {
                if let Err(e) = self.device.end_command_buffer(cmd) {
                    self.device.free_command_buffers(self.command_pool, &[cmd]);
                    self.device.destroy_fence(fence, None);
                    return Err(hal_err!(SRC, "Failed to end command buffer: {:?}", e));
                }
                let command_buffers = [cmd];
                let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
                self.device.queue_submit(self.queue, &[submit_info], fence)
            } else {
                // Nothing recorded: the fence still marks this point in the
                // queue's timeline
                self.device.queue_submit(self.queue, &[], fence)
            };

            if let Err(e) = submit_result {
                if let Some(cmd) = command_buffer {
                    self.device.free_command_buffers(self.command_pool, &[cmd]);
                }
                self.device.destroy_fence(fence, None);
                return Err(hal_err!(SRC, "Failed to submit to GPU queue: {:?}", e));
            }

            Ok(VulkanFence { fence, command_buffer })
        }
    }

    fn wait_fence(&mut self, fence: &VulkanFence) -> Result<()> {
        unsafe {
            self.device
                .wait_for_fences(&[fence.fence], true, u64::MAX)
                .map_err(|e| hal_err!(SRC, "Failed to wait for fence: {:?}", e))
        }
    }

    fn wait_fence_timeout(&mut self, fence: &VulkanFence, timeout: Duration) -> Result<bool> {
        unsafe {
            match self
                .device
                .wait_for_fences(&[fence.fence], true, timeout.as_nanos() as u64)
            {
                Ok(()) => Ok(true),
                Err(vk::Result::TIMEOUT) => Ok(false),
                Err(e) => Err(hal_err!(SRC, "Failed to wait for fence: {:?}", e)),
            }
        }
    }

    fn fence_status(&mut self, fence: &VulkanFence) -> Result<bool> {
        unsafe {
            self.device
                .get_fence_status(fence.fence)
                .map_err(|e| hal_err!(SRC, "Failed to query fence: {:?}", e))
        }
    }

    fn release_fence(&mut self, fence: VulkanFence) {
        // The submission may still be in flight; reap once signalled
        self.retired.push((fence.fence, fence.command_buffer));
    }

    fn bind_buffer(
        &mut self,
        target: BindTarget,
        slot: u32,
        buffer: &VulkanBuffer,
        offset: u64,
        _bytes: u64,
    ) -> Result<()> {
        let cmd = self.ensure_recording()?;
        unsafe {
            match target {
                BindTarget::Vertex => {
                    self.device
                        .cmd_bind_vertex_buffers(cmd, slot, &[buffer.buffer], &[offset]);
                    Ok(())
                }
                BindTarget::Index(kind) => {
                    self.device
                        .cmd_bind_index_buffer(cmd, buffer.buffer, offset, vk_index_type(kind));
                    Ok(())
                }
                // Descriptor-based targets need set layouts this device
                // does not carry
                BindTarget::Uniform | BindTarget::Storage => Err(Error::Unsupported(format!(
                    "Bind target {:?} requires descriptor sets",
                    target
                ))),
            }
        }
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        let cmd = self.ensure_recording()?;
        unsafe {
            self.device.cmd_draw(cmd, vertex_count, 1, first_vertex, 0);
        }
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        first_index: u32,
        vertex_offset: i32,
    ) -> Result<()> {
        let cmd = self.ensure_recording()?;
        unsafe {
            self.device
                .cmd_draw_indexed(cmd, index_count, 1, first_index, vertex_offset, 0);
        }
        Ok(())
    }

    fn draw_indirect(
        &mut self,
        buffer: &VulkanBuffer,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> Result<()> {
        let cmd = self.ensure_recording()?;
        unsafe {
            self.device
                .cmd_draw_indirect(cmd, buffer.buffer, offset, draw_count, stride);
        }
        Ok(())
    }

    fn draw_indexed_indirect(
        &mut self,
        buffer: &VulkanBuffer,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> Result<()> {
        let cmd = self.ensure_recording()?;
        unsafe {
            self.device
                .cmd_draw_indexed_indirect(cmd, buffer.buffer, offset, draw_count, stride);
        }
        Ok(())
    }

    fn set_blending(&mut self, state: &ColorBlendState) -> Result<()> {
        // Core Vulkan has no dynamic blend state; translated and kept for
        // the next pipeline build
        self.blend_attachment = vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(state.blend_enable)
            .src_color_blend_factor(vk_blend_factor(state.src_color_factor))
            .dst_color_blend_factor(vk_blend_factor(state.dst_color_factor))
            .color_blend_op(vk_blend_op(state.color_blend_op))
            .src_alpha_blend_factor(vk_blend_factor(state.src_alpha_factor))
            .dst_alpha_blend_factor(vk_blend_factor(state.dst_alpha_factor))
            .alpha_blend_op(vk_blend_op(state.alpha_blend_op))
            .color_write_mask(vk_color_write_mask(state.color_write_mask));
        Ok(())
    }

    fn set_stencil(&mut self, state: &StencilState) -> Result<()> {
        let cmd = self.ensure_recording()?;
        unsafe {
            self.device.cmd_set_stencil_test_enable(cmd, state.test_enable);
            for (face, flags) in [
                (&state.front, vk::StencilFaceFlags::FRONT),
                (&state.back, vk::StencilFaceFlags::BACK),
            ] {
                self.device.cmd_set_stencil_op(
                    cmd,
                    flags,
                    vk_stencil_op(face.fail_op),
                    vk_stencil_op(face.pass_op),
                    vk_stencil_op(face.depth_fail_op),
                    vk_compare_op(face.compare_op),
                );
                self.device.cmd_set_stencil_compare_mask(cmd, flags, face.compare_mask);
                self.device.cmd_set_stencil_write_mask(cmd, flags, face.write_mask);
                self.device.cmd_set_stencil_reference(cmd, flags, face.reference);
            }
        }
        Ok(())
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        unsafe {
            // Wait for device to finish
            self.device.device_wait_idle().ok();

            if let Some(cmd) = self.recording.take() {
                self.device.free_command_buffers(self.command_pool, &[cmd]);
            }
            for (fence, cmd) in self.retired.drain(..) {
                self.device.destroy_fence(fence, None);
                if let Some(cmd) = cmd {
                    self.device.free_command_buffers(self.command_pool, &[cmd]);
                }
            }
            self.device.destroy_command_pool(self.command_pool, None);

            // Free VkDeviceMemory pages BEFORE destroying the device
            ManuallyDrop::drop(&mut self.allocator);

            #[cfg(feature = "vulkan-validation")]
            {
                crate::vulkan_debug::cleanup_debug_config();
                if let (Some(debug_utils), Some(messenger)) =
                    (&self.debug_utils, self.debug_messenger)
                {
                    debug_utils.destroy_debug_utils_messenger(messenger, None);
                }
            }

            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
