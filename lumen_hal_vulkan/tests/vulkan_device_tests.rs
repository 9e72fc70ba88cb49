//! Integration tests for the Vulkan device and backend
//!
//! All tests require a GPU and are marked with #[ignore].
//!
//! Run with: cargo test --test vulkan_device_tests -- --ignored

use std::time::Duration;

use lumen_hal::{
    Backend, BufferDesc, BufferUsage, Config, MemoryStorage, ObjectDesc, SignalStatus,
};
use lumen_hal_vulkan::{GpuDevice, VulkanBackend, VulkanDevice};

fn buffer_desc(name: &str, size: u64, usage: BufferUsage) -> ObjectDesc {
    ObjectDesc::Buffer(BufferDesc {
        name: name.to_string(),
        size,
        storage: MemoryStorage::Sysram,
        usage,
    })
}

// ============================================================================
// DEVICE TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_device_init() {
    let device = VulkanDevice::new(&Config::default()).unwrap();
    drop(device);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_mapped_write_read() {
    let mut device = VulkanDevice::new(&Config::default()).unwrap();

    let buffer = device
        .create_buffer("mapped", 256, MemoryStorage::Sysram, true)
        .unwrap();
    let data: Vec<u8> = (0..64).collect();
    device.write_buffer(&buffer, 32, &data).unwrap();

    let mut readback = vec![0u8; 64];
    buffer.read_mapped(32, &mut readback).unwrap();
    assert_eq!(readback, data);

    device.destroy_buffer(buffer);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_copy_round_trip() {
    let mut device = VulkanDevice::new(&Config::default()).unwrap();

    let src = device
        .create_buffer("src", 256, MemoryStorage::Sysram, true)
        .unwrap();
    let dst = device
        .create_buffer("dst", 256, MemoryStorage::Sysram, true)
        .unwrap();

    let data: Vec<u8> = (0..128).collect();
    device.write_buffer(&src, 0, &data).unwrap();
    device.copy_buffer(&src, 0, &dst, 64, 128).unwrap();

    // The copy retires with its fence
    let fence = device.place_fence().unwrap();
    device.wait_fence(&fence).unwrap();
    device.release_fence(fence);

    let mut readback = vec![0u8; 128];
    dst.read_mapped(64, &mut readback).unwrap();
    assert_eq!(readback, data);

    device.destroy_buffer(src);
    device.destroy_buffer(dst);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_fence_status_and_timeout() {
    let mut device = VulkanDevice::new(&Config::default()).unwrap();

    let fence = device.place_fence().unwrap();
    // An empty submission retires quickly
    assert!(device
        .wait_fence_timeout(&fence, Duration::from_secs(5))
        .unwrap());
    assert!(device.fence_status(&fence).unwrap());
    device.release_fence(fence);
}

// ============================================================================
// BACKEND TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_backend_buffer_lifecycle() {
    let mut backend = VulkanBackend::new(&Config::default()).unwrap();

    backend
        .create_objects(&[
            buffer_desc("stream", 1024, BufferUsage::STREAMING),
            buffer_desc("persist", 1 << 20, BufferUsage::PERSISTENT),
        ])
        .unwrap();

    backend.upload_data("stream", 0, &[1, 2, 3, 4]).unwrap();
    backend.upload_data("persist", 4096, &[5; 512]).unwrap();

    // A few full ring rotations, including the wrap-around waits
    for _ in 0..8 {
        backend.sync_all().unwrap();
    }

    backend.delete_object("stream").unwrap();
    backend.delete_object("persist").unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_backend_signals() {
    let mut backend = VulkanBackend::new(&Config::default()).unwrap();

    backend.place_signal("frame").unwrap();
    assert_eq!(
        backend.wait_signal("frame", Duration::from_secs(5)),
        SignalStatus::Signalled
    );
    assert_eq!(backend.check_signal("frame"), SignalStatus::Signalled);
    assert_eq!(backend.check_signal("ghost"), SignalStatus::UnknownSignal);
}
