// Buffer utilities for vertex, index, and uniform buffers
//
// Plain vkAllocateMemory per buffer; the scene is a handful of buffers so a
// sub-allocator would buy nothing.

use anyhow::{Context, Result};
use ash::vk;
use bytemuck::Pod;
use super::command;
use super::VulkanDevice;

/// A buffer together with its dedicated memory
#[derive(Debug, Clone, Copy)]
pub struct GpuBuffer {
    pub buffer: vk::Buffer,
    pub memory: vk::DeviceMemory,
    pub size: vk::DeviceSize,
}

impl GpuBuffer {
    pub fn destroy(&self, device: &ash::Device) {
        unsafe {
            device.destroy_buffer(self.buffer, None);
            device.free_memory(self.memory, None);
        }
    }

    /// Copy `data` into host-visible memory of this buffer
    pub fn write<T: Pod>(&self, device: &VulkanDevice, data: &[T]) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        if bytes.len() as vk::DeviceSize > self.size {
            anyhow::bail!(
                "Write of {} bytes overflows buffer of {} bytes",
                bytes.len(),
                self.size
            );
        }

        unsafe {
            let ptr = device
                .device
                .map_memory(self.memory, 0, bytes.len() as vk::DeviceSize, vk::MemoryMapFlags::empty())
                .context("Failed to map buffer memory")? as *mut u8;

            ptr.copy_from_nonoverlapping(bytes.as_ptr(), bytes.len());
            device.device.unmap_memory(self.memory);
        }

        Ok(())
    }
}

/// Helper to create a GPU buffer with specified usage and memory properties
pub fn create_buffer(
    device: &VulkanDevice,
    size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
    memory_properties: vk::MemoryPropertyFlags,
) -> Result<GpuBuffer> {
    let buffer_info = vk::BufferCreateInfo::builder()
        .size(size)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);

    let buffer = unsafe {
        device.device.create_buffer(&buffer_info, None)
            .context("Failed to create buffer")?
    };

    let mem_requirements = unsafe { device.device.get_buffer_memory_requirements(buffer) };

    let memory_type_index = find_memory_type(
        &device.memory_properties,
        mem_requirements.memory_type_bits,
        memory_properties,
    )?;

    let alloc_info = vk::MemoryAllocateInfo::builder()
        .allocation_size(mem_requirements.size)
        .memory_type_index(memory_type_index);

    let memory = unsafe {
        device.device.allocate_memory(&alloc_info, None)
            .context("Failed to allocate buffer memory")?
    };

    unsafe {
        device.device.bind_buffer_memory(buffer, memory, 0)
            .context("Failed to bind buffer memory")?;
    }

    Ok(GpuBuffer { buffer, memory, size })
}

/// Create a host-visible buffer and fill it with data
pub fn create_buffer_with_data<T: Pod>(
    device: &VulkanDevice,
    usage: vk::BufferUsageFlags,
    data: &[T],
) -> Result<GpuBuffer> {
    let size = std::mem::size_of_val(data) as vk::DeviceSize;

    let buffer = create_buffer(
        device,
        size,
        usage,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    )?;
    buffer.write(device, data)?;

    Ok(buffer)
}

/// Upload data into a device-local buffer through a temporary staging buffer
pub fn create_device_local_buffer<T: Pod>(
    device: &VulkanDevice,
    command_pool: vk::CommandPool,
    usage: vk::BufferUsageFlags,
    data: &[T],
) -> Result<GpuBuffer> {
    let staging = create_buffer_with_data(device, vk::BufferUsageFlags::TRANSFER_SRC, data)?;

    let buffer = create_buffer(
        device,
        staging.size,
        usage | vk::BufferUsageFlags::TRANSFER_DST,
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
    )?;

    let copied = copy_buffer(device, command_pool, staging.buffer, buffer.buffer, staging.size);
    staging.destroy(&device.device);
    copied?;

    Ok(buffer)
}

/// Copy `size` bytes between buffers and wait for completion
pub fn copy_buffer(
    device: &VulkanDevice,
    command_pool: vk::CommandPool,
    src: vk::Buffer,
    dst: vk::Buffer,
    size: vk::DeviceSize,
) -> Result<()> {
    command::one_shot(device, command_pool, |cmd| unsafe {
        let region = vk::BufferCopy::builder().src_offset(0).dst_offset(0).size(size).build();
        device.device.cmd_copy_buffer(cmd, src, dst, &[region]);
    })
}

/// One host-visible uniform buffer per swapchain image
pub fn create_uniform_buffers(
    device: &VulkanDevice,
    size: vk::DeviceSize,
    count: usize,
) -> Result<Vec<GpuBuffer>> {
    super::create_each(
        count,
        |_| {
            create_buffer(
                device,
                size,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            )
        },
        |buffer| buffer.destroy(&device.device),
    )
}

/// Find a memory type allowed by `type_filter` that has all `properties`.
/// Failing here means the device cannot back the resource at all.
pub fn find_memory_type(
    mem_properties: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> Result<u32> {
    (0..mem_properties.memory_type_count)
        .find(|&i| {
            let has_type = (type_filter & (1 << i)) != 0;
            let has_properties = mem_properties.memory_types[i as usize]
                .property_flags
                .contains(properties);
            has_type && has_properties
        })
        .with_context(|| {
            format!(
                "Failed to find suitable memory type (filter {:#b}, {:?})",
                type_filter, properties
            )
        })
}
