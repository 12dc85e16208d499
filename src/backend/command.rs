// Command pool and command buffer recording
//
// Draw commands are recorded once per swapchain image and resubmitted every
// frame; they are thrown away and re-recorded on every swapchain rebuild.
// Uploads go through short-lived one-shot buffers.

use anyhow::{Context, Result};
use ash::vk;
use super::VulkanDevice;

pub fn create_command_pool(device: &VulkanDevice) -> Result<vk::CommandPool> {
    let pool_info = vk::CommandPoolCreateInfo::builder()
        .queue_family_index(device.graphics_queue_family);

    unsafe {
        device.device.create_command_pool(&pool_info, None)
            .context("Failed to create command pool")
    }
}

pub fn allocate_command_buffers(
    device: &VulkanDevice,
    command_pool: vk::CommandPool,
    count: usize,
) -> Result<Vec<vk::CommandBuffer>> {
    let alloc_info = vk::CommandBufferAllocateInfo::builder()
        .command_pool(command_pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(count as u32);

    unsafe {
        device.device.allocate_command_buffers(&alloc_info)
            .context("Failed to allocate command buffers")
    }
}

/// Record commands into a temporary buffer, submit it on the graphics queue
/// and block until it has executed.
pub fn one_shot<F>(device: &VulkanDevice, command_pool: vk::CommandPool, record: F) -> Result<()>
where
    F: FnOnce(vk::CommandBuffer),
{
    let cmd = allocate_command_buffers(device, command_pool, 1)?[0];

    let result = (|| -> Result<()> {
        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            device.device.begin_command_buffer(cmd, &begin_info)
                .context("Failed to begin one-shot command buffer")?;
            record(cmd);
            device.device.end_command_buffer(cmd)
                .context("Failed to end one-shot command buffer")?;

            let command_buffers = [cmd];
            let submit_info = vk::SubmitInfo::builder().command_buffers(&command_buffers);
            device.device
                .queue_submit(device.graphics_queue, &[submit_info.build()], vk::Fence::null())
                .context("Failed to submit one-shot command buffer")?;
            device.device.queue_wait_idle(device.graphics_queue)
                .context("Failed to wait for one-shot command buffer")?;
        }
        Ok(())
    })();

    unsafe {
        device.device.free_command_buffers(command_pool, &[cmd]);
    }

    result
}

/// Everything a draw command buffer references for one swapchain image
pub struct DrawTarget {
    pub framebuffer: vk::Framebuffer,
    pub descriptor_set: Option<vk::DescriptorSet>,
}

/// Geometry bound by the textured variant. `None` draws three vertices with
/// no buffers bound (positions come from the vertex shader).
pub struct IndexedGeometry {
    pub vertex_buffer: vk::Buffer,
    pub index_buffer: vk::Buffer,
    pub index_count: u32,
}

/// Pre-record one draw command buffer per swapchain image
pub fn record_draw_commands(
    device: &VulkanDevice,
    command_buffers: &[vk::CommandBuffer],
    targets: &[DrawTarget],
    render_pass: vk::RenderPass,
    pipeline: vk::Pipeline,
    pipeline_layout: vk::PipelineLayout,
    extent: vk::Extent2D,
    geometry: Option<&IndexedGeometry>,
    clear_color: [f32; 4],
) -> Result<()> {
    if command_buffers.len() != targets.len() {
        anyhow::bail!(
            "{} command buffers for {} framebuffers",
            command_buffers.len(),
            targets.len()
        );
    }

    let clear_values = [vk::ClearValue {
        color: vk::ClearColorValue { float32: clear_color },
    }];

    for (&cmd, target) in command_buffers.iter().zip(targets) {
        // Several in-flight frames may reference the same image's buffer
        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::SIMULTANEOUS_USE);

        let render_pass_info = vk::RenderPassBeginInfo::builder()
            .render_pass(render_pass)
            .framebuffer(target.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(&clear_values);

        unsafe {
            device.device.begin_command_buffer(cmd, &begin_info)
                .context("Failed to begin recording command buffer")?;

            device.device.cmd_begin_render_pass(cmd, &render_pass_info, vk::SubpassContents::INLINE);
            device.device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline);

            if let Some(set) = target.descriptor_set {
                device.device.cmd_bind_descriptor_sets(
                    cmd,
                    vk::PipelineBindPoint::GRAPHICS,
                    pipeline_layout,
                    0,
                    &[set],
                    &[],
                );
            }

            match geometry {
                Some(geometry) => {
                    device.device.cmd_bind_vertex_buffers(cmd, 0, &[geometry.vertex_buffer], &[0]);
                    device.device.cmd_bind_index_buffer(
                        cmd,
                        geometry.index_buffer,
                        0,
                        vk::IndexType::UINT16,
                    );
                    device.device.cmd_draw_indexed(cmd, geometry.index_count, 1, 0, 0, 0);
                }
                None => {
                    device.device.cmd_draw(cmd, 3, 1, 0, 0);
                }
            }

            device.device.cmd_end_render_pass(cmd);
            device.device.end_command_buffer(cmd)
                .context("Failed to record command buffer")?;
        }
    }

    Ok(())
}
