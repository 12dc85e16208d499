// Renderer - owns every Vulkan object and implements `FrameBackend`
//
// Objects fall into three lifetimes:
// - device level: instance, device, surface (VulkanDevice), command pool,
//   one FrameSync per in-flight slot
// - scene level: quad vertex/index buffers, texture, descriptor set layout
// - swapchain level: everything sized by or tied to the swapchain images,
//   torn down and recreated as a unit on every rebuild

use anyhow::{Context, Result};
use ash::vk;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use winit::window::Window;
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};

use crate::backend::buffer::{self, GpuBuffer};
use crate::backend::command::{self, DrawTarget, IndexedGeometry};
use crate::backend::pipeline::{self, PipelineConfig};
use crate::backend::sync::FrameSync;
use crate::backend::texture::Texture;
use crate::backend::{descriptor, shader, swapchain, Swapchain, VulkanDevice};
use crate::config::{Config, RenderVariant};
use crate::frame::{AcquireOutcome, FrameBackend, PresentOutcome, RebuildOutcome};
use crate::scene::{UniformBufferObject, QUAD_INDICES, QUAD_VERTICES};

/// Geometry and texture of the quad; survives swapchain rebuilds
struct QuadScene {
    vertex_buffer: GpuBuffer,
    index_buffer: GpuBuffer,
    texture: Texture,
    set_layout: vk::DescriptorSetLayout,
}

impl QuadScene {
    fn new(device: &VulkanDevice, command_pool: vk::CommandPool, texture_path: &Path) -> Result<Self> {
        let texture = Texture::load(device, command_pool, texture_path)?;
        let vertex_buffer = buffer::create_device_local_buffer(
            device,
            command_pool,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            &QUAD_VERTICES,
        )?;
        let index_buffer = buffer::create_device_local_buffer(
            device,
            command_pool,
            vk::BufferUsageFlags::INDEX_BUFFER,
            &QUAD_INDICES,
        )?;
        let set_layout = descriptor::create_set_layout(device)?;

        log::info!(
            "Quad scene ready: {} vertices, {} indices, {}x{} texture",
            QUAD_VERTICES.len(),
            QUAD_INDICES.len(),
            texture.width,
            texture.height
        );

        Ok(Self { vertex_buffer, index_buffer, texture, set_layout })
    }

    fn geometry(&self) -> IndexedGeometry {
        IndexedGeometry {
            vertex_buffer: self.vertex_buffer.buffer,
            index_buffer: self.index_buffer.buffer,
            index_count: QUAD_INDICES.len() as u32,
        }
    }

    fn destroy(&self, device: &ash::Device) {
        unsafe { device.destroy_descriptor_set_layout(self.set_layout, None) };
        self.texture.destroy(device);
        self.index_buffer.destroy(device);
        self.vertex_buffer.destroy(device);
    }
}

/// Everything that has to be recreated when the swapchain is
struct SwapchainResources {
    swapchain: Swapchain,
    render_pass: vk::RenderPass,
    pipeline_layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
    framebuffers: Vec<vk::Framebuffer>,
    command_buffers: Vec<vk::CommandBuffer>,
    uniform_buffers: Vec<GpuBuffer>,
    descriptor_pool: Option<vk::DescriptorPool>,
}

impl SwapchainResources {
    /// Destroy in reverse dependency order, ending with the swapchain itself
    fn destroy(self, device: &ash::Device, command_pool: vk::CommandPool) {
        unsafe {
            if let Some(pool) = self.descriptor_pool {
                // Frees the sets allocated from it
                device.destroy_descriptor_pool(pool, None);
            }
        }
        for uniform in &self.uniform_buffers {
            uniform.destroy(device);
        }
        unsafe {
            if !self.command_buffers.is_empty() {
                device.free_command_buffers(command_pool, &self.command_buffers);
            }
            for &framebuffer in &self.framebuffers {
                device.destroy_framebuffer(framebuffer, None);
            }
            device.destroy_pipeline(self.pipeline, None);
            device.destroy_pipeline_layout(self.pipeline_layout, None);
            device.destroy_render_pass(self.render_pass, None);
        }
        // Image views, then the swapchain
        drop(self.swapchain);
    }
}

pub struct Renderer {
    // Dropped before `window`: the surface must not outlive it
    device: Arc<VulkanDevice>,
    window: Arc<Window>,
    variant: RenderVariant,
    present_mode: vk::PresentModeKHR,
    clear_color: [f32; 4],
    shader_paths: (PathBuf, PathBuf),
    command_pool: vk::CommandPool,
    frames: Vec<FrameSync>,
    scene: Option<QuadScene>,
    swapchain: Option<SwapchainResources>,
    start_time: Instant,
}

impl Renderer {
    pub fn new(window: Arc<Window>, config: &Config) -> Result<Self> {
        let variant = config.graphics.variant;
        log::info!("Initializing renderer ({:?})", variant);

        let device = VulkanDevice::new(
            &config.window.title,
            config.debug.validation_layers,
            window.raw_display_handle(),
            window.raw_window_handle(),
        )?;

        let command_pool = command::create_command_pool(&device)?;
        let frames = FrameSync::create_ring(&device, config.graphics.max_frames_in_flight)?;

        let scene = if variant.uses_descriptors() {
            Some(QuadScene::new(&device, command_pool, &config.assets.texture_path)?)
        } else {
            None
        };

        let mut renderer = Self {
            device,
            window,
            variant,
            present_mode: config.preferred_present_mode(),
            clear_color: config.graphics.clear_color,
            shader_paths: config.assets.shader_paths(variant),
            command_pool,
            frames,
            scene,
            swapchain: None,
            start_time: Instant::now(),
        };

        // A window that starts minimized gets its swapchain on the first
        // frame with a drawable area
        let extent = renderer.drawable_extent();
        if swapchain::has_area(extent) {
            renderer.swapchain = renderer.create_swapchain_resources(extent)?;
        }

        Ok(renderer)
    }

    pub fn has_swapchain(&self) -> bool {
        self.swapchain.is_some()
    }

    fn resources(&self) -> Result<&SwapchainResources> {
        self.swapchain.as_ref().context("Swapchain has not been created")
    }

    /// `None` when the surface has no area to build a swapchain for
    fn create_swapchain_resources(&self, extent: vk::Extent2D) -> Result<Option<SwapchainResources>> {
        let Some(swapchain) = Swapchain::new(
            Arc::clone(&self.device),
            self.present_mode,
            extent.width,
            extent.height,
        )?
        else {
            return Ok(None);
        };

        let mut resources = SwapchainResources {
            swapchain,
            render_pass: vk::RenderPass::null(),
            pipeline_layout: vk::PipelineLayout::null(),
            pipeline: vk::Pipeline::null(),
            framebuffers: Vec::new(),
            command_buffers: Vec::new(),
            uniform_buffers: Vec::new(),
            descriptor_pool: None,
        };

        // Whatever was filled in before a failing step is released with it
        match self.fill_swapchain_resources(&mut resources) {
            Ok(()) => Ok(Some(resources)),
            Err(e) => {
                resources.destroy(&self.device.device, self.command_pool);
                Err(e)
            }
        }
    }

    fn fill_swapchain_resources(&self, resources: &mut SwapchainResources) -> Result<()> {
        let device = &self.device;
        let image_count = resources.swapchain.image_count();
        let extent = resources.swapchain.extent;

        resources.render_pass = pipeline::create_render_pass(device, resources.swapchain.format)?;

        let (vert_path, frag_path) = &self.shader_paths;
        let vert_shader = shader::load_shader_module(device, vert_path)?;
        let frag_shader = match shader::load_shader_module(device, frag_path) {
            Ok(module) => module,
            Err(e) => {
                unsafe { device.device.destroy_shader_module(vert_shader, None) };
                return Err(e);
            }
        };

        let pipeline_config =
            PipelineConfig::for_variant(self.variant, self.scene.as_ref().map(|s| s.set_layout));
        let created = pipeline::create_graphics_pipeline(
            device,
            resources.render_pass,
            extent,
            vert_shader,
            frag_shader,
            &pipeline_config,
        );

        // Modules are only needed while the pipeline is being built
        unsafe {
            device.device.destroy_shader_module(vert_shader, None);
            device.device.destroy_shader_module(frag_shader, None);
        }
        (resources.pipeline, resources.pipeline_layout) = created?;

        resources.framebuffers = pipeline::create_framebuffers(
            device,
            &resources.swapchain.image_views,
            resources.render_pass,
            extent,
        )?;

        let descriptor_sets = match &self.scene {
            Some(scene) => {
                resources.uniform_buffers =
                    buffer::create_uniform_buffers(device, UniformBufferObject::size(), image_count)?;
                let pool = descriptor::create_pool(device, image_count as u32)?;
                resources.descriptor_pool = Some(pool);
                Some(descriptor::allocate_sets(
                    device,
                    pool,
                    scene.set_layout,
                    &resources.uniform_buffers,
                    &scene.texture,
                )?)
            }
            None => None,
        };

        resources.command_buffers =
            command::allocate_command_buffers(device, self.command_pool, image_count)?;

        check_per_image_counts(
            image_count,
            resources.framebuffers.len(),
            resources.command_buffers.len(),
            descriptor_sets
                .as_ref()
                .map(|sets| (sets.len(), resources.uniform_buffers.len())),
        )?;

        let targets: Vec<DrawTarget> = resources
            .framebuffers
            .iter()
            .enumerate()
            .map(|(i, &framebuffer)| DrawTarget {
                framebuffer,
                descriptor_set: descriptor_sets.as_ref().map(|sets| sets[i]),
            })
            .collect();

        let geometry = self.scene.as_ref().map(QuadScene::geometry);
        command::record_draw_commands(
            device,
            &resources.command_buffers,
            &targets,
            resources.render_pass,
            resources.pipeline,
            resources.pipeline_layout,
            extent,
            geometry.as_ref(),
            self.clear_color,
        )?;

        log::info!(
            "Recorded {} command buffers for {}x{}",
            resources.command_buffers.len(),
            extent.width,
            extent.height
        );
        Ok(())
    }
}

/// Every per-image resource must exist exactly once per swapchain image.
/// `descriptors` holds the descriptor set and uniform buffer counts when the
/// scene uses them.
fn check_per_image_counts(
    image_count: usize,
    framebuffers: usize,
    command_buffers: usize,
    descriptors: Option<(usize, usize)>,
) -> Result<()> {
    anyhow::ensure!(
        framebuffers == image_count && command_buffers == image_count,
        "Per-image resources out of step with {} swapchain images ({} framebuffers, {} command buffers)",
        image_count,
        framebuffers,
        command_buffers
    );
    if let Some((sets, uniforms)) = descriptors {
        anyhow::ensure!(
            sets == image_count && uniforms == image_count,
            "Descriptor sets out of step with {} swapchain images ({} sets, {} uniform buffers)",
            image_count,
            sets,
            uniforms
        );
    }
    Ok(())
}

impl FrameBackend for Renderer {
    fn drawable_extent(&self) -> vk::Extent2D {
        let size = self.window.inner_size();
        vk::Extent2D { width: size.width, height: size.height }
    }

    fn wait_for_slot(&mut self, slot: usize) -> Result<()> {
        let fence = self.frames[slot].in_flight_fence;
        unsafe {
            self.device.device.wait_for_fences(&[fence], true, u64::MAX)
                .context("Failed to wait for in-flight fence")
        }
    }

    fn acquire_image(&mut self, slot: usize) -> Result<AcquireOutcome> {
        let semaphore = self.frames[slot].image_available;
        self.resources()?.swapchain.acquire_next_image(u64::MAX, semaphore)
    }

    fn prepare_image(&mut self, image_index: u32) -> Result<()> {
        if self.scene.is_none() {
            return Ok(());
        }

        let resources = self.resources()?;
        let ubo = UniformBufferObject::animated(
            self.start_time.elapsed().as_secs_f32(),
            resources.swapchain.extent,
        );
        let uniform = resources
            .uniform_buffers
            .get(image_index as usize)
            .with_context(|| format!("No uniform buffer for image {}", image_index))?;

        uniform.write(&self.device, &[ubo])
    }

    fn reset_slot(&mut self, slot: usize) -> Result<()> {
        let fence = self.frames[slot].in_flight_fence;
        unsafe {
            self.device.device.reset_fences(&[fence])
                .context("Failed to reset in-flight fence")
        }
    }

    fn submit(&mut self, slot: usize, image_index: u32) -> Result<()> {
        let sync = &self.frames[slot];
        let command_buffer = *self
            .resources()?
            .command_buffers
            .get(image_index as usize)
            .with_context(|| format!("No command buffer for image {}", image_index))?;

        let wait_semaphores = [sync.image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [sync.render_finished];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        unsafe {
            self.device.device
                .queue_submit(self.device.graphics_queue, &[submit_info], sync.in_flight_fence)
                .context("Failed to submit draw command buffer")
        }
    }

    fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome> {
        let render_finished = self.frames[slot].render_finished;
        self.resources()?
            .swapchain
            .present(self.device.present_queue, image_index, &[render_finished])
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.device.wait_idle()
    }

    fn rebuild_swapchain(&mut self) -> Result<RebuildOutcome> {
        if let Some(old) = self.swapchain.take() {
            old.destroy(&self.device.device, self.command_pool);
        }

        let extent = self.drawable_extent();
        self.swapchain = self.create_swapchain_resources(extent)?;
        Ok(if self.swapchain.is_some() {
            RebuildOutcome::Rebuilt
        } else {
            RebuildOutcome::NoSurfaceArea
        })
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        log::info!("Cleaning up Vulkan resources...");

        if let Err(e) = self.device.wait_idle() {
            log::error!("Wait idle failed during shutdown: {:#}", e);
        }

        if let Some(resources) = self.swapchain.take() {
            resources.destroy(&self.device.device, self.command_pool);
        }
        if let Some(scene) = self.scene.take() {
            scene.destroy(&self.device.device);
        }
        for sync in &self.frames {
            sync.destroy(&self.device.device);
        }
        unsafe {
            // Also frees any command buffers still allocated from it
            self.device.device.destroy_command_pool(self.command_pool, None);
        }

        log::info!("Cleanup complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_counts_pass_for_both_variants() {
        check_per_image_counts(3, 3, 3, None).unwrap();
        check_per_image_counts(5, 5, 5, Some((5, 5))).unwrap();
        check_per_image_counts(1, 1, 1, Some((1, 1))).unwrap();
    }

    #[test]
    fn stale_per_image_counts_are_rejected() {
        // Left over from a 3-image swapchain after rebuilding with 2 images
        let err = check_per_image_counts(2, 3, 2, None).unwrap_err();
        assert!(err.to_string().contains("3 framebuffers"));

        assert!(check_per_image_counts(4, 4, 3, None).is_err());
        assert!(check_per_image_counts(4, 4, 4, Some((3, 4))).is_err());
        assert!(check_per_image_counts(4, 4, 4, Some((4, 5))).is_err());
    }
}
