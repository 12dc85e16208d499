// Textures - image loading, layout transitions and sampling
//
// The texture is decoded on the CPU, staged through a host-visible buffer and
// copied into an optimal-tiling device-local image.

use anyhow::{Context, Result};
use ash::vk;
use std::path::Path;
use super::buffer::{self, find_memory_type};
use super::command;
use super::VulkanDevice;

pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;
const MAX_ANISOTROPY: f32 = 16.0;

/// Decoded RGBA8 pixels
pub struct RgbaImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Decode any supported image file into tightly packed RGBA8
pub fn load_rgba<P: AsRef<Path>>(path: P) -> Result<RgbaImage> {
    let path = path.as_ref();
    let image = image::open(path)
        .with_context(|| format!("Failed to load texture image {:?}", path))?
        .to_rgba8();

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        anyhow::bail!("Texture {:?} has no pixels", path);
    }

    log::info!("Loaded texture {:?} ({}x{})", path, width, height);

    Ok(RgbaImage { width, height, pixels: image.into_raw() })
}

/// Access masks and pipeline stages for one layout transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutTransition {
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
}

/// Only the two transitions a texture upload needs are supported
pub fn layout_transition(old: vk::ImageLayout, new: vk::ImageLayout) -> Result<LayoutTransition> {
    match (old, new) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => Ok(LayoutTransition {
            src_access: vk::AccessFlags::empty(),
            dst_access: vk::AccessFlags::TRANSFER_WRITE,
            src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
            dst_stage: vk::PipelineStageFlags::TRANSFER,
        }),
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => {
            Ok(LayoutTransition {
                src_access: vk::AccessFlags::TRANSFER_WRITE,
                dst_access: vk::AccessFlags::SHADER_READ,
                src_stage: vk::PipelineStageFlags::TRANSFER,
                dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
            })
        }
        _ => anyhow::bail!("Unsupported layout transition {:?} -> {:?}", old, new),
    }
}

pub fn create_image(
    device: &VulkanDevice,
    width: u32,
    height: u32,
    format: vk::Format,
    tiling: vk::ImageTiling,
    usage: vk::ImageUsageFlags,
    properties: vk::MemoryPropertyFlags,
) -> Result<(vk::Image, vk::DeviceMemory)> {
    let image_info = vk::ImageCreateInfo::builder()
        .image_type(vk::ImageType::TYPE_2D)
        .extent(vk::Extent3D { width, height, depth: 1 })
        .mip_levels(1)
        .array_layers(1)
        .format(format)
        .tiling(tiling)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .usage(usage)
        .samples(vk::SampleCountFlags::TYPE_1)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);

    let image = unsafe {
        device.device.create_image(&image_info, None)
            .context("Failed to create image")?
    };

    let mem_requirements = unsafe { device.device.get_image_memory_requirements(image) };
    let memory_type_index = find_memory_type(
        &device.memory_properties,
        mem_requirements.memory_type_bits,
        properties,
    )?;

    let alloc_info = vk::MemoryAllocateInfo::builder()
        .allocation_size(mem_requirements.size)
        .memory_type_index(memory_type_index);

    let memory = unsafe {
        device.device.allocate_memory(&alloc_info, None)
            .context("Failed to allocate image memory")?
    };

    unsafe {
        device.device.bind_image_memory(image, memory, 0)
            .context("Failed to bind image memory")?;
    }

    Ok((image, memory))
}

/// Single-mip, single-layer color view
pub fn create_image_view(
    device: &VulkanDevice,
    image: vk::Image,
    format: vk::Format,
) -> Result<vk::ImageView> {
    let create_info = vk::ImageViewCreateInfo::builder()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        })
        .subresource_range(color_subresource_range());

    unsafe {
        device.device.create_image_view(&create_info, None)
            .context("Failed to create image view")
    }
}

fn color_subresource_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

pub fn transition_image_layout(
    device: &VulkanDevice,
    command_pool: vk::CommandPool,
    image: vk::Image,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> Result<()> {
    let transition = layout_transition(old_layout, new_layout)?;

    let barrier = vk::ImageMemoryBarrier::builder()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(color_subresource_range())
        .src_access_mask(transition.src_access)
        .dst_access_mask(transition.dst_access)
        .build();

    command::one_shot(device, command_pool, |cmd| unsafe {
        device.device.cmd_pipeline_barrier(
            cmd,
            transition.src_stage,
            transition.dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    })
}

pub fn copy_buffer_to_image(
    device: &VulkanDevice,
    command_pool: vk::CommandPool,
    buffer: vk::Buffer,
    image: vk::Image,
    width: u32,
    height: u32,
) -> Result<()> {
    let region = vk::BufferImageCopy::builder()
        .buffer_offset(0)
        .buffer_row_length(0)
        .buffer_image_height(0)
        .image_subresource(vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        })
        .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
        .image_extent(vk::Extent3D { width, height, depth: 1 })
        .build();

    command::one_shot(device, command_pool, |cmd| unsafe {
        device.device.cmd_copy_buffer_to_image(
            cmd,
            buffer,
            image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[region],
        );
    })
}

/// Anisotropy requested by the sampler, limited by what the device allows
pub fn sampler_anisotropy(device_limit: f32) -> f32 {
    MAX_ANISOTROPY.min(device_limit).max(1.0)
}

pub fn create_sampler(device: &VulkanDevice) -> Result<vk::Sampler> {
    let anisotropy = sampler_anisotropy(device.properties.limits.max_sampler_anisotropy);

    let sampler_info = vk::SamplerCreateInfo::builder()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .address_mode_u(vk::SamplerAddressMode::REPEAT)
        .address_mode_v(vk::SamplerAddressMode::REPEAT)
        .address_mode_w(vk::SamplerAddressMode::REPEAT)
        .anisotropy_enable(true)
        .max_anisotropy(anisotropy)
        .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
        .unnormalized_coordinates(false)
        .compare_enable(false)
        .compare_op(vk::CompareOp::ALWAYS)
        .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
        .mip_lod_bias(0.0)
        .min_lod(0.0)
        .max_lod(0.0);

    unsafe {
        device.device.create_sampler(&sampler_info, None)
            .context("Failed to create texture sampler")
    }
}

/// Sampled texture: image, memory, view and sampler
pub struct Texture {
    pub image: vk::Image,
    pub memory: vk::DeviceMemory,
    pub view: vk::ImageView,
    pub sampler: vk::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Load an image file and upload it to a shader-readable device-local image
    pub fn load<P: AsRef<Path>>(
        device: &VulkanDevice,
        command_pool: vk::CommandPool,
        path: P,
    ) -> Result<Self> {
        let rgba = load_rgba(path)?;
        Self::from_rgba(device, command_pool, &rgba)
    }

    pub fn from_rgba(
        device: &VulkanDevice,
        command_pool: vk::CommandPool,
        rgba: &RgbaImage,
    ) -> Result<Self> {
        let staging = buffer::create_buffer_with_data(
            device,
            vk::BufferUsageFlags::TRANSFER_SRC,
            &rgba.pixels,
        )?;

        let uploaded = Self::upload(device, command_pool, staging.buffer, rgba.width, rgba.height);
        staging.destroy(&device.device);
        let (image, memory) = uploaded?;

        let view = create_image_view(device, image, TEXTURE_FORMAT)?;
        let sampler = create_sampler(device)?;

        Ok(Self {
            image,
            memory,
            view,
            sampler,
            width: rgba.width,
            height: rgba.height,
        })
    }

    fn upload(
        device: &VulkanDevice,
        command_pool: vk::CommandPool,
        staging: vk::Buffer,
        width: u32,
        height: u32,
    ) -> Result<(vk::Image, vk::DeviceMemory)> {
        let (image, memory) = create_image(
            device,
            width,
            height,
            TEXTURE_FORMAT,
            vk::ImageTiling::OPTIMAL,
            vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        transition_image_layout(
            device,
            command_pool,
            image,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        )?;
        copy_buffer_to_image(device, command_pool, staging, image, width, height)?;
        transition_image_layout(
            device,
            command_pool,
            image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )?;

        Ok((image, memory))
    }

    pub fn destroy(&self, device: &ash::Device) {
        unsafe {
            device.destroy_sampler(self.sampler, None);
            device.destroy_image_view(self.view, None);
            device.destroy_image(self.image, None);
            device.free_memory(self.memory, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_transitions() {
        let to_transfer =
            layout_transition(vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .unwrap();
        assert_eq!(to_transfer.src_access, vk::AccessFlags::empty());
        assert_eq!(to_transfer.dst_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(to_transfer.src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(to_transfer.dst_stage, vk::PipelineStageFlags::TRANSFER);

        let to_shader = layout_transition(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )
        .unwrap();
        assert_eq!(to_shader.src_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(to_shader.dst_access, vk::AccessFlags::SHADER_READ);
        assert_eq!(to_shader.src_stage, vk::PipelineStageFlags::TRANSFER);
        assert_eq!(to_shader.dst_stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
    }

    #[test]
    fn other_transitions_are_rejected() {
        assert!(layout_transition(
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
        )
        .is_err());
        assert!(layout_transition(
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL
        )
        .is_err());
    }

    #[test]
    fn anisotropy_is_clamped_to_device_limit() {
        assert_eq!(sampler_anisotropy(16.0), 16.0);
        assert_eq!(sampler_anisotropy(64.0), 16.0);
        assert_eq!(sampler_anisotropy(4.0), 4.0);
        assert_eq!(sampler_anisotropy(0.0), 1.0);
    }

    #[test]
    fn decodes_png_to_rgba8() {
        let path = std::env::temp_dir().join(format!("vulkan-test-{}.png", std::process::id()));
        let mut img = image::RgbImage::new(3, 2);
        img.put_pixel(0, 0, image::Rgb([255, 0, 0]));
        img.save(&path).unwrap();

        let rgba = load_rgba(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!((rgba.width, rgba.height), (3, 2));
        assert_eq!(rgba.pixels.len(), 3 * 2 * 4);
        assert_eq!(&rgba.pixels[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn missing_texture_is_an_error() {
        assert!(load_rgba("does/not/exist.png").is_err());
    }
}
