// Scene data - quad geometry and per-frame transforms
//
// Vertex layout and uniform block must match shaders/quad.vert exactly.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use std::mem::{offset_of, size_of};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 2],
    pub color: [f32; 3],
    pub tex_coord: [f32; 2],
}

impl Vertex {
    pub const fn new(pos: [f32; 2], color: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self { pos, color, tex_coord }
    }

    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 3] {
        [
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 0,
                format: vk::Format::R32G32_SFLOAT,
                offset: offset_of!(Self, pos) as u32,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 1,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Self, color) as u32,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 2,
                format: vk::Format::R32G32_SFLOAT,
                offset: offset_of!(Self, tex_coord) as u32,
            },
        ]
    }
}

pub const QUAD_VERTICES: [Vertex; 4] = [
    Vertex::new([-0.5, -0.5], [1.0, 0.0, 0.0], [1.0, 0.0]),
    Vertex::new([0.5, -0.5], [0.0, 1.0, 0.0], [0.0, 0.0]),
    Vertex::new([0.5, 0.5], [0.0, 0.0, 1.0], [0.0, 1.0]),
    Vertex::new([-0.5, 0.5], [1.0, 1.0, 1.0], [1.0, 1.0]),
];

pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// Degrees of rotation about Z per second
const SPIN_RATE_DEG: f32 = 90.0;
const FOV_Y_DEG: f32 = 45.0;
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 10.0;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct UniformBufferObject {
    pub model: Mat4,
    pub view: Mat4,
    pub proj: Mat4,
}

impl UniformBufferObject {
    /// Transforms for the quad `elapsed_secs` after startup, looking at it
    /// from (2, 2, 2) with Z up.
    pub fn animated(elapsed_secs: f32, extent: vk::Extent2D) -> Self {
        let model = Mat4::from_rotation_z(elapsed_secs * SPIN_RATE_DEG.to_radians());
        let view = Mat4::look_at_rh(Vec3::splat(2.0), Vec3::ZERO, Vec3::Z);

        let aspect = extent.width as f32 / extent.height.max(1) as f32;
        let mut proj = Mat4::perspective_rh(FOV_Y_DEG.to_radians(), aspect, Z_NEAR, Z_FAR);
        // Vulkan clip space has Y pointing down
        proj.y_axis.y *= -1.0;

        Self { model, view, proj }
    }

    pub const fn size() -> vk::DeviceSize {
        size_of::<Self>() as vk::DeviceSize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec4;

    fn extent(width: u32, height: u32) -> vk::Extent2D {
        vk::Extent2D { width, height }
    }

    #[test]
    fn vertex_layout_matches_shader() {
        let binding = Vertex::binding_description();
        assert_eq!(binding.stride, 28);

        let attrs = Vertex::attribute_descriptions();
        let offsets: Vec<u32> = attrs.iter().map(|a| a.offset).collect();
        let locations: Vec<u32> = attrs.iter().map(|a| a.location).collect();
        assert_eq!(offsets, vec![0, 8, 20]);
        assert_eq!(locations, vec![0, 1, 2]);
    }

    #[test]
    fn quad_indices_stay_in_range() {
        assert!(QUAD_INDICES.iter().all(|&i| (i as usize) < QUAD_VERTICES.len()));
    }

    #[test]
    fn uniform_block_is_three_matrices() {
        assert_eq!(UniformBufferObject::size(), 3 * 64);
    }

    #[test]
    fn model_is_identity_at_start() {
        let ubo = UniformBufferObject::animated(0.0, extent(800, 600));
        assert_eq!(ubo.model, Mat4::IDENTITY);
    }

    #[test]
    fn model_turns_quarter_circle_per_second() {
        let ubo = UniformBufferObject::animated(1.0, extent(800, 600));
        let x = ubo.model * Vec4::X;
        assert_relative_eq!(x.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(x.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn camera_sits_at_two_two_two() {
        let ubo = UniformBufferObject::animated(0.0, extent(800, 600));
        let eye = ubo.view * Vec4::new(2.0, 2.0, 2.0, 1.0);
        assert_relative_eq!(eye.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(eye.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(eye.z, 0.0, epsilon = 1e-5);

        // The origin is straight ahead, down the negative Z axis
        let target = ubo.view * Vec4::W;
        assert_relative_eq!(target.z, -(12.0f32).sqrt(), epsilon = 1e-5);
    }

    #[test]
    fn projection_uses_aspect_and_flips_y() {
        let ubo = UniformBufferObject::animated(0.0, extent(800, 600));
        let focal = 1.0 / (FOV_Y_DEG.to_radians() / 2.0).tan();
        assert_relative_eq!(ubo.proj.y_axis.y, -focal, epsilon = 1e-5);
        assert_relative_eq!(ubo.proj.x_axis.x, focal * 600.0 / 800.0, epsilon = 1e-5);
    }

    #[test]
    fn zero_height_does_not_produce_nan() {
        let ubo = UniformBufferObject::animated(0.0, extent(800, 0));
        assert!(ubo.proj.is_finite());
    }
}
