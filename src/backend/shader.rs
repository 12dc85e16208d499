// Shader module loading
//
// Vulkan consumes SPIR-V bytecode. The binaries are produced by build.rs
// (glslc) and read from disk at startup.

use anyhow::{Context, Result};
use ash::vk;
use std::io::Cursor;
use std::path::Path;
use super::VulkanDevice;

/// Decode SPIR-V bytes into 32-bit words (checks magic number and alignment)
pub fn decode_spirv(bytes: &[u8]) -> Result<Vec<u32>> {
    ash::util::read_spv(&mut Cursor::new(bytes)).context("Invalid SPIR-V bytecode")
}

/// Read a SPIR-V file and create a shader module from it
pub fn load_shader_module<P: AsRef<Path>>(device: &VulkanDevice, path: P) -> Result<vk::ShaderModule> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read shader {:?}", path))?;
    log::info!("Loaded shader {:?} ({} bytes)", path, bytes.len());

    let code = decode_spirv(&bytes).with_context(|| format!("Shader {:?}", path))?;
    create_shader_module(device, &code)
}

pub fn create_shader_module(device: &VulkanDevice, code: &[u32]) -> Result<vk::ShaderModule> {
    let create_info = vk::ShaderModuleCreateInfo::builder().code(code);

    unsafe {
        device
            .device
            .create_shader_module(&create_info, None)
            .context("Failed to create shader module")
    }
}
