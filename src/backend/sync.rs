// Synchronization primitives
//
// One fence + semaphore pair per frame in flight. The count is fixed at
// startup and does not depend on how many images the swapchain has.

use ash::vk;
use anyhow::{Context, Result};
use super::VulkanDevice;

/// Frame synchronization - one per frame in flight
pub struct FrameSync {
    /// Signaled by the presentation engine when the acquired image is ready
    pub image_available: vk::Semaphore,
    /// Signaled by the queue when this slot's commands finished
    pub render_finished: vk::Semaphore,
    /// CPU-visible completion of this slot's submission
    pub in_flight_fence: vk::Fence,
}

impl FrameSync {
    pub fn new(device: &VulkanDevice) -> Result<Self> {
        let semaphore_info = vk::SemaphoreCreateInfo::builder();
        let fence_info = vk::FenceCreateInfo::builder()
            .flags(vk::FenceCreateFlags::SIGNALED); // Start signaled

        unsafe {
            Ok(Self {
                image_available: device
                    .device
                    .create_semaphore(&semaphore_info, None)
                    .context("Failed to create image available semaphore")?,
                render_finished: device
                    .device
                    .create_semaphore(&semaphore_info, None)
                    .context("Failed to create render finished semaphore")?,
                in_flight_fence: device
                    .device
                    .create_fence(&fence_info, None)
                    .context("Failed to create in-flight fence")?,
            })
        }
    }

    /// One sync triple per in-flight slot
    pub fn create_ring(device: &VulkanDevice, frames_in_flight: usize) -> Result<Vec<Self>> {
        (0..frames_in_flight).map(|_| Self::new(device)).collect()
    }

    pub fn destroy(&self, device: &ash::Device) {
        unsafe {
            device.destroy_semaphore(self.image_available, None);
            device.destroy_semaphore(self.render_finished, None);
            device.destroy_fence(self.in_flight_fence, None);
        }
    }
}
