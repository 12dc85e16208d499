// Backend module - Vulkan abstraction layer
//
// Thin wrappers around ash. Long-lived objects (device, swapchain) clean up
// in Drop; per-swapchain handles are plain values destroyed explicitly by the
// renderer so the teardown order stays visible in one place.

pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod device;
pub mod pipeline;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod texture;

pub use device::VulkanDevice;
pub use swapchain::Swapchain;

use anyhow::Result;

/// Create `count` objects in order. If any creation fails, the objects made
/// so far are handed to `destroy` before the error is returned.
pub fn create_each<T>(
    count: usize,
    mut create: impl FnMut(usize) -> Result<T>,
    mut destroy: impl FnMut(T),
) -> Result<Vec<T>> {
    let mut created = Vec::with_capacity(count);
    for i in 0..count {
        match create(i) {
            Ok(object) => created.push(object),
            Err(e) => {
                created.into_iter().rev().for_each(&mut destroy);
                return Err(e);
            }
        }
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    #[test]
    fn create_each_returns_everything_in_order() {
        let mut destroyed = Vec::new();
        let made = create_each(4, |i| Ok(i * 10), |x| destroyed.push(x)).unwrap();
        assert_eq!(made, vec![0, 10, 20, 30]);
        assert!(destroyed.is_empty());
    }

    #[test]
    fn partial_failure_releases_earlier_objects() {
        let mut destroyed = Vec::new();
        let result = create_each(
            5,
            |i| if i == 3 { bail!("out of memory") } else { Ok(i) },
            |x| destroyed.push(x),
        );
        assert_eq!(result.unwrap_err().to_string(), "out of memory");
        assert_eq!(destroyed, vec![2, 1, 0]);
    }

    #[test]
    fn failure_on_first_object_destroys_nothing() {
        let mut destroyed: Vec<usize> = Vec::new();
        let result = create_each(3, |_| -> Result<usize> { bail!("nope") }, |x| destroyed.push(x));
        assert!(result.is_err());
        assert!(destroyed.is_empty());
    }
}
