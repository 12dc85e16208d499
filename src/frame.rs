// Frame pacing and swapchain recreation
//
// The only stateful scheduling in the program lives here:
// - a ring of N in-flight slots, each with its own fence/semaphore pair
// - the per-iteration acquire -> submit -> present sequence
// - the wait-idle / tear-down / rebuild protocol for stale surfaces
//
// Everything that touches Vulkan sits behind `FrameBackend`, so the ordering
// rules can be exercised without a GPU.

use anyhow::Result;
use ash::vk;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Result of asking the swapchain for its next image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Image acquired. `suboptimal` means it can still be used, but the
    /// swapchain should be rebuilt once this frame is presented.
    Ready { image_index: u32, suboptimal: bool },
    /// Surface no longer matches the swapchain, nothing was acquired.
    Stale,
}

/// Result of handing an image to the presentation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    Suboptimal,
    Stale,
}

/// Result of asking the backend to recreate the swapchain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    Rebuilt,
    /// The surface itself reports a zero extent, so nothing was created
    NoSurfaceArea,
}

/// What one call to [`FrameScheduler::draw_frame`] ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A frame was submitted and presented, swapchain untouched
    Presented,
    /// The swapchain was rebuilt during this iteration
    Rebuilt,
    /// Drawable area is zero; a rebuild is pending and nothing was drawn
    Suspended,
}

/// Resize notification shared between the window event handler and the
/// scheduler. Raising it several times before the next frame still yields a
/// single rebuild.
#[derive(Debug, Clone, Default)]
pub struct ResizeFlag(Arc<AtomicBool>);

impl ResizeFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Read and clear in one step
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// Index into the fixed ring of in-flight frame slots
#[derive(Debug, Clone)]
pub struct FrameRing {
    len: usize,
    current: usize,
}

impl FrameRing {
    pub fn new(len: usize) -> Result<Self> {
        if len == 0 {
            anyhow::bail!("At least one frame must be allowed in flight");
        }
        Ok(Self { len, current: 0 })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn advance(&mut self) {
        self.current = (self.current + 1) % self.len;
    }
}

/// GPU-facing half of the frame loop.
///
/// `slot` is always `< frames_in_flight` and selects the fence/semaphore
/// triple; `image_index` comes from [`FrameBackend::acquire_image`] and selects
/// per-swapchain-image resources.
pub trait FrameBackend {
    /// Current size of the window's drawable area in pixels
    fn drawable_extent(&self) -> vk::Extent2D;

    /// Block until the GPU has finished the previous use of `slot`
    fn wait_for_slot(&mut self, slot: usize) -> Result<()>;

    fn acquire_image(&mut self, slot: usize) -> Result<AcquireOutcome>;

    /// Update per-image data (uniform buffers) before submission
    fn prepare_image(&mut self, image_index: u32) -> Result<()>;

    /// Re-arm the fence of `slot` so the coming submission can signal it
    fn reset_slot(&mut self, slot: usize) -> Result<()>;

    fn submit(&mut self, slot: usize, image_index: u32) -> Result<()>;

    fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome>;

    /// Block until every queue is idle
    fn wait_idle(&mut self) -> Result<()>;

    /// Destroy and recreate everything sized by the swapchain. Every
    /// per-image resource is reallocated for the new image count.
    fn rebuild_swapchain(&mut self) -> Result<RebuildOutcome>;
}

/// Drives one rendering iteration per redraw, keeping at most N frames in
/// flight and rebuilding the swapchain when the surface goes stale.
pub struct FrameScheduler {
    ring: FrameRing,
    resize: ResizeFlag,
    rebuild_pending: bool,
    rebuilds: u64,
}

impl FrameScheduler {
    pub fn new(frames_in_flight: usize, resize: ResizeFlag) -> Result<Self> {
        Ok(Self {
            ring: FrameRing::new(frames_in_flight)?,
            resize,
            rebuild_pending: false,
            rebuilds: 0,
        })
    }

    pub fn current_slot(&self) -> usize {
        self.ring.current()
    }

    pub fn frames_in_flight(&self) -> usize {
        self.ring.len()
    }

    /// Number of completed swapchain rebuilds
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    pub fn rebuild_pending(&self) -> bool {
        self.rebuild_pending
    }

    /// Schedule a rebuild for the start of the next frame. Used when the
    /// window had no drawable area at startup.
    pub fn defer_rebuild(&mut self) {
        self.rebuild_pending = true;
    }

    /// Run one iteration of the frame loop.
    ///
    /// Only the three "surface changed" signals are recovered from; any
    /// error returned by the backend is propagated as fatal.
    pub fn draw_frame<B: FrameBackend>(&mut self, backend: &mut B) -> Result<FrameStatus> {
        if self.rebuild_pending {
            return self.rebuild(backend);
        }

        let slot = self.ring.current();
        backend.wait_for_slot(slot)?;

        let (image_index, acquire_suboptimal) = match backend.acquire_image(slot)? {
            AcquireOutcome::Ready { image_index, suboptimal } => (image_index, suboptimal),
            AcquireOutcome::Stale => {
                // Fence of this slot stays signaled, nothing was submitted
                log::debug!("Swapchain out of date on acquire (slot {})", slot);
                return self.rebuild(backend);
            }
        };

        backend.prepare_image(image_index)?;
        backend.reset_slot(slot)?;
        backend.submit(slot, image_index)?;

        let presented = backend.present(slot, image_index)?;
        let resized = self.resize.take();

        let status = if acquire_suboptimal || resized || presented != PresentOutcome::Presented {
            log::debug!(
                "Rebuild after present (acquire suboptimal: {}, present: {:?}, resized: {})",
                acquire_suboptimal,
                presented,
                resized
            );
            self.rebuild(backend)?
        } else {
            FrameStatus::Presented
        };

        self.ring.advance();
        Ok(status)
    }

    /// Rebuild now if the window has a drawable area, otherwise leave the
    /// rebuild pending and report the loop as suspended.
    fn rebuild<B: FrameBackend>(&mut self, backend: &mut B) -> Result<FrameStatus> {
        self.rebuild_pending = true;

        let extent = backend.drawable_extent();
        if extent.width == 0 || extent.height == 0 {
            log::debug!("Drawable area is empty, deferring swapchain rebuild");
            return Ok(FrameStatus::Suspended);
        }

        backend.wait_idle()?;
        if backend.rebuild_swapchain()? == RebuildOutcome::NoSurfaceArea {
            log::debug!("Surface extent is empty, deferring swapchain rebuild");
            return Ok(FrameStatus::Suspended);
        }

        self.rebuild_pending = false;
        // Any resize raised before this point is satisfied by this rebuild
        self.resize.take();
        self.rebuilds += 1;
        log::info!(
            "Swapchain rebuilt for {}x{} (rebuild #{})",
            extent.width,
            extent.height,
            self.rebuilds
        );

        Ok(FrameStatus::Rebuilt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Wait(usize),
        Acquire(usize),
        Prepare(u32),
        Reset(usize),
        Submit(usize, u32),
        Present(usize, u32),
        WaitIdle,
        Rebuild,
    }

    /// Scripted backend. The GPU finishes a slot's work as soon as the CPU
    /// waits on its fence.
    struct ScriptedBackend {
        extent: vk::Extent2D,
        /// What the surface reports, which can disagree with the window
        surface_has_area: bool,
        image_count: u32,
        /// Image counts handed out by successive rebuilds
        rebuild_image_counts: VecDeque<u32>,
        /// Swapchain generation each per-image resource was allocated for
        image_generation: Vec<u32>,
        generation: u32,
        /// Image count of every completed rebuild
        reallocations: Vec<u32>,
        next_image: u32,
        acquires: VecDeque<AcquireOutcome>,
        presents: VecDeque<PresentOutcome>,
        fence_observed: Vec<bool>,
        fence_armed: Vec<bool>,
        calls: Vec<Call>,
        fail_acquire: bool,
    }

    impl ScriptedBackend {
        fn new(slots: usize) -> Self {
            Self {
                extent: vk::Extent2D { width: 800, height: 600 },
                surface_has_area: true,
                image_count: 3,
                rebuild_image_counts: VecDeque::new(),
                image_generation: vec![0; 3],
                generation: 0,
                reallocations: Vec::new(),
                next_image: 0,
                acquires: VecDeque::new(),
                presents: VecDeque::new(),
                fence_observed: vec![false; slots],
                fence_armed: vec![false; slots],
                calls: Vec::new(),
                fail_acquire: false,
            }
        }

        fn count(&self, wanted: impl Fn(&Call) -> bool) -> usize {
            self.calls.iter().filter(|c| wanted(c)).count()
        }

        /// Panics unless `image_index` names a resource of the live swapchain
        fn check_image(&self, image_index: u32) {
            let generation = self.image_generation.get(image_index as usize);
            assert_eq!(
                generation,
                Some(&self.generation),
                "image {} used with {} images in generation {}",
                image_index,
                self.image_count,
                self.generation
            );
        }

        fn submitted_images(&self) -> Vec<u32> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Submit(_, image) => Some(*image),
                    _ => None,
                })
                .collect()
        }

        fn submitted_slots(&self) -> Vec<usize> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Submit(slot, _) => Some(*slot),
                    _ => None,
                })
                .collect()
        }
    }

    impl FrameBackend for ScriptedBackend {
        fn drawable_extent(&self) -> vk::Extent2D {
            self.extent
        }

        fn wait_for_slot(&mut self, slot: usize) -> Result<()> {
            self.calls.push(Call::Wait(slot));
            self.fence_observed[slot] = true;
            Ok(())
        }

        fn acquire_image(&mut self, slot: usize) -> Result<AcquireOutcome> {
            self.calls.push(Call::Acquire(slot));
            if self.fail_acquire {
                anyhow::bail!("device lost");
            }
            Ok(self.acquires.pop_front().unwrap_or_else(|| {
                let image_index = self.next_image;
                self.next_image = (self.next_image + 1) % self.image_count;
                AcquireOutcome::Ready { image_index, suboptimal: false }
            }))
        }

        fn prepare_image(&mut self, image_index: u32) -> Result<()> {
            self.check_image(image_index);
            self.calls.push(Call::Prepare(image_index));
            Ok(())
        }

        fn reset_slot(&mut self, slot: usize) -> Result<()> {
            assert!(self.fence_observed[slot], "reset of a fence nobody waited on");
            self.calls.push(Call::Reset(slot));
            self.fence_armed[slot] = true;
            Ok(())
        }

        fn submit(&mut self, slot: usize, image_index: u32) -> Result<()> {
            assert!(
                self.fence_observed[slot],
                "submit into slot {} before its previous work was observed complete",
                slot
            );
            assert!(self.fence_armed[slot], "submit with a fence that was not reset");
            self.check_image(image_index);
            self.calls.push(Call::Submit(slot, image_index));
            self.fence_observed[slot] = false;
            self.fence_armed[slot] = false;
            Ok(())
        }

        fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome> {
            self.check_image(image_index);
            self.calls.push(Call::Present(slot, image_index));
            Ok(self.presents.pop_front().unwrap_or(PresentOutcome::Presented))
        }

        fn wait_idle(&mut self) -> Result<()> {
            self.calls.push(Call::WaitIdle);
            // Idle device means every fence has signaled
            self.fence_observed.iter_mut().for_each(|f| *f = true);
            Ok(())
        }

        fn rebuild_swapchain(&mut self) -> Result<RebuildOutcome> {
            assert_eq!(self.calls.last(), Some(&Call::WaitIdle), "rebuild without wait-idle");
            self.calls.push(Call::Rebuild);

            // Old per-image resources are gone either way
            self.generation += 1;
            self.image_generation.clear();
            if !self.surface_has_area {
                return Ok(RebuildOutcome::NoSurfaceArea);
            }

            if let Some(count) = self.rebuild_image_counts.pop_front() {
                self.image_count = count;
            }
            self.image_generation = vec![self.generation; self.image_count as usize];
            self.reallocations.push(self.image_count);
            self.next_image = 0;
            Ok(RebuildOutcome::Rebuilt)
        }
    }

    fn scheduler(slots: usize) -> (FrameScheduler, ResizeFlag) {
        let resize = ResizeFlag::new();
        (FrameScheduler::new(slots, resize.clone()).unwrap(), resize)
    }

    #[test]
    fn zero_frames_in_flight_is_rejected() {
        assert!(FrameRing::new(0).is_err());
        assert!(FrameScheduler::new(0, ResizeFlag::new()).is_err());
    }

    #[test]
    fn slot_index_cycles_through_every_slot() {
        for n in [1usize, 2, 3, 5] {
            let (mut scheduler, _) = scheduler(n);
            let mut backend = ScriptedBackend::new(n);

            for _ in 0..n * 4 {
                assert_eq!(scheduler.draw_frame(&mut backend).unwrap(), FrameStatus::Presented);
            }

            let expected: Vec<usize> = (0..n * 4).map(|i| i % n).collect();
            assert_eq!(backend.submitted_slots(), expected, "n = {}", n);
            assert_eq!(scheduler.current_slot(), 0);
        }
    }

    #[test]
    fn iteration_follows_wait_acquire_reset_submit_present() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = ScriptedBackend::new(2);

        scheduler.draw_frame(&mut backend).unwrap();

        assert_eq!(
            backend.calls,
            vec![
                Call::Wait(0),
                Call::Acquire(0),
                Call::Prepare(0),
                Call::Reset(0),
                Call::Submit(0, 0),
                Call::Present(0, 0),
            ]
        );
        assert_eq!(scheduler.current_slot(), 1);
    }

    #[test]
    fn stale_acquire_skips_submission() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = ScriptedBackend::new(2);
        backend.acquires.push_back(AcquireOutcome::Stale);

        let status = scheduler.draw_frame(&mut backend).unwrap();

        assert_eq!(status, FrameStatus::Rebuilt);
        assert_eq!(
            backend.calls,
            vec![Call::Wait(0), Call::Acquire(0), Call::WaitIdle, Call::Rebuild]
        );
        // The skipped iteration does not consume a slot
        assert_eq!(scheduler.current_slot(), 0);

        // Next frame goes through normally on the same slot
        assert_eq!(scheduler.draw_frame(&mut backend).unwrap(), FrameStatus::Presented);
        assert_eq!(backend.submitted_slots(), vec![0]);
    }

    #[test]
    fn suboptimal_acquire_presents_then_rebuilds() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = ScriptedBackend::new(2);
        backend
            .acquires
            .push_back(AcquireOutcome::Ready { image_index: 1, suboptimal: true });

        let status = scheduler.draw_frame(&mut backend).unwrap();

        assert_eq!(status, FrameStatus::Rebuilt);
        assert_eq!(
            &backend.calls[3..],
            &[Call::Reset(0), Call::Submit(0, 1), Call::Present(0, 1), Call::WaitIdle, Call::Rebuild]
        );
        assert_eq!(scheduler.current_slot(), 1);
    }

    #[test]
    fn stale_or_suboptimal_present_rebuilds() {
        for outcome in [PresentOutcome::Stale, PresentOutcome::Suboptimal] {
            let (mut scheduler, _) = scheduler(2);
            let mut backend = ScriptedBackend::new(2);
            backend.presents.push_back(outcome);

            assert_eq!(scheduler.draw_frame(&mut backend).unwrap(), FrameStatus::Rebuilt);
            assert_eq!(backend.count(|c| *c == Call::Rebuild), 1);
            assert_eq!(scheduler.current_slot(), 1);
        }
    }

    #[test]
    fn resize_notifications_collapse_into_one_rebuild() {
        let (mut scheduler, resize) = scheduler(2);
        let mut backend = ScriptedBackend::new(2);

        resize.raise();
        resize.raise();
        resize.raise();

        assert_eq!(scheduler.draw_frame(&mut backend).unwrap(), FrameStatus::Rebuilt);
        assert_eq!(scheduler.draw_frame(&mut backend).unwrap(), FrameStatus::Presented);
        assert_eq!(backend.count(|c| *c == Call::Rebuild), 1);
        assert_eq!(scheduler.rebuilds(), 1);
        assert!(!resize.is_raised());
    }

    #[test]
    fn resize_during_stale_rebuild_is_not_repeated() {
        let (mut scheduler, resize) = scheduler(2);
        let mut backend = ScriptedBackend::new(2);
        backend.acquires.push_back(AcquireOutcome::Stale);
        resize.raise();

        assert_eq!(scheduler.draw_frame(&mut backend).unwrap(), FrameStatus::Rebuilt);
        assert_eq!(scheduler.draw_frame(&mut backend).unwrap(), FrameStatus::Presented);
        assert_eq!(backend.count(|c| *c == Call::Rebuild), 1);
    }

    #[test]
    fn minimized_window_suspends_rebuild_without_gpu_calls() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = ScriptedBackend::new(2);
        backend.acquires.push_back(AcquireOutcome::Stale);
        backend.extent = vk::Extent2D { width: 0, height: 0 };

        assert_eq!(scheduler.draw_frame(&mut backend).unwrap(), FrameStatus::Suspended);
        assert!(scheduler.rebuild_pending());
        assert_eq!(backend.calls, vec![Call::Wait(0), Call::Acquire(0)]);

        // Still minimized: no GPU work at all
        backend.calls.clear();
        for _ in 0..5 {
            assert_eq!(scheduler.draw_frame(&mut backend).unwrap(), FrameStatus::Suspended);
        }
        assert!(backend.calls.is_empty());

        // Restored: the pending rebuild runs first
        backend.extent = vk::Extent2D { width: 640, height: 480 };
        assert_eq!(scheduler.draw_frame(&mut backend).unwrap(), FrameStatus::Rebuilt);
        assert_eq!(backend.calls, vec![Call::WaitIdle, Call::Rebuild]);
        assert!(!scheduler.rebuild_pending());

        assert_eq!(scheduler.draw_frame(&mut backend).unwrap(), FrameStatus::Presented);
    }

    #[test]
    fn one_dimension_zero_counts_as_minimized() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = ScriptedBackend::new(2);
        backend.extent = vk::Extent2D { width: 1024, height: 0 };
        scheduler.defer_rebuild();

        assert_eq!(scheduler.draw_frame(&mut backend).unwrap(), FrameStatus::Suspended);
        assert!(backend.calls.is_empty());
    }

    #[test]
    fn startup_without_drawable_area_blocks_instead_of_building() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = ScriptedBackend::new(2);
        backend.extent = vk::Extent2D { width: 0, height: 0 };
        scheduler.defer_rebuild();

        assert_eq!(scheduler.draw_frame(&mut backend).unwrap(), FrameStatus::Suspended);
        assert_eq!(backend.count(|c| *c == Call::Rebuild), 0);

        backend.extent = vk::Extent2D { width: 1, height: 1 };
        assert_eq!(scheduler.draw_frame(&mut backend).unwrap(), FrameStatus::Rebuilt);
        assert_eq!(scheduler.draw_frame(&mut backend).unwrap(), FrameStatus::Presented);
    }

    #[test]
    fn minimize_after_present_still_advances_slot() {
        let (mut scheduler, resize) = scheduler(2);
        let mut backend = ScriptedBackend::new(2);
        resize.raise();
        backend.extent = vk::Extent2D { width: 0, height: 0 };

        assert_eq!(scheduler.draw_frame(&mut backend).unwrap(), FrameStatus::Suspended);
        assert_eq!(backend.submitted_slots(), vec![0]);
        assert_eq!(scheduler.current_slot(), 1);
        assert!(scheduler.rebuild_pending());
    }

    #[test]
    fn empty_surface_extent_suspends_even_with_sized_window() {
        let (mut scheduler, resize) = scheduler(2);
        let mut backend = ScriptedBackend::new(2);
        backend.surface_has_area = false;
        resize.raise();

        assert_eq!(scheduler.draw_frame(&mut backend).unwrap(), FrameStatus::Suspended);
        assert!(scheduler.rebuild_pending());
        assert_eq!(scheduler.rebuilds(), 0);
        assert!(backend.reallocations.is_empty());

        // Nothing is acquired while the rebuild is outstanding
        backend.calls.clear();
        assert_eq!(scheduler.draw_frame(&mut backend).unwrap(), FrameStatus::Suspended);
        assert_eq!(backend.calls, vec![Call::WaitIdle, Call::Rebuild]);

        backend.surface_has_area = true;
        assert_eq!(scheduler.draw_frame(&mut backend).unwrap(), FrameStatus::Rebuilt);
        assert!(!scheduler.rebuild_pending());
        assert_eq!(scheduler.rebuilds(), 1);
        assert_eq!(scheduler.draw_frame(&mut backend).unwrap(), FrameStatus::Presented);
    }

    #[test]
    fn per_image_resources_follow_image_count_across_rebuilds() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = ScriptedBackend::new(2);
        let counts = [2u32, 5, 1, 4];
        backend.rebuild_image_counts.extend(counts);

        for &count in &counts {
            backend.presents.push_back(PresentOutcome::Stale);
            assert_eq!(scheduler.draw_frame(&mut backend).unwrap(), FrameStatus::Rebuilt);
            assert_eq!(backend.image_generation.len(), count as usize);

            // Prepare/submit/present check every index against the live generation
            backend.calls.clear();
            for _ in 0..count * 3 {
                assert_eq!(scheduler.draw_frame(&mut backend).unwrap(), FrameStatus::Presented);
            }
            let mut used = backend.submitted_images();
            used.sort_unstable();
            used.dedup();
            assert_eq!(used, (0..count).collect::<Vec<_>>());
        }

        assert_eq!(backend.reallocations, counts.to_vec());
        assert_eq!(scheduler.rebuilds(), counts.len() as u64);
    }

    #[test]
    fn mixed_signals_never_overrun_a_slot() {
        // The scripted backend asserts on every submit that the slot's fence
        // was observed and re-armed.
        let (mut scheduler, resize) = scheduler(3);
        let mut backend = ScriptedBackend::new(3);

        for i in 0..60u32 {
            match i % 7 {
                0 => backend.acquires.push_back(AcquireOutcome::Stale),
                3 => backend
                    .acquires
                    .push_back(AcquireOutcome::Ready { image_index: i % 3, suboptimal: true }),
                5 => backend.presents.push_back(PresentOutcome::Stale),
                6 => resize.raise(),
                _ => {}
            }
            scheduler.draw_frame(&mut backend).unwrap();
        }

        assert!(backend.submitted_slots().len() > 40);
    }

    #[test]
    fn backend_errors_are_fatal() {
        let (mut scheduler, _) = scheduler(2);
        let mut backend = ScriptedBackend::new(2);
        backend.fail_acquire = true;

        let err = scheduler.draw_frame(&mut backend).unwrap_err();
        assert!(err.to_string().contains("device lost"));
        assert_eq!(backend.count(|c| matches!(c, Call::Submit(..))), 0);
    }

    #[test]
    fn resize_flag_take_clears() {
        let flag = ResizeFlag::new();
        let shared = flag.clone();
        assert!(!flag.take());
        shared.raise();
        assert!(flag.is_raised());
        assert!(flag.take());
        assert!(!flag.take());
    }
}
