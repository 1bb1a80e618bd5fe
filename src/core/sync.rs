//! Per-frame synchronization objects. Fences and acquire semaphores are
//! keyed by the frame-in-flight index; render-finished semaphores are keyed
//! by swapchain image, since presentation waits on whichever image was
//! acquired, not on the frame that recorded it.

use anyhow::Result;
use ash::vk;

pub struct FrameSync {
    image_available: Vec<vk::Semaphore>,
    render_finished: Vec<vk::Semaphore>,
    in_flight: Vec<vk::Fence>,
}

impl FrameSync {
    pub unsafe fn new(
        device: &ash::Device,
        frames_in_flight: usize,
        image_count: usize,
    ) -> Result<Self> {
        let semaphore_info = vk::SemaphoreCreateInfo::default();
        let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);

        let mut image_available = Vec::with_capacity(frames_in_flight);
        let mut in_flight = Vec::with_capacity(frames_in_flight);
        for _ in 0..frames_in_flight {
            image_available.push(device.create_semaphore(&semaphore_info, None)?);
            in_flight.push(device.create_fence(&fence_info, None)?);
        }

        let mut render_finished = Vec::with_capacity(image_count);
        for _ in 0..image_count {
            render_finished.push(device.create_semaphore(&semaphore_info, None)?);
        }

        Ok(Self {
            image_available,
            render_finished,
            in_flight,
        })
    }

    pub fn image_available(&self, frame: usize) -> vk::Semaphore {
        self.image_available[frame]
    }

    /// Semaphore signaled by the submit that renders to `image_index` and
    /// waited on by the present of that image.
    pub fn render_finished(&self, image_index: usize) -> vk::Semaphore {
        self.render_finished[image_index]
    }

    pub fn fence(&self, frame: usize) -> vk::Fence {
        self.in_flight[frame]
    }

    pub fn image_count(&self) -> usize {
        self.render_finished.len()
    }

    /// Rebuild the per-image semaphores after swapchain recreation. The
    /// caller has already waited for the device to go idle, so none of the
    /// old semaphores are pending.
    pub unsafe fn recreate_per_image(
        &mut self,
        device: &ash::Device,
        image_count: usize,
    ) -> Result<()> {
        for &semaphore in &self.render_finished {
            device.destroy_semaphore(semaphore, None);
        }
        self.render_finished.clear();

        let semaphore_info = vk::SemaphoreCreateInfo::default();
        for _ in 0..image_count {
            self.render_finished
                .push(device.create_semaphore(&semaphore_info, None)?);
        }
        Ok(())
    }

    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        for &semaphore in &self.image_available {
            device.destroy_semaphore(semaphore, None);
        }
        for &semaphore in &self.render_finished {
            device.destroy_semaphore(semaphore, None);
        }
        for &fence in &self.in_flight {
            device.destroy_fence(fence, None);
        }
        self.image_available.clear();
        self.render_finished.clear();
        self.in_flight.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn sync_with(frames: usize, images: usize) -> FrameSync {
        FrameSync {
            image_available: (0..frames)
                .map(|i| vk::Semaphore::from_raw(0x100 + i as u64))
                .collect(),
            render_finished: (0..images)
                .map(|i| vk::Semaphore::from_raw(0x200 + i as u64))
                .collect(),
            in_flight: (0..frames)
                .map(|i| vk::Fence::from_raw(0x300 + i as u64))
                .collect(),
        }
    }

    #[test]
    fn test_render_finished_keyed_by_image() {
        // Two frames in flight but four swapchain images: presentation of
        // image 3 must wait on image 3's semaphore, which does not exist
        // if semaphores are allocated per frame.
        let sync = sync_with(2, 4);

        assert_eq!(sync.image_count(), 4);
        assert_eq!(sync.render_finished(3).as_raw(), 0x203);
        assert_ne!(sync.render_finished(0), sync.render_finished(1));

        // Frame-keyed objects stay frame-keyed
        assert_eq!(sync.image_available(1).as_raw(), 0x101);
        assert_eq!(sync.fence(0).as_raw(), 0x300);
    }
}
