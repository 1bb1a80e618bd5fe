use ash::vk;
use winit::window::Window;

/// Swapchain plus the per-image views the samples render into.
pub struct SwapchainManager {
    pub swapchain: vk::SwapchainKHR,
    pub swapchain_loader: ash::khr::swapchain::Device,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

impl SwapchainManager {
    pub unsafe fn new(
        window: &Window,
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: &ash::Device,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        graphics_family: u32,
        present_family: u32,
    ) -> anyhow::Result<Self> {
        let swapchain_loader = ash::khr::swapchain::Device::new(instance, device);

        let (swapchain, images, format, extent) = Self::create_swapchain_internal(
            window,
            physical_device,
            surface_loader,
            surface,
            &swapchain_loader,
            graphics_family,
            present_family,
            vk::SwapchainKHR::null(),
        )?;

        let image_views = Self::create_image_views(device, &images, format)?;

        Ok(Self {
            swapchain,
            swapchain_loader,
            images,
            image_views,
            format,
            extent,
        })
    }

    /// Rebuild the swapchain after a resize. The current swapchain is passed
    /// as `old_swapchain` so the driver retires it instead of seeing a second
    /// non-retired swapchain on the same surface, then destroyed once the
    /// new one exists. Image views must already be gone via
    /// [`Self::cleanup_image_views`].
    pub unsafe fn recreate(
        &mut self,
        window: &Window,
        physical_device: vk::PhysicalDevice,
        device: &ash::Device,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        graphics_family: u32,
        present_family: u32,
    ) -> anyhow::Result<()> {
        let (swapchain, images, format, extent) = Self::create_swapchain_internal(
            window,
            physical_device,
            surface_loader,
            surface,
            &self.swapchain_loader,
            graphics_family,
            present_family,
            self.swapchain,
        )?;

        self.swapchain_loader.destroy_swapchain(self.swapchain, None);

        self.swapchain = swapchain;
        self.image_views = Self::create_image_views(device, &images, format)?;
        self.images = images;
        self.format = format;
        self.extent = extent;

        Ok(())
    }

    unsafe fn create_swapchain_internal(
        window: &Window,
        physical_device: vk::PhysicalDevice,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        swapchain_loader: &ash::khr::swapchain::Device,
        graphics_family: u32,
        present_family: u32,
        old_swapchain: vk::SwapchainKHR,
    ) -> anyhow::Result<(vk::SwapchainKHR, Vec<vk::Image>, vk::Format, vk::Extent2D)> {
        let capabilities =
            surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?;
        let formats =
            surface_loader.get_physical_device_surface_formats(physical_device, surface)?;
        let present_modes =
            surface_loader.get_physical_device_surface_present_modes(physical_device, surface)?;

        let surface_format = choose_surface_format(&formats);
        let present_mode = choose_present_mode(&present_modes);

        let size = window.inner_size();
        let extent = choose_extent(&capabilities, size.width, size.height);

        let queue_family_indices = [graphics_family, present_family];
        let create_info = swapchain_create_info(
            surface,
            &capabilities,
            surface_format,
            present_mode,
            extent,
            &queue_family_indices,
            old_swapchain,
        );

        let swapchain = swapchain_loader.create_swapchain(&create_info, None)?;
        let images = swapchain_loader.get_swapchain_images(swapchain)?;

        Ok((swapchain, images, surface_format.format, extent))
    }

    unsafe fn create_image_views(
        device: &ash::Device,
        images: &[vk::Image],
        format: vk::Format,
    ) -> anyhow::Result<Vec<vk::ImageView>> {
        images
            .iter()
            .map(|&image| {
                let create_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(format)
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });

                device
                    .create_image_view(&create_info, None)
                    .map_err(|e| anyhow::anyhow!("Failed to create swapchain image view: {}", e))
            })
            .collect()
    }

    /// Destroy the image views. Called before dropping when the device is
    /// still alive, and before [`Self::recreate`].
    pub unsafe fn cleanup_image_views(&mut self, device: &ash::Device) {
        for &image_view in &self.image_views {
            device.destroy_image_view(image_view, None);
        }
        self.image_views.clear();
    }
}

impl Drop for SwapchainManager {
    fn drop(&mut self) {
        // image_views must already be cleaned up via cleanup_image_views
        unsafe {
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    formats
        .iter()
        .copied()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_SRGB
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .unwrap_or(formats[0])
}

fn choose_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    present_modes
        .iter()
        .copied()
        .find(|&mode| mode == vk::PresentModeKHR::MAILBOX)
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    window_width: u32,
    window_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: window_width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: window_height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

fn swapchain_create_info<'a>(
    surface: vk::SurfaceKHR,
    capabilities: &vk::SurfaceCapabilitiesKHR,
    surface_format: vk::SurfaceFormatKHR,
    present_mode: vk::PresentModeKHR,
    extent: vk::Extent2D,
    queue_family_indices: &'a [u32; 2],
    old_swapchain: vk::SwapchainKHR,
) -> vk::SwapchainCreateInfoKHR<'a> {
    let image_count = (capabilities.min_image_count + 1).min(if capabilities.max_image_count > 0 {
        capabilities.max_image_count
    } else {
        u32::MAX
    });

    let (image_sharing_mode, queue_family_index_count) =
        if queue_family_indices[0] != queue_family_indices[1] {
            (vk::SharingMode::CONCURRENT, 2)
        } else {
            (vk::SharingMode::EXCLUSIVE, 0)
        };

    vk::SwapchainCreateInfoKHR::default()
        .surface(surface)
        .min_image_count(image_count)
        .image_format(surface_format.format)
        .image_color_space(surface_format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(image_sharing_mode)
        .queue_family_indices(&queue_family_indices[..queue_family_index_count as usize])
        .pre_transform(capabilities.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(present_mode)
        .clipped(true)
        .old_swapchain(old_swapchain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn capabilities(min_count: u32, max_count: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min_count,
            max_image_count: max_count,
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_create_info_carries_old_swapchain() {
        // Recreation must retire the previous swapchain through the create
        // info; a second non-retired swapchain on the same surface is a
        // spec violation.
        let caps = capabilities(2, 0);
        let families = [0u32, 0u32];
        let old = vk::SwapchainKHR::from_raw(0xdead_beef);

        let info = swapchain_create_info(
            vk::SurfaceKHR::null(),
            &caps,
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::PresentModeKHR::FIFO,
            vk::Extent2D {
                width: 1280,
                height: 720,
            },
            &families,
            old,
        );

        assert_eq!(info.old_swapchain, old);

        let initial = swapchain_create_info(
            vk::SurfaceKHR::null(),
            &caps,
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::PresentModeKHR::FIFO,
            vk::Extent2D {
                width: 1280,
                height: 720,
            },
            &families,
            vk::SwapchainKHR::null(),
        );
        assert_eq!(initial.old_swapchain, vk::SwapchainKHR::null());
    }

    #[test]
    fn test_sharing_mode_per_queue_families() {
        let caps = capabilities(2, 0);
        let format = vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
        let extent = vk::Extent2D {
            width: 800,
            height: 600,
        };

        let same = [1u32, 1u32];
        let info = swapchain_create_info(
            vk::SurfaceKHR::null(),
            &caps,
            format,
            vk::PresentModeKHR::FIFO,
            extent,
            &same,
            vk::SwapchainKHR::null(),
        );
        assert_eq!(info.image_sharing_mode, vk::SharingMode::EXCLUSIVE);
        assert_eq!(info.queue_family_index_count, 0);

        let split = [0u32, 1u32];
        let info = swapchain_create_info(
            vk::SurfaceKHR::null(),
            &caps,
            format,
            vk::PresentModeKHR::FIFO,
            extent,
            &split,
            vk::SwapchainKHR::null(),
        );
        assert_eq!(info.image_sharing_mode, vk::SharingMode::CONCURRENT);
        assert_eq!(info.queue_family_index_count, 2);
    }

    #[test]
    fn test_image_count_respects_max() {
        let caps = capabilities(2, 0);
        let families = [0u32, 0u32];
        let format = vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
        let extent = vk::Extent2D {
            width: 800,
            height: 600,
        };

        // Unbounded: min + 1
        let info = swapchain_create_info(
            vk::SurfaceKHR::null(),
            &caps,
            format,
            vk::PresentModeKHR::FIFO,
            extent,
            &families,
            vk::SwapchainKHR::null(),
        );
        assert_eq!(info.min_image_count, 3);

        // Bounded below min + 1
        let caps = capabilities(2, 2);
        let info = swapchain_create_info(
            vk::SurfaceKHR::null(),
            &caps,
            format,
            vk::PresentModeKHR::FIFO,
            extent,
            &families,
            vk::SwapchainKHR::null(),
        );
        assert_eq!(info.min_image_count, 2);
    }

    #[test]
    fn test_choose_extent_clamps_to_capabilities() {
        let caps = capabilities(2, 0);

        // Surface leaves the size to the window: clamp it
        assert_eq!(
            choose_extent(&caps, 8000, 50),
            vk::Extent2D {
                width: 4096,
                height: 50
            }
        );

        // Surface dictates the size: take it verbatim
        let mut fixed = caps;
        fixed.current_extent = vk::Extent2D {
            width: 1920,
            height: 1080,
        };
        assert_eq!(
            choose_extent(&fixed, 8000, 50),
            vk::Extent2D {
                width: 1920,
                height: 1080
            }
        );
    }

    #[test]
    fn test_format_and_present_mode_preferences() {
        let srgb = vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
        let unorm = vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };

        assert_eq!(choose_surface_format(&[unorm, srgb]).format, srgb.format);
        // Preferred format missing: first available wins
        assert_eq!(choose_surface_format(&[unorm]).format, unorm.format);

        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX]),
            vk::PresentModeKHR::MAILBOX
        );
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE]),
            vk::PresentModeKHR::FIFO
        );
    }
}
