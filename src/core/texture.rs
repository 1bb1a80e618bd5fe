use anyhow::{Context, Result};
use ash::vk;
use std::path::Path;

use crate::core::buffer;

pub unsafe fn create_image(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    device: &ash::Device,
    width: u32,
    height: u32,
    format: vk::Format,
    usage: vk::ImageUsageFlags,
) -> Result<(vk::Image, vk::DeviceMemory)> {
    let image_info = vk::ImageCreateInfo::default()
        .image_type(vk::ImageType::TYPE_2D)
        .extent(vk::Extent3D { width, height, depth: 1 })
        .mip_levels(1)
        .array_layers(1)
        .format(format)
        .tiling(vk::ImageTiling::OPTIMAL)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .usage(usage)
        .samples(vk::SampleCountFlags::TYPE_1)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);

    let image = device.create_image(&image_info, None)?;
    let mem_requirements = device.get_image_memory_requirements(image);

    let alloc_info = vk::MemoryAllocateInfo::default()
        .allocation_size(mem_requirements.size)
        .memory_type_index(buffer::find_memory_type(
            instance,
            physical_device,
            mem_requirements.memory_type_bits,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?);

    let memory = device.allocate_memory(&alloc_info, None)?;
    device.bind_image_memory(image, memory, 0)?;

    Ok((image, memory))
}

pub unsafe fn create_image_view(
    device: &ash::Device,
    image: vk::Image,
    format: vk::Format,
    aspect_mask: vk::ImageAspectFlags,
) -> Result<vk::ImageView> {
    let view_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        });

    Ok(device.create_image_view(&view_info, None)?)
}

/// Record a layout transition barrier for the transfer/sampling cases the
/// samples need.
pub unsafe fn transition_image_layout(
    device: &ash::Device,
    command_pool: vk::CommandPool,
    queue: vk::Queue,
    image: vk::Image,
    aspect_mask: vk::ImageAspectFlags,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> Result<()> {
    let (src_access, dst_access, src_stage, dst_stage) = match (old_layout, new_layout) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => (
            vk::AccessFlags::empty(),
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
        ),
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => (
            vk::AccessFlags::TRANSFER_WRITE,
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER
                | vk::PipelineStageFlags::TESSELLATION_EVALUATION_SHADER,
        ),
        _ => {
            return Err(anyhow::anyhow!(
                "Unsupported layout transition {:?} -> {:?}",
                old_layout,
                new_layout
            ))
        }
    };

    let command_buffer = buffer::begin_one_time_commands(device, command_pool)?;

    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        })
        .src_access_mask(src_access)
        .dst_access_mask(dst_access);

    device.cmd_pipeline_barrier(
        command_buffer,
        src_stage,
        dst_stage,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        &[barrier],
    );

    buffer::end_one_time_commands(device, command_pool, queue, command_buffer)
}

/// First depth format the device supports for optimal-tiling attachments.
pub unsafe fn find_depth_format(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> Result<vk::Format> {
    let candidates = [
        vk::Format::D32_SFLOAT,
        vk::Format::D32_SFLOAT_S8_UINT,
        vk::Format::D24_UNORM_S8_UINT,
    ];

    for format in candidates {
        let props = instance.get_physical_device_format_properties(physical_device, format);
        if props
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        {
            return Ok(format);
        }
    }

    Err(anyhow::anyhow!("No supported depth format"))
}

/// Depth attachment for the visible framebuffer.
pub struct DepthTarget {
    pub image: vk::Image,
    pub memory: vk::DeviceMemory,
    pub view: vk::ImageView,
    pub format: vk::Format,
}

impl DepthTarget {
    pub unsafe fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: &ash::Device,
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let format = find_depth_format(instance, physical_device)?;
        let (image, memory) = create_image(
            instance,
            physical_device,
            device,
            extent.width,
            extent.height,
            format,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
        )?;
        let view = create_image_view(device, image, format, vk::ImageAspectFlags::DEPTH)?;

        Ok(Self {
            image,
            memory,
            view,
            format,
        })
    }

    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        device.destroy_image_view(self.view, None);
        device.destroy_image(self.image, None);
        device.free_memory(self.memory, None);
    }
}

/// Sampled 2D texture with its own sampler. Used for the displacement
/// heightmap; the shadow map lives in [`crate::core::offscreen`] since its
/// image doubles as a framebuffer attachment.
pub struct Texture {
    pub image: vk::Image,
    pub memory: vk::DeviceMemory,
    pub view: vk::ImageView,
    pub sampler: vk::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Decode an image file into an RGBA8 texture.
    pub unsafe fn from_file(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: &ash::Device,
        command_pool: vk::CommandPool,
        queue: vk::Queue,
        path: &Path,
    ) -> Result<Self> {
        let decoded = image::open(path)
            .with_context(|| format!("Failed to load texture {}", path.display()))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();

        Self::from_rgba8(
            instance,
            physical_device,
            device,
            command_pool,
            queue,
            width,
            height,
            decoded.as_raw(),
        )
    }

    /// Upload raw RGBA8 pixels through a staging buffer.
    pub unsafe fn from_rgba8(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: &ash::Device,
        command_pool: vk::CommandPool,
        queue: vk::Queue,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<Self> {
        anyhow::ensure!(
            pixels.len() as u64 == width as u64 * height as u64 * 4,
            "Pixel data does not match {}x{} RGBA8",
            width,
            height
        );

        let format = vk::Format::R8G8B8A8_UNORM;
        let size = pixels.len() as vk::DeviceSize;

        let (staging_buffer, staging_memory) = buffer::create_buffer(
            instance,
            physical_device,
            device,
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;

        let mapped = device.map_memory(staging_memory, 0, size, vk::MemoryMapFlags::empty())?;
        std::ptr::copy_nonoverlapping(pixels.as_ptr(), mapped as *mut u8, pixels.len());
        device.unmap_memory(staging_memory);

        let (image, memory) = create_image(
            instance,
            physical_device,
            device,
            width,
            height,
            format,
            vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
        )?;

        transition_image_layout(
            device,
            command_pool,
            queue,
            image,
            vk::ImageAspectFlags::COLOR,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        )?;

        let command_buffer = buffer::begin_one_time_commands(device, command_pool)?;
        let region = vk::BufferImageCopy::default()
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            })
            .image_extent(vk::Extent3D { width, height, depth: 1 });
        device.cmd_copy_buffer_to_image(
            command_buffer,
            staging_buffer,
            image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[region],
        );
        buffer::end_one_time_commands(device, command_pool, queue, command_buffer)?;

        transition_image_layout(
            device,
            command_pool,
            queue,
            image,
            vk::ImageAspectFlags::COLOR,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )?;

        device.destroy_buffer(staging_buffer, None);
        device.free_memory(staging_memory, None);

        let view = create_image_view(device, image, format, vk::ImageAspectFlags::COLOR)?;

        let sampler_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .max_lod(1.0)
            .border_color(vk::BorderColor::FLOAT_OPAQUE_WHITE);
        let sampler = device.create_sampler(&sampler_info, None)?;

        Ok(Self {
            image,
            memory,
            view,
            sampler,
            width,
            height,
        })
    }

    pub fn descriptor_info(&self) -> vk::DescriptorImageInfo {
        vk::DescriptorImageInfo::default()
            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
            .image_view(self.view)
            .sampler(self.sampler)
    }

    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        device.destroy_sampler(self.sampler, None);
        device.destroy_image_view(self.view, None);
        device.destroy_image(self.image, None);
        device.free_memory(self.memory, None);
    }
}
