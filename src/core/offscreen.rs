use anyhow::Result;
use ash::vk;

use crate::core::texture;

/// 16 bits of depth is enough for the small demo scenes and keeps the
/// shadow map cheap to sample.
pub const SHADOW_MAP_FORMAT: vk::Format = vk::Format::D16_UNORM;
pub const DEFAULT_SHADOW_MAP_DIM: u32 = 2048;

/// Depth-only offscreen framebuffer the shadow pass renders into. The depth
/// attachment transitions to a read-only layout at the end of the pass so
/// the scene pass can sample it directly; the ordering between the two
/// passes is carried by the external subpass dependencies.
pub struct ShadowFramebuffer {
    pub width: u32,
    pub height: u32,
    pub image: vk::Image,
    pub memory: vk::DeviceMemory,
    pub view: vk::ImageView,
    pub sampler: vk::Sampler,
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
}

impl ShadowFramebuffer {
    pub unsafe fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: &ash::Device,
        dim: u32,
    ) -> Result<Self> {
        let format_props =
            instance.get_physical_device_format_properties(physical_device, SHADOW_MAP_FORMAT);
        anyhow::ensure!(
            format_props
                .optimal_tiling_features
                .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT),
            "Depth format {:?} not usable as attachment",
            SHADOW_MAP_FORMAT
        );

        let render_pass = Self::create_render_pass(device)?;

        let (image, memory) = texture::create_image(
            instance,
            physical_device,
            device,
            dim,
            dim,
            SHADOW_MAP_FORMAT,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
        )?;

        let view =
            texture::create_image_view(device, image, SHADOW_MAP_FORMAT, vk::ImageAspectFlags::DEPTH)?;

        // Texels outside the light frustum read as max depth, i.e. unshadowed.
        let sampler_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .max_lod(1.0)
            .border_color(vk::BorderColor::FLOAT_OPAQUE_WHITE);
        let sampler = device.create_sampler(&sampler_info, None)?;

        let attachments = [view];
        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(&attachments)
            .width(dim)
            .height(dim)
            .layers(1);
        let framebuffer = device.create_framebuffer(&framebuffer_info, None)?;

        Ok(Self {
            width: dim,
            height: dim,
            image,
            memory,
            view,
            sampler,
            render_pass,
            framebuffer,
        })
    }

    unsafe fn create_render_pass(device: &ash::Device) -> Result<vk::RenderPass> {
        let attachment = vk::AttachmentDescription::default()
            .format(SHADOW_MAP_FORMAT)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            // Depth contents are sampled by the scene pass, so they must
            // survive the end of this pass.
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL);

        let depth_reference = vk::AttachmentReference::default()
            .attachment(0)
            .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

        let subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .depth_stencil_attachment(&depth_reference);

        let dependencies = [
            vk::SubpassDependency::default()
                .src_subpass(vk::SUBPASS_EXTERNAL)
                .dst_subpass(0)
                .src_stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER)
                .dst_stage_mask(vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS)
                .src_access_mask(vk::AccessFlags::SHADER_READ)
                .dst_access_mask(vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE)
                .dependency_flags(vk::DependencyFlags::BY_REGION),
            vk::SubpassDependency::default()
                .src_subpass(0)
                .dst_subpass(vk::SUBPASS_EXTERNAL)
                .src_stage_mask(vk::PipelineStageFlags::LATE_FRAGMENT_TESTS)
                .dst_stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER)
                .src_access_mask(vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE)
                .dst_access_mask(vk::AccessFlags::SHADER_READ)
                .dependency_flags(vk::DependencyFlags::BY_REGION),
        ];

        let attachments = [attachment];
        let subpasses = [subpass];
        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        Ok(device.create_render_pass(&render_pass_info, None)?)
    }

    pub fn extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width,
            height: self.height,
        }
    }

    pub fn descriptor_info(&self) -> vk::DescriptorImageInfo {
        vk::DescriptorImageInfo::default()
            .image_layout(vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL)
            .image_view(self.view)
            .sampler(self.sampler)
    }

    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        device.destroy_framebuffer(self.framebuffer, None);
        device.destroy_render_pass(self.render_pass, None);
        device.destroy_sampler(self.sampler, None);
        device.destroy_image_view(self.view, None);
        device.destroy_image(self.image, None);
        device.free_memory(self.memory, None);
    }
}
