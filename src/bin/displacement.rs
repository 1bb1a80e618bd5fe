//! Tessellation displacement mapping sample.
//!
//! A coarse plane is rendered as triangle patches; the tessellation control
//! shader subdivides them and the evaluation shader displaces the generated
//! vertices along their normals by a heightmap sample.
//!
//!   = / -  raise or lower the tessellation level
//!   D      toggle displacement on or off
//!   T      toggle the split-screen comparison view
//!   W      toggle wireframe to inspect the generated triangles

use anyhow::{Context, Result};
use ash::vk;
use glam::{Vec3, Vec4};
use std::path::Path;
use winit::{
    dpi::LogicalSize,
    event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowBuilder},
};

use vulkan_samples::config::DemoConfig;
use vulkan_samples::core::buffer::{self, UniformBuffer};
use vulkan_samples::core::pipeline::{self, GraphicsPipelineDesc};
use vulkan_samples::core::texture::{DepthTarget, Texture};
use vulkan_samples::core::vulkan_context::RequiredFeatures;
use vulkan_samples::core::{
    FrameSync, OrbitCamera, SwapchainManager, VulkanContext, MAX_FRAMES_IN_FLIGHT,
};
use vulkan_samples::mesh::{Model, VertexComponent, VertexLayout};
use vulkan_samples::tessellation::{TessControlUbo, TessEvalUbo, TessellationParams};

const CONFIG_PATH: &str = "displacement.json";
const HEIGHTMAP_DIM: u32 = 256;

struct DisplacementApp {
    swapchain: SwapchainManager,
    depth_target: DepthTarget,
    render_pass: vk::RenderPass,
    framebuffers: Vec<vk::Framebuffer>,

    vertex_buffer: vk::Buffer,
    vertex_memory: vk::DeviceMemory,
    index_buffer: vk::Buffer,
    index_memory: vk::DeviceMemory,
    index_count: u32,

    heightmap: Texture,

    set_layout: vk::DescriptorSetLayout,
    pipeline_layout: vk::PipelineLayout,
    displacement_pipeline: vk::Pipeline,
    wireframe_pipeline: vk::Pipeline,
    passthrough_pipeline: vk::Pipeline,

    descriptor_pool: vk::DescriptorPool,
    descriptor_sets: Vec<vk::DescriptorSet>,

    control_ubos: Vec<UniformBuffer>,
    eval_ubos: Vec<UniformBuffer>,

    command_pool: vk::CommandPool,
    command_buffers: Vec<vk::CommandBuffer>,
    sync: FrameSync,

    current_frame: usize,
    framebuffer_resized: bool,

    camera: OrbitCamera,
    params: TessellationParams,
    split_screen: bool,
    wireframe: bool,
    light_pos: Vec3,

    window: Window,
    ctx: VulkanContext,
}

impl DisplacementApp {
    fn new(window: Window, config: DemoConfig) -> Result<Self> {
        unsafe {
            let ctx = VulkanContext::new(
                &window,
                "Tessellation displacement mapping",
                RequiredFeatures {
                    tessellation_shader: true,
                    fill_mode_non_solid: true,
                    sampler_anisotropy: false,
                },
            )?;

            let swapchain = SwapchainManager::new(
                &window,
                &ctx.instance,
                ctx.physical_device,
                &ctx.device,
                &ctx.surface_loader,
                ctx.surface,
                ctx.graphics_queue_family,
                ctx.present_queue_family,
            )?;

            let depth_target = DepthTarget::new(
                &ctx.instance,
                ctx.physical_device,
                &ctx.device,
                swapchain.extent,
            )?;

            let render_pass =
                create_render_pass(&ctx.device, swapchain.format, depth_target.format)?;
            let framebuffers =
                create_framebuffers(&ctx.device, render_pass, &swapchain, depth_target.view)?;

            let command_pool_info = vk::CommandPoolCreateInfo::default()
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
                .queue_family_index(ctx.graphics_queue_family);
            let command_pool = ctx.device.create_command_pool(&command_pool_info, None)?;

            // Coarse patch grid; the GPU adds the detail.
            let layout = VertexLayout::new(&[
                VertexComponent::Position,
                VertexComponent::Normal,
                VertexComponent::Uv,
            ]);
            let plane = Model::plane(16.0, 8);
            let (vertex_data, index_data) = plane.flatten(&layout);
            println!(
                "Patch grid: {} vertices, {} triangles",
                plane.vertex_count(),
                index_data.len() / 3
            );

            let (vertex_buffer, vertex_memory) = buffer::create_vertex_buffer(
                &ctx.instance,
                ctx.physical_device,
                &ctx.device,
                command_pool,
                ctx.graphics_queue,
                &vertex_data,
            )?;
            let (index_buffer, index_memory) = buffer::create_index_buffer(
                &ctx.instance,
                ctx.physical_device,
                &ctx.device,
                command_pool,
                ctx.graphics_queue,
                &index_data,
            )?;

            let heightmap = match &config.tessellation.heightmap_path {
                Some(path) => Texture::from_file(
                    &ctx.instance,
                    ctx.physical_device,
                    &ctx.device,
                    command_pool,
                    ctx.graphics_queue,
                    Path::new(path),
                )
                .with_context(|| format!("Failed to load heightmap {}", path))?,
                None => {
                    let pixels = generate_heightmap(HEIGHTMAP_DIM);
                    Texture::from_rgba8(
                        &ctx.instance,
                        ctx.physical_device,
                        &ctx.device,
                        command_pool,
                        ctx.graphics_queue,
                        HEIGHTMAP_DIM,
                        HEIGHTMAP_DIM,
                        &pixels,
                    )?
                }
            };

            let bindings = [
                vk::DescriptorSetLayoutBinding::default()
                    .binding(0)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .descriptor_count(1)
                    .stage_flags(vk::ShaderStageFlags::TESSELLATION_CONTROL),
                vk::DescriptorSetLayoutBinding::default()
                    .binding(1)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .descriptor_count(1)
                    .stage_flags(
                        vk::ShaderStageFlags::TESSELLATION_EVALUATION
                            | vk::ShaderStageFlags::FRAGMENT,
                    ),
                vk::DescriptorSetLayoutBinding::default()
                    .binding(2)
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .descriptor_count(1)
                    .stage_flags(
                        vk::ShaderStageFlags::TESSELLATION_EVALUATION
                            | vk::ShaderStageFlags::FRAGMENT,
                    ),
            ];
            let set_layout = ctx.device.create_descriptor_set_layout(
                &vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings),
                None,
            )?;

            let set_layouts = [set_layout];
            let pipeline_layout = ctx.device.create_pipeline_layout(
                &vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts),
                None,
            )?;

            let (displacement_pipeline, wireframe_pipeline, passthrough_pipeline) =
                create_pipelines(&ctx.device, &layout, pipeline_layout, render_pass)?;

            let mut control_ubos = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
            let mut eval_ubos = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
            for _ in 0..MAX_FRAMES_IN_FLIGHT {
                control_ubos.push(UniformBuffer::new(
                    &ctx.instance,
                    ctx.physical_device,
                    &ctx.device,
                    std::mem::size_of::<TessControlUbo>() as vk::DeviceSize,
                )?);
                eval_ubos.push(UniformBuffer::new(
                    &ctx.instance,
                    ctx.physical_device,
                    &ctx.device,
                    std::mem::size_of::<TessEvalUbo>() as vk::DeviceSize,
                )?);
            }

            let pool_sizes = [
                vk::DescriptorPoolSize::default()
                    .ty(vk::DescriptorType::UNIFORM_BUFFER)
                    .descriptor_count((2 * MAX_FRAMES_IN_FLIGHT) as u32),
                vk::DescriptorPoolSize::default()
                    .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .descriptor_count(MAX_FRAMES_IN_FLIGHT as u32),
            ];
            let pool_info = vk::DescriptorPoolCreateInfo::default()
                .pool_sizes(&pool_sizes)
                .max_sets(MAX_FRAMES_IN_FLIGHT as u32);
            let descriptor_pool = ctx.device.create_descriptor_pool(&pool_info, None)?;

            let layouts = vec![set_layout; MAX_FRAMES_IN_FLIGHT];
            let alloc_info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(descriptor_pool)
                .set_layouts(&layouts);
            let descriptor_sets = ctx.device.allocate_descriptor_sets(&alloc_info)?;

            let heightmap_info = [heightmap.descriptor_info()];
            for frame in 0..MAX_FRAMES_IN_FLIGHT {
                let control_info = [control_ubos[frame].descriptor_info()];
                let eval_info = [eval_ubos[frame].descriptor_info()];

                let writes = [
                    vk::WriteDescriptorSet::default()
                        .dst_set(descriptor_sets[frame])
                        .dst_binding(0)
                        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                        .buffer_info(&control_info),
                    vk::WriteDescriptorSet::default()
                        .dst_set(descriptor_sets[frame])
                        .dst_binding(1)
                        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                        .buffer_info(&eval_info),
                    vk::WriteDescriptorSet::default()
                        .dst_set(descriptor_sets[frame])
                        .dst_binding(2)
                        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                        .image_info(&heightmap_info),
                ];
                ctx.device.update_descriptor_sets(&writes, &[]);
            }

            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(MAX_FRAMES_IN_FLIGHT as u32);
            let command_buffers = ctx.device.allocate_command_buffers(&alloc_info)?;

            let sync = FrameSync::new(&ctx.device, MAX_FRAMES_IN_FLIGHT, swapchain.images.len())?;

            let camera = OrbitCamera::new(
                config.camera.zoom,
                config.camera.rotation,
                config.camera.fov,
                0.1,
                256.0,
            );
            let params = TessellationParams {
                level: config.tessellation.level,
                strength: config.tessellation.strength,
                alpha: config.tessellation.alpha,
            };

            Ok(Self {
                swapchain,
                depth_target,
                render_pass,
                framebuffers,
                vertex_buffer,
                vertex_memory,
                index_buffer,
                index_memory,
                index_count: index_data.len() as u32,
                heightmap,
                set_layout,
                pipeline_layout,
                displacement_pipeline,
                wireframe_pipeline,
                passthrough_pipeline,
                descriptor_pool,
                descriptor_sets,
                control_ubos,
                eval_ubos,
                command_pool,
                command_buffers,
                sync,
                current_frame: 0,
                framebuffer_resized: false,
                camera,
                params,
                split_screen: true,
                wireframe: false,
                light_pos: Vec3::new(0.0, -25.0, 0.0),
                window,
                ctx,
            })
        }
    }

    unsafe fn update_uniforms(&self, frame: usize) -> Result<()> {
        let control = TessControlUbo::new(self.params.level);
        self.control_ubos[frame].update(&self.ctx.device, &control)?;

        // Each viewport covers half the window in split-screen mode, so the
        // projection aspect follows the viewport, not the window.
        let width = if self.split_screen {
            self.swapchain.extent.width as f32 / 2.0
        } else {
            self.swapchain.extent.width as f32
        };
        let aspect = width / self.swapchain.extent.height as f32;

        let eval = TessEvalUbo {
            projection: self.camera.projection_matrix(aspect),
            model: self.camera.view_matrix(),
            light_pos: Vec4::new(self.light_pos.x, self.light_pos.y, self.light_pos.z, 1.0),
            tess_alpha: self.params.alpha,
            tess_strength: self.params.strength,
            _pad: [0.0; 2],
        };
        self.eval_ubos[frame].update(&self.ctx.device, &eval)?;

        Ok(())
    }

    unsafe fn record_command_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        image_index: usize,
        frame: usize,
    ) -> Result<()> {
        let device = &self.ctx.device;

        device.begin_command_buffer(command_buffer, &vk::CommandBufferBeginInfo::default())?;

        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: [0.025, 0.025, 0.025, 1.0],
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(self.render_pass)
            .framebuffer(self.framebuffers[image_index])
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: self.swapchain.extent,
            })
            .clear_values(&clear_values);

        device.cmd_begin_render_pass(command_buffer, &begin_info, vk::SubpassContents::INLINE);

        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: self.swapchain.extent,
        };
        device.cmd_set_scissor(command_buffer, 0, &[scissor]);

        device.cmd_bind_descriptor_sets(
            command_buffer,
            vk::PipelineBindPoint::GRAPHICS,
            self.pipeline_layout,
            0,
            &[self.descriptor_sets[frame]],
            &[],
        );
        device.cmd_bind_vertex_buffers(command_buffer, 0, &[self.vertex_buffer], &[0]);
        device.cmd_bind_index_buffer(command_buffer, self.index_buffer, 0, vk::IndexType::UINT32);

        let full_width = self.swapchain.extent.width as f32;
        let height = self.swapchain.extent.height as f32;

        let displaced_pipeline = if self.wireframe {
            self.wireframe_pipeline
        } else {
            self.displacement_pipeline
        };

        if self.split_screen {
            // Left half: patches passed straight through, no subdivision.
            device.cmd_set_viewport(
                command_buffer,
                0,
                &[viewport(0.0, full_width / 2.0, height)],
            );
            device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.passthrough_pipeline,
            );
            device.cmd_draw_indexed(command_buffer, self.index_count, 1, 0, 0, 0);

            // Right half: tessellated and displaced.
            device.cmd_set_viewport(
                command_buffer,
                0,
                &[viewport(full_width / 2.0, full_width / 2.0, height)],
            );
            device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                displaced_pipeline,
            );
            device.cmd_draw_indexed(command_buffer, self.index_count, 1, 0, 0, 0);
        } else {
            device.cmd_set_viewport(command_buffer, 0, &[viewport(0.0, full_width, height)]);
            device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                displaced_pipeline,
            );
            device.cmd_draw_indexed(command_buffer, self.index_count, 1, 0, 0, 0);
        }

        device.cmd_end_render_pass(command_buffer);
        device.end_command_buffer(command_buffer)?;
        Ok(())
    }

    fn draw_frame(&mut self) -> Result<()> {
        unsafe {
            let frame = self.current_frame;

            self.ctx
                .device
                .wait_for_fences(&[self.sync.fence(frame)], true, u64::MAX)?;

            let acquire_result = self.swapchain.swapchain_loader.acquire_next_image(
                self.swapchain.swapchain,
                u64::MAX,
                self.sync.image_available(frame),
                vk::Fence::null(),
            );

            let image_index = match acquire_result {
                Ok((index, suboptimal)) => {
                    if suboptimal {
                        self.framebuffer_resized = true;
                    }
                    index as usize
                }
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    self.recreate_swapchain()?;
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            self.ctx.device.reset_fences(&[self.sync.fence(frame)])?;

            self.update_uniforms(frame)?;

            let command_buffer = self.command_buffers[frame];
            self.ctx
                .device
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())?;
            self.record_command_buffer(command_buffer, image_index, frame)?;

            let wait_semaphores = [self.sync.image_available(frame)];
            let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
            // Keyed by image: present waits on the semaphore belonging to
            // the image being presented.
            let signal_semaphores = [self.sync.render_finished(image_index)];
            let command_buffers = [command_buffer];

            let submit_info = vk::SubmitInfo::default()
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .command_buffers(&command_buffers)
                .signal_semaphores(&signal_semaphores);

            self.ctx.device.queue_submit(
                self.ctx.graphics_queue,
                &[submit_info],
                self.sync.fence(frame),
            )?;

            let swapchains = [self.swapchain.swapchain];
            let image_indices = [image_index as u32];
            let present_info = vk::PresentInfoKHR::default()
                .wait_semaphores(&signal_semaphores)
                .swapchains(&swapchains)
                .image_indices(&image_indices);

            let present_result = self
                .swapchain
                .swapchain_loader
                .queue_present(self.ctx.present_queue, &present_info);

            match present_result {
                Ok(suboptimal) if suboptimal || self.framebuffer_resized => {
                    self.framebuffer_resized = false;
                    self.recreate_swapchain()?;
                }
                Ok(_) => {}
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    self.framebuffer_resized = false;
                    self.recreate_swapchain()?;
                }
                Err(e) => return Err(e.into()),
            }

            self.current_frame = (self.current_frame + 1) % MAX_FRAMES_IN_FLIGHT;
            Ok(())
        }
    }

    unsafe fn recreate_swapchain(&mut self) -> Result<()> {
        let size = self.window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }

        self.ctx.device.device_wait_idle()?;

        for &framebuffer in &self.framebuffers {
            self.ctx.device.destroy_framebuffer(framebuffer, None);
        }
        self.framebuffers.clear();
        self.depth_target.destroy(&self.ctx.device);
        self.swapchain.cleanup_image_views(&self.ctx.device);

        // The old swapchain is retired through the create info and
        // destroyed once its replacement exists.
        self.swapchain.recreate(
            &self.window,
            self.ctx.physical_device,
            &self.ctx.device,
            &self.ctx.surface_loader,
            self.ctx.surface,
            self.ctx.graphics_queue_family,
            self.ctx.present_queue_family,
        )?;
        self.sync
            .recreate_per_image(&self.ctx.device, self.swapchain.images.len())?;
        self.depth_target = DepthTarget::new(
            &self.ctx.instance,
            self.ctx.physical_device,
            &self.ctx.device,
            self.swapchain.extent,
        )?;
        self.framebuffers = create_framebuffers(
            &self.ctx.device,
            self.render_pass,
            &self.swapchain,
            self.depth_target.view,
        )?;

        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Equal | KeyCode::NumpadAdd => {
                self.params.adjust_level(0.25);
                println!("Tessellation level: {}", self.params.level);
            }
            KeyCode::Minus | KeyCode::NumpadSubtract => {
                self.params.adjust_level(-0.25);
                println!("Tessellation level: {}", self.params.level);
            }
            KeyCode::KeyD => {
                self.params.toggle_displacement();
                println!("Displacement strength: {}", self.params.strength);
            }
            KeyCode::KeyT => {
                self.split_screen = !self.split_screen;
                println!("Split screen: {}", self.split_screen);
            }
            KeyCode::KeyW => {
                self.wireframe = !self.wireframe;
                println!("Wireframe: {}", self.wireframe);
            }
            _ => {}
        }
    }
}

impl Drop for DisplacementApp {
    fn drop(&mut self) {
        unsafe {
            let device = &self.ctx.device;
            let _ = device.device_wait_idle();

            self.sync.destroy(device);

            for ubo in &mut self.control_ubos {
                ubo.destroy(device);
            }
            for ubo in &mut self.eval_ubos {
                ubo.destroy(device);
            }

            device.destroy_descriptor_pool(self.descriptor_pool, None);

            device.destroy_pipeline(self.displacement_pipeline, None);
            device.destroy_pipeline(self.wireframe_pipeline, None);
            device.destroy_pipeline(self.passthrough_pipeline, None);
            device.destroy_pipeline_layout(self.pipeline_layout, None);
            device.destroy_descriptor_set_layout(self.set_layout, None);

            self.heightmap.destroy(device);

            device.destroy_buffer(self.vertex_buffer, None);
            device.free_memory(self.vertex_memory, None);
            device.destroy_buffer(self.index_buffer, None);
            device.free_memory(self.index_memory, None);

            for &framebuffer in &self.framebuffers {
                device.destroy_framebuffer(framebuffer, None);
            }
            device.destroy_render_pass(self.render_pass, None);
            self.depth_target.destroy(device);
            self.swapchain.cleanup_image_views(device);

            device.destroy_command_pool(self.command_pool, None);
        }
    }
}

fn viewport(x: f32, width: f32, height: f32) -> vk::Viewport {
    vk::Viewport {
        x,
        y: 0.0,
        width,
        height,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

/// Layered sine terrain used when no heightmap image is configured. Height
/// lands in all four channels so the shader can sample any of them.
fn generate_heightmap(dim: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((dim * dim * 4) as usize);
    for y in 0..dim {
        for x in 0..dim {
            let u = x as f32 / dim as f32;
            let v = y as f32 / dim as f32;

            let h = 0.5
                + 0.25 * (u * std::f32::consts::TAU * 2.0).sin() * (v * std::f32::consts::TAU * 2.0).cos()
                + 0.15 * (u * std::f32::consts::TAU * 5.0 + 1.3).sin() * (v * std::f32::consts::TAU * 5.0 + 0.7).sin()
                + 0.10 * (u * std::f32::consts::TAU * 11.0).cos() * (v * std::f32::consts::TAU * 13.0).sin();

            let value = (h.clamp(0.0, 1.0) * 255.0) as u8;
            pixels.extend_from_slice(&[value, value, value, 255]);
        }
    }
    pixels
}

unsafe fn create_render_pass(
    device: &ash::Device,
    color_format: vk::Format,
    depth_format: vk::Format,
) -> Result<vk::RenderPass> {
    let attachments = [
        vk::AttachmentDescription::default()
            .format(color_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR),
        vk::AttachmentDescription::default()
            .format(depth_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
    ];

    let color_reference = vk::AttachmentReference::default()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    let depth_reference = vk::AttachmentReference::default()
        .attachment(1)
        .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let color_references = [color_reference];
    let subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_references)
        .depth_stencil_attachment(&depth_reference);

    let dependency = vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
        )
        .dst_stage_mask(
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
        )
        .src_access_mask(vk::AccessFlags::empty())
        .dst_access_mask(
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        );

    let subpasses = [subpass];
    let dependencies = [dependency];
    let render_pass_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);

    Ok(device.create_render_pass(&render_pass_info, None)?)
}

unsafe fn create_framebuffers(
    device: &ash::Device,
    render_pass: vk::RenderPass,
    swapchain: &SwapchainManager,
    depth_view: vk::ImageView,
) -> Result<Vec<vk::Framebuffer>> {
    swapchain
        .image_views
        .iter()
        .map(|&view| {
            let attachments = [view, depth_view];
            let info = vk::FramebufferCreateInfo::default()
                .render_pass(render_pass)
                .attachments(&attachments)
                .width(swapchain.extent.width)
                .height(swapchain.extent.height)
                .layers(1);
            device
                .create_framebuffer(&info, None)
                .map_err(|e| anyhow::anyhow!("Failed to create framebuffer: {}", e))
        })
        .collect()
}

unsafe fn create_pipelines(
    device: &ash::Device,
    layout: &VertexLayout,
    pipeline_layout: vk::PipelineLayout,
    render_pass: vk::RenderPass,
) -> Result<(vk::Pipeline, vk::Pipeline, vk::Pipeline)> {
    let shader_dir = Path::new("shaders/displacement");

    let vert = pipeline::create_shader_module(device, &shader_dir.join("base.vert.spv"))?;
    let frag = pipeline::create_shader_module(device, &shader_dir.join("base.frag.spv"))?;
    let tesc = pipeline::create_shader_module(device, &shader_dir.join("displacement.tesc.spv"))?;
    let tese = pipeline::create_shader_module(device, &shader_dir.join("displacement.tese.spv"))?;
    let pass_tesc =
        pipeline::create_shader_module(device, &shader_dir.join("passthrough.tesc.spv"))?;
    let pass_tese =
        pipeline::create_shader_module(device, &shader_dir.join("passthrough.tese.spv"))?;

    let bindings = [layout.binding_description()];
    let attributes = layout.attribute_descriptions();

    let displacement_stages = [
        pipeline::shader_stage(vert, vk::ShaderStageFlags::VERTEX),
        pipeline::shader_stage(tesc, vk::ShaderStageFlags::TESSELLATION_CONTROL),
        pipeline::shader_stage(tese, vk::ShaderStageFlags::TESSELLATION_EVALUATION),
        pipeline::shader_stage(frag, vk::ShaderStageFlags::FRAGMENT),
    ];
    let displacement_pipeline = pipeline::create_graphics_pipeline(
        device,
        &GraphicsPipelineDesc {
            stages: &displacement_stages,
            bindings: &bindings,
            attributes: &attributes,
            topology: vk::PrimitiveTopology::PATCH_LIST,
            patch_control_points: 3,
            cull_mode: vk::CullModeFlags::NONE,
            layout: pipeline_layout,
            render_pass,
            ..Default::default()
        },
    )?;

    let wireframe_pipeline = pipeline::create_graphics_pipeline(
        device,
        &GraphicsPipelineDesc {
            stages: &displacement_stages,
            bindings: &bindings,
            attributes: &attributes,
            topology: vk::PrimitiveTopology::PATCH_LIST,
            patch_control_points: 3,
            polygon_mode: vk::PolygonMode::LINE,
            cull_mode: vk::CullModeFlags::NONE,
            layout: pipeline_layout,
            render_pass,
            ..Default::default()
        },
    )?;

    let passthrough_stages = [
        pipeline::shader_stage(vert, vk::ShaderStageFlags::VERTEX),
        pipeline::shader_stage(pass_tesc, vk::ShaderStageFlags::TESSELLATION_CONTROL),
        pipeline::shader_stage(pass_tese, vk::ShaderStageFlags::TESSELLATION_EVALUATION),
        pipeline::shader_stage(frag, vk::ShaderStageFlags::FRAGMENT),
    ];
    let passthrough_pipeline = pipeline::create_graphics_pipeline(
        device,
        &GraphicsPipelineDesc {
            stages: &passthrough_stages,
            bindings: &bindings,
            attributes: &attributes,
            topology: vk::PrimitiveTopology::PATCH_LIST,
            patch_control_points: 3,
            cull_mode: vk::CullModeFlags::NONE,
            layout: pipeline_layout,
            render_pass,
            ..Default::default()
        },
    )?;

    device.destroy_shader_module(vert, None);
    device.destroy_shader_module(frag, None);
    device.destroy_shader_module(tesc, None);
    device.destroy_shader_module(tese, None);
    device.destroy_shader_module(pass_tesc, None);
    device.destroy_shader_module(pass_tese, None);

    Ok((displacement_pipeline, wireframe_pipeline, passthrough_pipeline))
}

fn main() -> Result<()> {
    let config = DemoConfig::load_or_default(CONFIG_PATH);

    let event_loop = EventLoop::new()?;
    let window = WindowBuilder::new()
        .with_title("Vulkan samples - tessellation displacement")
        .with_inner_size(LogicalSize::new(config.window.width, config.window.height))
        .build(&event_loop)?;

    let mut app = DisplacementApp::new(window, config)?;

    let mut left_mouse_pressed = false;
    let mut last_cursor: Option<(f64, f64)> = None;

    event_loop.run(move |event, target| {
        target.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => target.exit(),
                WindowEvent::Resized(_) => {
                    app.framebuffer_resized = true;
                }
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            physical_key: PhysicalKey::Code(code),
                            state: ElementState::Pressed,
                            ..
                        },
                    ..
                } => match code {
                    KeyCode::Escape => target.exit(),
                    _ => app.handle_key(code),
                },
                WindowEvent::MouseInput { state, button, .. } => {
                    if button == MouseButton::Left {
                        left_mouse_pressed = state == ElementState::Pressed;
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    if let (true, Some((last_x, last_y))) = (left_mouse_pressed, last_cursor) {
                        let dx = (position.x - last_x) as f32;
                        let dy = (position.y - last_y) as f32;
                        app.camera.rotate(Vec3::new(dy * 0.25, dx * 0.25, 0.0));
                    }
                    last_cursor = Some((position.x, position.y));
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    let scroll = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y,
                        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 20.0,
                    };
                    app.camera.zoom_by(scroll * 0.5);
                }
                WindowEvent::RedrawRequested => {
                    if let Err(e) = app.draw_frame() {
                        eprintln!("Frame error: {e:#}");
                        target.exit();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                app.window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}
