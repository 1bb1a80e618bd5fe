//! Projected shadow mapping sample.
//!
//! Renders the scene depth from the light's point of view into an offscreen
//! framebuffer, then samples that depth map in the main pass to shade
//! occluded fragments.
//!
//!   P - toggle light source animation
//!   L - render the scene from the light's point of view
//!   S - show the raw shadow map on a debug quad

use anyhow::{Context, Result};
use ash::vk;
use glam::{Mat4, Vec3, Vec4};
use std::path::Path;
use std::time::Instant;
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
use vulkan_samples::core::texture::DepthTarget;
use vulkan_samples::core::vulkan_context::RequiredFeatures;
use vulkan_samples::core::{
    FrameSync, OrbitCamera, ShadowFramebuffer, SwapchainManager, VulkanContext,
    MAX_FRAMES_IN_FLIGHT,
};
use vulkan_samples::mesh::{Model, VertexComponent, VertexLayout};
use vulkan_samples::shadow::{
    self, LightSettings, OffscreenUbo, QuadUbo, SceneUbo,
};

const CONFIG_PATH: &str = "shadowmapping.json";

struct GpuMesh {
    vertex_buffer: vk::Buffer,
    vertex_memory: vk::DeviceMemory,
    index_buffer: vk::Buffer,
    index_memory: vk::DeviceMemory,
    index_count: u32,
}

impl GpuMesh {
    unsafe fn upload(ctx: &VulkanContext, command_pool: vk::CommandPool, model: &Model, layout: &VertexLayout) -> Result<Self> {
        let (vertex_data, index_data) = model.flatten(layout);

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

        Ok(Self {
            vertex_buffer,
            vertex_memory,
            index_buffer,
            index_memory,
            index_count: index_data.len() as u32,
        })
    }

    unsafe fn bind(&self, device: &ash::Device, command_buffer: vk::CommandBuffer) {
        device.cmd_bind_vertex_buffers(command_buffer, 0, &[self.vertex_buffer], &[0]);
        device.cmd_bind_index_buffer(command_buffer, self.index_buffer, 0, vk::IndexType::UINT32);
    }

    unsafe fn destroy(&mut self, device: &ash::Device) {
        device.destroy_buffer(self.vertex_buffer, None);
        device.free_memory(self.vertex_memory, None);
        device.destroy_buffer(self.index_buffer, None);
        device.free_memory(self.index_memory, None);
    }
}

struct ShadowMappingApp {
    // Swapchain-dependent resources
    swapchain: SwapchainManager,
    depth_target: DepthTarget,
    render_pass: vk::RenderPass,
    framebuffers: Vec<vk::Framebuffer>,

    shadow_fb: ShadowFramebuffer,

    scene_mesh: GpuMesh,
    quad_mesh: GpuMesh,

    offscreen_set_layout: vk::DescriptorSetLayout,
    scene_set_layout: vk::DescriptorSetLayout,
    offscreen_pipeline_layout: vk::PipelineLayout,
    scene_pipeline_layout: vk::PipelineLayout,
    offscreen_pipeline: vk::Pipeline,
    scene_pipeline: vk::Pipeline,
    quad_pipeline: vk::Pipeline,

    descriptor_pool: vk::DescriptorPool,
    offscreen_sets: Vec<vk::DescriptorSet>,
    scene_sets: Vec<vk::DescriptorSet>,
    quad_sets: Vec<vk::DescriptorSet>,

    offscreen_ubos: Vec<UniformBuffer>,
    scene_ubos: Vec<UniformBuffer>,
    quad_ubos: Vec<UniformBuffer>,

    command_pool: vk::CommandPool,
    command_buffers: Vec<vk::CommandBuffer>,
    sync: FrameSync,

    current_frame: usize,
    framebuffer_resized: bool,

    // Scene state
    config: DemoConfig,
    camera: OrbitCamera,
    light_settings: LightSettings,
    light_pos: Vec3,
    timer: f32,
    animate_light: bool,
    light_pov: bool,
    display_shadow_map: bool,

    window: Window,
    ctx: VulkanContext,
}

impl ShadowMappingApp {
    fn new(window: Window, config: DemoConfig) -> Result<Self> {
        unsafe {
            let ctx = VulkanContext::new(
                &window,
                "Projected shadow mapping",
                RequiredFeatures::default(),
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

            let render_pass = create_main_render_pass(&ctx.device, swapchain.format, depth_target.format)?;
            let framebuffers = create_framebuffers(&ctx.device, render_pass, &swapchain, depth_target.view)?;

            let command_pool_info = vk::CommandPoolCreateInfo::default()
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
                .queue_family_index(ctx.graphics_queue_family);
            let command_pool = ctx.device.create_command_pool(&command_pool_info, None)?;

            let shadow_fb = ShadowFramebuffer::new(
                &ctx.instance,
                ctx.physical_device,
                &ctx.device,
                config.shadow.map_size,
            )?;

            // Vertex layout the shadow shaders consume
            let layout = vertex_layout();

            let scene_model = match &config.shadow.model_path {
                Some(path) => Model::from_obj(Path::new(path), 1.0)
                    .with_context(|| format!("Failed to load scene model {}", path))?,
                None => Model::sample_scene(),
            };
            println!(
                "Scene: {} parts, {} vertices, {} indices",
                scene_model.parts.len(),
                scene_model.vertex_count(),
                scene_model.index_count()
            );

            let scene_mesh = GpuMesh::upload(&ctx, command_pool, &scene_model, &layout)?;
            let quad_mesh = GpuMesh::upload(&ctx, command_pool, &Model::quad(), &layout)?;

            // Descriptor set layouts: the offscreen pass only needs its
            // uniform block, the scene and quad share UBO + shadow sampler.
            let offscreen_bindings = [vk::DescriptorSetLayoutBinding::default()
                .binding(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::VERTEX)];
            let offscreen_set_layout = ctx.device.create_descriptor_set_layout(
                &vk::DescriptorSetLayoutCreateInfo::default().bindings(&offscreen_bindings),
                None,
            )?;

            let scene_bindings = [
                vk::DescriptorSetLayoutBinding::default()
                    .binding(0)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .descriptor_count(1)
                    .stage_flags(vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT),
                vk::DescriptorSetLayoutBinding::default()
                    .binding(1)
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .descriptor_count(1)
                    .stage_flags(vk::ShaderStageFlags::FRAGMENT),
            ];
            let scene_set_layout = ctx.device.create_descriptor_set_layout(
                &vk::DescriptorSetLayoutCreateInfo::default().bindings(&scene_bindings),
                None,
            )?;

            let offscreen_layouts = [offscreen_set_layout];
            let offscreen_pipeline_layout = ctx.device.create_pipeline_layout(
                &vk::PipelineLayoutCreateInfo::default().set_layouts(&offscreen_layouts),
                None,
            )?;
            let scene_layouts = [scene_set_layout];
            let scene_pipeline_layout = ctx.device.create_pipeline_layout(
                &vk::PipelineLayoutCreateInfo::default().set_layouts(&scene_layouts),
                None,
            )?;

            let (offscreen_pipeline, scene_pipeline, quad_pipeline) = create_pipelines(
                &ctx.device,
                &layout,
                offscreen_pipeline_layout,
                scene_pipeline_layout,
                shadow_fb.render_pass,
                render_pass,
            )?;

            // Per-frame uniform buffers
            let mut offscreen_ubos = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
            let mut scene_ubos = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
            let mut quad_ubos = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
            for _ in 0..MAX_FRAMES_IN_FLIGHT {
                offscreen_ubos.push(UniformBuffer::new(
                    &ctx.instance,
                    ctx.physical_device,
                    &ctx.device,
                    std::mem::size_of::<OffscreenUbo>() as vk::DeviceSize,
                )?);
                scene_ubos.push(UniformBuffer::new(
                    &ctx.instance,
                    ctx.physical_device,
                    &ctx.device,
                    std::mem::size_of::<SceneUbo>() as vk::DeviceSize,
                )?);
                quad_ubos.push(UniformBuffer::new(
                    &ctx.instance,
                    ctx.physical_device,
                    &ctx.device,
                    std::mem::size_of::<QuadUbo>() as vk::DeviceSize,
                )?);
            }

            // Descriptor pool: three sets per frame, two of them sampling
            // the shadow map.
            let pool_sizes = [
                vk::DescriptorPoolSize::default()
                    .ty(vk::DescriptorType::UNIFORM_BUFFER)
                    .descriptor_count((3 * MAX_FRAMES_IN_FLIGHT) as u32),
                vk::DescriptorPoolSize::default()
                    .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .descriptor_count((2 * MAX_FRAMES_IN_FLIGHT) as u32),
            ];
            let pool_info = vk::DescriptorPoolCreateInfo::default()
                .pool_sizes(&pool_sizes)
                .max_sets((3 * MAX_FRAMES_IN_FLIGHT) as u32);
            let descriptor_pool = ctx.device.create_descriptor_pool(&pool_info, None)?;

            let offscreen_sets =
                allocate_sets(&ctx.device, descriptor_pool, offscreen_set_layout)?;
            let scene_sets = allocate_sets(&ctx.device, descriptor_pool, scene_set_layout)?;
            let quad_sets = allocate_sets(&ctx.device, descriptor_pool, scene_set_layout)?;

            let shadow_map_info = [shadow_fb.descriptor_info()];
            for frame in 0..MAX_FRAMES_IN_FLIGHT {
                let offscreen_buffer_info = [offscreen_ubos[frame].descriptor_info()];
                let scene_buffer_info = [scene_ubos[frame].descriptor_info()];
                let quad_buffer_info = [quad_ubos[frame].descriptor_info()];

                let writes = [
                    vk::WriteDescriptorSet::default()
                        .dst_set(offscreen_sets[frame])
                        .dst_binding(0)
                        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                        .buffer_info(&offscreen_buffer_info),
                    vk::WriteDescriptorSet::default()
                        .dst_set(scene_sets[frame])
                        .dst_binding(0)
                        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                        .buffer_info(&scene_buffer_info),
                    vk::WriteDescriptorSet::default()
                        .dst_set(scene_sets[frame])
                        .dst_binding(1)
                        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                        .image_info(&shadow_map_info),
                    vk::WriteDescriptorSet::default()
                        .dst_set(quad_sets[frame])
                        .dst_binding(0)
                        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                        .buffer_info(&quad_buffer_info),
                    vk::WriteDescriptorSet::default()
                        .dst_set(quad_sets[frame])
                        .dst_binding(1)
                        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                        .image_info(&shadow_map_info),
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
                config.shadow.z_near,
                config.shadow.z_far,
            );
            let light_settings = LightSettings {
                fov_y: config.shadow.light_fov,
                z_near: config.shadow.z_near,
                z_far: config.shadow.z_far,
            };
            let animate_light = config.shadow.animate_light;

            Ok(Self {
                swapchain,
                depth_target,
                render_pass,
                framebuffers,
                shadow_fb,
                scene_mesh,
                quad_mesh,
                offscreen_set_layout,
                scene_set_layout,
                offscreen_pipeline_layout,
                scene_pipeline_layout,
                offscreen_pipeline,
                scene_pipeline,
                quad_pipeline,
                descriptor_pool,
                offscreen_sets,
                scene_sets,
                quad_sets,
                offscreen_ubos,
                scene_ubos,
                quad_ubos,
                command_pool,
                command_buffers,
                sync,
                current_frame: 0,
                framebuffer_resized: false,
                config,
                camera,
                light_settings,
                light_pos: shadow::animated_light_position(0.0),
                timer: 0.0,
                animate_light,
                light_pov: false,
                display_shadow_map: false,
                window,
                ctx,
            })
        }
    }

    fn update(&mut self, delta_seconds: f32) {
        if self.animate_light {
            self.timer = (self.timer + delta_seconds * 0.125).fract();
            self.light_pos = shadow::animated_light_position(self.timer);
        }
    }

    unsafe fn update_uniforms(&self, frame: usize) -> Result<()> {
        let depth_mvp = shadow::depth_mvp(self.light_pos, &self.light_settings);

        let offscreen = OffscreenUbo { depth_mvp };
        self.offscreen_ubos[frame].update(&self.ctx.device, &offscreen)?;

        let aspect = self.swapchain.extent.width as f32 / self.swapchain.extent.height as f32;
        let (projection, view) = if self.light_pov {
            let mut proj = Mat4::perspective_rh(
                self.light_settings.fov_y.to_radians(),
                aspect,
                self.light_settings.z_near,
                self.light_settings.z_far,
            );
            proj.y_axis.y *= -1.0;
            (proj, shadow::light_view(self.light_pos))
        } else {
            (self.camera.projection_matrix(aspect), self.camera.view_matrix())
        };

        let scene = SceneUbo {
            projection,
            view,
            model: Mat4::IDENTITY,
            depth_bias_mvp: shadow::bias_matrix() * depth_mvp,
            light_pos: Vec4::new(self.light_pos.x, self.light_pos.y, self.light_pos.z, 1.0),
        };
        self.scene_ubos[frame].update(&self.ctx.device, &scene)?;

        let quad = QuadUbo {
            projection: shadow::quad_projection(
                self.swapchain.extent.width as f32,
                self.swapchain.extent.height as f32,
            ),
            model: Mat4::IDENTITY,
        };
        self.quad_ubos[frame].update(&self.ctx.device, &quad)?;

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

        // Pass 1: depth from the light's point of view
        {
            let clear_values = [vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            }];
            let begin_info = vk::RenderPassBeginInfo::default()
                .render_pass(self.shadow_fb.render_pass)
                .framebuffer(self.shadow_fb.framebuffer)
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent: self.shadow_fb.extent(),
                })
                .clear_values(&clear_values);

            device.cmd_begin_render_pass(command_buffer, &begin_info, vk::SubpassContents::INLINE);

            set_viewport_scissor(device, command_buffer, self.shadow_fb.extent());
            device.cmd_set_depth_bias(
                command_buffer,
                self.config.shadow.depth_bias_constant,
                0.0,
                self.config.shadow.depth_bias_slope,
            );

            device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.offscreen_pipeline,
            );
            device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.offscreen_pipeline_layout,
                0,
                &[self.offscreen_sets[frame]],
                &[],
            );
            self.scene_mesh.bind(device, command_buffer);
            device.cmd_draw_indexed(command_buffer, self.scene_mesh.index_count, 1, 0, 0, 0);

            device.cmd_end_render_pass(command_buffer);
        }

        // Pass 2: lit scene sampling the shadow map
        {
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

            set_viewport_scissor(device, command_buffer, self.swapchain.extent);

            if self.display_shadow_map {
                device.cmd_bind_pipeline(
                    command_buffer,
                    vk::PipelineBindPoint::GRAPHICS,
                    self.quad_pipeline,
                );
                device.cmd_bind_descriptor_sets(
                    command_buffer,
                    vk::PipelineBindPoint::GRAPHICS,
                    self.scene_pipeline_layout,
                    0,
                    &[self.quad_sets[frame]],
                    &[],
                );
                self.quad_mesh.bind(device, command_buffer);
                device.cmd_draw_indexed(command_buffer, self.quad_mesh.index_count, 1, 0, 0, 0);
            }

            device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.scene_pipeline,
            );
            device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.scene_pipeline_layout,
                0,
                &[self.scene_sets[frame]],
                &[],
            );
            self.scene_mesh.bind(device, command_buffer);
            device.cmd_draw_indexed(command_buffer, self.scene_mesh.index_count, 1, 0, 0, 0);

            device.cmd_end_render_pass(command_buffer);
        }

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
            KeyCode::KeyP => {
                self.animate_light = !self.animate_light;
                println!("Light animation: {}", self.animate_light);
            }
            KeyCode::KeyL => {
                self.light_pov = !self.light_pov;
                println!("Light POV: {}", self.light_pov);
            }
            KeyCode::KeyS => {
                self.display_shadow_map = !self.display_shadow_map;
                println!("Shadow map display: {}", self.display_shadow_map);
            }
            _ => {}
        }
    }
}

impl Drop for ShadowMappingApp {
    fn drop(&mut self) {
        unsafe {
            let device = &self.ctx.device;
            let _ = device.device_wait_idle();

            self.sync.destroy(device);

            for ubo in &mut self.offscreen_ubos {
                ubo.destroy(device);
            }
            for ubo in &mut self.scene_ubos {
                ubo.destroy(device);
            }
            for ubo in &mut self.quad_ubos {
                ubo.destroy(device);
            }

            device.destroy_descriptor_pool(self.descriptor_pool, None);

            device.destroy_pipeline(self.offscreen_pipeline, None);
            device.destroy_pipeline(self.scene_pipeline, None);
            device.destroy_pipeline(self.quad_pipeline, None);
            device.destroy_pipeline_layout(self.offscreen_pipeline_layout, None);
            device.destroy_pipeline_layout(self.scene_pipeline_layout, None);
            device.destroy_descriptor_set_layout(self.offscreen_set_layout, None);
            device.destroy_descriptor_set_layout(self.scene_set_layout, None);

            self.scene_mesh.destroy(device);
            self.quad_mesh.destroy(device);
            self.shadow_fb.destroy(device);

            for &framebuffer in &self.framebuffers {
                device.destroy_framebuffer(framebuffer, None);
            }
            device.destroy_render_pass(self.render_pass, None);
            self.depth_target.destroy(device);
            self.swapchain.cleanup_image_views(device);

            device.destroy_command_pool(self.command_pool, None);
        }
        // SwapchainManager and VulkanContext clean up the rest on drop,
        // in field order.
    }
}

fn vertex_layout() -> VertexLayout {
    VertexLayout::new(&[
        VertexComponent::Position,
        VertexComponent::Uv,
        VertexComponent::Color,
        VertexComponent::Normal,
    ])
}

unsafe fn allocate_sets(
    device: &ash::Device,
    pool: vk::DescriptorPool,
    layout: vk::DescriptorSetLayout,
) -> Result<Vec<vk::DescriptorSet>> {
    let layouts = vec![layout; MAX_FRAMES_IN_FLIGHT];
    let alloc_info = vk::DescriptorSetAllocateInfo::default()
        .descriptor_pool(pool)
        .set_layouts(&layouts);
    Ok(device.allocate_descriptor_sets(&alloc_info)?)
}

unsafe fn set_viewport_scissor(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    extent: vk::Extent2D,
) {
    let viewport = vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    };
    device.cmd_set_viewport(command_buffer, 0, &[viewport]);

    let scissor = vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    };
    device.cmd_set_scissor(command_buffer, 0, &[scissor]);
}

unsafe fn create_main_render_pass(
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
    offscreen_pipeline_layout: vk::PipelineLayout,
    scene_pipeline_layout: vk::PipelineLayout,
    shadow_render_pass: vk::RenderPass,
    main_render_pass: vk::RenderPass,
) -> Result<(vk::Pipeline, vk::Pipeline, vk::Pipeline)> {
    let shader_dir = Path::new("shaders/shadowmapping");

    let offscreen_vert =
        pipeline::create_shader_module(device, &shader_dir.join("offscreen.vert.spv"))?;
    let scene_vert = pipeline::create_shader_module(device, &shader_dir.join("scene.vert.spv"))?;
    let scene_frag = pipeline::create_shader_module(device, &shader_dir.join("scene.frag.spv"))?;
    let quad_vert = pipeline::create_shader_module(device, &shader_dir.join("quad.vert.spv"))?;
    let quad_frag = pipeline::create_shader_module(device, &shader_dir.join("quad.frag.spv"))?;

    let bindings = [layout.binding_description()];
    let attributes = layout.attribute_descriptions();

    let offscreen_stages = [pipeline::shader_stage(
        offscreen_vert,
        vk::ShaderStageFlags::VERTEX,
    )];
    let offscreen_pipeline = pipeline::create_graphics_pipeline(
        device,
        &GraphicsPipelineDesc {
            stages: &offscreen_stages,
            bindings: &bindings,
            attributes: &attributes,
            cull_mode: vk::CullModeFlags::NONE,
            depth_bias_dynamic: true,
            color_attachment: false,
            layout: offscreen_pipeline_layout,
            render_pass: shadow_render_pass,
            ..Default::default()
        },
    )?;

    let scene_stages = [
        pipeline::shader_stage(scene_vert, vk::ShaderStageFlags::VERTEX),
        pipeline::shader_stage(scene_frag, vk::ShaderStageFlags::FRAGMENT),
    ];
    let scene_pipeline = pipeline::create_graphics_pipeline(
        device,
        &GraphicsPipelineDesc {
            stages: &scene_stages,
            bindings: &bindings,
            attributes: &attributes,
            cull_mode: vk::CullModeFlags::NONE,
            layout: scene_pipeline_layout,
            render_pass: main_render_pass,
            ..Default::default()
        },
    )?;

    let quad_stages = [
        pipeline::shader_stage(quad_vert, vk::ShaderStageFlags::VERTEX),
        pipeline::shader_stage(quad_frag, vk::ShaderStageFlags::FRAGMENT),
    ];
    let quad_pipeline = pipeline::create_graphics_pipeline(
        device,
        &GraphicsPipelineDesc {
            stages: &quad_stages,
            bindings: &bindings,
            attributes: &attributes,
            cull_mode: vk::CullModeFlags::NONE,
            layout: scene_pipeline_layout,
            render_pass: main_render_pass,
            ..Default::default()
        },
    )?;

    // Pipelines hold their own references to the shader code
    device.destroy_shader_module(offscreen_vert, None);
    device.destroy_shader_module(scene_vert, None);
    device.destroy_shader_module(scene_frag, None);
    device.destroy_shader_module(quad_vert, None);
    device.destroy_shader_module(quad_frag, None);

    Ok((offscreen_pipeline, scene_pipeline, quad_pipeline))
}

fn main() -> Result<()> {
    let mut config = DemoConfig::load_or_default(CONFIG_PATH);

    // An OBJ path on the command line overrides the configured scene
    if let Some(path) = std::env::args().nth(1) {
        config.shadow.model_path = Some(path);
    }

    let event_loop = EventLoop::new()?;
    let window = WindowBuilder::new()
        .with_title("Vulkan samples - projected shadow mapping")
        .with_inner_size(LogicalSize::new(config.window.width, config.window.height))
        .build(&event_loop)?;

    let mut app = ShadowMappingApp::new(window, config)?;

    let mut last_frame = Instant::now();
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
                    let now = Instant::now();
                    let delta = now.duration_since(last_frame).as_secs_f32();
                    last_frame = now;

                    app.update(delta);
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
