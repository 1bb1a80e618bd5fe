//! Graphics pipeline construction shared by both samples. Pipelines differ
//! in shader stages, vertex layout, topology and rasterization details;
//! everything else (dynamic viewport/scissor, single-sample, LESS_OR_EQUAL
//! depth) is common.

use anyhow::{Context, Result};
use ash::vk;
use std::ffi::CStr;
use std::path::Path;

const SHADER_ENTRY: &CStr = c"main";

/// Load a SPIR-V file produced by `shaders/compile.sh`.
pub unsafe fn create_shader_module(
    device: &ash::Device,
    path: &Path,
) -> Result<vk::ShaderModule> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read shader {} (run shaders/compile.sh)", path.display()))?;
    let code = ash::util::read_spv(&mut std::io::Cursor::new(&bytes))
        .with_context(|| format!("Invalid SPIR-V in {}", path.display()))?;

    let create_info = vk::ShaderModuleCreateInfo::default().code(&code);
    Ok(device.create_shader_module(&create_info, None)?)
}

pub fn shader_stage(
    module: vk::ShaderModule,
    stage: vk::ShaderStageFlags,
) -> vk::PipelineShaderStageCreateInfo<'static> {
    vk::PipelineShaderStageCreateInfo::default()
        .stage(stage)
        .module(module)
        .name(SHADER_ENTRY)
}

pub struct GraphicsPipelineDesc<'a> {
    pub stages: &'a [vk::PipelineShaderStageCreateInfo<'a>],
    pub bindings: &'a [vk::VertexInputBindingDescription],
    pub attributes: &'a [vk::VertexInputAttributeDescription],
    pub topology: vk::PrimitiveTopology,
    /// Non-zero enables the tessellation state (PATCH_LIST topology).
    pub patch_control_points: u32,
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    /// Adds DEPTH_BIAS to the dynamic state and enables biasing; used by
    /// the shadow pass.
    pub depth_bias_dynamic: bool,
    /// False for depth-only passes with no color attachment.
    pub color_attachment: bool,
    pub layout: vk::PipelineLayout,
    pub render_pass: vk::RenderPass,
}

impl Default for GraphicsPipelineDesc<'_> {
    fn default() -> Self {
        Self {
            stages: &[],
            bindings: &[],
            attributes: &[],
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            patch_control_points: 0,
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::BACK,
            front_face: vk::FrontFace::COUNTER_CLOCKWISE,
            depth_bias_dynamic: false,
            color_attachment: true,
            layout: vk::PipelineLayout::null(),
            render_pass: vk::RenderPass::null(),
        }
    }
}

pub unsafe fn create_graphics_pipeline(
    device: &ash::Device,
    desc: &GraphicsPipelineDesc,
) -> Result<vk::Pipeline> {
    let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(desc.bindings)
        .vertex_attribute_descriptions(desc.attributes);

    let input_assembly_state =
        vk::PipelineInputAssemblyStateCreateInfo::default().topology(desc.topology);

    let tessellation_state = vk::PipelineTessellationStateCreateInfo::default()
        .patch_control_points(desc.patch_control_points);

    // Viewport and scissor are dynamic; only the counts matter here.
    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewport_count(1)
        .scissor_count(1);

    let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
        .polygon_mode(desc.polygon_mode)
        .cull_mode(desc.cull_mode)
        .front_face(desc.front_face)
        .depth_bias_enable(desc.depth_bias_dynamic)
        .line_width(1.0);

    let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);

    let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(true)
        .depth_write_enable(true)
        .depth_compare_op(vk::CompareOp::LESS_OR_EQUAL);

    let blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
        .color_write_mask(vk::ColorComponentFlags::RGBA)
        .blend_enable(false)];
    let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
        .attachments(if desc.color_attachment { &blend_attachments } else { &[] });

    let mut dynamic_states = vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    if desc.depth_bias_dynamic {
        dynamic_states.push(vk::DynamicState::DEPTH_BIAS);
    }
    let dynamic_state =
        vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

    let mut pipeline_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(desc.stages)
        .vertex_input_state(&vertex_input_state)
        .input_assembly_state(&input_assembly_state)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization_state)
        .multisample_state(&multisample_state)
        .depth_stencil_state(&depth_stencil_state)
        .color_blend_state(&color_blend_state)
        .dynamic_state(&dynamic_state)
        .layout(desc.layout)
        .render_pass(desc.render_pass)
        .subpass(0);

    if desc.patch_control_points > 0 {
        pipeline_info = pipeline_info.tessellation_state(&tessellation_state);
    }

    let pipelines = device
        .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
        .map_err(|(_, e)| anyhow::anyhow!("Pipeline creation failed: {}", e))?;

    Ok(pipelines[0])
}
