//! Shared library for the Vulkan sample binaries: the rendering core
//! (context, swapchain, buffers, textures, pipelines), the mesh data model
//! with sub-mesh flattening, and the host-side math each demo drives its
//! uniforms with.

pub mod config;
pub mod core;
pub mod mesh;
pub mod shadow;
pub mod tessellation;
