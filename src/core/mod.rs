pub mod buffer;
pub mod camera;
pub mod offscreen;
pub mod pipeline;
pub mod swapchain;
pub mod sync;
pub mod texture;
pub mod vulkan_context;

pub use camera::OrbitCamera;
pub use offscreen::ShadowFramebuffer;
pub use swapchain::SwapchainManager;
pub use sync::FrameSync;
pub use texture::Texture;
pub use vulkan_context::VulkanContext;

/// Frames that may be recorded concurrently before the CPU waits on a fence.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;
