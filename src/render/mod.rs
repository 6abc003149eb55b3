//! Rendering.
//!
//! - [`RenderSurface`]: the drawable the viewer renders into
//! - [`HeadlessSurface`]: a GPU-less surface for tests and tools
//! - [`gpu::WgpuSurface`]: the wgpu backend (feature `wgpu`)
//! - [`RenderScheduler`]: which frame loop is allowed to render

pub mod headless;
pub mod scheduler;
pub mod surface;

#[cfg(feature = "wgpu")]
pub mod gpu;

pub use headless::HeadlessSurface;
pub use scheduler::{FrameSource, FrameTicket, RenderMode, RenderScheduler};
pub use surface::{RenderSurface, RenderView};

slotmap::new_key_type! {
    /// Handle to a mesh uploaded to a [`RenderSurface`].
    pub struct GpuMeshId;
}
