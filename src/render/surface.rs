use glam::{Mat4, Vec3};

use crate::errors::Result;
use crate::render::GpuMeshId;
use crate::scene::geometry::{Geometry, Material};
use crate::scene::light::HemisphereLight;
use crate::scene::scene::DrawItem;

/// Per-frame camera and lighting inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderView {
    pub view_projection: Mat4,
    pub camera_position: Vec3,
    pub light: HemisphereLight,
}

/// A drawable target owning the GPU-side copies of scene meshes.
///
/// The viewer owns exactly one surface; every upload it makes is released
/// again before [`release`](Self::release) is called.
pub trait RenderSurface {
    /// Current size in physical pixels.
    fn size(&self) -> (u32, u32);

    /// Resizes the drawable. Zero-sized requests are ignored.
    fn resize(&mut self, width: u32, height: u32);

    fn upload_mesh(&mut self, geometry: &Geometry, material: &Material) -> Result<GpuMeshId>;

    /// Frees one upload. Unknown ids are ignored.
    fn release_mesh(&mut self, id: GpuMeshId);

    /// Number of uploads currently held.
    fn live_resources(&self) -> usize;

    fn render(&mut self, view: &RenderView, draws: &[DrawItem]) -> Result<()>;

    /// Drops every remaining GPU object, including the drawable itself.
    fn release(&mut self);
}

impl<S: RenderSurface + ?Sized> RenderSurface for Box<S> {
    fn size(&self) -> (u32, u32) {
        (**self).size()
    }

    fn resize(&mut self, width: u32, height: u32) {
        (**self).resize(width, height);
    }

    fn upload_mesh(&mut self, geometry: &Geometry, material: &Material) -> Result<GpuMeshId> {
        (**self).upload_mesh(geometry, material)
    }

    fn release_mesh(&mut self, id: GpuMeshId) {
        (**self).release_mesh(id);
    }

    fn live_resources(&self) -> usize {
        (**self).live_resources()
    }

    fn render(&mut self, view: &RenderView, draws: &[DrawItem]) -> Result<()> {
        (**self).render(view, draws)
    }

    fn release(&mut self) {
        (**self).release();
    }
}
