//! Offscreen surface that records what would have been drawn.

use slotmap::SlotMap;

use crate::errors::{Error, Result};
use crate::render::GpuMeshId;
use crate::render::surface::{RenderSurface, RenderView};
use crate::scene::geometry::{Geometry, Material};
use crate::scene::scene::DrawItem;

#[derive(Debug, Clone)]
struct HeadlessMesh {
    triangles: usize,
}

/// A [`RenderSurface`] without a GPU.
///
/// Tracks uploads and frames so tests and servers can drive a viewer
/// without a window.
#[derive(Debug)]
pub struct HeadlessSurface {
    width: u32,
    height: u32,
    meshes: SlotMap<GpuMeshId, HeadlessMesh>,
    frames_rendered: u64,
    total_uploads: u64,
    last_draws: Vec<GpuMeshId>,
    last_view: Option<RenderView>,
    released: bool,
}

impl HeadlessSurface {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            meshes: SlotMap::with_key(),
            frames_rendered: 0,
            total_uploads: 0,
            last_draws: Vec::new(),
            last_view: None,
            released: false,
        }
    }

    #[must_use]
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    #[must_use]
    pub fn total_uploads(&self) -> u64 {
        self.total_uploads
    }

    /// Meshes drawn by the most recent frame.
    #[must_use]
    pub fn last_draws(&self) -> &[GpuMeshId] {
        &self.last_draws
    }

    #[must_use]
    pub fn last_view(&self) -> Option<&RenderView> {
        self.last_view.as_ref()
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }

    #[must_use]
    pub fn triangles(&self, id: GpuMeshId) -> Option<usize> {
        self.meshes.get(id).map(|m| m.triangles)
    }
}

impl RenderSurface for HeadlessSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.width = width;
            self.height = height;
        }
    }

    fn upload_mesh(&mut self, geometry: &Geometry, _material: &Material) -> Result<GpuMeshId> {
        if self.released {
            return Err(Error::Gpu("surface has been released".into()));
        }
        self.total_uploads += 1;
        Ok(self.meshes.insert(HeadlessMesh {
            triangles: geometry.triangle_count(),
        }))
    }

    fn release_mesh(&mut self, id: GpuMeshId) {
        self.meshes.remove(id);
    }

    fn live_resources(&self) -> usize {
        self.meshes.len()
    }

    fn render(&mut self, view: &RenderView, draws: &[DrawItem]) -> Result<()> {
        if self.released {
            return Err(Error::Gpu("surface has been released".into()));
        }
        self.last_draws = draws
            .iter()
            .map(|d| d.gpu)
            .filter(|id| self.meshes.contains_key(*id))
            .collect();
        self.last_view = Some(*view);
        self.frames_rendered += 1;
        Ok(())
    }

    fn release(&mut self) {
        if !self.meshes.is_empty() {
            log::warn!("Releasing surface with {} live meshes", self.meshes.len());
        }
        self.meshes.clear();
        self.last_draws.clear();
        self.released = true;
    }
}
