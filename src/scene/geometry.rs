//! CPU-side mesh data.

use std::sync::Arc;

use glam::{Vec3, Vec4};

use crate::errors::{Error, Result};
use crate::render::GpuMeshId;

/// Axis-aligned bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Triangle list with per-vertex normals and u32 indices.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl Geometry {
    /// Builds a geometry from decoded attribute streams.
    ///
    /// Missing indices are generated sequentially. Missing normals are
    /// computed flat, which un-indexes the triangles.
    pub fn from_parts(
        positions: Vec<[f32; 3]>,
        normals: Option<Vec<[f32; 3]>>,
        indices: Option<Vec<u32>>,
    ) -> Result<Self> {
        if positions.is_empty() {
            return Err(Error::Decode("primitive has no positions".into()));
        }

        let vertex_count = positions.len();
        let indices = indices.unwrap_or_else(|| (0..vertex_count as u32).collect());

        if indices.len() % 3 != 0 {
            return Err(Error::Decode(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(Error::Decode(format!(
                "index {bad} out of range for {vertex_count} vertices"
            )));
        }

        match normals {
            Some(normals) if normals.len() == vertex_count => Ok(Self {
                positions,
                normals,
                indices,
            }),
            Some(normals) => Err(Error::Decode(format!(
                "normal count {} does not match vertex count {vertex_count}",
                normals.len()
            ))),
            None => Ok(Self::flat_shaded(&positions, &indices)),
        }
    }

    fn flat_shaded(positions: &[[f32; 3]], indices: &[u32]) -> Self {
        let mut out_positions = Vec::with_capacity(indices.len());
        let mut out_normals = Vec::with_capacity(indices.len());

        for tri in indices.chunks_exact(3) {
            let a = Vec3::from_array(positions[tri[0] as usize]);
            let b = Vec3::from_array(positions[tri[1] as usize]);
            let c = Vec3::from_array(positions[tri[2] as usize]);
            let n = (b - a).cross(c - a).normalize_or_zero().to_array();
            for p in [a, b, c] {
                out_positions.push(p.to_array());
                out_normals.push(n);
            }
        }

        let count = out_positions.len() as u32;
        Self {
            positions: out_positions,
            normals: out_normals,
            indices: (0..count).collect(),
        }
    }

    /// Flat ring in the XZ plane facing +Y.
    #[must_use]
    pub fn ring(inner_radius: f32, outer_radius: f32, segments: u32) -> Self {
        let segments = segments.max(3);
        let mut positions = Vec::with_capacity((segments as usize + 1) * 2);
        let mut normals = Vec::with_capacity(positions.capacity());
        let mut indices = Vec::with_capacity(segments as usize * 6);

        for i in 0..=segments {
            let theta = i as f32 / segments as f32 * std::f32::consts::TAU;
            let (sin, cos) = theta.sin_cos();
            positions.push([cos * inner_radius, 0.0, -sin * inner_radius]);
            positions.push([cos * outer_radius, 0.0, -sin * outer_radius]);
            normals.push([0.0, 1.0, 0.0]);
            normals.push([0.0, 1.0, 0.0]);
        }

        for i in 0..segments {
            let inner = i * 2;
            let outer = inner + 1;
            let next_inner = inner + 2;
            let next_outer = inner + 3;
            indices.extend_from_slice(&[inner, outer, next_outer, inner, next_outer, next_inner]);
        }

        Self {
            positions,
            normals,
            indices,
        }
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut iter = self.positions.iter().map(|p| Vec3::from_array(*p));
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(BoundingBox { min, max })
    }
}

/// Unlit base colour plus hemisphere-lit shading.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    pub base_color: Vec4,
    pub double_sided: bool,
}

impl Material {
    #[must_use]
    pub fn new(base_color: Vec4) -> Self {
        Self {
            name: None,
            base_color,
            double_sided: false,
        }
    }

    #[must_use]
    pub fn with_double_sided(mut self, double_sided: bool) -> Self {
        self.double_sided = double_sided;
        self
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new(Vec4::ONE)
    }
}

/// Binds a geometry and material to a node. Holds at most one GPU upload.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub geometry: Arc<Geometry>,
    pub material: Material,
    pub(crate) gpu: Option<GpuMeshId>,
}

impl Mesh {
    #[must_use]
    pub fn new(geometry: Arc<Geometry>, material: Material) -> Self {
        Self {
            geometry,
            material,
            gpu: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn gpu_id(&self) -> Option<GpuMeshId> {
        self.gpu
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_indices_when_absent() {
        let g = Geometry::from_parts(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            Some(vec![[0.0, 0.0, 1.0]; 3]),
            None,
        )
        .unwrap();
        assert_eq!(g.indices, vec![0, 1, 2]);
    }

    #[test]
    fn flat_normals_face_counter_clockwise() {
        let g = Geometry::from_parts(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
            None,
            Some(vec![0, 1, 2, 2, 1, 3]),
        )
        .unwrap();
        assert_eq!(g.vertex_count(), 6);
        assert!(g.normals.iter().all(|n| *n == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn out_of_range_index_is_decode_error() {
        let err = Geometry::from_parts(vec![[0.0; 3]; 3], None, Some(vec![0, 1, 7])).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn ring_lies_flat_between_radii() {
        let ring = Geometry::ring(0.15, 0.2, 32);
        assert_eq!(ring.triangle_count(), 64);
        let bounds = ring.bounding_box().unwrap();
        assert_eq!(bounds.min.y, 0.0);
        assert_eq!(bounds.max.y, 0.0);
        assert!((bounds.max.x - 0.2).abs() < 1e-6);
        for p in &ring.positions {
            let r = (p[0] * p[0] + p[2] * p[2]).sqrt();
            assert!(r > 0.149 && r < 0.201);
        }
    }
}
