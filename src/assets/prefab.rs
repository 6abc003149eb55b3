use std::sync::Arc;

use crate::scene::geometry::Mesh;
use crate::scene::transform::Transform;

/// Prefab node: plain data, children referenced by index.
#[derive(Debug, Clone, Default)]
pub struct PrefabNode {
    pub name: Option<String>,
    pub transform: Transform,
    /// Indices into [`Prefab::nodes`].
    pub children_indices: Vec<usize>,
    pub mesh: Option<Mesh>,
}

impl PrefabNode {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Decoded, scene-independent model.
///
/// Holds no node handles or scene references, so it can be built on a loader
/// thread and instantiated with [`Scene::instantiate`] at a frame boundary.
///
/// [`Scene::instantiate`]: crate::scene::Scene::instantiate
#[derive(Debug, Clone, Default)]
pub struct Prefab {
    pub nodes: Vec<PrefabNode>,
    pub root_indices: Vec<usize>,
}

impl Prefab {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mesh_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.mesh.is_some()).count()
    }

    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&PrefabNode> {
        self.nodes.iter().find(|n| n.name.as_deref() == Some(name))
    }
}

pub type SharedPrefab = Arc<Prefab>;
