use glam::Affine3A;

use crate::scene::transform::Transform;
use crate::scene::{MeshKey, NodeHandle};

/// A scene-graph node.
///
/// Nodes form a tree through `parent`/`children`. Use [`Scene::attach`]
/// rather than editing the links directly so both sides stay in sync.
///
/// [`Scene::attach`]: crate::scene::Scene::attach
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,

    pub name: Option<String>,
    pub transform: Transform,
    /// Hidden nodes hide their whole subtree.
    pub visible: bool,
    pub(crate) mesh: Option<MeshKey>,
}

impl Node {
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            name: None,
            transform: Transform::new(),
            visible: true,
            mesh: None,
        }
    }

    #[must_use]
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new()
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn mesh(&self) -> Option<MeshKey> {
        self.mesh
    }

    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.transform.world_matrix
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}
