use glam::Affine3A;
use slotmap::SlotMap;

use crate::assets::prefab::Prefab;
use crate::render::GpuMeshId;
use crate::scene::geometry::Mesh;
use crate::scene::node::Node;
use crate::scene::{MeshKey, NodeHandle};

/// A mesh ready to draw: its GPU upload and world matrix.
#[derive(Debug, Clone, Copy)]
pub struct DrawItem {
    pub node: NodeHandle,
    pub mesh: MeshKey,
    pub gpu: GpuMeshId,
    pub world: Affine3A,
}

/// Scene graph.
///
/// Pure data: nodes in a slot map, meshes as components keyed by
/// [`MeshKey`]. GPU uploads are tracked per mesh but owned by the render
/// surface; removing a subtree hands the GPU ids back to the caller.
#[derive(Default)]
pub struct Scene {
    pub nodes: SlotMap<NodeHandle, Node>,
    pub root_nodes: Vec<NodeHandle>,
    pub meshes: SlotMap<MeshKey, Mesh>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Node Lifecycle
    // ========================================================================

    /// Creates a detached node.
    pub fn create_node(&mut self) -> NodeHandle {
        self.nodes.insert(Node::new())
    }

    pub fn create_node_with_name(&mut self, name: &str) -> NodeHandle {
        self.nodes.insert(Node::with_name(name))
    }

    /// Inserts a node at the top level.
    pub fn add_node(&mut self, node: Node) -> NodeHandle {
        let handle = self.nodes.insert(node);
        self.root_nodes.push(handle);
        handle
    }

    /// Makes `child` a child of `parent`, detaching it from wherever it was.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) {
        if !self.nodes.contains_key(child) || self.is_ancestor_or_self(child, parent) {
            return;
        }
        self.detach(child);

        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
            c.transform.mark_dirty();
        }
    }

    /// Walks up from `node`; true if `candidate` is on the way (or missing).
    fn is_ancestor_or_self(&self, candidate: NodeHandle, node: NodeHandle) -> bool {
        let mut current = Some(node);
        while let Some(h) = current {
            if h == candidate {
                return true;
            }
            let Some(n) = self.nodes.get(h) else {
                return true;
            };
            current = n.parent;
        }
        false
    }

    /// Unlinks `handle` from its parent (or from the top level).
    fn detach(&mut self, handle: NodeHandle) {
        let Some(node) = self.nodes.get_mut(handle) else {
            return;
        };
        match node.parent.take() {
            Some(parent) => {
                if let Some(p) = self.nodes.get_mut(parent) {
                    p.children.retain(|&c| c != handle);
                }
            }
            None => self.root_nodes.retain(|&r| r != handle),
        }
    }

    /// Removes `handle` and all its descendants along with their meshes.
    /// Returns the GPU uploads those meshes held, for the caller to release.
    pub fn remove_subtree(&mut self, handle: NodeHandle) -> Vec<GpuMeshId> {
        if !self.nodes.contains_key(handle) {
            return Vec::new();
        }
        self.detach(handle);

        let mut released = Vec::new();
        for h in self.collect_subtree(handle) {
            if let Some(node) = self.nodes.remove(h)
                && let Some(key) = node.mesh
                && let Some(mesh) = self.meshes.remove(key)
                && let Some(gpu) = mesh.gpu
            {
                released.push(gpu);
            }
        }
        released
    }

    /// Every node under `root`, root first.
    #[must_use]
    pub fn collect_subtree(&self, root: NodeHandle) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(h) = stack.pop() {
            if let Some(node) = self.nodes.get(h) {
                out.push(h);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    #[inline]
    #[must_use]
    pub fn get_node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    #[inline]
    pub fn get_node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    #[must_use]
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.nodes.contains_key(handle)
    }

    pub fn set_visible(&mut self, handle: NodeHandle, visible: bool) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.visible = visible;
        }
    }

    /// First node named `name` in the subtree under `root`.
    #[must_use]
    pub fn find_by_name(&self, root: NodeHandle, name: &str) -> Option<NodeHandle> {
        self.collect_subtree(root)
            .into_iter()
            .find(|&h| self.nodes[h].name.as_deref() == Some(name))
    }

    // ========================================================================
    // Components
    // ========================================================================

    /// Attaches `mesh` to `node`, replacing any previous one. The replaced
    /// mesh's GPU upload (if any) is returned.
    pub fn set_mesh(&mut self, node: NodeHandle, mesh: Mesh) -> Option<GpuMeshId> {
        let key = self.meshes.insert(mesh);
        let Some(n) = self.nodes.get_mut(node) else {
            self.meshes.remove(key);
            return None;
        };
        let previous = n.mesh.replace(key);
        previous
            .and_then(|k| self.meshes.remove(k))
            .and_then(|m| m.gpu)
    }

    #[must_use]
    pub fn mesh(&self, key: MeshKey) -> Option<&Mesh> {
        self.meshes.get(key)
    }

    pub fn mesh_mut(&mut self, key: MeshKey) -> Option<&mut Mesh> {
        self.meshes.get_mut(key)
    }

    /// Meshes under `root` that have no GPU upload yet.
    #[must_use]
    pub fn pending_uploads(&self, root: NodeHandle) -> Vec<MeshKey> {
        self.collect_subtree(root)
            .into_iter()
            .filter_map(|h| self.nodes[h].mesh)
            .filter(|&k| self.meshes.get(k).is_some_and(|m| m.gpu.is_none()))
            .collect()
    }

    /// Takes every GPU upload out of the scene, leaving the CPU data.
    pub fn drain_gpu_ids(&mut self) -> Vec<GpuMeshId> {
        self.meshes
            .values_mut()
            .filter_map(|m| m.gpu.take())
            .collect()
    }

    // ========================================================================
    // Prefab Instantiation
    // ========================================================================

    /// Instantiates `prefab` under a new top-level node named `name`.
    ///
    /// Only nodes reachable from `prefab.root_indices` are created, so the
    /// whole instance is released by one `remove_subtree(root)`.
    pub fn instantiate(&mut self, prefab: &Prefab, name: &str) -> NodeHandle {
        let root = self.add_node(Node::with_name(name));

        let mut created = vec![false; prefab.nodes.len()];
        let mut stack: Vec<(usize, NodeHandle)> = prefab
            .root_indices
            .iter()
            .rev()
            .map(|&index| (index, root))
            .collect();

        while let Some((index, parent)) = stack.pop() {
            let Some(p) = prefab.nodes.get(index) else {
                continue;
            };
            // Shared or cyclic child references are created once.
            if std::mem::replace(&mut created[index], true) {
                continue;
            }

            let mut node = Node::new();
            node.name.clone_from(&p.name);
            node.transform = p.transform.clone();
            node.transform.mark_dirty();
            let handle = self.nodes.insert(node);

            if let Some(mesh) = &p.mesh {
                let mut mesh = mesh.clone();
                mesh.gpu = None;
                self.set_mesh(handle, mesh);
            }
            self.attach(handle, parent);
            stack.extend(p.children_indices.iter().rev().map(|&c| (c, handle)));
        }

        root
    }

    // ========================================================================
    // Transforms & Drawing
    // ========================================================================

    /// Propagates local matrices down the hierarchy.
    pub fn update_matrix_world(&mut self) {
        let mut stack: Vec<(NodeHandle, Affine3A, bool)> = self
            .root_nodes
            .iter()
            .rev()
            .map(|&h| (h, Affine3A::IDENTITY, false))
            .collect();

        while let Some((handle, parent_world, parent_changed)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(handle) else {
                continue;
            };
            let changed = node.transform.update_local_matrix() || parent_changed;
            if changed {
                let world = parent_world * *node.transform.local_matrix();
                node.transform.set_world_matrix(world);
            }
            let world = *node.transform.world_matrix();
            stack.extend(node.children.iter().rev().map(|&c| (c, world, changed)));
        }
    }

    /// Visible, uploaded meshes with their world matrices.
    #[must_use]
    pub fn draw_list(&self) -> Vec<DrawItem> {
        let mut items = Vec::new();
        let mut stack: Vec<NodeHandle> = self.root_nodes.iter().rev().copied().collect();
        while let Some(handle) = stack.pop() {
            let Some(node) = self.nodes.get(handle) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            if let Some(key) = node.mesh
                && let Some(gpu) = self.meshes.get(key).and_then(|m| m.gpu)
            {
                items.push(DrawItem {
                    node: handle,
                    mesh: key,
                    gpu,
                    world: *node.transform.world_matrix(),
                });
            }
            stack.extend(node.children.iter().rev().copied());
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::Vec3;
    use slotmap::SlotMap;

    use super::*;
    use crate::assets::prefab::PrefabNode;
    use crate::scene::geometry::{Geometry, Material};
    use crate::scene::transform::Transform;

    fn ring_mesh() -> Mesh {
        Mesh::new(Arc::new(Geometry::ring(0.1, 0.2, 8)), Material::default())
    }

    fn two_node_prefab() -> Prefab {
        let mut parent = PrefabNode::new();
        parent.name = Some("Body".into());
        parent.transform = Transform::from_affine(Affine3A::from_translation(Vec3::X));
        parent.children_indices = vec![1];

        let mut child = PrefabNode::new();
        child.name = Some("Wheel".into());
        child.transform = Transform::from_affine(Affine3A::from_translation(Vec3::Y));
        child.mesh = Some(ring_mesh());

        let mut prefab = Prefab::new();
        prefab.nodes = vec![parent, child];
        prefab.root_indices = vec![0];
        prefab
    }

    #[test]
    fn instantiate_builds_hierarchy_under_named_root() {
        let mut scene = Scene::new();
        let root = scene.instantiate(&two_node_prefab(), "model_root");

        assert_eq!(scene.root_nodes, vec![root]);
        let body = scene.find_by_name(root, "Body").unwrap();
        let wheel = scene.find_by_name(root, "Wheel").unwrap();
        assert_eq!(scene.get_node(body).unwrap().parent(), Some(root));
        assert_eq!(scene.get_node(wheel).unwrap().parent(), Some(body));
        assert_eq!(scene.pending_uploads(root).len(), 1);
    }

    #[test]
    fn instantiate_skips_nodes_unreachable_from_roots() {
        let mut prefab = two_node_prefab();
        let mut stray = PrefabNode::new();
        stray.name = Some("OtherScene".into());
        stray.mesh = Some(ring_mesh());
        prefab.nodes.push(stray);

        let mut scene = Scene::new();
        for _ in 0..3 {
            let root = scene.instantiate(&prefab, "model_root");
            assert!(scene.find_by_name(root, "OtherScene").is_none());
            assert_eq!(scene.nodes.len(), 3);
            scene.remove_subtree(root);
            assert!(scene.nodes.is_empty());
            assert!(scene.meshes.is_empty());
        }
    }

    #[test]
    fn world_matrices_compose_down_the_hierarchy() {
        let mut scene = Scene::new();
        let root = scene.instantiate(&two_node_prefab(), "model_root");
        scene.update_matrix_world();

        let wheel = scene.find_by_name(root, "Wheel").unwrap();
        let world = scene.get_node(wheel).unwrap().world_matrix();
        assert!((Vec3::from(world.translation) - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn remove_subtree_hands_back_gpu_ids() {
        let mut ids: SlotMap<GpuMeshId, ()> = SlotMap::with_key();
        let mut scene = Scene::new();
        let root = scene.instantiate(&two_node_prefab(), "model_root");

        let key = scene.pending_uploads(root)[0];
        let gpu = ids.insert(());
        scene.mesh_mut(key).unwrap().gpu = Some(gpu);

        assert_eq!(scene.remove_subtree(root), vec![gpu]);
        assert!(scene.root_nodes.is_empty());
        assert!(scene.nodes.is_empty());
        assert!(scene.meshes.is_empty());
    }

    #[test]
    fn draw_list_skips_hidden_and_unuploaded() {
        let mut ids: SlotMap<GpuMeshId, ()> = SlotMap::with_key();
        let mut scene = Scene::new();
        let root = scene.instantiate(&two_node_prefab(), "model_root");
        scene.update_matrix_world();
        assert!(scene.draw_list().is_empty());

        let key = scene.pending_uploads(root)[0];
        scene.mesh_mut(key).unwrap().gpu = Some(ids.insert(()));
        assert_eq!(scene.draw_list().len(), 1);

        scene.set_visible(root, false);
        assert!(scene.draw_list().is_empty());
    }

    #[test]
    fn attach_refuses_cycles() {
        let mut scene = Scene::new();
        let a = scene.add_node(Node::with_name("a"));
        let b = scene.create_node_with_name("b");
        scene.attach(b, a);

        scene.attach(a, b);
        assert_eq!(scene.get_node(a).unwrap().parent(), None);
        assert_eq!(scene.root_nodes, vec![a]);

        scene.attach(a, a);
        assert_eq!(scene.get_node(a).unwrap().children(), &[b]);
    }

    #[test]
    fn set_mesh_returns_replaced_upload() {
        let mut ids: SlotMap<GpuMeshId, ()> = SlotMap::with_key();
        let mut scene = Scene::new();
        let node = scene.add_node(Node::new());

        assert_eq!(scene.set_mesh(node, ring_mesh()), None);
        let key = scene.get_node(node).unwrap().mesh().unwrap();
        let gpu = ids.insert(());
        scene.mesh_mut(key).unwrap().gpu = Some(gpu);

        assert_eq!(scene.set_mesh(node, ring_mesh()), Some(gpu));
        assert_eq!(scene.meshes.len(), 1);
    }
}
