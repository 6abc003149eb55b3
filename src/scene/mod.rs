//! Scene graph.
//!
//! - [`Scene`]: node hierarchy plus mesh components
//! - [`Node`] / [`Transform`]: hierarchy and TRS with dirty checking
//! - [`Camera`]: perspective camera
//! - [`HemisphereLight`]: the viewer's light rig
//! - [`geometry`]: CPU-side vertex data, materials and meshes

pub mod camera;
pub mod geometry;
pub mod light;
pub mod node;
#[allow(clippy::module_inception)]
pub mod scene;
pub mod transform;

pub use camera::Camera;
pub use geometry::{BoundingBox, Geometry, Material, Mesh};
pub use light::HemisphereLight;
pub use node::Node;
pub use scene::{DrawItem, Scene};
pub use transform::Transform;

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeHandle;
    pub struct MeshKey;
}
