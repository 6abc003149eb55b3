use std::sync::Arc;

use base64::Engine as _;
use glam::{Quat, Vec3, Vec4};
use rustc_hash::FxHashMap;

use crate::assets::prefab::{Prefab, PrefabNode};
use crate::errors::{Error, Result};
use crate::scene::geometry::{Geometry, Material, Mesh};
use crate::scene::transform::Transform;

/// Extensions whose presence does not change how this loader reads the file.
const SUPPORTED_EXTENSIONS: &[&str] = &["KHR_materials_emissive_strength", "KHR_mesh_quantization"];

/// glTF 2.0 decoder producing a [`Prefab`].
///
/// Decoding is split so that fetching external buffers can happen between
/// the two synchronous steps:
///
/// 1. [`parse`](Self::parse) reads the JSON document (and the GLB BIN chunk).
/// 2. [`external_buffer_uris`](Self::external_buffer_uris) lists the sibling
///    files that still need to be fetched.
/// 3. [`build_prefab`](Self::build_prefab) resolves every buffer and builds
///    the node list.
pub struct GltfLoader;

impl GltfLoader {
    /// Parses a GLB or JSON glTF document.
    pub fn parse(bytes: &[u8]) -> Result<gltf::Gltf> {
        let gltf = gltf::Gltf::from_slice_without_validation(bytes)?;

        let unsupported: Vec<&str> = gltf
            .extensions_required()
            .filter(|ext| !SUPPORTED_EXTENSIONS.contains(ext))
            .collect();
        if !unsupported.is_empty() {
            log::warn!("glTF file requires unsupported extensions: {unsupported:?}");
        }

        Ok(gltf)
    }

    /// URIs of buffers that are neither embedded nor in the BIN chunk.
    #[must_use]
    pub fn external_buffer_uris(gltf: &gltf::Gltf) -> Vec<String> {
        gltf.buffers()
            .filter_map(|buffer| match buffer.source() {
                gltf::buffer::Source::Uri(uri) if !uri.starts_with("data:") => {
                    Some(uri.to_string())
                }
                _ => None,
            })
            .collect()
    }

    /// Decodes a self-contained document in one step.
    pub fn decode(bytes: &[u8]) -> Result<Prefab> {
        let gltf = Self::parse(bytes)?;
        Self::build_prefab(&gltf, &FxHashMap::default())
    }

    /// Builds the prefab. `external` maps buffer URIs to fetched bytes.
    pub fn build_prefab(gltf: &gltf::Gltf, external: &FxHashMap<String, Vec<u8>>) -> Result<Prefab> {
        let buffers = Self::load_buffers(gltf, external)?;

        let mut prefab = Prefab::new();
        let node_count = gltf.nodes().count();
        prefab.nodes.reserve(node_count);

        for node in gltf.nodes() {
            prefab.nodes.push(Self::create_node_shallow(&node));
        }

        for node in gltf.nodes() {
            let index = node.index();
            prefab.nodes[index].children_indices = node.children().map(|c| c.index()).collect();

            if let Some(mesh) = node.mesh() {
                Self::attach_mesh(&mut prefab, index, &mesh, &buffers)?;
            }
        }

        prefab.root_indices = match gltf.default_scene().or_else(|| gltf.scenes().next()) {
            Some(scene) => scene.nodes().map(|n| n.index()).collect(),
            None => {
                let mut is_child = vec![false; node_count];
                for n in &prefab.nodes[..node_count] {
                    for &c in &n.children_indices {
                        if let Some(flag) = is_child.get_mut(c) {
                            *flag = true;
                        }
                    }
                }
                (0..node_count).filter(|&i| !is_child[i]).collect()
            }
        };

        log::debug!(
            "Decoded glTF: {} nodes, {} meshes, {} roots",
            prefab.nodes.len(),
            prefab.mesh_count(),
            prefab.root_indices.len()
        );
        Ok(prefab)
    }

    // --- Helpers ---

    fn load_buffers(
        gltf: &gltf::Gltf,
        external: &FxHashMap<String, Vec<u8>>,
    ) -> Result<Vec<Vec<u8>>> {
        let mut buffer_data = Vec::new();
        for buffer in gltf.buffers() {
            let data = match buffer.source() {
                gltf::buffer::Source::Bin => gltf
                    .blob
                    .clone()
                    .ok_or_else(|| Error::Decode("missing GLB binary chunk".into()))?,
                gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => {
                    Self::decode_data_uri(uri)?
                }
                gltf::buffer::Source::Uri(uri) => external
                    .get(uri)
                    .cloned()
                    .ok_or_else(|| Error::Decode(format!("external buffer {uri:?} not available")))?,
            };

            if data.len() < buffer.length() {
                return Err(Error::Decode(format!(
                    "buffer {} holds {} bytes, {} declared",
                    buffer.index(),
                    data.len(),
                    buffer.length()
                )));
            }
            buffer_data.push(data);
        }
        Ok(buffer_data)
    }

    fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
        let (_, payload) = uri
            .split_once(";base64,")
            .ok_or_else(|| Error::Decode("only base64 data URIs are supported".into()))?;
        Ok(base64::engine::general_purpose::STANDARD.decode(payload)?)
    }

    fn create_node_shallow(node: &gltf::Node) -> PrefabNode {
        let (t, r, s) = node.transform().decomposed();
        PrefabNode {
            name: Some(
                node.name()
                    .map_or_else(|| format!("Node_{}", node.index()), str::to_string),
            ),
            transform: Transform::from_trs(Vec3::from_array(t), Quat::from_array(r), Vec3::from_array(s)),
            children_indices: Vec::new(),
            mesh: None,
        }
    }

    /// The first triangle primitive goes on the node itself; further ones
    /// become child nodes so every node carries at most one mesh.
    fn attach_mesh(
        prefab: &mut Prefab,
        node_index: usize,
        mesh: &gltf::Mesh,
        buffers: &[Vec<u8>],
    ) -> Result<()> {
        let mut first = true;
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "Skipping primitive {} of mesh {:?}: mode {:?} is not supported",
                    primitive.index(),
                    mesh.name(),
                    primitive.mode()
                );
                continue;
            }

            let engine_mesh = Self::load_primitive(&primitive, buffers)?;

            if first {
                prefab.nodes[node_index].mesh = Some(engine_mesh);
                first = false;
            } else {
                let base = prefab.nodes[node_index].name.clone().unwrap_or_default();
                let child = PrefabNode {
                    name: Some(format!("{base}#{}", primitive.index())),
                    mesh: Some(engine_mesh),
                    ..PrefabNode::new()
                };
                let child_index = prefab.nodes.len();
                prefab.nodes.push(child);
                prefab.nodes[node_index].children_indices.push(child_index);
            }
        }
        Ok(())
    }

    fn load_primitive(primitive: &gltf::Primitive, buffers: &[Vec<u8>]) -> Result<Mesh> {
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .ok_or_else(|| Error::Decode("primitive has no POSITION attribute".into()))?
            .collect();
        let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(Iterator::collect);
        let indices: Option<Vec<u32>> = reader.read_indices().map(|i| i.into_u32().collect());

        let geometry = Geometry::from_parts(positions, normals, indices)?;

        let gltf_mat = primitive.material();
        let mut material = Material::new(Vec4::from_array(
            gltf_mat.pbr_metallic_roughness().base_color_factor(),
        ))
        .with_double_sided(gltf_mat.double_sided());
        material.name = gltf_mat.name().map(str::to_string);

        Ok(Mesh::new(Arc::new(geometry), material))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_GLTF: &str = r#"{
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": [0]}],
        "nodes": [{"name": "Tri", "mesh": 0, "translation": [1, 2, 3]}],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
        "accessors": [{
            "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
            "min": [0, 0, 0], "max": [1, 1, 0]
        }],
        "bufferViews": [{"buffer": 0, "byteLength": 36}],
        "buffers": [{"byteLength": 36, "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"}]
    }"#;

    #[test]
    fn decodes_embedded_json_gltf() {
        let prefab = GltfLoader::decode(TRIANGLE_GLTF.as_bytes()).unwrap();
        assert_eq!(prefab.nodes.len(), 1);
        assert_eq!(prefab.root_indices, vec![0]);

        let node = &prefab.nodes[0];
        assert_eq!(node.name.as_deref(), Some("Tri"));
        assert_eq!(node.transform.position, Vec3::new(1.0, 2.0, 3.0));

        let mesh = node.mesh.as_ref().unwrap();
        assert_eq!(mesh.geometry.indices, vec![0, 1, 2]);
        assert_eq!(mesh.geometry.normals[0], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn garbage_is_decode_error() {
        assert!(matches!(GltfLoader::decode(b"definitely not a model"), Err(Error::Decode(_))));
    }

    #[test]
    fn lists_external_buffers() {
        let json = TRIANGLE_GLTF.replace(
            "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA",
            "tri.bin",
        );
        let gltf = GltfLoader::parse(json.as_bytes()).unwrap();
        assert_eq!(GltfLoader::external_buffer_uris(&gltf), vec!["tri.bin".to_string()]);
        assert!(matches!(
            GltfLoader::build_prefab(&gltf, &FxHashMap::default()),
            Err(Error::Decode(_))
        ));
    }
}
