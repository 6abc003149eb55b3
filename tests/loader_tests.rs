//! Model loading tests
//!
//! Tests for:
//! - glTF / GLB decoding into prefabs (BIN chunk, data URIs, external buffers)
//! - Background loading into a viewer and frame-boundary installation
//! - Last-call-wins replacement and superseded handles
//! - Decode failures leaving the previous model in place

mod common;

use std::time::Duration;

use arview::assets::GltfLoader;
use arview::errors::Error;
use arview::render::{HeadlessSurface, RenderSurface};
use arview::viewer::{MODEL_ROOT_NAME, ModelSource, Viewer, ViewerConfig};
use common::{ScriptedReader, path_locator, triangle_glb, triangle_json, triangle_positions};
use glam::{Vec3, Vec4};

fn viewer_with(reader: std::sync::Arc<ScriptedReader>) -> Viewer<HeadlessSurface> {
    Viewer::initialize_with_reader(HeadlessSurface::new(640, 480), ViewerConfig::default(), reader)
        .unwrap()
}

// ============================================================================
// Decoding
// ============================================================================

#[test]
fn decodes_glb_with_bin_chunk() {
    let prefab = GltfLoader::decode(&triangle_glb("Helmet")).unwrap();

    assert_eq!(prefab.nodes.len(), 1);
    assert_eq!(prefab.root_indices, vec![0]);

    let node = prefab.find_by_name("Helmet").unwrap();
    assert_eq!(node.transform.position, Vec3::new(0.0, 0.0, -1.0));

    let mesh = node.mesh.as_ref().unwrap();
    assert_eq!(mesh.geometry.triangle_count(), 1);
    assert_eq!(mesh.material.base_color, Vec4::new(1.0, 0.0, 0.0, 1.0));
    // No NORMAL attribute: flat normals facing +Z.
    assert!(mesh.geometry.normals.iter().all(|n| *n == [0.0, 0.0, 1.0]));
}

#[test]
fn glb_without_bin_chunk_is_decode_error() {
    let bytes = common::glb(&triangle_json("Tri", None), &[]);
    assert!(matches!(GltfLoader::decode(&bytes), Err(Error::Decode(_))));
}

#[test]
fn truncated_buffer_is_decode_error() {
    let bytes = common::glb(&triangle_json("Tri", None), &triangle_positions()[..12]);
    assert!(matches!(GltfLoader::decode(&bytes), Err(Error::Decode(_))));
}

#[test]
fn unnamed_nodes_get_index_names_and_scene_less_roots() {
    let json = r#"{
        "asset": {"version": "2.0"},
        "nodes": [{"children": [1]}, {"translation": [0, 1, 0]}]
    }"#;
    let prefab = GltfLoader::decode(json.as_bytes()).unwrap();

    assert_eq!(prefab.nodes[0].name.as_deref(), Some("Node_0"));
    assert_eq!(prefab.nodes[1].name.as_deref(), Some("Node_1"));
    assert_eq!(prefab.nodes[0].children_indices, vec![1]);
    assert_eq!(prefab.root_indices, vec![0]);
}

#[test]
fn extra_primitives_become_child_nodes() {
    let json = triangle_json("Multi", None).replace(
        r#""primitives": [{"attributes": {"POSITION": 0}, "material": 0}]"#,
        r#""primitives": [{"attributes": {"POSITION": 0}, "material": 0}, {"attributes": {"POSITION": 0}}]"#,
    );
    let prefab = GltfLoader::decode(&common::glb(&json, &triangle_positions())).unwrap();

    assert_eq!(prefab.mesh_count(), 2);
    let child = prefab.find_by_name("Multi#1").unwrap();
    assert!(child.mesh.is_some());
    assert_eq!(prefab.nodes[0].children_indices, vec![1]);
}

// ============================================================================
// Loading into a Viewer
// ============================================================================

#[tokio::test]
async fn load_installs_single_model_root_after_one_fetch() {
    let reader = ScriptedReader::new()
        .with_file("helmet.glb", triangle_glb("Helmet"))
        .shared();
    let mut viewer = viewer_with(reader.clone());

    let handle = viewer.load(ModelSource::Locator(path_locator("helmet.glb")));
    let root = viewer.wait_for_load(handle).await.unwrap();

    assert_eq!(reader.reads(), 1);
    assert_eq!(viewer.scene().root_nodes, vec![root]);
    assert_eq!(viewer.current_object(), Some(root));

    let node = viewer.scene().get_node(root).unwrap();
    assert_eq!(node.name.as_deref(), Some(MODEL_ROOT_NAME));
    assert!(viewer.scene().find_by_name(root, "Helmet").is_some());
    assert_eq!(viewer.surface().live_resources(), 1);
}

#[tokio::test]
async fn external_buffers_are_fetched_next_to_the_document() {
    let reader = ScriptedReader::new()
        .with_file("model.gltf", triangle_json("Split", Some("model.bin")).into_bytes())
        .with_file("model.bin", triangle_positions())
        .shared();
    let mut viewer = viewer_with(reader.clone());

    let handle = viewer.load(path_locator("model.gltf").into());
    let root = viewer.wait_for_load(handle).await.unwrap();

    assert_eq!(reader.reads(), 2);
    assert!(viewer.scene().find_by_name(root, "Split").is_some());
}

#[tokio::test]
async fn in_memory_source_loads_without_reader() {
    let mut viewer = viewer_with(ScriptedReader::new().shared());

    let handle = viewer.load(ModelSource::Bytes {
        name: "picked.glb".into(),
        bytes: triangle_glb("Picked"),
    });
    let root = viewer.wait_for_load(handle).await.unwrap();
    assert!(viewer.scene().find_by_name(root, "Picked").is_some());
}

#[tokio::test]
async fn in_memory_source_with_external_buffer_is_decode_error() {
    let mut viewer = viewer_with(ScriptedReader::new().shared());

    let handle = viewer.load(ModelSource::Bytes {
        name: "split.gltf".into(),
        bytes: triangle_json("Split", Some("split.bin")).into_bytes(),
    });
    assert!(matches!(viewer.wait_for_load(handle).await, Err(Error::Decode(_))));
}

#[tokio::test]
async fn missing_file_resolves_not_found() {
    let mut viewer = viewer_with(ScriptedReader::new().shared());
    let handle = viewer.load(path_locator("nope.glb").into());
    assert!(matches!(viewer.wait_for_load(handle).await, Err(Error::NotFound(_))));
    assert!(viewer.current_object().is_none());
}

// ============================================================================
// Replacement
// ============================================================================

#[tokio::test]
async fn second_load_wins_and_first_handle_is_superseded() {
    let reader = ScriptedReader::new()
        .with_slow_file("slow.glb", triangle_glb("Slow"), Duration::from_millis(200))
        .with_file("fast.glb", triangle_glb("Fast"))
        .shared();
    let mut viewer = viewer_with(reader.clone());

    let mut first = viewer.load(path_locator("slow.glb").into());
    let second = viewer.load(path_locator("fast.glb").into());
    assert!(first.generation() < second.generation());

    let root = viewer.wait_for_load(second).await.unwrap();
    assert!(matches!(first.try_result(), Some(Err(Error::Superseded(1)))));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!viewer.poll_loads());

    assert_eq!(viewer.scene().root_nodes, vec![root]);
    assert!(viewer.scene().find_by_name(root, "Fast").is_some());
    assert!(viewer.scene().find_by_name(root, "Slow").is_none());
}

#[tokio::test]
async fn late_result_of_superseded_load_is_discarded() {
    let reader = ScriptedReader::new()
        .with_file("a.glb", triangle_glb("A"))
        .with_file("b.glb", triangle_glb("B"))
        .shared();
    let mut viewer = viewer_with(reader.clone());

    let first = viewer.load(path_locator("a.glb").into());
    // Let the first load finish without installing it.
    while reader.reads() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = viewer.load(path_locator("b.glb").into());
    let root = viewer.wait_for_load(second).await.unwrap();

    assert!(matches!(first.await, Err(Error::Superseded(_))));
    assert_eq!(viewer.scene().root_nodes.len(), 1);
    assert!(viewer.scene().find_by_name(root, "B").is_some());
    assert!(viewer.scene().find_by_name(root, "A").is_none());
}

/// Node 0 is in the default scene; "Backdrop" only in the second one.
fn two_scene_glb() -> Vec<u8> {
    let json = triangle_json("Statue", None)
        .replace(
            r#""scenes": [{"nodes": [0]}]"#,
            r#""scenes": [{"nodes": [0]}, {"nodes": [1]}]"#,
        )
        .replace(
            r#""translation": [0, 0, -1]}]"#,
            r#""translation": [0, 0, -1]}, {"name": "Backdrop", "mesh": 0}]"#,
        );
    common::glb(&json, &triangle_positions())
}

#[tokio::test]
async fn replacing_multi_scene_model_leaves_no_stray_nodes() {
    let reader = ScriptedReader::new()
        .with_file("scenes.glb", two_scene_glb())
        .shared();
    let mut viewer = viewer_with(reader);

    let handle = viewer.load(path_locator("scenes.glb").into());
    let root = viewer.wait_for_load(handle).await.unwrap();
    assert!(viewer.scene().find_by_name(root, "Statue").is_some());
    assert!(viewer.scene().find_by_name(root, "Backdrop").is_none());

    let nodes = viewer.scene().nodes.len();
    assert_eq!(nodes, 2);

    for _ in 0..3 {
        let handle = viewer.reload().unwrap();
        viewer.wait_for_load(handle).await.unwrap();
    }

    assert_eq!(viewer.scene().nodes.len(), nodes);
    assert_eq!(viewer.scene().meshes.len(), 1);
    assert_eq!(viewer.surface().live_resources(), 1);
}

#[tokio::test]
async fn replacement_releases_previous_gpu_resources() {
    let reader = ScriptedReader::new()
        .with_file("a.glb", triangle_glb("A"))
        .with_file("b.glb", triangle_glb("B"))
        .shared();
    let mut viewer = viewer_with(reader);

    let a = viewer.load(path_locator("a.glb").into());
    let first_root = viewer.wait_for_load(a).await.unwrap();
    let b = viewer.load(path_locator("b.glb").into());
    let second_root = viewer.wait_for_load(b).await.unwrap();

    assert!(!viewer.scene().contains(first_root));
    assert_eq!(viewer.current_object(), Some(second_root));
    assert_eq!(viewer.surface().live_resources(), 1);
    assert_eq!(viewer.surface().total_uploads(), 2);
}

#[tokio::test]
async fn malformed_model_keeps_previous_object() {
    let reader = ScriptedReader::new()
        .with_file("good.glb", triangle_glb("Good"))
        .with_file("bad.glb", b"definitely not a model".to_vec())
        .shared();
    let mut viewer = viewer_with(reader);

    let good = viewer.load(path_locator("good.glb").into());
    let root = viewer.wait_for_load(good).await.unwrap();

    let bad = viewer.load(path_locator("bad.glb").into());
    assert!(matches!(viewer.wait_for_load(bad).await, Err(Error::Decode(_))));

    assert_eq!(viewer.current_object(), Some(root));
    assert!(viewer.scene().get_node(root).unwrap().visible);
    assert_eq!(viewer.surface().live_resources(), 1);
}

#[tokio::test]
async fn reload_fetches_the_last_source_again() {
    let reader = ScriptedReader::new()
        .with_file("a.glb", triangle_glb("A"))
        .shared();
    let mut viewer = viewer_with(reader.clone());
    assert!(viewer.reload().is_none());

    let a = viewer.load(path_locator("a.glb").into());
    viewer.wait_for_load(a).await.unwrap();
    let again = viewer.reload().unwrap();
    let root = viewer.wait_for_load(again).await.unwrap();

    assert_eq!(reader.reads(), 2);
    assert_eq!(viewer.scene().root_nodes, vec![root]);
}
