//! Asset pipeline tests
//!
//! Tests for:
//! - Upload → store → resolve round trip on disk
//! - Identity uniqueness and never-issued identities
//! - Viewer links
//! - The end-to-end scenario: upload a GLB, resolve it, load it into a viewer

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use arview::assets::{
    AssetResolver, AssetRoot, AssetStore, FileAssetReader, FileAssetStore, MemoryAssetStore,
    UploadConfig, UploadPayload, UploadService, ViewerLink,
};
use arview::errors::{Error, ValidationError};
use arview::render::{HeadlessSurface, RenderSurface};
use arview::viewer::{MODEL_ROOT_NAME, ModelSource, Viewer, ViewerConfig};
use common::triangle_glb;

// ============================================================================
// Upload & Storage
// ============================================================================

#[test]
fn identities_are_unique_across_uploads() {
    let service = UploadService::new(Arc::new(MemoryAssetStore::new()), UploadConfig::default());

    let ids: HashSet<_> = (0..64)
        .map(|_| {
            service
                .upload(Some(UploadPayload::new("m.glb", vec![1, 2, 3])))
                .unwrap()
                .id
        })
        .collect();
    assert_eq!(ids.len(), 64);
    assert_eq!(service.store().len(), 64);
}

#[test]
fn missing_payload_writes_nothing() {
    let store = Arc::new(MemoryAssetStore::new());
    let service = UploadService::new(store.clone(), UploadConfig::default());

    let err = service.upload(None).unwrap_err();
    assert!(matches!(err, Error::Validation(ValidationError::MissingFile)));
    assert!(err.is_client_error());
    assert!(store.is_empty());
}

#[test]
fn file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let asset = {
        let service = UploadService::new(
            Arc::new(FileAssetStore::open(dir.path()).unwrap()),
            UploadConfig::default(),
        );
        service
            .upload(Some(UploadPayload::new("scene.gltf", b"{}".to_vec())))
            .unwrap()
    };

    let reopened = FileAssetStore::open(dir.path()).unwrap();
    let found = reopened.lookup(asset.id).unwrap().unwrap();
    assert_eq!(found.extension, "gltf");
    assert_eq!(reopened.read(&found).unwrap(), b"{}");
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn never_issued_identity_is_not_found() {
    let store = MemoryAssetStore::new();
    let resolver = AssetResolver::new(AssetRoot::parse("/srv/3d").unwrap());

    let id = uuid::Uuid::new_v4().to_string();
    assert!(matches!(
        resolver.resolve_issued(&store, &id, None),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        resolver.resolve_issued(&store, "../../etc/passwd", None),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn issued_identity_resolves_with_stored_extension() {
    let store = Arc::new(MemoryAssetStore::new());
    let service = UploadService::new(store.clone(), UploadConfig::default());
    let asset = service
        .upload(Some(UploadPayload::new("scene.gltf", b"{}".to_vec())))
        .unwrap();

    let resolver = AssetResolver::new(AssetRoot::parse("https://cdn.example.com/3d").unwrap());
    let locator = resolver
        .resolve_issued(store.as_ref(), &asset.id.to_string(), None)
        .unwrap();
    assert_eq!(
        locator.to_string(),
        format!("https://cdn.example.com/3d/{}.gltf", asset.id)
    );
}

// ============================================================================
// Viewer Links
// ============================================================================

#[test]
fn viewer_link_round_trip() {
    let service = UploadService::new(Arc::new(MemoryAssetStore::new()), UploadConfig::default());
    let asset = service
        .upload(Some(UploadPayload::new("m.glb", vec![0; 4])))
        .unwrap();

    let link = ViewerLink::new("https://viewer.example.com/app").unwrap();
    let url = link.compose(asset.id).unwrap();
    assert_eq!(ViewerLink::parse(url.as_str()).unwrap(), asset.id);

    let router_form = format!("https://viewer.example.com/preview/{}", asset.id);
    assert_eq!(ViewerLink::parse(&router_form).unwrap(), asset.id);
}

// ============================================================================
// End to End
// ============================================================================

#[tokio::test]
async fn upload_resolve_load_scenario() -> anyhow::Result<()> {
    common::init_logging();
    let dir = tempfile::tempdir()?;
    let store = Arc::new(FileAssetStore::open(dir.path())?);
    let service = UploadService::new(store.clone(), UploadConfig::default());

    let asset = service.upload(Some(UploadPayload::new("helmet.glb", triangle_glb("Helmet"))))?;
    let file_id = asset.id.to_string();

    let resolver = AssetResolver::new(AssetRoot::Directory(dir.path().to_path_buf()));
    let locator = resolver.resolve(&file_id, None)?;
    assert_eq!(locator.file_name(), Some(format!("{file_id}.glb").as_str()));

    let mut viewer = Viewer::initialize_with_reader(
        HeadlessSurface::new(320, 240),
        ViewerConfig::default(),
        Arc::new(FileAssetReader),
    )?;
    let handle = viewer.load(ModelSource::Locator(locator));
    let root = viewer.wait_for_load(handle).await?;

    assert_eq!(viewer.scene().root_nodes, vec![root]);
    let node = viewer.scene().get_node(root).unwrap();
    assert_eq!(node.name.as_deref(), Some(MODEL_ROOT_NAME));
    assert!(viewer.scene().find_by_name(root, "Helmet").is_some());
    assert_eq!(viewer.surface().live_resources(), 1);
    Ok(())
}
