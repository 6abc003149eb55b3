//! Flat blob storage for uploaded assets.
//!
//! A store only persists bytes under `<id>.<ext>` and answers whether an
//! identity was issued. Validation and identity generation live in
//! [`UploadService`](super::upload::UploadService).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::assets::id::{Asset, AssetId};
use crate::errors::{Error, Result};

/// Persistence backend for uploaded assets.
pub trait AssetStore: Send + Sync {
    /// Persists `bytes` keyed by `asset.file_name()`.
    fn put(&self, asset: &Asset, bytes: &[u8]) -> Result<()>;

    /// Returns the asset record if `id` was issued by this store.
    fn lookup(&self, id: AssetId) -> Result<Option<Asset>>;

    /// Reads the stored bytes back.
    fn read(&self, asset: &Asset) -> Result<Vec<u8>>;
}

impl<S: AssetStore + ?Sized> AssetStore for Arc<S> {
    fn put(&self, asset: &Asset, bytes: &[u8]) -> Result<()> {
        (**self).put(asset, bytes)
    }

    fn lookup(&self, id: AssetId) -> Result<Option<Asset>> {
        (**self).lookup(id)
    }

    fn read(&self, asset: &Asset) -> Result<Vec<u8>> {
        (**self).read(asset)
    }
}

// ============================================================================
// File Store
// ============================================================================

/// Stores each asset as `<root>/<id>.<ext>`.
///
/// Files already under the root are indexed once by [`open`](Self::open);
/// lookups only consult the in-memory index.
pub struct FileAssetStore {
    root: PathBuf,
    index: RwLock<FxHashMap<AssetId, Asset>>,
}

impl FileAssetStore {
    /// Opens (and creates if needed) the storage directory and indexes the
    /// assets already in it.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        let index = Self::scan(&root)?;
        log::info!("Asset store rooted at {} ({} assets)", root.display(), index.len());
        Ok(Self {
            root,
            index: RwLock::new(index),
        })
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path_of(&self, asset: &Asset) -> PathBuf {
        self.root.join(asset.file_name())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Indexes every `<uuid>.<ext>` file directly under `root`.
    fn scan(root: &Path) -> Result<FxHashMap<AssetId, Asset>> {
        let mut index = FxHashMap::default();
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            let path = entry.path();
            let (Some(stem), Some(ext)) = (
                path.file_stem().and_then(|s| s.to_str()),
                path.extension().and_then(|s| s.to_str()),
            ) else {
                continue;
            };
            let Ok(id) = AssetId::parse(stem) else {
                continue;
            };
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            index.insert(id, Asset::new(id, ext.to_ascii_lowercase(), metadata.len()));
        }
        Ok(index)
    }
}

impl AssetStore for FileAssetStore {
    fn put(&self, asset: &Asset, bytes: &[u8]) -> Result<()> {
        let target = self.path_of(asset);
        let partial = target.with_extension(format!("{}.part", asset.extension));

        std::fs::write(&partial, bytes)?;
        if let Err(e) = std::fs::rename(&partial, &target) {
            let _ = std::fs::remove_file(&partial);
            return Err(e.into());
        }

        self.index.write().insert(asset.id, asset.clone());
        log::debug!("Stored {} ({} bytes)", target.display(), asset.byte_length);
        Ok(())
    }

    fn lookup(&self, id: AssetId) -> Result<Option<Asset>> {
        Ok(self.index.read().get(&id).cloned())
    }

    fn read(&self, asset: &Asset) -> Result<Vec<u8>> {
        match std::fs::read(self.path_of(asset)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::NotFound(asset.id.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Memory Store
// ============================================================================

/// In-memory store, used by tests and previews.
#[derive(Default)]
pub struct MemoryAssetStore {
    entries: RwLock<FxHashMap<AssetId, (Asset, Arc<[u8]>)>>,
}

impl MemoryAssetStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl AssetStore for MemoryAssetStore {
    fn put(&self, asset: &Asset, bytes: &[u8]) -> Result<()> {
        self.entries
            .write()
            .insert(asset.id, (asset.clone(), Arc::from(bytes)));
        Ok(())
    }

    fn lookup(&self, id: AssetId) -> Result<Option<Asset>> {
        Ok(self.entries.read().get(&id).map(|(asset, _)| asset.clone()))
    }

    fn read(&self, asset: &Asset) -> Result<Vec<u8>> {
        self.entries
            .read()
            .get(&asset.id)
            .map(|(_, bytes)| bytes.to_vec())
            .ok_or_else(|| Error::NotFound(asset.id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_writes_id_dot_ext() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileAssetStore::open(dir.path()).unwrap();
        let asset = Asset::new(AssetId::generate(), "glb", 4);

        store.put(&asset, b"glTF").unwrap();

        let path = dir.path().join(format!("{}.glb", asset.id));
        assert_eq!(std::fs::read(path).unwrap(), b"glTF");
        assert_eq!(store.lookup(asset.id).unwrap(), Some(asset));
    }

    #[test]
    fn file_store_finds_assets_written_by_earlier_process() {
        let dir = tempfile::tempdir().unwrap();
        let id = AssetId::generate();
        std::fs::write(dir.path().join(format!("{id}.gltf")), b"{}").unwrap();

        let store = FileAssetStore::open(dir.path()).unwrap();
        let asset = store.lookup(id).unwrap().unwrap();
        assert_eq!(asset.extension, "gltf");
        assert_eq!(asset.byte_length, 2);
    }

    #[test]
    fn lookup_miss_does_not_touch_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileAssetStore::open(dir.path()).unwrap();

        let id = AssetId::generate();
        std::fs::write(dir.path().join(format!("{id}.glb")), b"glTF").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        assert_eq!(store.lookup(id).unwrap(), None);
        assert!(store.is_empty());
        assert_eq!(FileAssetStore::open(dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn unknown_identity_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileAssetStore::open(dir.path()).unwrap();
        assert_eq!(store.lookup(AssetId::generate()).unwrap(), None);

        let memory = MemoryAssetStore::new();
        assert_eq!(memory.lookup(AssetId::generate()).unwrap(), None);
    }
}
