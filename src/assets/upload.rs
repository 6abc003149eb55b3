//! Upload validation and persistence.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::assets::id::{Asset, AssetId};
use crate::assets::store::AssetStore;
use crate::errors::{Result, ValidationError};

/// Default upper bound for a single upload (64 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 64 * 1024 * 1024;

/// Extensions accepted unless configured otherwise.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["glb", "gltf"];

/// Upload acceptance rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Lowercase extensions, without the leading dot.
    pub allowed_extensions: Vec<String>,
    pub max_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl UploadConfig {
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    #[must_use]
    pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_extensions = extensions
            .into_iter()
            .map(|s| s.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    #[must_use]
    pub fn allows(&self, extension: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }
}

/// A single file as received from a client.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    /// Original file name; only its extension is used.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadPayload {
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Lowercased extension of the original file name.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .map(str::to_ascii_lowercase)
    }
}

/// Validates uploads and hands them to an [`AssetStore`].
pub struct UploadService<S: AssetStore + ?Sized> {
    store: Arc<S>,
    config: UploadConfig,
}

impl<S: AssetStore + ?Sized> Clone for UploadService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: AssetStore + ?Sized> UploadService<S> {
    pub fn new(store: Arc<S>, config: UploadConfig) -> Self {
        Self { store, config }
    }

    #[inline]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    #[inline]
    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Checks a payload against the acceptance rules without storing it.
    /// Returns the normalized extension.
    pub fn validate(&self, payload: &UploadPayload) -> std::result::Result<String, ValidationError> {
        let size = payload.bytes.len() as u64;
        if size == 0 {
            return Err(ValidationError::EmptyPayload);
        }
        if size > self.config.max_bytes {
            return Err(ValidationError::PayloadTooLarge {
                size,
                limit: self.config.max_bytes,
            });
        }

        let extension = payload
            .extension()
            .ok_or_else(|| ValidationError::MissingExtension(payload.file_name.clone()))?;
        if !self.config.allows(&extension) {
            return Err(ValidationError::UnsupportedExtension(extension));
        }
        Ok(extension)
    }

    /// Validates and stores one file, returning its new identity.
    ///
    /// Every successful call issues a fresh identity, even for content that
    /// was uploaded before.
    pub fn upload(&self, payload: Option<UploadPayload>) -> Result<Asset> {
        let payload = payload.ok_or(ValidationError::MissingFile)?;
        let extension = self.validate(&payload).inspect_err(|e| {
            log::warn!("Rejected upload {:?}: {e}", payload.file_name);
        })?;

        let asset = Asset::new(AssetId::generate(), extension, payload.bytes.len() as u64);
        self.store.put(&asset, &payload.bytes)?;

        log::info!(
            "Accepted upload {:?} as {} ({} bytes)",
            payload.file_name,
            asset.file_name(),
            asset.byte_length
        );
        Ok(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::store::MemoryAssetStore;
    use crate::errors::Error;

    fn service() -> UploadService<MemoryAssetStore> {
        UploadService::new(Arc::new(MemoryAssetStore::new()), UploadConfig::default())
    }

    #[test]
    fn missing_file_is_rejected_without_write() {
        let svc = service();
        let err = svc.upload(None).unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::MissingFile)));
        assert!(svc.store().is_empty());
    }

    #[test]
    fn extension_is_case_insensitive() {
        let svc = service();
        let asset = svc
            .upload(Some(UploadPayload::new("Duck.GLB", vec![1, 2, 3])))
            .unwrap();
        assert_eq!(asset.extension, "glb");
        assert_eq!(asset.byte_length, 3);
    }

    #[test]
    fn rejects_unlisted_extension() {
        let svc = service();
        let err = svc
            .upload(Some(UploadPayload::new("model.obj", vec![1])))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::UnsupportedExtension(ext)) if ext == "obj"
        ));
    }

    #[test]
    fn rejects_empty_and_oversized_payloads() {
        let svc = UploadService::new(
            Arc::new(MemoryAssetStore::new()),
            UploadConfig::default().with_max_bytes(4),
        );
        assert!(matches!(
            svc.upload(Some(UploadPayload::new("a.glb", Vec::new()))),
            Err(Error::Validation(ValidationError::EmptyPayload))
        ));
        assert!(matches!(
            svc.upload(Some(UploadPayload::new("a.glb", vec![0; 5]))),
            Err(Error::Validation(ValidationError::PayloadTooLarge { size: 5, limit: 4 }))
        ));
        assert!(svc.store().is_empty());
    }

    #[test]
    fn rejects_name_without_extension() {
        let svc = service();
        assert!(matches!(
            svc.upload(Some(UploadPayload::new("model", vec![1]))),
            Err(Error::Validation(ValidationError::MissingExtension(_)))
        ));
    }
}
