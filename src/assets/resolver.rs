//! Identity to locator mapping.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::assets::id::{Asset, AssetId};
use crate::assets::store::AssetStore;
use crate::assets::upload::DEFAULT_ALLOWED_EXTENSIONS;
use crate::errors::{Error, Result};

/// Extension assumed when the viewer is given a bare identity.
pub const DEFAULT_MODEL_EXTENSION: &str = "glb";

/// Where a model's bytes can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetLocator {
    Path(PathBuf),
    Url(Url),
}

impl AssetLocator {
    /// Interprets `http://` and `https://` strings as URLs, everything else
    /// as a filesystem path.
    pub fn parse(source: &str) -> Result<Self> {
        if source.starts_with("http://") || source.starts_with("https://") {
            Ok(Self::Url(Url::parse(source)?))
        } else {
            Ok(Self::Path(PathBuf::from(source)))
        }
    }

    /// Final path component.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Path(path) => path.file_name().and_then(|s| s.to_str()),
            Self::Url(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|s| !s.is_empty()),
        }
    }

    /// Lowercased extension of the final path component.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name()?;
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }

    /// Resolves `relative` against this locator's directory, the way
    /// external glTF buffers are referenced.
    pub fn sibling(&self, relative: &str) -> Result<Self> {
        match self {
            Self::Path(path) => {
                let base = path.parent().unwrap_or_else(|| Path::new("."));
                Ok(Self::Path(base.join(relative)))
            }
            Self::Url(url) => Ok(Self::Url(url.join(relative)?)),
        }
    }
}

impl fmt::Display for AssetLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

/// Root under which `<id>.<ext>` files are addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRoot {
    Directory(PathBuf),
    BaseUrl(Url),
}

impl AssetRoot {
    pub fn parse(source: &str) -> Result<Self> {
        if source.starts_with("http://") || source.starts_with("https://") {
            let mut url = Url::parse(source)?;
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            Ok(Self::BaseUrl(url))
        } else {
            Ok(Self::Directory(PathBuf::from(source)))
        }
    }

    fn locate(&self, file_name: &str) -> Result<AssetLocator> {
        match self {
            Self::Directory(dir) => Ok(AssetLocator::Path(dir.join(file_name))),
            Self::BaseUrl(base) => Ok(AssetLocator::Url(base.join(file_name)?)),
        }
    }
}

/// Maps an identity (plus optional extension) to an [`AssetLocator`].
#[derive(Debug, Clone)]
pub struct AssetResolver {
    root: AssetRoot,
    allowed_extensions: Vec<String>,
    default_extension: String,
}

impl AssetResolver {
    #[must_use]
    pub fn new(root: AssetRoot) -> Self {
        Self {
            root,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            default_extension: DEFAULT_MODEL_EXTENSION.to_string(),
        }
    }

    #[must_use]
    pub fn with_allowed_extensions(mut self, extensions: &[String]) -> Self {
        self.allowed_extensions = extensions.to_vec();
        self
    }

    #[must_use]
    pub fn with_default_extension(mut self, extension: impl Into<String>) -> Self {
        self.default_extension = extension.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &AssetRoot {
        &self.root
    }

    fn checked_extension(&self, file_id: &str, extension: Option<&str>) -> Result<String> {
        let ext = extension
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .unwrap_or_else(|| self.default_extension.clone());
        if self.allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(&ext)) {
            Ok(ext)
        } else {
            Err(Error::NotFound(format!("{file_id}.{ext}")))
        }
    }

    /// Builds `root/<id>.<ext>` without touching storage.
    pub fn resolve(&self, file_id: &str, extension: Option<&str>) -> Result<AssetLocator> {
        let id = AssetId::parse(file_id)?;
        let ext = self.checked_extension(file_id, extension)?;
        self.root.locate(&id.file_name(&ext))
    }

    /// Like [`resolve`](Self::resolve), but only for identities the store
    /// issued. Without an explicit extension the stored one is used.
    pub fn resolve_issued<S: AssetStore + ?Sized>(
        &self,
        store: &S,
        file_id: &str,
        extension: Option<&str>,
    ) -> Result<AssetLocator> {
        let (asset, locator) = self.locate_issued(store, file_id)?;
        match extension {
            Some(ext) => {
                let ext = self.checked_extension(file_id, Some(ext))?;
                self.root.locate(&asset.id.file_name(&ext))
            }
            None => Ok(locator),
        }
    }

    /// The stored record of an issued identity and where its bytes live,
    /// from a single store lookup.
    pub fn locate_issued<S: AssetStore + ?Sized>(
        &self,
        store: &S,
        file_id: &str,
    ) -> Result<(Asset, AssetLocator)> {
        let id = AssetId::parse(file_id)?;
        let asset = store
            .lookup(id)?
            .ok_or_else(|| Error::NotFound(file_id.to_string()))?;
        let locator = self.root.locate(&asset.file_name())?;
        Ok((asset, locator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_against_directory_with_default_extension() {
        let resolver = AssetResolver::new(AssetRoot::Directory(PathBuf::from("3d")));
        let id = AssetId::generate();
        let locator = resolver.resolve(&id.to_string(), None).unwrap();
        assert_eq!(locator, AssetLocator::Path(PathBuf::from(format!("3d/{id}.glb"))));
    }

    #[test]
    fn resolves_against_base_url_without_trailing_slash() {
        let root = AssetRoot::parse("http://localhost:5000/3d").unwrap();
        let resolver = AssetResolver::new(root);
        let id = AssetId::generate();
        let locator = resolver.resolve(&id.to_string(), Some("GLTF")).unwrap();
        assert_eq!(locator.to_string(), format!("http://localhost:5000/3d/{id}.gltf"));
    }

    #[test]
    fn rejects_disallowed_extension_and_bad_ids() {
        let resolver = AssetResolver::new(AssetRoot::Directory(PathBuf::from("3d")));
        let id = AssetId::generate().to_string();
        assert!(matches!(resolver.resolve(&id, Some("exe")), Err(Error::NotFound(_))));
        assert!(matches!(resolver.resolve("../../secret", None), Err(Error::NotFound(_))));
    }

    #[test]
    fn locate_issued_returns_record_and_stored_extension() {
        use crate::assets::store::MemoryAssetStore;

        let store = MemoryAssetStore::new();
        let asset = Asset::new(AssetId::generate(), "gltf", 2);
        store.put(&asset, b"{}").unwrap();

        let resolver = AssetResolver::new(AssetRoot::Directory(PathBuf::from("3d")));
        let (found, locator) = resolver.locate_issued(&store, &asset.id.to_string()).unwrap();
        assert_eq!(found, asset);
        assert_eq!(locator, AssetLocator::Path(PathBuf::from(format!("3d/{}.gltf", asset.id))));

        let unknown = AssetId::generate().to_string();
        assert!(matches!(resolver.locate_issued(&store, &unknown), Err(Error::NotFound(_))));
    }

    #[test]
    fn sibling_of_url_and_path() {
        let url = AssetLocator::parse("https://cdn.example.com/models/duck.gltf").unwrap();
        assert_eq!(
            url.sibling("duck.bin").unwrap().to_string(),
            "https://cdn.example.com/models/duck.bin"
        );
        let path = AssetLocator::parse("models/duck.gltf").unwrap();
        assert_eq!(
            path.sibling("duck.bin").unwrap(),
            AssetLocator::Path(PathBuf::from("models/duck.bin"))
        );
        assert_eq!(path.extension().as_deref(), Some("gltf"));
    }
}
