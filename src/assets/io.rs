use std::io::ErrorKind;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::assets::resolver::AssetLocator;
use crate::errors::{Error, Result};

/// Asynchronous byte source for model data.
///
/// Object-safe so the viewer can hold any reader behind an `Arc<dyn AssetReader>`.
pub trait AssetReader: Send + Sync {
    fn read_bytes<'a>(&'a self, locator: &'a AssetLocator) -> BoxFuture<'a, Result<Vec<u8>>>;
}

impl<R: AssetReader + ?Sized> AssetReader for Arc<R> {
    fn read_bytes<'a>(&'a self, locator: &'a AssetLocator) -> BoxFuture<'a, Result<Vec<u8>>> {
        (**self).read_bytes(locator)
    }
}

/// Local file reader.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileAssetReader;

impl FileAssetReader {
    async fn read_path(path: &std::path::Path) -> Result<Vec<u8>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::NotFound(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl AssetReader for FileAssetReader {
    fn read_bytes<'a>(&'a self, locator: &'a AssetLocator) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            match locator {
                AssetLocator::Path(path) => Self::read_path(path).await,
                AssetLocator::Url(url) if url.scheme() == "file" => {
                    let path = url
                        .to_file_path()
                        .map_err(|()| Error::NotFound(url.to_string()))?;
                    Self::read_path(&path).await
                }
                AssetLocator::Url(url) => Err(Error::Http(format!(
                    "file reader cannot fetch {url}"
                ))),
            }
        })
    }
}

/// HTTP reader (feature `http`).
#[cfg(feature = "http")]
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpAssetReader;

#[cfg(feature = "http")]
impl AssetReader for HttpAssetReader {
    fn read_bytes<'a>(&'a self, locator: &'a AssetLocator) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            let AssetLocator::Url(url) = locator else {
                return Err(Error::Http(format!("not a URL: {locator}")));
            };

            let request = ehttp::Request::get(url.as_str());
            let response = ehttp::fetch_async(request).await.map_err(Error::Http)?;

            if response.status == 404 {
                return Err(Error::NotFound(url.to_string()));
            }
            if !response.ok {
                return Err(Error::HttpResponse {
                    status: response.status,
                });
            }
            Ok(response.bytes)
        })
    }
}

/// Dispatches on the locator kind: paths and `file://` URLs go to disk,
/// everything else over HTTP.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssetReaderVariant {
    file: FileAssetReader,
    #[cfg(feature = "http")]
    http: HttpAssetReader,
}

impl AssetReaderVariant {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssetReader for AssetReaderVariant {
    fn read_bytes<'a>(&'a self, locator: &'a AssetLocator) -> BoxFuture<'a, Result<Vec<u8>>> {
        match locator {
            AssetLocator::Path(_) => self.file.read_bytes(locator),
            AssetLocator::Url(url) if url.scheme() == "file" => self.file.read_bytes(locator),
            #[cfg(feature = "http")]
            AssetLocator::Url(_) => self.http.read_bytes(locator),
            #[cfg(not(feature = "http"))]
            AssetLocator::Url(url) => {
                let msg = format!(
                    "cannot fetch {url}: HTTP feature is not enabled. Enable it with `features = [\"http\"]`"
                );
                Box::pin(async move { Err(Error::Http(msg)) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn missing_file_maps_to_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let locator = AssetLocator::Path(dir.path().join("nope.glb"));
        let err = AssetReaderVariant::new().read_bytes(&locator).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn reads_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("a.bin");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();
        let bytes = FileAssetReader
            .read_bytes(&AssetLocator::Path(path))
            .await
            .unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }
}
