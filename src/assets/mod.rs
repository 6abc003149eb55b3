//! Asset ingestion.
//!
//! Uploaded model files flow through this module:
//!
//! - [`UploadService`] validates a payload and persists it through an [`AssetStore`]
//! - [`AssetResolver`] maps an issued [`AssetId`] back to an [`AssetLocator`]
//! - [`AssetReader`] fetches the bytes behind a locator (disk or HTTP)
//! - [`GltfLoader`] decodes them into a thread-safe [`Prefab`]
//! - [`ViewerLink`] composes and parses the shareable viewer URL

pub mod id;
pub mod io;
pub mod link;
pub mod loaders;
pub mod prefab;
pub mod resolver;
pub mod store;
pub mod upload;

pub use id::{Asset, AssetId};
pub use io::{AssetReader, AssetReaderVariant, FileAssetReader};
#[cfg(feature = "http")]
pub use io::HttpAssetReader;
pub use link::ViewerLink;
pub use loaders::GltfLoader;
pub use prefab::{Prefab, PrefabNode, SharedPrefab};
pub use resolver::{AssetLocator, AssetResolver, AssetRoot};
pub use store::{AssetStore, FileAssetStore, MemoryAssetStore};
pub use upload::{UploadConfig, UploadPayload, UploadService};
