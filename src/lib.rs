//! # arview
//!
//! Upload a 3D model, share it by identity and look at it: in a window or
//! placed on a real-world surface during an AR session.
//!
//! - [`assets`]: upload validation, storage, identity resolution, glTF decoding
//! - [`viewer`]: scene state, background loading, frame loops, AR placement
//! - [`render`]: render surfaces (headless and wgpu) and the frame scheduler
//! - [`scene`]: scene graph, camera, light and geometry
//! - [`xr`]: immersive session state machine and device abstraction
//! - [`server`]: axum upload/static router (feature `server`)
//! - [`app`]: input and the winit desktop runner (feature `winit`)

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod app;
pub mod assets;
pub mod errors;
pub mod render;
pub mod scene;
#[cfg(feature = "server")]
pub mod server;
pub mod utils;
pub mod viewer;
pub mod xr;

pub use assets::{
    Asset, AssetId, AssetLocator, AssetResolver, AssetRoot, AssetStore, FileAssetStore,
    GltfLoader, MemoryAssetStore, Prefab, UploadConfig, UploadPayload, UploadService, ViewerLink,
};
pub use errors::{Error, Result};
pub use render::{HeadlessSurface, RenderMode, RenderScheduler, RenderSurface};
pub use scene::{Camera, HemisphereLight, Node, NodeHandle, Scene};
pub use utils::orbit_control::OrbitControls;
pub use viewer::{LoadHandle, ModelSource, Viewer, ViewerConfig};
pub use xr::{NoXrRuntime, XrFrame, XrRuntime, XrSessionState};

#[cfg(feature = "winit")]
pub use app::App;
#[cfg(feature = "wgpu")]
pub use render::gpu::{GpuSettings, WgpuSurface};
