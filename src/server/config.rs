use std::path::PathBuf;

use serde::Deserialize;

use crate::assets::upload::UploadConfig;
use crate::errors::{Error, Result};

pub const DEFAULT_PORT: u16 = 5000;

/// Upload/static server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory uploaded models are written to.
    pub asset_root: PathBuf,
    /// URL prefix the asset root is served under.
    pub asset_route: String,
    /// Front-end build served for every other path.
    pub static_dir: PathBuf,
    /// Externally visible origin, used to build absolute asset and viewer URLs.
    pub public_url: Option<String>,
    pub upload: UploadConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            asset_root: PathBuf::from("3d"),
            asset_route: "/3d".into(),
            static_dir: PathBuf::from("build"),
            public_url: None,
            upload: UploadConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `PORT`, `ARVIEW_ASSET_ROOT`,
    /// `ARVIEW_STATIC_DIR`, `ARVIEW_PUBLIC_URL` and `ARVIEW_MAX_UPLOAD_BYTES`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("PORT must be a port number, got {port:?}")))?;
        }
        if let Some(root) = lookup("ARVIEW_ASSET_ROOT") {
            config.asset_root = PathBuf::from(root);
        }
        if let Some(dir) = lookup("ARVIEW_STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("ARVIEW_PUBLIC_URL").filter(|u| !u.is_empty()) {
            url::Url::parse(&url)?;
            config.public_url = Some(url);
        }
        if let Some(max) = lookup("ARVIEW_MAX_UPLOAD_BYTES") {
            let max = max.trim().parse().map_err(|_| {
                Error::Config(format!("ARVIEW_MAX_UPLOAD_BYTES must be a byte count, got {max:?}"))
            })?;
            config.upload = config.upload.with_max_bytes(max);
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = root.into();
        self
    }

    #[must_use]
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_upload(mut self, upload: UploadConfig) -> Self {
        self.upload = upload;
        self
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
