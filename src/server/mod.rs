//! HTTP surface: uploads, asset lookup and static files.
//!
//! | Route | Behaviour |
//! |---|---|
//! | `POST /upload` | multipart field `file` → `{"fileId": "<uuid>"}` |
//! | `GET /api/assets/{fileId}` | stored asset metadata and its URL |
//! | `GET /3d/<fileId>.<ext>` | the stored model bytes |
//! | anything else | the front-end build directory |

pub mod config;

use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use url::Url;

use crate::assets::id::{Asset, AssetId};
use crate::assets::link::ViewerLink;
use crate::assets::resolver::{AssetResolver, AssetRoot};
use crate::assets::store::{AssetStore, FileAssetStore};
use crate::assets::upload::{UploadPayload, UploadService};
use crate::errors::{Error, Result, ValidationError};

pub use config::ServerConfig;

/// Name of the multipart field carrying the model.
pub const UPLOAD_FIELD: &str = "file";

/// Slack on top of the upload limit for multipart framing.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct ServerState {
    uploads: UploadService<dyn AssetStore>,
    resolver: Arc<AssetResolver>,
    asset_route: String,
    public_url: Option<Url>,
    viewer_link: Option<ViewerLink>,
}

impl ServerState {
    pub fn new(store: Arc<dyn AssetStore>, config: &ServerConfig) -> Result<Self> {
        let resolver = AssetResolver::new(AssetRoot::Directory(config.asset_root.clone()))
            .with_allowed_extensions(&config.upload.allowed_extensions);

        let public_url = config.public_url.as_deref().map(Url::parse).transpose()?;
        let viewer_link = config.public_url.as_deref().map(ViewerLink::new).transpose()?;

        Ok(Self {
            uploads: UploadService::new(store, config.upload.clone()),
            resolver: Arc::new(resolver),
            asset_route: config.asset_route.trim_end_matches('/').to_string(),
            public_url,
            viewer_link,
        })
    }

    /// State backed by a [`FileAssetStore`] at the configured root.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let store: Arc<dyn AssetStore> = Arc::new(FileAssetStore::open(&config.asset_root)?);
        Self::new(store, config)
    }

    fn asset_url(&self, asset: &Asset) -> Result<String> {
        let path = format!("{}/{}", self.asset_route, asset.file_name());
        match &self.public_url {
            Some(base) => Ok(base.join(&path)?.to_string()),
            None => Ok(path),
        }
    }

    fn viewer_url(&self, id: AssetId) -> Result<Option<String>> {
        self.viewer_link
            .as_ref()
            .map(|link| link.compose(id).map(String::from))
            .transpose()
    }
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub file_id: AssetId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    #[serde(flatten)]
    pub asset: Asset,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_url: Option<String>,
}

/// Error body `{"error": "..."}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Validation(ValidationError::PayloadTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            log::error!("Request failed: {err}");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn upload_handler(
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> std::result::Result<Json<UploadResponse>, ApiError> {
    let mut payload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        if payload.is_some() {
            return Err(Error::from(ValidationError::MultipleFiles).into());
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        payload = Some(UploadPayload::new(file_name, bytes.to_vec()));
    }

    let uploads = state.uploads.clone();
    let asset = tokio::task::spawn_blocking(move || uploads.upload(payload))
        .await
        .map_err(Error::from)??;

    Ok(Json(UploadResponse {
        file_id: asset.id,
        viewer_url: state.viewer_url(asset.id)?,
    }))
}

async fn asset_info_handler(
    State(state): State<ServerState>,
    Path(file_id): Path<String>,
) -> std::result::Result<Json<AssetInfo>, ApiError> {
    let (asset, locator) = state
        .resolver
        .locate_issued(state.uploads.store().as_ref(), &file_id)?;
    log::debug!("Resolved {file_id} to {locator}");

    Ok(Json(AssetInfo {
        url: state.asset_url(&asset)?,
        viewer_url: state.viewer_url(asset.id)?,
        asset,
    }))
}

// ============================================================================
// Router
// ============================================================================

/// Builds the application router.
pub fn router(state: ServerState, config: &ServerConfig) -> Router {
    let body_limit = config.upload.max_bytes.saturating_add(MULTIPART_OVERHEAD);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    Router::new()
        .route(
            "/upload",
            post(upload_handler).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/assets/{file_id}", get(asset_info_handler))
        .nest_service(&state.asset_route, ServeDir::new(&config.asset_root))
        .fallback_service(ServeDir::new(&config.static_dir).append_index_html_on_directories(true))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

/// Binds and serves until the process exits.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let state = ServerState::from_config(&config)?;
    let app = router(state, &config);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    log::info!("Server running on http://{address}");
    log::info!(
        "Serving uploads from {} and front-end from {}",
        config.asset_root.display(),
        config.static_dir.display()
    );

    axum::serve(listener, app).await?;
    Ok(())
}
