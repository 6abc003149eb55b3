//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`Error`] covers every failure mode of the upload and
//! viewing pipeline:
//! - Upload validation failures ([`ValidationError`])
//! - Unknown asset identities
//! - Malformed scene data
//! - Missing device capabilities and rejected immersive sessions ([`SessionError`])
//! - I/O, HTTP and GPU failures of the collaborators
//!
//! No error is fatal to a running viewer: each one is reported to the caller
//! of the operation that produced it.
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, Error>`.
//!
//! ```rust,ignore
//! use arview::errors::{Error, Result};
//!
//! fn lookup() -> Result<()> {
//!     Err(Error::NotFound("3f0c...".into()))
//! }
//! ```

use thiserror::Error;

/// The main error type.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Upload & Lookup Errors
    // ========================================================================
    /// The upload payload was missing or not acceptable.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The requested asset identity is unknown.
    #[error("Asset not found: {0}")]
    NotFound(String),

    // ========================================================================
    // Model Loading Errors
    // ========================================================================
    /// Scene data could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The load was replaced by a newer `load()` call before it finished.
    #[error("Load superseded by a newer request (generation {0})")]
    Superseded(u64),

    // ========================================================================
    // Immersive Session Errors
    // ========================================================================
    /// The device lacks a feature the immersive session requires.
    #[error("Capability error: {0}")]
    Capability(String),

    /// The immersive session was denied or ended abnormally.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A configuration value is out of range or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // HTTP & Network Errors
    // ========================================================================
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(String),

    /// HTTP response error with status code.
    #[error("HTTP response error: status {status}")]
    HttpResponse {
        /// HTTP status code
        status: u16,
    },

    /// URL parsing error.
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    // ========================================================================
    // GPU & Windowing Errors
    // ========================================================================
    /// GPU initialization or submission failure.
    #[error("GPU error: {0}")]
    Gpu(String),

    /// Event loop error (winit).
    #[cfg(feature = "winit")]
    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    // ========================================================================
    // Async & Threading Errors
    // ========================================================================
    /// Task join error (when async tasks fail to complete).
    #[error("Task join error: {0}")]
    TaskJoin(String),
}

/// Reasons an upload payload is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no file was provided")]
    MissingFile,

    #[error("only one file may be uploaded per request")]
    MultipleFiles,

    #[error("uploaded file is empty")]
    EmptyPayload,

    #[error("file name has no extension: {0:?}")]
    MissingExtension(String),

    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),

    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: u64, limit: u64 },
}

/// Immersive session failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session request denied: {0}")]
    Denied(String),

    #[error("a session is already {0}")]
    Busy(&'static str),

    #[error("session ended abnormally: {0}")]
    Ended(String),

    #[error("no immersive session is active")]
    NotActive,
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<gltf::Error> for Error {
    fn from(err: gltf::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::Decode(format!("invalid base64 buffer: {err}"))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::TaskJoin(err.to_string())
    }
}

impl Error {
    /// Returns `true` for errors caused by the caller's input rather than by
    /// the system (validation and unknown identities).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::NotFound(_))
    }
}

/// Alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
