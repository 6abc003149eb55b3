use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Error, Result};

/// Opaque identity of an uploaded asset.
///
/// Wraps a random (v4) UUID and serializes as the hyphenated lowercase
/// string clients see as `fileId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(Uuid);

impl AssetId {
    /// Generates a fresh random identity.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[inline]
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Parses a client-supplied identity.
    ///
    /// Anything that is not a UUID is reported as an unknown asset rather than
    /// a parse error: from the caller's point of view it was never issued.
    pub fn parse(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| Error::NotFound(s.to_string()))
    }

    /// Storage key `<id>.<ext>`.
    #[must_use]
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self, extension)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for AssetId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Uuid> for AssetId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A stored model binary. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    #[serde(rename = "fileId")]
    pub id: AssetId,
    /// Lowercase extension without the leading dot.
    pub extension: String,
    pub byte_length: u64,
}

impl Asset {
    #[must_use]
    pub fn new(id: AssetId, extension: impl Into<String>, byte_length: u64) -> Self {
        Self {
            id,
            extension: extension.into(),
            byte_length,
        }
    }

    /// Storage key `<id>.<ext>`.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.id.file_name(&self.extension)
    }
}
