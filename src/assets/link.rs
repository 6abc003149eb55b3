use url::Url;

use crate::assets::id::AssetId;
use crate::errors::{Error, Result};

/// Query parameter carrying the model identity.
pub const MODEL_QUERY_KEY: &str = "model";

/// Composes and parses shareable viewer URLs.
///
/// Links look like `<base>/preview.html?model=<id>`. Parsing also accepts
/// the router form `<base>/preview/<id>`.
#[derive(Debug, Clone)]
pub struct ViewerLink {
    base: Url,
    page: String,
}

impl ViewerLink {
    pub fn new(base: &str) -> Result<Self> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            base,
            page: "preview.html".to_string(),
        })
    }

    #[must_use]
    pub fn with_page(mut self, page: impl Into<String>) -> Self {
        self.page = page.into();
        self
    }

    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// URL that opens the viewer on `id`.
    pub fn compose(&self, id: AssetId) -> Result<Url> {
        let mut url = self.base.join(&self.page)?;
        url.query_pairs_mut()
            .clear()
            .append_pair(MODEL_QUERY_KEY, &id.to_string());
        Ok(url)
    }

    /// Extracts the identity from a viewer URL.
    pub fn parse(link: &str) -> Result<AssetId> {
        let url = Url::parse(link)?;

        if let Some((_, value)) = url.query_pairs().find(|(k, _)| k == MODEL_QUERY_KEY) {
            return AssetId::parse(&value);
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        match segments.as_slice() {
            [.., "preview", id] => AssetId::parse(id),
            _ => Err(Error::NotFound(format!("no model identity in {link}"))),
        }
    }
}
