//! Shared fixtures: in-memory glTF/GLB builders and a scripted asset reader.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use arview::assets::{AssetLocator, AssetReader};
use arview::errors::{Error, Result};
use futures::future::BoxFuture;

/// Routes `log` output through the test harness; safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// glTF Builders
// ============================================================================

const GLB_MAGIC: u32 = 0x4654_6C67;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

/// (0,0,0), (1,0,0), (0,1,0) as little-endian f32.
#[must_use]
pub fn triangle_positions() -> Vec<u8> {
    [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        .iter()
        .flat_map(|f| f.to_le_bytes())
        .collect()
}

/// Single-triangle document. `buffer_uri` of `None` means the GLB BIN chunk.
#[must_use]
pub fn triangle_json(node_name: &str, buffer_uri: Option<&str>) -> String {
    let uri = buffer_uri.map_or_else(String::new, |u| format!(r#", "uri": "{u}""#));
    format!(
        r#"{{
            "asset": {{"version": "2.0"}},
            "scene": 0,
            "scenes": [{{"nodes": [0]}}],
            "nodes": [{{"name": "{node_name}", "mesh": 0, "translation": [0, 0, -1]}}],
            "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0}}, "material": 0}}]}}],
            "materials": [{{"pbrMetallicRoughness": {{"baseColorFactor": [1, 0, 0, 1]}}}}],
            "accessors": [{{
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0, 0, 0], "max": [1, 1, 0]
            }}],
            "bufferViews": [{{"buffer": 0, "byteLength": 36}}],
            "buffers": [{{"byteLength": 36{uri}}}]
        }}"#
    )
}

/// Packs a JSON chunk and an optional BIN chunk into a GLB container.
#[must_use]
pub fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
    let mut json_chunk = json.as_bytes().to_vec();
    while json_chunk.len() % 4 != 0 {
        json_chunk.push(b' ');
    }
    let mut bin_chunk = bin.to_vec();
    while bin_chunk.len() % 4 != 0 {
        bin_chunk.push(0);
    }

    let mut total = 12 + 8 + json_chunk.len();
    if !bin_chunk.is_empty() {
        total += 8 + bin_chunk.len();
    }

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());

    out.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json_chunk);

    if !bin_chunk.is_empty() {
        out.extend_from_slice(&(bin_chunk.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(&bin_chunk);
    }
    out
}

/// A one-triangle GLB whose only node is called `node_name`.
#[must_use]
pub fn triangle_glb(node_name: &str) -> Vec<u8> {
    glb(&triangle_json(node_name, None), &triangle_positions())
}

#[must_use]
pub fn path_locator(name: &str) -> AssetLocator {
    AssetLocator::Path(PathBuf::from(name))
}

// ============================================================================
// Scripted Reader
// ============================================================================

/// Serves bytes from memory with a per-file delay and counts reads.
#[derive(Default)]
pub struct ScriptedReader {
    files: HashMap<String, (Vec<u8>, Duration)>,
    reads: AtomicUsize,
}

impl ScriptedReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(name.to_string(), (bytes, Duration::ZERO));
        self
    }

    #[must_use]
    pub fn with_slow_file(mut self, name: &str, bytes: Vec<u8>, delay: Duration) -> Self {
        self.files.insert(name.to_string(), (bytes, delay));
        self
    }

    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl AssetReader for ScriptedReader {
    fn read_bytes<'a>(&'a self, locator: &'a AssetLocator) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            let key = locator.to_string();
            let (bytes, delay) = self
                .files
                .get(&key)
                .cloned()
                .ok_or_else(|| Error::NotFound(key.clone()))?;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(bytes)
        })
    }
}
