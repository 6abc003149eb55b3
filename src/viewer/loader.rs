//! Background model loading with last-call-wins semantics.
//!
//! Fetch and decode run on a dedicated tokio runtime. Results come back over
//! a channel tagged with the generation of the `load` call that produced
//! them; only the newest generation may be installed.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};

use futures::channel::oneshot;
use rustc_hash::FxHashMap;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

use crate::assets::io::AssetReader;
use crate::assets::loaders::GltfLoader;
use crate::assets::prefab::SharedPrefab;
use crate::assets::resolver::AssetLocator;
use crate::errors::{Error, Result};
use crate::scene::NodeHandle;

/// Where a model comes from.
#[derive(Debug, Clone)]
pub enum ModelSource {
    /// Fetched through the viewer's [`AssetReader`].
    Locator(AssetLocator),
    /// Already in memory, e.g. a file picked for preview before upload.
    /// External buffers cannot be resolved.
    Bytes { name: String, bytes: Vec<u8> },
}

impl ModelSource {
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Locator(locator) => locator.to_string(),
            Self::Bytes { name, bytes } => format!("{name} ({} bytes in memory)", bytes.len()),
        }
    }
}

impl From<AssetLocator> for ModelSource {
    fn from(locator: AssetLocator) -> Self {
        Self::Locator(locator)
    }
}

/// Runtime shared by every viewer's fetch/decode tasks.
pub fn get_loader_runtime() -> &'static Runtime {
    static RUNTIME: OnceLock<Runtime> = OnceLock::new();
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("arview-loader")
            .enable_all()
            .build()
            .expect("Failed to create model loader runtime")
    })
}

/// Resolves when the load it was returned for settles.
///
/// Output is the installed model's top-level node, the load error, or
/// [`Error::Superseded`] if a newer `load` replaced it first.
#[derive(Debug)]
pub struct LoadHandle {
    generation: u64,
    rx: oneshot::Receiver<Result<NodeHandle>>,
}

impl LoadHandle {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Non-blocking check. `None` while the load is still in flight.
    pub fn try_result(&mut self) -> Option<Result<NodeHandle>> {
        match self.rx.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::Canceled) => Some(Err(Error::Superseded(self.generation))),
        }
    }
}

impl Future for LoadHandle {
    type Output = Result<NodeHandle>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let generation = self.generation;
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.unwrap_or(Err(Error::Superseded(generation))))
    }
}

/// Decoded model waiting for the next frame boundary.
pub(crate) struct CompletedLoad {
    pub generation: u64,
    pub result: Result<SharedPrefab>,
    pub responder: oneshot::Sender<Result<NodeHandle>>,
}

struct LoadOutcome {
    generation: u64,
    result: Result<SharedPrefab>,
}

struct PendingLoad {
    generation: u64,
    task: JoinHandle<()>,
    responder: oneshot::Sender<Result<NodeHandle>>,
}

/// Spawns load tasks and hands back the newest result.
pub struct ModelLoader {
    reader: Arc<dyn AssetReader>,
    generation: u64,
    pending: Option<PendingLoad>,
    tx: flume::Sender<LoadOutcome>,
    rx: flume::Receiver<LoadOutcome>,
    buffered: Option<LoadOutcome>,
}

impl ModelLoader {
    #[must_use]
    pub fn new(reader: Arc<dyn AssetReader>) -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            reader,
            generation: 0,
            pending: None,
            tx,
            rx,
            buffered: None,
        }
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Starts a load, superseding the one in flight.
    pub fn start(&mut self, source: ModelSource) -> LoadHandle {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;

        log::info!("Loading model #{generation}: {}", source.describe());

        let (responder, rx) = oneshot::channel();
        let reader = self.reader.clone();
        let tx = self.tx.clone();
        let task = get_loader_runtime().spawn(async move {
            let result = fetch_and_decode(reader.as_ref(), source).await;
            let _ = tx.send(LoadOutcome { generation, result });
        });

        self.pending = Some(PendingLoad {
            generation,
            task,
            responder,
        });
        LoadHandle { generation, rx }
    }

    /// Aborts the load in flight; its handle resolves with `Superseded`.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            log::debug!("Superseding model load #{}", pending.generation);
            pending.task.abort();
            let _ = pending
                .responder
                .send(Err(Error::Superseded(pending.generation)));
        }
    }

    /// Takes the finished result of the current load, if there is one.
    /// Stale results are dropped.
    pub(crate) fn take_completed(&mut self) -> Option<CompletedLoad> {
        let outcomes = self.buffered.take().into_iter().chain(self.rx.try_iter());
        let mut current = None;
        for outcome in outcomes {
            let is_current = self
                .pending
                .as_ref()
                .is_some_and(|p| p.generation == outcome.generation);
            if is_current {
                current = Some(outcome);
            } else {
                log::debug!("Discarding stale model load #{}", outcome.generation);
            }
        }

        let outcome = current?;
        let pending = self.pending.take()?;
        Some(CompletedLoad {
            generation: outcome.generation,
            result: outcome.result,
            responder: pending.responder,
        })
    }

    /// Waits until some load task reports back. The result stays queued
    /// for [`take_completed`](Self::take_completed).
    pub async fn wait_for_outcome(&mut self) {
        if self.buffered.is_some() || self.pending.is_none() {
            return;
        }
        if let Ok(outcome) = self.rx.recv_async().await {
            self.buffered = Some(outcome);
        }
    }
}

impl Drop for ModelLoader {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn fetch_and_decode(reader: &dyn AssetReader, source: ModelSource) -> Result<SharedPrefab> {
    let (bytes, base) = match source {
        ModelSource::Locator(locator) => (reader.read_bytes(&locator).await?, Some(locator)),
        ModelSource::Bytes { bytes, .. } => (bytes, None),
    };

    let gltf = run_blocking(move || GltfLoader::parse(&bytes)).await?;

    let mut external = FxHashMap::default();
    for uri in GltfLoader::external_buffer_uris(&gltf) {
        let Some(base) = &base else {
            return Err(Error::Decode(format!(
                "in-memory model references external buffer {uri:?}"
            )));
        };
        let locator = base.sibling(&uri)?;
        log::debug!("Fetching external buffer {locator}");
        let data = reader.read_bytes(&locator).await?;
        external.insert(uri, data);
    }

    let prefab = run_blocking(move || GltfLoader::build_prefab(&gltf, &external)).await?;
    log::info!(
        "Decoded model: {} nodes, {} meshes",
        prefab.nodes.len(),
        prefab.mesh_count()
    );
    Ok(Arc::new(prefab))
}

/// Runs CPU-bound decoding on the blocking pool. A panic inside the decoder
/// means the input was malformed.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(Error::Decode("decoder panicked on malformed input".into())),
        Err(e) => Err(e.into()),
    }
}
