//! The model viewer.
//!
//! A [`Viewer`] owns one scene, one render surface and the loops that draw
//! into it:
//!
//! - windowed frames driven by the host ([`Viewer::frame`])
//! - device frames during an immersive session ([`Viewer::xr_frame`])
//!
//! Models load in the background ([`Viewer::load`]) and are installed at the
//! next frame boundary. Only the most recent `load` can install a model.
//!
//! ```rust,ignore
//! let mut viewer = Viewer::initialize(HeadlessSurface::new(800, 600), ViewerConfig::default())?;
//! let handle = viewer.load(ModelSource::Locator(locator));
//! let root = viewer.wait_for_load(handle).await?;
//! viewer.frame(&input)?;
//! let surface = viewer.teardown();
//! ```

pub mod config;
pub mod loader;
pub mod state;

use std::sync::Arc;

use glam::{Affine3A, Mat4, Vec4};

use crate::app::input::{Input, Key};
use crate::assets::io::{AssetReader, AssetReaderVariant};
use crate::assets::prefab::SharedPrefab;
use crate::errors::{Result, SessionError};
use crate::render::{FrameSource, GpuMeshId, RenderMode, RenderScheduler, RenderSurface, RenderView};
use crate::scene::geometry::{Geometry, Material, Mesh};
use crate::scene::{Node, NodeHandle, Scene};
use crate::utils::orbit_control::ControlsProfile;
use crate::utils::time::Timer;
use crate::xr::{ArSessionState, XrFrame, XrRuntime, XrSessionManager, XrSessionState};

pub use config::ViewerConfig;
pub use loader::{LoadHandle, ModelLoader, ModelSource, get_loader_runtime};
pub use state::SceneState;

/// Name of the top-level node every loaded model is instantiated under.
pub const MODEL_ROOT_NAME: &str = "model_root";
/// Name of the AR placement instance.
pub const PLACED_OBJECT_NAME: &str = "placed_object";
/// Name of the AR reticle node.
pub const RETICLE_NAME: &str = "reticle";

pub struct Viewer<S: RenderSurface> {
    surface: S,
    scene: Scene,
    state: SceneState,
    scheduler: RenderScheduler,
    loader: ModelLoader,
    xr: XrSessionManager,
    timer: Timer,
    config: ViewerConfig,
    last_source: Option<ModelSource>,
}

impl<S: RenderSurface> Viewer<S> {
    /// Builds the camera, light rig and controls around `surface` and starts
    /// windowed rendering. Models are read with [`AssetReaderVariant`].
    pub fn initialize(surface: S, config: ViewerConfig) -> Result<Self> {
        Self::initialize_with_reader(surface, config, Arc::new(AssetReaderVariant::new()))
    }

    pub fn initialize_with_reader(
        surface: S,
        config: ViewerConfig,
        reader: Arc<dyn AssetReader>,
    ) -> Result<Self> {
        config.validate()?;

        let (width, height) = surface.size();
        let state = SceneState::new(&config, width, height);

        let mut scheduler = RenderScheduler::new();
        scheduler.start_windowed();

        log::info!("Viewer initialized ({width}x{height})");

        Ok(Self {
            surface,
            scene: Scene::new(),
            state,
            scheduler,
            loader: ModelLoader::new(reader),
            xr: XrSessionManager::default(),
            timer: Timer::new(),
            config,
            last_source: None,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    #[must_use]
    pub fn state(&self) -> &SceneState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SceneState {
        &mut self.state
    }

    #[must_use]
    pub fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    #[must_use]
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    #[must_use]
    pub fn current_object(&self) -> Option<NodeHandle> {
        self.state.current_object
    }

    #[must_use]
    pub fn xr_state(&self) -> XrSessionState {
        self.xr.state()
    }

    #[must_use]
    pub fn ar_session(&self) -> Option<&ArSessionState> {
        self.xr.session()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loader.is_loading()
    }

    // ========================================================================
    // Window
    // ========================================================================

    /// Recomputes the projection and resizes the surface. Zero sizes are
    /// ignored.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || self.surface.size() == (width, height) {
            return;
        }
        self.state.camera.set_viewport(width, height);
        self.surface.resize(width, height);
        log::debug!("Viewer resized to {width}x{height}");
    }

    /// Puts the camera back at its configured pose.
    pub fn reset_camera(&mut self) {
        let (width, height) = self.surface.size();
        let fresh = SceneState::new(&self.config, width, height);
        self.state.camera = fresh.camera;
        self.state.controls = fresh.controls;
        if self.xr.is_active() {
            self.state.controls.set_profile(ControlsProfile::Immersive);
        }
    }

    // ========================================================================
    // Model Loading
    // ========================================================================

    /// Starts loading a model. Any load still in flight is superseded.
    pub fn load(&mut self, source: ModelSource) -> LoadHandle {
        self.last_source = Some(source.clone());
        self.loader.start(source)
    }

    /// Loads the most recent source again.
    pub fn reload(&mut self) -> Option<LoadHandle> {
        let source = self.last_source.clone()?;
        Some(self.loader.start(source))
    }

    /// Installs a finished load, if any. Returns whether one settled.
    pub fn poll_loads(&mut self) -> bool {
        let Some(completed) = self.loader.take_completed() else {
            return false;
        };

        let outcome = completed
            .result
            .and_then(|prefab| self.install_model(prefab));
        match &outcome {
            Ok(root) => log::info!("Model #{} installed as {root:?}", completed.generation),
            Err(e) => log::error!("Model #{} failed to load: {e}", completed.generation),
        }
        let _ = completed.responder.send(outcome);
        true
    }

    /// Drives [`poll_loads`](Self::poll_loads) until `handle` settles.
    pub async fn wait_for_load(&mut self, mut handle: LoadHandle) -> Result<NodeHandle> {
        loop {
            self.poll_loads();
            if let Some(result) = handle.try_result() {
                return result;
            }
            self.loader.wait_for_outcome().await;
        }
    }

    fn install_model(&mut self, prefab: SharedPrefab) -> Result<NodeHandle> {
        let root = self.scene.instantiate(&prefab, MODEL_ROOT_NAME);
        if let Err(e) = self.upload_subtree(root) {
            self.dispose_subtree(root);
            return Err(e);
        }

        if let Some(previous) = self.state.current_object.take() {
            self.dispose_subtree(previous);
        }
        self.state.current_object = Some(root);
        self.state.current_prefab = Some(prefab);
        Ok(root)
    }

    fn upload_subtree(&mut self, root: NodeHandle) -> Result<()> {
        for key in self.scene.pending_uploads(root) {
            let Some(mesh) = self.scene.mesh(key) else {
                continue;
            };
            let id = self.surface.upload_mesh(&mesh.geometry, &mesh.material)?;
            if let Some(mesh) = self.scene.mesh_mut(key) {
                mesh.gpu = Some(id);
            }
        }
        Ok(())
    }

    fn dispose_subtree(&mut self, root: NodeHandle) {
        let released = self.scene.remove_subtree(root);
        self.release_gpu(released);
    }

    fn release_gpu(&mut self, ids: Vec<GpuMeshId>) {
        for id in ids {
            self.surface.release_mesh(id);
        }
    }

    // ========================================================================
    // Frames
    // ========================================================================

    /// Windowed tick. Returns `false` when windowed rendering is not the
    /// active loop.
    pub fn frame(&mut self, input: &Input) -> Result<bool> {
        if self.scheduler.begin_frame(FrameSource::Window).is_none() {
            return Ok(false);
        }
        self.poll_loads();

        if input.get_key_down(Key::R) {
            self.reset_camera();
        }

        let dt = self.timer.tick();
        let fov = self.state.camera.fov_degrees();
        self.state
            .controls
            .update(&mut self.state.camera.transform, input, fov, dt);
        self.state.camera.update_view();

        self.scene.update_matrix_world();
        let view = RenderView {
            view_projection: self.state.camera.view_projection_matrix(),
            camera_position: self.state.camera.position(),
            light: self.state.light_rig,
        };
        self.render(&view)?;
        Ok(true)
    }

    /// Immersive tick, called once per device frame.
    pub fn xr_frame(&mut self, frame: &XrFrame) -> Result<bool> {
        if self.scheduler.begin_frame(FrameSource::XrDevice).is_none() {
            return Ok(false);
        }
        self.poll_loads();

        let visible = self.xr.record_hit(frame.hit_pose);
        if let Some(session) = self.xr.session() {
            let reticle = session.reticle;
            if let Some(pose) = frame.hit_pose {
                Self::set_pose(&mut self.scene, reticle, pose);
            }
            self.scene.set_visible(reticle, visible);
        }

        self.scene.update_matrix_world();
        let view_matrix = Mat4::from(frame.viewer_pose.inverse());
        let view = RenderView {
            view_projection: frame.projection * view_matrix,
            camera_position: frame.viewer_pose.translation.into(),
            light: self.state.light_rig,
        };
        self.render(&view)?;
        Ok(true)
    }

    fn render(&mut self, view: &RenderView) -> Result<()> {
        let draws = self.scene.draw_list();
        self.surface.render(view, &draws)
    }

    fn set_pose(scene: &mut Scene, node: NodeHandle, pose: Affine3A) {
        if let Some(n) = scene.get_node_mut(node) {
            n.transform.apply_local_matrix(pose);
        }
    }

    // ========================================================================
    // Immersive Sessions
    // ========================================================================

    /// Requests an AR session from `runtime` and switches rendering to
    /// device frames.
    ///
    /// On a capability or session error the viewer stays in windowed mode.
    pub fn enter_immersive<R: XrRuntime + 'static>(&mut self, runtime: R) -> Result<()> {
        let mut runtime: Box<dyn XrRuntime> = Box::new(runtime);
        self.xr.negotiate(runtime.as_mut())?;

        let reticle = match self.create_reticle() {
            Ok(reticle) => reticle,
            Err(e) => {
                self.xr.abort_request(runtime.as_mut());
                return Err(e);
            }
        };

        self.xr.activate(runtime, ArSessionState::new(reticle))?;
        self.scheduler.enter_immersive();
        self.state.controls.set_profile(ControlsProfile::Immersive);
        Ok(())
    }

    fn create_reticle(&mut self) -> Result<NodeHandle> {
        let geometry = Geometry::ring(
            self.config.reticle_inner_radius,
            self.config.reticle_outer_radius,
            self.config.reticle_segments,
        );
        let material = Material::new(Vec4::ONE).with_double_sided(true);

        let mut node = Node::with_name(RETICLE_NAME);
        node.visible = false;
        let reticle = self.scene.add_node(node);
        self.scene
            .set_mesh(reticle, Mesh::new(Arc::new(geometry), material));

        if let Err(e) = self.upload_subtree(reticle) {
            self.dispose_subtree(reticle);
            return Err(e);
        }
        Ok(reticle)
    }

    /// Places the current model at the reticle, replacing any earlier
    /// placement. Does nothing without a visible reticle or a loaded model.
    pub fn xr_select(&mut self) -> Result<Option<NodeHandle>> {
        let Some(session) = self.xr.session() else {
            return Ok(None);
        };
        let (Some(pose), Some(prefab)) = (session.reticle_pose, self.state.current_prefab.clone())
        else {
            return Ok(None);
        };
        let previous = session.placed_object;

        let placed = self.scene.instantiate(&prefab, PLACED_OBJECT_NAME);
        if let Err(e) = self.upload_subtree(placed) {
            self.dispose_subtree(placed);
            return Err(e);
        }
        Self::set_pose(&mut self.scene, placed, pose);

        if let Some(previous) = previous {
            self.dispose_subtree(previous);
        }
        if let Some(session) = self.xr.session_mut() {
            session.placed_object = Some(placed);
        }
        log::info!("Placed model at {:?}", pose.translation);
        Ok(Some(placed))
    }

    /// Ends the immersive session from the viewer side.
    pub fn exit_immersive(&mut self) -> Result<()> {
        if !self.xr.is_active() {
            return Err(SessionError::NotActive.into());
        }
        self.finish_session(true);
        Ok(())
    }

    /// The device ended the session (user gesture, tracking loss, ...).
    pub fn xr_session_ended(&mut self, reason: &str) {
        if self.xr.is_active() {
            log::warn!("Immersive session ended by device: {reason}");
            self.finish_session(false);
        }
    }

    fn finish_session(&mut self, notify_runtime: bool) {
        let Some(session) = self.xr.end(notify_runtime) else {
            return;
        };
        if let Some(placed) = session.placed_object {
            self.dispose_subtree(placed);
        }
        self.dispose_subtree(session.reticle);

        if self.scheduler.mode() == RenderMode::Immersive {
            self.scheduler.exit_immersive();
        }
        self.state.controls.set_profile(ControlsProfile::Windowed);
        self.timer.reset();
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Cancels loading, ends any session, stops rendering and releases every
    /// GPU resource. Returns the released surface.
    pub fn teardown(mut self) -> S {
        self.loader.cancel();
        if self.xr.is_active() {
            self.finish_session(true);
        }
        self.scheduler.stop();

        let ids = self.scene.drain_gpu_ids();
        self.release_gpu(ids);
        self.scene = Scene::new();
        self.state.current_object = None;
        self.state.current_prefab = None;

        self.surface.release();
        log::info!("Viewer torn down");
        self.surface
    }
}

impl<S: RenderSurface> std::fmt::Debug for Viewer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewer")
            .field("mode", &self.scheduler.mode())
            .field("xr", &self.xr.state())
            .field("current_object", &self.state.current_object)
            .field("generation", &self.loader.generation())
            .finish_non_exhaustive()
    }
}
