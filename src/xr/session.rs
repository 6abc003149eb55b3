use glam::Affine3A;

use crate::errors::{Error, Result, SessionError};
use crate::scene::NodeHandle;
use crate::xr::runtime::{XrRuntime, XrSessionRequest};

/// Lifecycle of an immersive session.
///
/// `Idle -> Requesting -> Active -> Idle`, with `Requesting -> Idle` when the
/// device lacks a capability or the request is denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XrSessionState {
    #[default]
    Idle,
    Requesting,
    Active,
}

/// Per-session AR state. Lives exactly as long as the session.
#[derive(Debug, Clone)]
pub struct ArSessionState {
    pub active: bool,
    /// Flat ring marking the last hit-test surface. Hidden without a hit.
    pub reticle: NodeHandle,
    pub reticle_pose: Option<Affine3A>,
    pub placed_object: Option<NodeHandle>,
}

impl ArSessionState {
    #[must_use]
    pub fn new(reticle: NodeHandle) -> Self {
        Self {
            active: true,
            reticle,
            reticle_pose: None,
            placed_object: None,
        }
    }

    #[must_use]
    pub fn reticle_visible(&self) -> bool {
        self.reticle_pose.is_some()
    }
}

/// Owns the session state machine and, while a session runs, the runtime
/// that granted it.
pub struct XrSessionManager {
    state: XrSessionState,
    request: XrSessionRequest,
    runtime: Option<Box<dyn XrRuntime>>,
    session: Option<ArSessionState>,
}

impl Default for XrSessionManager {
    fn default() -> Self {
        Self::new(XrSessionRequest::augmented_reality())
    }
}

impl XrSessionManager {
    #[must_use]
    pub fn new(request: XrSessionRequest) -> Self {
        Self {
            state: XrSessionState::Idle,
            request,
            runtime: None,
            session: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> XrSessionState {
        self.state
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == XrSessionState::Active
    }

    #[must_use]
    pub fn session(&self) -> Option<&ArSessionState> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut ArSessionState> {
        self.session.as_mut()
    }

    /// `Idle -> Requesting`, then capability checks and the device request.
    ///
    /// On success the manager stays in `Requesting` until [`activate`] or
    /// [`abort_request`]. Any failure returns it to `Idle`.
    ///
    /// [`activate`]: Self::activate
    /// [`abort_request`]: Self::abort_request
    pub fn negotiate(&mut self, runtime: &mut dyn XrRuntime) -> Result<()> {
        match self.state {
            XrSessionState::Idle => {}
            XrSessionState::Requesting => return Err(SessionError::Busy("being requested").into()),
            XrSessionState::Active => return Err(SessionError::Busy("active").into()),
        }
        self.state = XrSessionState::Requesting;

        let outcome = Self::check_and_request(&self.request, runtime);
        if let Err(e) = &outcome {
            log::warn!("Immersive session unavailable: {e}");
            self.state = XrSessionState::Idle;
        }
        outcome
    }

    fn check_and_request(request: &XrSessionRequest, runtime: &mut dyn XrRuntime) -> Result<()> {
        if !runtime.is_session_supported(request.mode) {
            return Err(Error::Capability(format!("{} sessions are not supported", request.mode)));
        }
        if let Some(missing) = request
            .required_features
            .iter()
            .find(|&&f| !runtime.supports_feature(f))
        {
            return Err(Error::Capability(format!("required feature {missing} is not supported")));
        }
        runtime.request_session(request)?;
        Ok(())
    }

    /// `Requesting -> Active`.
    pub fn activate(&mut self, runtime: Box<dyn XrRuntime>, session: ArSessionState) -> Result<()> {
        if self.state != XrSessionState::Requesting {
            return Err(SessionError::NotActive.into());
        }
        log::info!("Immersive session started");
        self.runtime = Some(runtime);
        self.session = Some(session);
        self.state = XrSessionState::Active;
        Ok(())
    }

    /// `Requesting -> Idle` after a granted request could not be set up.
    pub fn abort_request(&mut self, runtime: &mut dyn XrRuntime) {
        if self.state == XrSessionState::Requesting {
            runtime.end_session();
            self.state = XrSessionState::Idle;
        }
    }

    /// Stores this frame's hit-test result. Returns whether the reticle
    /// should be visible.
    pub fn record_hit(&mut self, pose: Option<Affine3A>) -> bool {
        match self.session.as_mut() {
            Some(session) => {
                session.reticle_pose = pose;
                pose.is_some()
            }
            None => false,
        }
    }

    /// `Active -> Idle`. Returns the finished session for cleanup.
    ///
    /// With `notify_runtime` the runtime is told to end the session; pass
    /// `false` when the device ended it.
    pub fn end(&mut self, notify_runtime: bool) -> Option<ArSessionState> {
        if self.state != XrSessionState::Active {
            return None;
        }
        if let Some(mut runtime) = self.runtime.take()
            && notify_runtime
        {
            runtime.end_session();
        }
        self.state = XrSessionState::Idle;
        self.session.take().map(|mut s| {
            s.active = false;
            s
        })
    }
}
