//! Device-side XR services.
//!
//! The viewer never talks to a headset or phone directly. Platform glue
//! implements [`XrRuntime`] and feeds device frames back as [`XrFrame`]s.

use std::fmt;

use glam::{Affine3A, Mat4};

use crate::errors::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XrSessionMode {
    ImmersiveAr,
    ImmersiveVr,
}

impl fmt::Display for XrSessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImmersiveAr => f.write_str("immersive-ar"),
            Self::ImmersiveVr => f.write_str("immersive-vr"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XrFeature {
    HitTest,
    LocalFloor,
    DomOverlay,
}

impl fmt::Display for XrFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HitTest => f.write_str("hit-test"),
            Self::LocalFloor => f.write_str("local-floor"),
            Self::DomOverlay => f.write_str("dom-overlay"),
        }
    }
}

/// What the viewer asks the device for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrSessionRequest {
    pub mode: XrSessionMode,
    pub required_features: Vec<XrFeature>,
    pub optional_features: Vec<XrFeature>,
}

impl XrSessionRequest {
    /// `immersive-ar` with `hit-test` required.
    #[must_use]
    pub fn augmented_reality() -> Self {
        Self {
            mode: XrSessionMode::ImmersiveAr,
            required_features: vec![XrFeature::HitTest],
            optional_features: vec![XrFeature::LocalFloor],
        }
    }
}

/// One device-delivered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XrFrame {
    /// Viewer (head or phone) pose in the local reference space.
    pub viewer_pose: Affine3A,
    pub projection: Mat4,
    /// First hit-test result for this frame, if the ray hit a surface.
    pub hit_pose: Option<Affine3A>,
}

impl XrFrame {
    #[must_use]
    pub fn new(viewer_pose: Affine3A, projection: Mat4) -> Self {
        Self {
            viewer_pose,
            projection,
            hit_pose: None,
        }
    }

    #[must_use]
    pub fn with_hit(mut self, pose: Affine3A) -> Self {
        self.hit_pose = Some(pose);
        self
    }
}

/// Platform XR services.
pub trait XrRuntime: Send {
    fn is_session_supported(&self, mode: XrSessionMode) -> bool;

    fn supports_feature(&self, feature: XrFeature) -> bool;

    /// Asks the device (and usually the user) for a session.
    fn request_session(&mut self, request: &XrSessionRequest) -> Result<(), SessionError>;

    /// Ends the running session. Called at most once per granted request.
    fn end_session(&mut self);
}

impl<R: XrRuntime + ?Sized> XrRuntime for Box<R> {
    fn is_session_supported(&self, mode: XrSessionMode) -> bool {
        (**self).is_session_supported(mode)
    }

    fn supports_feature(&self, feature: XrFeature) -> bool {
        (**self).supports_feature(feature)
    }

    fn request_session(&mut self, request: &XrSessionRequest) -> Result<(), SessionError> {
        (**self).request_session(request)
    }

    fn end_session(&mut self) {
        (**self).end_session();
    }
}

/// Runtime for platforms without XR support.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoXrRuntime;

impl XrRuntime for NoXrRuntime {
    fn is_session_supported(&self, _mode: XrSessionMode) -> bool {
        false
    }

    fn supports_feature(&self, _feature: XrFeature) -> bool {
        false
    }

    fn request_session(&mut self, request: &XrSessionRequest) -> Result<(), SessionError> {
        Err(SessionError::Denied(format!("{} is not available on this platform", request.mode)))
    }

    fn end_session(&mut self) {}
}
