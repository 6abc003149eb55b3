//! Immersive (AR/VR) sessions.
//!
//! - [`XrRuntime`]: platform XR services (capabilities, session requests)
//! - [`XrSessionManager`]: the `Idle -> Requesting -> Active` state machine
//! - [`ArSessionState`]: reticle and placed object of a running session
//!
//! The [`Viewer`](crate::viewer::Viewer) drives these; scene changes happen
//! there.

pub mod runtime;
pub mod session;

pub use runtime::{NoXrRuntime, XrFeature, XrFrame, XrRuntime, XrSessionMode, XrSessionRequest};
pub use session::{ArSessionState, XrSessionManager, XrSessionState};
