//! Utilities
//!
//! - [`OrbitControls`]: damped orbit camera controller
//! - [`FpsCounter`]: frame rate measurement
//! - [`Timer`]: frame clock

pub mod fps_counter;
pub mod orbit_control;
pub mod time;

pub use fps_counter::FpsCounter;
pub use orbit_control::{ControlsProfile, OrbitControls};
pub use time::Timer;
