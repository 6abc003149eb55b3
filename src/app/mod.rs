//! Application shell.
//!
//! - [`input`]: platform-agnostic input state read by the viewer
//! - [`winit`]: desktop runner that hosts a [`Viewer`](crate::viewer::Viewer)
//!   in a window (feature `winit`)

pub mod input;

#[cfg(feature = "winit")]
pub mod winit;

pub use input::{ButtonState, Input, Key, MouseButton};

#[cfg(feature = "winit")]
pub use self::winit::App;
