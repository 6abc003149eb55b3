//! Platform-agnostic input state.
//!
//! Platform adapters (see [`winit::input_adapter`](super::winit::input_adapter))
//! translate native events into these types; viewer logic only reads them.

use glam::Vec2;
use rustc_hash::FxHashSet;

/// Keys the viewer binds actions to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Enter or leave the immersive session.
    A,
    /// Reset the camera.
    R,
    /// Reload the current model.
    L,
    Space,
    Enter,
    Escape,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

/// Per-frame input snapshot.
#[derive(Debug, Clone, Default)]
pub struct Input {
    pressed_keys: FxHashSet<Key>,
    just_pressed_keys: FxHashSet<Key>,

    pressed_mouse: FxHashSet<MouseButton>,
    just_pressed_mouse: FxHashSet<MouseButton>,

    mouse_position: Vec2,
    has_cursor: bool,
    mouse_delta: Vec2,
    scroll_delta: Vec2,

    screen_size: Vec2,
}

impl Input {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Injection (called by adapters) ==========

    /// Clears per-frame state (just-pressed sets and deltas).
    pub fn start_frame(&mut self) {
        self.just_pressed_keys.clear();
        self.just_pressed_mouse.clear();
        self.mouse_delta = Vec2::ZERO;
        self.scroll_delta = Vec2::ZERO;
    }

    pub fn inject_key(&mut self, key: Key, state: ButtonState) {
        match state {
            ButtonState::Pressed => {
                if self.pressed_keys.insert(key) {
                    self.just_pressed_keys.insert(key);
                }
            }
            ButtonState::Released => {
                self.pressed_keys.remove(&key);
            }
        }
    }

    pub fn inject_mouse_button(&mut self, button: MouseButton, state: ButtonState) {
        match state {
            ButtonState::Pressed => {
                if self.pressed_mouse.insert(button) {
                    self.just_pressed_mouse.insert(button);
                }
            }
            ButtonState::Released => {
                self.pressed_mouse.remove(&button);
            }
        }
    }

    pub fn inject_mouse_position(&mut self, x: f32, y: f32) {
        let new_pos = Vec2::new(x, y);
        if self.has_cursor {
            self.mouse_delta += new_pos - self.mouse_position;
        }
        self.mouse_position = new_pos;
        self.has_cursor = true;
    }

    pub fn inject_scroll(&mut self, delta_x: f32, delta_y: f32) {
        self.scroll_delta += Vec2::new(delta_x, delta_y);
    }

    pub fn inject_resize(&mut self, width: u32, height: u32) {
        self.screen_size = Vec2::new(width as f32, height as f32);
    }

    // ========== Queries ==========

    #[must_use]
    pub fn get_key(&self, key: Key) -> bool {
        self.pressed_keys.contains(&key)
    }

    #[must_use]
    pub fn get_key_down(&self, key: Key) -> bool {
        self.just_pressed_keys.contains(&key)
    }

    #[must_use]
    pub fn get_mouse_button(&self, button: MouseButton) -> bool {
        self.pressed_mouse.contains(&button)
    }

    #[must_use]
    pub fn get_mouse_button_down(&self, button: MouseButton) -> bool {
        self.just_pressed_mouse.contains(&button)
    }

    #[must_use]
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    #[must_use]
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    #[must_use]
    pub fn scroll_delta(&self) -> Vec2 {
        self.scroll_delta
    }

    #[must_use]
    pub fn screen_size(&self) -> Vec2 {
        self.screen_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_cursor_event_has_no_delta() {
        let mut input = Input::new();
        input.inject_mouse_position(100.0, 50.0);
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
        input.inject_mouse_position(110.0, 45.0);
        assert_eq!(input.mouse_delta(), Vec2::new(10.0, -5.0));
        input.start_frame();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
    }

    #[test]
    fn key_down_fires_once_per_press() {
        let mut input = Input::new();
        input.inject_key(Key::A, ButtonState::Pressed);
        assert!(input.get_key_down(Key::A));
        input.start_frame();
        input.inject_key(Key::A, ButtonState::Pressed);
        assert!(!input.get_key_down(Key::A));
        assert!(input.get_key(Key::A));
    }
}
