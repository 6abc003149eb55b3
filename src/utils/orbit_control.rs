use glam::{Vec2, Vec3};

use crate::app::input::{Input, MouseButton};
use crate::scene::transform::Transform;

/// Which interactions are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlsProfile {
    /// Rotate, zoom and pan.
    #[default]
    Windowed,
    /// Rotate and zoom only; the device pose moves the camera.
    Immersive,
}

/// Damped orbit camera controller.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub damping_factor: f32,
    pub enable_damping: bool,
    pub enable_pan: bool,
    pub min_distance: f32,
    pub max_distance: f32,

    pub center: Vec3,
    pub radius: f32,
    pub theta: f32,
    pub phi: f32,

    rotate_delta: Vec2,
    profile: ControlsProfile,
}

impl OrbitControls {
    #[must_use]
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            rotate_speed: 1.0,
            zoom_speed: 0.05,
            pan_speed: 1.0,
            damping_factor: 0.05,
            enable_damping: true,
            enable_pan: true,
            min_distance: 0.1,
            max_distance: 100.0,

            center,
            radius,
            theta: 0.0,
            phi: std::f32::consts::FRAC_PI_2,

            rotate_delta: Vec2::ZERO,
            profile: ControlsProfile::Windowed,
        }
    }

    /// Orbits around `target` starting from `position`.
    #[must_use]
    pub fn from_position(position: Vec3, target: Vec3) -> Self {
        let offset = position - target;
        let radius = offset.length().max(1e-4);
        let mut controls = Self::new(target, radius);
        controls.theta = offset.x.atan2(offset.z);
        controls.phi = (offset.y / radius).clamp(-1.0, 1.0).acos();
        controls
    }

    #[must_use]
    pub fn with_damping(mut self, damping_factor: f32) -> Self {
        self.enable_damping = damping_factor > 0.0;
        self.damping_factor = damping_factor;
        self
    }

    #[must_use]
    pub fn profile(&self) -> ControlsProfile {
        self.profile
    }

    pub fn set_profile(&mut self, profile: ControlsProfile) {
        self.profile = profile;
        self.enable_pan = profile == ControlsProfile::Windowed;
        self.rotate_delta = Vec2::ZERO;
    }

    /// Applies this frame's input and writes the camera pose into `transform`.
    pub fn update(&mut self, transform: &mut Transform, input: &Input, fov_degrees: f32, dt: f32) {
        let screen_height = input.screen_size().y.max(1.0);
        let cursor_delta = input.mouse_delta();

        if input.get_mouse_button(MouseButton::Left) {
            let rotate_per_pixel = 2.0 * std::f32::consts::PI / screen_height;
            self.rotate_delta.x -= cursor_delta.x * rotate_per_pixel * self.rotate_speed;
            self.rotate_delta.y -= cursor_delta.y * rotate_per_pixel * self.rotate_speed;
        }

        if self.enable_damping {
            let target_fps = 60.0;
            let retention = (1.0 - self.damping_factor).powf(dt * target_fps);
            let delta_apply = self.rotate_delta * (1.0 - retention);

            self.theta += delta_apply.x;
            self.phi += delta_apply.y;
            self.rotate_delta *= retention;
        } else {
            self.theta += self.rotate_delta.x;
            self.phi += self.rotate_delta.y;
            self.rotate_delta = Vec2::ZERO;
        }

        const EPS: f32 = 0.0001;
        self.phi = self.phi.clamp(EPS, std::f32::consts::PI - EPS);

        let scroll = input.scroll_delta().y;
        if scroll != 0.0 {
            let scale = (1.0 - self.zoom_speed).powf(scroll.abs());
            if scroll > 0.0 {
                self.radius *= scale;
            } else {
                self.radius /= scale;
            }
            self.radius = self.radius.clamp(self.min_distance, self.max_distance);
        }

        if self.enable_pan && input.get_mouse_button(MouseButton::Right) {
            let half_fov = fov_degrees.to_radians() / 2.0;
            let target_world_height = 2.0 * self.radius * half_fov.tan();
            let pixels_to_world_ratio = target_world_height / screen_height;

            let forward = -self.offset_direction();
            let right = forward.cross(Vec3::Y).normalize();
            let up = right.cross(forward).normalize();

            self.center += (right * -cursor_delta.x + up * cursor_delta.y)
                * pixels_to_world_ratio
                * self.pan_speed;
        }

        transform.position = self.center + self.offset_direction() * self.radius;
        transform.look_at(self.center, Vec3::Y);
    }

    fn offset_direction(&self) -> Vec3 {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        Vec3::new(sin_phi * sin_theta, cos_phi, sin_phi * cos_theta)
    }
}
