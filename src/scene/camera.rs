use glam::{Affine3A, Mat4, Vec3};

use crate::scene::transform::Transform;

/// Perspective camera.
///
/// `fov` is stored in radians; constructors take degrees.
#[derive(Debug, Clone)]
pub struct Camera {
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,

    pub transform: Transform,

    pub(crate) view_matrix: Mat4,
    pub(crate) projection_matrix: Mat4,
    pub(crate) view_projection_matrix: Mat4,
}

impl Camera {
    #[must_use]
    pub fn new_perspective(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut cam = Self {
            fov: fov_degrees.to_radians(),
            aspect,
            near,
            far,
            transform: Transform::new(),
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            view_projection_matrix: Mat4::IDENTITY,
        };
        cam.update_projection_matrix();
        cam
    }

    #[must_use]
    pub fn fov_degrees(&self) -> f32 {
        self.fov.to_degrees()
    }

    /// Updates aspect from a pixel size. Zero sizes are ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
        self.update_projection_matrix();
    }

    pub fn update_projection_matrix(&mut self) {
        // glam's perspective_rh targets a [0, 1] depth range.
        self.projection_matrix = Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far);
        self.view_projection_matrix = self.projection_matrix * self.view_matrix;
    }

    /// Recomputes view matrices from the camera's own transform.
    pub fn update_view(&mut self) {
        self.transform.update_local_matrix();
        let world = *self.transform.local_matrix();
        self.transform.set_world_matrix(world);
        self.update_view_projection(&world);
    }

    pub fn update_view_projection(&mut self, world_transform: &Affine3A) {
        self.view_matrix = Mat4::from(*world_transform).inverse();
        self.view_projection_matrix = self.projection_matrix * self.view_matrix;
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.transform.look_at(target, Vec3::Y);
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    #[inline]
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        self.view_matrix
    }

    #[inline]
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    #[inline]
    #[must_use]
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.view_projection_matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_viewport_keeps_aspect() {
        let mut cam = Camera::new_perspective(70.0, 1.5, 0.01, 200.0);
        cam.set_viewport(0, 600);
        assert_eq!(cam.aspect, 1.5);
        cam.set_viewport(800, 400);
        assert_eq!(cam.aspect, 2.0);
    }

    #[test]
    fn origin_projects_to_screen_center() {
        let mut cam = Camera::new_perspective(70.0, 1.0, 0.01, 200.0);
        cam.transform.position = Vec3::new(0.0, 1.0, 2.0);
        cam.look_at(Vec3::ZERO);
        cam.update_view();
        let clip = cam.view_projection_matrix() * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
    }
}
