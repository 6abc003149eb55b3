use serde::Deserialize;

use crate::errors::{Error, Result};

/// Viewer defaults: camera, light rig, controls and AR reticle.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub camera_position: [f32; 3],
    pub camera_target: [f32; 3],

    /// `0xRRGGBB`.
    pub sky_color: u32,
    /// `0xRRGGBB`.
    pub ground_color: u32,
    pub light_intensity: f32,

    pub damping_factor: f32,

    pub reticle_inner_radius: f32,
    pub reticle_outer_radius: f32,
    pub reticle_segments: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            fov: 70.0,
            near: 0.01,
            far: 200.0,
            camera_position: [0.0, 1.0, 2.0],
            camera_target: [0.0, 0.0, 0.0],

            sky_color: 0xffa500,
            ground_color: 0x808080,
            light_intensity: 1.0,

            damping_factor: 0.05,

            reticle_inner_radius: 0.15,
            reticle_outer_radius: 0.2,
            reticle_segments: 32,
        }
    }
}

impl ViewerConfig {
    #[must_use]
    pub fn with_fov(mut self, fov: f32) -> Self {
        self.fov = fov;
        self
    }

    #[must_use]
    pub fn with_camera_position(mut self, position: [f32; 3]) -> Self {
        self.camera_position = position;
        self
    }

    #[must_use]
    pub fn with_damping_factor(mut self, damping_factor: f32) -> Self {
        self.damping_factor = damping_factor;
        self
    }

    /// Loads a config from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.fov > 0.0 && self.fov < 180.0) {
            return Err(Error::Config(format!("fov must be in (0, 180), got {}", self.fov)));
        }
        if !(self.near > 0.0 && self.near < self.far) {
            return Err(Error::Config(format!(
                "clip planes must satisfy 0 < near < far, got {} / {}",
                self.near, self.far
            )));
        }
        if !(0.0..1.0).contains(&self.damping_factor) {
            return Err(Error::Config(format!(
                "damping factor must be in [0, 1), got {}",
                self.damping_factor
            )));
        }
        if self.reticle_inner_radius >= self.reticle_outer_radius {
            return Err(Error::Config("reticle inner radius must be below outer radius".into()));
        }
        Ok(())
    }
}
