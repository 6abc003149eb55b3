use glam::Vec3;

use crate::assets::prefab::SharedPrefab;
use crate::scene::{Camera, HemisphereLight, NodeHandle};
use crate::utils::orbit_control::OrbitControls;
use crate::viewer::config::ViewerConfig;

/// Everything one viewer renders with.
#[derive(Debug, Clone)]
pub struct SceneState {
    pub camera: Camera,
    pub light_rig: HemisphereLight,
    pub controls: OrbitControls,
    /// Top-level node of the loaded model. Replaced on every successful load.
    pub current_object: Option<NodeHandle>,
    /// Decoded form of `current_object`, kept for AR placement.
    pub current_prefab: Option<SharedPrefab>,
}

impl SceneState {
    #[must_use]
    pub fn new(config: &ViewerConfig, width: u32, height: u32) -> Self {
        let aspect = if width > 0 && height > 0 {
            width as f32 / height as f32
        } else {
            1.0
        };

        let position = Vec3::from_array(config.camera_position);
        let target = Vec3::from_array(config.camera_target);

        let mut camera = Camera::new_perspective(config.fov, aspect, config.near, config.far);
        camera.transform.position = position;
        camera.look_at(target);
        camera.update_view();

        let controls = OrbitControls::from_position(position, target).with_damping(config.damping_factor);

        Self {
            camera,
            light_rig: HemisphereLight::from_hex(
                config.sky_color,
                config.ground_color,
                config.light_intensity,
            ),
            controls,
            current_object: None,
            current_prefab: None,
        }
    }
}
