use glam::Vec3;

/// Sky/ground gradient light. The only light the viewer uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HemisphereLight {
    pub sky_color: Vec3,
    pub ground_color: Vec3,
    pub intensity: f32,
}

impl HemisphereLight {
    #[must_use]
    pub fn new(sky_color: Vec3, ground_color: Vec3, intensity: f32) -> Self {
        Self {
            sky_color,
            ground_color,
            intensity,
        }
    }

    /// Builds a light from `0xRRGGBB` colours.
    #[must_use]
    pub fn from_hex(sky: u32, ground: u32, intensity: f32) -> Self {
        Self::new(hex_to_rgb(sky), hex_to_rgb(ground), intensity)
    }
}

/// Converts `0xRRGGBB` to linear-ish `[0, 1]` components.
#[must_use]
pub fn hex_to_rgb(hex: u32) -> Vec3 {
    let r = ((hex >> 16) & 0xff) as f32 / 255.0;
    let g = ((hex >> 8) & 0xff) as f32 / 255.0;
    let b = (hex & 0xff) as f32 / 255.0;
    Vec3::new(r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_conversion() {
        let orange = hex_to_rgb(0xffa500);
        assert_eq!(orange.x, 1.0);
        assert!((orange.y - 165.0 / 255.0).abs() < 1e-6);
        assert_eq!(orange.z, 0.0);
    }
}
