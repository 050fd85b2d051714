//! Point lights with discrete attenuation levels

use crate::pipeline::shader::{point_light_field, UniformSink, NUM_POINT_LIGHTS};
use crate::rasterizer::Vec3;

pub const MAX_POINT_LIGHTS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightIntensity {
    Zero,
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

/// (linear, quadratic) attenuation constants per level
const ATTENUATION: [(f32, f32); 6] = [
    (0.0, 0.0),
    (0.14, 0.07),
    (0.07, 0.017),
    (0.027, 0.0028),
    (0.014, 0.0007),
    (0.0014, 0.000007),
];

impl LightIntensity {
    pub fn linear(self) -> f32 {
        ATTENUATION[self as usize].0
    }

    pub fn quadratic(self) -> f32 {
        ATTENUATION[self as usize].1
    }

    /// Level from a raw integer; unknown values log and act as `Zero`
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => LightIntensity::Zero,
            1 => LightIntensity::VeryLow,
            2 => LightIntensity::Low,
            3 => LightIntensity::Medium,
            4 => LightIntensity::High,
            5 => LightIntensity::VeryHigh,
            other => {
                log::error!("unknown light intensity {}, using zero attenuation", other);
                LightIntensity::Zero
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: LightIntensity,
    pub ambient: f32,
}

impl PointLight {
    /// White, medium-range light at `position`
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            color: Vec3::ONE,
            intensity: LightIntensity::Medium,
            ambient: 0.1,
        }
    }

    /// `1 / (1 + linear·d + quadratic·d²)`
    pub fn attenuation(&self, distance: f32) -> f32 {
        attenuation(self.intensity.linear(), self.intensity.quadratic(), distance)
    }
}

pub fn attenuation(linear: f32, quadratic: f32, distance: f32) -> f32 {
    1.0 / (1.0 + linear * distance + quadratic * distance * distance)
}

/// Push up to [`MAX_POINT_LIGHTS`] lights into `sink`
pub fn update_lighting(sink: &mut dyn UniformSink, lights: &[PointLight]) {
    if lights.len() > MAX_POINT_LIGHTS {
        log::warn!(
            "update_lighting: {} lights submitted, only the first {} are used",
            lights.len(),
            MAX_POINT_LIGHTS
        );
    }
    let lights = &lights[..lights.len().min(MAX_POINT_LIGHTS)];

    sink.set_int(NUM_POINT_LIGHTS, lights.len() as i32);
    for (i, light) in lights.iter().enumerate() {
        sink.set_vec3(&point_light_field(i, "position"), light.position);
        sink.set_vec3(&point_light_field(i, "color"), light.color);
        sink.set_float(&point_light_field(i, "linear"), light.intensity.linear());
        sink.set_float(&point_light_field(i, "quadratic"), light.intensity.quadratic());
        sink.set_float(&point_light_field(i, "ambient"), light.ambient);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::shader::UniformStore;

    #[test]
    fn test_attenuation_table() {
        assert_eq!(LightIntensity::VeryLow.linear(), 0.14);
        assert_eq!(LightIntensity::VeryHigh.quadratic(), 0.000007);
        let light = PointLight::new(Vec3::ZERO);
        let expected = 1.0 / (1.0 + 0.027 * 10.0 + 0.0028 * 100.0);
        assert!((light.attenuation(10.0) - expected).abs() < 1e-6);
        assert!((light.attenuation(0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_intensity_is_zero() {
        let level = LightIntensity::from_raw(42);
        assert_eq!(level, LightIntensity::Zero);
        assert_eq!(level.linear(), 0.0);
        assert_eq!(LightIntensity::from_raw(4), LightIntensity::High);
    }

    #[test]
    fn test_update_lighting_writes_named_fields() {
        let mut store = UniformStore::default();
        let mut light = PointLight::new(Vec3::new(1.0, 2.0, 3.0));
        light.ambient = 0.3;
        update_lighting(&mut store, &[light]);

        assert_eq!(store.int(NUM_POINT_LIGHTS), Some(1));
        assert_eq!(store.vec3("pointLights[0].position"), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(store.float("pointLights[0].linear"), Some(0.027));
        assert_eq!(store.float("pointLights[0].quadratic"), Some(0.0028));
        assert_eq!(store.float("pointLights[0].ambient"), Some(0.3));
    }

    #[test]
    fn test_update_lighting_clamps_count() {
        let mut store = UniformStore::default();
        let lights = vec![PointLight::new(Vec3::ZERO); 40];
        update_lighting(&mut store, &lights);
        assert_eq!(store.int(NUM_POINT_LIGHTS), Some(32));
        assert!(store.vec3("pointLights[31].color").is_some());
        assert!(store.vec3("pointLights[32].color").is_none());
    }
}
