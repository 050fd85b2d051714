//! Built-in shader programs and their uniform stores
//!
//! A program is selected by [`ShaderKind`]; its uniforms are named values
//! that the shading routines in the pipeline read back when drawing.

use std::collections::HashMap;

use crate::rasterizer::{Mat3, Mat4, Vec2, Vec3};

pub const MODEL: &str = "model";
pub const VIEW: &str = "view";
pub const PROJECTION: &str = "projection";
pub const NORMAL_MATRIX: &str = "normalMatrix";
pub const RENDER_RESOLUTION: &str = "renderResolution";
pub const NUM_POINT_LIGHTS: &str = "numPointLights";
pub const TILE_FACTOR: &str = "tileFactor";
pub const FILL_COLOR: &str = "fillColor";
pub const USE_TEXTURE: &str = "useTexture";
pub const ALPHA: &str = "alpha";

/// Name of a field of the `i`th entry in the point light array
pub fn point_light_field(i: usize, field: &str) -> String {
    format!("pointLights[{}].{}", i, field)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    /// Fullscreen quad sampling the offscreen target
    Screen,
    /// Orthographic overlay, no lighting
    TwoD,
    /// Snapped, Gouraud-lit, affine/perspective textured geometry
    ThreeD,
    /// Snapped, fill color only (line strips)
    Unlit,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 4] = [ShaderKind::Screen, ShaderKind::TwoD, ShaderKind::ThreeD, ShaderKind::Unlit];

    pub fn name(self) -> &'static str {
        match self {
            ShaderKind::Screen => "screen",
            ShaderKind::TwoD => "2d",
            ShaderKind::ThreeD => "3d",
            ShaderKind::Unlit => "unlit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Bool(bool),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Mat3(Mat3),
    Mat4(Mat4),
}

/// Anything named uniform values can be pushed into
pub trait UniformSink {
    fn set_uniform(&mut self, name: &str, value: UniformValue);

    fn set_int(&mut self, name: &str, v: i32) {
        self.set_uniform(name, UniformValue::Int(v));
    }

    fn set_bool(&mut self, name: &str, v: bool) {
        self.set_uniform(name, UniformValue::Bool(v));
    }

    fn set_float(&mut self, name: &str, v: f32) {
        self.set_uniform(name, UniformValue::Float(v));
    }

    fn set_vec2(&mut self, name: &str, v: Vec2) {
        self.set_uniform(name, UniformValue::Vec2(v));
    }

    fn set_vec3(&mut self, name: &str, v: Vec3) {
        self.set_uniform(name, UniformValue::Vec3(v));
    }

    fn set_mat3(&mut self, name: &str, v: Mat3) {
        self.set_uniform(name, UniformValue::Mat3(v));
    }

    fn set_mat4(&mut self, name: &str, v: Mat4) {
        self.set_uniform(name, UniformValue::Mat4(v));
    }
}

/// Uniform values of one program
#[derive(Debug, Default, Clone)]
pub struct UniformStore {
    values: HashMap<String, UniformValue>,
}

impl UniformSink for UniformStore {
    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.values.insert(name.to_string(), value);
    }
}

impl UniformStore {
    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.values.get(name).copied()
    }

    pub fn int(&self, name: &str) -> Option<i32> {
        match self.get(name)? {
            UniformValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            UniformValue::Bool(v) => Some(v),
            UniformValue::Int(v) => Some(v != 0),
            _ => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            UniformValue::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn vec2(&self, name: &str) -> Option<Vec2> {
        match self.get(name)? {
            UniformValue::Vec2(v) => Some(v),
            _ => None,
        }
    }

    pub fn vec3(&self, name: &str) -> Option<Vec3> {
        match self.get(name)? {
            UniformValue::Vec3(v) => Some(v),
            _ => None,
        }
    }

    pub fn mat3(&self, name: &str) -> Option<Mat3> {
        match self.get(name)? {
            UniformValue::Mat3(v) => Some(v),
            _ => None,
        }
    }

    pub fn mat4(&self, name: &str) -> Option<Mat4> {
        match self.get(name)? {
            UniformValue::Mat4(v) => Some(v),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The pool of built-in programs plus the one currently in use
///
/// Uniform writes through the [`UniformSink`] impl go to the current program.
#[derive(Debug)]
pub struct ShaderRegistry {
    programs: [UniformStore; 4],
    current: ShaderKind,
}

impl Default for ShaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderRegistry {
    pub fn new() -> Self {
        let programs = std::array::from_fn(|_| UniformStore::default());
        log::debug!("shader pool ready ({} programs)", ShaderKind::ALL.len());
        Self { programs, current: ShaderKind::Screen }
    }

    pub fn use_program(&mut self, kind: ShaderKind) {
        self.current = kind;
    }

    pub fn current(&self) -> ShaderKind {
        self.current
    }

    pub fn uniforms(&self, kind: ShaderKind) -> &UniformStore {
        &self.programs[kind as usize]
    }

    pub fn current_uniforms(&self) -> &UniformStore {
        self.uniforms(self.current)
    }
}

impl UniformSink for ShaderRegistry {
    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.programs[self.current as usize].set_uniform(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_go_to_current_program() {
        let mut reg = ShaderRegistry::new();
        reg.use_program(ShaderKind::ThreeD);
        reg.set_float(ALPHA, 0.5);
        reg.use_program(ShaderKind::TwoD);
        reg.set_float(ALPHA, 0.25);

        assert_eq!(reg.uniforms(ShaderKind::ThreeD).float(ALPHA), Some(0.5));
        assert_eq!(reg.uniforms(ShaderKind::TwoD).float(ALPHA), Some(0.25));
        assert!(reg.uniforms(ShaderKind::Unlit).is_empty());
    }

    #[test]
    fn test_typed_getters_reject_mismatched_types() {
        let mut store = UniformStore::default();
        store.set_int(NUM_POINT_LIGHTS, 3);
        assert_eq!(store.int(NUM_POINT_LIGHTS), Some(3));
        assert_eq!(store.float(NUM_POINT_LIGHTS), None);
        assert_eq!(point_light_field(2, "color"), "pointLights[2].color");
    }
}
