//! Object transforms and orientation

use crate::rasterizer::{Mat3, Mat4, Quat, Vec3};

/// Placement and tint of a drawable object
///
/// The mesh is passed alongside at draw time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameObject {
    pub position: Vec3,
    /// Always unit length; every rotation renormalizes
    pub orientation: Quat,
    pub scale: Vec3,
    pub color: Vec3,
}

impl Default for GameObject {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

impl GameObject {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
            scale: Vec3::ONE,
            color: Vec3::ONE,
        }
    }

    /// Apply yaw (Y), pitch (X) and roll (Z) in degrees on top of the
    /// current orientation
    ///
    /// Each rotation is left-multiplied in the order roll, pitch, yaw, so
    /// yaw ends up outermost (world axes).
    pub fn rotate(&mut self, yaw_d: f32, pitch_d: f32, roll_d: f32) {
        let yaw = Quat::from_axis_angle(Vec3::UP, yaw_d.to_radians());
        let pitch = Quat::from_axis_angle(Vec3::X, pitch_d.to_radians());
        let roll = Quat::from_axis_angle(Vec3::Z, roll_d.to_radians());

        let mut q = roll * self.orientation;
        q = pitch * q;
        q = yaw * q;
        self.orientation = q.normalize();
    }

    /// Replace the orientation with `degrees` about `axis`
    pub fn set_axis_angle(&mut self, axis: Vec3, degrees: f32) {
        self.orientation = Quat::from_axis_angle(axis, degrees.to_radians()).normalize();
    }

    pub fn set_color(&mut self, r: f32, g: f32, b: f32) {
        self.color = Vec3::new(r, g, b);
    }

    /// `T(position) · R(orientation) · S(scale)`
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::translation(self.position) * Mat4::from_quat(self.orientation) * Mat4::scaling(self.scale)
    }

    /// Model matrix for the top-left-origin overlay
    ///
    /// `position` is the top-left corner in pixels and `scale` the size.
    /// Rotation happens about the shape's center, and Y is negated after
    /// rotation to flip Y-up mesh data into the Y-down overlay frame.
    pub fn model_matrix_2d(&self) -> Mat4 {
        let s = self.scale;
        Mat4::translation(Vec3::new(self.position.x, self.position.y, 0.0))
            * Mat4::translation(Vec3::new(0.5 * s.x, 0.5 * s.y, 0.0))
            * Mat4::from_quat(self.orientation)
            * Mat4::scaling(Vec3::new(s.x, -s.y, 1.0))
    }
}

/// `mat3(transpose(inverse(model)))`
///
/// A singular model (zero scale on an axis) falls back to its upper 3x3.
pub fn normal_matrix(model: &Mat4) -> Mat3 {
    match model.inverse() {
        Some(inv) => inv.transpose().to_mat3(),
        None => {
            log::warn!("normal_matrix: singular model matrix, using its upper 3x3");
            model.to_mat3()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_stays_unit_after_many_rotations() {
        let mut obj = GameObject::new(Vec3::ZERO);
        for i in 0..10_000 {
            obj.rotate(1.3, 0.7 * (i % 5) as f32, -2.1);
        }
        assert!((obj.orientation.norm() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_rotation_order_roll_then_pitch_then_yaw() {
        let mut obj = GameObject::new(Vec3::ZERO);
        obj.rotate(90.0, 90.0, 0.0);
        // pitch sends +Z to -Y, yaw about Y leaves it there
        let z = obj.orientation.rotate_vec3(Vec3::Z);
        assert!((z.y + 1.0).abs() < 1e-5, "{:?}", z);

        let mut other = GameObject::new(Vec3::ZERO);
        other.rotate(90.0, 0.0, 0.0);
        other.rotate(0.0, 90.0, 0.0);
        // yaw first then world pitch: +Z -> +X -> +X
        let z2 = other.orientation.rotate_vec3(Vec3::Z);
        assert!((z2.x - 1.0).abs() < 1e-5, "{:?}", z2);
    }

    #[test]
    fn test_model_matrix_translates_scales_rotates() {
        let mut obj = GameObject::new(Vec3::new(1.0, 2.0, 3.0));
        obj.scale = Vec3::new(2.0, 2.0, 2.0);
        obj.set_axis_angle(Vec3::UP, 90.0);
        let p = obj.model_matrix().transform_point(Vec3::new(0.5, 0.0, 0.0));
        assert!((p.x - 1.0).abs() < 1e-5);
        assert!((p.z - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_model_matrix_2d_anchors_top_left() {
        let mut obj = GameObject::new(Vec3::new(10.0, 20.0, 0.0));
        obj.scale = Vec3::new(100.0, 50.0, 1.0);
        let m = obj.model_matrix_2d();
        // mesh top-left (-0.5, 0.5) lands on the position
        let tl = m.transform_point(Vec3::new(-0.5, 0.5, 0.0));
        assert!((tl.x - 10.0).abs() < 1e-4 && (tl.y - 20.0).abs() < 1e-4);
        let br = m.transform_point(Vec3::new(0.5, -0.5, 0.0));
        assert!((br.x - 110.0).abs() < 1e-4 && (br.y - 70.0).abs() < 1e-4);
    }

    #[test]
    fn test_normal_matrix_undoes_non_uniform_scale() {
        let mut obj = GameObject::new(Vec3::ZERO);
        obj.scale = Vec3::new(4.0, 1.0, 1.0);
        let n = normal_matrix(&obj.model_matrix()).mul_vec3(Vec3::X);
        assert!((n.x - 0.25).abs() < 1e-5);
    }
}
