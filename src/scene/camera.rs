//! Fly camera with perspective and overlay projections

use crate::error::EngineError;
use crate::rasterizer::{Mat4, Vec3};

const WORLD_UP: Vec3 = Vec3::UP;
const NEAR: f32 = 0.1;
const FAR: f32 = 100.0;
const PITCH_LIMIT: f32 = 89.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    Perspective,
    /// Pixel-space overlay, origin top-left, Y down
    Orthogonal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraDirection {
    Forward,
    Backward,
    Left,
    Right,
}

impl TryFrom<i32> for CameraDirection {
    type Error = EngineError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(CameraDirection::Forward),
            1 => Ok(CameraDirection::Backward),
            2 => Ok(CameraDirection::Left),
            3 => Ok(CameraDirection::Right),
            other => Err(EngineError::InvalidDirection(other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub front: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    /// Degrees
    pub yaw: f32,
    /// Degrees, kept within ±89
    pub pitch: f32,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub move_speed: f32,
    pub look_sensitivity: f32,
    pub projection_kind: ProjectionKind,
    pub aspect: f32,
    /// Render target size in pixels
    pub resolution: (usize, usize),
    pub view: Mat4,
    pub perspective: Mat4,
    pub orthogonal: Mat4,
}

impl Camera {
    /// Camera at the origin looking down -Z
    pub fn new(fov: f32, move_speed: f32, projection_kind: ProjectionKind, resolution: (usize, usize)) -> Self {
        let (w, h) = resolution;
        let mut cam = Self {
            position: Vec3::ZERO,
            front: Vec3::new(0.0, 0.0, -1.0),
            right: Vec3::X,
            up: WORLD_UP,
            yaw: -90.0,
            pitch: 0.0,
            fov,
            move_speed,
            look_sensitivity: 0.1,
            projection_kind,
            aspect: w as f32 / h.max(1) as f32,
            resolution,
            view: Mat4::IDENTITY,
            perspective: Mat4::IDENTITY,
            orthogonal: Mat4::IDENTITY,
        };
        cam.set_projection(fov, ProjectionKind::Perspective);
        cam.set_projection(fov, ProjectionKind::Orthogonal);
        cam.projection_kind = projection_kind;
        cam.update();
        cam
    }

    /// Rebuild the basis vectors and view matrix from yaw and pitch
    pub fn update(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize();
        self.right = self.front.cross(WORLD_UP).normalize();
        self.up = self.right.cross(self.front).normalize();
        self.view = Mat4::look_at(self.position, self.position + self.front, self.up);
    }

    pub fn move_fly(&mut self, direction: CameraDirection, dt: f64) {
        let velocity = self.move_speed * dt as f32;
        match direction {
            CameraDirection::Forward => self.position = self.position + self.front.scale(velocity),
            CameraDirection::Backward => self.position = self.position - self.front.scale(velocity),
            CameraDirection::Left => self.position = self.position - self.right.scale(velocity),
            CameraDirection::Right => self.position = self.position + self.right.scale(velocity),
        }
    }

    /// Accumulate mouse deltas, scaled by the look sensitivity
    ///
    /// Call [`Camera::update`] afterwards to refresh the view.
    pub fn move_look(&mut self, yaw_delta: f32, pitch_delta: f32) {
        self.yaw += yaw_delta * self.look_sensitivity;
        self.pitch = (self.pitch + pitch_delta * self.look_sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Recompute the matrix for `kind` and make it active
    ///
    /// Only the perspective projection uses (and stores) `fov`.
    pub fn set_projection(&mut self, fov: f32, kind: ProjectionKind) {
        match kind {
            ProjectionKind::Perspective => {
                self.fov = fov;
                self.perspective = Mat4::perspective(fov.to_radians(), self.aspect, NEAR, FAR);
            }
            ProjectionKind::Orthogonal => {
                let (w, h) = self.resolution;
                self.orthogonal = Mat4::orthographic(0.0, w as f32, h as f32, 0.0, -1.0, 1.0);
            }
        }
        self.projection_kind = kind;
    }

    /// Matrix of the active projection kind
    pub fn projection(&self) -> Mat4 {
        match self.projection_kind {
            ProjectionKind::Perspective => self.perspective,
            ProjectionKind::Orthogonal => self.orthogonal,
        }
    }
}

/// Set the projection of the active camera, logging if there is none
pub fn set_camera_projection(camera: Option<&mut Camera>, fov: f32, kind: ProjectionKind) {
    match camera {
        Some(cam) => cam.set_projection(fov, kind),
        None => log::error!("set_camera_projection: no active camera"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::Vec4;

    fn camera() -> Camera {
        Camera::new(60.0, 4.0, ProjectionKind::Perspective, (320, 180))
    }

    #[test]
    fn test_new_camera_looks_down_negative_z() {
        let cam = camera();
        assert!((cam.front - Vec3::new(0.0, 0.0, -1.0)).len() < 1e-5);
        assert!((cam.right - Vec3::X).len() < 1e-5);
        assert!((cam.up - Vec3::UP).len() < 1e-5);
        assert_eq!(cam.yaw, -90.0);
    }

    #[test]
    fn test_fly_forward_then_strafe() {
        let mut cam = camera();
        let front = cam.front;
        cam.move_fly(CameraDirection::Forward, 0.5);
        assert!((cam.position - front.scale(2.0)).len() < 1e-5);
        cam.move_fly(CameraDirection::Right, 0.25);
        assert!((cam.position - Vec3::new(1.0, 0.0, -2.0)).len() < 1e-4);
        cam.move_fly(CameraDirection::Backward, 0.5);
        cam.move_fly(CameraDirection::Left, 0.25);
        assert!(cam.position.len() < 1e-4);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut cam = camera();
        cam.move_look(0.0, 10_000.0);
        cam.update();
        assert!((cam.pitch - 89.0).abs() < 1e-4);
        cam.move_look(0.0, -100_000.0);
        assert!((cam.pitch + 89.0).abs() < 1e-4);
    }

    #[test]
    fn test_projection_round_trip_recovers_view_point() {
        let mut cam = camera();
        cam.position = Vec3::new(1.0, 2.0, 5.0);
        cam.yaw = -70.0;
        cam.pitch = 10.0;
        cam.update();

        let p = Vec3::new(1.5, 1.0, -3.0);
        let vp = cam.perspective * cam.view;
        let clip = vp.mul_vec4(p.extend(1.0));
        let inv = vp.inverse().unwrap();
        let back = inv.mul_vec4(Vec4::new(clip.x, clip.y, clip.z, clip.w));
        let back = back.xyz().scale(1.0 / back.w);
        assert!((back - p).len() < 1e-3);
    }

    #[test]
    fn test_projection_switch_restores_perspective() {
        let mut cam = camera();
        let before = cam.perspective;
        cam.set_projection(cam.fov, ProjectionKind::Orthogonal);
        cam.set_projection(cam.fov, ProjectionKind::Perspective);
        for c in 0..4 {
            for r in 0..4 {
                assert!((before.cols[c][r] - cam.perspective.cols[c][r]).abs() < 1e-6);
            }
        }
        assert_eq!(cam.projection(), cam.perspective);
    }

    #[test]
    fn test_orthogonal_keeps_fov_and_maps_pixels() {
        let mut cam = camera();
        set_camera_projection(Some(&mut cam), 90.0, ProjectionKind::Orthogonal);
        assert_eq!(cam.fov, 60.0);
        assert_eq!(cam.projection_kind, ProjectionKind::Orthogonal);
        let tl = cam.projection().mul_vec4(Vec4::new(0.0, 0.0, 0.0, 1.0));
        assert!((tl.x + 1.0).abs() < 1e-5 && (tl.y - 1.0).abs() < 1e-5);

        set_camera_projection(Some(&mut cam), 75.0, ProjectionKind::Perspective);
        assert_eq!(cam.fov, 75.0);
        set_camera_projection(None, 75.0, ProjectionKind::Perspective);
    }

    #[test]
    fn test_raw_direction_conversion() {
        assert_eq!(CameraDirection::try_from(2).unwrap(), CameraDirection::Left);
        assert!(matches!(CameraDirection::try_from(7), Err(EngineError::InvalidDirection(7))));
    }
}
