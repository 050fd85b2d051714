//! Axis-aligned bounding boxes

use crate::error::{EngineError, Result};
use crate::rasterizer::Vec3;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Check if a point is inside the box
    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x
            && point.y >= self.min.y && point.y <= self.max.y
            && point.z >= self.min.z && point.z <= self.max.z
    }

    /// Expand bounds to include a point
    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Get center of the box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max).scale(0.5)
    }
}

/// Bounds of a vertex set, seeded from the first vertex
pub fn compute_aabb(vertices: &[Vec3]) -> Result<Aabb> {
    let (first, rest) = vertices
        .split_first()
        .ok_or_else(|| EngineError::InvalidArgument("compute_aabb: no vertices".to_string()))?;

    let mut aabb = Aabb::new(*first, *first);
    for v in rest {
        aabb.expand(*v);
    }
    Ok(aabb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_contains_all_vertices() {
        let verts = [
            Vec3::new(1.0, -2.0, 0.5),
            Vec3::new(-3.0, 4.0, 0.0),
            Vec3::new(0.0, 0.0, -7.0),
        ];
        let aabb = compute_aabb(&verts).unwrap();
        assert!(verts.iter().all(|v| aabb.contains(*v)));
        assert_eq!(aabb.min, Vec3::new(-3.0, -2.0, -7.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 4.0, 0.5));
    }

    #[test]
    fn test_single_vertex_is_degenerate_box() {
        let v = Vec3::new(2.0, 3.0, 4.0);
        let aabb = compute_aabb(&[v]).unwrap();
        assert_eq!(aabb.min, v);
        assert_eq!(aabb.max, v);
    }

    #[test]
    fn test_empty_input_is_invalid() {
        assert!(matches!(compute_aabb(&[]), Err(EngineError::InvalidArgument(_))));
    }
}
