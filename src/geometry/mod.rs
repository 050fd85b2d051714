//! Geometry: resource table, procedural meshes, bounding boxes

mod aabb;
mod mesh;
mod resources;

pub use aabb::*;
pub use mesh::*;
pub use resources::*;
