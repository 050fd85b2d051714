//! Software rasterizer
//!
//! Features:
//! - Affine or perspective-correct texture mapping, chosen per triangle
//! - Gouraud-interpolated vertex lighting
//! - Depth-tested triangles and lines, alpha blending

mod math;
mod types;
mod render;

pub use math::*;
pub use types::*;
pub use render::*;

/// Default internal render resolution
pub const WIDTH: usize = 320;
pub const HEIGHT: usize = 180;
