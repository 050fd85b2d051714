//! Low-precision vertex stage helpers
//!
//! Snapping quantizes clip positions to the render target's pixel grid
//! (the vertex wobble). Texture mapping selection picks affine
//! interpolation for triangles fully inside the view volume.

use crate::rasterizer::{TexMapping, Vec2, Vec4};

/// Snap a clip-space position to the pixel grid of `resolution`
///
/// Depth and `w` are preserved. Positions with `w <= 0` are behind the
/// eye and are returned unchanged for the clipper to deal with.
pub fn snap_clip_position(clip: Vec4, resolution: Vec2) -> Vec4 {
    if clip.w <= 0.0 {
        return clip;
    }
    let w = clip.w;
    let ndc = clip.xyz().scale(1.0 / w);

    let px = ((ndc.x + 1.0) * resolution.x * 0.5).floor();
    let py = ((ndc.y + 1.0) * resolution.y * 0.5).floor();
    let nx = px * 2.0 / resolution.x - 1.0;
    let ny = py * 2.0 / resolution.y - 1.0;

    // half pixel alignment
    let ox = 0.5 / resolution.x * w;
    let oy = 0.5 / resolution.y * w;

    Vec4::new(nx * w + ox, ny * w + oy, ndc.z * w, w)
}

pub fn in_view_volume(v: Vec4) -> bool {
    v.x.abs() <= v.w && v.y.abs() <= v.w && v.z.abs() <= v.w
}

/// Affine iff every vertex of the triangle lies within the view volume
pub fn select_tex_mapping(tri: &[Vec4; 3]) -> TexMapping {
    if tri.iter().all(|v| in_view_volume(*v)) {
        TexMapping::Affine
    } else {
        TexMapping::Perspective
    }
}
