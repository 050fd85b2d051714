//! Framebuffer and triangle/line rasterization

use super::math::{barycentric, Vec2, Vec3, Vec4};
use super::types::{Color, ScreenVertex, TexMapping, Texture};
use crate::error::{EngineError, Result};

/// Color + depth attachment pair for software rendering
///
/// Rows are stored top-first.
pub struct Framebuffer {
    pub pixels: Vec<u8>,    // RGBA, 4 bytes per pixel
    pub zbuffer: Vec<f32>,  // Depth buffer
    pub width: usize,
    pub height: usize,
}

impl Framebuffer {
    /// Allocate both attachments, failing on zero size or allocation refusal
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(EngineError::RenderTarget(format!(
                "render target must be non-empty, got {}x{}",
                width, height
            )));
        }
        let count = width
            .checked_mul(height)
            .ok_or_else(|| EngineError::RenderTarget(format!("{}x{} overflows", width, height)))?;

        let mut pixels = Vec::new();
        let mut zbuffer = Vec::new();
        pixels
            .try_reserve_exact(count * 4)
            .map_err(|e| EngineError::RenderTarget(format!("color attachment: {}", e)))?;
        zbuffer
            .try_reserve_exact(count)
            .map_err(|e| EngineError::RenderTarget(format!("depth attachment: {}", e)))?;
        pixels.resize(count * 4, 0);
        zbuffer.resize(count, f32::MAX);

        Ok(Self { pixels, zbuffer, width, height })
    }

    pub fn clear(&mut self, color: Color) {
        let bytes = color.to_bytes();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
        self.zbuffer.fill(f32::MAX);
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Color {
        if x < self.width && y < self.height {
            let idx = (y * self.width + x) * 4;
            let p = &self.pixels[idx..idx + 4];
            Color::with_alpha(p[0], p[1], p[2], p[3])
        } else {
            Color::BLACK
        }
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        if x < self.width && y < self.height {
            let idx = (y * self.width + x) * 4;
            self.pixels[idx..idx + 4].copy_from_slice(&color.to_bytes());
        }
    }

    /// Depth test `less`; writes depth and color when the fragment passes
    pub fn set_pixel_with_depth(&mut self, x: usize, y: usize, z: f32, color: Color) -> bool {
        if x < self.width && y < self.height {
            let idx = y * self.width + x;
            if z < self.zbuffer[idx] {
                self.zbuffer[idx] = z;
                self.set_pixel(x, y, color);
                return true;
            }
        }
        false
    }

    /// Source-over blend of a float RGBA fragment
    fn blend_pixel(&mut self, x: usize, y: usize, src: Vec4) {
        let dst = self.get_pixel(x, y).to_f32();
        let a = src.w.clamp(0.0, 1.0);
        let out = Vec3::new(
            src.x * a + dst.x * (1.0 - a),
            src.y * a + dst.y * (1.0 - a),
            src.z * a + dst.z * (1.0 - a),
        );
        self.set_pixel(x, y, Color::from_f32(out, a + dst.w * (1.0 - a)));
    }

    /// Copy the color attachment into a sampleable texture
    pub fn to_texture(&self) -> Texture {
        Texture::from_rgba(self.width, self.height, &self.pixels, "offscreen")
    }

    /// Draw a line between two screen-space points (x, y in pixels, z depth)
    /// using Bresenham's algorithm, interpolating depth along the way
    pub fn draw_line(&mut self, from: Vec3, to: Vec3, color: Color, depth_test: bool) -> usize {
        let (x0, y0) = (from.x.floor() as i32, from.y.floor() as i32);
        let (x1, y1) = (to.x.floor() as i32, to.y.floor() as i32);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let steps = dx.max(-dy).max(1) as f32;
        let mut err = dx + dy;
        let mut x = x0;
        let mut y = y0;
        let mut step = 0.0;
        let mut written = 0;

        loop {
            if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
                let z = from.z + (to.z - from.z) * (step / steps);
                let ok = if depth_test {
                    self.set_pixel_with_depth(x as usize, y as usize, z, color)
                } else {
                    self.set_pixel(x as usize, y as usize, color);
                    true
                };
                if ok {
                    written += 1;
                }
            }

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
            step += 1.0;
        }
        written
    }
}

/// Per-draw fragment state (the uniforms the fragment stage reads)
#[derive(Debug, Clone, Copy)]
pub struct FragmentParams<'a> {
    /// `None` samples as white
    pub texture: Option<&'a Texture>,
    pub tile_factor: Vec2,
    pub fill_color: Vec3,
    pub alpha: f32,
    pub mapping: TexMapping,
    pub depth_test: bool,
}

/// Rasterize a single triangle, sampling at pixel centers
///
/// Returns the number of fragments written.
pub fn rasterize_triangle(fb: &mut Framebuffer, tri: &[ScreenVertex; 3], params: &FragmentParams) -> usize {
    let [a, b, c] = tri;

    // Bounding box
    let min_x = a.pos.x.min(b.pos.x).min(c.pos.x).floor().max(0.0) as usize;
    let max_x = a.pos.x.max(b.pos.x).max(c.pos.x).ceil().min(fb.width as f32).max(0.0) as usize;
    let min_y = a.pos.y.min(b.pos.y).min(c.pos.y).floor().max(0.0) as usize;
    let max_y = a.pos.y.max(b.pos.y).max(c.pos.y).ceil().min(fb.height as f32).max(0.0) as usize;

    let mut written = 0;

    for y in min_y..max_y {
        for x in min_x..max_x {
            let p = Vec3::new(x as f32 + 0.5, y as f32 + 0.5, 0.0);
            let bc = barycentric(p, a.pos, b.pos, c.pos);

            // Check if inside triangle
            const ERR: f32 = -0.0001;
            if bc.x < ERR || bc.y < ERR || bc.z < ERR {
                continue;
            }

            // Interpolate depth
            let z = bc.x * a.pos.z + bc.y * b.pos.z + bc.z * c.pos.z;
            if params.depth_test && z >= fb.zbuffer[y * fb.width + x] {
                continue;
            }

            // Perspective-correct weights
            let mut pc = Vec3::new(bc.x * a.inv_w, bc.y * b.inv_w, bc.z * c.inv_w);
            let sum = pc.x + pc.y + pc.z;
            if sum.abs() > f32::EPSILON {
                pc = pc.scale(1.0 / sum);
            } else {
                pc = bc;
            }

            let w = match params.mapping {
                TexMapping::Affine => bc,
                TexMapping::Perspective => pc,
            };
            let u = w.x * a.uv.x + w.y * b.uv.x + w.z * c.uv.x;
            let v = w.x * a.uv.y + w.y * b.uv.y + w.z * c.uv.y;

            let light = a.light.scale(pc.x) + b.light.scale(pc.y) + c.light.scale(pc.z);

            let texel = match params.texture {
                Some(tex) => tex.sample(u * params.tile_factor.x, 1.0 - v * params.tile_factor.y).to_f32(),
                None => Vec4::new(1.0, 1.0, 1.0, 1.0),
            };
            let rgb = light.mul_elem(params.fill_color);
            let frag = Vec4::new(texel.x * rgb.x, texel.y * rgb.y, texel.z * rgb.z, texel.w * params.alpha);

            if params.depth_test {
                fb.zbuffer[y * fb.width + x] = z;
            }
            if frag.w < 1.0 {
                fb.blend_pixel(x, y, frag);
            } else {
                fb.set_pixel(x, y, Color::from_f32(frag.xyz(), 1.0));
            }
            written += 1;
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vert(x: f32, y: f32, z: f32, uv: Vec2) -> ScreenVertex {
        ScreenVertex { pos: Vec3::new(x, y, z), inv_w: 1.0, uv, light: Vec3::ONE }
    }

    fn params<'a>(texture: Option<&'a Texture>) -> FragmentParams<'a> {
        FragmentParams {
            texture,
            tile_factor: Vec2::ONE,
            fill_color: Vec3::ONE,
            alpha: 1.0,
            mapping: TexMapping::Perspective,
            depth_test: true,
        }
    }

    #[test]
    fn test_zero_sized_target_is_rejected() {
        assert!(matches!(Framebuffer::new(0, 10), Err(EngineError::RenderTarget(_))));
    }

    #[test]
    fn test_triangle_covers_interior() {
        let mut fb = Framebuffer::new(16, 16).unwrap();
        fb.clear(Color::BLACK);
        let tri = [
            vert(0.0, 0.0, 0.5, Vec2::default()),
            vert(16.0, 0.0, 0.5, Vec2::default()),
            vert(0.0, 16.0, 0.5, Vec2::default()),
        ];
        let n = rasterize_triangle(&mut fb, &tri, &params(None));
        assert!(n > 100);
        assert_eq!(fb.get_pixel(2, 2), Color::WHITE);
        assert_eq!(fb.get_pixel(15, 15), Color::BLACK);
    }

    #[test]
    fn test_depth_test_keeps_nearer_fragment() {
        let mut fb = Framebuffer::new(8, 8).unwrap();
        fb.clear(Color::BLACK);
        let near = [
            vert(0.0, 0.0, 0.2, Vec2::default()),
            vert(8.0, 0.0, 0.2, Vec2::default()),
            vert(0.0, 8.0, 0.2, Vec2::default()),
        ];
        let far = near.map(|mut v| {
            v.pos.z = 0.8;
            v.light = Vec3::new(1.0, 0.0, 0.0);
            v
        });
        rasterize_triangle(&mut fb, &near, &params(None));
        let n = rasterize_triangle(&mut fb, &far, &params(None));
        assert_eq!(n, 0);
        assert_eq!(fb.get_pixel(1, 1), Color::WHITE);
    }

    #[test]
    fn test_half_alpha_blends() {
        let mut fb = Framebuffer::new(4, 4).unwrap();
        fb.clear(Color::BLACK);
        let tri = [
            vert(0.0, 0.0, 0.5, Vec2::default()),
            vert(8.0, 0.0, 0.5, Vec2::default()),
            vert(0.0, 8.0, 0.5, Vec2::default()),
        ];
        let mut p = params(None);
        p.alpha = 0.5;
        rasterize_triangle(&mut fb, &tri, &p);
        let px = fb.get_pixel(0, 0);
        assert!((px.r as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_line_writes_endpoints() {
        let mut fb = Framebuffer::new(10, 10).unwrap();
        fb.clear(Color::BLACK);
        let n = fb.draw_line(Vec3::new(1.0, 1.0, 0.5), Vec3::new(8.0, 1.0, 0.5), Color::RED, true);
        assert_eq!(n, 8);
        assert_eq!(fb.get_pixel(1, 1), Color::RED);
        assert_eq!(fb.get_pixel(8, 1), Color::RED);
    }
}
