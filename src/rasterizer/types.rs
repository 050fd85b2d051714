//! Core types for the rasterizer

use super::math::{Vec2, Vec3, Vec4};
use crate::error::{EngineError, Result};

/// RGBA color (0-255 per channel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const GREEN: Color = Color { r: 0, g: 255, b: 0, a: 255 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255, a: 255 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Quantize a 0.0-1.0 float color, clamping out-of-range channels
    pub fn from_f32(rgb: Vec3, alpha: f32) -> Self {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
        Self { r: q(rgb.x), g: q(rgb.y), b: q(rgb.z), a: q(alpha) }
    }

    /// Channels as 0.0-1.0 floats (r, g, b, a)
    pub fn to_f32(self) -> Vec4 {
        Vec4::new(
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        )
    }

    /// Convert to [u8; 4] for framebuffer
    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// How texture coordinates are interpolated across a triangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TexMapping {
    /// Screen-space linear interpolation (visible warping)
    Affine,
    /// Perspective-correct interpolation
    #[default]
    Perspective,
}

/// Vertex after projection, ready for rasterization
#[derive(Debug, Clone, Copy, Default)]
pub struct ScreenVertex {
    /// x, y in pixels (top-left origin), z = window depth in [0, 1]
    pub pos: Vec3,
    /// 1 / clip w, for perspective-correct attributes
    pub inv_w: f32,
    pub uv: Vec2,
    /// Per-vertex light color (Gouraud)
    pub light: Vec3,
}

/// Simple texture (array of colors)
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Color>,
    pub name: String,
}

impl Texture {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::WHITE; width * height],
            name: String::new(),
        }
    }

    /// Load texture from an image file (PNG, JPEG, BMP)
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| EngineError::TextureLoad {
            path: path.display().to_string(),
            source,
        })?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Self::from_image(img, name))
    }

    /// Load texture from encoded image bytes
    pub fn from_bytes(bytes: &[u8], name: String) -> Result<Self> {
        let img = image::load_from_memory(bytes).map_err(|source| EngineError::TextureLoad {
            path: name.clone(),
            source,
        })?;
        Ok(Self::from_image(img, name))
    }

    fn from_image(img: image::DynamicImage, name: String) -> Self {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let pixels: Vec<Color> = rgba
            .pixels()
            .map(|p| Color::with_alpha(p[0], p[1], p[2], p[3]))
            .collect();

        Self {
            width: width as usize,
            height: height as usize,
            pixels,
            name,
        }
    }

    /// Wrap raw RGBA bytes (rows top-first)
    pub fn from_rgba(width: usize, height: usize, bytes: &[u8], name: &str) -> Self {
        let pixels = bytes
            .chunks_exact(4)
            .map(|p| Color::with_alpha(p[0], p[1], p[2], p[3]))
            .collect();
        Self { width, height, pixels, name: name.to_string() }
    }

    /// Create a checkerboard test texture
    pub fn checkerboard(width: usize, height: usize, color1: Color, color2: Color) -> Self {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let checker = ((x / 4) + (y / 4)) % 2 == 0;
                pixels.push(if checker { color1 } else { color2 });
            }
        }
        Self { width, height, pixels, name: "checkerboard".to_string() }
    }

    /// Sample texture at UV coordinates (nearest, repeat wrapping)
    ///
    /// `v = 0` is the top row.
    pub fn sample(&self, u: f32, v: f32) -> Color {
        if self.width == 0 || self.height == 0 {
            return Color::WHITE;
        }
        let tx = ((u * self.width as f32).floor() as i64).rem_euclid(self.width as i64) as usize;
        let ty = ((v * self.height as f32).floor() as i64).rem_euclid(self.height as i64) as usize;
        self.pixels[ty * self.width + tx]
    }

    /// Get pixel at x,y coordinates
    pub fn get_pixel(&self, x: usize, y: usize) -> Color {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x]
        } else {
            Color::BLACK
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_wraps_negative_coordinates() {
        let tex = Texture::checkerboard(8, 8, Color::WHITE, Color::BLACK);
        assert_eq!(tex.sample(-0.01, 0.0), tex.get_pixel(7, 0));
        assert_eq!(tex.sample(1.0, 0.0), tex.get_pixel(0, 0));
    }

    #[test]
    fn test_from_f32_clamps() {
        let c = Color::from_f32(Vec3::new(2.0, -1.0, 0.5), 1.0);
        assert_eq!(c.r, 255);
        assert_eq!(c.g, 0);
        assert_eq!(c.b, 128);
        assert_eq!(c.a, 255);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        let err = Texture::from_bytes(&[1, 2, 3, 4], "junk".to_string());
        assert!(matches!(err, Err(EngineError::TextureLoad { .. })));
    }
}
