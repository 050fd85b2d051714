//! Presentation targets for finished frames

use crate::error::Result;
use crate::rasterizer::{Color, Framebuffer};

/// Where the offscreen target ends up each frame
pub trait DisplaySurface {
    /// Window size in pixels
    fn size(&self) -> (usize, usize);

    /// Window-sized default target the pipeline composites the screen quad
    /// into, for displays that present in software
    fn canvas(&mut self) -> Option<&mut Framebuffer> {
        None
    }

    /// Hand the finished offscreen frame to the platform
    fn present(&mut self, frame: &Framebuffer);
}

/// CPU-side window surface; the pipeline blits into its canvas
pub struct SoftwareDisplay {
    canvas: Framebuffer,
    frames_presented: u64,
}

impl SoftwareDisplay {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        let mut canvas = Framebuffer::new(width, height)?;
        canvas.clear(Color::WHITE);
        Ok(Self { canvas, frames_presented: 0 })
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.canvas
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}

impl DisplaySurface for SoftwareDisplay {
    fn size(&self) -> (usize, usize) {
        (self.canvas.width, self.canvas.height)
    }

    fn canvas(&mut self) -> Option<&mut Framebuffer> {
        Some(&mut self.canvas)
    }

    fn present(&mut self, _frame: &Framebuffer) {
        self.frames_presented += 1;
    }
}
