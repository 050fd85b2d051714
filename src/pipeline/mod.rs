//! Low-precision rendering pipeline
//!
//! Renders into a fixed-resolution offscreen target with snapped vertices
//! and per-triangle affine texture mapping, then composites to the display.

mod display;
mod render;
pub mod shader;
mod snap;

pub use display::*;
pub use render::*;
pub use shader::{ShaderKind, ShaderRegistry, UniformSink, UniformStore, UniformValue};
pub use snap::*;
