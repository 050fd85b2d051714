//! Retro Engine: low-precision software rendering engine
//!
//! Recreates the look of late-90s console hardware:
//! - Affine texture mapping (warpy textures)
//! - Vertex snapping to the pixel grid (jittery vertices)
//! - Gouraud shading with up to 32 point lights
//! - Low internal resolution (320x180), scaled up nearest-neighbour

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod app;
pub mod config;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod pipeline;
pub mod rasterizer;
pub mod scene;

pub use app::{EngineContext, FramePhase, Game, GameRunner, HeadlessPlatform, Platform};
pub use config::{load_config, load_config_or_default, save_config, EngineConfig};
pub use error::{EngineError, Result};
pub use logging::{init_logging, LoggingConfig};
