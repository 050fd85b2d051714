//! Engine-wide error type
//!
//! Recoverable failures (bad input, allocation refused) and fatal ones
//! (render target creation) share one enum; callers decide what is fatal.

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input to a builder, e.g. a line strip with fewer than 2 points
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The resource table refused a buffer or texture allocation
    #[error("resource allocation failed: {0}")]
    ResourceAllocation(String),

    /// The offscreen target could not be created; rendering cannot proceed
    #[error("render target creation failed: {0}")]
    RenderTarget(String),

    #[error("failed to load texture {path}: {source}")]
    TextureLoad {
        path: String,
        #[source]
        source: image::ImageError,
    },

    /// Raw input did not map to a camera move direction
    #[error("unknown camera move direction {0}")]
    InvalidDirection(i32),

    /// A pipeline call was made outside the pass it belongs to
    #[error("render call `{call}` is not valid during the {pass} pass")]
    InvalidPass { call: &'static str, pass: &'static str },

    /// A frame-loop step was requested in the wrong phase
    #[error("frame loop step `{step}` is not valid in phase {phase}")]
    InvalidPhase { step: &'static str, phase: &'static str },

    /// A mesh referenced a buffer or texture that has been released
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
