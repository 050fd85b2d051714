//! Scene state mutated by gameplay: object transforms, camera, lights

mod camera;
mod lighting;
mod transform;

pub use camera::*;
pub use lighting::*;
pub use transform::*;
