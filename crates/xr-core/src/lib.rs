//! Depth-aware XR interaction core.
//!
//! Platform-free building blocks for spatial scenes: a dwell ("long select")
//! trigger with cooldown and pulse feedback, an occlusion sampler that tests
//! virtual points against a sensed depth frame, and a rain particle field that
//! lands drops on real-world surfaces. Hosts feed in input events, camera poses
//! and depth frames, and apply the returned events and instance data to their
//! renderer.

pub mod camera;
pub mod constants;
pub mod depth;
pub mod dwell;
pub mod error;
pub mod input;
pub mod occlusion;
pub mod particles;
pub mod registry;
pub mod timer;

pub use camera::*;
pub use depth::*;
pub use dwell::*;
pub use error::*;
pub use input::*;
pub use occlusion::*;
pub use particles::*;
pub use registry::*;
pub use timer::*;
