//! Canyonrun Renderer
//!
//! Renderer-agnostic view math: the damped chase camera and the
//! vehicle-tracking sun. The binary maps these poses onto its graphics
//! stack; this crate only speaks `glam`.

pub mod camera;

pub use camera::{CameraConfig, CameraPose, ChaseCamera, LightPose};
