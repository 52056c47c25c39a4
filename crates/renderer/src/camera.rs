//! Damped chase camera.
//!
//! The camera trails a pivot rigidly attached to the chassis, moving a
//! fixed fraction of the remaining distance each frame. The pivot's
//! height is clamped to stay above the chassis, so the camera never dips
//! below the vehicle when the chassis pitches nose-down over a crest.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Camera and sun placement constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Pivot position in chassis space.
    pub pivot_offset: Vec3,

    /// The pivot is kept at least this far above the chassis.
    pub min_height_offset: f32,

    /// Follow stiffness; the camera covers `damping * dt` of the
    /// remaining distance per frame.
    pub damping: f32,

    /// Sun offset from the vehicle in x and z.
    pub light_offset: f32,

    /// Fixed sun elevation.
    pub light_height: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            pivot_offset: Vec3::new(2.5, 2.5, 2.5),
            min_height_offset: 2.5,
            damping: 3.0,
            light_offset: 50.0,
            light_height: 50.0,
        }
    }
}

/// Where to put the camera this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
}

/// Where to put the sun this frame. The directional light tracks the
/// vehicle so the lit region never falls behind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightPose {
    pub position: Vec3,
    pub target: Vec3,
}

/// Chase camera state: just the current eye position, smoothed between
/// frames.
pub struct ChaseCamera {
    pub config: CameraConfig,
    position: Vec3,
    /// Last clamped pivot; the sun hangs off this, not the chassis.
    anchor: Vec3,
}

impl ChaseCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            position: Vec3::ZERO,
            anchor: Vec3::ZERO,
        }
    }

    /// The point the camera moves toward: the chassis-space pivot carried
    /// into world space, height-clamped against the chassis.
    pub fn desired_position(&self, chassis_pos: Vec3, chassis_rot: Quat) -> Vec3 {
        let mut pivot = chassis_pos + chassis_rot * self.config.pivot_offset;
        let floor = chassis_pos.y + self.config.min_height_offset;
        if pivot.y < floor {
            pivot.y = floor;
        }
        pivot
    }

    /// Advance the smoothed eye position and return this frame's pose.
    pub fn update(&mut self, chassis_pos: Vec3, chassis_rot: Quat, dt: f32) -> CameraPose {
        let desired = self.desired_position(chassis_pos, chassis_rot);
        self.anchor = desired;
        let t = (self.config.damping * dt).clamp(0.0, 1.0);
        self.position = self.position.lerp(desired, t);
        CameraPose {
            position: self.position,
            target: chassis_pos,
        }
    }

    /// Snap the eye to its desired position, skipping the damping. Used
    /// on the first frame so the camera doesn't fly in from the origin.
    pub fn snap_to(&mut self, chassis_pos: Vec3, chassis_rot: Quat) {
        let desired = self.desired_position(chassis_pos, chassis_rot);
        self.anchor = desired;
        self.position = desired;
    }

    /// Sun placement for this frame, hanging off the clamped pivot anchor
    /// at a fixed offset and elevation, aimed at the vehicle.
    pub fn light_pose(&self, chassis_pos: Vec3) -> LightPose {
        LightPose {
            position: Vec3::new(
                self.anchor.x + self.config.light_offset,
                self.config.light_height,
                self.anchor.z + self.config.light_offset,
            ),
            target: chassis_pos,
        }
    }
}
