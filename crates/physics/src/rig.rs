//! The drivable vehicle rig.
//!
//! Five bodies (one chassis and four wheels) connected by revolute
//! joints whose axes are the wheels' rolling axes, slightly canted in y
//! for stability. The rear two joints carry velocity motors; the front
//! two roll freely, so the rig turns through asymmetric ground friction
//! rather than explicit steering.
//!
//! Drive speed is rig-level state (`forward_velocity`), ramped toward the
//! driver's intent each frame and written to the rear motors as a command.
//! It is never read back from the physics engine.

use glam::{Quat, Vec3};
use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::respawn::RigState;
use crate::world::{na_vec, BodyPose, PhysicsWorld};

/// The single driving lane's x coordinate. Everything dynamic in the
/// world is pinned to it (wheels at their fixed offsets from it).
pub const LANE_X: f32 = 0.0;

/// Wheel order used everywhere in this crate.
pub const WHEEL_LF: usize = 0;
pub const WHEEL_RF: usize = 1;
pub const WHEEL_LB: usize = 2;
pub const WHEEL_RB: usize = 3;

/// Wheel attach points in chassis space. Also each wheel's lane offset.
pub const WHEEL_OFFSETS: [Vec3; 4] = [
    Vec3::new(-1.0, 0.0, -1.0), // LF
    Vec3::new(1.0, 0.0, -1.0),  // RF
    Vec3::new(-1.0, 0.0, 1.0),  // LB
    Vec3::new(1.0, 0.0, 1.0),   // RB
];

const FRONT_WHEEL_RADIUS: f32 = 0.35;
const REAR_WHEEL_RADIUS: f32 = 0.4;

/// Vertical cant of each hinge axis; left wheels tilt down, right wheels
/// up, giving the rig a slight toe that keeps it tracking straight.
const AXLE_CANT: f32 = 0.25;

/// Chassis collision primitives: (offset, radius) in chassis space.
const CHASSIS_BALLS: [(Vec3, f32); 3] = [
    (Vec3::new(0.0, 0.3, 0.2), 0.5),
    (Vec3::new(0.0, 0.1, 1.2), 0.25),
    (Vec3::new(0.0, 0.1, -1.2), 0.25),
];

/// Tunable vehicle behavior. All speed values are motor angular speed
/// targets (rad/s) unless noted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleConfig {
    /// Drive-speed change per frame while forward/reverse is held.
    pub ramp_step: f32,

    /// Drive-speed decay per frame toward zero when idle.
    pub decay_step: f32,

    /// Magnitude bound on `forward_velocity`.
    pub max_forward_velocity: f32,

    /// Damping factor handed to the rear joint velocity motors.
    pub motor_factor: f32,

    /// Seconds the rig stays disabled between respawn teardown and
    /// reinsertion. Empirical settling guard, not a physical invariant.
    pub settle_delay: f32,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            ramp_step: 1.0,
            decay_step: 0.25,
            max_forward_velocity: 100.0,
            motor_factor: 1.0,
            settle_delay: 0.1,
        }
    }
}

/// Driver intent for one frame, already reduced to named flags.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RigControls {
    pub forward: bool,
    pub reverse: bool,
    pub brake: bool,
}

/// World-space poses of all five rig bodies, for visual sync.
#[derive(Debug, Clone, Copy, Default)]
pub struct RigPoses {
    pub chassis: BodyPose,
    pub wheels: [BodyPose; 4],
}

/// One chassis + four wheels + four joints. All five bodies and four
/// joints exist together from construction on; during a respawn the
/// bodies are disabled, never destroyed.
pub struct VehicleRig {
    pub config: VehicleConfig,
    pub chassis: RigidBodyHandle,
    pub wheels: [RigidBodyHandle; 4],
    joints: [ImpulseJointHandle; 4],
    pub state: RigState,
    pub forward_velocity: f32,
    thrusting: bool,
}

impl VehicleRig {
    /// Build the rig's bodies and joints at the world origin. Call
    /// [`VehicleRig::spawn`] afterwards to place it.
    pub fn new(world: &mut PhysicsWorld, config: VehicleConfig) -> Self {
        // Chassis: pitch over terrain is allowed (rotation about the axle
        // axis), roll and yaw are locked. Deliberate stability
        // simplification, not physical realism.
        let body = RigidBodyBuilder::dynamic()
            .enabled_rotations(true, false, false)
            .linear_damping(0.01)
            .angular_damping(0.01)
            .ccd_enabled(true)
            .build();
        let chassis = world.bodies.insert(body);
        for (offset, radius) in CHASSIS_BALLS {
            let collider = ColliderBuilder::ball(radius)
                .translation(na_vec(offset))
                .mass(1.0 / 3.0)
                .build();
            world
                .colliders
                .insert_with_parent(collider, chassis, &mut world.bodies);
        }

        let mut wheels = [RigidBodyHandle::invalid(); 4];
        let mut joints = [ImpulseJointHandle::invalid(); 4];
        for (i, offset) in WHEEL_OFFSETS.iter().enumerate() {
            let radius = if i < 2 {
                FRONT_WHEEL_RADIUS
            } else {
                REAR_WHEEL_RADIUS
            };
            let body = RigidBodyBuilder::dynamic()
                .translation(na_vec(*offset))
                .linear_damping(0.01)
                .angular_damping(0.01)
                .ccd_enabled(true)
                .build();
            let wheel = world.bodies.insert(body);
            let collider = ColliderBuilder::ball(radius)
                .mass(1.0)
                .friction(1.0)
                .build();
            world
                .colliders
                .insert_with_parent(collider, wheel, &mut world.bodies);

            // Left wheels cant down, right wheels cant up.
            let cant = if offset.x < 0.0 { -AXLE_CANT } else { AXLE_CANT };
            let axis = UnitVector::new_normalize(vector![1.0, cant, 0.0]);
            let mut builder = RevoluteJointBuilder::new(axis)
                .local_anchor1(point![offset.x, offset.y, offset.z])
                .local_anchor2(point![0.0, 0.0, 0.0]);
            if i == WHEEL_LB || i == WHEEL_RB {
                builder = builder.motor_velocity(0.0, config.motor_factor);
            }
            joints[i] = world.joints.insert(chassis, wheel, builder.build(), true);
            wheels[i] = wheel;
        }

        Self {
            config,
            chassis,
            wheels,
            joints,
            state: RigState::Active,
            forward_velocity: 0.0,
            thrusting: false,
        }
    }

    /// Per-frame rig update: respawn countdown, drive-speed ramp, motor
    /// targets. Call after the physics step; motor changes take effect on
    /// the next step, like every other command.
    pub fn update(&mut self, world: &mut PhysicsWorld, controls: RigControls, dt: f32) {
        if let RigState::Respawning { .. } = self.state {
            self.tick_respawn(world, dt);
            return;
        }

        self.thrusting = false;
        let max = self.config.max_forward_velocity;
        if controls.forward {
            self.forward_velocity = (self.forward_velocity + self.config.ramp_step).min(max);
            self.thrusting = true;
        }
        if controls.reverse {
            self.forward_velocity = (self.forward_velocity - self.config.ramp_step).max(-max);
            self.thrusting = true;
        }
        if controls.brake {
            self.forward_velocity = step_toward_zero(self.forward_velocity, self.config.ramp_step);
        }
        if !self.thrusting {
            self.forward_velocity = step_toward_zero(self.forward_velocity, self.config.decay_step);
        }

        self.set_rear_motor_speed(world, self.forward_velocity);
    }

    /// Post-step correction: pin every rig body to its lane. See
    /// [`PhysicsWorld::confine_to_lane`].
    pub fn post_step(&mut self, world: &mut PhysicsWorld) {
        if !self.state.is_active() {
            return;
        }
        world.confine_to_lane(self.chassis, LANE_X);
        for (i, &wheel) in self.wheels.iter().enumerate() {
            world.confine_to_lane(wheel, WHEEL_OFFSETS[i].x);
        }
    }

    /// Read all five body poses for visual sync. Copied verbatim, no
    /// interpolation.
    pub fn poses(&self, world: &PhysicsWorld) -> RigPoses {
        RigPoses {
            chassis: world.body_pose(self.chassis),
            wheels: [
                world.body_pose(self.wheels[0]),
                world.body_pose(self.wheels[1]),
                world.body_pose(self.wheels[2]),
                world.body_pose(self.wheels[3]),
            ],
        }
    }

    pub(crate) fn set_rear_motor_speed(&mut self, world: &mut PhysicsWorld, speed: f32) {
        for &handle in &[self.joints[WHEEL_LB], self.joints[WHEEL_RB]] {
            if let Some(joint) = world.joints.get_mut(handle, true) {
                if let Some(rev) = joint.data.as_revolute_mut() {
                    rev.set_motor_velocity(speed, self.config.motor_factor);
                }
            }
        }
    }

    /// Chassis position shorthand (camera look target).
    pub fn chassis_position(&self, world: &PhysicsWorld) -> Vec3 {
        world.body_pose(self.chassis).position
    }

    /// Chassis orientation shorthand.
    pub fn chassis_rotation(&self, world: &PhysicsWorld) -> Quat {
        world.body_pose(self.chassis).rotation
    }
}

/// Move `v` one `step` toward zero without crossing it.
#[inline]
fn step_toward_zero(v: f32, step: f32) -> f32 {
    if v > 0.0 {
        (v - step).max(0.0)
    } else if v < 0.0 {
        (v + step).min(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn rig_world() -> (PhysicsWorld, VehicleRig) {
        let mut world = PhysicsWorld::new();
        let rig = VehicleRig::new(&mut world, VehicleConfig::default());
        (world, rig)
    }

    #[test]
    fn test_default_config() {
        let config = VehicleConfig::default();
        assert_eq!(config.max_forward_velocity, 100.0);
        assert!(config.decay_step < config.ramp_step);
        assert!(config.settle_delay > 0.0);
    }

    #[test]
    fn test_forward_ramp_clamps_at_max() {
        let (mut world, mut rig) = rig_world();
        let controls = RigControls {
            forward: true,
            ..Default::default()
        };
        for _ in 0..150 {
            rig.update(&mut world, controls, DT);
            assert!(rig.forward_velocity <= 100.0);
        }
        assert_eq!(rig.forward_velocity, 100.0);
    }

    #[test]
    fn test_reverse_ramp_clamps_at_negative_max() {
        let (mut world, mut rig) = rig_world();
        let controls = RigControls {
            reverse: true,
            ..Default::default()
        };
        for _ in 0..150 {
            rig.update(&mut world, controls, DT);
            assert!(rig.forward_velocity >= -100.0);
        }
        assert_eq!(rig.forward_velocity, -100.0);
    }

    #[test]
    fn test_velocity_bounded_under_arbitrary_inputs() {
        let (mut world, mut rig) = rig_world();
        for i in 0..500 {
            let controls = RigControls {
                forward: i % 3 != 0,
                reverse: i % 5 == 0,
                brake: i % 7 == 0,
            };
            rig.update(&mut world, controls, DT);
            assert!(
                rig.forward_velocity.abs() <= 100.0,
                "out of range at frame {i}: {}",
                rig.forward_velocity
            );
        }
    }

    #[test]
    fn test_idle_decay_is_monotone_and_never_flips_sign() {
        let (mut world, mut rig) = rig_world();
        rig.forward_velocity = 3.0;
        let mut prev = rig.forward_velocity;
        for _ in 0..60 {
            rig.update(&mut world, RigControls::default(), DT);
            assert!(rig.forward_velocity <= prev);
            assert!(rig.forward_velocity >= 0.0);
            prev = rig.forward_velocity;
        }
        assert_eq!(rig.forward_velocity, 0.0);
    }

    #[test]
    fn test_brake_steps_toward_zero_from_both_signs() {
        let (mut world, mut rig) = rig_world();
        let brake = RigControls {
            brake: true,
            ..Default::default()
        };

        rig.forward_velocity = 10.0;
        rig.update(&mut world, brake, DT);
        // Brake step (1.0) plus idle decay (0.25): braking while coasting
        // sheds speed faster than coasting alone.
        assert_eq!(rig.forward_velocity, 8.75);

        rig.forward_velocity = -10.0;
        rig.update(&mut world, brake, DT);
        assert_eq!(rig.forward_velocity, -8.75);
    }

    #[test]
    fn test_brake_does_not_cross_zero() {
        let (mut world, mut rig) = rig_world();
        rig.forward_velocity = 0.5;
        rig.update(
            &mut world,
            RigControls {
                brake: true,
                ..Default::default()
            },
            DT,
        );
        assert_eq!(rig.forward_velocity, 0.0);
    }

    #[test]
    fn test_conflicting_forward_reverse_is_deterministic() {
        let (mut world, mut rig) = rig_world();
        let both = RigControls {
            forward: true,
            reverse: true,
            ..Default::default()
        };
        rig.update(&mut world, both, DT);
        // Both ramps apply in check order; net zero.
        assert_eq!(rig.forward_velocity, 0.0);
    }

    #[test]
    fn test_lane_confinement_pins_wheel_offsets() {
        let (mut world, mut rig) = rig_world();
        rig.spawn(&mut world, Vec3::new(0.0, 10.0, 0.0));
        // Let the settle delay elapse, then drift the bodies sideways.
        rig.update(&mut world, RigControls::default(), 1.0);
        for &wheel in &rig.wheels {
            let body = world.bodies.get_mut(wheel).unwrap();
            let mut t = *body.translation();
            t.x += 0.7;
            body.set_translation(t, true);
        }
        rig.post_step(&mut world);

        let poses = rig.poses(&world);
        for (i, pose) in poses.wheels.iter().enumerate() {
            assert_eq!(pose.position.x, WHEEL_OFFSETS[i].x);
        }
        assert_eq!(poses.chassis.position.x, 0.0);
    }
}
