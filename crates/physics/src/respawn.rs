//! Respawn state machine.
//!
//! Relocating the rig must not corrupt simulation state, so it happens in
//! two phases: teardown (bodies disabled, motion zeroed, repositioned) and
//! delayed reinsertion. Between the two the rig is `Respawning` and all
//! control logic is a no-op; the frame loop keeps running and must
//! tolerate the disabled rig for the whole window.
//!
//! Removing a rapier body destroys its joints, so teardown uses
//! `RigidBody::set_enabled` instead of removal. The observable effect is
//! the same and the five-bodies-four-joints invariant stays intact.

use glam::Vec3;
use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::*;

use crate::rig::{VehicleRig, WHEEL_OFFSETS};
use crate::world::{na_vec, PhysicsWorld};

/// Whether the rig is simulating or mid-respawn. The timed transition
/// back to `Active` runs inside [`VehicleRig::update`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RigState {
    Active,
    Respawning {
        /// Seconds until the bodies are reinserted.
        remaining: f32,
    },
}

impl RigState {
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, RigState::Active)
    }
}

impl VehicleRig {
    /// Tear the rig down and place it at `target` (chassis position; each
    /// wheel lands at `target` plus its fixed local offset, all with the
    /// spawn orientation). Bodies stay out of the simulation until the
    /// settle delay elapses. Also used for the initial spawn.
    pub fn spawn(&mut self, world: &mut PhysicsWorld, target: Vec3) {
        log::info!("spawning rig at {target}");
        self.forward_velocity = 0.0;
        self.set_rear_motor_speed(world, 0.0);

        let placements = [
            (self.chassis, Vec3::ZERO),
            (self.wheels[0], WHEEL_OFFSETS[0]),
            (self.wheels[1], WHEEL_OFFSETS[1]),
            (self.wheels[2], WHEEL_OFFSETS[2]),
            (self.wheels[3], WHEEL_OFFSETS[3]),
        ];
        for (handle, offset) in placements {
            let Some(body) = world.bodies.get_mut(handle) else {
                continue;
            };
            body.set_enabled(false);
            body.set_linvel(vector![0.0, 0.0, 0.0], false);
            body.set_angvel(vector![0.0, 0.0, 0.0], false);
            body.set_translation(na_vec(target + offset), false);
            body.set_rotation(UnitQuaternion::identity(), false);
        }

        self.state = RigState::Respawning {
            remaining: self.config.settle_delay,
        };
    }

    /// Count the settle delay down by `dt`; reinsert on expiry.
    pub(crate) fn tick_respawn(&mut self, world: &mut PhysicsWorld, dt: f32) {
        let RigState::Respawning { remaining } = self.state else {
            return;
        };
        let remaining = remaining - dt;
        if remaining > 0.0 {
            self.state = RigState::Respawning { remaining };
            return;
        }

        for handle in std::iter::once(self.chassis).chain(self.wheels) {
            if let Some(body) = world.bodies.get_mut(handle) {
                body.set_enabled(true);
            }
        }
        self.state = RigState::Active;
        log::debug!("rig reinserted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::{RigControls, VehicleConfig};

    const DT: f32 = 1.0 / 60.0;

    fn rig_world() -> (PhysicsWorld, VehicleRig) {
        let mut world = PhysicsWorld::new();
        let rig = VehicleRig::new(&mut world, VehicleConfig::default());
        (world, rig)
    }

    #[test]
    fn test_spawn_disables_and_zeroes_immediately() {
        let (mut world, mut rig) = rig_world();
        rig.forward_velocity = 60.0;
        rig.spawn(&mut world, Vec3::new(0.0, 10.0, 0.0));

        assert!(!rig.state.is_active());
        assert_eq!(rig.forward_velocity, 0.0);
        for handle in std::iter::once(rig.chassis).chain(rig.wheels) {
            let body = &world.bodies[handle];
            assert!(!body.is_enabled());
            assert_eq!(body.linvel().norm(), 0.0);
            assert_eq!(body.angvel().norm(), 0.0);
        }
    }

    #[test]
    fn test_bodies_land_at_target_plus_offsets() {
        let (mut world, mut rig) = rig_world();
        let target = Vec3::new(0.0, 10.0, 780.0);
        rig.spawn(&mut world, target);

        let poses = rig.poses(&world);
        assert!((poses.chassis.position - target).length() < 1e-5);
        for (i, pose) in poses.wheels.iter().enumerate() {
            let expected = target + WHEEL_OFFSETS[i];
            assert!(
                (pose.position - expected).length() < 1e-5,
                "wheel {i} at {:?}, expected {:?}",
                pose.position,
                expected
            );
        }
    }

    #[test]
    fn test_reinsertion_after_settle_delay() {
        let (mut world, mut rig) = rig_world();
        rig.spawn(&mut world, Vec3::new(0.0, 10.0, 0.0));

        // 0.1s delay at 60 fps: disabled for the first few frames.
        let mut frames_disabled = 0;
        for _ in 0..30 {
            if !rig.state.is_active() {
                frames_disabled += 1;
            }
            world.step(DT);
            rig.update(&mut world, RigControls::default(), DT);
        }
        assert!(rig.state.is_active());
        assert!(frames_disabled >= 5, "disabled {frames_disabled} frames");
        for handle in std::iter::once(rig.chassis).chain(rig.wheels) {
            assert!(world.bodies[handle].is_enabled());
        }
    }

    #[test]
    fn test_respawn_is_idempotent_in_effect() {
        let (mut world, mut rig) = rig_world();

        // Dirty the rig: spawn it, let it settle, drive the ramp up.
        rig.spawn(&mut world, Vec3::new(0.0, 10.0, 780.0));
        for _ in 0..60 {
            world.step(DT);
            rig.update(
                &mut world,
                RigControls {
                    forward: true,
                    ..Default::default()
                },
                DT,
            );
        }
        assert!(rig.forward_velocity > 0.0);

        // Respawn somewhere else; immediately after the delay elapses the
        // bodies must be exactly at the new target with zero velocity.
        let target = Vec3::new(0.0, 10.0, 0.0);
        rig.spawn(&mut world, target);
        rig.update(&mut world, RigControls::default(), 0.2);
        assert!(rig.state.is_active());

        let poses = rig.poses(&world);
        assert!((poses.chassis.position - target).length() < 1e-5);
        for (i, pose) in poses.wheels.iter().enumerate() {
            assert!((pose.position - (target + WHEEL_OFFSETS[i])).length() < 1e-5);
        }
        for handle in std::iter::once(rig.chassis).chain(rig.wheels) {
            assert_eq!(world.bodies[handle].linvel().norm(), 0.0);
        }
        assert_eq!(rig.forward_velocity, 0.0);
    }

    #[test]
    fn test_controls_ignored_while_respawning() {
        let (mut world, mut rig) = rig_world();
        rig.spawn(&mut world, Vec3::new(0.0, 10.0, 0.0));
        rig.update(
            &mut world,
            RigControls {
                forward: true,
                ..Default::default()
            },
            DT,
        );
        assert_eq!(rig.forward_velocity, 0.0);
    }
}
