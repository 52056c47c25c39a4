//! Wrapper around the rapier3d physics world.
//!
//! Bundles the rapier sets and pipeline into one struct so the rest of the
//! workspace never touches rapier internals directly. Consumers create
//! bodies through the rig/terrain/prop modules, call [`PhysicsWorld::step`]
//! once per frame, and read poses back as glam types.

use glam::{Quat, Vec3};
use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::*;

use crate::terrain::HeightfieldTile;

/// Position and orientation of a single body, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyPose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for BodyPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

#[inline]
pub(crate) fn na_vec(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

#[inline]
pub(crate) fn glam_vec(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

#[inline]
pub(crate) fn glam_quat(q: &UnitQuaternion<Real>) -> Quat {
    Quat::from_xyzw(q.i, q.j, q.k, q.w)
}

/// The rigid-body world: bodies, colliders, joints and the stepping
/// pipeline, all owned together.
pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    ccd: CCDSolver,
    query_pipeline: QueryPipeline,
    params: IntegrationParameters,
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self {
            gravity: vector![0.0, -9.82, 0.0],
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            params: IntegrationParameters::default(),
        }
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// The caller is responsible for clamping `dt`; this method runs the
    /// integrator with whatever it is given.
    pub fn step(&mut self, dt: f32) {
        self.params.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Read a body's world-space pose.
    ///
    /// Panics if the handle is stale; rig and prop handles are created
    /// once and never removed, so a stale handle is a logic error.
    pub fn body_pose(&self, handle: RigidBodyHandle) -> BodyPose {
        let body = &self.bodies[handle];
        BodyPose {
            position: glam_vec(body.translation()),
            rotation: glam_quat(body.rotation()),
        }
    }

    /// Insert one terrain heightfield tile as a fixed body.
    pub fn add_heightfield_tile(&mut self, tile: &HeightfieldTile) -> RigidBodyHandle {
        let body = RigidBodyBuilder::fixed()
            .translation(na_vec(tile.origin))
            .build();
        let handle = self.bodies.insert(body);
        self.colliders
            .insert_with_parent(tile.to_collider(), handle, &mut self.bodies);
        handle
    }

    /// Insert a rolling rock: a dynamic sphere that may pitch and yaw but
    /// not roll about z, keeping it tumbling along the lane.
    pub fn add_lane_sphere(&mut self, position: Vec3, radius: f32) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(na_vec(position))
            .enabled_rotations(true, true, false)
            .build();
        let handle = self.bodies.insert(body);
        self.colliders.insert_with_parent(
            ColliderBuilder::ball(radius).mass(1.0).build(),
            handle,
            &mut self.bodies,
        );
        handle
    }

    /// Insert a fallen log: a dynamic cylinder lying across the lane
    /// (long axis along x), restricted to pitching end-over-end.
    pub fn add_lane_log(
        &mut self,
        position: Vec3,
        half_length: f32,
        radius: f32,
    ) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(na_vec(position))
            .enabled_rotations(true, false, false)
            .build();
        let handle = self.bodies.insert(body);
        // Rapier cylinders stand on y; lay this one down across the lane.
        let collider = ColliderBuilder::cylinder(half_length, radius)
            .rotation(vector![0.0, 0.0, std::f32::consts::FRAC_PI_2])
            .mass(1.0)
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    /// Hard-reset a body onto its lane: translation.x is forced to
    /// `lane_x`, and the x components of linear velocity and accumulated
    /// user force are zeroed.
    ///
    /// This is an intentional post-step override of the integrator's
    /// output (the demo is track-like, not free-roaming), applied every
    /// frame before poses are read for visual sync.
    pub fn confine_to_lane(&mut self, handle: RigidBodyHandle, lane_x: f32) {
        let Some(body) = self.bodies.get_mut(handle) else {
            return;
        };
        let mut t = *body.translation();
        if t.x != lane_x {
            t.x = lane_x;
            body.set_translation(t, false);
        }
        let mut v = *body.linvel();
        if v.x != 0.0 {
            v.x = 0.0;
            body.set_linvel(v, false);
        }
        let f = body.user_force();
        if f.x != 0.0 {
            body.reset_forces(false);
            body.add_force(vector![0.0, f.y, f.z], false);
        }
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}
