//! Scattered props: rolling rocks, fallen logs and decorative trees.
//!
//! Rocks and logs are dynamic bodies confined to the driving lane, so
//! they tumble downhill into the vehicle's path. Trees are visual-only
//! transforms on the canyon walls. All three use the terrain's downward
//! ray cast to find their spawn elevation, so none of them can be placed
//! until the terrain surface exists.

use canyonrun_physics::{BodyPose, PhysicsWorld, RigidBodyHandle, TerrainMesh, LANE_X};
use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Scatter counts and ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropConfig {
    /// Rock spheres dropped onto the lane.
    pub sphere_count: usize,

    /// Logs dropped onto the lane.
    pub log_count: usize,

    /// Trees per mesh variant.
    pub trees_per_variant: usize,

    /// Number of tree mesh variants.
    pub tree_variants: usize,

    /// Dynamic props scatter over z within this half-range of the origin.
    pub scatter_half_range: f32,

    /// Height above the terrain surface dynamic props spawn at.
    pub drop_height: f32,
}

impl Default for PropConfig {
    fn default() -> Self {
        Self {
            sphere_count: 25,
            log_count: 25,
            trees_per_variant: 50,
            tree_variants: 3,
            scatter_half_range: 750.0,
            drop_height: 5.0,
        }
    }
}

/// A decorative tree: no physics body, just a placed transform.
#[derive(Debug, Clone, Copy)]
pub struct TreeInstance {
    pub position: Vec3,
    pub scale: f32,
    pub variant: usize,
}

/// All scattered props. Empty until the terrain is attached.
#[derive(Default)]
pub struct PropSet {
    pub spheres: Vec<RigidBodyHandle>,
    pub logs: Vec<RigidBodyHandle>,
    pub trees: Vec<TreeInstance>,
}

impl PropSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place all props against the terrain surface.
    pub fn scatter<R: Rng>(
        &mut self,
        world: &mut PhysicsWorld,
        terrain: &TerrainMesh,
        config: &PropConfig,
        rng: &mut R,
    ) {
        for _ in 0..config.sphere_count {
            let z = rng.random_range(-config.scatter_half_range..config.scatter_half_range);
            let y = terrain.place_on_terrain(LANE_X, z, config.drop_height);
            self.spheres
                .push(world.add_lane_sphere(Vec3::new(LANE_X, y, z), 0.9));
        }

        for _ in 0..config.log_count {
            let z = rng.random_range(-config.scatter_half_range..config.scatter_half_range);
            let y = terrain.place_on_terrain(LANE_X, z, config.drop_height);
            self.logs
                .push(world.add_lane_log(Vec3::new(LANE_X, y, z), 2.0, 0.25));
        }

        for variant in 0..config.tree_variants {
            for _ in 0..config.trees_per_variant {
                // Either canyon wall, well clear of the lane.
                let side = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
                let x = (rng.random_range(0.0..1.0f32) + 0.1) * 200.0 * side;
                let z = rng.random_range(-800.0..800.0f32);
                // Sunk slightly so trunks never float on sampling error.
                let y = terrain.place_on_terrain(x, z, -0.1);
                self.trees.push(TreeInstance {
                    position: Vec3::new(x, y, z),
                    scale: 1.0 + rng.random_range(0.0..10.0),
                    variant,
                });
            }
        }

        log::info!(
            "scattered {} rocks, {} logs, {} trees",
            self.spheres.len(),
            self.logs.len(),
            self.trees.len()
        );
    }

    /// Per-frame lane confinement for the dynamic props. Rocks and logs
    /// share the vehicle's lane.
    pub fn post_step(&self, world: &mut PhysicsWorld) {
        for &handle in self.spheres.iter().chain(&self.logs) {
            world.confine_to_lane(handle, LANE_X);
        }
    }

    /// Rock poses for visual sync, in insertion order.
    pub fn sphere_poses(&self, world: &PhysicsWorld) -> Vec<BodyPose> {
        self.spheres.iter().map(|&h| world.body_pose(h)).collect()
    }

    /// Log poses for visual sync, in insertion order.
    pub fn log_poses(&self, world: &PhysicsWorld) -> Vec<BodyPose> {
        self.logs.iter().map(|&h| world.body_pose(h)).collect()
    }
}
