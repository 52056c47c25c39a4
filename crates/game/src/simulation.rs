//! The per-frame simulation: physics world, vehicle rig, terrain and
//! props, advanced by one `tick` per rendered frame.
//!
//! Tick order is fixed: clamp the frame delta, service the respawn key,
//! step the physics world, update the rig from driver input, then apply
//! the post-step lane corrections. Poses are read back after all of that,
//! so visuals always see a lane-consistent world.

use canyonrun_physics::{
    terrain, PhysicsWorld, RigPoses, RigState, TerrainMesh, TileSpec, VehicleConfig, VehicleRig,
};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::input::DriverInput;
use crate::props::{PropConfig, PropSet, TreeInstance};

/// Everything tunable about a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Upper bound on the per-frame timestep, in seconds. Frames longer
    /// than this (tab refocus, debugger pause) simulate this much time.
    pub max_frame_delta: f32,

    /// Chassis position used for the initial spawn and every respawn.
    pub start_position: Vec3,

    pub vehicle: VehicleConfig,
    pub tiles: TileSpec,
    pub props: PropConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_frame_delta: 0.1,
            start_position: Vec3::new(0.0, 10.0, 780.0),
            vehicle: VehicleConfig::default(),
            tiles: TileSpec::default(),
            props: PropConfig::default(),
        }
    }
}

/// Owns the physics world and everything living in it.
pub struct Simulation {
    pub config: SimulationConfig,
    world: PhysicsWorld,
    rig: VehicleRig,
    terrain: Option<TerrainMesh>,
    props: PropSet,
    frame: u64,
}

impl Simulation {
    /// Build the world and the rig. The rig starts mid-respawn at the
    /// start position and becomes drivable once the settle delay elapses.
    pub fn new(config: SimulationConfig) -> Self {
        let mut world = PhysicsWorld::new();
        let mut rig = VehicleRig::new(&mut world, config.vehicle.clone());
        rig.spawn(&mut world, config.start_position);
        Self {
            config,
            world,
            rig,
            terrain: None,
            props: PropSet::new(),
            frame: 0,
        }
    }

    /// Install the terrain surface: heightfield colliders are sampled
    /// from the mesh and all props are scattered onto it.
    ///
    /// Without this the world has no ground and the rig falls freely,
    /// which is the intended degraded mode when terrain construction
    /// fails upstream.
    pub fn attach_terrain(&mut self, mesh: TerrainMesh) {
        for tile in terrain::build_tiles(&mesh, &self.config.tiles) {
            self.world.add_heightfield_tile(&tile);
        }
        let mut rng = rand::rng();
        self.props
            .scatter(&mut self.world, &mesh, &self.config.props, &mut rng);
        self.terrain = Some(mesh);
    }

    /// Advance one frame. `dt` is in seconds and is clamped before use.
    pub fn tick(&mut self, input: DriverInput, dt: f32) {
        let dt = dt.clamp(0.0, self.config.max_frame_delta);

        // Respawn only from a live rig; holding R during the settle
        // delay must not restart the countdown.
        if input.respawn && self.rig.state.is_active() {
            self.rig.spawn(&mut self.world, self.config.start_position);
        }

        self.world.step(dt);
        self.rig.update(&mut self.world, input.to_controls(), dt);
        self.rig.post_step(&mut self.world);
        self.props.post_step(&mut self.world);
        self.frame += 1;
    }

    pub fn has_terrain(&self) -> bool {
        self.terrain.is_some()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn rig_state(&self) -> RigState {
        self.rig.state
    }

    pub fn forward_velocity(&self) -> f32 {
        self.rig.forward_velocity
    }

    /// Rig body poses for visual sync.
    pub fn rig_poses(&self) -> RigPoses {
        self.rig.poses(&self.world)
    }

    /// Chassis position (camera look target).
    pub fn chassis_position(&self) -> Vec3 {
        self.rig.chassis_position(&self.world)
    }

    pub fn sphere_poses(&self) -> Vec<canyonrun_physics::BodyPose> {
        self.props.sphere_poses(&self.world)
    }

    pub fn log_poses(&self) -> Vec<canyonrun_physics::BodyPose> {
        self.props.log_poses(&self.world)
    }

    pub fn trees(&self) -> &[TreeInstance] {
        &self.props.trees
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    /// Flat plane at y = 0 covering the whole run, built inline so the
    /// tests don't depend on the binary's terrain generator.
    fn flat_mesh() -> TerrainMesh {
        let half = 900.0;
        let positions = vec![
            Vec3::new(-half, 0.0, -half),
            Vec3::new(half, 0.0, -half),
            Vec3::new(half, 0.0, half),
            Vec3::new(-half, 0.0, half),
        ];
        TerrainMesh::new(&positions, &[[0, 1, 2], [0, 2, 3]]).unwrap()
    }

    fn settled_sim() -> Simulation {
        let mut sim = Simulation::new(SimulationConfig {
            // Start low so settling onto the plane is quick.
            start_position: Vec3::new(0.0, 1.0, 780.0),
            props: PropConfig {
                sphere_count: 0,
                log_count: 0,
                trees_per_variant: 0,
                ..Default::default()
            },
            ..Default::default()
        });
        sim.attach_terrain(flat_mesh());
        // Settle delay plus a grace period on the ground.
        for _ in 0..120 {
            sim.tick(DriverInput::default(), DT);
        }
        sim
    }

    #[test]
    fn test_new_sim_starts_respawning() {
        let sim = Simulation::new(SimulationConfig::default());
        assert!(!sim.rig_state().is_active());
        assert_eq!(sim.forward_velocity(), 0.0);
    }

    #[test]
    fn test_drive_ramp_reaches_max_in_hundred_frames() {
        let mut sim = settled_sim();
        let input = DriverInput {
            forward: true,
            ..Default::default()
        };
        for _ in 0..99 {
            sim.tick(input, DT);
            assert!(sim.forward_velocity() < 100.0);
        }
        sim.tick(input, DT);
        assert_eq!(sim.forward_velocity(), 100.0);
    }

    #[test]
    fn test_driving_forward_makes_progress_down_the_run() {
        let mut sim = settled_sim();
        let z0 = sim.chassis_position().z;
        let input = DriverInput {
            forward: true,
            ..Default::default()
        };
        for _ in 0..600 {
            sim.tick(input, DT);
        }
        let pos = sim.chassis_position();
        assert_eq!(pos.x, 0.0);
        assert!(
            pos.z < z0 - 5.0,
            "no forward progress: z went {z0} -> {}",
            pos.z
        );
    }

    #[test]
    fn test_respawn_key_returns_to_start() {
        let mut sim = settled_sim();
        let input = DriverInput {
            forward: true,
            ..Default::default()
        };
        for _ in 0..300 {
            sim.tick(input, DT);
        }
        assert!(sim.chassis_position().z < 780.0 - 5.0);

        sim.tick(
            DriverInput {
                respawn: true,
                ..Default::default()
            },
            DT,
        );
        assert!(!sim.rig_state().is_active());
        let pos = sim.chassis_position();
        assert!((pos - sim.config.start_position).length() < 1e-4);
        assert_eq!(sim.forward_velocity(), 0.0);
    }

    #[test]
    fn test_respawn_key_ignored_while_respawning() {
        let mut sim = Simulation::new(SimulationConfig::default());
        let before = sim.rig_state();
        sim.tick(
            DriverInput {
                respawn: true,
                ..Default::default()
            },
            0.0,
        );
        // Countdown untouched by the redundant key press at dt = 0.
        assert_eq!(sim.rig_state(), before);
    }

    #[test]
    fn test_long_frames_are_clamped() {
        let mut sim = settled_sim();
        // One pathological 5 second frame simulates at most 0.1s; the
        // ramp still moves by exactly one step.
        sim.tick(
            DriverInput {
                forward: true,
                ..Default::default()
            },
            5.0,
        );
        assert_eq!(sim.forward_velocity(), 1.0);
        assert!(sim.chassis_position().y > -1.0);
    }

    #[test]
    fn test_props_scattered_on_attach() {
        let mut sim = Simulation::new(SimulationConfig::default());
        assert!(!sim.has_terrain());
        sim.attach_terrain(flat_mesh());
        assert!(sim.has_terrain());
        assert_eq!(sim.sphere_poses().len(), 25);
        assert_eq!(sim.log_poses().len(), 25);
        assert_eq!(sim.trees().len(), 150);
    }

    #[test]
    fn test_vehicle_stays_upright_on_flat_ground() {
        let mut sim = settled_sim();
        let input = DriverInput {
            forward: true,
            ..Default::default()
        };
        for _ in 0..600 {
            sim.tick(input, DT);
            let pos = sim.chassis_position();
            assert!(pos.y > -1.0, "chassis fell through terrain: y={}", pos.y);
        }
    }
}
