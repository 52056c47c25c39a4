//! Canyonrun Physics
//!
//! Vehicle and terrain physics built on top of the `rapier3d` rigid-body
//! engine. This crate owns everything that touches rapier directly:
//!
//! - **World**: a thin wrapper around the rapier sets and pipeline
//! - **Terrain**: downward-ray elevation sampling of a triangle mesh and
//!   its conversion into tiled heightfield colliders
//! - **Rig**: the five-body vehicle (chassis + four wheels) held together
//!   by canted revolute joints, with motorized rear wheels
//! - **Respawn**: the Active/Respawning state machine that tears the rig
//!   down and rebuilds it at a new location
//!
//! All public seams speak `glam` types; nalgebra stays internal.

pub mod respawn;
pub mod rig;
pub mod terrain;
pub mod world;

// Re-export commonly used types
pub use rapier3d::prelude::RigidBodyHandle;
pub use respawn::RigState;
pub use rig::{RigControls, RigPoses, VehicleConfig, VehicleRig, LANE_X};
pub use terrain::{HeightfieldTile, TerrainError, TerrainMesh, TileSpec, FALLBACK_ELEVATION};
pub use world::{BodyPose, PhysicsWorld};
