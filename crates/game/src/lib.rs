//! Canyonrun Game
//!
//! Gameplay layer on top of `canyonrun-physics`: driver input reduction,
//! prop scatter, and the [`Simulation`] that advances everything by one
//! tick per rendered frame. Nothing in this crate touches the renderer;
//! it hands back plain poses and transforms.

pub mod input;
pub mod props;
pub mod simulation;

pub use input::DriverInput;
pub use props::{PropConfig, PropSet, TreeInstance};
pub use simulation::{Simulation, SimulationConfig};
