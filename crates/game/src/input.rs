//! Driver input handling.
//!
//! The binary owns the raw pressed-key set; this module only sees named
//! flags derived from it. Conflicting flags are not an error; the rig
//! applies them in a fixed order, so the outcome is deterministic.

use canyonrun_physics::RigControls;
use serde::{Deserialize, Serialize};

/// Named driver intent for a single frame.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DriverInput {
    /// Accelerate (W / ArrowUp).
    pub forward: bool,

    /// Reverse (S / ArrowDown).
    pub reverse: bool,

    /// Brake (Space).
    pub brake: bool,

    /// Respawn at the start position (R).
    pub respawn: bool,
}

impl DriverInput {
    /// Reduce to the rig's control flags (respawn is handled by the
    /// simulation, not the rig).
    pub fn to_controls(&self) -> RigControls {
        RigControls {
            forward: self.forward,
            reverse: self.reverse,
            brake: self.brake,
        }
    }
}
