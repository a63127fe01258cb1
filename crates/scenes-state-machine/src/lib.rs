//! Per-area active-scene state machine
//!
//! One [`AreaStateMachine`] exists per area with scenes. It owns the
//! authoritative "active scene" value, consumes external activation
//! notifications, and issues activation commands through the
//! [`SceneActivator`] seam.

mod activator;
mod machine;

pub use activator::{ActivationError, SceneActivator};
pub use machine::{AreaStateMachine, SelectionError};
