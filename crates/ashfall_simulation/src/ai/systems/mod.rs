//! AI systems: perception, pursuit, patrol.

pub mod patrol;
pub mod perception;
pub mod pursuit;

pub use patrol::{patrol_wander, random_patrol_point};
pub use perception::{apply_pending_alerts, nearest_target, perceive_targets};
pub use pursuit::{engage_targets, pursue_targets};
