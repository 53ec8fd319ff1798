//! AI components (perception state, alert inbox, patrol).

pub mod patrol;
pub mod perception;

// Tests (separate files with _tests suffix)
#[cfg(test)]
mod perception_tests;

pub use patrol::PatrolRoute;
pub use perception::{AlertMode, PendingAlert, PerceptionState, PerceptionTransition};
