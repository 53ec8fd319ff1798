//! ECS Components для участников боя
//!
//! - actor: Actor, Faction/FactionMask, Hurtbox, CombatInput, Player marker
//! - movement: NavAgent (контракт с pathfinding) + headless steering

pub mod actor;
pub mod movement;

pub use actor::*;
pub use movement::*;
