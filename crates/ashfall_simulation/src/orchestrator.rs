//! Per-tick ordering всех combat подсистем
//!
//! ```text
//! Prepare:     death targets, spatial snapshot, pending alerts
//! Perception:  сенсоры, broadcast
//! Movement:    patrol, pursuit, engagement intent
//! Engagement:  melee, weapons, tracers
//! Resolution:  apply_damage (смерть, score, listeners)
//! Cleanup:     spawners → despawn → headless steering → clock
//! ```
//!
//! Rollback нет: ошибка одного шага локальна и не отменяет остальные.

use bevy::prelude::*;

use crate::clock::advance_clock;
use crate::components::steer_agents;
use crate::config::CombatConfig;
use crate::spatial::rebuild_spatial_snapshot;

#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombatSet {
    Prepare,
    Perception,
    Movement,
    Engagement,
    Resolution,
    Cleanup,
}

/// Под-фазы Cleanup (все внутри `CombatSet::Cleanup`)
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CleanupSet {
    Spawn,
    Despawn,
    Steering,
    Clock,
}

/// Регистрирует порядок фаз и системы без собственного плагина
pub struct OrchestratorPlugin;

impl Plugin for OrchestratorPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            FixedUpdate,
            (
                CombatSet::Prepare,
                CombatSet::Perception,
                CombatSet::Movement,
                CombatSet::Engagement,
                CombatSet::Resolution,
                CombatSet::Cleanup,
            )
                .chain(),
        );

        app.configure_sets(
            FixedUpdate,
            (
                CleanupSet::Spawn,
                CleanupSet::Despawn,
                CleanupSet::Steering,
                CleanupSet::Clock,
            )
                .chain()
                .in_set(CombatSet::Cleanup),
        );

        app.add_systems(FixedUpdate, rebuild_spatial_snapshot.in_set(CombatSet::Prepare));

        app.add_systems(
            FixedUpdate,
            steer_agents
                .run_if(headless_steering_enabled)
                .in_set(CleanupSet::Steering),
        );

        // Клок всегда последний: первый тик видит now == 0.0
        app.add_systems(FixedUpdate, advance_clock.in_set(CleanupSet::Clock));
    }
}

fn headless_steering_enabled(config: Res<CombatConfig>) -> bool {
    config.headless_steering
}
