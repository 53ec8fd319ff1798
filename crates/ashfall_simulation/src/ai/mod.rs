//! AI decision-making module
//!
//! Patrol ⇄ Alert-Chase FSM для hostile агентов:
//! - perception: радиусный сенсор, one-hop оповещение союзников
//! - pursuit: погоня через NavAgent, engagement через CombatInput
//! - patrol: случайное блуждание пока никого не видно

use bevy::prelude::*;

pub mod components;
pub mod systems;

// Re-export основных типов
pub use components::{AlertMode, PatrolRoute, PendingAlert, PerceptionState, PerceptionTransition};

use crate::orchestrator::CombatSet;

/// AI Plugin
///
/// Регистрирует AI системы в FixedUpdate для детерминизма.
/// Порядок выполнения:
/// 1. apply_pending_alerts (Prepare): forced alerts прошлого тика
/// 2. perceive_targets (Perception): сенсор + broadcast
/// 3. patrol_wander → pursue_targets → engage_targets (Movement)
pub struct AIPlugin;

impl Plugin for AIPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            systems::apply_pending_alerts.in_set(CombatSet::Prepare),
        );

        app.add_systems(
            FixedUpdate,
            systems::perceive_targets.in_set(CombatSet::Perception),
        );

        app.add_systems(
            FixedUpdate,
            (
                systems::patrol_wander,
                systems::pursue_targets,
                systems::engage_targets,
            )
                .chain() // Последовательное выполнение для детерминизма
                .in_set(CombatSet::Movement),
        );
    }
}
