//! Patrol wandering component.

use bevy::prelude::*;

/// Случайное блуждание в Patrol режиме
///
/// Прибыл → ждём `wait_time` → новая точка в круге `radius` вокруг себя.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct PatrolRoute {
    pub radius: f32,
    pub wait_time: f32,
    /// Когда закончится ожидание (None → ещё не начали ждать)
    pub waiting_until: Option<f32>,
}

impl Default for PatrolRoute {
    fn default() -> Self {
        Self {
            radius: 10.0,
            wait_time: 2.0,
            waiting_until: None,
        }
    }
}

impl PatrolRoute {
    pub fn new(radius: f32, wait_time: f32) -> Self {
        Self {
            radius,
            wait_time,
            waiting_until: None,
        }
    }
}
