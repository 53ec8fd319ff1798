//! Simulation configuration (explicit resource, no process-wide statics)
//!
//! Хост вставляет `CombatConfig` до `SimulationPlugin` (или получает Default).
//! Невалидный конфиг не валит симуляцию: ошибка уходит в `CombatDiagnostics`,
//! а плагин откатывается на значения по умолчанию.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Глобальные параметры combat core
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Длина одного тика симуляции (секунды)
    pub tick_seconds: f32,

    /// Seed для DeterministicRng (spread, patrol points, spawn batches)
    pub seed: u64,

    /// Сколько труп остаётся в мире после смерти (секунды)
    pub corpse_linger_seconds: f32,

    /// Встроенный kinematic steering для NavAgent (headless runs без движка)
    pub headless_steering: bool,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 1.0 / 60.0,
            seed: 42,
            corpse_linger_seconds: 3.0,
            headless_steering: true,
        }
    }
}

impl CombatConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tick_seconds.is_finite() && self.tick_seconds > 0.0) {
            return Err(ConfigError::NonPositiveTick);
        }
        if !(self.corpse_linger_seconds.is_finite() && self.corpse_linger_seconds >= 0.0) {
            return Err(ConfigError::NegativeCorpseLinger);
        }
        Ok(())
    }
}

/// Configuration errors (category (c): reported once, operation aborted for the tick)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ConfigError {
    #[error("tick length must be a positive number of seconds")]
    NonPositiveTick,

    #[error("corpse linger time must not be negative")]
    NegativeCorpseLinger,

    #[error("spawner has no spawn points assigned")]
    NoSpawnPoints,

    #[error("required collaborator `{0}` is not attached")]
    MissingCollaborator(&'static str),

    #[error("weapon rate of fire must be positive")]
    NonPositiveRateOfFire,

    #[error("weapon magazine must hold at least one round")]
    EmptyMagazine,

    #[error("maximum health must be positive")]
    NonPositiveMaxHealth,
}
