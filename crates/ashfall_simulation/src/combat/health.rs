//! Health, score и death notification контракты

use bevy::prelude::*;
use std::sync::Arc;

use crate::config::ConfigError;

/// Здоровье entity
///
/// Инвариант: 0 ≤ current ≤ max пока жив; в момент смерти current может
/// уйти в минус (raw значение, для display клампится). Dead терминален.
/// Мутируется только через `apply_damage`.
#[derive(Component, Debug, Clone, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Health {
    pub max: f32,
    pub current: f32,
    /// Очки в ScoreBoard за убийство
    pub reward_points: u32,
    /// Что удалить при смерти (None → верхний предок, резолвится при создании)
    pub death_target: Option<Entity>,
    dead: bool,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0) // Default 100 HP
    }
}

/// Результат применения урона
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// Урон не применён (уже мёртв или amount ≤ 0)
    Ignored,
    Wounded { current: f32 },
    /// Переход в Dead (ровно один раз)
    Killed { current: f32 },
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self {
            max,
            current: max,
            reward_points: 0,
            death_target: None,
            dead: false,
        }
    }

    pub fn with_reward(mut self, points: u32) -> Self {
        self.reward_points = points;
        self
    }

    pub fn with_death_target(mut self, target: Entity) -> Self {
        self.death_target = Some(target);
        self
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn is_alive(&self) -> bool {
        !self.dead
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max.is_finite() && self.max > 0.0 {
            Ok(())
        } else {
            Err(ConfigError::NonPositiveMaxHealth)
        }
    }

    /// Вычесть урон. Смерть по raw значению `current ≤ 0`.
    pub fn apply_damage(&mut self, amount: f32) -> DamageOutcome {
        if self.dead || !(amount > 0.0) {
            return DamageOutcome::Ignored;
        }

        self.current -= amount;

        if self.current <= 0.0 {
            self.dead = true;
            DamageOutcome::Killed {
                current: self.current,
            }
        } else {
            DamageOutcome::Wounded {
                current: self.current,
            }
        }
    }

    /// Значение для UI (не ниже нуля)
    pub fn display_value(&self) -> f32 {
        self.current.max(0.0)
    }

    pub fn fraction(&self) -> f32 {
        if self.max > 0.0 {
            (self.display_value() / self.max).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Наблюдатель здоровья (health bar UI)
pub trait HealthObserver: Send + Sync {
    fn on_max_health_set(&self, max: f32);
    fn on_health_changed(&self, value: f32);
}

/// Подключённый health bar
#[derive(Component, Clone)]
pub struct HealthBar(pub Arc<dyn HealthObserver>);

/// Слушатель смерти (вызывается синхронно в момент перехода)
pub trait DeathListener: Send + Sync {
    fn on_death(&self, death_target: Entity);
}

/// Список death listeners на entity со здоровьем
#[derive(Component, Clone, Default)]
pub struct DeathListeners(pub Vec<Arc<dyn DeathListener>>);

impl DeathListeners {
    pub fn with(mut self, listener: Arc<dyn DeathListener>) -> Self {
        self.0.push(listener);
        self
    }

    pub fn notify(&self, death_target: Entity) {
        for listener in &self.0 {
            listener.on_death(death_target);
        }
    }
}

/// Score ledger (reward points за убийства)
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreBoard {
    score: u64,
    kills: u32,
}

impl ScoreBoard {
    pub fn add_score(&mut self, points: u32) {
        self.score += points as u64;
        self.kills += 1;
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn kills(&self) -> u32 {
        self.kills
    }
}
