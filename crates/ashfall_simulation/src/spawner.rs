//! Hostile wave spawner
//!
//! Волны зависят от здоровья босса: чем меньше здоровья, тем больше врагов
//! и короче паузы. Новая волна стартует только когда все враги прошлой мертвы.
//!
//! ```text
//! Idle ──(active == 0)──→ Spawning { remaining, next_batch_at }
//!   ↑                         │ batch 1..=3 каждые spawn_interval
//!   └── Resting { until } ←───┘ после последнего batch: interval + wave_delay
//! ```

use bevy::prelude::*;
use rand::Rng;

use crate::ai::{PatrolRoute, PerceptionState};
use crate::clock::SimClock;
use crate::combat::{EntityDied, Health, MeleeEngagement, RangedWeapon};
use crate::components::{Actor, Faction, NavAgent};
use crate::config::ConfigError;
use crate::diagnostics::CombatDiagnostics;
use crate::orchestrator::CleanupSet;
use crate::DeterministicRng;

/// Параметры волны для диапазона здоровья босса
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveTier {
    /// Tier активен когда доля здоровья босса ≤ этого значения
    pub health_fraction: f32,
    pub enemies: u32,
    pub wave_delay: f32,
    pub spawn_interval: f32,
}

impl Default for WaveTier {
    fn default() -> Self {
        Self {
            health_fraction: 1.0,
            enemies: 5,
            wave_delay: 10.0,
            spawn_interval: 2.0,
        }
    }
}

/// Тиры по умолчанию: ≤25% → 10 врагов, ≤50% → 7, иначе 5
pub fn default_wave_tiers() -> Vec<WaveTier> {
    vec![
        WaveTier {
            health_fraction: 0.25,
            enemies: 10,
            wave_delay: 5.0,
            spawn_interval: 1.0,
        },
        WaveTier {
            health_fraction: 0.5,
            enemies: 7,
            wave_delay: 7.0,
            spawn_interval: 1.5,
        },
        WaveTier::default(),
    ]
}

/// Шаблон спавнимого врага
#[derive(Debug, Clone, PartialEq)]
pub struct HostileTemplate {
    pub faction: Faction,
    pub max_health: f32,
    pub reward_points: u32,
    pub perception: PerceptionState,
    pub melee: Option<MeleeEngagement>,
    pub weapon: Option<RangedWeapon>,
    pub patrol: Option<PatrolRoute>,
}

impl Default for HostileTemplate {
    fn default() -> Self {
        Self {
            faction: Faction::HOSTILE,
            max_health: 100.0,
            // Враги волн очков не дают
            reward_points: 0,
            perception: PerceptionState::default(),
            melee: Some(MeleeEngagement::new(
                2.0,
                20.0,
                1.5,
                90.0,
                Faction::PLAYER.mask(),
            )),
            weapon: None,
            patrol: Some(PatrolRoute::default()),
        }
    }
}

impl HostileTemplate {
    /// Заспавнить врага в точке
    pub fn spawn(&self, commands: &mut Commands, position: Vec3) -> Entity {
        let mut entity_commands = commands.spawn((
            Actor::new(self.faction),
            Transform::from_translation(position),
            Health::new(self.max_health).with_reward(self.reward_points),
            NavAgent::with_speed(self.perception.patrol_speed),
            self.perception.clone(),
        ));

        if let Some(melee) = &self.melee {
            entity_commands.insert(melee.clone());
        }
        if let Some(weapon) = &self.weapon {
            entity_commands.insert(weapon.clone());
        }
        if let Some(patrol) = self.patrol {
            entity_commands.insert(patrol);
        }

        entity_commands.id()
    }
}

/// Фаза спавнера
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum WavePhase {
    #[default]
    Idle,
    Spawning {
        remaining: u32,
        next_batch_at: f32,
        spawn_interval: f32,
        wave_delay: f32,
    },
    Resting {
        until: f32,
    },
}

/// Какой спавнер создал врага
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnedBy(pub Entity);

#[derive(Component, Debug, Clone)]
pub struct HostileSpawner {
    pub spawn_points: Vec<Vec3>,
    /// Босс, от здоровья которого зависят волны (None → 100%)
    pub boss: Option<Entity>,
    /// Отсортированы по health_fraction по возрастанию
    pub tiers: Vec<WaveTier>,
    pub template: HostileTemplate,
    pub batch_min: u32,
    pub batch_max: u32,
    /// Живые враги текущей волны
    pub active: u32,
    pub phase: WavePhase,
    /// Всего заспавнено за игру
    pub total_spawned: u32,
}

impl Default for HostileSpawner {
    fn default() -> Self {
        Self {
            spawn_points: Vec::new(),
            boss: None,
            tiers: default_wave_tiers(),
            template: HostileTemplate::default(),
            batch_min: 1,
            batch_max: 3,
            active: 0,
            phase: WavePhase::Idle,
            total_spawned: 0,
        }
    }
}

impl HostileSpawner {
    pub fn new(spawn_points: Vec<Vec3>) -> Self {
        Self {
            spawn_points,
            ..default()
        }
    }

    pub fn with_boss(mut self, boss: Entity) -> Self {
        self.boss = Some(boss);
        self
    }

    /// Tier для доли здоровья босса
    pub fn select_tier(&self, health_fraction: f32) -> WaveTier {
        self.tiers
            .iter()
            .find(|tier| health_fraction <= tier.health_fraction)
            .or_else(|| self.tiers.last())
            .copied()
            .unwrap_or_default()
    }

    pub fn on_enemy_died(&mut self) {
        self.active = self.active.saturating_sub(1);
    }
}

/// System: смерть заспавненного врага → active -= 1
pub fn track_spawned_deaths(
    mut deaths: EventReader<EntityDied>,
    spawned: Query<&SpawnedBy>,
    mut spawners: Query<&mut HostileSpawner>,
) {
    for death in deaths.read() {
        let owner = spawned
            .get(death.entity)
            .or_else(|_| spawned.get(death.death_target));
        let Ok(SpawnedBy(spawner_entity)) = owner else {
            continue;
        };

        if let Ok(mut spawner) = spawners.get_mut(*spawner_entity) {
            spawner.on_enemy_died();
            crate::logger::log(&format!(
                "☠️ Wave enemy {:?} defeated. Active enemies left: {}",
                death.entity, spawner.active
            ));
        }
    }
}

/// System: wave state machine
pub fn run_spawners(
    mut commands: Commands,
    mut spawners: Query<(Entity, &mut HostileSpawner)>,
    bosses: Query<&Health>,
    clock: Res<SimClock>,
    mut rng: ResMut<DeterministicRng>,
    mut diagnostics: ResMut<CombatDiagnostics>,
) {
    let mut order: Vec<Entity> = spawners.iter().map(|(entity, _)| entity).collect();
    order.sort();

    for spawner_entity in order {
        let Ok((_, mut spawner)) = spawners.get_mut(spawner_entity) else {
            continue;
        };

        if spawner.phase == WavePhase::Idle && spawner.active == 0 {
            let boss_fraction = spawner
                .boss
                .and_then(|boss| bosses.get(boss).ok())
                .map_or(1.0, |health| health.fraction());
            let tier = spawner.select_tier(boss_fraction);

            spawner.phase = WavePhase::Spawning {
                remaining: tier.enemies,
                next_batch_at: clock.now,
                spawn_interval: tier.spawn_interval,
                wave_delay: tier.wave_delay,
            };
            crate::logger::log_info(&format!(
                "🌊 Spawner {:?}: new wave of {} (boss at {:.0}%)",
                spawner_entity,
                tier.enemies,
                boss_fraction * 100.0
            ));
        }

        match spawner.phase {
            WavePhase::Idle => {}
            WavePhase::Spawning {
                remaining,
                next_batch_at,
                spawn_interval,
                wave_delay,
            } => {
                if !clock.reached(next_batch_at) {
                    continue;
                }

                if spawner.spawn_points.is_empty() {
                    diagnostics.report(Some(spawner_entity), ConfigError::NoSpawnPoints);
                    continue;
                }

                let low = spawner.batch_min.max(1);
                let high = spawner.batch_max.max(low);
                let batch = rng.rng.gen_range(low..=high).min(remaining);

                for _ in 0..batch {
                    let index = rng.rng.gen_range(0..spawner.spawn_points.len());
                    let point = spawner.spawn_points[index];
                    let enemy = spawner.template.spawn(&mut commands, point);
                    commands.entity(enemy).insert(SpawnedBy(spawner_entity));
                    spawner.active += 1;
                    spawner.total_spawned += 1;
                }

                let remaining = remaining - batch;
                spawner.phase = if remaining == 0 {
                    WavePhase::Resting {
                        until: clock.now + spawn_interval + wave_delay,
                    }
                } else {
                    WavePhase::Spawning {
                        remaining,
                        next_batch_at: clock.now + spawn_interval,
                        spawn_interval,
                        wave_delay,
                    }
                };
            }
            WavePhase::Resting { until } => {
                if clock.reached(until) {
                    spawner.phase = WavePhase::Idle;
                }
            }
        }
    }
}

/// Spawner Plugin (Cleanup фаза тика)
pub struct SpawnerPlugin;

impl Plugin for SpawnerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            (track_spawned_deaths, run_spawners)
                .chain()
                .in_set(CleanupSet::Spawn),
        );
    }
}
