//! ASHFALL Simulation Core
//!
//! Combat-and-perception ядро на Bevy 0.16 ECS:
//! - кто кого заметил и как оповестил союзников (ai)
//! - melee / ranged engagement, урон, смерть, очки (combat)
//! - волны врагов от здоровья босса (spawner)
//!
//! Физика, рендер, анимации, звук и pathfinding: внешние коллабораторы:
//! ядро видит мир через `SpatialQuery`, командует движением через `NavAgent`
//! и отдаёт наружу `CombatCue` события.
//!
//! Детерминизм: фиксированный тик (`CombatConfig::tick_seconds`), `SimClock`
//! вместо wall-clock, seeded `DeterministicRng`, итерация агентов по Entity.

use bevy::ecs::event::Events;
use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod ai;
pub mod clock;
pub mod combat;
pub mod components;
pub mod config;
pub mod diagnostics;
pub mod logger;
pub mod orchestrator;
pub mod spatial;
pub mod spawner;

// Re-export базовых типов для удобства
pub use ai::{AIPlugin, AlertMode, PatrolRoute, PendingAlert, PerceptionState};
pub use clock::SimClock;
pub use combat::{
    Ballistics, CombatCue, CombatPlugin, CueKind, DamageDealt, DamageRequest, DamageSource, Dead,
    DeathListener, DeathListeners, DespawnAfter, EntityDied, FireMode, FriendlyFire, Health,
    HealthBar, HealthObserver, MeleeEngagement, RangedWeapon, ScoreBoard, TracerStyle,
    WeaponState,
};
pub use components::*;
pub use config::{CombatConfig, ConfigError};
pub use diagnostics::CombatDiagnostics;
pub use logger::{init_logger, log, log_error, log_info, log_warning, LogLevel, LogPrinter};
pub use orchestrator::{CleanupSet, CombatSet, OrchestratorPlugin};
pub use spatial::{Cone, RayHit, SpatialQuery, SpatialSnapshot};
pub use spawner::{HostileSpawner, HostileTemplate, SpawnedBy, SpawnerPlugin, WavePhase, WaveTier};

/// Главный plugin симуляции (объединяет все подсистемы)
///
/// `CombatConfig` берётся из мира если хост вставил его заранее, иначе Default.
/// Невалидный конфиг репортится в `CombatDiagnostics` и заменяется Default.
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        let mut diagnostics = CombatDiagnostics::default();

        let requested = app
            .world()
            .get_resource::<CombatConfig>()
            .cloned()
            .unwrap_or_default();
        let config = match requested.validate() {
            Ok(()) => requested,
            Err(error) => {
                diagnostics.report(None, error);
                CombatConfig::default()
            }
        };

        app
            // Fixed timestep = длина тика симуляции
            .insert_resource(Time::<Fixed>::from_seconds(config.tick_seconds as f64))
            // Детерминистичный RNG (seed из конфига)
            .insert_resource(DeterministicRng::new(config.seed))
            .insert_resource(config)
            .insert_resource(diagnostics)
            .init_resource::<SimClock>()
            .init_resource::<SpatialSnapshot>()
            .init_resource::<ScoreBoard>()
            // Подсистемы
            .add_plugins((OrchestratorPlugin, CombatPlugin, AIPlugin, SpawnerPlugin));
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(config: CombatConfig) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(config)
        .add_plugins(SimulationPlugin);

    app
}

/// Один тик симуляции (FixedUpdate напрямую, без wall-clock)
///
/// `First` здесь не запускается, поэтому буферы событий свапаются вручную:
/// событие живёт тик записи и следующий, потом отбрасывается.
pub fn run_tick(app: &mut App) {
    let world = app.world_mut();
    world.run_schedule(FixedUpdate);
    swap_event_buffers(world);
}

fn swap_event_buffers(world: &mut World) {
    update_events::<DamageRequest>(world);
    update_events::<DamageDealt>(world);
    update_events::<EntityDied>(world);
    update_events::<CombatCue>(world);
}

fn update_events<T: Event>(world: &mut World) {
    if let Some(mut events) = world.get_resource_mut::<Events<T>>() {
        events.update();
    }
}

pub fn run_ticks(app: &mut App, ticks: u32) {
    for _ in 0..ticks {
        run_tick(app);
    }
}

/// Snapshot мира для сравнения детерминизма
///
/// Порядок по Entity, компонент сериализуется через Debug.
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();
    entities.sort_by_key(|(entity, _)| *entity);

    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.to_bits().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_falls_back_to_default() {
        let app = create_headless_app(CombatConfig {
            tick_seconds: -1.0,
            ..default()
        });

        let config = app.world().resource::<CombatConfig>();
        assert_eq!(config.tick_seconds, CombatConfig::default().tick_seconds);

        let diagnostics = app.world().resource::<CombatDiagnostics>();
        assert!(diagnostics.contains(None, ConfigError::NonPositiveTick));
    }

    #[test]
    fn test_clock_advances_by_configured_step() {
        let mut app = create_headless_app(CombatConfig {
            tick_seconds: 0.25,
            ..default()
        });

        assert_eq!(app.world().resource::<SimClock>().now, 0.0);
        run_ticks(&mut app, 4);

        let clock = app.world().resource::<SimClock>();
        assert_eq!(clock.tick, 4);
        assert_eq!(clock.now, 1.0);
    }

    #[test]
    fn test_event_buffers_stay_bounded() {
        let mut app = create_headless_app(CombatConfig {
            tick_seconds: 1.0 / 64.0,
            headless_steering: false,
            ..default()
        });

        // Автомат 64 выстр/с: один Fire cue каждый тик
        let shooter = app
            .world_mut()
            .spawn((
                Actor::new(Faction::PLAYER),
                RangedWeapon::new(10_000, FireMode::Automatic, 64.0),
            ))
            .id();
        app.world_mut()
            .get_mut::<CombatInput>(shooter)
            .unwrap()
            .fire_held = true;

        run_ticks(&mut app, 64);
        let after_second = app.world().resource::<Events<CombatCue>>().len();

        run_ticks(&mut app, 640);
        let after_many = app.world().resource::<Events<CombatCue>>().len();

        let rounds = app.world().get::<RangedWeapon>(shooter).unwrap().rounds_loaded;
        assert_eq!(rounds, 10_000 - 704);
        assert!(after_second <= 2, "cues retained: {}", after_second);
        assert_eq!(after_many, after_second);
    }
}
