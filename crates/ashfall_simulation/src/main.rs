//! Headless симуляция ASHFALL
//!
//! Игрок с автоматом против волн спавнера и босса, без рендера.
//! Первый аргумент: seed (по умолчанию 42).

use ashfall_simulation::{
    create_headless_app, run_tick, Actor, CombatConfig, CombatInput, Faction, FireMode, Health,
    HostileSpawner, Player, RangedWeapon, ScoreBoard, SpatialQuery, SpatialSnapshot,
};
use bevy::prelude::*;

const TICKS: u32 = 60 * 60;

fn main() {
    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(42);
    println!("Starting ASHFALL headless simulation (seed: {})", seed);

    let mut app = create_headless_app(CombatConfig {
        seed,
        ..default()
    });

    let world = app.world_mut();
    let player = world
        .spawn((
            Actor::new(Faction::PLAYER),
            Player,
            Transform::default(),
            Health::new(300.0),
            RangedWeapon::new(30, FireMode::Automatic, 8.0),
        ))
        .id();

    let boss = world
        .spawn((
            Actor::new(Faction::HOSTILE),
            Transform::from_xyz(0.0, 0.0, -40.0),
            Health::new(2000.0).with_reward(500),
        ))
        .id();

    world.spawn(
        HostileSpawner::new(vec![
            Vec3::new(-20.0, 0.0, -20.0),
            Vec3::new(20.0, 0.0, -20.0),
            Vec3::new(-20.0, 0.0, 20.0),
            Vec3::new(20.0, 0.0, 20.0),
        ])
        .with_boss(boss),
    );

    for tick in 0..TICKS {
        drive_player(app.world_mut(), player);
        run_tick(&mut app);

        if tick % 600 == 0 {
            let world = app.world();
            let entity_count = world.entities().len();
            let score = world.resource::<ScoreBoard>();
            let player_health = world.get::<Health>(player).map(|health| health.display_value());
            println!(
                "Tick {}: {} entities, score {} ({} kills), player HP {:?}",
                tick,
                entity_count,
                score.score(),
                score.kills(),
                player_health
            );
        }

        if app.world().get::<Health>(player).is_none_or(|health| health.is_dead()) {
            println!("Player died at tick {}", tick);
            break;
        }
    }

    println!("Simulation complete!");
}

/// Input слой игрока: целимся в ближайшего врага и держим спуск
fn drive_player(world: &mut World, player: Entity) {
    let Some(position) = world.get::<Transform>(player).map(|transform| transform.translation) else {
        return;
    };

    let snapshot = world.resource::<SpatialSnapshot>();
    let nearest = snapshot
        .query(position, 30.0, None, Faction::HOSTILE.mask())
        .into_iter()
        .filter_map(|enemy| snapshot.position_of(enemy))
        .min_by(|a, b| a.distance_squared(position).total_cmp(&b.distance_squared(position)));

    let Some(mut input) = world.get_mut::<CombatInput>(player) else {
        return;
    };

    match nearest {
        Some(target) => {
            input.aim_direction = (target - position).try_normalize();
            input.fire_held = true;
        }
        None => {
            input.aim_direction = None;
            input.fire_held = false;
        }
    }
}
