//! Damage application и death pipeline
//!
//! Melee/weapons/tracers не трогают Health напрямую: они пишут `DamageRequest`,
//! а `apply_damage` в фазе Resolution применяет всё последовательно.
//! Поэтому одновременные удары по одной цели дают ровно одну смерть.

use bevy::prelude::*;

use crate::clock::SimClock;
use crate::combat::cues::{CombatCue, CueKind};
use crate::combat::health::{DamageOutcome, DeathListeners, Health, HealthBar, ScoreBoard};
use crate::components::NavAgent;
use crate::config::CombatConfig;
use crate::diagnostics::CombatDiagnostics;

/// Источник урона
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum DamageSource {
    Melee,
    Ranged,
}

/// Запрос на урон (пишется engagement системами)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct DamageRequest {
    pub attacker: Option<Entity>,
    pub target: Entity,
    pub amount: f32,
    pub source: DamageSource,
    /// Точка попадания (для cues)
    pub point: Vec3,
}

/// Событие: урон нанесен
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct DamageDealt {
    pub attacker: Option<Entity>,
    pub target: Entity,
    pub amount: f32,
    pub source: DamageSource,
    pub target_died: bool,
}

/// Событие: entity умер (health <= 0)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct EntityDied {
    pub entity: Entity,
    pub death_target: Entity,
    pub killer: Option<Entity>,
    pub reward_points: u32,
}

/// Компонент-маркер: entity мертв
///
/// Мертвые исключаются из spatial snapshot, perception и engagement.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Dead;

/// Компонент-маркер: деспавн entity после указанного времени
#[derive(Component, Debug, Clone, Copy)]
pub struct DespawnAfter {
    /// Время деспавна (SimClock seconds)
    pub despawn_time: f32,
}

/// System: резолв death_target для новых Health (верхний предок по ChildOf)
///
/// Выполняется один раз при появлении компонента, не в момент смерти.
pub fn resolve_death_targets(
    mut healths: Query<(Entity, &mut Health), Added<Health>>,
    parents: Query<&ChildOf>,
    mut diagnostics: ResMut<CombatDiagnostics>,
) {
    for (entity, mut health) in healths.iter_mut() {
        if let Err(error) = health.validate() {
            diagnostics.report(Some(entity), error);
        }

        if health.death_target.is_none() {
            let mut root = entity;
            while let Ok(child_of) = parents.get(root) {
                root = child_of.parent();
            }
            health.death_target = Some(root);
        }
    }
}

/// System: сообщить новым health bars максимум и текущее значение
pub fn announce_health_bars(bars: Query<(&Health, &HealthBar), Added<HealthBar>>) {
    for (health, bar) in bars.iter() {
        bar.0.on_max_health_set(health.max);
        bar.0.on_health_changed(health.display_value());
    }
}

/// System: применить DamageRequest к Health
///
/// 1. Цели без Health пропускаются (нет эффекта)
/// 2. Health bar получает новое значение
/// 3. На смерти: ScoreBoard → death listeners → EntityDied → Dead + DespawnAfter
pub fn apply_damage(
    mut commands: Commands,
    mut requests: EventReader<DamageRequest>,
    mut targets: Query<(&mut Health, Option<&HealthBar>, Option<&DeathListeners>)>,
    mut agents: Query<&mut NavAgent>,
    mut score: Option<ResMut<ScoreBoard>>,
    mut damage_dealt: EventWriter<DamageDealt>,
    mut entity_died: EventWriter<EntityDied>,
    mut cues: EventWriter<CombatCue>,
    clock: Res<SimClock>,
    config: Res<CombatConfig>,
) {
    for request in requests.read() {
        let Ok((mut health, bar, listeners)) = targets.get_mut(request.target) else {
            continue;
        };

        let outcome = health.apply_damage(request.amount);
        let killed = match outcome {
            DamageOutcome::Ignored => continue,
            DamageOutcome::Wounded { .. } => false,
            DamageOutcome::Killed { .. } => true,
        };

        if let Some(bar) = bar {
            bar.0.on_health_changed(health.display_value());
        }

        cues.write(CombatCue::new(
            request.target,
            CueKind::Hit {
                point: request.point,
            },
        ));
        damage_dealt.write(DamageDealt {
            attacker: request.attacker,
            target: request.target,
            amount: request.amount,
            source: request.source,
            target_died: killed,
        });

        if !killed {
            continue;
        }

        let death_target = health.death_target.unwrap_or(request.target);

        if let Some(score) = score.as_mut() {
            score.add_score(health.reward_points);
        }
        if let Some(listeners) = listeners {
            listeners.notify(death_target);
        }

        entity_died.write(EntityDied {
            entity: request.target,
            death_target,
            killer: request.attacker,
            reward_points: health.reward_points,
        });
        cues.write(CombatCue::new(request.target, CueKind::Death));

        if let Ok(mut agent) = agents.get_mut(request.target) {
            agent.stop();
        }

        let despawn_time = clock.now + config.corpse_linger_seconds;
        if let Ok(mut entity_commands) = commands.get_entity(request.target) {
            entity_commands.try_insert(Dead);
        }
        if let Ok(mut entity_commands) = commands.get_entity(death_target) {
            entity_commands.try_insert((Dead, DespawnAfter { despawn_time }));
        }

        crate::logger::log(&format!(
            "💀 Entity {:?} killed by {:?} (+{} points)",
            request.target, request.attacker, health.reward_points
        ));
    }
}

/// System: деспавн entities с истёкшим DespawnAfter
pub fn despawn_expired(
    mut commands: Commands,
    query: Query<(Entity, &DespawnAfter)>,
    clock: Res<SimClock>,
) {
    for (entity, despawn_after) in query.iter() {
        if clock.reached(despawn_after.despawn_time) {
            crate::logger::log(&format!("⚰️ Despawning entity {:?} (timeout)", entity));
            if let Ok(mut entity_commands) = commands.get_entity(entity) {
                entity_commands.despawn();
            }
        }
    }
}
