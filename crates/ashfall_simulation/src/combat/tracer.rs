//! Bullet tracers (визуальные и lethal projectile)
//!
//! Tracer летит по прямой start → end со скоростью `speed`, позиция считается
//! от времени запуска (lerp), а не накоплением шагов. Lethal tracer на каждом
//! шаге проверяет отрезок пути лучом и может попасть в цель, которую
//! мгновенный луч пропустил.

use bevy::prelude::*;

use crate::clock::SimClock;
use crate::combat::damage::{DamageRequest, DamageSource};
use crate::combat::weapon::FriendlyFire;
use crate::components::Faction;
use crate::spatial::{SpatialQuery, SpatialSnapshot};

/// Tracer ближе этой дистанции к концу считается долетевшим
pub const TRACER_ARRIVAL_DISTANCE: f32 = 0.1;

/// Урон, который несёт projectile tracer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LethalPayload {
    pub damage: f32,
    pub friendly_fire: FriendlyFire,
}

#[derive(Component, Debug, Clone, PartialEq)]
#[require(Transform)]
pub struct Tracer {
    pub shooter: Entity,
    pub shooter_faction: Faction,
    pub start: Vec3,
    pub end: Vec3,
    pub launched_at: f32,
    pub speed: f32,
    /// None → чисто визуальный
    pub lethal: Option<LethalPayload>,
}

impl Tracer {
    pub fn cosmetic(
        shooter: Entity,
        shooter_faction: Faction,
        start: Vec3,
        end: Vec3,
        launched_at: f32,
        speed: f32,
    ) -> (Self, Transform) {
        (
            Self {
                shooter,
                shooter_faction,
                start,
                end,
                launched_at,
                speed,
                lethal: None,
            },
            Transform::from_translation(start),
        )
    }

    pub fn lethal(
        shooter: Entity,
        shooter_faction: Faction,
        start: Vec3,
        end: Vec3,
        launched_at: f32,
        speed: f32,
        payload: LethalPayload,
    ) -> (Self, Transform) {
        let (mut tracer, transform) = Self::cosmetic(shooter, shooter_faction, start, end, launched_at, speed);
        tracer.lethal = Some(payload);
        (tracer, transform)
    }

    /// Позиция на момент `now` (не дальше end)
    pub fn position_at(&self, now: f32) -> Vec3 {
        let length = self.start.distance(self.end);
        if length <= f32::EPSILON {
            return self.end;
        }

        let traveled = ((now - self.launched_at) * self.speed).clamp(0.0, length);
        self.start.lerp(self.end, traveled / length)
    }
}

/// System: продвинуть tracers, lethal проверяют попадание на отрезке
pub fn advance_tracers(
    mut commands: Commands,
    mut tracers: Query<(Entity, &Tracer, &mut Transform)>,
    spatial: Res<SpatialSnapshot>,
    clock: Res<SimClock>,
    mut damage_requests: EventWriter<DamageRequest>,
) {
    for (entity, tracer, mut transform) in tracers.iter_mut() {
        if tracer.speed <= 0.0 {
            despawn(&mut commands, entity);
            continue;
        }

        let current = transform.translation;
        let next = tracer.position_at(clock.now);

        if let Some(payload) = tracer.lethal {
            let segment = next - current;
            let length = segment.length();

            let hit = if length > f32::EPSILON {
                spatial.raycast(current, segment, length, Some(tracer.shooter))
            } else {
                None
            };

            if let Some(hit) = hit {
                if payload
                    .friendly_fire
                    .spares(tracer.shooter_faction, spatial.faction_of(hit.entity))
                {
                    crate::logger::log(&format!("🛡️ Projectile spared {:?}", hit.entity));
                } else {
                    damage_requests.write(DamageRequest {
                        attacker: Some(tracer.shooter),
                        target: hit.entity,
                        amount: payload.damage,
                        source: DamageSource::Ranged,
                        point: hit.point,
                    });
                    crate::logger::log(&format!(
                        "💥 Projectile from {:?} hit {:?} ({} damage)",
                        tracer.shooter, hit.entity, payload.damage
                    ));
                }

                transform.translation = hit.point;
                despawn(&mut commands, entity);
                continue;
            }
        }

        transform.translation = next;

        if next.distance(tracer.end) <= TRACER_ARRIVAL_DISTANCE {
            despawn(&mut commands, entity);
        }
    }
}

fn despawn(commands: &mut Commands, entity: Entity) {
    if let Ok(mut entity_commands) = commands.get_entity(entity) {
        entity_commands.despawn();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_at_lerps_and_clamps() {
        let (tracer, _) = Tracer::cosmetic(
            Entity::from_raw(1),
            Faction::PLAYER,
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, -10.0),
            1.0,
            20.0,
        );

        assert_eq!(tracer.position_at(1.0), Vec3::ZERO);
        assert!((tracer.position_at(1.25).z + 5.0).abs() < 1e-4);
        assert_eq!(tracer.position_at(5.0), Vec3::new(0.0, 0.0, -10.0));
    }
}
