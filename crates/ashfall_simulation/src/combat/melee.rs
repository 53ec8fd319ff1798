//! Melee engagement: range + arc test, cooldown gate, multi-target sweep.
//!
//! # Attack Flow
//!
//! ```text
//! CombatInput.melee (player input / AI engagement)
//!   ↓
//! attempt_attack: cooldown + lock gate
//!   ↓
//! perform_attack: spatial query (range, cone, faction filter)
//!   ↓
//! DamageRequest для каждого кандидата с Health (одновременно)
//!   ↓
//! MeleeLock::Attacking { until } → Idle
//! ```

use bevy::prelude::*;

use crate::clock::{has_elapsed, SimClock};
use crate::combat::cues::{CombatCue, CueKind};
use crate::combat::damage::{DamageRequest, DamageSource, Dead};
use crate::combat::health::Health;
use crate::components::{face_towards, CombatInput, FactionMask, NavAgent};
use crate::spatial::{Cone, SpatialQuery, SpatialSnapshot};

// ============================================================================
// Components
// ============================================================================

/// Attack lock sub-machine (Idle → Attacking(until) → Idle)
#[derive(Debug, Clone, Copy, PartialEq, Default, Reflect)]
pub enum MeleeLock {
    #[default]
    Idle,
    Attacking { until: f32 },
}

/// Melee атакующий
///
/// Инвариант: атака невозможна до `now ≥ last_attack_at + cooldown`.
/// `current_target` не владеющая ссылка, валидируется при каждом использовании.
#[derive(Component, Debug, Clone, PartialEq, Reflect)]
#[reflect(Component)]
pub struct MeleeEngagement {
    /// Дальность удара (метры, inclusive)
    pub range: f32,
    pub damage: f32,
    /// Cooldown между атаками (секунды)
    pub cooldown: f32,
    /// Полный угол дуги удара (градусы)
    pub arc_degrees: f32,
    pub target_filter: FactionMask,
    pub last_attack_at: Option<f32>,
    pub current_target: Option<Entity>,
    pub lock: MeleeLock,
    /// Во время атаки стоять на месте и поворачиваться к цели
    pub holds_position: bool,
}

impl Default for MeleeEngagement {
    fn default() -> Self {
        Self {
            range: 2.0,
            damage: 25.0,
            cooldown: 1.0,
            arc_degrees: 90.0,
            target_filter: FactionMask::ALL,
            last_attack_at: None,
            current_target: None,
            lock: MeleeLock::Idle,
            holds_position: false,
        }
    }
}

impl MeleeEngagement {
    pub fn new(range: f32, damage: f32, cooldown: f32, arc_degrees: f32, target_filter: FactionMask) -> Self {
        Self {
            range,
            damage,
            cooldown,
            arc_degrees,
            target_filter,
            ..default()
        }
    }

    /// Сменить цель (cooldown не трогаем)
    pub fn set_target(&mut self, target: Option<Entity>) {
        self.current_target = target;
    }

    pub fn cooldown_ready(&self, now: f32) -> bool {
        self.last_attack_at
            .map_or(true, |last| has_elapsed(now, last + self.cooldown))
    }

    pub fn is_attacking(&self) -> bool {
        matches!(self.lock, MeleeLock::Attacking { .. })
    }

    /// Снять истёкший lock. Возвращает true если lock был снят.
    pub fn release_lock(&mut self, now: f32) -> bool {
        match self.lock {
            MeleeLock::Attacking { until } if has_elapsed(now, until) => {
                self.lock = MeleeLock::Idle;
                true
            }
            _ => false,
        }
    }

    /// Попытка удара
    ///
    /// None → отклонено (cooldown или атака в процессе), без эффекта.
    /// Some(hits) → удар состоялся (hits может быть пустым: swing в воздух).
    pub fn attempt_attack(
        &mut self,
        attacker: Entity,
        origin: Vec3,
        facing: Vec3,
        now: f32,
        spatial: &dyn SpatialQuery,
    ) -> Option<Vec<Entity>> {
        self.release_lock(now);

        if self.is_attacking() || !self.cooldown_ready(now) {
            return None;
        }

        let hits = self.perform_attack(attacker, origin, facing, spatial);
        self.last_attack_at = Some(now);
        self.lock = MeleeLock::Attacking {
            until: now + self.cooldown,
        };

        Some(hits)
    }

    /// Sweep: все кандидаты в range и половине дуги (кроме себя)
    pub fn perform_attack(
        &self,
        attacker: Entity,
        origin: Vec3,
        facing: Vec3,
        spatial: &dyn SpatialQuery,
    ) -> Vec<Entity> {
        let cone = Cone::new(facing, self.arc_degrees);
        spatial
            .query(origin, self.range, Some(cone), self.target_filter)
            .into_iter()
            .filter(|candidate| *candidate != attacker)
            .collect()
    }
}

// ============================================================================
// Systems
// ============================================================================

/// System: снять истёкшие locks; holds_position атакующие стоят и смотрят на цель
///
/// Выполняется после pursuit, поэтому перекрывает destination этого тика.
pub fn update_melee_locks(
    mut attackers: Query<(&mut MeleeEngagement, &mut Transform, Option<&mut NavAgent>), Without<Dead>>,
    spatial: Res<SpatialSnapshot>,
    clock: Res<SimClock>,
) {
    for (mut melee, mut transform, agent) in attackers.iter_mut() {
        melee.release_lock(clock.now);

        if !(melee.holds_position && melee.is_attacking()) {
            continue;
        }

        if let Some(mut agent) = agent {
            agent.stop();
        }

        let Some(target_position) = melee.current_target.and_then(|target| spatial.position_of(target)) else {
            continue;
        };

        let to_target = target_position - transform.translation;
        face_towards(&mut transform, to_target);
    }
}

/// System: обработать melee intent
pub fn resolve_melee_attacks(
    mut attackers: Query<(Entity, &mut MeleeEngagement, &CombatInput, &Transform), Without<Dead>>,
    healths: Query<(), With<Health>>,
    spatial: Res<SpatialSnapshot>,
    clock: Res<SimClock>,
    mut damage_requests: EventWriter<DamageRequest>,
    mut cues: EventWriter<CombatCue>,
) {
    for (entity, mut melee, input, transform) in attackers.iter_mut() {
        if !input.melee {
            continue;
        }

        let origin = transform.translation;
        let facing = *transform.forward();

        let Some(hits) = melee.attempt_attack(entity, origin, facing, clock.now, &*spatial) else {
            continue;
        };

        cues.write(CombatCue::new(entity, CueKind::MeleeSwing));

        for target in hits {
            // Кандидаты без Health пропускаются
            if healths.get(target).is_err() {
                continue;
            }

            let point = spatial.position_of(target).unwrap_or(origin);
            damage_requests.write(DamageRequest {
                attacker: Some(entity),
                target,
                amount: melee.damage,
                source: DamageSource::Melee,
                point,
            });

            crate::logger::log(&format!(
                "⚔️ {:?} melee hit {:?} ({} damage)",
                entity, target, melee.damage
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Faction;
    use crate::spatial::SpatialEntry;

    fn snapshot_with(candidates: &[(u32, Vec3)]) -> SpatialSnapshot {
        SpatialSnapshot::from_entries(
            candidates
                .iter()
                .map(|(index, position)| SpatialEntry {
                    entity: Entity::from_raw(*index),
                    position: *position,
                    faction: Faction::HOSTILE,
                    radius: 0.5,
                })
                .collect(),
        )
    }

    fn at_angle(distance: f32, degrees: f32) -> Vec3 {
        Quat::from_rotation_y(degrees.to_radians()) * (Vec3::NEG_Z * distance)
    }

    #[test]
    fn test_hit_then_cooldown_rejects() {
        let attacker = Entity::from_raw(1);
        let target = Entity::from_raw(2);
        let snapshot = snapshot_with(&[(1, Vec3::ZERO), (2, at_angle(1.9, 40.0))]);
        let mut melee = MeleeEngagement::new(2.0, 10.0, 1.5, 90.0, FactionMask::ALL);

        let hits = melee.attempt_attack(attacker, Vec3::ZERO, Vec3::NEG_Z, 0.0, &snapshot);
        assert_eq!(hits, Some(vec![target]));
        assert_eq!(melee.last_attack_at, Some(0.0));

        // 0.5s спустя: cooldown не прошёл
        assert_eq!(melee.attempt_attack(attacker, Vec3::ZERO, Vec3::NEG_Z, 0.5, &snapshot), None);
        assert_eq!(melee.last_attack_at, Some(0.0));

        // Ровно на границе cooldown: разрешено
        assert!(melee.attempt_attack(attacker, Vec3::ZERO, Vec3::NEG_Z, 1.5, &snapshot).is_some());
    }

    #[test]
    fn test_range_and_arc_boundaries_inclusive() {
        let attacker = Entity::from_raw(1);
        let snapshot = snapshot_with(&[
            (1, Vec3::ZERO),
            // Ровно на границах
            (2, at_angle(2.0, 0.0)),
            (3, at_angle(1.0, 45.0)),
            (4, at_angle(1.0, -45.0)),
            // Чуть за границами
            (5, at_angle(2.01, 0.0)),
            (6, at_angle(1.0, 45.5)),
            (7, at_angle(1.0, -45.5)),
        ]);
        let melee = MeleeEngagement::new(2.0, 10.0, 1.0, 90.0, FactionMask::ALL);

        let hits = melee.perform_attack(attacker, Vec3::ZERO, Vec3::NEG_Z, &snapshot);
        assert_eq!(
            hits,
            vec![Entity::from_raw(2), Entity::from_raw(3), Entity::from_raw(4)]
        );
    }

    #[test]
    fn test_sweep_hits_all_and_skips_self() {
        let attacker = Entity::from_raw(1);
        let snapshot = snapshot_with(&[
            (1, Vec3::ZERO),
            (2, at_angle(1.0, -30.0)),
            (3, at_angle(1.5, 30.0)),
            (4, at_angle(1.0, 120.0)),
            (5, at_angle(3.0, 0.0)),
        ]);
        let melee = MeleeEngagement::new(2.0, 10.0, 1.0, 90.0, FactionMask::ALL);

        let hits = melee.perform_attack(attacker, Vec3::ZERO, Vec3::NEG_Z, &snapshot);
        assert_eq!(hits, vec![Entity::from_raw(2), Entity::from_raw(3)]);
    }

    #[test]
    fn test_set_target_keeps_cooldown() {
        let snapshot = snapshot_with(&[]);
        let mut melee = MeleeEngagement::default();
        melee.attempt_attack(Entity::from_raw(1), Vec3::ZERO, Vec3::NEG_Z, 0.0, &snapshot);

        melee.set_target(Some(Entity::from_raw(7)));
        assert!(!melee.cooldown_ready(0.5));
        assert_eq!(melee.current_target, Some(Entity::from_raw(7)));
    }

    #[test]
    fn test_lock_releases_after_cooldown() {
        let snapshot = snapshot_with(&[]);
        let mut melee = MeleeEngagement::default();
        melee.attempt_attack(Entity::from_raw(1), Vec3::ZERO, Vec3::NEG_Z, 0.0, &snapshot);

        assert!(melee.is_attacking());
        assert!(!melee.release_lock(0.5));
        assert!(melee.release_lock(1.0));
        assert_eq!(melee.lock, MeleeLock::Idle);
    }
}
