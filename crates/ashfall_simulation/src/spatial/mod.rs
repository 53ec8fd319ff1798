//! Spatial queries: radius/cone поиск и ray casts
//!
//! Ядро не владеет физикой: всё что ему нужно от мира, это `SpatialQuery`.
//! Движок может подставить свою реализацию, headless режим использует
//! `SpatialSnapshot`, пересобираемый из ECS позиций один раз в начале тика
//! (все системы тика видят согласованный мир).

use bevy::prelude::*;

use crate::combat::Dead;
use crate::components::{Actor, Faction, FactionMask, Hurtbox};

/// Допуск для inclusive проверок дистанции (метры)
pub const RANGE_EPSILON: f32 = 1e-4;

/// Допуск для inclusive проверок угла (градусы)
pub const ANGLE_EPSILON_DEGREES: f32 = 1e-3;

/// Конус фильтра: направление + половина угла раскрытия
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cone {
    pub direction: Vec3,
    pub half_angle_degrees: f32,
}

impl Cone {
    pub fn new(direction: Vec3, arc_degrees: f32) -> Self {
        Self {
            direction,
            half_angle_degrees: arc_degrees * 0.5,
        }
    }

    /// Попадает ли вектор `offset` (от вершины конуса) в конус (inclusive)
    ///
    /// Нулевой offset (кандидат в той же точке) считается внутри.
    pub fn contains(&self, offset: Vec3) -> bool {
        let Some(to_target) = offset.try_normalize() else {
            return true;
        };
        let Some(facing) = self.direction.try_normalize() else {
            return false;
        };

        let cos = facing.dot(to_target).clamp(-1.0, 1.0);
        let angle = cos.acos().to_degrees();
        angle <= self.half_angle_degrees + ANGLE_EPSILON_DEGREES
    }
}

/// Результат ray cast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub entity: Entity,
    pub point: Vec3,
    pub distance: f32,
}

/// Контракт spatial провайдера (синхронный, без side effects)
pub trait SpatialQuery {
    /// Entities в радиусе `radius` от `center` (inclusive), в конусе если задан,
    /// с фракцией из `filter`. Порядок стабильный (по Entity).
    fn query(&self, center: Vec3, radius: f32, cone: Option<Cone>, filter: FactionMask) -> Vec<Entity>;

    /// Ближайшее пересечение луча с hurtbox (кроме `ignore`)
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, ignore: Option<Entity>) -> Option<RayHit>;

    fn position_of(&self, entity: Entity) -> Option<Vec3>;

    fn faction_of(&self, entity: Entity) -> Option<Faction>;

    /// Живая ли entity (есть в мире и не Dead)
    fn is_live(&self, entity: Entity) -> bool {
        self.position_of(entity).is_some()
    }
}

/// Одна запись snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialEntry {
    pub entity: Entity,
    pub position: Vec3,
    pub faction: Faction,
    pub radius: f32,
}

/// Per-tick snapshot живых акторов (отсортирован по Entity)
#[derive(Resource, Debug, Clone, Default)]
pub struct SpatialSnapshot {
    entries: Vec<SpatialEntry>,
}

impl SpatialSnapshot {
    pub fn from_entries(mut entries: Vec<SpatialEntry>) -> Self {
        entries.sort_by_key(|entry| entry.entity);
        Self { entries }
    }

    pub fn insert(&mut self, entry: SpatialEntry) {
        match self.entries.binary_search_by_key(&entry.entity, |e| e.entity) {
            Ok(index) => self.entries[index] = entry,
            Err(index) => self.entries.insert(index, entry),
        }
    }

    pub fn entries(&self) -> &[SpatialEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, entity: Entity) -> Option<&SpatialEntry> {
        self.entries
            .binary_search_by_key(&entity, |e| e.entity)
            .ok()
            .map(|index| &self.entries[index])
    }
}

impl SpatialQuery for SpatialSnapshot {
    fn query(&self, center: Vec3, radius: f32, cone: Option<Cone>, filter: FactionMask) -> Vec<Entity> {
        self.entries
            .iter()
            .filter(|entry| filter.contains(entry.faction))
            .filter(|entry| entry.position.distance(center) <= radius + RANGE_EPSILON)
            .filter(|entry| cone.map_or(true, |cone| cone.contains(entry.position - center)))
            .map(|entry| entry.entity)
            .collect()
    }

    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, ignore: Option<Entity>) -> Option<RayHit> {
        let direction = direction.try_normalize()?;

        self.entries
            .iter()
            .filter(|entry| Some(entry.entity) != ignore)
            .filter_map(|entry| {
                ray_sphere_distance(origin, direction, entry.position, entry.radius)
                    .filter(|distance| *distance <= max_distance)
                    .map(|distance| RayHit {
                        entity: entry.entity,
                        point: origin + direction * distance,
                        distance,
                    })
            })
            // entries отсортированы → при равной дистанции побеждает меньший Entity
            .fold(None, |best: Option<RayHit>, hit| match best {
                Some(best) if best.distance <= hit.distance => Some(best),
                _ => Some(hit),
            })
    }

    fn position_of(&self, entity: Entity) -> Option<Vec3> {
        self.entry(entity).map(|entry| entry.position)
    }

    fn faction_of(&self, entity: Entity) -> Option<Faction> {
        self.entry(entity).map(|entry| entry.faction)
    }
}

/// Дистанция вдоль нормализованного луча до первой точки сферы
///
/// Origin внутри сферы → 0.0 (попадание в упор).
pub fn ray_sphere_distance(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let m = origin - center;
    let c = m.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }

    let b = m.dot(direction);
    if b > 0.0 {
        // Сфера позади луча
        return None;
    }

    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    Some((-b - discriminant.sqrt()).max(0.0))
}

/// System: пересобрать snapshot из живых акторов (первая фаза тика)
pub fn rebuild_spatial_snapshot(
    mut snapshot: ResMut<SpatialSnapshot>,
    actors: Query<(Entity, &Actor, &Transform, &Hurtbox), Without<Dead>>,
) {
    snapshot.entries.clear();
    snapshot.entries.extend(actors.iter().map(|(entity, actor, transform, hurtbox)| SpatialEntry {
        entity,
        position: transform.translation,
        faction: actor.faction,
        radius: hurtbox.radius,
    }));
    snapshot.entries.sort_by_key(|entry| entry.entity);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(index: u32, position: Vec3, faction: Faction) -> SpatialEntry {
        SpatialEntry {
            entity: Entity::from_raw(index),
            position,
            faction,
            radius: 0.5,
        }
    }

    fn sample_snapshot() -> SpatialSnapshot {
        SpatialSnapshot::from_entries(vec![
            entry(3, Vec3::new(0.0, 0.0, -5.0), Faction::PLAYER),
            entry(1, Vec3::new(0.0, 0.0, -2.0), Faction::HOSTILE),
            entry(2, Vec3::new(4.0, 0.0, 0.0), Faction::HOSTILE),
        ])
    }

    #[test]
    fn test_query_radius_inclusive_and_filtered() {
        let snapshot = sample_snapshot();

        let hostiles = snapshot.query(Vec3::ZERO, 4.0, None, FactionMask::of(Faction::HOSTILE));
        assert_eq!(hostiles, vec![Entity::from_raw(1), Entity::from_raw(2)]);

        let players = snapshot.query(Vec3::ZERO, 4.99, None, FactionMask::of(Faction::PLAYER));
        assert!(players.is_empty());
    }

    #[test]
    fn test_query_cone() {
        let snapshot = sample_snapshot();
        let cone = Cone::new(Vec3::NEG_Z, 90.0);

        let found = snapshot.query(Vec3::ZERO, 10.0, Some(cone), FactionMask::ALL);
        // Entity 2 сбоку (90° от facing): вне половины конуса 45°
        assert_eq!(found, vec![Entity::from_raw(1), Entity::from_raw(3)]);
    }

    #[test]
    fn test_cone_boundary_inclusive() {
        let cone = Cone::new(Vec3::NEG_Z, 90.0);
        let edge = Quat::from_rotation_y(45f32.to_radians()) * Vec3::NEG_Z;
        let outside = Quat::from_rotation_y(46f32.to_radians()) * Vec3::NEG_Z;

        assert!(cone.contains(edge));
        assert!(!cone.contains(outside));
        assert!(cone.contains(Vec3::ZERO));
    }

    #[test]
    fn test_raycast_nearest_and_ignore() {
        let snapshot = sample_snapshot();

        let hit = snapshot
            .raycast(Vec3::ZERO, Vec3::NEG_Z, 50.0, None)
            .expect("ray should hit entity 1");
        assert_eq!(hit.entity, Entity::from_raw(1));
        assert!((hit.distance - 1.5).abs() < 1e-4);

        let hit = snapshot
            .raycast(Vec3::ZERO, Vec3::NEG_Z, 50.0, Some(Entity::from_raw(1)))
            .expect("ray should hit entity 3");
        assert_eq!(hit.entity, Entity::from_raw(3));

        assert!(snapshot.raycast(Vec3::ZERO, Vec3::NEG_Z, 1.0, None).is_none());
        assert!(snapshot.raycast(Vec3::ZERO, Vec3::Z, 50.0, None).is_none());
    }

    #[test]
    fn test_rebuild_skips_dead() {
        let mut app = App::new();
        app.init_resource::<SpatialSnapshot>();
        app.add_systems(Update, rebuild_spatial_snapshot);

        let alive = app.world_mut().spawn(Actor::new(Faction::HOSTILE)).id();
        app.world_mut().spawn((Actor::new(Faction::HOSTILE), Dead));

        app.update();

        let snapshot = app.world().resource::<SpatialSnapshot>();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.is_live(alive));
    }
}
