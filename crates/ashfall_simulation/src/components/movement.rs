//! Movement компоненты: контракт с pathfinding слоем

use bevy::prelude::*;

use crate::combat::Dead;
use crate::config::CombatConfig;

/// Pathfinding агент актора
///
/// Архитектура:
/// - AI/perception пишет intent (`set_destination`, `set_speed`, `stop`)
/// - навигационный слой (движок или `steer_agents` в headless) двигает актора
///   и пишет feedback (`remaining_distance`, `velocity`)
#[derive(Component, Debug, Clone, PartialEq)]
pub struct NavAgent {
    pub destination: Option<Vec3>,
    /// Скорость движения (m/s)
    pub speed: f32,
    pub stopped: bool,
    /// Feedback: оставшаяся дистанция до destination (INFINITY пока не посчитана)
    pub remaining_distance: f32,
    /// Feedback: текущая скорость
    pub velocity: Vec3,
    /// Считаем прибывшим если remaining ≤ stopping_distance
    pub stopping_distance: f32,
}

impl Default for NavAgent {
    fn default() -> Self {
        Self {
            destination: None,
            speed: 2.0, // 2 m/s, базовая скорость ходьбы
            stopped: true,
            remaining_distance: 0.0,
            velocity: Vec3::ZERO,
            stopping_distance: 0.1,
        }
    }
}

impl NavAgent {
    pub fn with_speed(speed: f32) -> Self {
        Self {
            speed,
            ..default()
        }
    }

    pub fn set_destination(&mut self, destination: Vec3) {
        // Новый target → feedback ещё не посчитан
        if self.destination != Some(destination) {
            self.remaining_distance = f32::INFINITY;
        }
        self.destination = Some(destination);
        self.stopped = false;
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
    }

    /// Остановиться немедленно (сбросить destination и velocity)
    pub fn stop(&mut self) {
        self.destination = None;
        self.stopped = true;
        self.remaining_distance = 0.0;
        self.velocity = Vec3::ZERO;
    }

    pub fn has_arrived(&self) -> bool {
        self.destination.is_none() || self.remaining_distance <= self.stopping_distance
    }
}

/// Повернуть актора лицом по направлению (только XZ плоскость)
pub fn face_towards(transform: &mut Transform, direction: Vec3) {
    let flat = Vec3::new(direction.x, 0.0, direction.z);
    if flat.length_squared() > 1e-6 {
        transform.look_to(flat, Vec3::Y);
    }
}

/// Headless kinematic steering (когда нет движка с NavigationAgent)
///
/// Прямая линия к destination, facing по направлению движения (XZ плоскость).
pub fn steer_agents(
    mut agents: Query<(&mut NavAgent, &mut Transform), Without<Dead>>,
    config: Res<CombatConfig>,
) {
    let delta = config.tick_seconds;

    for (mut agent, mut transform) in agents.iter_mut() {
        let Some(destination) = agent.destination else {
            agent.velocity = Vec3::ZERO;
            continue;
        };

        if agent.stopped {
            agent.velocity = Vec3::ZERO;
            continue;
        }

        let to_target = destination - transform.translation;
        let distance = to_target.length();

        if distance <= agent.stopping_distance {
            agent.remaining_distance = distance;
            agent.velocity = Vec3::ZERO;
            continue;
        }

        let direction = to_target / distance;
        let step = (agent.speed * delta).min(distance);
        transform.translation += direction * step;

        face_towards(&mut transform, direction);

        agent.velocity = direction * agent.speed;
        agent.remaining_distance = distance - step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_destination_resets_feedback() {
        let mut agent = NavAgent::default();
        agent.remaining_distance = 0.0;

        agent.set_destination(Vec3::new(5.0, 0.0, 0.0));
        assert!(!agent.has_arrived());
        assert!(!agent.stopped);

        agent.stop();
        assert!(agent.has_arrived());
        assert_eq!(agent.velocity, Vec3::ZERO);
    }

    #[test]
    fn test_steer_agents_moves_toward_destination() {
        let mut app = App::new();
        app.insert_resource(CombatConfig {
            tick_seconds: 0.5,
            ..default()
        });
        app.add_systems(Update, steer_agents);

        let mut agent = NavAgent::with_speed(2.0);
        agent.set_destination(Vec3::new(0.0, 0.0, -3.0));
        let entity = app.world_mut().spawn((agent, Transform::default())).id();

        app.update();

        let transform = app.world().get::<Transform>(entity).unwrap();
        assert!((transform.translation.z + 1.0).abs() < 1e-4);

        let agent = app.world().get::<NavAgent>(entity).unwrap();
        assert!((agent.remaining_distance - 2.0).abs() < 1e-4);

        // Ещё 2 тика: прибыли, дальше не проскакиваем
        app.update();
        app.update();
        let transform = app.world().get::<Transform>(entity).unwrap();
        assert!((transform.translation.z + 3.0).abs() < 1e-4);
        assert!(app.world().get::<NavAgent>(entity).unwrap().has_arrived());
    }
}
