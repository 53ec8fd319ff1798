//! Patrol wandering system.

use bevy::prelude::*;
use rand::Rng;

use crate::ai::components::{PatrolRoute, PerceptionState};
use crate::clock::SimClock;
use crate::combat::Dead;
use crate::components::NavAgent;
use crate::DeterministicRng;

/// Случайная точка в круге радиуса `radius` (горизонтальная плоскость)
pub fn random_patrol_point(origin: Vec3, radius: f32, rng: &mut impl Rng) -> Vec3 {
    let angle = rng.gen::<f32>() * std::f32::consts::TAU;
    // sqrt → равномерно по площади круга
    let distance = radius.max(0.0) * rng.gen::<f32>().sqrt();
    origin + Vec3::new(angle.cos() * distance, 0.0, angle.sin() * distance)
}

/// System: блуждание в Patrol режиме
///
/// Прибыл → ждём wait_time → новая случайная точка. RNG расходуется в порядке
/// Entity, поэтому прогон с тем же seed повторяется.
pub fn patrol_wander(
    mut agents: Query<(Entity, &PerceptionState, &mut PatrolRoute, &mut NavAgent, &Transform), Without<Dead>>,
    clock: Res<SimClock>,
    mut rng: ResMut<DeterministicRng>,
) {
    let mut order: Vec<Entity> = agents.iter().map(|(entity, ..)| entity).collect();
    order.sort();

    for entity in order {
        let Ok((_, state, mut route, mut agent, transform)) = agents.get_mut(entity) else {
            continue;
        };

        if state.is_chasing() {
            route.waiting_until = None;
            continue;
        }

        if !agent.has_arrived() {
            continue;
        }

        match route.waiting_until {
            None => {
                route.waiting_until = Some(clock.now + route.wait_time.max(0.0));
            }
            Some(until) if clock.reached(until) => {
                let destination = random_patrol_point(transform.translation, route.radius, &mut rng.rng);
                agent.set_speed(state.patrol_speed);
                agent.set_destination(destination);
                route.waiting_until = None;

                crate::logger::log(&format!("🚶 {:?} patrol → {:?}", entity, destination));
            }
            Some(_) => {}
        }
    }
}
