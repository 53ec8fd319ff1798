//! Perception systems: sensor sweep, alert inbox, one-hop broadcast.

use bevy::prelude::*;

use crate::ai::components::{AlertMode, PendingAlert, PerceptionState, PerceptionTransition};
use crate::combat::{Dead, MeleeEngagement};
use crate::components::{Actor, Faction, FactionMask, NavAgent};
use crate::spatial::{SpatialQuery, SpatialSnapshot};

/// Ближайшая цель в радиусе (кроме себя), при равной дистанции меньший Entity
pub fn nearest_target(
    spatial: &dyn SpatialQuery,
    observer: Entity,
    position: Vec3,
    radius: f32,
    filter: FactionMask,
) -> Option<Entity> {
    spatial
        .query(position, radius, None, filter)
        .into_iter()
        .filter(|candidate| *candidate != observer)
        .filter_map(|candidate| {
            spatial
                .position_of(candidate)
                .map(|candidate_position| (candidate, candidate_position.distance_squared(position)))
        })
        .fold(None, |best: Option<(Entity, f32)>, (candidate, distance)| match best {
            Some((_, best_distance)) if best_distance <= distance => best,
            _ => Some((candidate, distance)),
        })
        .map(|(candidate, _)| candidate)
}

/// System: применить forced alerts из inbox (начало тика)
///
/// Союзник записал alert в прошлом тике → переходим в Alert-Chase сейчас,
/// в обход своего сенсора. Relay произойдёт в perceive_targets этого тика.
pub fn apply_pending_alerts(
    mut agents: Query<
        (
            Entity,
            &mut PerceptionState,
            &mut PendingAlert,
            Option<&mut NavAgent>,
            Option<&mut MeleeEngagement>,
        ),
        Without<Dead>,
    >,
    live: Query<(), (With<Actor>, Without<Dead>)>,
) {
    for (entity, mut state, mut pending, agent, melee) in agents.iter_mut() {
        let Some(target) = pending.0.take() else {
            continue;
        };

        // Цель умерла/исчезла пока alert ждал в inbox
        if live.get(target).is_err() {
            continue;
        }

        if !state.force_alert(target) {
            continue;
        }

        if let Some(mut agent) = agent {
            agent.set_speed(state.chase_speed);
        }
        if let Some(mut melee) = melee {
            melee.set_target(Some(target));
        }

        crate::logger::log(&format!("📢 {:?} alerted by ally → chasing {:?}", entity, target));
    }
}

/// System: sensor sweep для всех агентов (sorted по Entity для детерминизма)
///
/// 1. Ближайшая цель в detection_radius
/// 2. Переход state machine (Engaged / Retargeted / Lost)
/// 3. Engaged или свежий forced alert → broadcast союзникам в alert_radius
pub fn perceive_targets(
    mut agents: Query<(Entity, &Actor, &Transform, &mut PerceptionState), Without<Dead>>,
    mut inboxes: Query<&mut PendingAlert>,
    mut nav_agents: Query<&mut NavAgent>,
    mut melees: Query<&mut MeleeEngagement>,
    spatial: Res<SpatialSnapshot>,
) {
    let mut order: Vec<Entity> = agents.iter().map(|(entity, ..)| entity).collect();
    order.sort();

    for entity in order {
        let Ok((_, actor, transform, mut state)) = agents.get_mut(entity) else {
            continue;
        };

        let position = transform.translation;
        let faction = actor.faction;

        let sighted = nearest_target(&*spatial, entity, position, state.detection_radius, state.target_filter);
        let target_valid = state
            .detected_target
            .is_some_and(|target| spatial.is_live(target));

        let mut broadcast = None;

        match state.observe(sighted, target_valid) {
            PerceptionTransition::Engaged(target) => {
                if let Ok(mut agent) = nav_agents.get_mut(entity) {
                    agent.set_speed(state.chase_speed);
                }
                if let Ok(mut melee) = melees.get_mut(entity) {
                    melee.set_target(Some(target));
                }
                if state.relays_alerts {
                    broadcast = Some(target);
                }
                crate::logger::log(&format!("👁️ {:?} Patrol → AlertChase (target {:?})", entity, target));
            }
            PerceptionTransition::Retargeted(target) => {
                if let Ok(mut melee) = melees.get_mut(entity) {
                    melee.set_target(Some(target));
                }
            }
            PerceptionTransition::Lost => {
                if let Ok(mut agent) = nav_agents.get_mut(entity) {
                    agent.set_speed(state.patrol_speed);
                    agent.stop();
                }
                if let Ok(mut melee) = melees.get_mut(entity) {
                    melee.set_target(None);
                }
                crate::logger::log(&format!("👻 {:?} AlertChase → Patrol (target lost)", entity));
            }
            PerceptionTransition::None => {}
        }

        if state.relay_pending {
            state.relay_pending = false;
            broadcast = broadcast.or(state.detected_target);
        }

        let alert_radius = state.alert_radius;

        if let Some(target) = broadcast {
            broadcast_alert(
                &agents,
                &mut inboxes,
                &*spatial,
                entity,
                faction,
                position,
                alert_radius,
                target,
            );
        }
    }
}

/// Записать forced alert союзникам в Patrol (один hop)
#[allow(clippy::too_many_arguments)]
fn broadcast_alert(
    agents: &Query<(Entity, &Actor, &Transform, &mut PerceptionState), Without<Dead>>,
    inboxes: &mut Query<&mut PendingAlert>,
    spatial: &dyn SpatialQuery,
    broadcaster: Entity,
    faction: Faction,
    position: Vec3,
    alert_radius: f32,
    target: Entity,
) {
    for ally in spatial.query(position, alert_radius, None, faction.mask()) {
        if ally == broadcaster {
            continue;
        }

        let Ok((_, _, _, ally_state)) = agents.get(ally) else {
            continue;
        };
        if ally_state.mode != AlertMode::Patrol {
            continue;
        }

        let Ok(mut inbox) = inboxes.get_mut(ally) else {
            continue;
        };
        if inbox.0.is_none() {
            inbox.0 = Some(target);
            crate::logger::log(&format!("📣 {:?} alerts ally {:?} (target {:?})", broadcaster, ally, target));
        }
    }
}
