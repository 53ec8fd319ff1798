//! Chase & engagement systems (AlertChase → NavAgent + CombatInput).

use bevy::prelude::*;

use crate::ai::components::PerceptionState;
use crate::combat::{Dead, MeleeEngagement, RangedWeapon};
use crate::components::{face_towards, CombatInput, NavAgent};
use crate::config::ConfigError;
use crate::diagnostics::CombatDiagnostics;
use crate::spatial::{SpatialQuery, SpatialSnapshot, RANGE_EPSILON};

/// System: погоня (destination = позиция цели, пересчёт каждый тик)
///
/// Без NavAgent погоня невозможна → configuration error (один раз), тик пропускается.
pub fn pursue_targets(
    mut agents: Query<(Entity, &PerceptionState, Option<&mut NavAgent>), Without<Dead>>,
    spatial: Res<SpatialSnapshot>,
    mut diagnostics: ResMut<CombatDiagnostics>,
) {
    for (entity, state, agent) in agents.iter_mut() {
        if !state.is_chasing() {
            continue;
        }

        let Some(mut agent) = agent else {
            diagnostics.report(Some(entity), ConfigError::MissingCollaborator("NavAgent"));
            continue;
        };

        let Some(target_position) = state
            .detected_target
            .and_then(|target| spatial.position_of(target))
        else {
            continue;
        };

        agent.set_speed(state.chase_speed);
        agent.set_destination(target_position);
    }
}

/// System: AI engagement intent
///
/// - melee: цель в range → поворот к цели + `CombatInput.melee`
/// - ranged: цель в max_range → спуск нажат/удерживается, прицел на цель
pub fn engage_targets(
    mut agents: Query<
        (
            &PerceptionState,
            &mut CombatInput,
            &mut Transform,
            Option<&MeleeEngagement>,
            Option<&RangedWeapon>,
        ),
        Without<Dead>,
    >,
    spatial: Res<SpatialSnapshot>,
) {
    for (state, mut input, mut transform, melee, weapon) in agents.iter_mut() {
        let target_position = if state.is_chasing() {
            state
                .detected_target
                .and_then(|target| spatial.position_of(target))
        } else {
            None
        };

        let Some(target_position) = target_position else {
            if weapon.is_some() {
                release_trigger(&mut input);
            }
            continue;
        };

        let to_target = target_position - transform.translation;
        let distance = to_target.length();

        if let Some(melee) = melee {
            if distance <= melee.range + RANGE_EPSILON {
                face_towards(&mut transform, to_target);
                input.melee = true;
            }
        }

        if let Some(weapon) = weapon {
            if distance <= weapon.max_range {
                face_towards(&mut transform, to_target);
                let muzzle = transform.translation + transform.rotation * weapon.muzzle_offset;
                input.aim_direction = (target_position - muzzle).try_normalize();
                input.fire_pressed = true;
                input.fire_held = true;
            } else {
                release_trigger(&mut input);
            }
        }
    }
}

fn release_trigger(input: &mut CombatInput) {
    input.fire_held = false;
    input.aim_direction = None;
}
