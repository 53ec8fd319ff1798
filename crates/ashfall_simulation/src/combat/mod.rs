//! Combat system module
//!
//! ECS ответственность:
//! - Game state: Health, MeleeEngagement, RangedWeapon, Tracer
//! - Combat rules: range/arc тесты, cooldowns, fire modes, reload, friendly fire
//! - Events: DamageRequest → DamageDealt / EntityDied, CombatCue для презентации
//!
//! Engagement системы никогда не трогают Health напрямую: всё идёт через
//! DamageRequest и применяется в фазе Resolution.

use bevy::prelude::*;

pub mod cues;
pub mod damage;
pub mod health;
pub mod melee;
pub mod tracer;
pub mod weapon;

// Tests (separate files with _tests suffix)
#[cfg(test)]
mod weapon_tests;

pub use cues::{CombatCue, CueKind};
pub use damage::{
    DamageDealt, DamageRequest, DamageSource, Dead, DespawnAfter, EntityDied,
};
pub use health::{
    DamageOutcome, DeathListener, DeathListeners, Health, HealthBar, HealthObserver, ScoreBoard,
};
pub use melee::{MeleeEngagement, MeleeLock};
pub use tracer::{LethalPayload, Tracer};
pub use weapon::{
    Ballistics, FireMode, FriendlyFire, RangedWeapon, TracerStyle, TriggerInput, WeaponState,
    WeaponTick,
};

use crate::components::CombatInput;
use crate::orchestrator::{CleanupSet, CombatSet};

/// Combat Plugin
///
/// Порядок выполнения внутри тика:
/// 1. Prepare: резолв death targets, health bars
/// 2. Engagement: melee locks → melee → weapons → tracers → сброс edge input
/// 3. Resolution: apply_damage (death, score, listeners)
/// 4. Cleanup: деспавн трупов
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        // Регистрация событий
        app.add_event::<DamageRequest>()
            .add_event::<DamageDealt>()
            .add_event::<EntityDied>()
            .add_event::<CombatCue>();

        app.add_systems(
            FixedUpdate,
            (damage::resolve_death_targets, damage::announce_health_bars)
                .chain()
                .in_set(CombatSet::Prepare),
        );

        app.add_systems(
            FixedUpdate,
            (
                melee::update_melee_locks,
                melee::resolve_melee_attacks,
                weapon::operate_ranged_weapons,
                tracer::advance_tracers,
                consume_input_edges,
            )
                .chain()
                .in_set(CombatSet::Engagement),
        );

        app.add_systems(FixedUpdate, damage::apply_damage.in_set(CombatSet::Resolution));

        app.add_systems(FixedUpdate, damage::despawn_expired.in_set(CleanupSet::Despawn));
    }
}

/// System: сбросить edge-флаги input после engagement
pub fn consume_input_edges(mut inputs: Query<&mut CombatInput>) {
    for mut input in inputs.iter_mut() {
        if input.melee || input.fire_pressed || input.reload {
            input.consume_edges();
        }
    }
}
