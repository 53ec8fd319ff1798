//! Ranged weapon: fire-mode state machine, ammo & reload, shot resolution
//!
//! Architecture:
//! - `RangedWeapon::update`: чистая state machine (Ready / Firing / Reloading),
//!   без доступа к миру, тестируется напрямую
//! - `operate_ranged_weapons`: читает CombatInput, крутит state machine и
//!   резолвит каждый pellet через SpatialQuery (hit-scan или lethal tracer)

use bevy::prelude::*;
use rand::Rng;

use crate::clock::{has_elapsed, SimClock};
use crate::combat::cues::{CombatCue, CueKind};
use crate::combat::damage::{DamageRequest, DamageSource, Dead};
use crate::combat::tracer::{LethalPayload, Tracer};
use crate::components::{Actor, CombatInput, Faction};
use crate::config::ConfigError;
use crate::diagnostics::CombatDiagnostics;
use crate::spatial::{SpatialQuery, SpatialSnapshot};
use crate::DeterministicRng;

/// Режим огня
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum FireMode {
    /// Один выстрел на нажатие
    Single,
    /// N выстрелов с интервалом 1/rate на нажатие
    Burst(u32),
    /// Выстрел каждый тик пока спуск удерживается (rate-limited)
    Automatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum WeaponState {
    #[default]
    Ready,
    /// Burst в процессе (не прерывается)
    Firing,
    /// Перезарядка (не прерывается)
    Reloading,
}

/// Визуальный tracer для hit-scan
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct TracerStyle {
    /// Скорость полёта (m/s)
    pub speed: f32,
    /// Ближе этой дистанции tracer не спавнится
    pub min_distance: f32,
}

impl Default for TracerStyle {
    fn default() -> Self {
        Self {
            speed: 100.0,
            min_distance: 1.0,
        }
    }
}

/// Как резолвится выстрел
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub enum Ballistics {
    /// Мгновенный луч; tracer чисто визуальный
    HitScan { tracer: Option<TracerStyle> },
    /// Летящий tracer сам наносит урон (может поймать движущуюся цель)
    Projectile { speed: f32 },
}

impl Default for Ballistics {
    fn default() -> Self {
        Ballistics::HitScan {
            tracer: Some(TracerStyle::default()),
        }
    }
}

/// Friendly fire policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum FriendlyFire {
    /// Урон всем
    Allow,
    /// Своя фракция не получает урон
    #[default]
    SpareAllies,
    /// Игроки не получают урон
    SparePlayers,
}

impl FriendlyFire {
    /// Должна ли цель быть пощажена
    pub fn spares(self, shooter: Faction, target: Option<Faction>) -> bool {
        match self {
            FriendlyFire::Allow => false,
            FriendlyFire::SpareAllies => target == Some(shooter),
            FriendlyFire::SparePlayers => target == Some(Faction::PLAYER),
        }
    }
}

/// Спуск на этот тик
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriggerInput {
    pub pressed: bool,
    pub held: bool,
    pub reload: bool,
}

impl From<&CombatInput> for TriggerInput {
    fn from(input: &CombatInput) -> Self {
        Self {
            pressed: input.fire_pressed,
            held: input.fire_held,
            reload: input.reload,
        }
    }
}

/// Что произошло с оружием за тик
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeaponTick {
    /// Pellets выпущено этим тиком (0 → выстрела не было)
    pub pellets_fired: u32,
    pub dry_fire: bool,
    pub reload_started: bool,
    pub reload_finished: bool,
}

impl WeaponTick {
    pub fn fired(&self) -> bool {
        self.pellets_fired > 0
    }
}

/// Огнестрельное оружие
///
/// Инвариант: rounds_loaded только уменьшается в Ready/Firing и только
/// возвращается к capacity по завершению перезарядки.
#[derive(Component, Debug, Clone, PartialEq, Reflect)]
#[reflect(Component)]
pub struct RangedWeapon {
    pub magazine_capacity: u32,
    pub rounds_loaded: u32,
    pub fire_mode: FireMode,
    /// Выстрелов в секунду
    pub rate_of_fire: f32,
    pub reload_duration: f32,
    pub spread_hip: f32,
    pub spread_aimed: f32,
    pub max_range: f32,
    pub damage_per_round: f32,
    /// Pellets на выстрел (каждый расходует патрон)
    pub pellets_per_shot: u32,
    pub ballistics: Ballistics,
    pub friendly_fire: FriendlyFire,
    /// Смещение дула в локальных координатах актора
    pub muzzle_offset: Vec3,
    state: WeaponState,
    next_fire_at: Option<f32>,
    burst_remaining: u32,
    reload_done_at: Option<f32>,
}

impl Default for RangedWeapon {
    fn default() -> Self {
        Self {
            magazine_capacity: 30,
            rounds_loaded: 30,
            fire_mode: FireMode::Single,
            rate_of_fire: 10.0,
            reload_duration: 1.5,
            spread_hip: 0.05,
            spread_aimed: 0.01,
            max_range: 50.0,
            damage_per_round: 20.0,
            pellets_per_shot: 1,
            ballistics: Ballistics::default(),
            friendly_fire: FriendlyFire::default(),
            muzzle_offset: Vec3::ZERO,
            state: WeaponState::Ready,
            next_fire_at: None,
            burst_remaining: 0,
            reload_done_at: None,
        }
    }
}

impl RangedWeapon {
    pub fn new(capacity: u32, fire_mode: FireMode, rate_of_fire: f32) -> Self {
        Self {
            magazine_capacity: capacity,
            rounds_loaded: capacity,
            fire_mode,
            rate_of_fire,
            ..default()
        }
    }

    pub fn state(&self) -> WeaponState {
        self.state
    }

    pub fn reload_done_at(&self) -> Option<f32> {
        self.reload_done_at
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.rate_of_fire.is_finite() && self.rate_of_fire > 0.0) {
            return Err(ConfigError::NonPositiveRateOfFire);
        }
        if self.magazine_capacity == 0 {
            return Err(ConfigError::EmptyMagazine);
        }
        Ok(())
    }

    pub fn fire_interval(&self) -> f32 {
        1.0 / self.rate_of_fire
    }

    /// Spread для текущего режима прицеливания
    pub fn spread(&self, aiming: bool) -> f32 {
        if aiming {
            self.spread_aimed.abs()
        } else {
            self.spread_hip.abs()
        }
    }

    /// Один тик state machine
    pub fn update(&mut self, now: f32, trigger: TriggerInput) -> WeaponTick {
        let mut tick = WeaponTick::default();

        match self.state {
            WeaponState::Reloading => {
                // Ввод во время перезарядки (включая тик завершения) игнорируется
                if self.reload_done_at.map_or(true, |done| has_elapsed(now, done)) {
                    self.rounds_loaded = self.magazine_capacity;
                    self.reload_done_at = None;
                    self.state = WeaponState::Ready;
                    tick.reload_finished = true;
                }
            }
            WeaponState::Firing => {
                if self.rate_ready(now) {
                    tick.pellets_fired = self.discharge(now);
                    self.burst_remaining = self.burst_remaining.saturating_sub(1);
                }
                if self.burst_remaining == 0 || self.rounds_loaded == 0 {
                    self.burst_remaining = 0;
                    self.state = WeaponState::Ready;
                }
            }
            WeaponState::Ready => {
                if trigger.reload {
                    // Полный магазин → ручная перезарядка игнорируется
                    if self.rounds_loaded < self.magazine_capacity {
                        self.start_reload(now);
                        tick.reload_started = true;
                    }
                    return tick;
                }

                let wants_fire = match self.fire_mode {
                    FireMode::Automatic => trigger.pressed || trigger.held,
                    FireMode::Single | FireMode::Burst(_) => trigger.pressed,
                };
                if !wants_fire {
                    return tick;
                }

                if self.rounds_loaded == 0 {
                    tick.dry_fire = true;
                    self.start_reload(now);
                    tick.reload_started = true;
                    return tick;
                }

                if !self.rate_ready(now) {
                    return tick;
                }

                tick.pellets_fired = self.discharge(now);

                if let FireMode::Burst(count) = self.fire_mode {
                    self.burst_remaining = count.max(1) - 1;
                    if self.burst_remaining > 0 && self.rounds_loaded > 0 {
                        self.state = WeaponState::Firing;
                    } else {
                        self.burst_remaining = 0;
                    }
                }
            }
        }

        tick
    }

    fn rate_ready(&self, now: f32) -> bool {
        self.next_fire_at.map_or(true, |next| has_elapsed(now, next))
    }

    fn start_reload(&mut self, now: f32) {
        self.state = WeaponState::Reloading;
        self.burst_remaining = 0;
        self.reload_done_at = Some(now + self.reload_duration.max(0.0));
    }

    /// Выстрел: расход патронов + additive schedule
    ///
    /// `next = previous + interval`, re-anchor к `now` только после простоя
    /// не меньше одного интервала.
    fn discharge(&mut self, now: f32) -> u32 {
        let interval = self.fire_interval();
        let base = match self.next_fire_at {
            Some(next) if now - next < interval => next,
            _ => now,
        };
        self.next_fire_at = Some(base + interval);

        let pellets = self.pellets_per_shot.max(1).min(self.rounds_loaded);
        self.rounds_loaded -= pellets;
        pellets
    }
}

/// Spread: равномерно в [-spread, spread] по локальным right/up осям стрелка
pub fn apply_spread(direction: Vec3, rotation: Quat, spread: f32, rng: &mut impl Rng) -> Vec3 {
    if spread <= 0.0 {
        return direction;
    }

    let right = rotation * Vec3::X;
    let up = rotation * Vec3::Y;
    let offset = right * rng.gen_range(-spread..=spread) + up * rng.gen_range(-spread..=spread);

    (direction + offset).try_normalize().unwrap_or(direction)
}

/// Результат резолва одного pellet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotResolution {
    /// Попадание (entity + точка), если луч что-то задел
    pub hit: Option<(Entity, Vec3)>,
    /// Точка удара или точка на max_range
    pub resolved_point: Vec3,
    /// Конец tracer с учётом spread
    pub tracer_end: Vec3,
}

/// Резолв одного pellet: луч по прицелу, spread на tracer
pub fn resolve_shot(
    spatial: &dyn SpatialQuery,
    shooter: Entity,
    muzzle: Vec3,
    aim: Vec3,
    perturbed: Vec3,
    max_range: f32,
) -> ShotResolution {
    let hit = spatial.raycast(muzzle, aim, max_range, Some(shooter));
    let resolved_point = hit.map_or(muzzle + aim * max_range, |hit| hit.point);
    let distance = muzzle.distance(resolved_point);

    ShotResolution {
        hit: hit.map(|hit| (hit.entity, hit.point)),
        resolved_point,
        tracer_end: muzzle + perturbed * distance,
    }
}

/// System: ranged weapons (input → state machine → shots)
pub fn operate_ranged_weapons(
    mut commands: Commands,
    mut shooters: Query<(Entity, &Actor, &mut RangedWeapon, &CombatInput, &Transform), Without<Dead>>,
    spatial: Res<SpatialSnapshot>,
    clock: Res<SimClock>,
    mut rng: ResMut<DeterministicRng>,
    mut diagnostics: ResMut<CombatDiagnostics>,
    mut damage_requests: EventWriter<DamageRequest>,
    mut cues: EventWriter<CombatCue>,
) {
    for (entity, actor, mut weapon, input, transform) in shooters.iter_mut() {
        if let Err(error) = weapon.validate() {
            diagnostics.report(Some(entity), error);
            continue;
        }

        let tick = weapon.update(clock.now, TriggerInput::from(input));

        if tick.dry_fire {
            cues.write(CombatCue::new(entity, CueKind::DryFire));
        }
        if tick.reload_started {
            cues.write(CombatCue::new(entity, CueKind::ReloadStarted));
            crate::logger::log(&format!("🔄 {:?} reloading ({}s)", entity, weapon.reload_duration));
        }
        if tick.reload_finished {
            cues.write(CombatCue::new(entity, CueKind::ReloadFinished));
        }
        if !tick.fired() {
            continue;
        }

        cues.write(CombatCue::new(entity, CueKind::Fire));

        let muzzle = transform.translation + transform.rotation * weapon.muzzle_offset;
        let forward = *transform.forward();
        let aim = input
            .aim_direction
            .and_then(|direction| direction.try_normalize())
            .unwrap_or(forward);
        let spread = weapon.spread(input.aiming);

        for _ in 0..tick.pellets_fired {
            let perturbed = apply_spread(aim, transform.rotation, spread, &mut rng.rng);

            match weapon.ballistics {
                Ballistics::HitScan { tracer } => {
                    let shot = resolve_shot(&*spatial, entity, muzzle, aim, perturbed, weapon.max_range);

                    if let Some((target, point)) = shot.hit {
                        if weapon.friendly_fire.spares(actor.faction, spatial.faction_of(target)) {
                            crate::logger::log(&format!("🛡️ Friendly fire spared {:?}", target));
                        } else {
                            damage_requests.write(DamageRequest {
                                attacker: Some(entity),
                                target,
                                amount: weapon.damage_per_round,
                                source: DamageSource::Ranged,
                                point,
                            });
                            crate::logger::log(&format!(
                                "🎯 {:?} shot {:?} ({} damage)",
                                entity, target, weapon.damage_per_round
                            ));
                        }
                    }

                    if let Some(style) = tracer {
                        if muzzle.distance(shot.resolved_point) >= style.min_distance {
                            commands.spawn(Tracer::cosmetic(
                                entity,
                                actor.faction,
                                muzzle,
                                shot.tracer_end,
                                clock.now,
                                style.speed,
                            ));
                        }
                    }
                }
                Ballistics::Projectile { speed } => {
                    let end = muzzle + perturbed * weapon.max_range;
                    commands.spawn(Tracer::lethal(
                        entity,
                        actor.faction,
                        muzzle,
                        end,
                        clock.now,
                        speed,
                        LethalPayload {
                            damage: weapon.damage_per_round,
                            friendly_fire: weapon.friendly_fire,
                        },
                    ));
                }
            }
        }
    }
}
