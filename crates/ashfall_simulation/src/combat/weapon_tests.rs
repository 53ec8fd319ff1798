//! Tests for RangedWeapon state machine and shot resolution.

#[cfg(test)]
mod tests {
    use bevy::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::combat::weapon::{apply_spread, resolve_shot};
    use crate::combat::{FireMode, FriendlyFire, RangedWeapon, TriggerInput, WeaponState};
    use crate::components::Faction;
    use crate::spatial::{SpatialEntry, SpatialSnapshot};

    const PRESS: TriggerInput = TriggerInput {
        pressed: true,
        held: true,
        reload: false,
    };
    const HOLD: TriggerInput = TriggerInput {
        pressed: false,
        held: true,
        reload: false,
    };
    const IDLE: TriggerInput = TriggerInput {
        pressed: false,
        held: false,
        reload: false,
    };
    const RELOAD: TriggerInput = TriggerInput {
        pressed: false,
        held: false,
        reload: true,
    };

    #[test]
    fn test_burst_three_rounds_spaced_by_interval() {
        let mut weapon = RangedWeapon::new(30, FireMode::Burst(3), 10.0);

        assert_eq!(weapon.update(0.0, PRESS).pellets_fired, 1);
        assert_eq!(weapon.state(), WeaponState::Firing);

        // Между выстрелами очереди ничего
        assert_eq!(weapon.update(0.05, IDLE).pellets_fired, 0);
        assert_eq!(weapon.update(0.1, IDLE).pellets_fired, 1);
        assert_eq!(weapon.update(0.15, IDLE).pellets_fired, 0);
        assert_eq!(weapon.update(0.2, IDLE).pellets_fired, 1);

        assert_eq!(weapon.state(), WeaponState::Ready);
        assert_eq!(weapon.rounds_loaded, 27);
        assert_eq!(weapon.update(0.3, IDLE).pellets_fired, 0);
    }

    #[test]
    fn test_burst_aborts_when_ammo_runs_out() {
        let mut weapon = RangedWeapon::new(30, FireMode::Burst(3), 10.0);
        weapon.rounds_loaded = 2;

        assert!(weapon.update(0.0, PRESS).fired());
        assert!(weapon.update(0.1, IDLE).fired());
        assert_eq!(weapon.rounds_loaded, 0);
        assert_eq!(weapon.state(), WeaponState::Ready);

        assert!(!weapon.update(0.2, IDLE).fired());
        assert_eq!(weapon.rounds_loaded, 0);
    }

    #[test]
    fn test_empty_magazine_routes_to_reload() {
        let mut weapon = RangedWeapon::new(30, FireMode::Single, 10.0);
        weapon.rounds_loaded = 0;

        let tick = weapon.update(1.0, PRESS);
        assert!(tick.dry_fire);
        assert!(tick.reload_started);
        assert!(!tick.fired());
        assert_eq!(weapon.rounds_loaded, 0);
        assert_eq!(weapon.state(), WeaponState::Reloading);

        // Повторный спуск во время перезарядки игнорируется
        let tick = weapon.update(1.1, PRESS);
        assert!(!tick.dry_fire && !tick.reload_started && !tick.fired());
        assert_eq!(weapon.rounds_loaded, 0);
    }

    #[test]
    fn test_reload_completes_only_after_duration() {
        let mut weapon = RangedWeapon::new(30, FireMode::Single, 10.0);
        weapon.reload_duration = 1.5;
        weapon.rounds_loaded = 4;

        assert!(weapon.update(1.0, RELOAD).reload_started);
        assert_eq!(weapon.reload_done_at(), Some(2.5));

        assert!(!weapon.update(2.4, RELOAD).reload_finished);
        assert_eq!(weapon.rounds_loaded, 4);
        assert_eq!(weapon.state(), WeaponState::Reloading);

        // Тик завершения: магазин полный, спуск этого тика игнорируется
        let tick = weapon.update(2.5, PRESS);
        assert!(tick.reload_finished);
        assert!(!tick.fired());
        assert_eq!(weapon.rounds_loaded, 30);
        assert_eq!(weapon.state(), WeaponState::Ready);

        assert!(weapon.update(2.6, PRESS).fired());
    }

    #[test]
    fn test_manual_reload_with_full_magazine_ignored() {
        let mut weapon = RangedWeapon::new(12, FireMode::Single, 5.0);

        let tick = weapon.update(0.0, RELOAD);
        assert!(!tick.reload_started);
        assert_eq!(weapon.state(), WeaponState::Ready);
    }

    #[test]
    fn test_single_needs_fresh_press() {
        let mut weapon = RangedWeapon::new(12, FireMode::Single, 5.0);

        assert!(weapon.update(0.0, PRESS).fired());
        // Нажатие раньше интервала отклонено (rate limit)
        assert!(!weapon.update(0.1, PRESS).fired());
        // Удержание без нового нажатия не стреляет
        assert!(!weapon.update(1.0, HOLD).fired());
        assert!(weapon.update(1.2, PRESS).fired());
    }

    #[test]
    fn test_automatic_additive_schedule() {
        let mut weapon = RangedWeapon::new(30, FireMode::Automatic, 10.0);

        assert!(weapon.update(0.0, HOLD).fired());
        assert!(!weapon.update(0.05, HOLD).fired());
        assert!(weapon.update(0.1, HOLD).fired());

        // Опоздали на 0.01 → следующий слот всё равно 0.3, а не 0.31
        assert!(weapon.update(0.21, HOLD).fired());
        assert!(!weapon.update(0.29, HOLD).fired());
        assert!(weapon.update(0.3, HOLD).fired());

        // После простоя ≥ интервала расписание привязывается к now
        assert!(weapon.update(1.0, HOLD).fired());
        assert!(!weapon.update(1.05, HOLD).fired());
        assert!(weapon.update(1.1, HOLD).fired());
    }

    #[test]
    fn test_pellets_consume_rounds() {
        let mut weapon = RangedWeapon::new(30, FireMode::Single, 2.0);
        weapon.pellets_per_shot = 8;
        weapon.rounds_loaded = 5;

        assert_eq!(weapon.update(0.0, PRESS).pellets_fired, 5);
        assert_eq!(weapon.rounds_loaded, 0);
    }

    #[test]
    fn test_friendly_fire_policies() {
        assert!(!FriendlyFire::Allow.spares(Faction::HOSTILE, Some(Faction::HOSTILE)));
        assert!(FriendlyFire::SpareAllies.spares(Faction::HOSTILE, Some(Faction::HOSTILE)));
        assert!(!FriendlyFire::SpareAllies.spares(Faction::HOSTILE, Some(Faction::PLAYER)));
        assert!(FriendlyFire::SparePlayers.spares(Faction::HOSTILE, Some(Faction::PLAYER)));
        assert!(!FriendlyFire::SparePlayers.spares(Faction::PLAYER, None));
    }

    #[test]
    fn test_validate_rejects_bad_numbers() {
        let mut weapon = RangedWeapon::new(30, FireMode::Single, 0.0);
        assert!(weapon.validate().is_err());

        weapon.rate_of_fire = 5.0;
        weapon.magazine_capacity = 0;
        assert!(weapon.validate().is_err());
    }

    #[test]
    fn test_spread_stays_within_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let aim = Vec3::NEG_Z;

        assert_eq!(apply_spread(aim, Quat::IDENTITY, 0.0, &mut rng), aim);

        for _ in 0..100 {
            let perturbed = apply_spread(aim, Quat::IDENTITY, 0.05, &mut rng);
            assert!((perturbed.length() - 1.0).abs() < 1e-4);
            assert!(perturbed.angle_between(aim) <= 0.0725);
        }
    }

    #[test]
    fn test_resolve_shot_hit_and_miss() {
        let shooter = Entity::from_raw(1);
        let target = Entity::from_raw(2);
        let snapshot = SpatialSnapshot::from_entries(vec![
            SpatialEntry {
                entity: shooter,
                position: Vec3::ZERO,
                faction: Faction::PLAYER,
                radius: 0.5,
            },
            SpatialEntry {
                entity: target,
                position: Vec3::new(0.0, 0.0, -10.0),
                faction: Faction::HOSTILE,
                radius: 0.5,
            },
        ]);

        let shot = resolve_shot(&snapshot, shooter, Vec3::ZERO, Vec3::NEG_Z, Vec3::NEG_Z, 50.0);
        assert_eq!(shot.hit.map(|(entity, _)| entity), Some(target));
        assert!((shot.resolved_point.z + 9.5).abs() < 1e-4);

        let miss = resolve_shot(&snapshot, shooter, Vec3::ZERO, Vec3::X, Vec3::X, 50.0);
        assert!(miss.hit.is_none());
        assert_eq!(miss.resolved_point, Vec3::new(50.0, 0.0, 0.0));
    }
}
