//! Simulation clock
//!
//! Все таймеры (cooldown, burst, reload, tracer, patrol wait, waves) хранят
//! абсолютный resume-at timestamp и сравнивают его с `SimClock::now`.
//! Клок двигается фиксированным шагом из `CombatConfig` в конце тика, поэтому
//! первый тик видит `now == 0.0` и прогон детерминирован независимо от wall-clock.

use bevy::prelude::*;

use crate::config::CombatConfig;

/// Допуск для сравнения timestamps (накопление f32 шагов)
pub const TIME_EPSILON: f32 = 1e-4;

#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct SimClock {
    /// Номер текущего тика
    pub tick: u64,
    /// Время текущего тика (секунды от старта)
    pub now: f32,
}

impl SimClock {
    /// Наступил ли момент `at` (inclusive, с допуском)
    pub fn reached(&self, at: f32) -> bool {
        has_elapsed(self.now, at)
    }
}

/// `now >= at` с допуском на погрешность f32
pub fn has_elapsed(now: f32, at: f32) -> bool {
    now + TIME_EPSILON >= at
}

/// System: шаг клока (последняя система тика)
pub fn advance_clock(mut clock: ResMut<SimClock>, config: Res<CombatConfig>) {
    clock.tick += 1;
    clock.now = clock.tick as f32 * config.tick_seconds;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_elapsed_inclusive() {
        assert!(has_elapsed(1.5, 1.5));
        assert!(has_elapsed(1.49995, 1.5));
        assert!(!has_elapsed(1.4, 1.5));
    }

    #[test]
    fn test_clock_reached() {
        let clock = SimClock { tick: 10, now: 0.5 };
        assert!(clock.reached(0.5));
        assert!(!clock.reached(0.6));
    }
}
