//! Presentation cues (fire-and-forget)
//!
//! Ядро не играет звуки и анимации: оно только пишет `CombatCue`, а хост
//! (движок, headless runner) решает что с ними делать. Никто в симуляции
//! cues не читает.

use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CueKind {
    /// Выстрел (один на discharge, не на pellet)
    Fire,
    /// Спуск при пустом магазине
    DryFire,
    ReloadStarted,
    ReloadFinished,
    MeleeSwing,
    /// Entity получила урон в точке
    Hit { point: Vec3 },
    Death,
}

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct CombatCue {
    pub entity: Entity,
    pub kind: CueKind,
}

impl CombatCue {
    pub fn new(entity: Entity, kind: CueKind) -> Self {
        Self { entity, kind }
    }
}
