//! Базовые компоненты участников боя: Actor, Faction, Hurtbox, CombatInput

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Участник боя (игрок или AI)
///
/// Позиция и facing берутся из `Transform` (facing = локальная −Z).
/// Живой пока на entity нет маркера `Dead`.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
#[require(Transform, Hurtbox, CombatInput)]
pub struct Actor {
    pub faction: Faction,
}

impl Actor {
    pub fn new(faction: Faction) -> Self {
        Self { faction }
    }
}

/// Маркер: entity управляется игроком (цель для perception по умолчанию)
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Player;

/// Фракция / team tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Reflect, Serialize, Deserialize)]
pub struct Faction(pub u8);

impl Faction {
    pub const PLAYER: Faction = Faction(0);
    pub const HOSTILE: Faction = Faction(1);

    pub fn mask(self) -> FactionMask {
        FactionMask::of(self)
    }
}

/// Битовая маска фракций (target filter для queries)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect, Serialize, Deserialize)]
pub struct FactionMask(pub u32);

impl FactionMask {
    pub const NONE: FactionMask = FactionMask(0);
    pub const ALL: FactionMask = FactionMask(u32::MAX);

    pub fn of(faction: Faction) -> Self {
        Self(1u32 << (faction.0 as u32 % 32))
    }

    pub fn with(self, faction: Faction) -> Self {
        Self(self.0 | Self::of(faction).0)
    }

    pub fn without(self, faction: Faction) -> Self {
        Self(self.0 & !Self::of(faction).0)
    }

    pub fn contains(self, faction: Faction) -> bool {
        self.0 & Self::of(faction).0 != 0
    }
}

/// Сфера попадания для ray tests (радиус в метрах)
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Hurtbox {
    pub radius: f32,
}

impl Default for Hurtbox {
    fn default() -> Self {
        Self { radius: 0.5 }
    }
}

/// Боевой intent на текущий тик
///
/// Пишется input-слоем игрока (снаружи) или AI engagement системой.
/// Edge-флаги (`melee`, `fire_pressed`, `reload`) сбрасываются после обработки,
/// level-флаги (`fire_held`, `aiming`) принадлежат писателю.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct CombatInput {
    /// Нажат удар ближнего боя
    pub melee: bool,
    /// Спуск нажат в этом тике (edge)
    pub fire_pressed: bool,
    /// Спуск удерживается (для Automatic)
    pub fire_held: bool,
    /// Прицеливание (secondary input): spread_aimed вместо spread_hip
    pub aiming: bool,
    /// Ручная перезарядка
    pub reload: bool,
    /// Направление прицела (None → forward актора)
    pub aim_direction: Option<Vec3>,
}

impl CombatInput {
    /// Сбросить edge-флаги после обработки тика
    pub fn consume_edges(&mut self) {
        self.melee = false;
        self.fire_pressed = false;
        self.reload = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faction_mask() {
        let mask = FactionMask::of(Faction::PLAYER);
        assert!(mask.contains(Faction::PLAYER));
        assert!(!mask.contains(Faction::HOSTILE));

        let both = mask.with(Faction::HOSTILE);
        assert!(both.contains(Faction::HOSTILE));
        assert!(!both.without(Faction::PLAYER).contains(Faction::PLAYER));

        assert!(FactionMask::ALL.contains(Faction(17)));
        assert!(!FactionMask::NONE.contains(Faction::PLAYER));
    }

    #[test]
    fn test_consume_edges_keeps_levels() {
        let mut input = CombatInput {
            melee: true,
            fire_pressed: true,
            fire_held: true,
            aiming: true,
            reload: true,
            aim_direction: None,
        };
        input.consume_edges();

        assert!(!input.melee && !input.fire_pressed && !input.reload);
        assert!(input.fire_held && input.aiming);
    }
}
