//! Perception components: Patrol ⇄ Alert-Chase state machine.

use bevy::prelude::*;

use crate::components::{Faction, FactionMask};

/// Режим AI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum AlertMode {
    #[default]
    Patrol,
    AlertChase,
}

/// Переход perception state machine за тик
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerceptionTransition {
    None,
    /// Patrol → AlertChase (своим сенсором)
    Engaged(Entity),
    /// AlertChase, ближайшая цель сменилась
    Retargeted(Entity),
    /// AlertChase → Patrol
    Lost,
}

/// Состояние восприятия AI агента
///
/// Мутирует свой MeleeEngagement target, алерты союзникам идут через их
/// `PendingAlert` inbox (применяются в начале следующего тика).
#[derive(Component, Debug, Clone, PartialEq, Reflect)]
#[reflect(Component)]
#[require(PendingAlert)]
pub struct PerceptionState {
    pub mode: AlertMode,
    pub detected_target: Option<Entity>,
    /// Радиус обнаружения цели (метры)
    pub detection_radius: f32,
    /// Радиус оповещения союзников (метры)
    pub alert_radius: f32,
    pub patrol_speed: f32,
    pub chase_speed: f32,
    pub target_filter: FactionMask,
    /// Оповещать ли союзников при обнаружении
    pub relays_alerts: bool,
    /// Свой сенсор видел текущую цель (forced alert → false до первого контакта)
    pub has_sighted: bool,
    /// Forced alert применён, relay в этом тике
    pub relay_pending: bool,
}

impl Default for PerceptionState {
    fn default() -> Self {
        Self {
            mode: AlertMode::Patrol,
            detected_target: None,
            detection_radius: 10.0,
            alert_radius: 15.0,
            patrol_speed: 2.0,
            chase_speed: 5.0,
            target_filter: FactionMask::of(Faction::PLAYER),
            relays_alerts: true,
            has_sighted: false,
            relay_pending: false,
        }
    }
}

impl PerceptionState {
    pub fn is_chasing(&self) -> bool {
        self.mode == AlertMode::AlertChase
    }

    /// Текущая скорость по режиму
    pub fn speed(&self) -> f32 {
        match self.mode {
            AlertMode::Patrol => self.patrol_speed,
            AlertMode::AlertChase => self.chase_speed,
        }
    }

    /// Один шаг state machine по результату сенсора
    ///
    /// `sighted`: ближайшая цель в detection_radius (None если никого),
    /// `target_valid`: текущая detected_target ещё жива.
    pub fn observe(&mut self, sighted: Option<Entity>, target_valid: bool) -> PerceptionTransition {
        match (self.mode, sighted) {
            (AlertMode::Patrol, Some(target)) => {
                self.mode = AlertMode::AlertChase;
                self.detected_target = Some(target);
                self.has_sighted = true;
                PerceptionTransition::Engaged(target)
            }
            (AlertMode::Patrol, None) => PerceptionTransition::None,
            (AlertMode::AlertChase, Some(target)) => {
                self.has_sighted = true;
                if self.detected_target == Some(target) {
                    PerceptionTransition::None
                } else {
                    self.detected_target = Some(target);
                    PerceptionTransition::Retargeted(target)
                }
            }
            (AlertMode::AlertChase, None) => {
                // Forced агент гонится пока не увидит и не потеряет цель сам
                if self.has_sighted || !target_valid {
                    self.lose_target();
                    PerceptionTransition::Lost
                } else {
                    PerceptionTransition::None
                }
            }
        }
    }

    /// Принудительный Alert-Chase от союзника (только из Patrol)
    pub fn force_alert(&mut self, target: Entity) -> bool {
        if self.mode != AlertMode::Patrol {
            return false;
        }

        self.mode = AlertMode::AlertChase;
        self.detected_target = Some(target);
        self.has_sighted = false;
        self.relay_pending = self.relays_alerts;
        true
    }

    pub fn lose_target(&mut self) {
        self.mode = AlertMode::Patrol;
        self.detected_target = None;
        self.has_sighted = false;
        self.relay_pending = false;
    }
}

/// Inbox для forced alert (пишется союзником, читается в начале тика)
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct PendingAlert(pub Option<Entity>);
