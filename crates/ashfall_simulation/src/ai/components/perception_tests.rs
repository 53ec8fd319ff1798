//! Tests for perception state machine.

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use super::super::perception::{AlertMode, PerceptionState, PerceptionTransition};

    fn player() -> Entity {
        Entity::from_raw(100)
    }

    #[test]
    fn test_perception_default() {
        let state = PerceptionState::default();
        assert_eq!(state.mode, AlertMode::Patrol);
        assert_eq!(state.detection_radius, 10.0);
        assert_eq!(state.alert_radius, 15.0);
        assert_eq!(state.speed(), 2.0);
    }

    #[test]
    fn test_sighting_engages_then_loss_returns_to_patrol() {
        let mut state = PerceptionState::default();

        assert_eq!(state.observe(Some(player()), false), PerceptionTransition::Engaged(player()));
        assert!(state.is_chasing());
        assert_eq!(state.speed(), 5.0);

        assert_eq!(state.observe(Some(player()), true), PerceptionTransition::None);

        assert_eq!(state.observe(None, true), PerceptionTransition::Lost);
        assert_eq!(state.mode, AlertMode::Patrol);
        assert_eq!(state.detected_target, None);
    }

    #[test]
    fn test_retarget_to_nearest() {
        let mut state = PerceptionState::default();
        state.observe(Some(player()), false);

        let other = Entity::from_raw(101);
        assert_eq!(state.observe(Some(other), true), PerceptionTransition::Retargeted(other));
        assert_eq!(state.detected_target, Some(other));
    }

    #[test]
    fn test_forced_alert_persists_until_own_loss() {
        let mut state = PerceptionState::default();

        assert!(state.force_alert(player()));
        assert!(state.relay_pending);
        assert!(!state.has_sighted);

        // Свой сенсор цель не видит, но цель валидна → продолжаем погоню
        assert_eq!(state.observe(None, true), PerceptionTransition::None);
        assert!(state.is_chasing());

        // Увидели и потеряли
        state.observe(Some(player()), true);
        assert_eq!(state.observe(None, true), PerceptionTransition::Lost);
    }

    #[test]
    fn test_forced_alert_drops_invalid_target() {
        let mut state = PerceptionState::default();
        state.force_alert(player());

        assert_eq!(state.observe(None, false), PerceptionTransition::Lost);
        assert!(!state.is_chasing());
    }

    #[test]
    fn test_force_alert_ignored_while_chasing() {
        let mut state = PerceptionState::default();
        state.observe(Some(player()), false);

        assert!(!state.force_alert(Entity::from_raw(5)));
        assert_eq!(state.detected_target, Some(player()));
    }

    #[test]
    fn test_non_relaying_agent_does_not_queue_relay() {
        let mut state = PerceptionState {
            relays_alerts: false,
            ..default()
        };

        assert!(state.force_alert(player()));
        assert!(!state.relay_pending);
    }
}
