//! Diagnostic channel для configuration errors
//!
//! Каждая пара (entity, error) репортится один раз: повторы в следующих тиках
//! не спамят лог, но операция всё равно пропускается на каждом тике.

use bevy::prelude::*;
use std::collections::HashSet;

use crate::config::ConfigError;

/// Одна запись диагностики
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostic {
    pub entity: Option<Entity>,
    pub error: ConfigError,
}

#[derive(Resource, Debug, Default)]
pub struct CombatDiagnostics {
    reported: HashSet<(Option<Entity>, ConfigError)>,
    entries: Vec<Diagnostic>,
}

impl CombatDiagnostics {
    /// Зарегистрировать ошибку. Возвращает true если это первый репорт.
    pub fn report(&mut self, entity: Option<Entity>, error: ConfigError) -> bool {
        if !self.reported.insert((entity, error)) {
            return false;
        }

        match entity {
            Some(entity) => crate::logger::log_error(&format!(
                "⚠️ Config error on {:?}: {}",
                entity, error
            )),
            None => crate::logger::log_error(&format!("⚠️ Config error: {}", error)),
        }

        self.entries.push(Diagnostic { entity, error });
        true
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn contains(&self, entity: Option<Entity>, error: ConfigError) -> bool {
        self.reported.contains(&(entity, error))
    }
}
