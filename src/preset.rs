use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::{Configuration, TrainingMode};

/// A named, reusable configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub id: Uuid,
    pub name: String,
    pub mode: TrainingMode,
    pub target: f64,
    pub rest_seconds: i64,
    pub adjustment: f64,
    pub created_at: DateTime<Utc>,
}

impl Preset {
    pub fn new<S: Into<String>>(name: S, config: Configuration) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            mode: config.mode,
            target: config.target,
            rest_seconds: config.rest_seconds,
            adjustment: config.adjustment,
            created_at: Utc::now(),
        }
    }

    pub fn configuration(&self) -> Configuration {
        Configuration::new(self.mode, self.target, self.rest_seconds, self.adjustment)
    }

    /// Copy of this preset with a different configuration, same identity
    pub fn with_configuration(&self, config: Configuration) -> Self {
        Self {
            mode: config.mode,
            target: config.target,
            rest_seconds: config.rest_seconds,
            adjustment: config.adjustment,
            ..self.clone()
        }
    }
}

/// Setup-screen defaults when switching mode
pub fn defaults_for(mode: TrainingMode) -> Configuration {
    match mode {
        TrainingMode::Time => Configuration::new(TrainingMode::Time, 60.0, 15, 5.0),
        TrainingMode::Reps => Configuration::new(TrainingMode::Reps, 20.0, 15, 2.0),
    }
}

/// Catalogue seeded on first run
pub fn default_presets() -> Vec<Preset> {
    vec![
        Preset::new(
            "Straight Handstand",
            Configuration::new(TrainingMode::Time, 60.0, 15, 5.0),
        ),
        Preset::new(
            "Tuck 7 Straddle",
            Configuration::new(TrainingMode::Time, 45.0, 20, 3.0),
        ),
        Preset::new(
            "Pull-ups",
            Configuration::new(TrainingMode::Reps, 20.0, 30, 2.0),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_presets_are_valid() {
        let presets = default_presets();
        assert_eq!(presets.len(), 3);
        for preset in &presets {
            assert!(preset.configuration().validate().is_ok(), "{}", preset.name);
        }
        assert_eq!(presets[2].mode, TrainingMode::Reps);
    }

    #[test]
    fn test_default_presets_have_unique_ids() {
        let presets = default_presets();
        assert_ne!(presets[0].id, presets[1].id);
        assert_ne!(presets[1].id, presets[2].id);
    }

    #[test]
    fn test_configuration_roundtrip() {
        let config = Configuration::new(TrainingMode::Time, 45.0, 20, 3.0);
        let preset = Preset::new("Tuck", config);
        assert_eq!(preset.configuration(), config);
    }

    #[test]
    fn test_with_configuration_keeps_identity() {
        let preset = Preset::new("Dips", defaults_for(TrainingMode::Reps));
        let edited = preset.with_configuration(Configuration::new(TrainingMode::Reps, 30.0, 45, 0.0));
        assert_eq!(edited.id, preset.id);
        assert_eq!(edited.name, "Dips");
        assert_eq!(edited.target, 30.0);
        assert_eq!(edited.created_at, preset.created_at);
    }

    #[test]
    fn test_mode_defaults() {
        assert_eq!(defaults_for(TrainingMode::Time).target, 60.0);
        assert_eq!(defaults_for(TrainingMode::Time).adjustment, 5.0);
        assert_eq!(defaults_for(TrainingMode::Reps).target, 20.0);
        assert_eq!(defaults_for(TrainingMode::Reps).adjustment, 2.0);
    }
}
