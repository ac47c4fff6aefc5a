use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gameplay::health::HealthConfig;
use crate::gameplay::judge::JudgmentConfig;
use crate::gameplay::scheduler::SchedulerConfig;
use crate::input::events::KeyBindings;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid settings toml")]
    Parse(#[from] toml::de::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Tunables for a play session. Every table and key is optional in TOML.
///
/// ```toml
/// audio_offset = 0.05
///
/// [judgment.windows]
/// perfect = 0.035
///
/// [health]
/// loss_per_miss = 8.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Output latency compensation in seconds; song time starts at `-audio_offset`.
    pub audio_offset: f64,
    /// Widest timing difference (seconds) at which a press still claims a note.
    pub hit_window: f64,
    /// Seconds to wait after the music ends before the run completes.
    pub end_settle_delay: f64,
    pub judgment: JudgmentConfig,
    pub scheduler: SchedulerConfig,
    pub health: HealthConfig,
    pub keys: KeyBindings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            audio_offset: 0.1,
            hit_window: 0.18,
            end_settle_delay: 1.0,
            judgment: JudgmentConfig::default(),
            scheduler: SchedulerConfig::default(),
            health: HealthConfig::default(),
            keys: KeyBindings::default(),
        }
    }
}

impl SessionSettings {
    pub fn from_toml_str(src: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(src)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let src = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&src)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let w = &self.judgment.windows;
        if !(w.perfect > 0.0 && w.perfect <= w.great && w.great <= w.good && w.good <= w.miss) {
            return Err(SettingsError::Invalid(format!(
                "judgment windows must be positive and ascending (got {}/{}/{}/{})",
                w.perfect, w.great, w.good, w.miss
            )));
        }
        if self.hit_window < w.miss {
            return Err(SettingsError::Invalid(format!(
                "hit_window {} is narrower than the miss window {}",
                self.hit_window, w.miss
            )));
        }
        let s = &self.scheduler;
        if s.lane_count == 0 {
            return Err(SettingsError::Invalid("scheduler.lane_count must be at least 1".into()));
        }
        if !(s.approach_time > 0.0) {
            return Err(SettingsError::Invalid("scheduler.approach_time must be > 0".into()));
        }
        if !(s.spawn_distance > s.hit_position) {
            return Err(SettingsError::Invalid(
                "scheduler.spawn_distance must lie beyond hit_position".into(),
            ));
        }
        if !(self.health.max_health > 0.0) {
            return Err(SettingsError::Invalid("health.max_health must be > 0".into()));
        }
        Ok(())
    }
}
