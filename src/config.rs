use bevy::prelude::*;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::phase::{default_playlist, PhaseDescriptor};
use crate::sensitivity::{parse_sensitivity, SensitivityProfile, DEFAULT_SENSITIVITY};
use crate::stats::TrackingScoring;

// Session lengths offered by the menu
pub const SESSION_PRESETS_SECS: [u64; 4] = [180, 300, 600, 900];
pub const DEFAULT_SESSION_SECS: u64 = 600;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("session duration must be positive, got {0}s")]
    Duration(f64),
    #[error("sensitivity must be a finite non-negative number, got {0}")]
    Sensitivity(f32),
    #[error("device pixel ratio must be positive, got {0}")]
    PixelRatio(f32),
    #[error("the playlist needs at least one phase")]
    EmptyPlaylist,
    #[error("tracking phase `{0}` must not have a spawn interval")]
    TrackingWithInterval(String),
    #[error("phase `{0}` needs a positive spawn interval")]
    MissingInterval(String),
}

/// Everything a session reads at start.
///
/// Read by the engine on every `Start`, so edits between sessions apply to the
/// next run only.
#[derive(Resource, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainerConfig {
    pub sensitivity: f32,
    pub session_duration_secs: f64,
    pub device_pixel_ratio: f32,
    pub crosshair_code: Option<String>,
    pub seed: Option<u64>,
    pub tracking: TrackingScoring,
    pub playlist: Vec<PhaseDescriptor>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            session_duration_secs: DEFAULT_SESSION_SECS as f64,
            device_pixel_ratio: 1.0,
            crosshair_code: None,
            seed: None,
            tracking: TrackingScoring::default(),
            playlist: default_playlist(),
        }
    }
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.session_duration_secs.is_finite() && self.session_duration_secs > 0.0) {
            return Err(ConfigError::Duration(self.session_duration_secs));
        }
        if !(self.sensitivity.is_finite() && self.sensitivity >= 0.0) {
            return Err(ConfigError::Sensitivity(self.sensitivity));
        }
        if !(self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0) {
            return Err(ConfigError::PixelRatio(self.device_pixel_ratio));
        }
        if self.playlist.is_empty() {
            return Err(ConfigError::EmptyPlaylist);
        }
        for phase in &self.playlist {
            match (phase.is_tracking(), phase.spawn_interval()) {
                (true, Some(_)) => return Err(ConfigError::TrackingWithInterval(phase.id.clone())),
                (false, None) => return Err(ConfigError::MissingInterval(phase.id.clone())),
                _ => {}
            }
        }
        Ok(())
    }

    pub fn sensitivity_profile(&self) -> SensitivityProfile {
        SensitivityProfile {
            sensitivity: self.sensitivity,
            device_pixel_ratio: self.device_pixel_ratio,
        }
    }

    // Free-text field from the menu; garbage reads as zero
    pub fn set_sensitivity_input(&mut self, input: &str) {
        self.sensitivity = parse_sensitivity(input).max(0.0);
    }
}

// --- Config Store ---

pub trait ConfigStore {
    fn load(&self) -> TrainerConfig;
    fn save(&self, cfg: &TrainerConfig) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "strac_aim") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("strac_aim_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> TrainerConfig {
        let Ok(bytes) = fs::read(&self.path) else {
            return TrainerConfig::default();
        };
        match serde_json::from_slice::<TrainerConfig>(&bytes) {
            Ok(cfg) => match cfg.validate() {
                Ok(()) => cfg,
                Err(err) => {
                    warn!("Rejected config {}: {err}", self.path.display());
                    TrainerConfig::default()
                }
            },
            Err(err) => {
                warn!("Unreadable config {}: {err}", self.path.display());
                TrainerConfig::default()
            }
        }
    }

    fn save(&self, cfg: &TrainerConfig) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
