//! Match rules and tuning
//!
//! Loaded from a JSON file next to the binary; missing or broken files fall
//! back to defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::net::LinkConditions;

/// Errors loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Scoring rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    /// First side to reach this wins
    pub winning_score: u32,
    /// Points for getting the ball past the opponent's wall
    pub goal_points: u32,
    /// Points credited to the last paddle to touch the ball on a bumper hit
    pub bumper_points: u32,
    /// Side walls are goals. When off, they bounce like top and bottom.
    pub side_walls_score: bool,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            winning_score: 50,
            goal_points: 5,
            bumper_points: 1,
            side_walls_score: true,
        }
    }
}

/// Computer opponent tuning
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// Aggressive tracking instead of the lazy default
    pub twitchy: bool,
}

/// Netplay tuning
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetSettings {
    /// Impairments applied to the in-process loopback link
    pub loopback: LinkConditions,
}

/// All settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub rules: Rules,
    pub ai: AiSettings,
    pub net: NetSettings,
    /// Simulation seed; 0 picks one from the clock
    pub seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rules: Rules::default(),
            ai: AiSettings::default(),
            net: NetSettings::default(),
            seed: 0,
        }
    }
}

impl Settings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read settings from disk
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Read settings from disk, falling back to defaults
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_load(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(SettingsError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(e) => {
                log::warn!("Ignoring {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Write settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = Settings::from_json(r#"{"rules":{"winning_score":7},"seed":9}"#).unwrap();
        assert_eq!(settings.rules.winning_score, 7);
        assert_eq!(settings.rules.goal_points, Rules::default().goal_points);
        assert!(settings.rules.side_walls_score);
        assert_eq!(settings.seed, 9);
        assert!(!settings.ai.twitchy);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(matches!(
            Settings::from_json("{ nope"),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let settings = Settings::load("/definitely/not/here/pong.json");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!("pong-pinball-{}.json", std::process::id()));
        let mut settings = Settings::default();
        settings.ai.twitchy = true;
        settings.net.loopback.drop_percent = 10;
        settings.save(&path).unwrap();
        assert_eq!(Settings::try_load(&path).unwrap(), settings);
        let _ = std::fs::remove_file(&path);
    }
}
