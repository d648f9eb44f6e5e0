//! Audio manager configuration.
//!
//! Pool sizing, unlock policy, mixer parameter names, and starting bus levels.
//! Configuration can be loaded from and saved to a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tinysound_common::{AudioError, AudioResult, MUTE_FLOOR_DB};
use tinysound_kernel::BusRouting;
use tracing::{info, warn};

/// Configuration file name.
const CONFIG_FILE: &str = "tinysound.toml";

/// Audio manager configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioManagerConfig {
    // === Voice Pool ===
    /// Voices created up front
    pub initial_voices: usize,
    /// Hard cap on pool voices
    pub max_voices: usize,
    /// Evict the oldest busy voice when the pool is exhausted
    pub steal_oldest_when_full: bool,

    // === Platform ===
    /// Block all playback until `unlock_playback` is called
    pub require_unlock: bool,

    // === Mixer Parameters ===
    /// Parameter driven by the master bus
    pub master_parameter: String,
    /// Parameter driven by the music bus
    pub music_parameter: String,
    /// Parameter driven by the sound-effects bus
    pub sound_parameter: String,
    /// Decibel level written for silence
    pub mute_floor_db: f32,

    // === Starting Levels ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Music volume (0.0 - 1.0)
    pub music_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sound_volume: f32,

    // === Randomness ===
    /// Pitch jitter seed (None = random)
    pub rng_seed: Option<u64>,
}

impl Default for AudioManagerConfig {
    fn default() -> Self {
        let routing = BusRouting::default();
        Self {
            // Pool
            initial_voices: 16,
            max_voices: 32,
            steal_oldest_when_full: true,

            // Platform
            require_unlock: false,

            // Mixer
            master_parameter: routing.master,
            music_parameter: routing.music,
            sound_parameter: routing.sound,
            mute_floor_db: MUTE_FLOOR_DB,

            // Levels
            master_volume: 1.0,
            music_volume: 1.0,
            sound_volume: 1.0,

            rng_seed: None,
        }
    }
}

impl AudioManagerConfig {
    /// Load configuration from the default file location.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Audio config not found, using defaults");
            return Self::default();
        }

        let mut contents = String::new();
        if let Err(e) = fs::File::open(path).and_then(|mut f| f.read_to_string(&mut contents)) {
            warn!("Failed to read audio config: {e}");
            return Self::default();
        }

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                config.validate();
                info!("Loaded audio config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse audio config: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to the default file location.
    pub fn save(&self) -> AudioResult<()> {
        self.save_to(Self::config_path())
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> AudioResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| AudioError::Config(e.to_string()))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved audio config to {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn config_path() -> PathBuf {
        if let Some(config_dir) = dirs_config_path() {
            config_dir.join("tinysound").join(CONFIG_FILE)
        } else {
            PathBuf::from(CONFIG_FILE)
        }
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        // Pool
        self.max_voices = self.max_voices.max(1);
        self.initial_voices = self.initial_voices.min(self.max_voices);

        // Levels
        self.master_volume = self.master_volume.clamp(0.0, 1.0);
        self.music_volume = self.music_volume.clamp(0.0, 1.0);
        self.sound_volume = self.sound_volume.clamp(0.0, 1.0);

        // A positive floor would be louder than unity gain
        if !self.mute_floor_db.is_finite() || self.mute_floor_db > 0.0 {
            self.mute_floor_db = MUTE_FLOOR_DB;
        }
    }

    /// Mixer parameter names as a routing table.
    #[must_use]
    pub fn routing(&self) -> BusRouting {
        BusRouting {
            master: self.master_parameter.clone(),
            music: self.music_parameter.clone(),
            sound: self.sound_parameter.clone(),
        }
    }
}

/// Get platform-specific config directory.
fn dirs_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join("Library/Application Support"))
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AudioManagerConfig::default();
        assert_eq!(config.initial_voices, 16);
        assert_eq!(config.max_voices, 32);
        assert!(config.steal_oldest_when_full);
        assert!(!config.require_unlock);
        assert_eq!(config.music_parameter, "MusicVolume");
        assert!((config.mute_floor_db - -80.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_config_validation() {
        let mut config = AudioManagerConfig {
            initial_voices: 50,
            max_voices: 0,
            master_volume: 2.0,
            sound_volume: -1.0,
            mute_floor_db: 6.0,
            ..Default::default()
        };

        config.validate();

        assert_eq!(config.max_voices, 1);
        assert_eq!(config.initial_voices, 1);
        assert!((config.master_volume - 1.0).abs() < f32::EPSILON);
        assert!(config.sound_volume.abs() < f32::EPSILON);
        assert!((config.mute_floor_db - MUTE_FLOOR_DB).abs() < f32::EPSILON);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("audio.toml");

        let config = AudioManagerConfig {
            max_voices: 8,
            require_unlock: true,
            music_parameter: "Soundtrack".to_string(),
            rng_seed: Some(7),
            ..Default::default()
        };
        config.save_to(&config_path).expect("Failed to save config");

        let loaded = AudioManagerConfig::load_from(&config_path);
        assert_eq!(loaded.max_voices, 8);
        assert!(loaded.require_unlock);
        assert_eq!(loaded.music_parameter, "Soundtrack");
        assert_eq!(loaded.rng_seed, Some(7));
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = AudioManagerConfig::load_from("/nonexistent/path/tinysound.toml");
        assert_eq!(config, AudioManagerConfig::default());
    }

    #[test]
    fn test_config_load_invalid_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("broken.toml");
        fs::write(&config_path, "max_voices = \"lots\"").expect("write");

        let config = AudioManagerConfig::load_from(&config_path);
        assert_eq!(config, AudioManagerConfig::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AudioManagerConfig =
            toml::from_str("max_voices = 4\nsteal_oldest_when_full = false").expect("parse");
        assert_eq!(config.max_voices, 4);
        assert!(!config.steal_oldest_when_full);
        assert_eq!(config.initial_voices, 16);
    }

    #[test]
    fn test_routing_from_config() {
        let config = AudioManagerConfig::default();
        assert_eq!(config.routing(), BusRouting::default());
    }
}
