// Configuration management
//
// Runtime settings live in `portatil.toml` next to the executable. Missing
// files produce the defaults (and a freshly written file), so first runs
// need no setup.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;

/// Default configuration file path.
const CONFIG_FILE: &str = "portatil.toml";

/// User-facing runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Storage settings
    pub storage: StorageConfig,

    /// Video settings
    pub video: VideoConfig,

    /// Audio settings
    pub audio: AudioConfig,

    /// Diagnostics settings
    pub diagnostics: DiagnosticsConfig,
}

/// Where the console's filesystem lives on the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory served as the storage root
    pub root: PathBuf,
}

/// Video configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Window scale (1-8)
    pub scale: u32,

    /// Enable VSync
    pub vsync: bool,
}

/// Audio configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Enable audio output
    pub enabled: bool,

    /// Master volume (0-100)
    pub volume: u8,
}

/// Diagnostics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Show the in-game performance overlay
    pub show_stats: bool,

    /// Directory screenshots are written to
    pub screenshot_directory: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            storage: StorageConfig {
                root: PathBuf::from("storage"),
            },
            video: VideoConfig {
                scale: 4,
                vsync: true,
            },
            audio: AudioConfig {
                enabled: true,
                volume: 100,
            },
            diagnostics: DiagnosticsConfig {
                show_stats: false,
                screenshot_directory: PathBuf::from("screenshots"),
            },
        }
    }
}

impl RuntimeConfig {
    /// Load the configuration, falling back to (and saving) the defaults.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|_| {
            let config = Self::default();
            // Write the defaults out so the user has a file to edit, but
            // run fine without one.
            let _ = config.save();
            config
        })
    }

    /// Load the configuration from `portatil.toml`.
    pub fn load() -> Result<Self, io::Error> {
        let contents = fs::read_to_string(CONFIG_FILE)?;
        toml::from_str(&contents).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Save the configuration to `portatil.toml`.
    pub fn save(&self) -> Result<(), io::Error> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(CONFIG_FILE, contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert_eq!(config.video.scale, 4);
        assert_eq!(config.audio.volume, 100);
        assert!(!config.diagnostics.show_stats);
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = RuntimeConfig::default();
        let toml_text = toml::to_string(&config).expect("failed to serialize");
        let decoded: RuntimeConfig = toml::from_str(&toml_text).expect("failed to deserialize");

        assert_eq!(config.video.scale, decoded.video.scale);
        assert_eq!(config.audio.volume, decoded.audio.volume);
        assert_eq!(config.storage.root, decoded.storage.root);
    }
}
