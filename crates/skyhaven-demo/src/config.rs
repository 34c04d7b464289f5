//! Demo configuration, read from `resources/skyhaven.toml`.
//!
//! Every section is optional; missing keys fall back to the built-in defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use skyhaven_engine::render::BloomSettings;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DemoConfig {
    pub window: WindowConfig,
    pub resources: ResourceConfig,
    pub bloom: BloomConfig,
    pub camera: CameraConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: f64,
    pub height: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "skyhaven".to_string(),
            width: 800.0,
            height: 600.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub state_file: PathBuf,
    pub scene_file: PathBuf,
    /// Cubemap faces in +X, -X, +Y, -Y, +Z, -Z order.
    pub skybox: [PathBuf; 6],
    /// TrueType/OpenType font for overlay labels; common system fonts are
    /// tried when unset or unreadable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<PathBuf>,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        let face = |name: &str| PathBuf::from(format!("resources/textures/yonder_{name}.jpg"));
        Self {
            state_file: PathBuf::from("resources/program_state.txt"),
            scene_file: PathBuf::from("resources/scene.toml"),
            skybox: [face("lf"), face("rt"), face("up"), face("dn"), face("ft"), face("bk")],
            font: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BloomConfig {
    pub enabled: bool,
    pub exposure: f32,
    pub threshold: f32,
    pub iterations: u32,
}

impl Default for BloomConfig {
    fn default() -> Self {
        let d = BloomSettings::default();
        Self {
            enabled: d.enabled,
            exposure: d.exposure,
            threshold: d.threshold,
            iterations: d.iterations,
        }
    }
}

impl BloomConfig {
    pub fn settings(&self) -> BloomSettings {
        BloomSettings {
            enabled: self.enabled,
            exposure: self.exposure,
            threshold: self.threshold,
            iterations: self.iterations,
            ..BloomSettings::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraConfig {
    pub speed: f32,
    pub sensitivity: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            speed: skyhaven_engine::camera::DEFAULT_SPEED,
            sensitivity: skyhaven_engine::camera::DEFAULT_SENSITIVITY,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl DemoConfig {
    pub fn from_toml(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads `path`; `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(path, &text).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Like [`DemoConfig::load`], but any failure degrades to defaults.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(Some(config)) => {
                log::info!("loaded config from {}", path.display());
                config
            }
            Ok(None) => {
                log::debug!("no config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                log::error!("{e}; using defaults");
                Self::default()
            }
        }
    }
}
