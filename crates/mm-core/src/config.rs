use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_DB_PATH: &str = ".motomap/detections.db";
pub const DEFAULT_RECENT_LIMIT: u32 = 200;
pub const MAX_RECENT_LIMIT: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub db_path: String,
    pub host: String,
    pub port: u16,
    /// Number of physical spots in the lot. Not derived from data.
    pub total_spots: u32,
    pub recent_limit: u32,
    pub recent_plates_limit: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            host: "127.0.0.1".to_string(),
            port: 5000,
            total_spots: 4,
            recent_limit: DEFAULT_RECENT_LIMIT,
            recent_plates_limit: 10,
        }
    }
}

/// The part of [`Settings`] the occupancy projection needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccupancySettings {
    pub total_spots: u32,
    pub recent_plates_limit: u32,
}

impl Default for OccupancySettings {
    fn default() -> Self {
        Settings::default().occupancy()
    }
}

impl Settings {
    /// Reads settings from `path` and applies `MOTOMAP_*` environment
    /// overrides. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Like [`Settings::load`], resolving overrides through `lookup`.
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = match fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    message: err.to_string(),
                });
            }
        };
        settings.apply_env(lookup)?;
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Invalid {
            message: err.to_string(),
        })
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("MOTOMAP_DB_PATH") {
            self.db_path = value;
        }
        if let Some(value) = lookup("MOTOMAP_HOST") {
            self.host = value;
        }
        if let Some(value) = lookup("MOTOMAP_PORT") {
            self.port = parse_env("MOTOMAP_PORT", &value)?;
        }
        if let Some(value) = lookup("MOTOMAP_TOTAL_SPOTS") {
            self.total_spots = parse_env("MOTOMAP_TOTAL_SPOTS", &value)?;
        }
        Ok(())
    }

    pub fn occupancy(&self) -> OccupancySettings {
        OccupancySettings {
            total_spots: self.total_spots,
            recent_plates_limit: self.recent_plates_limit,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        message: format!("{key} has invalid value {value:?}"),
    })
}
