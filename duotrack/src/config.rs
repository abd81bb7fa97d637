//! Configuration loading.
//!
//! Resolution order for the config file:
//! 1. explicit path (`--config`)
//! 2. `DUOTRACK_CONFIG` environment variable
//! 3. `<config dir>/duotrack/config.toml`
//! 4. built-in defaults
//!
//! `DUOTRACK_DATA` overrides where the local store file lives.
use duotrack_core::{geo::Coordinates, Error, Result};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info};

pub const CONFIG_ENV: &str = "DUOTRACK_CONFIG";
pub const DATA_ENV: &str = "DUOTRACK_DATA";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Quiet time after the last keystroke before a suggestion lookup fires.
    pub debounce_ms: u64,
    pub min_query_len: usize,
    pub suggestion_limit: usize,
    pub nearby_radius_m: u32,
    pub user_agent: String,
    pub nominatim_url: String,
    pub photon_url: String,
    pub overpass_url: String,
    pub ipapi_url: String,
    /// Last resort when neither pasted coordinates nor the IP lookup give a location.
    pub home: Option<Coordinates>,
    pub data_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce_ms: 350,
            min_query_len: 3,
            suggestion_limit: 8,
            nearby_radius_m: 1000,
            user_agent: format!("duotrack/{}", env!("CARGO_PKG_VERSION")),
            nominatim_url: "https://nominatim.openstreetmap.org".to_string(),
            photon_url: "https://photon.komoot.io".to_string(),
            overpass_url: "https://overpass-api.de".to_string(),
            ipapi_url: "https://ipapi.co/json/".to_string(),
            home: None,
            data_file: None,
        }
    }
}

impl Config {
    pub fn from_toml(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.min_query_len == 0 {
            return Err(Error::Config("min_query_len must be at least 1".to_string()));
        }
        if self.suggestion_limit == 0 {
            return Err(Error::Config("suggestion_limit must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Load from `path`, the environment, or the platform config directory, in that order.
    ///
    /// # Errors
    /// Errors if an explicitly named file (argument or environment) cannot be read or
    /// parsed. A missing file in the platform config directory just means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        if let Some(path) = explicit {
            info!("loading config from {}", path.display());
            let text = std::fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
            return Self::from_toml(&text);
        }

        match Self::default_path() {
            Some(path) if path.exists() => {
                info!("loading config from {}", path.display());
                Self::from_toml(&std::fs::read_to_string(&path)?)
            }
            _ => {
                debug!("no config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("duotrack").join("config.toml"))
    }

    /// Where the local store file lives.
    pub fn data_path(&self) -> PathBuf {
        std::env::var_os(DATA_ENV)
            .map(PathBuf::from)
            .or_else(|| self.data_file.clone())
            .or_else(|| dirs::data_local_dir().map(|d| d.join("duotrack").join("store.json")))
            .unwrap_or_else(|| PathBuf::from("duotrack.json"))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
