use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SurveyError};
use crate::geometry::grid::{DEFAULT_SPACING, GridOptions, GridShape, LatticeAnchor};

/// Environment variable consulted when no tide token is configured
pub const TIDE_TOKEN_ENV: &str = "MAREA_API_TOKEN";

/// Range of the spacing control, in degrees
pub const MIN_SPACING: f64 = 0.0001;
pub const MAX_SPACING: f64 = 0.01;

fn default_spacing() -> f64 {
    DEFAULT_SPACING
}
fn default_tide_url() -> String {
    "https://api.marea.ooo".to_string()
}
fn default_tide_duration() -> u32 {
    1440
}
fn default_tide_interval() -> u32 {
    60
}
fn default_tide_model() -> String {
    "FES2014".to_string()
}
fn default_tide_datum() -> String {
    "MSL".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_location_interval_ms() -> u64 {
    5000
}
fn default_location_distance_m() -> f64 {
    10.0
}
fn default_compass_interval_ms() -> u64 {
    500
}

/// Contents of `mangrove.toml`. Every section is optional.
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub tide: TideConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub verbose: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GridConfig {
    #[serde(default = "default_spacing")]
    pub spacing: f64,
    #[serde(default)]
    pub shape: GridShape,
    #[serde(default)]
    pub anchor: LatticeAnchor,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            spacing: default_spacing(),
            shape: GridShape::default(),
            anchor: LatticeAnchor::default(),
        }
    }
}

impl GridConfig {
    pub fn options(&self) -> GridOptions {
        GridOptions::new(self.spacing, self.shape).with_anchor(self.anchor)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TideConfig {
    #[serde(default = "default_tide_url")]
    pub base_url: String,
    /// Falls back to `MAREA_API_TOKEN`
    #[serde(default)]
    pub token: Option<String>,
    /// Window length in minutes
    #[serde(default = "default_tide_duration")]
    pub duration: u32,
    /// Sampling interval in minutes
    #[serde(default = "default_tide_interval")]
    pub interval: u32,
    #[serde(default = "default_tide_model")]
    pub model: String,
    #[serde(default = "default_tide_datum")]
    pub datum: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Used when no position is given on the command line
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Default for TideConfig {
    fn default() -> Self {
        Self {
            base_url: default_tide_url(),
            token: None,
            duration: default_tide_duration(),
            interval: default_tide_interval(),
            model: default_tide_model(),
            datum: default_tide_datum(),
            timeout_secs: default_timeout_secs(),
            latitude: None,
            longitude: None,
        }
    }
}

impl TideConfig {
    /// Configured token, else the environment
    pub fn resolve_token(&self) -> Result<String> {
        self.token
            .clone()
            .or_else(|| std::env::var(TIDE_TOKEN_ENV).ok())
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                SurveyError::Config(format!(
                    "no tide API token: set [tide].token or {}",
                    TIDE_TOKEN_ENV
                ))
            })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Realtime database root, e.g. `https://<project>-default-rtdb.firebaseio.com`
    #[serde(default)]
    pub database_url: Option<String>,
    /// Database secret or ID token appended as `?auth=`
    #[serde(default)]
    pub auth: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            auth: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    /// Minimum time between forwarded location fixes
    #[serde(default = "default_location_interval_ms")]
    pub location_interval_ms: u64,
    /// Minimum movement between forwarded location fixes
    #[serde(default = "default_location_distance_m")]
    pub location_distance_m: f64,
    /// Pace of compass samples
    #[serde(default = "default_compass_interval_ms")]
    pub compass_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            location_interval_ms: default_location_interval_ms(),
            location_distance_m: default_location_distance_m(),
            compass_interval_ms: default_compass_interval_ms(),
        }
    }
}

impl FileConfig {
    /// Search the default locations and return the first config that parses
    pub fn load() -> Option<Self> {
        for path in get_config_paths() {
            if path.exists()
                && let Ok(contents) = std::fs::read_to_string(&path)
            {
                match toml::from_str(&contents) {
                    Ok(config) => {
                        tracing::debug!(path = %path.display(), "loaded config");
                        return Some(config);
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "failed to parse config file"
                        );
                    }
                }
            }
        }
        None
    }

    /// Load an explicitly named config file
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SurveyError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| SurveyError::Config(format!("{}: {}", path.display(), e)))
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("mangrove.toml"));
    paths.push(PathBuf::from(".mangrove.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("mangrove").join("config.toml"));
        paths.push(config_dir.join("mangrove.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".mangrove.toml"));
        paths.push(home.join(".config").join("mangrove").join("config.toml"));
    }

    paths
}
