//! Service configuration.
//!
//! Settings are read from an optional `exotransit.toml` file and then
//! overridden by environment variables. Every field has a default, so the
//! service starts with no configuration at all.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::models::DEFAULT_THRESHOLD;

/// Errors while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {message}")]
    InvalidEnv { key: String, message: String },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub remote: RemoteSettings,
    #[serde(default)]
    pub lightcurve: LightCurveSettings,
    #[serde(default)]
    pub detection: DetectionSettings,
    #[serde(default)]
    pub plots: PlotSettings,
}

/// Bind address for the HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Remote services and network policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Exoplanet Archive TAP base URL (the `/sync` suffix is appended)
    #[serde(default = "default_tap_url")]
    pub tap_url: String,
    /// MAST root URL; the portal API paths are appended
    #[serde(default = "default_mast_url")]
    pub mast_url: String,
    /// Timeout applied to every outbound call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Cone radius for the MAST observation search, in degrees
    #[serde(default = "default_search_radius_deg")]
    pub search_radius_deg: f64,
}

/// Light-curve product selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightCurveSettings {
    #[serde(default = "default_mission")]
    pub mission: String,
    #[serde(default = "default_flux_column")]
    pub flux_column: String,
    /// Cadences whose quality flags intersect this mask are dropped
    #[serde(default = "default_quality_bitmask")]
    pub quality_bitmask: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSettings {
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,
}

/// How plot files are named on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactNaming {
    /// One file per request, keyed by a hash of the request
    PerRequest,
    /// A single `latest_plot.png` shared by every request (last writer wins)
    Shared,
}

impl FromStr for ArtifactNaming {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "per-request" | "per_request" | "unique" => Ok(ArtifactNaming::PerRequest),
            "shared" | "latest" => Ok(ArtifactNaming::Shared),
            other => Err(format!(
                "unknown plot naming '{}', use per-request or shared",
                other
            )),
        }
    }
}

/// Plot output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotSettings {
    #[serde(default = "default_plots_dir")]
    pub dir: PathBuf,
    /// URL path the plots directory is served under
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    #[serde(default = "default_naming")]
    pub naming: ArtifactNaming,
    /// Per-request plots kept on disk; older ones are pruned
    #[serde(default = "default_max_retained")]
    pub max_retained: usize,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_tap_url() -> String {
    "https://exoplanetarchive.ipac.caltech.edu/TAP".to_string()
}

fn default_mast_url() -> String {
    "https://mast.stsci.edu".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_search_radius_deg() -> f64 {
    0.0001
}

fn default_mission() -> String {
    "Kepler".to_string()
}

fn default_flux_column() -> String {
    "PDCSAP_FLUX".to_string()
}

fn default_quality_bitmask() -> u32 {
    // Kepler "default" quality mask
    1130799
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_plots_dir() -> PathBuf {
    PathBuf::from("static").join("plots")
}

fn default_url_prefix() -> String {
    "/static/plots".to_string()
}

fn default_naming() -> ArtifactNaming {
    ArtifactNaming::PerRequest
}

fn default_max_retained() -> usize {
    64
}

fn default_width() -> u32 {
    1000
}

fn default_height() -> u32 {
    500
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            tap_url: default_tap_url(),
            mast_url: default_mast_url(),
            timeout_secs: default_timeout_secs(),
            search_radius_deg: default_search_radius_deg(),
        }
    }
}

impl Default for LightCurveSettings {
    fn default() -> Self {
        Self {
            mission: default_mission(),
            flux_column: default_flux_column(),
            quality_bitmask: default_quality_bitmask(),
        }
    }
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            default_threshold: default_threshold(),
        }
    }
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            dir: default_plots_dir(),
            url_prefix: default_url_prefix(),
            naming: default_naming(),
            max_retained: default_max_retained(),
            width: default_width(),
            height: default_height(),
        }
    }
}

impl RemoteSettings {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from the first `exotransit.toml` found in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    ///
    /// Falls back to defaults when no file exists.
    pub fn from_default_location() -> Result<Self, ConfigError> {
        let search_paths = [
            PathBuf::from("exotransit.toml"),
            PathBuf::from("backend/exotransit.toml"),
            PathBuf::from("../exotransit.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Resolve the full configuration: file (explicit via `EXOTRANSIT_CONFIG`
    /// or the default search) followed by environment overrides.
    ///
    /// # Environment Variables
    /// - `EXOTRANSIT_CONFIG`: explicit config file path
    /// - `HOST`, `PORT`: bind address
    /// - `EXOTRANSIT_PLOTS_DIR`: plot output directory
    /// - `EXOTRANSIT_PLOT_NAMING`: `per-request` | `shared`
    /// - `EXOTRANSIT_TIMEOUT_SECS`: outbound request timeout
    /// - `EXOTRANSIT_MISSION`: light-curve mission filter
    /// - `EXOTRANSIT_TAP_URL`, `EXOTRANSIT_MAST_URL`: remote endpoints
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var("EXOTRANSIT_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ => Self::from_default_location()?,
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Apply environment overrides on top of the current values.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = env::var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_env::<u16>("PORT")? {
            self.server.port = port;
        }
        if let Ok(dir) = env::var("EXOTRANSIT_PLOTS_DIR") {
            self.plots.dir = PathBuf::from(dir);
        }
        if let Some(naming) = parse_env::<ArtifactNaming>("EXOTRANSIT_PLOT_NAMING")? {
            self.plots.naming = naming;
        }
        if let Some(timeout) = parse_env::<u64>("EXOTRANSIT_TIMEOUT_SECS")? {
            self.remote.timeout_secs = timeout;
        }
        if let Ok(mission) = env::var("EXOTRANSIT_MISSION") {
            self.lightcurve.mission = mission;
        }
        if let Ok(url) = env::var("EXOTRANSIT_TAP_URL") {
            self.remote.tap_url = url;
        }
        if let Ok(url) = env::var("EXOTRANSIT_MAST_URL") {
            self.remote.mast_url = url;
        }
        Ok(())
    }
}

fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidEnv {
                key: key.to_string(),
                message: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.remote.timeout_secs, 30);
        assert_eq!(config.lightcurve.mission, "Kepler");
        assert_eq!(config.detection.default_threshold, 0.995);
        assert_eq!(config.plots.naming, ArtifactNaming::PerRequest);
        assert_eq!(config.plots.url_prefix, "/static/plots");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [remote]
            timeout_secs = 10

            [plots]
            naming = "shared"
            "#,
        )
        .unwrap();

        assert_eq!(config.remote.timeout_secs, 10);
        assert_eq!(config.remote.tap_url, default_tap_url());
        assert_eq!(config.plots.naming, ArtifactNaming::Shared);
        assert_eq!(config.plots.max_retained, 64);
        assert_eq!(config.lightcurve.flux_column, "PDCSAP_FLUX");
    }

    #[test]
    fn test_from_file_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exotransit.toml");
        fs::write(&path, "[server\nport = 1").unwrap();

        let err = AppConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_artifact_naming_from_str() {
        assert_eq!("shared".parse::<ArtifactNaming>(), Ok(ArtifactNaming::Shared));
        assert_eq!(
            "Per-Request".parse::<ArtifactNaming>(),
            Ok(ArtifactNaming::PerRequest)
        );
        assert!("sometimes".parse::<ArtifactNaming>().is_err());
    }
}
