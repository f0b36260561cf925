//! Endpoint and fetch configuration
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit path, if the caller gives one (must exist)
//! 2. Otherwise an override in the data dir (~/.local/share/recon/config/recon.toml)
//! 3. Otherwise the embedded defaults (compiled into binary)
//!
//! `RECON_RESULTS_URL` then replaces `endpoints.results_url` when set.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/recon.toml");

/// Environment variable overriding the result-set URL
pub const RESULTS_URL_ENV: &str = "RECON_RESULTS_URL";

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_UPLOAD_URL: &str = "http://localhost:5678/webhook/upload-files";
const DEFAULT_PROCESSING_URL: &str = "http://localhost:5678/webhook/invoice-processing";
const DEFAULT_RESULTS_URL: &str = "http://localhost:5678/webhook/invoice";

/// The three reconciliation-service endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub upload_url: String,
    pub processing_url: String,
    pub results_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            processing_url: DEFAULT_PROCESSING_URL.to_string(),
            results_url: DEFAULT_RESULTS_URL.to_string(),
        }
    }
}

/// Which service backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Http,
    Mock,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Mock => "mock",
        }
    }
}

/// Where the active config came from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Embedded,
    File(PathBuf),
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Embedded => write!(f, "embedded defaults"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub endpoints: Endpoints,
    /// Ceiling for fetches started without a caller-supplied signal
    pub fetch_timeout: Duration,
    pub backend: Backend,
    pub source: ConfigSource,
    /// Set when the results URL came from the environment
    pub results_url_from_env: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            backend: Backend::default(),
            source: ConfigSource::default(),
            results_url_from_env: false,
        }
    }
}

impl Config {
    /// Load configuration using the process environment
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_with_env(explicit, |name| std::env::var(name).ok())
    }

    /// Load configuration with a custom environment lookup
    pub fn load_with_env<F>(explicit: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                load_file(path)?
            }
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => load_file(&path)?,
                None => parse_config(DEFAULT_CONFIG)?,
            },
        };

        if let Some(url) = env(RESULTS_URL_ENV).filter(|u| !u.trim().is_empty()) {
            tracing::debug!("Results URL overridden by {}", RESULTS_URL_ENV);
            config.endpoints.results_url = url.trim().to_string();
            config.results_url_from_env = true;
        }

        Ok(config)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("recon").join("config").join("recon.toml"))
}

fn load_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    let mut config = parse_config(&content).map_err(|e| match e {
        Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
        other => other,
    })?;
    config.source = ConfigSource::File(path.to_path_buf());
    Ok(config)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    endpoints: Option<RawEndpoints>,
    fetch: Option<RawFetch>,
    service: Option<RawService>,
}

#[derive(Debug, Deserialize)]
struct RawEndpoints {
    upload_url: Option<String>,
    processing_url: Option<String>,
    results_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFetch {
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawService {
    backend: Option<String>,
}

/// Parse config from TOML content
fn parse_config(content: &str) -> Result<Config> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = Config::default();

    if let Some(endpoints) = raw.endpoints {
        if let Some(url) = endpoints.upload_url {
            config.endpoints.upload_url = url;
        }
        if let Some(url) = endpoints.processing_url {
            config.endpoints.processing_url = url;
        }
        if let Some(url) = endpoints.results_url {
            config.endpoints.results_url = url;
        }
    }

    if let Some(timeout) = raw.fetch.and_then(|f| f.timeout_secs) {
        if timeout == 0 {
            return Err(Error::Config("fetch.timeout_secs must be positive".to_string()));
        }
        config.fetch_timeout = Duration::from_secs(timeout);
    }

    if let Some(backend) = raw.service.and_then(|s| s.backend) {
        config.backend = match backend.trim().to_lowercase().as_str() {
            "http" => Backend::Http,
            "mock" => Backend::Mock,
            other => {
                return Err(Error::Config(format!(
                    "Unknown service backend '{}' (expected http or mock)",
                    other
                )))
            }
        };
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_parse_default_config() {
        let config = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.endpoints, Endpoints::default());
        assert_eq!(config.fetch_timeout, DEFAULT_FETCH_TIMEOUT);
        assert_eq!(config.backend, Backend::Http);
    }

    #[test]
    fn test_missing_keys_fall_back() {
        let config = parse_config("[endpoints]\nresults_url = \"http://svc/results\"\n").unwrap();
        assert_eq!(config.endpoints.results_url, "http://svc/results");
        assert_eq!(config.endpoints.upload_url, DEFAULT_UPLOAD_URL);
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_empty_config_is_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.endpoints, Endpoints::default());
        assert_eq!(config.fetch_timeout, DEFAULT_FETCH_TIMEOUT);
    }

    #[test]
    fn test_timeout_and_backend() {
        let config = parse_config("[fetch]\ntimeout_secs = 3\n[service]\nbackend = \"Mock\"\n")
            .unwrap();
        assert_eq!(config.fetch_timeout, Duration::from_secs(3));
        assert_eq!(config.backend, Backend::Mock);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = parse_config("[fetch]\ntimeout_secs = 0\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let err = parse_config("[service]\nbackend = \"grpc\"\n").unwrap_err();
        assert!(err.to_string().contains("grpc"));

        let err = parse_config("[endpoints\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[endpoints]\nupload_url = \"http://files/up\"").unwrap();

        let config = Config::load_with_env(Some(file.path()), no_env).unwrap();
        assert_eq!(config.endpoints.upload_url, "http://files/up");
        assert_eq!(config.source, ConfigSource::File(file.path().to_path_buf()));
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let err = Config::load_with_env(Some(Path::new("/nonexistent/recon.toml")), no_env)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_malformed_file_names_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not toml = = =").unwrap();

        let err = Config::load_with_env(Some(file.path()), no_env).unwrap_err();
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_env_overrides_results_url() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[fetch]\ntimeout_secs = 5").unwrap();

        let config = Config::load_with_env(Some(file.path()), |name| {
            (name == RESULTS_URL_ENV).then(|| " http://env/results ".to_string())
        })
        .unwrap();
        assert_eq!(config.endpoints.results_url, "http://env/results");
        assert!(config.results_url_from_env);
    }

    #[test]
    fn test_blank_env_ignored() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file).unwrap();

        let config =
            Config::load_with_env(Some(file.path()), |_| Some("   ".to_string())).unwrap();
        assert_eq!(config.endpoints.results_url, DEFAULT_RESULTS_URL);
        assert!(!config.results_url_from_env);
    }

    #[test]
    fn test_source_display() {
        assert_eq!(ConfigSource::Embedded.to_string(), "embedded defaults");
    }
}
