//! Configuration for fleetd.
//!
//! Built once at startup from defaults, an optional TOML file and the
//! process environment (in that order of precedence), then shared read-only.

use crate::error::ReportError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/fleetd/config.toml";

pub const ENV_CONFIG_PATH: &str = "FLEETD_CONFIG";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_MODEL: &str = "OPENAI_MODEL";
pub const ENV_TIMEOUT: &str = "OPENAI_TIMEOUT";
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_MODE: &str = "FLEETD_MODE";
pub const ENV_LISTEN: &str = "FLEETD_LISTEN";

/// Where report sections come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Always answer with the fixed placeholder section
    #[default]
    Stub,
    /// Ask the completion service for the sections
    Live,
}

impl GenerationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationMode::Stub => "stub",
            GenerationMode::Live => "live",
        }
    }
}

impl FromStr for GenerationMode {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stub" => Ok(GenerationMode::Stub),
            "live" => Ok(GenerationMode::Live),
            other => Err(ReportError::Configuration(format!(
                "unknown generation mode '{}' (expected 'stub' or 'live')",
                other
            ))),
        }
    }
}

// Same parsing rules for the config file and FLEETD_MODE
impl<'de> Deserialize<'de> for GenerationMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Completion service credential; only required in live mode
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// Completion request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default)]
    pub mode: GenerationMode,

    /// Listen address for the HTTP server
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_listen() -> String {
    "127.0.0.1:8000".to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            timeout_ms: default_timeout_ms(),
            api_base: default_api_base(),
            mode: GenerationMode::default(),
            listen: default_listen(),
        }
    }
}

impl fmt::Debug for ReportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("timeout_ms", &self.timeout_ms)
            .field("api_base", &self.api_base)
            .field("mode", &self.mode)
            .field("listen", &self.listen)
            .finish()
    }
}

impl ReportConfig {
    /// Load from the config file (if any) and the process environment
    pub fn load() -> Result<Self, ReportError> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(CONFIG_PATH));

        let base = if path.exists() {
            info!("Loading config from {}", path.display());
            Self::from_file(&path)?
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        base.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self, ReportError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ReportError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            ReportError::Configuration(format!("cannot parse {}: {}", path.display(), e))
        })
    }

    /// Apply environment-style overrides. `lookup` returns the value of a variable.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ReportError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.model = model;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT) {
            self.timeout_ms = timeout.trim().parse().map_err(|_| {
                ReportError::Configuration(format!(
                    "{} must be a whole number of milliseconds, got '{}'",
                    ENV_TIMEOUT, timeout
                ))
            })?;
        }
        if let Some(base) = lookup(ENV_BASE_URL) {
            self.api_base = base;
        }
        if let Some(mode) = lookup(ENV_MODE) {
            self.mode = mode.parse()?;
        }
        if let Some(listen) = lookup(ENV_LISTEN) {
            self.listen = listen;
        }

        // An empty credential counts as unset
        if self.api_key.as_deref().map(str::trim) == Some("") {
            self.api_key = None;
        }
        if self.timeout_ms == 0 {
            return Err(ReportError::Configuration(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ReportConfig::default();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.mode, GenerationMode::Stub);
        assert!(!config.has_credential());
    }

    #[test]
    fn test_env_overrides() {
        let config = ReportConfig::default()
            .apply_overrides(lookup_from(&[
                (ENV_API_KEY, "sk-test"),
                (ENV_MODEL, "gpt-4o"),
                (ENV_TIMEOUT, "1500"),
                (ENV_MODE, "LIVE"),
            ]))
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.timeout_ms, 1500);
        assert_eq!(config.mode, GenerationMode::Live);
    }

    #[test]
    fn test_blank_key_is_unset() {
        let config = ReportConfig::default()
            .apply_overrides(lookup_from(&[(ENV_API_KEY, "  ")]))
            .unwrap();
        assert!(!config.has_credential());
    }

    #[test]
    fn test_bad_values_fail_fast() {
        let err = ReportConfig::default()
            .apply_overrides(lookup_from(&[(ENV_TIMEOUT, "soon")]))
            .unwrap_err();
        assert!(matches!(err, ReportError::Configuration(_)));

        let err = ReportConfig::default()
            .apply_overrides(lookup_from(&[(ENV_MODE, "turbo")]))
            .unwrap_err();
        assert!(err.to_string().contains("turbo"));

        assert!(ReportConfig::default()
            .apply_overrides(lookup_from(&[(ENV_TIMEOUT, "0")]))
            .is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let mut config = ReportConfig::default();
        config.api_key = Some("sk-very-secret".into());
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "model = \"gpt-4.1\"\nmode = \"live\"\ntimeout_ms = 5000").unwrap();

        let config = ReportConfig::from_file(file.path()).unwrap();
        assert_eq!(config.model, "gpt-4.1");
        assert_eq!(config.mode, GenerationMode::Live);
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.api_base, "https://api.openai.com/v1");
    }

    #[test]
    fn test_file_mode_matches_env_parsing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mode = \"LIVE\"").unwrap();
        assert_eq!(
            ReportConfig::from_file(file.path()).unwrap().mode,
            GenerationMode::Live
        );

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mode = \"turbo\"").unwrap();
        let err = ReportConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("turbo"));
    }

    #[test]
    fn test_serialized_config_omits_key() {
        let config = ReportConfig {
            api_key: Some("sk-very-secret".into()),
            ..ReportConfig::default()
        };
        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("sk-very-secret"));
        assert!(!rendered.contains("api_key"));
        assert!(rendered.contains("mode = \"stub\""));
    }

    #[test]
    fn test_from_file_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timeout_ms = \"fast\"").unwrap();
        assert!(matches!(
            ReportConfig::from_file(file.path()),
            Err(ReportError::Configuration(_))
        ));
    }

    #[test]
    #[serial]
    fn test_load_reads_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "model = \"from-file\"\nlisten = \"0.0.0.0:9000\"\n").unwrap();

        std::env::set_var(ENV_CONFIG_PATH, &path);
        std::env::set_var(ENV_MODEL, "from-env");
        let config = ReportConfig::load();
        std::env::remove_var(ENV_CONFIG_PATH);
        std::env::remove_var(ENV_MODEL);

        let config = config.unwrap();
        assert_eq!(config.model, "from-env");
        assert_eq!(config.listen, "0.0.0.0:9000");
    }
}
