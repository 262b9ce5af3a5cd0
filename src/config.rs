use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Backend used when neither the config file nor QSR_BACKEND_URL names one.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .qsr-report.toml.
/// All fields are optional; the tool works with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// QSR backend proxy settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Direct Kissflow API access (bypasses the backend when complete)
    #[serde(default)]
    pub kissflow: KissflowConfig,

    /// Where generated reports are written
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend. Falls back to QSR_BACKEND_URL, then localhost.
    pub url: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KissflowConfig {
    pub base_url: Option<String>,
    pub access_key_id: Option<String>,
    pub access_key_secret: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    pub dir: Option<PathBuf>,
}

/// A complete Kissflow access key pair plus the item endpoint base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KissflowCredentials {
    pub base_url: String,
    pub access_key_id: String,
    pub access_key_secret: String,
}

impl Config {
    /// Load configuration from .qsr-report.toml in the current directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(".qsr-report.toml");
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the backend URL: config file value takes precedence,
    /// falls back to QSR_BACKEND_URL, then the local default.
    pub fn backend_url(&self) -> String {
        self.backend
            .url
            .clone()
            .or_else(|| std::env::var("QSR_BACKEND_URL").ok())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
    }

    /// Resolve Kissflow credentials, each part from the config file or its
    /// KISSFLOW_* environment variable. `None` unless all three are present.
    pub fn kissflow_credentials(&self) -> Option<KissflowCredentials> {
        let resolve = |value: &Option<String>, var: &str| {
            value
                .clone()
                .or_else(|| std::env::var(var).ok())
                .filter(|v| !v.is_empty())
        };
        Some(KissflowCredentials {
            base_url: resolve(&self.kissflow.base_url, "KISSFLOW_BASE_URL")?,
            access_key_id: resolve(&self.kissflow.access_key_id, "KISSFLOW_ACCESS_KEY_ID")?,
            access_key_secret: resolve(
                &self.kissflow.access_key_secret,
                "KISSFLOW_ACCESS_KEY_SECRET",
            )?,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Output directory, defaulting to the current directory.
    pub fn output_dir(&self) -> PathBuf {
        self.output.dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.backend.url.is_none());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.output_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
[backend]
url = "http://qsr.internal:8000"
timeout_secs = 5

[kissflow]
base_url = "https://acme.kissflow.com/process/2/AcXyz/admin/Kissflow_Product_Features"
access_key_id = "Ak123"
access_key_secret = "s3cret"

[output]
dir = "reports"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backend_url(), "http://qsr.internal:8000");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.output_dir(), PathBuf::from("reports"));

        let credentials = config.kissflow_credentials().unwrap();
        assert_eq!(credentials.access_key_id, "Ak123");
        assert_eq!(credentials.access_key_secret, "s3cret");
    }

    #[test]
    fn test_empty_credential_is_not_configured() {
        let config: Config = toml::from_str(
            r#"
[kissflow]
base_url = "https://acme.kissflow.com"
access_key_id = ""
access_key_secret = "s3cret"
"#,
        )
        .unwrap();
        assert!(config.kissflow_credentials().is_none());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("qsr_report_test_config.toml");
        std::fs::write(&path, "[output]\ndir = \"out\"\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.output_dir(), PathBuf::from("out"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_from_invalid_file() {
        let path = std::env::temp_dir().join("qsr_report_test_bad_config.toml");
        std::fs::write(&path, "[backend\nurl = ").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));
        std::fs::remove_file(&path).ok();
    }
}
