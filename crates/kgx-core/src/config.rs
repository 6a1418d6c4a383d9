//! Configuration loaded from `$KGX_HOME/config.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::format::TableLimits;
use crate::reveal::RevealConfig;
use crate::search::MAX_RESULTS_LIMIT;

/// Env var overriding `base_url`.
pub const BASE_URL_ENV: &str = "KGX_BASE_URL";

/// Returns the embedded default config template.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for kgx configuration and logs.
    //!
    //! KGX_HOME resolution order:
    //! 1. KGX_HOME environment variable (if set)
    //! 2. ~/.config/kgx (default)
    //! 3. ./.kgx when no home directory is known

    use std::path::PathBuf;

    pub fn kgx_home() -> PathBuf {
        if let Ok(home) = std::env::var("KGX_HOME")
            && !home.trim().is_empty()
        {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".kgx"),
            |h| h.join(".config").join("kgx"),
        )
    }

    pub fn config_path() -> PathBuf {
        kgx_home().join("config.toml")
    }

    pub fn logs_dir() -> PathBuf {
        kgx_home().join("logs")
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive; `KGX_LOG` wins when set.
    pub filter: String,
    /// Log to a file under `$KGX_HOME/logs` while the full-screen view runs.
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            file: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: Option<String>,
    /// Connect timeout in seconds; 0 disables.
    pub request_timeout_secs: u64,
    pub max_results: Option<u32>,
    pub reveal: RevealConfig,
    pub table: TableLimits,
    pub logging: LoggingConfig,
}

impl Config {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:8000";
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Loads from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if the file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or holds an
    /// out-of-range value.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config: Config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?
        } else {
            Config::default()
        };
        config
            .validate()
            .with_context(|| format!("Invalid config at {}", path.display()))?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(n) = self.max_results
            && !(1..=MAX_RESULTS_LIMIT).contains(&n)
        {
            bail!("max_results must be between 1 and {MAX_RESULTS_LIMIT}, got {n}");
        }
        if self.table.max_rows == 0 {
            bail!("table.max_rows must be at least 1");
        }
        if self.table.max_column_width < 4 {
            bail!("table.max_column_width must be at least 4");
        }
        Ok(())
    }

    /// Writes the commented default template to `path`.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }

    /// Resolves the backend URL with precedence: env > config > default.
    ///
    /// # Errors
    /// Returns an error if the chosen URL is malformed.
    pub fn resolve_base_url(&self) -> Result<String> {
        let env = std::env::var(BASE_URL_ENV).ok();
        self.resolve_base_url_with(env.as_deref())
    }

    fn resolve_base_url_with(&self, env_url: Option<&str>) -> Result<String> {
        for candidate in [env_url, self.base_url.as_deref()].into_iter().flatten() {
            let trimmed = candidate.trim();
            if !trimmed.is_empty() {
                validate_url(trimmed)?;
                return Ok(trimmed.trim_end_matches('/').to_string());
            }
        }
        Ok(Self::DEFAULT_BASE_URL.to_string())
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

fn validate_url(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url).with_context(|| format!("Invalid base URL: {url}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("Base URL must use http or https: {url}");
    }
    Ok(())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
            max_results: None,
            reveal: RevealConfig::default(),
            table: TableLimits::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    /// Config loading: missing file returns defaults.
    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.reveal.speed_ms, 30);
        assert_eq!(config.table.max_rows, 100);
    }

    /// Config loading: partial config merges with defaults.
    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "[reveal]\nspeed_ms = 5\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.reveal.speed_ms, 5);
        assert_eq!(config.reveal.lag_tolerance, 10);
        assert_eq!(config.table, TableLimits::default());
    }

    /// The shipped template describes exactly the defaults.
    #[test]
    fn test_template_matches_defaults() {
        let config: Config = toml::from_str(default_config_template()).unwrap();
        assert_eq!(
            config,
            Config {
                base_url: Some(Config::DEFAULT_BASE_URL.to_string()),
                ..Config::default()
            }
        );
    }

    /// Config init: creates file, creates parent dirs.
    #[test]
    fn test_init_creates_config_with_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        assert!(config_path.exists());
        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("speed_ms = 30"));
        assert!(contents.contains("# max_results ="));
    }

    /// Config init: fails if file exists (no silent overwrite).
    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "").unwrap();

        assert!(Config::init(&config_path).is_err());
    }

    #[test]
    fn test_out_of_range_max_results_rejected() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "max_results = 9000\n").unwrap();

        let err = Config::load_from(&config_path).unwrap_err();
        assert!(format!("{err:#}").contains("max_results"), "{err:#}");
    }

    #[test]
    fn test_base_url_precedence() {
        let config = Config {
            base_url: Some("http://config:1/".to_string()),
            ..Config::default()
        };
        assert_eq!(
            config.resolve_base_url_with(Some("http://env:2")).unwrap(),
            "http://env:2"
        );
        assert_eq!(config.resolve_base_url_with(Some("  ")).unwrap(), "http://config:1");
        assert_eq!(
            Config::default().resolve_base_url_with(None).unwrap(),
            Config::DEFAULT_BASE_URL
        );
        assert!(config.resolve_base_url_with(Some("not a url")).is_err());
        assert!(config.resolve_base_url_with(Some("ftp://x")).is_err());
    }

    #[test]
    fn test_zero_timeout_disables() {
        let config = Config {
            request_timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.connect_timeout(), None);
        assert_eq!(
            Config::default().connect_timeout(),
            Some(Duration::from_secs(30))
        );
    }
}
