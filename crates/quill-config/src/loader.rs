//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "quill.toml",
    "config.toml",
    "./config/config.toml",
    "/etc/quill/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with process environment overrides.
    /// The result is validated, so a missing `DATABASE_URL` fails here.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        self.load_with(|key| env::var(key).ok())
    }

    /// Same as [`ConfigLoader::load`] but reads variables through `lookup`.
    pub fn load_with<F>(&self, lookup: F) -> Result<AppConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file(&lookup)? {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        Self::apply_env_overrides(&mut config, &lookup)?;
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file<F>(&self, lookup: &F) -> Result<Option<PathBuf>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // An explicitly requested file must exist
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Ok(Some(path.clone()));
            }
            return Err(ConfigError::ValidationError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        if let Some(path) = lookup("QUILL_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Ok(Some(path));
            }
            warn!(?path, "QUILL_CONFIG points to a missing file, ignoring");
        }

        Ok(CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists()))
    }

    /// Apply environment variable overrides
    fn apply_env_overrides<F>(config: &mut AppConfig, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Database
        if let Some(val) = lookup("DATABASE_URL") {
            config.database.url = val;
        }
        if let Some(val) = lookup("QUILL_DB_MAX_CONNECTIONS") {
            config.database.max_connections = parse_var("QUILL_DB_MAX_CONNECTIONS", &val)?;
        }
        if let Some(val) = lookup("QUILL_DB_CREATE_SCHEMA") {
            config.database.create_schema = parse_var("QUILL_DB_CREATE_SCHEMA", &val)?;
        }

        // HTTP
        if let Some(val) = lookup("QUILL_HTTP_HOST") {
            config.http.host = val;
        }
        if let Some(val) = lookup("QUILL_HTTP_PORT") {
            config.http.port = parse_var("QUILL_HTTP_PORT", &val)?;
        }
        if let Some(val) = lookup("QUILL_CORS_ORIGINS") {
            config.http.cors_origins = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Auth
        if let Some(val) = lookup("JWT_SECRET_KEY") {
            config.auth.jwt_secret = val;
        }
        if let Some(val) = lookup("QUILL_JWT_ISSUER") {
            config.auth.issuer = val;
        }
        if let Some(val) = lookup("QUILL_JWT_AUDIENCE") {
            config.auth.audience = val;
        }
        if let Some(val) = lookup("QUILL_JWT_EXPIRY_SECS") {
            config.auth.access_token_expiry_secs = parse_var("QUILL_JWT_EXPIRY_SECS", &val)?;
        }
        if let Some(val) = lookup("QUILL_PASSWORD_MIN_LENGTH") {
            config.auth.password_min_length = parse_var("QUILL_PASSWORD_MIN_LENGTH", &val)?;
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::EnvError(format!("{} has an invalid value: {}", key, value)))
}
