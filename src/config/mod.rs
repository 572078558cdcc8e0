//! Process configuration.
//!
//! Loaded once at startup from an optional TOML file, then overridden by
//! `LUMINATE_*` environment variables. There is no default signing secret:
//! startup fails if none is configured.

use crate::auth::password::DEFAULT_COST;
use crate::auth::token::DEFAULT_TOKEN_TTL_DAYS;
use anyhow::{bail, Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Secrets shorter than this still work but log a warning.
pub const RECOMMENDED_SECRET_BYTES: usize = 32;

/// Upper bound for `token_ttl_days` (ten years).
pub const MAX_TOKEN_TTL_DAYS: u32 = 3650;

pub const ENV_JWT_SECRET: &str = "LUMINATE_JWT_SECRET";
pub const ENV_DATABASE_URL: &str = "LUMINATE_DATABASE_URL";
pub const ENV_HOST: &str = "LUMINATE_HOST";
pub const ENV_PORT: &str = "LUMINATE_PORT";
pub const ENV_ENVIRONMENT: &str = "LUMINATE_ENV";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => bail!("unknown environment {other:?} (expected development or production)"),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Interface to bind.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// SQLite path, `sqlite://` URL, or `:memory:`. `~` is expanded.
    pub database_url: String,
    /// HMAC secret for session tokens. Required.
    pub jwt_secret: Option<String>,
    /// `production` hides internal error detail from responses.
    pub environment: Environment,
    /// Session token validity window.
    pub token_ttl_days: u32,
    /// bcrypt cost factor (4..=31).
    pub bcrypt_cost: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5000,
            database_url: "~/.luminate/luminate.db".into(),
            jwt_secret: None,
            environment: Environment::Development,
            token_ttl_days: DEFAULT_TOKEN_TTL_DAYS,
            bcrypt_cost: DEFAULT_COST,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("environment", &self.environment)
            .field("token_ttl_days", &self.token_ttl_days)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

impl Config {
    /// Load from `path` (which must exist) or the default config file if
    /// present, apply environment overrides, and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        tracing::info!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Apply `LUMINATE_*` overrides using `lookup` to read variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(secret) = lookup(ENV_JWT_SECRET) {
            self.jwt_secret = Some(secret);
        }
        if let Some(url) = lookup(ENV_DATABASE_URL) {
            self.database_url = url;
        }
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("{ENV_PORT} is not a valid port: {port:?}"))?;
        }
        if let Some(env) = lookup(ENV_ENVIRONMENT) {
            self.environment = env.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let secret = self.signing_secret()?;
        if secret.len() < RECOMMENDED_SECRET_BYTES {
            tracing::warn!(
                "jwt_secret is shorter than {RECOMMENDED_SECRET_BYTES} bytes; use a longer random value"
            );
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            bail!("bcrypt_cost must be between 4 and 31, got {}", self.bcrypt_cost);
        }
        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&self.token_ttl_days) {
            bail!(
                "token_ttl_days must be between 1 and {MAX_TOKEN_TTL_DAYS}, got {}",
                self.token_ttl_days
            );
        }
        if self.database_url.trim().is_empty() {
            bail!("database_url must not be empty");
        }
        Ok(())
    }

    /// The configured signing secret; errors if missing or blank.
    pub fn signing_secret(&self) -> Result<&str> {
        match self.jwt_secret.as_deref().map(str::trim) {
            Some(secret) if !secret.is_empty() => Ok(secret),
            _ => bail!(
                "no token signing secret configured: set {ENV_JWT_SECRET} or jwt_secret in the config file"
            ),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// JSON Schema for the config file.
    pub fn json_schema() -> Result<String> {
        let schema = schemars::schema_for!(Config);
        Ok(serde_json::to_string_pretty(&schema)?)
    }
}

/// `config.toml` inside the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "luminate").map(|dirs| dirs.config_dir().join("config.toml"))
}
