use std::path::{Path, PathBuf};

use api_token::{DEFAULT_PREFIX, TokenConfig};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HASH_WORKERS: usize = 4;
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Service configuration. JSON or YAML; every field is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub require_token: bool,
    #[serde(deserialize_with = "port_from_number_or_string")]
    pub port: u16,
    pub listen_host: String,
    pub findings_db: PathBuf,
    pub tokens_db: PathBuf,
    pub token_prefix: String,
    pub hash_workers: usize,
    pub max_body_bytes: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            require_token: true,
            port: DEFAULT_PORT,
            listen_host: "0.0.0.0".to_string(),
            findings_db: PathBuf::from("vulnerabilities.db"),
            tokens_db: PathBuf::from("tokens.db"),
            token_prefix: DEFAULT_PREFIX.to_string(),
            hash_workers: DEFAULT_HASH_WORKERS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

// Older config files carry the port as a string ("8080").
#[derive(Deserialize)]
#[serde(untagged)]
enum PortRepr {
    Number(u16),
    Text(String),
}

fn port_from_number_or_string<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    match PortRepr::deserialize(deserializer)? {
        PortRepr::Number(port) => Ok(port),
        PortRepr::Text(text) => text
            .trim()
            .parse::<u16>()
            .map_err(|e| serde::de::Error::custom(format!("invalid port {text:?}: {e}"))),
    }
}

impl IngestConfig {
    /// Read, parse, resolve relative paths against the file's directory and
    /// validate.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse_str(&raw)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    pub fn parse_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        self.findings_db = resolve(base, &self.findings_db);
        self.tokens_db = resolve(base, &self.tokens_db);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".to_string()));
        }
        if self.hash_workers == 0 {
            return Err(ConfigError::Invalid(
                "hash_workers must be at least 1".to_string(),
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be non-zero".to_string(),
            ));
        }
        if !TokenConfig::is_valid_prefix(&self.token_prefix) {
            return Err(ConfigError::Invalid(format!(
                "token_prefix {:?} must be non-empty and alphanumeric",
                self.token_prefix
            )));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.port)
    }

    pub fn token_config(&self) -> TokenConfig {
        TokenConfig::new(self.token_prefix.clone())
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
