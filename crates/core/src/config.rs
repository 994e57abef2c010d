use std::env;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidEnvOverride {
                key: "STAFFDESK_LOG_FORMAT".to_owned(),
                value: other.to_owned(),
            }),
        }
    }
}

/// Programmatic overrides, applied after file and environment values.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://staffdesk.db".to_owned(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_owned(), port: 3001 },
            logging: LoggingConfig { level: "info".to_owned(), format: LogFormat::Compact },
        }
    }
}

/// Optional TOML file shape; every section and field may be omitted.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    database: FileDatabase,
    #[serde(default)]
    server: FileServer,
    #[serde(default)]
    logging: FileLogging,
}

#[derive(Debug, Default, Deserialize)]
struct FileDatabase {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FileServer {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct FileLogging {
    level: Option<String>,
    format: Option<LogFormat>,
}

const DEFAULT_CONFIG_FILE: &str = "staffdesk.toml";

impl AppConfig {
    /// Loads configuration in precedence order: defaults, then the TOML
    /// file (if present), then `STAFFDESK_*` environment variables, then
    /// programmatic overrides.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = options
            .config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        match fs::read_to_string(&path) {
            Ok(raw) => {
                let file: FileConfig = toml::from_str(&raw)
                    .map_err(|source| ConfigError::ParseFile { path: path.clone(), source })?;
                config.apply_file(file);
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                if options.require_file {
                    return Err(ConfigError::MissingConfigFile(path));
                }
            }
            Err(source) => return Err(ConfigError::ReadFile { path, source }),
        }

        config.apply_env(env::vars())?;
        config.apply_overrides(&options.overrides)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(url) = file.database.url {
            self.database.url = url;
        }
        if let Some(max_connections) = file.database.max_connections {
            self.database.max_connections = max_connections;
        }
        if let Some(timeout_secs) = file.database.timeout_secs {
            self.database.timeout_secs = timeout_secs;
        }
        if let Some(bind_address) = file.server.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = file.server.port {
            self.server.port = port;
        }
        if let Some(level) = file.logging.level {
            self.logging.level = level;
        }
        if let Some(format) = file.logging.format {
            self.logging.format = format;
        }
    }

    /// Applies `STAFFDESK_*` overrides from the given environment snapshot.
    /// Taking an iterator keeps tests hermetic from the process environment.
    fn apply_env(
        &mut self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<(), ConfigError> {
        for (key, value) in vars {
            match key.as_str() {
                "STAFFDESK_DATABASE_URL" => self.database.url = value,
                "STAFFDESK_DATABASE_MAX_CONNECTIONS" => {
                    self.database.max_connections = parse_env(&key, &value)?;
                }
                "STAFFDESK_DATABASE_TIMEOUT_SECS" => {
                    self.database.timeout_secs = parse_env(&key, &value)?;
                }
                "STAFFDESK_BIND_ADDRESS" => self.server.bind_address = value,
                "STAFFDESK_PORT" => self.server.port = parse_env(&key, &value)?,
                "STAFFDESK_LOG_LEVEL" => self.logging.level = value,
                "STAFFDESK_LOG_FORMAT" => self.logging.format = value.parse()?,
                _ => {}
            }
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(url) = &overrides.database_url {
            self.database.url = url.clone();
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }
        if let Some(bind_address) = &overrides.bind_address {
            self.server.bind_address = bind_address.clone();
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_owned()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".to_owned(),
            ));
        }
        if self.database.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "database.timeout_secs must be at least 1".to_owned(),
            ));
        }
        if self.server.bind_address.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.bind_address must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_owned(),
        value: value.to_owned(),
    })
}
