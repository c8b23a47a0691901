use std::fmt;

use super::{env_opt, env_or, DEFAULT_DB_NAME, DEFAULT_HOST, DEFAULT_PORT};

/// Application runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Returns the canonical name used for logging/metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// Database backends the service can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseDriver {
    Sqlite,
}

impl DatabaseDriver {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "sqlite" => Ok(Self::Sqlite),
            other => Err(ConfigError::UnsupportedDriver(other.to_string())),
        }
    }
}

/// Default verbosity applied when `RUST_LOG` is not set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Unknown values fall back to `info` rather than failing startup.
    fn parse_lenient(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "debug" => Self::Debug,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Runtime configuration resolved from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub database_driver: DatabaseDriver,
    pub database_name: String,
    pub log_level: LogLevel,
    pub notify_base_url: Option<String>,
}

impl AppConfig {
    /// Constructs the configuration by reading and validating environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = Environment::from_str(&env_or("APP_ENV", "development"))?;

        let host = env_or("SERVER_HOST", DEFAULT_HOST);
        let port_value = env_or("SERVER_PORT", &DEFAULT_PORT.to_string());
        let port = port_value
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort(port_value.clone()))?;

        let database_driver = DatabaseDriver::from_str(&env_or("DB_DRIVER", "sqlite"))?;
        let database_name = env_or("DB_NAME", DEFAULT_DB_NAME);
        let log_level = LogLevel::parse_lenient(&env_or("LOG_LEVEL", "info"));
        let notify_base_url = env_opt("NOTIFY_BASE_URL");

        Ok(Self {
            environment,
            host,
            port,
            database_driver,
            database_name,
            log_level,
            notify_base_url,
        })
    }

    /// Returns the `host:port` pair the HTTP listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the sqlx connection string for the configured database.
    ///
    /// A database name of `:memory:` selects an in-memory database; any other
    /// name becomes `<name>.db`, created on first use.
    pub fn database_url(&self) -> String {
        match self.database_driver {
            DatabaseDriver::Sqlite if self.database_name == ":memory:" => {
                "sqlite::memory:".to_string()
            }
            DatabaseDriver::Sqlite => format!("sqlite://{}.db?mode=rwc", self.database_name),
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    InvalidPort(String),
    UnsupportedDriver(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::InvalidPort(value) => {
                write!(f, "SERVER_PORT must be a port number (got {value})")
            }
            Self::UnsupportedDriver(value) => {
                write!(f, "unsupported DB_DRIVER '{value}', only 'sqlite' is available")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
