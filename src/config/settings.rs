//! Application settings and configuration structures.

use std::fmt;
use std::net::SocketAddr;

use axum::http::HeaderValue;
use config::{Config, ConfigError, Environment as EnvSource, File};
use serde::{Deserialize, Serialize};

/// Deployment mode. Decides which middleware stages are mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[serde(alias = "dev")]
    Development,
    #[serde(alias = "prod")]
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::Message(format!(
                "Unknown environment '{}', expected 'development' or 'production'",
                other
            ))),
        }
    }
}

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port, limits)
    pub server: ServerSettings,

    /// Document store connection
    pub database: DatabaseSettings,

    /// Redis configuration (only needed by the shared rate-limit store)
    #[serde(default)]
    pub redis: RedisSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// Rate limiting configuration
    pub rate_limit: RateLimitSettings,

    /// Error response configuration
    pub errors: ErrorSettings,

    /// Front-end development proxy
    pub dev_proxy: DevProxySettings,

    /// Current environment (development, production)
    pub environment: Environment,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,

    /// Maximum accepted request body for the body parser
    pub body_limit_bytes: usize,

    /// Requests running longer than this are answered with 408
    pub request_timeout_secs: u64,
}

/// Document store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,

    /// Connection attempts made at startup before giving up
    pub connect_attempts: u32,

    /// Delay before the second attempt; doubles for each further attempt
    pub retry_base_delay_ms: u64,
}

/// Redis configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedisSettings {
    /// Redis connection URL
    pub url: Option<String>,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Origins allowed outside production
    pub development_origins: Vec<String>,

    /// The single origin allowed in production
    pub frontend_url: Option<String>,

    /// Preflight cache duration in seconds
    pub max_age_secs: u64,
}

/// Backing store for rate-limit counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitStoreKind {
    /// Process-local counters; valid for a single instance only
    Memory,
    /// Counters shared through Redis across instances
    Redis,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// Requests allowed per client within one window
    pub max_requests: u32,

    /// Rolling window length in seconds
    pub window_secs: u64,

    /// Counter backend
    pub store: RateLimitStoreKind,

    /// Honour X-Forwarded-For / X-Real-IP when identifying clients
    pub trust_proxy: bool,

    /// How often the memory store drops idle clients
    pub sweep_interval_secs: u64,
}

/// Error response configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorSettings {
    /// Include the internal failure message in 500 responses
    pub expose_details: bool,
}

/// Front-end development proxy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DevProxySettings {
    /// Host the proxy binds to
    pub host: String,

    /// Port the proxy binds to (the UI origin)
    pub port: u16,

    /// API origin requests are forwarded to
    pub target: String,

    /// Path prefix that is forwarded and stripped
    pub path_prefix: String,

    /// Directory served for paths outside the prefix
    pub static_dir: Option<String>,
}

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. Built-in defaults
    /// 2. config/default.toml
    /// 3. config/{RUN_ENV}.toml
    /// 4. `APP__SECTION__KEY` environment variables
    /// 5. Well-known variables (`PORT`, `DATABASE_URL`, `FRONTEND_URL`, ...)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed, or
    /// if the loaded values are inconsistent (see [`Settings::validate`]).
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Self::load_unchecked()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load without cross-field validation, for tools that only need one
    /// section (the dev proxy does not need a database).
    pub fn load_unchecked() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let environment: Environment = std::env::var("RUN_ENV")
            .unwrap_or_else(|_| "development".into())
            .parse()?;

        Self::defaults(environment)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__SERVER__PORT=5000 -> server.port = 5000
            .add_source(
                EnvSource::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", std::env::var("REDIS_URL").ok())?
            .set_override_option("cors.frontend_url", std::env::var("FRONTEND_URL").ok())?
            .set_override_option("dev_proxy.target", std::env::var("API_URL").ok())?
            .set_override_option("dev_proxy.port", std::env::var("DEV_PROXY_PORT").ok())?
            .build()?
            .try_deserialize()
    }

    /// Builder pre-populated with every default value.
    pub(crate) fn defaults(
        environment: Environment,
    ) -> Result<config::builder::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("environment", environment.as_str())?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("server.body_limit_bytes", 100 * 1024)?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("database.url", "")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.acquire_timeout", 10)?
            .set_default("database.connect_attempts", 1)?
            .set_default("database.retry_base_delay_ms", 500)?
            .set_default(
                "cors.development_origins",
                vec!["http://localhost:5173", "http://127.0.0.1:5173"],
            )?
            .set_default("cors.max_age_secs", 86400)?
            .set_default("rate_limit.max_requests", 100)?
            .set_default("rate_limit.window_secs", 15 * 60)?
            .set_default("rate_limit.store", "memory")?
            .set_default("rate_limit.trust_proxy", false)?
            .set_default("rate_limit.sweep_interval_secs", 60)?
            .set_default("errors.expose_details", !environment.is_production())?
            .set_default("dev_proxy.host", "127.0.0.1")?
            .set_default("dev_proxy.port", 5173)?
            .set_default("dev_proxy.target", "http://localhost:3000")?
            .set_default("dev_proxy.path_prefix", "/api")
    }

    /// Check cross-field consistency after deserialisation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Message(
                "DATABASE_URL must be set".to_string(),
            ));
        }

        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "server.request_timeout_secs must be positive".to_string(),
            ));
        }

        if self.database.connect_attempts == 0 {
            return Err(ConfigError::Message(
                "database.connect_attempts must be at least 1".to_string(),
            ));
        }

        if self.environment.is_production() && self.cors.frontend_url.is_none() {
            return Err(ConfigError::Message(
                "FRONTEND_URL must be set in production".to_string(),
            ));
        }

        for origin in self.cors.allowed_origins(self.environment) {
            if HeaderValue::from_str(origin).is_err() {
                return Err(ConfigError::Message(format!(
                    "CORS origin '{}' is not a valid header value",
                    origin
                )));
            }
        }

        if self.rate_limit.max_requests == 0 || self.rate_limit.window_secs == 0 {
            return Err(ConfigError::Message(
                "rate_limit.max_requests and rate_limit.window_secs must be positive".to_string(),
            ));
        }

        if self.rate_limit.sweep_interval_secs == 0 {
            return Err(ConfigError::Message(
                "rate_limit.sweep_interval_secs must be positive".to_string(),
            ));
        }

        if self.rate_limit.store == RateLimitStoreKind::Redis && self.redis.url.is_none() {
            return Err(ConfigError::Message(
                "REDIS_URL must be set when rate_limit.store = \"redis\"".to_string(),
            ));
        }

        self.dev_proxy.validate()
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl ServerSettings {
    /// Get the socket address for binding.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

impl CorsSettings {
    /// Origins permitted for the given deployment mode.
    pub fn allowed_origins(&self, environment: Environment) -> Vec<&str> {
        match environment {
            Environment::Production => self.frontend_url.as_deref().into_iter().collect(),
            Environment::Development => {
                self.development_origins.iter().map(String::as_str).collect()
            }
        }
    }
}

impl DevProxySettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.path_prefix.starts_with('/')
            || self.path_prefix.len() < 2
            || self.path_prefix.ends_with('/')
        {
            return Err(ConfigError::Message(format!(
                "dev_proxy.path_prefix '{}' must be a non-root absolute path without a trailing slash",
                self.path_prefix
            )));
        }

        let target = url::Url::parse(&self.target).map_err(|e| {
            ConfigError::Message(format!("API_URL '{}' is not a valid URL: {}", self.target, e))
        })?;
        if target.scheme() != "http" || target.host_str().is_none() {
            return Err(ConfigError::Message(format!(
                "API_URL '{}' must be an http:// origin",
                self.target
            )));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}
