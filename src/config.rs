use std::str::FromStr;

// ============================================================================
// Application Configuration
// ============================================================================
//
// Read from the process environment, with a `.env` file loaded first when
// present:
//
//   HTTP_HOST                 bind address for both servers   (0.0.0.0)
//   HTTP_PORT                 API port                        (8080)
//   METRICS_PORT              /metrics and /health port       (9090)
//   DATABASE_URL              PostgreSQL URL; unset = in-memory store
//   DATABASE_MAX_CONNECTIONS  pool size                       (5)
//   BATCH_FETCH_SIZE          IN-list size for batch fetching (100)
//   SEED_SAMPLE_DATA          load the sample orders          (true)
//
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub http_host: String,
    pub http_port: u16,
    pub metrics_port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub batch_fetch_size: usize,
    pub seed_sample_data: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            metrics_port: 9090,
            database_url: None,
            database_max_connections: 5,
            batch_fetch_size: 100,
            seed_sample_data: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenv::dotenv() {
            tracing::debug!("No .env file loaded: {}", e);
        }
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Build the config from any key lookup; unset or blank keys keep defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let batch_fetch_size = parse(&value, "BATCH_FETCH_SIZE", defaults.batch_fetch_size)?;
        if batch_fetch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "BATCH_FETCH_SIZE",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            http_host: value("HTTP_HOST").unwrap_or(defaults.http_host),
            http_port: parse(&value, "HTTP_PORT", defaults.http_port)?,
            metrics_port: parse(&value, "METRICS_PORT", defaults.metrics_port)?,
            database_url: value("DATABASE_URL"),
            database_max_connections: parse(&value, "DATABASE_MAX_CONNECTIONS", defaults.database_max_connections)?,
            batch_fetch_size,
            seed_sample_data: parse_flag(&value, "SEED_SAMPLE_DATA", defaults.seed_sample_data)?,
        })
    }
}

fn parse<T, F>(value: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match value(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

fn parse_flag<F>(value: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match value(key).as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(ConfigError::Invalid {
            key,
            value: other.to_string(),
        }),
    }
}
