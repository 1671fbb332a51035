//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Used when `ENCRYPTION_KEY` is not set. Only suitable for local runs.
pub const DEVELOPMENT_ENCRYPTION_KEY: &str = "pet-store-development-key-32byte";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL URL; unset runs on the in-memory ledger
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `STATEMENT_TIMEOUT_MS` / `LOCK_TIMEOUT_MS`: per-transaction bounds (default: `5000` / `2000`)
/// - `REDIS_URL`: Redis URL; unset uses an in-process cache
/// - `ENCRYPTION_KEY`: 32 byte key for breeder emails
/// - `CACHE_TTL_SECS`: lifetime of every cached pet, listing, store and order (default: `300`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub statement_timeout: Duration,
    pub lock_timeout: Duration,
    pub redis_url: Option<String>,
    pub encryption_key: String,
    pub cache_ttl: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u64>().ok());
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match lookup("LOG_FORMAT").as_deref() {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            database_url: non_empty("DATABASE_URL"),
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.database_max_connections),
            statement_timeout: parsed("STATEMENT_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.statement_timeout),
            lock_timeout: parsed("LOCK_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.lock_timeout),
            redis_url: non_empty("REDIS_URL"),
            encryption_key: non_empty("ENCRYPTION_KEY").unwrap_or(defaults.encryption_key),
            cache_ttl: parsed("CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_development_key(&self) -> bool {
        self.encryption_key == DEVELOPMENT_ENCRYPTION_KEY
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            statement_timeout: Duration::from_millis(5000),
            lock_timeout: Duration::from_millis(2000),
            redis_url: None,
            encryption_key: DEVELOPMENT_ENCRYPTION_KEY.to_string(),
            cache_ttl: Duration::from_secs(300),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.database_url.is_none());
        assert!(config.redis_url.is_none());
        assert_eq!(config.encryption_key.len(), 32);
        assert!(config.uses_development_key());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_addr_default() {
        let config = Config::default();
        assert_eq!(config.addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_reads_every_variable() {
        let config = from_pairs(&[
            ("PORT", "8081"),
            ("LOG_FORMAT", "JSON"),
            ("DATABASE_URL", "postgres://localhost/pets"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("STATEMENT_TIMEOUT_MS", "750"),
            ("LOCK_TIMEOUT_MS", "250"),
            ("REDIS_URL", "redis://localhost:6379"),
            ("ENCRYPTION_KEY", "abcdefghijklmnopqrstuvwxyz012345"),
            ("CACHE_TTL_SECS", "60"),
        ]);

        assert_eq!(config.port, 8081);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/pets")
        );
        assert_eq!(config.database_max_connections, 4);
        assert_eq!(config.statement_timeout, Duration::from_millis(750));
        assert_eq!(config.lock_timeout, Duration::from_millis(250));
        assert_eq!(config.redis_url.as_deref(), Some("redis://localhost:6379"));
        assert!(!config.uses_development_key());
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = from_pairs(&[("PORT", "not-a-port"), ("DATABASE_URL", "  "), ("CACHE_TTL_SECS", "-1")]);
        assert_eq!(config.port, 3000);
        assert!(config.database_url.is_none());
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
    }
}
