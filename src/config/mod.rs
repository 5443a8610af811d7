//! Configuration management for Syncboard Core

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Redis configuration; absent means the in-memory live cache is used
    pub redis: Option<RedisConfig>,
    /// JWT configuration
    pub jwt: JwtConfig,
    /// Activity pipeline configuration
    pub activity: ActivityConfig,
    /// Telemetry configuration
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub access_token_ttl_secs: i64,
}

/// Live activity cache sizing
#[derive(Debug, Clone)]
pub struct ActivityConfig {
    /// Per-organization ring buffer capacity
    pub live_capacity: usize,
    /// Rolling expiry of the live window, in days
    pub live_ttl_days: i64,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            live_capacity: 20,
            live_ttl_days: 7,
        }
    }
}

/// Metrics and log output settings
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Expose a Prometheus recorder and the /metrics endpoint
    pub metrics_enabled: bool,
    /// Log output format: "plain" or "json"
    pub log_format: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            log_format: "plain".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .unwrap_or(2),
            },
            redis: env::var("REDIS_URL").ok().map(|url| RedisConfig { url }),
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").context("JWT_SECRET is required")?,
                issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "syncboard".to_string()),
                access_token_ttl_secs: env::var("JWT_ACCESS_TOKEN_TTL_SECS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .unwrap_or(3600),
            },
            activity: ActivityConfig {
                live_capacity: env::var("ACTIVITY_LIVE_CAPACITY")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .unwrap_or(20),
                live_ttl_days: env::var("ACTIVITY_LIVE_TTL_DAYS")
                    .unwrap_or_else(|_| "7".to_string())
                    .parse()
                    .unwrap_or(7),
            },
            telemetry: TelemetryConfig {
                metrics_enabled: env::var("METRICS_ENABLED")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()
                    .unwrap_or(true),
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "plain".to_string()),
            },
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            http_host: "127.0.0.1".to_string(),
            http_port: 8080,
            database: DatabaseConfig {
                url: "postgres://localhost/test".to_string(),
                max_connections: 10,
                min_connections: 2,
            },
            redis: Some(RedisConfig {
                url: "redis://localhost:6379".to_string(),
            }),
            jwt: JwtConfig {
                secret: "test-secret".to_string(),
                issuer: "test".to_string(),
                access_token_ttl_secs: 3600,
            },
            activity: ActivityConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }

    #[test]
    fn test_config_addresses() {
        let config = test_config();

        assert_eq!(config.http_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_config_clone() {
        let config1 = test_config();
        let config2 = config1.clone();

        assert_eq!(config1.http_host, config2.http_host);
        assert_eq!(config1.http_port, config2.http_port);
        assert_eq!(config1.database.url, config2.database.url);
    }

    #[test]
    fn test_config_debug() {
        let config = test_config();
        let debug_str = format!("{:?}", config);

        assert!(debug_str.contains("Config"));
        assert!(debug_str.contains("http_host"));
        assert!(debug_str.contains("127.0.0.1"));
    }

    #[test]
    fn test_activity_config_defaults() {
        let activity = ActivityConfig::default();
        assert_eq!(activity.live_capacity, 20);
        assert_eq!(activity.live_ttl_days, 7);
    }

    #[test]
    fn test_redis_optional() {
        let mut config = test_config();
        config.redis = None;

        assert!(config.redis.is_none());
    }

    #[test]
    fn test_telemetry_config_defaults() {
        let telemetry = TelemetryConfig::default();
        assert!(telemetry.metrics_enabled);
        assert_eq!(telemetry.log_format, "plain");
    }

    #[test]
    fn test_jwt_config_clone() {
        let jwt = JwtConfig {
            secret: "secret".to_string(),
            issuer: "issuer".to_string(),
            access_token_ttl_secs: 3600,
        };
        let jwt2 = jwt.clone();

        assert_eq!(jwt.secret, jwt2.secret);
        assert_eq!(jwt.issuer, jwt2.issuer);
    }
}
