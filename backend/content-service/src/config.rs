/// Configuration management for Content Service
///
/// Configuration is read from environment variables. `main` loads a `.env`
/// file first when one is present.
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Cache (Redis) configuration; `None` disables caching
    pub cache: Option<CacheConfig>,
    /// Related-posts ranking configuration
    pub related: RelatedConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

/// Database configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    /// Apply embedded migrations on startup
    pub run_migrations: bool,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .field("max_lifetime_secs", &self.max_lifetime_secs)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

/// Cache (Redis) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis URL
    pub url: String,
}

/// Related-posts ranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedConfig {
    /// Limit used when the request does not carry one
    pub default_limit: i64,
    /// Upper clamp for any requested limit
    pub max_limit: i64,
    /// TTL of cached related-post id lists
    pub cache_ttl_secs: u64,
}

impl Default for RelatedConfig {
    fn default() -> Self {
        Self {
            default_limit: 4,
            max_limit: 10,
            cache_ttl_secs: 300,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_env = lookup("APP_ENV").unwrap_or_else(|| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        let cors = {
            let allowed_origins = match lookup("CORS_ALLOWED_ORIGINS") {
                Some(value) => value,
                None if production => {
                    return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                }
                None => "http://localhost:3000".to_string(),
            };

            if production && allowed_origins.trim() == "*" {
                return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
            }

            CorsConfig { allowed_origins }
        };

        let related = RelatedConfig {
            default_limit: parse_or_default(&lookup, "RELATED_DEFAULT_LIMIT", 4)?,
            max_limit: parse_or_default(&lookup, "RELATED_MAX_LIMIT", 10)?,
            cache_ttl_secs: parse_or_default(&lookup, "RELATED_CACHE_TTL_SECS", 300)?,
        };

        if related.max_limit < 1 {
            return Err("RELATED_MAX_LIMIT must be at least 1".to_string());
        }
        if related.default_limit < 1 || related.default_limit > related.max_limit {
            return Err(format!(
                "RELATED_DEFAULT_LIMIT must be between 1 and {}",
                related.max_limit
            ));
        }

        Ok(Config {
            app: AppConfig {
                env: app_env,
                host: lookup("CONTENT_SERVICE_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: lookup("CONTENT_SERVICE_PORT")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8081),
            },
            cors,
            database: DatabaseConfig {
                url: lookup("DATABASE_URL")
                    .unwrap_or_else(|| "postgresql://localhost/blog".to_string()),
                max_connections: lookup("DB_MAX_CONNECTIONS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
                min_connections: lookup("DB_MIN_CONNECTIONS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(2),
                connect_timeout_secs: lookup("DB_CONNECT_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5),
                acquire_timeout_secs: lookup("DB_ACQUIRE_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
                idle_timeout_secs: lookup("DB_IDLE_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(600),
                max_lifetime_secs: lookup("DB_MAX_LIFETIME_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1800),
                run_migrations: lookup("DATABASE_RUN_MIGRATIONS")
                    .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                    .unwrap_or(false),
            },
            cache: lookup("REDIS_URL")
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty())
                .map(|url| CacheConfig { url }),
            related,
        })
    }
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> Result<T, String>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        None => Ok(default),
    }
}
