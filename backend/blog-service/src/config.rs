/// Configuration management for Blog Service
///
/// Configuration is read from environment variables. In development a `.env`
/// file is loaded first (see `main.rs`).
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
    /// Category cascade settings
    pub categories: CategoryConfig,
    /// Authentication settings
    pub auth: AuthConfig,
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
    /// Emit JSON log lines instead of the human-readable format
    pub json_logs: bool,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
}

/// How the reassignment step of a category deletion touches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CascadeMode {
    /// Reassignment, stale-link removal and delete commit as one transaction.
    Transactional,
    /// Per-post updates fan out against the pool; earlier updates stay
    /// committed when a sibling fails.
    Concurrent,
}

impl CascadeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CascadeMode::Transactional => "transactional",
            CascadeMode::Concurrent => "concurrent",
        }
    }
}

impl FromStr for CascadeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transactional" | "atomic" => Ok(CascadeMode::Transactional),
            "concurrent" | "fan-out" | "fanout" => Ok(CascadeMode::Concurrent),
            other => Err(format!("unknown cascade mode '{}'", other)),
        }
    }
}

/// Category cascade settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Name of the category posts fall back to
    pub fallback_name: String,
    pub cascade_mode: CascadeMode,
    /// Max in-flight per-post updates in concurrent mode
    pub reassign_concurrency: usize,
    /// TTL of cached category listings
    pub cache_ttl_secs: u64,
    pub cache_max_entries: u64,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            fallback_name: "Uncategorized".to_string(),
            cascade_mode: CascadeMode::Transactional,
            reassign_concurrency: 16,
            cache_ttl_secs: 60,
            cache_max_entries: 1_000,
        }
    }
}

/// Authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// RS256 public key used to validate bearer tokens
    #[serde(skip_serializing)]
    pub jwt_public_key_pem: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        let cascade_mode = match std::env::var("CATEGORY_CASCADE_MODE") {
            Ok(raw) => raw
                .parse::<CascadeMode>()
                .map_err(|e| format!("Failed to parse CATEGORY_CASCADE_MODE: {}", e))?,
            Err(_) => CascadeMode::Transactional,
        };

        let reassign_concurrency: usize = parse_env_or_default("CATEGORY_REASSIGN_CONCURRENCY", 16)?;
        if reassign_concurrency == 0 {
            return Err("CATEGORY_REASSIGN_CONCURRENCY must be at least 1".to_string());
        }

        let fallback_name = std::env::var("FALLBACK_CATEGORY_NAME")
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|_| "Uncategorized".to_string());
        if fallback_name.is_empty() {
            return Err("FALLBACK_CATEGORY_NAME cannot be empty".to_string());
        }

        Ok(Config {
            app: AppConfig {
                env: app_env.clone(),
                host: std::env::var("BLOG_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or_default("BLOG_SERVICE_PORT", 8080)?,
                json_logs: std::env::var("LOG_FORMAT")
                    .map(|v| v.eq_ignore_ascii_case("json"))
                    .unwrap_or(production),
            },
            cors: {
                let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                    Ok(value) => value,
                    Err(_) if production => {
                        return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                    }
                    Err(_) => "http://localhost:3000".to_string(),
                };

                if production && allowed_origins.trim() == "*" {
                    return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
                }

                CorsConfig { allowed_origins }
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/blog".to_string()),
                max_connections: parse_env_or_default("DATABASE_MAX_CONNECTIONS", 10)?,
            },
            categories: CategoryConfig {
                fallback_name,
                cascade_mode,
                reassign_concurrency,
                cache_ttl_secs: parse_env_or_default("CATEGORY_CACHE_TTL_SECS", 60)?,
                cache_max_entries: parse_env_or_default("CATEGORY_CACHE_MAX_ENTRIES", 1_000)?,
            },
            auth: AuthConfig {
                jwt_public_key_pem: std::env::var("JWT_PUBLIC_KEY_PEM")
                    .ok()
                    .filter(|v| !v.trim().is_empty()),
            },
        })
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}
