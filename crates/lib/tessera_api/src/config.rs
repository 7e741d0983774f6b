//! API server configuration.

use tessera_core::auth::tokens::TokenSettings;

/// Refresh-cookie attributes.
#[derive(Clone, Debug)]
pub struct CookieSettings {
    pub name: String,
    pub http_only: bool,
    pub secure: bool,
    /// `Strict`, `Lax`, or `None`.
    pub same_site: String,
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3200").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Environment tag stamped into token claims.
    pub environment: String,
    /// Prefix prepended to path patterns when matching request paths.
    pub context_path: String,
    /// Token lifetimes.
    pub tokens: TokenSettings,
    /// Refresh-cookie attributes.
    pub cookie: CookieSettings,
    /// When true, a token's embedded remote address must match the caller.
    pub enforce_remote_address: bool,
    /// Path patterns reachable with client-only tokens.
    pub client_auth_paths: Vec<String>,
    /// Path patterns excluded from the client-path restriction.
    pub excluded_paths: Vec<String>,
    /// Minimum authorities for originless user requests.
    pub dev_authorities: Vec<String>,
    /// Minimum authorities for originless client requests.
    pub client_dev_authorities: Vec<String>,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                        | Default                              |
    /// |---------------------------------|--------------------------------------|
    /// | `BIND_ADDR`                     | `127.0.0.1:3200`                     |
    /// | `DATABASE_URL`                  | `postgres://localhost:5432/tessera`  |
    /// | `ENVIRONMENT`                   | `development`                        |
    /// | `CONTEXT_PATH`                  | (empty)                              |
    /// | `ACCESS_TOKEN_TTL_MINUTES`      | `15`                                 |
    /// | `LONG_ACCESS_TOKEN_TTL_MINUTES` | `240`                                |
    /// | `REFRESH_TOKEN_TTL_DAYS`        | `30`                                 |
    /// | `REFRESH_COOKIE_NAME`           | `tessera_refresh`                    |
    /// | `COOKIE_SECURE`                 | `false`                              |
    /// | `COOKIE_SAME_SITE`              | `Lax`                                |
    /// | `ENFORCE_REMOTE_ADDRESS`        | `false`                              |
    /// | `CLIENT_AUTH_PATHS`             | `/client/**` (comma-separated)       |
    /// | `EXCLUDED_PATHS`                | (empty, comma-separated)             |
    /// | `DEV_AUTHORITIES`               | `admin` (comma-separated)            |
    /// | `CLIENT_DEV_AUTHORITIES`        | `internal` (comma-separated)         |
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("BIND_ADDR", "127.0.0.1:3200"),
            database_url: env_or("DATABASE_URL", "postgres://localhost:5432/tessera"),
            environment: env_or("ENVIRONMENT", "development"),
            context_path: env_or("CONTEXT_PATH", ""),
            tokens: TokenSettings {
                access_ttl_minutes: env_i64("ACCESS_TOKEN_TTL_MINUTES", 15),
                long_access_ttl_minutes: env_i64("LONG_ACCESS_TOKEN_TTL_MINUTES", 240),
                refresh_ttl_days: env_i64("REFRESH_TOKEN_TTL_DAYS", 30),
            },
            cookie: CookieSettings {
                name: env_or("REFRESH_COOKIE_NAME", "tessera_refresh"),
                http_only: env_bool("COOKIE_HTTP_ONLY", true),
                secure: env_bool("COOKIE_SECURE", false),
                same_site: env_or("COOKIE_SAME_SITE", "Lax"),
            },
            enforce_remote_address: env_bool("ENFORCE_REMOTE_ADDRESS", false),
            client_auth_paths: env_list("CLIENT_AUTH_PATHS", &["/client/**"]),
            excluded_paths: env_list("EXCLUDED_PATHS", &[]),
            dev_authorities: env_list("DEV_AUTHORITIES", &["admin"]),
            client_dev_authorities: env_list("CLIENT_DEV_AUTHORITIES", &["internal"]),
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_i64(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_list(name: &str, default: &[&str]) -> Vec<String> {
    match std::env::var(name) {
        Ok(value) => value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => default.iter().map(|s| s.to_string()).collect(),
    }
}
