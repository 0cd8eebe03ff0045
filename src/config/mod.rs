use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::models::Role;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/helpdesk";
const DEFAULT_PORT: u16 = 3001;
const DEV_AUTH_SECRET: &str = "dev-secret-helpdesk";
const DEFAULT_SESSION_TTL_DAYS: i64 = 7;
const DEFAULT_UPLOAD_DIR: &str = "./uploads";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("{0} must be set in production")]
    Missing(&'static str),
}

/// Staff account created or refreshed at startup.
#[derive(Debug, Clone)]
pub struct SeedUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub auth_secret: String,
    pub session_ttl_days: i64,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub cors_allowed_origins: Option<String>,
    pub production: bool,
    pub seed_user: Option<SeedUser>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let production = lookup("RUST_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let auth_secret = match lookup("AUTH_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None if production => return Err(ConfigError::Missing("AUTH_SECRET")),
            None => {
                tracing::warn!("AUTH_SECRET not set, using the development secret");
                DEV_AUTH_SECRET.to_string()
            }
        };

        let seed_user = match (lookup("SEED_USER_EMAIL"), lookup("SEED_USER_PASSWORD")) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some(SeedUser {
                    name: lookup("SEED_USER_NAME").unwrap_or_else(|| "Support Agent".to_string()),
                    email: email.trim().to_lowercase(),
                    password,
                    role: parse_or("SEED_USER_ROLE", lookup("SEED_USER_ROLE"), Role::Agent)?,
                })
            }
            _ => None,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            database_max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                lookup("DATABASE_MAX_CONNECTIONS"),
                DEFAULT_MAX_CONNECTIONS,
            )?,
            bind_addr: parse_or(
                "BIND_ADDR",
                lookup("BIND_ADDR"),
                SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            )?,
            auth_secret,
            session_ttl_days: parse_or(
                "SESSION_TTL_DAYS",
                lookup("SESSION_TTL_DAYS"),
                DEFAULT_SESSION_TTL_DAYS,
            )?,
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            max_upload_bytes: parse_or(
                "MAX_UPLOAD_BYTES",
                lookup("MAX_UPLOAD_BYTES"),
                DEFAULT_MAX_UPLOAD_BYTES,
            )?,
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS"),
            production,
            seed_user,
        })
    }

    /// Development defaults, no seed account.
    pub fn local() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            database_max_connections: DEFAULT_MAX_CONNECTIONS,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            auth_secret: DEV_AUTH_SECRET.to_string(),
            session_ttl_days: DEFAULT_SESSION_TTL_DAYS,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cors_allowed_origins: None,
            production: false,
            seed_user: None,
        }
    }
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) if value.trim().is_empty() => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bind_addr.port(), 3001);
        assert_eq!(config.session_ttl_days, 7);
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
        assert!(!config.production);
        assert!(config.seed_user.is_none());
    }

    #[test]
    fn test_production_requires_secret() {
        let err = Config::from_lookup(lookup(&[("RUST_ENV", "production")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("AUTH_SECRET")));

        let config =
            Config::from_lookup(lookup(&[("RUST_ENV", "Production"), ("AUTH_SECRET", "s3cr3t")]))
                .unwrap();
        assert!(config.production);
        assert_eq!(config.auth_secret, "s3cr3t");
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let err = Config::from_lookup(lookup(&[("SESSION_TTL_DAYS", "a week")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SESSION_TTL_DAYS", .. }));
    }

    #[test]
    fn test_seed_user() {
        let config = Config::from_lookup(lookup(&[
            ("SEED_USER_EMAIL", " Agent@Example.com "),
            ("SEED_USER_PASSWORD", "1234"),
            ("SEED_USER_ROLE", "admin"),
        ]))
        .unwrap();

        let seed = config.seed_user.unwrap();
        assert_eq!(seed.email, "agent@example.com");
        assert_eq!(seed.role, Role::Admin);
        assert_eq!(seed.name, "Support Agent");
    }
}
