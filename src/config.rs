//! Process configuration, read from the environment (after `.env` is loaded).

use std::net::SocketAddr;
use serde::{Deserialize, Serialize};

use crate::{EcommerceError, Result};

pub const DEV_SECRET: &str = "dev-only-secret-change-me";
/// Ten years.
pub const MAX_TOKEN_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Postgres URL. Without one the in-memory store is used.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub nats_url: Option<String>,
    #[serde(skip_serializing)]
    pub secret_key: String,
    pub token_ttl_secs: i64,
    pub seed_admin: bool,
    #[serde(skip_serializing)]
    pub admin_password: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            database_url: None,
            max_connections: 10,
            nats_url: None,
            secret_key: DEV_SECRET.to_string(),
            token_ttl_secs: 3600,
            seed_admin: true,
            admin_password: "admin".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(addr) = get("BIND_ADDR") {
            config.bind_addr = parse("BIND_ADDR", &addr)?;
        } else if let Some(port) = get("PORT") {
            config.bind_addr.set_port(parse("PORT", &port)?);
        }
        config.database_url = get("DATABASE_URL");
        if let Some(max) = get("DATABASE_MAX_CONNECTIONS") {
            config.max_connections = parse("DATABASE_MAX_CONNECTIONS", &max)?;
        }
        config.nats_url = get("NATS_URL");
        match get("SECRET_KEY") {
            Some(secret) => config.secret_key = secret,
            None => tracing::warn!("SECRET_KEY is not set; using the development signing secret"),
        }
        if let Some(ttl) = get("TOKEN_TTL_SECS") {
            config.token_ttl_secs = parse("TOKEN_TTL_SECS", &ttl)?;
            config.token_ttl()?;
        }
        if let Some(seed) = get("SEED_ADMIN") {
            config.seed_admin = parse("SEED_ADMIN", &seed)?;
        }
        if let Some(password) = get("ADMIN_PASSWORD") {
            config.admin_password = password;
        }
        Ok(config)
    }

    pub fn token_ttl(&self) -> Result<chrono::Duration> {
        chrono::Duration::try_seconds(self.token_ttl_secs)
            .filter(|_| (1..=MAX_TOKEN_TTL_SECS).contains(&self.token_ttl_secs))
            .ok_or_else(|| {
                EcommerceError::Validation(format!("TOKEN_TTL_SECS must be between 1 and {MAX_TOKEN_TTL_SECS}, got {}", self.token_ttl_secs))
            })
    }
}

fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e| EcommerceError::Validation(format!("{key}={raw}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn default_config() {
        let c = from(&[]).unwrap();
        assert_eq!(c.bind_addr, "0.0.0.0:5000".parse::<SocketAddr>().unwrap());
        assert!(c.database_url.is_none());
        assert_eq!(c.max_connections, 10);
        assert_eq!(c.token_ttl().unwrap().num_seconds(), 3600);
        assert_eq!(c.secret_key, DEV_SECRET);
        assert!(c.seed_admin);
    }

    #[test]
    fn env_overrides() {
        let c = from(&[
            ("PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("SECRET_KEY", "s3cret"),
            ("SEED_ADMIN", "false"),
            ("TOKEN_TTL_SECS", "60"),
            ("NATS_URL", " "),
        ])
        .unwrap();
        assert_eq!(c.bind_addr.port(), 8080);
        assert_eq!(c.database_url.as_deref(), Some("postgres://localhost/shop"));
        assert_eq!(c.secret_key, "s3cret");
        assert!(!c.seed_admin);
        assert_eq!(c.token_ttl_secs, 60);
        assert!(c.nats_url.is_none());
    }

    #[test]
    fn bind_addr_wins_over_port() {
        let c = from(&[("BIND_ADDR", "127.0.0.1:9000"), ("PORT", "1")]).unwrap();
        assert_eq!(c.bind_addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(from(&[("PORT", "eighty")]).is_err());
        assert!(from(&[("TOKEN_TTL_SECS", "0")]).is_err());
        assert!(from(&[("TOKEN_TTL_SECS", "-5")]).is_err());
        assert!(from(&[("TOKEN_TTL_SECS", i64::MAX.to_string().as_str())]).is_err());
        assert!(from(&[("TOKEN_TTL_SECS", (MAX_TOKEN_TTL_SECS + 1).to_string().as_str())]).is_err());
        assert!(from(&[("TOKEN_TTL_SECS", MAX_TOKEN_TTL_SECS.to_string().as_str())]).is_ok());
        assert!(from(&[("SEED_ADMIN", "maybe")]).is_err());
    }
}
