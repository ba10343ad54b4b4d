//! Runtime configuration from the environment (`.env` is honoured via dotenvy)

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8083;
pub const DEFAULT_MAX_DB_CONNECTIONS: u32 = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// PostgreSQL URL. Without it the service runs on the in-memory store.
    pub database_url: Option<String>,
    pub max_db_connections: u32,
    pub port: u16,
    pub nats_url: Option<String>,
    /// Email granted the admin role at startup.
    pub bootstrap_admin: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    NotANumber { name: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Ok(Self {
            database_url: get("DATABASE_URL"),
            max_db_connections: number("GROUPBUY_MAX_DB_CONNECTIONS", get("GROUPBUY_MAX_DB_CONNECTIONS"))?.unwrap_or(DEFAULT_MAX_DB_CONNECTIONS),
            port: number("PORT", get("PORT"))?.unwrap_or(DEFAULT_PORT),
            nats_url: get("NATS_URL"),
            bootstrap_admin: get("GROUPBUY_BOOTSTRAP_ADMIN"),
        })
    }
}

fn number<T: std::str::FromStr>(name: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError> {
    value.map(|v| v.parse().map_err(|_| ConfigError::NotANumber { name, value: v })).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let c = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(c.port, DEFAULT_PORT);
        assert_eq!(c.max_db_connections, DEFAULT_MAX_DB_CONNECTIONS);
        assert_eq!(c.database_url, None);
    }

    #[test]
    fn test_values_and_blanks() {
        let c = Config::from_lookup(lookup(&[("PORT", "9000"), ("NATS_URL", "  "), ("GROUPBUY_BOOTSTRAP_ADMIN", "owner@example.com")])).unwrap();
        assert_eq!(c.port, 9000);
        assert_eq!(c.nats_url, None);
        assert_eq!(c.bootstrap_admin.as_deref(), Some("owner@example.com"));
    }

    #[test]
    fn test_bad_port() {
        let err = Config::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert_eq!(err, ConfigError::NotANumber { name: "PORT", value: "eighty".into() });
    }
}
