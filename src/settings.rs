//! Process settings from environment variables.

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::str::FromStr;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/innohub";
pub const DEFAULT_SCHEMA: &str = "innohub";
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreKind::Postgres),
            "memory" => Ok(StoreKind::Memory),
            _ => Err("expected postgres or memory".into()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    /// Schema holding every hub table.
    pub schema: String,
    pub store: StoreKind,
    pub bind: SocketAddr,
    pub max_connections: u32,
    /// Maximum request body size in bytes.
    pub body_limit: usize,
}

impl Settings {
    /// `DATABASE_URL`, `INNOHUB_SCHEMA`, `INNOHUB_STORE`, `INNOHUB_BIND`,
    /// `INNOHUB_MAX_CONNECTIONS`, `INNOHUB_BODY_LIMIT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let schema = get("INNOHUB_SCHEMA").unwrap_or_else(|| DEFAULT_SCHEMA.into());
        if !is_identifier(&schema) {
            return Err(ConfigError::InvalidSetting {
                key: "INNOHUB_SCHEMA",
                value: schema,
                reason: "must be a lower-case identifier ([a-z_][a-z0-9_]*)".into(),
            });
        }

        Ok(Settings {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            schema,
            store: parse(get("INNOHUB_STORE"), "INNOHUB_STORE", StoreKind::Postgres)?,
            bind: parse(get("INNOHUB_BIND"), "INNOHUB_BIND", default_bind())?,
            max_connections: parse(
                get("INNOHUB_MAX_CONNECTIONS"),
                "INNOHUB_MAX_CONNECTIONS",
                DEFAULT_MAX_CONNECTIONS,
            )?,
            body_limit: parse(get("INNOHUB_BODY_LIMIT"), "INNOHUB_BODY_LIMIT", DEFAULT_BODY_LIMIT)?,
        })
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn parse<T>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::InvalidSetting {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && s.len() <= 63
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(s.schema, "innohub");
        assert_eq!(s.store, StoreKind::Postgres);
        assert_eq!(s.bind.to_string(), DEFAULT_BIND);
        assert_eq!(s.max_connections, 5);
        assert_eq!(s.body_limit, DEFAULT_BODY_LIMIT);
    }

    #[test]
    fn values_are_parsed() {
        let s = settings(&[
            ("INNOHUB_STORE", "Memory"),
            ("INNOHUB_BIND", "127.0.0.1:8080"),
            ("INNOHUB_MAX_CONNECTIONS", "12"),
            ("INNOHUB_SCHEMA", "hub_2024"),
        ])
        .unwrap();
        assert_eq!(s.store, StoreKind::Memory);
        assert_eq!(s.bind.port(), 8080);
        assert_eq!(s.max_connections, 12);
        assert_eq!(s.schema, "hub_2024");
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = settings(&[("INNOHUB_SCHEMA", "hub; drop")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { key: "INNOHUB_SCHEMA", .. }));
        let err = settings(&[("INNOHUB_BODY_LIMIT", "lots")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { key: "INNOHUB_BODY_LIMIT", .. }));
        let err = settings(&[("INNOHUB_STORE", "sqlite")]).unwrap_err();
        assert!(err.to_string().contains("expected postgres or memory"));
    }
}
