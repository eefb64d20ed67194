use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::application::SuperadminSeed;

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("JWT_SECRET must be at least {MIN_SECRET_LEN} bytes")]
    WeakSecret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub backend: StoreBackend,
    /// Only present for the Postgres backend.
    pub database_url: Option<String>,
    pub pool_size: u32,
    pub storage_timeout: Duration,
    pub jwt_secret: String,
    /// Set when `SUPERADMIN_ID` is present.
    pub superadmin: Option<SuperadminSeed>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "PORT", 8080u16)?;
        let backend = parse_or(&lookup, "STORE_BACKEND", StoreBackend::Postgres)?;
        let pool_size = parse_or(&lookup, "DB_POOL_SIZE", 10u32)?;
        let timeout_secs = parse_or(&lookup, "STORAGE_TIMEOUT_SECS", 5u64)?;

        let database_url = match backend {
            StoreBackend::Postgres => Some(
                lookup("DATABASE_URL")
                    .filter(|u| !u.trim().is_empty())
                    .ok_or(ConfigError::Missing("DATABASE_URL"))?,
            ),
            StoreBackend::Memory => None,
        };

        let jwt_secret = lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret);
        }
        if pool_size == 0 {
            return Err(ConfigError::Invalid {
                name: "DB_POOL_SIZE",
                value: "0".to_string(),
            });
        }

        let superadmin = superadmin_seed(&lookup)?;

        Ok(Self {
            host,
            port,
            backend,
            database_url,
            pool_size,
            storage_timeout: Duration::from_secs(timeout_secs),
            jwt_secret,
            superadmin,
        })
    }
}

fn superadmin_seed<F>(lookup: &F) -> Result<Option<SuperadminSeed>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup("SUPERADMIN_ID").filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    let id = Uuid::parse_str(raw.trim()).map_err(|_| ConfigError::Invalid {
        name: "SUPERADMIN_ID",
        value: raw.clone(),
    })?;
    let email = lookup("SUPERADMIN_EMAIL").ok_or(ConfigError::Missing("SUPERADMIN_EMAIL"))?;
    if !email.contains('@') {
        return Err(ConfigError::Invalid {
            name: "SUPERADMIN_EMAIL",
            value: email,
        });
    }
    let name = lookup("SUPERADMIN_NAME")
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "Super Admin".to_string());
    Ok(Some(SuperadminSeed {
        id,
        name,
        email: email.trim().to_string(),
    }))
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
