use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};

use log::{debug, info};
use thiserror::Error;

use crate::constants::RECIPE_COUNT_PER_PAGE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable {0} is required")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: SocketAddr,
    pub jwt_secret: String,
    pub media_root: PathBuf,
    pub page_size: i64,
    pub max_connections: u32,
}

impl Config {
    /// Reads the process environment, seeded from `.env` when present.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            debug!(".env not loaded: {e}");
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            bind_address: try_load(&lookup, "BIND_ADDRESS", "0.0.0.0:8000")?,
            jwt_secret: required("JWT_SECRET")?,
            media_root: try_load(&lookup, "MEDIA_ROOT", "media")?,
            page_size: try_load(&lookup, "PAGE_SIZE", &RECIPE_COUNT_PER_PAGE.to_string())?,
            max_connections: try_load(&lookup, "DB_MAX_CONNECTIONS", "5")?,
        })
    }
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(values: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn fills_in_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/foodgram"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.media_root, PathBuf::from("media"));
        assert_eq!(config.page_size, RECIPE_COUNT_PER_PAGE);
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn secrets_are_required() {
        let result = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/x")]));
        assert!(matches!(result, Err(ConfigError::Missing("JWT_SECRET"))));
    }

    #[test]
    fn malformed_values_are_reported() {
        let result = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/x"),
            ("JWT_SECRET", "secret"),
            ("PAGE_SIZE", "many"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                key: "PAGE_SIZE",
                ..
            })
        ));
    }
}
