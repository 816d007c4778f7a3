use std::{env, fmt::Display, net::IpAddr, path::PathBuf, str::FromStr};

use tracing::{info, warn};

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub db_path: PathBuf,
    pub feed_default_limit: usize,
    pub feed_max_limit: usize,
    pub tweet_max_length: usize,
    /// Shared secret the identity system presents to sync profiles and open
    /// sessions. Those endpoints refuse every caller while it is unset.
    pub identity_secret: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self {
            host: try_load("HOST", "127.0.0.1")?,
            port: try_load("PORT", "3000")?,
            db_path: try_load("DB_PATH", "./db")?,
            feed_default_limit: try_load("FEED_DEFAULT_LIMIT", "10")?,
            feed_max_limit: try_load("FEED_MAX_LIMIT", "100")?,
            tweet_max_length: try_load("TWEET_MAX_LENGTH", "280")?,
            identity_secret: load_secret("IDENTITY_SECRET"),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.feed_max_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "FEED_MAX_LIMIT",
                value: self.feed_max_limit.to_string(),
                reason: "must be positive".into(),
            });
        }
        if !(1..=self.feed_max_limit).contains(&self.feed_default_limit) {
            return Err(ConfigError::Invalid {
                key: "FEED_DEFAULT_LIMIT",
                value: self.feed_default_limit.to_string(),
                reason: format!("must lie within 1..={}", self.feed_max_limit),
            });
        }
        if self.tweet_max_length == 0 {
            return Err(ConfigError::Invalid {
                key: "TWEET_MAX_LENGTH",
                value: self.tweet_max_length.to_string(),
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            db_path: PathBuf::from("./db"),
            feed_default_limit: 10,
            feed_max_limit: 100,
            tweet_max_length: 280,
            identity_secret: None,
        }
    }
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            value: value.clone(),
            reason: e.to_string(),
        }
    })
}

fn load_secret(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(secret) if !secret.trim().is_empty() => Some(secret.trim().to_string()),
        _ => {
            warn!("{key} not set, identity endpoints are disabled");
            None
        }
    }
}
