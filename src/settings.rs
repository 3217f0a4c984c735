use std::{env, path::PathBuf, time::Duration};

use crate::{
    consts::{
        DEFAULT_BLOCK_REWARD_URL, DEFAULT_ETH_PRICE_URL, DEFAULT_HTTP_TIMEOUT,
        DEFAULT_SESSION_DB_PATH, DEFAULT_SNAPSHOT_MAX_AGE,
    },
    errors::SettingsError,
};

#[derive(Debug, Clone)]
pub struct Settings {
    pub telegram_token: String,
    pub etherscan_api_key: Option<String>,
    pub eth_price_url: String,
    pub block_reward_url: String,
    pub session_db_path: PathBuf,
    pub snapshot_max_age: Duration,
    pub http_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Settings, SettingsError> {
        Settings::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Settings, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let telegram_token = non_empty("TELEGRAM_TOKEN")
            .or_else(|| non_empty("TELOXIDE_TOKEN"))
            .ok_or(SettingsError::Missing("TELEGRAM_TOKEN"))?;

        Ok(Settings {
            telegram_token,
            etherscan_api_key: non_empty("ETHERSCAN_API_KEY"),
            eth_price_url: non_empty("ETH_PRICE_URL")
                .unwrap_or_else(|| DEFAULT_ETH_PRICE_URL.to_string()),
            block_reward_url: non_empty("BLOCK_REWARD_URL")
                .unwrap_or_else(|| DEFAULT_BLOCK_REWARD_URL.to_string()),
            session_db_path: non_empty("SESSION_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_DB_PATH)),
            snapshot_max_age: parse_secs(
                "SNAPSHOT_MAX_AGE_SECS",
                non_empty("SNAPSHOT_MAX_AGE_SECS"),
                DEFAULT_SNAPSHOT_MAX_AGE,
            )?,
            http_timeout: parse_secs(
                "HTTP_TIMEOUT_SECS",
                non_empty("HTTP_TIMEOUT_SECS"),
                DEFAULT_HTTP_TIMEOUT,
            )?,
        })
    }
}

fn parse_secs(
    name: &'static str,
    value: Option<String>,
    default: Duration,
) -> Result<Duration, SettingsError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| SettingsError::Invalid { name, value }),
    }
}
