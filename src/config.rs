//! Runtime configuration from environment variables.
//!
//! A `.env` file is loaded first if present. Remote endpoints are optional:
//! without a quote proxy prices fall back to reference prices, without a
//! points endpoint the outbox just keeps accumulating.

use std::path::PathBuf;
use std::time::Duration;

use crate::quotes::DEFAULT_POLL_INTERVAL;

pub const DEFAULT_STARTING_BALANCE: f64 = 10_000.0;
pub const DEFAULT_USER_ID: &str = "local";
const DB_FILE_NAME: &str = "academy.db";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub quote_proxy_url: Option<String>,
    pub points_url: Option<String>,
    pub prediction_url: Option<String>,
    pub api_key: Option<String>,
    pub poll_interval: Duration,
    pub starting_balance: f64,
    pub db_path: PathBuf,
    pub user_id: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup; unset, blank or unparsable
    /// values fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let poll_interval = match get("ACADEMY_POLL_INTERVAL_SECS").map(|v| v.parse::<u64>()) {
            Some(Ok(secs)) if secs > 0 => Duration::from_secs(secs),
            Some(_) => {
                log::warn!("Ignoring invalid ACADEMY_POLL_INTERVAL_SECS");
                DEFAULT_POLL_INTERVAL
            }
            None => DEFAULT_POLL_INTERVAL,
        };

        let starting_balance = match get("ACADEMY_STARTING_BALANCE").map(|v| v.parse::<f64>()) {
            Some(Ok(value)) if value.is_finite() && value >= 0.0 => value,
            Some(_) => {
                log::warn!("Ignoring invalid ACADEMY_STARTING_BALANCE");
                DEFAULT_STARTING_BALANCE
            }
            None => DEFAULT_STARTING_BALANCE,
        };

        Self {
            quote_proxy_url: get("ACADEMY_QUOTE_PROXY_URL"),
            points_url: get("ACADEMY_POINTS_URL"),
            prediction_url: get("ACADEMY_PREDICTION_URL"),
            api_key: get("ACADEMY_API_KEY"),
            poll_interval,
            starting_balance,
            db_path: get("ACADEMY_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_db_path),
            user_id: get("ACADEMY_USER_ID").unwrap_or_else(|| DEFAULT_USER_ID.to_string()),
        }
    }
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stock-academy")
        .join(DB_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config.quote_proxy_url, None);
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.starting_balance, DEFAULT_STARTING_BALANCE);
        assert_eq!(config.user_id, DEFAULT_USER_ID);
        assert!(config.db_path.ends_with("stock-academy/academy.db"));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("ACADEMY_QUOTE_PROXY_URL", "https://proxy.example.test"),
            ("ACADEMY_POLL_INTERVAL_SECS", "30"),
            ("ACADEMY_STARTING_BALANCE", "2500.5"),
            ("ACADEMY_DB_PATH", "/tmp/academy-test.db"),
            ("ACADEMY_USER_ID", " user-7 "),
        ]);

        assert_eq!(config.quote_proxy_url.as_deref(), Some("https://proxy.example.test"));
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.starting_balance, 2500.5);
        assert_eq!(config.db_path, PathBuf::from("/tmp/academy-test.db"));
        assert_eq!(config.user_id, "user-7");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config(&[
            ("ACADEMY_POLL_INTERVAL_SECS", "0"),
            ("ACADEMY_STARTING_BALANCE", "-5"),
            ("ACADEMY_API_KEY", "   "),
        ]);

        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.starting_balance, DEFAULT_STARTING_BALANCE);
        assert_eq!(config.api_key, None);
    }
}
