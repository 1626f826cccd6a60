use chrono::NaiveTime;

use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_TRIGGER_TIME: &str = "23:30";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_MAX_RESULTS: u32 = 100;

const REQUIRED_KEYS: [&str; 6] = [
    "X_API_KEY",
    "X_API_SECRET",
    "X_ACCESS_TOKEN",
    "X_ACCESS_TOKEN_SECRET",
    "EMAIL_USERNAME",
    "EMAIL_PASSWORD",
];

#[derive(Debug, Clone)]
pub struct Config {
    // X API credentials (OAuth 1.0a user context)
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_token_secret: String,

    // Email configuration
    pub email_username: String,
    pub email_password: String,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub to_email: String,

    // Schedule configuration
    pub trigger_time: NaiveTime,
    pub poll_interval: Duration,
    pub max_results: u32,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// All required keys are checked before any parsing so that a single
    /// startup failure reports the full missing set.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let missing: Vec<&'static str> = REQUIRED_KEYS
            .iter()
            .filter(|key| lookup(key).map_or(true, |v| v.is_empty()))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let required = |key: &str| lookup(key).unwrap_or_default();

        let email_username = required("EMAIL_USERNAME");
        let to_email = lookup("DIGEST_TO_EMAIL").unwrap_or_else(|| email_username.clone());

        let smtp_server = lookup("SMTP_SERVER").unwrap_or_else(|| DEFAULT_SMTP_SERVER.to_string());
        let smtp_port = match lookup("SMTP_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "SMTP_PORT",
                reason: format!("{raw:?} is not a valid port number"),
            })?,
            None => DEFAULT_SMTP_PORT,
        };

        let trigger_raw =
            lookup("TRIGGER_TIME").unwrap_or_else(|| DEFAULT_TRIGGER_TIME.to_string());
        let trigger_time = NaiveTime::parse_from_str(&trigger_raw, "%H:%M").map_err(|_| {
            ConfigError::Invalid {
                key: "TRIGGER_TIME",
                reason: format!("{trigger_raw:?} is not a valid HH:MM time of day"),
            }
        })?;

        let poll_interval_secs = match lookup("POLL_INTERVAL_SECS") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "POLL_INTERVAL_SECS",
                reason: format!("{raw:?} is not a valid number of seconds"),
            })?,
            None => DEFAULT_POLL_INTERVAL_SECS,
        };

        let max_results = match lookup("MAX_RESULTS") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "MAX_RESULTS",
                reason: format!("{raw:?} is not a valid result count"),
            })?,
            None => DEFAULT_MAX_RESULTS,
        };

        Ok(Config {
            api_key: required("X_API_KEY"),
            api_secret: required("X_API_SECRET"),
            access_token: required("X_ACCESS_TOKEN"),
            access_token_secret: required("X_ACCESS_TOKEN_SECRET"),
            email_username,
            email_password: required("EMAIL_PASSWORD"),
            smtp_server,
            smtp_port,
            to_email,
            trigger_time,
            poll_interval: Duration::from_secs(poll_interval_secs),
            max_results,
        })
    }
}
