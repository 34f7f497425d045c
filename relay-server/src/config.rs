//! Configuration module for environment variable parsing.
//!
//! Everything is read once at startup; there is no reload.

use std::env;
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::relay::{Channel, RelayTarget};

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{env_var} contains an invalid URL `{value}`: {source}")]
    InvalidUrl {
        env_var: String,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("SMTP_HOST is set but neither MAIL_FROM nor SMTP_USER names a sender")]
    MissingSender,
}

/// SMTP transport settings. Present only when `SMTP_HOST` is set.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Lifetime of an issued verification code, in seconds
    pub otp_ttl_secs: u64,

    /// Mail transport; `None` means codes are only logged
    pub smtp: Option<SmtpSettings>,

    /// Ordered webhook destinations, one entry per channel
    pub relay_targets: Vec<RelayTarget>,

    /// HTTP timeout for each relay attempt in milliseconds
    pub relay_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let smtp = match env::var("SMTP_HOST").ok().filter(|h| !h.trim().is_empty()) {
            Some(host) => {
                let username = non_empty("SMTP_USER");
                let from = non_empty("MAIL_FROM")
                    .or_else(|| username.clone())
                    .ok_or(ConfigError::MissingSender)?;
                Some(SmtpSettings {
                    host: host.trim().to_string(),
                    port: parse_optional_number("SMTP_PORT"),
                    username,
                    password: non_empty("SMTP_PASSWORD"),
                    from,
                })
            }
            None => None,
        };

        let relay_targets = Channel::ALL
            .into_iter()
            .map(|channel| {
                parse_url_list(channel.env_var(), channel.default_url())
                    .map(|urls| RelayTarget::new(channel, urls))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Config {
            port: parse_number("PORT", 5000),
            otp_ttl_secs: parse_number("OTP_TTL_SECS", 300),
            smtp,
            relay_targets,
            relay_timeout_ms: parse_number("RELAY_TIMEOUT_MS", 10_000),
        })
    }
}

/// Parse a numeric variable, falling back to `default` when unset or invalid.
fn parse_number<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    parse_optional_number(name).unwrap_or(default)
}

/// Parse an optional numeric variable. Invalid values are logged and treated as unset.
fn parse_optional_number<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;

    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid number, ignoring");
            None
        }
    }
}

/// Read a variable, treating blank values as unset.
fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a comma-separated list of strings.
fn parse_csv(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

/// Parse an ordered URL list, using `default` when the variable is unset or empty.
fn parse_url_list(name: &str, default: &str) -> Result<Vec<Url>, ConfigError> {
    let raw = parse_csv(name)
        .filter(|list| !list.is_empty())
        .unwrap_or_else(|| vec![default.to_string()]);

    raw.into_iter()
        .map(|value| {
            Url::parse(&value).map_err(|source| ConfigError::InvalidUrl {
                env_var: name.to_string(),
                value,
                source,
            })
        })
        .collect()
}
