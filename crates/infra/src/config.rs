//! Runtime configuration read from `LARDER_*` environment variables.

use std::str::FromStr;

use thiserror::Error;

pub const EXPIRY_WARNING_DAYS: &str = "LARDER_EXPIRY_WARNING_DAYS";
pub const MAX_COMMIT_RETRIES: &str = "LARDER_MAX_COMMIT_RETRIES";
pub const SKIP_EXPIRED_LOTS: &str = "LARDER_SKIP_EXPIRED_LOTS";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LarderConfig {
    /// Days ahead of expiry at which a lot counts as expiring soon.
    pub expiry_warning_days: u32,
    /// Optimistic-concurrency retries for one ledger transaction.
    pub max_commit_retries: u32,
    /// Write off expired lots before deciding a reservation.
    pub skip_expired_lots: bool,
}

impl Default for LarderConfig {
    fn default() -> Self {
        Self {
            expiry_warning_days: 7,
            max_commit_retries: 3,
            skip_expired_lots: false,
        }
    }
}

impl LarderConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            expiry_warning_days: parse_or(&lookup, EXPIRY_WARNING_DAYS, defaults.expiry_warning_days)?,
            max_commit_retries: parse_or(&lookup, MAX_COMMIT_RETRIES, defaults.max_commit_retries)?,
            skip_expired_lots: match lookup(SKIP_EXPIRED_LOTS) {
                None => defaults.skip_expired_lots,
                Some(raw) => parse_flag(SKIP_EXPIRED_LOTS, &raw)?,
            },
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn unset_keys_use_defaults() {
        let config = LarderConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LarderConfig::default());
        assert_eq!(config.expiry_warning_days, 7);
        assert_eq!(config.max_commit_retries, 3);
        assert!(!config.skip_expired_lots);
    }

    #[test]
    fn values_are_parsed() {
        let config = LarderConfig::from_lookup(lookup(&[
            (EXPIRY_WARNING_DAYS, "3"),
            (MAX_COMMIT_RETRIES, " 10 "),
            (SKIP_EXPIRED_LOTS, "Yes"),
        ]))
        .unwrap();
        assert_eq!(config.expiry_warning_days, 3);
        assert_eq!(config.max_commit_retries, 10);
        assert!(config.skip_expired_lots);
    }

    #[test]
    fn invalid_values_name_the_key() {
        let err = LarderConfig::from_lookup(lookup(&[(MAX_COMMIT_RETRIES, "-1")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: MAX_COMMIT_RETRIES,
                value: "-1".to_string()
            }
        );

        let err = LarderConfig::from_lookup(lookup(&[(SKIP_EXPIRED_LOTS, "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: SKIP_EXPIRED_LOTS, .. }));
    }
}
