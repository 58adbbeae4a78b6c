use std::path::PathBuf;
use std::time::Duration;

use guide_common::session::Session;

use crate::error::AppError;

/// Application configuration loaded explicitly from environment variables.
///
/// The data directory has no default; the caller must provide it. Everything else falls back
/// to the values the mobile client ships with.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of durable storage. Guides live under `guides/`, metadata in `meta.json`.
    pub data_dir: PathBuf,
    /// Read-cache capacity in guides.
    pub cache_capacity: usize,
    /// Absolute lifetime of a read-cache entry.
    pub cache_ttl: Duration,
    /// Floor between the first favorite change and the remote push.
    pub favorites_sync_delay: Duration,
    /// Settle time before a typed query reaches the merge engine.
    pub search_debounce: Duration,
    pub language: String,
    pub device_family: String,
    /// Session to start with, e.g. a token handed over by a sign-in helper.
    pub initial_session: Option<Session>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `GUIDE_DATA_DIR`: durable storage root
    ///
    /// Optional:
    /// - `GUIDE_CACHE_CAPACITY` (default: 100)
    /// - `GUIDE_CACHE_TTL_SECS` (default: 86400)
    /// - `FAVORITES_SYNC_DELAY_SECS` (default: 30)
    /// - `SEARCH_DEBOUNCE_MS` (default: 300)
    /// - `GUIDE_LANGUAGE` (default: "en")
    /// - `GUIDE_DEVICE_FAMILY` (default: "android-generic")
    /// - `GUIDE_USER_EMAIL` and `GUIDE_ID_TOKEN`: both set starts signed in
    pub fn from_env() -> Result<Self, AppError> {
        let data_dir = std::env::var("GUIDE_DATA_DIR").map_err(|_| {
            AppError::Config("GUIDE_DATA_DIR environment variable is required".to_string())
        })?;
        if data_dir.trim().is_empty() {
            return Err(AppError::Config("GUIDE_DATA_DIR must not be empty".to_string()));
        }

        let cache_capacity = env_parse::<usize>("GUIDE_CACHE_CAPACITY")?.unwrap_or(100);
        if cache_capacity == 0 {
            return Err(AppError::Config(
                "GUIDE_CACHE_CAPACITY must be greater than zero".to_string(),
            ));
        }

        let initial_session = match (
            std::env::var("GUIDE_USER_EMAIL").ok(),
            std::env::var("GUIDE_ID_TOKEN").ok(),
        ) {
            (Some(email), Some(id_token)) if !id_token.is_empty() => Some(Session { email, id_token }),
            _ => None,
        };

        Ok(Self {
            data_dir: PathBuf::from(data_dir),
            cache_capacity,
            cache_ttl: Duration::from_secs(env_parse("GUIDE_CACHE_TTL_SECS")?.unwrap_or(86_400)),
            favorites_sync_delay: Duration::from_secs(
                env_parse("FAVORITES_SYNC_DELAY_SECS")?.unwrap_or(30),
            ),
            search_debounce: Duration::from_millis(env_parse("SEARCH_DEBOUNCE_MS")?.unwrap_or(300)),
            language: std::env::var("GUIDE_LANGUAGE").unwrap_or_else(|_| "en".to_string()),
            device_family: std::env::var("GUIDE_DEVICE_FAMILY")
                .unwrap_or_else(|_| "android-generic".to_string()),
            initial_session,
        })
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, AppError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::Config(format!("{name} has an invalid value: {raw}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_parse_reports_bad_values() {
        std::env::set_var("GUIDE_HELPER_TEST_BAD_NUMBER", "abc");
        let err = env_parse::<u64>("GUIDE_HELPER_TEST_BAD_NUMBER").expect_err("invalid");
        assert!(err.to_string().contains("GUIDE_HELPER_TEST_BAD_NUMBER"));
        std::env::remove_var("GUIDE_HELPER_TEST_BAD_NUMBER");
    }

    #[test]
    fn env_parse_missing_is_none() {
        let value = env_parse::<u64>("GUIDE_HELPER_TEST_UNSET_NUMBER").expect("unset is fine");
        assert!(value.is_none());
    }
}
