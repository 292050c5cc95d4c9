//! Asset resolver configuration.
//!
//! Loaded from environment variables with defaults that reproduce the
//! historical behaviour: no fetch timeout and no cap on buffered bodies.

use std::time::Duration;

use stowage_core::ConfigError;

/// Configuration for the asset resolver and its HTTP fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetConfig {
    /// Whole-request timeout for outbound fetches. `None` waits forever,
    /// leaving cancellation to the caller dropping the request future.
    pub fetch_timeout: Option<Duration>,

    /// Largest body that may be held in memory when it has to be hashed
    /// before it can be stored. `None` means unbounded.
    pub max_buffered_bytes: Option<u64>,

    /// User-Agent sent with outbound fetches.
    pub user_agent: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: None,
            max_buffered_bytes: None,
            user_agent: format!("stowage/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl AssetConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn with_max_buffered_bytes(mut self, max: u64) -> Self {
        self.max_buffered_bytes = Some(max);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Create AssetConfig from environment variables.
    ///
    /// Environment variables:
    /// - `STOWAGE_FETCH_TIMEOUT_SECS`: Fetch timeout in seconds (default: none)
    /// - `STOWAGE_MAX_BUFFERED_BYTES`: Buffered body cap in bytes (default: none)
    /// - `STOWAGE_USER_AGENT`: User-Agent header (default: stowage/<version>)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let fetch_timeout = parse_env::<u64>("STOWAGE_FETCH_TIMEOUT_SECS")?.map(Duration::from_secs);
        let max_buffered_bytes = parse_env::<u64>("STOWAGE_MAX_BUFFERED_BYTES")?;
        let user_agent = std::env::var("STOWAGE_USER_AGENT")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.user_agent);

        let config = Self {
            fetch_timeout,
            max_buffered_bytes,
            user_agent,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every fetch fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::InvalidValue {
                field: "fetch_timeout".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.max_buffered_bytes == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_buffered_bytes".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "user_agent".to_string(),
                value: self.user_agent.clone(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                field: name.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AssetConfig::default();
        assert_eq!(config.fetch_timeout, None);
        assert_eq!(config.max_buffered_bytes, None);
        assert!(config.user_agent.starts_with("stowage/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = AssetConfig::new()
            .with_fetch_timeout(Duration::from_secs(30))
            .with_max_buffered_bytes(1 << 20)
            .with_user_agent("bazel-mirror");
        assert_eq!(config.fetch_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.max_buffered_bytes, Some(1 << 20));
        assert_eq!(config.user_agent, "bazel-mirror");
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let zero_timeout = AssetConfig::new().with_fetch_timeout(Duration::ZERO);
        assert!(matches!(
            zero_timeout.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "fetch_timeout"
        ));

        let zero_cap = AssetConfig::new().with_max_buffered_bytes(0);
        assert!(zero_cap.validate().is_err());

        let blank_agent = AssetConfig::new().with_user_agent("  ");
        assert!(blank_agent.validate().is_err());
    }

    #[test]
    fn test_parse_env_reports_bad_values() {
        std::env::set_var("STOWAGE_TEST_PARSE_ENV_BAD", "ten");
        let err = parse_env::<u64>("STOWAGE_TEST_PARSE_ENV_BAD").unwrap_err();
        assert!(err.to_string().contains("STOWAGE_TEST_PARSE_ENV_BAD"));
        std::env::remove_var("STOWAGE_TEST_PARSE_ENV_BAD");

        assert_eq!(parse_env::<u64>("STOWAGE_TEST_PARSE_ENV_UNSET").unwrap(), None);
    }
}
