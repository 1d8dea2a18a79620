//! Fetcher tuning knobs

use std::time::Duration;

use crossns_common::{Error, Result};
use crossns_rbac::{DEFAULT_MAX_CONCURRENT_RULE_QUERIES, DEFAULT_RESOLUTION_INTERVAL, DEFAULT_TTL};

/// Configuration for a [`CrossNamespaceFetcher`](crate::CrossNamespaceFetcher)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    /// Lifetime of a cached authorization row
    pub cache_ttl: Duration,
    /// Interval between maintenance sweeps
    pub resolution_interval: Duration,
    /// Deadline for each authorization rules query
    pub rules_query_timeout: Option<Duration>,
    /// Bound on in-flight rules queries within one build
    pub max_concurrent_rule_queries: usize,
    /// Deadline for each per-namespace list
    pub list_timeout: Option<Duration>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_TTL,
            resolution_interval: DEFAULT_RESOLUTION_INTERVAL,
            rules_query_timeout: None,
            max_concurrent_rule_queries: DEFAULT_MAX_CONCURRENT_RULE_QUERIES,
            list_timeout: None,
        }
    }
}

impl FetcherConfig {
    /// Reject values that would disable caching or stall the fetcher
    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl.is_zero() {
            return Err(Error::config("cache_ttl must be greater than zero"));
        }
        if self.resolution_interval.is_zero() {
            return Err(Error::config("resolution_interval must be greater than zero"));
        }
        if self.max_concurrent_rule_queries == 0 {
            return Err(Error::config(
                "max_concurrent_rule_queries must be at least 1",
            ));
        }
        if self.rules_query_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::config("rules_query_timeout must be greater than zero"));
        }
        if self.list_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::config("list_timeout must be greater than zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = FetcherConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.resolution_interval, Duration::from_secs(30));
        assert!(config.list_timeout.is_none());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = FetcherConfig {
            cache_ttl: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = FetcherConfig {
            max_concurrent_rule_queries: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let list = FetcherConfig {
            list_timeout: Some(Duration::ZERO),
            ..Default::default()
        };
        assert!(list.validate().is_err());

        let rules = FetcherConfig {
            rules_query_timeout: Some(Duration::ZERO),
            ..Default::default()
        };
        assert!(rules.validate().is_err());
    }
}
