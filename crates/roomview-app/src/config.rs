//! Coordinator configuration.

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Tunables for the coordinator and its runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Retry bound and spacing for join requests. Only gateway timeouts are
    /// retried.
    pub join_retry: RetryPolicy,
    /// Drop the follow-up navigation of an alias resolution that finished
    /// after a newer navigation superseded it. The cache is still updated.
    pub discard_stale_alias_results: bool,
    /// Peek value for navigations that do not specify one.
    pub default_should_peek: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            join_retry: RetryPolicy::default(),
            discard_stale_alias_results: true,
            default_should_peek: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::DEFAULT_JOIN_ATTEMPTS;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: Result<CoordinatorConfig, _> =
            serde_json::from_str(r#"{ "discard_stale_alias_results": false }"#);

        let Ok(config) = config else {
            unreachable!("partial config rejected: {config:?}");
        };
        assert!(!config.discard_stale_alias_results);
        assert!(config.default_should_peek);
        assert_eq!(config.join_retry, RetryPolicy::default());
        assert_eq!(config.join_retry.max_attempts(), DEFAULT_JOIN_ATTEMPTS);
    }

    #[test]
    fn partial_retry_policy_keeps_attempt_cap() {
        let config: Result<CoordinatorConfig, _> =
            serde_json::from_str(r#"{ "join_retry": { "base_delay_ms": 250, "max_delay_ms": 4000 } }"#);

        let Ok(config) = config else {
            unreachable!("partial config rejected: {config:?}");
        };
        assert_eq!(config.join_retry.max_attempts(), 5);
        assert_eq!(config.join_retry.base_delay_ms(), 250);
        assert_eq!(config.join_retry.delay_for_attempt(1).as_millis(), 500);
        assert!(config.discard_stale_alias_results);
    }

    #[test]
    fn empty_config_is_default() {
        let config: Result<CoordinatorConfig, _> = serde_json::from_str("{}");
        assert_eq!(config.ok(), Some(CoordinatorConfig::default()));
    }
}
