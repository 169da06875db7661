//! Configuration types for Tandem.
//!
//! `TandemConfig` represents the top-level `config.toml` that controls the
//! store retry policy, collaborator endpoint and timeouts, the session
//! mention token, and which intent classifier the router uses.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration. Every field has a default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TandemConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub collaborator: CollaboratorConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
}

/// Optimistic-concurrency retry policy and per-operation deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Fetch-merge-write attempts before giving up with `ConcurrencyExceeded`.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay between attempts; doubles on each retry.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Deadline for each individual store read or write.
    #[serde(default = "default_store_timeout_ms")]
    pub operation_timeout_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_backoff_ms() -> u64 {
    20
}

fn default_store_timeout_ms() -> u64 {
    5_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            operation_timeout_ms: default_store_timeout_ms(),
        }
    }
}

impl StoreConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Completion collaborator endpoint and deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaboratorConfig {
    /// HTTP endpoint accepting completion requests. Unset disables automated turns.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Environment variable holding the bearer token.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_collaborator_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_api_key_env() -> String {
    "TANDEM_COLLABORATOR_KEY".to_string()
}

fn default_collaborator_timeout_ms() -> u64 {
    30_000
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key_env: default_api_key_env(),
            timeout_ms: default_collaborator_timeout_ms(),
        }
    }
}

impl CollaboratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Prefix that, followed by an assistant participant id, triggers an automated turn.
    #[serde(default = "default_mention_prefix")]
    pub mention_prefix: String,
}

fn default_mention_prefix() -> String {
    "@".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mention_prefix: default_mention_prefix(),
        }
    }
}

/// Which classifier the intent router uses when no agent is bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    #[default]
    Keyword,
    Completion,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default)]
    pub classifier: ClassifierKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_values() {
        let config = TandemConfig::default();
        assert_eq!(config.store.max_attempts, 5);
        assert_eq!(config.store.operation_timeout(), Duration::from_secs(5));
        assert_eq!(config.sessions.mention_prefix, "@");
        assert_eq!(config.routing.classifier, ClassifierKind::Keyword);
        assert!(config.collaborator.endpoint.is_none());
    }

    #[test]
    fn test_config_deserialize_with_defaults() {
        let config: TandemConfig = toml::from_str("").unwrap();
        assert_eq!(config.store.retry_backoff_ms, 20);
        assert_eq!(config.collaborator.timeout_ms, 30_000);
        assert_eq!(config.collaborator.api_key_env, "TANDEM_COLLABORATOR_KEY");
    }

    #[test]
    fn test_config_deserialize_with_values() {
        let toml_str = r#"
[store]
max_attempts = 8
operation_timeout_ms = 1500

[collaborator]
endpoint = "http://localhost:8088/v1/complete"

[sessions]
mention_prefix = "!"

[routing]
classifier = "completion"
"#;
        let config: TandemConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.store.max_attempts, 8);
        assert_eq!(config.store.retry_backoff_ms, 20);
        assert_eq!(config.store.operation_timeout_ms, 1500);
        assert_eq!(
            config.collaborator.endpoint.as_deref(),
            Some("http://localhost:8088/v1/complete")
        );
        assert_eq!(config.sessions.mention_prefix, "!");
        assert_eq!(config.routing.classifier, ClassifierKind::Completion);
    }
}
