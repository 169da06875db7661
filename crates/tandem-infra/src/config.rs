//! Configuration loader for Tandem.
//!
//! Reads `config.toml` from the data directory (`~/.tandem/` in production)
//! and deserializes it into [`TandemConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::{Path, PathBuf};

use tandem_types::config::{StoreConfig, TandemConfig};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "TANDEM_DATA_DIR";

/// At least one fetch-merge-write attempt.
const MIN_STORE_ATTEMPTS: u32 = 1;

/// Store deadlines below this are treated as misconfiguration.
const MIN_OPERATION_TIMEOUT_MS: u64 = 50;

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`TandemConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
pub async fn load_config(data_dir: &Path) -> TandemConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return TandemConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return TandemConfig::default();
        }
    };

    match toml::from_str::<TandemConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            TandemConfig::default()
        }
    }
}

/// Apply floors to the store retry policy: at least one attempt and an
/// operation deadline of at least 50 ms.
pub fn resolve_store_policy(store: &StoreConfig) -> StoreConfig {
    StoreConfig {
        max_attempts: store.max_attempts.max(MIN_STORE_ATTEMPTS),
        retry_backoff_ms: store.retry_backoff_ms,
        operation_timeout_ms: store.operation_timeout_ms.max(MIN_OPERATION_TIMEOUT_MS),
    }
}

/// Resolve the data directory.
///
/// Priority:
/// 1. `TANDEM_DATA_DIR` environment variable
/// 2. `~/.tandem`
/// 3. `.tandem` in the current directory
pub fn resolve_data_dir() -> PathBuf {
    data_dir_from(std::env::var(DATA_DIR_ENV).ok(), dirs::home_dir())
}

fn data_dir_from(env_dir: Option<String>, home: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = env_dir.filter(|d| !d.trim().is_empty()) {
        return PathBuf::from(dir);
    }
    match home {
        Some(home) => home.join(".tandem"),
        None => PathBuf::from(".tandem"),
    }
}
