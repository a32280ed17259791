//! Configuration loader for choreo.
//!
//! Reads `config.toml` from the data directory (`~/.choreo/` by default) and
//! deserializes it into [`ChoreoConfig`]. Falls back to defaults when the file
//! is missing or malformed.

use std::path::{Path, PathBuf};

use choreo_types::config::ChoreoConfig;

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "CHOREO_DATA_DIR";

/// Resolve the data directory.
///
/// Priority:
/// 1. `CHOREO_DATA_DIR` environment variable
/// 2. `~/.choreo`
/// 3. `./.choreo`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".choreo");
    }
    PathBuf::from(".choreo")
}

/// Load configuration from `{data_dir}/config.toml`.
pub async fn load_from_data_dir(data_dir: &Path) -> ChoreoConfig {
    load_config(&data_dir.join(CONFIG_FILE_NAME)).await
}

/// Load configuration from an explicit file.
///
/// - Missing file: defaults.
/// - Unreadable or unparsable file: a warning, then defaults.
pub async fn load_config(path: &Path) -> ChoreoConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config found at {}, using defaults", path.display());
            return ChoreoConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return ChoreoConfig::default();
        }
    };

    match toml::from_str::<ChoreoConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            ChoreoConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_from_data_dir(tmp.path()).await;
        assert!(config.features.auto_ticketing);
        assert_eq!(config.dispatch.critical_actions, vec!["create_ticket"]);
        assert_eq!(config.registry.max_entries, 1000);
    }

    #[tokio::test]
    async fn valid_toml_is_parsed_and_rest_defaulted() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            r##"
[features]
documentation = false

[dispatch]
max_context_bytes = 4096

[playbook]
alert_channel = "#war-room"
repositories = ["acme/api", "acme/web"]
deadline_ms = 30000

[registry]
retention_secs = 60
"##,
        )
        .await
        .unwrap();

        let config = load_from_data_dir(tmp.path()).await;
        assert!(!config.features.documentation);
        assert!(config.features.chat_notifications);
        assert_eq!(config.playbook.alert_channel, "#war-room");
        assert_eq!(config.playbook.repositories.len(), 2);
        assert_eq!(config.playbook.deployment_environment, "production");
        assert_eq!(config.registry.retention_secs, 60);
        assert_eq!(config.registry.max_entries, 1000);
        assert_eq!(config.dispatch.default_hours_back, 24);
        assert_eq!(config.dispatch.max_context_bytes, 4096);
        assert_eq!(config.dispatch.max_result_bytes, 1_048_576);
        assert_eq!(config.playbook.deadline_ms, Some(30_000));
    }

    #[tokio::test]
    async fn invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        tokio::fs::write(&path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(&path).await;
        assert!(config.features.documentation);
        assert_eq!(config.playbook.alert_channel, "#incident-response");
    }

    #[test]
    fn data_dir_from_env() {
        // SAFETY: single-threaded test, restored immediately.
        unsafe {
            std::env::set_var(DATA_DIR_ENV, "/tmp/test-choreo");
        }
        let dir = resolve_data_dir();
        assert_eq!(dir, PathBuf::from("/tmp/test-choreo"));
        unsafe {
            std::env::remove_var(DATA_DIR_ENV);
        }
    }
}
