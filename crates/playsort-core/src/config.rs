use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::PlaysortError;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub sync: SyncConfig,
    pub paths: PathsConfig,
    pub state: StateConfig,
    pub logging: LoggingConfig,
    /// Directory relative paths are resolved against.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub channel_id: String,
    pub max_process_count: usize,
    pub unlimited: bool,
    pub feed_page_size: u32,
    pub feed_max_pages: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub rules: PathBuf,
    pub token: PathBuf,
    pub client_secrets: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    pub backend: StateBackend,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub file: bool,
}

impl SyncConfig {
    /// The configured channel id, if set.
    pub fn channel_id(&self) -> Option<&str> {
        let id = self.channel_id.trim();
        (!id.is_empty()).then_some(id)
    }

    /// Per-run cap on new insertions; `None` when uncapped.
    pub fn processing_cap(&self) -> Option<usize> {
        (!self.unlimited).then_some(self.max_process_count)
    }
}

impl AppConfig {
    /// Load config: user file (if exists) merged over built-in defaults.
    pub fn load() -> Result<Self, PlaysortError> {
        let user_path = Self::config_path();
        if user_path.exists() {
            Self::load_from(&user_path)
        } else {
            let mut config = Self::from_toml_str("")?;
            config.base_dir = user_path.parent().map(Path::to_path_buf);
            Ok(config)
        }
    }

    /// Load a specific config file merged over built-in defaults.
    pub fn load_from(path: &Path) -> Result<Self, PlaysortError> {
        let user_str = std::fs::read_to_string(path)
            .map_err(|e| PlaysortError::Config(format!("{}: {e}", path.display())))?;
        let mut config = Self::from_toml_str(&user_str)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parse `user` and merge it over the built-in defaults.
    pub fn from_toml_str(user: &str) -> Result<Self, PlaysortError> {
        let mut merged: toml::Table =
            toml::from_str(DEFAULT_CONFIG).map_err(|e| PlaysortError::Config(e.to_string()))?;
        let overlay: toml::Table =
            toml::from_str(user).map_err(|e| PlaysortError::Config(e.to_string()))?;
        merge_tables(&mut merged, overlay);
        toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| PlaysortError::Config(e.to_string()))
    }

    /// Save current config to `path`.
    pub fn save(&self, path: &Path) -> Result<(), PlaysortError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PlaysortError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Path to user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Directory for log files.
    pub fn log_dir() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.data_dir().join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    }

    /// Resolve a configured path against the config file's directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn rules_path(&self) -> PathBuf {
        self.resolve(&self.paths.rules)
    }

    pub fn token_path(&self) -> PathBuf {
        self.resolve(&self.paths.token)
    }

    pub fn client_secrets_path(&self) -> PathBuf {
        self.resolve(&self.paths.client_secrets)
    }

    pub fn state_path(&self) -> PathBuf {
        self.resolve(&self.state.path)
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "playsort")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}

/// Recursively overlay `overlay` onto `base`. Tables merge, everything else
/// is replaced.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = AppConfig::default();
        assert_eq!(config.sync.max_process_count, 10);
        assert!(!config.sync.unlimited);
        assert_eq!(config.sync.feed_page_size, 20);
        assert_eq!(config.sync.feed_max_pages, 1);
        assert_eq!(config.sync.channel_id(), None);
        assert_eq!(config.state.backend, StateBackend::Json);
        assert!(!config.logging.file);
    }

    #[test]
    fn test_partial_user_file_merges_over_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [sync]
            channel_id = "UC123"
            max_process_count = 3

            [state]
            backend = "sqlite"
            "#,
        )
        .unwrap();
        assert_eq!(config.sync.channel_id(), Some("UC123"));
        assert_eq!(config.sync.processing_cap(), Some(3));
        assert_eq!(config.sync.feed_page_size, 20);
        assert_eq!(config.state.backend, StateBackend::Sqlite);
        assert_eq!(config.state.path, PathBuf::from("state.json"));
        assert_eq!(config.paths.rules, PathBuf::from("rules.json"));
    }

    #[test]
    fn test_unlimited_disables_cap() {
        let config = AppConfig::from_toml_str("[sync]\nunlimited = true").unwrap();
        assert_eq!(config.sync.processing_cap(), None);
    }

    #[test]
    fn test_invalid_backend_rejected() {
        let err = AppConfig::from_toml_str("[state]\nbackend = \"redis\"").unwrap_err();
        assert!(matches!(err, PlaysortError::Config(_)));
    }

    #[test]
    fn test_relative_paths_resolve_against_config_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[paths]\nrules = \"my-rules.json\"\ntoken = \"/abs/token.json\"").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.rules_path(), dir.path().join("my-rules.json"));
        assert_eq!(config.token_path(), PathBuf::from("/abs/token.json"));
        assert_eq!(config.state_path(), dir.path().join("state.json"));
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = AppConfig::default();
        config.sync.channel_id = "UC_TARGET".into();
        config.save(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.sync.channel_id(), Some("UC_TARGET"));
        assert_eq!(loaded.sync.max_process_count, config.sync.max_process_count);
    }
}
