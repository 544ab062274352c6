//! Configuration file support.
//!
//! TOML configuration with every section optional:
//!
//! ```toml
//! [network]
//! doi_resolver_base = "https://doi.org/"
//! crossref_works_base = "https://api.crossref.org/works/"
//! timeout_secs = 15
//! retry_attempts = 3
//!
//! [citations]
//! fan_out = "parallel"
//! max_concurrency = 4
//! default_style = "APA"
//!
//! [storage]
//! data_dir = "/home/me/.local/share/DOICitationManager/data"
//! max_backups = 10
//! auto_backup = true
//!
//! [cache]
//! enabled = true
//! ttl_seconds = 2592000
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```

use std::path::{Path, PathBuf};

use super::Config;

/// File name looked up in the working directory
const LOCAL_CONFIG_FILE: &str = "doi-cite.toml";

impl Config {
    /// Load configuration from a TOML file, without environment overrides
    pub fn load_toml(path: &Path) -> Result<Self, ConfigFileError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigFileError::Io(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigFileError::Parse(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigFileError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
    }
}

/// `<config dir>/doi-cite/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("doi-cite").join("config.toml"))
}

/// Look for `./doi-cite.toml`, then the per-user config file
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }
    default_config_path().filter(|path| path.is_file())
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FanOutMode;
    use tempfile::tempdir;

    #[test]
    fn test_config_file_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let toml_content = r#"
[network]
doi_resolver_base = "http://localhost:9999/"
retry_attempts = 1

[citations]
fan_out = "parallel"

[storage]
data_dir = "/tmp/doi-data"
max_backups = 3

[cache]
enabled = true

[logging]
level = "debug"
format = "json"
"#;
        std::fs::write(&path, toml_content).unwrap();

        let config = Config::load_toml(&path).unwrap();

        assert_eq!(config.network.doi_resolver_base, "http://localhost:9999/");
        assert_eq!(config.network.retry_attempts, 1);
        assert_eq!(config.network.timeout_secs, 15);
        assert_eq!(config.citations.fan_out, FanOutMode::Parallel);
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/doi-data"));
        assert_eq!(config.storage.max_backups, 3);
        assert!(config.storage.auto_backup);
        assert!(config.cache.enabled);
        assert_eq!(config.logging.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_config_file_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.citations.max_concurrency = 8;
        config.cache.ttl_seconds = 60;

        config.save(&path).unwrap();

        let loaded = Config::load_toml(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_file_nonexistent() {
        let path = PathBuf::from("/nonexistent/config.toml");
        assert!(matches!(
            Config::load_toml(&path),
            Err(ConfigFileError::Io(_))
        ));
    }

    #[test]
    fn test_config_file_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.toml");

        std::fs::write(&path, "invalid = toml = content").unwrap();

        assert!(matches!(
            Config::load_toml(&path),
            Err(ConfigFileError::Parse(_))
        ));
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("doi-cite/config.toml"));
        }
    }
}
