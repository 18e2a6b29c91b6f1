use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_COLUMN_WIDTH: u64 = 16;
pub const DEFAULT_ROOT_SEGMENT_NAME: &str = "全文";
pub const DEFAULT_AUTO_NAME_PREFIX: &str = "分段";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// User settings for the editor. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bytes shown per hex row
    pub column_width: u64,
    /// Name given to the segment covering a freshly opened file
    pub root_segment_name: String,
    /// Prefix for auto-generated segment names (`<prefix><N>`)
    pub auto_name_prefix: String,
    /// Where layouts are written when no explicit path is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            column_width: DEFAULT_COLUMN_WIDTH,
            root_segment_name: DEFAULT_ROOT_SEGMENT_NAME.to_string(),
            auto_name_prefix: DEFAULT_AUTO_NAME_PREFIX.to_string(),
            layout_dir: None,
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the layout directory
        config.layout_dir = config
            .layout_dir
            .map(|dir| Self::expand_path(&dir).unwrap_or(dir));

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/hexformat");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Default location for the layout of `binary`.
    ///
    /// `<layout_dir>/<file name>.layout.json` when a layout directory is
    /// configured, otherwise next to the binary.
    pub fn layout_path_for(&self, binary: &Path) -> PathBuf {
        let file_name = binary
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string());
        let layout_name = format!("{file_name}.layout.json");
        match &self.layout_dir {
            Some(dir) => dir.join(layout_name),
            None => binary.with_file_name(layout_name),
        }
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/hexformat/config.toml"));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.column_width, 16);
        assert_eq!(config.root_segment_name, "全文");
        assert_eq!(config.auto_name_prefix, "分段");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str("column_width = 32\n").unwrap();

        assert_eq!(config.column_width, 32);
        assert_eq!(config.auto_name_prefix, DEFAULT_AUTO_NAME_PREFIX);
        assert!(config.layout_dir.is_none());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let original = Config {
            column_width: 8,
            root_segment_name: "whole".to_string(),
            auto_name_prefix: "seg".to_string(),
            layout_dir: Some(PathBuf::from("/tmp/layouts")),
        };

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/path");
        let expanded = Config::expand_path(&path);

        assert!(expanded.is_some());
        let expanded = expanded.unwrap();
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("HEXFORMAT_TEST_VAR", "/test/env/path");
        }

        let path = PathBuf::from("$HEXFORMAT_TEST_VAR/subdir");
        let expanded = Config::expand_path(&path).unwrap();

        assert_eq!(expanded, PathBuf::from("/test/env/path/subdir"));

        unsafe {
            env::remove_var("HEXFORMAT_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_path_with_absolute_path() {
        let path = PathBuf::from("/absolute/path");
        let expanded = Config::expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_invalid_toml_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "column_width = \"wide\"").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();

        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let test_config = Config {
            column_width: 24,
            ..Config::default()
        };

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_layout_dir_with_env_var_is_expanded_on_load() {
        unsafe {
            env::set_var("HEXFORMAT_LAYOUTS", "/custom/layouts");
        }
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "layout_dir = \"$HEXFORMAT_LAYOUTS/mine\"\n").unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(config.layout_dir, Some(PathBuf::from("/custom/layouts/mine")));

        unsafe {
            env::remove_var("HEXFORMAT_LAYOUTS");
        }
    }

    #[test]
    fn test_layout_path_next_to_binary() {
        let config = Config::default();

        assert_eq!(
            config.layout_path_for(Path::new("/data/dump.bin")),
            PathBuf::from("/data/dump.bin.layout.json")
        );
    }

    #[test]
    fn test_layout_path_in_layout_dir() {
        let config = Config {
            layout_dir: Some(PathBuf::from("/layouts")),
            ..Config::default()
        };

        assert_eq!(
            config.layout_path_for(Path::new("/data/dump.bin")),
            PathBuf::from("/layouts/dump.bin.layout.json")
        );
    }
}
