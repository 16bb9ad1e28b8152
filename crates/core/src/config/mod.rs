//! Runtime configuration
//!
//! Settings live in a TOML file and are installed process-wide with
//! [`install`]. Everything that consults them reads [`current`].
//!
//! # Example
//!
//! ```ignore
//! use typemeta_core::config::{self, ReflectConfig};
//!
//! let config = ReflectConfig::load_default()?;
//! typemeta_core::logging::init(&config);
//! config::install(config);
//! ```

mod loader;

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

pub use loader::{config_path, CONFIG_ENV, CONFIG_FILE};

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write config file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config to TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflectConfig {
    /// Config version for future migration support
    pub version: u32,

    /// Reject method overloads whose signature is already registered.
    /// On by default in debug builds.
    pub validate_signatures: bool,

    /// Spaces per nesting level in text records
    pub indent_width: usize,

    /// Enable debug logging
    pub debug: bool,
}

impl Default for ReflectConfig {
    fn default() -> Self {
        Self {
            version: 1,
            validate_signatures: cfg!(debug_assertions),
            indent_width: 2,
            debug: false,
        }
    }
}

impl ReflectConfig {
    /// Load config from `path`, creating a default file if missing.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config = Self::from_toml_str(&content)?;
            tracing::debug!("Loaded config from {:?}", path);
            Ok(config)
        } else {
            let default = Self::default();
            default.save(path)?;
            tracing::info!("Created default config at {:?}", path);
            Ok(default)
        }
    }

    /// Load config from [`config_path`], creating a default file if missing.
    pub fn load_default() -> ConfigResult<Self> {
        Self::load(config_path())
    }

    /// Save config to `path`, creating parent directories if needed.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!("Saved config to {:?}", path);
        Ok(())
    }

    /// Replace self with the current contents of `path`.
    pub fn reload(&mut self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        *self = Self::from_toml_str(&content)?;
        tracing::debug!("Reloaded config from {:?}", path);
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }
}

static ACTIVE: RwLock<Option<Arc<ReflectConfig>>> = RwLock::new(None);

/// Make `config` the process-wide configuration.
///
/// Registrations that already happened keep the checks they ran with.
pub fn install(config: ReflectConfig) {
    *ACTIVE.write() = Some(Arc::new(config));
}

/// The installed configuration, or the defaults if none was installed.
pub fn current() -> Arc<ReflectConfig> {
    if let Some(config) = ACTIVE.read().as_ref() {
        return Arc::clone(config);
    }
    let mut active = ACTIVE.write();
    Arc::clone(active.get_or_insert_with(|| Arc::new(ReflectConfig::default())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("typemeta-config-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_default() {
        let config = ReflectConfig::default();
        assert_eq!(config.version, 1);
        assert_eq!(config.indent_width, 2);
        assert_eq!(config.validate_signatures, cfg!(debug_assertions));
        assert!(!config.debug);
    }

    #[test]
    fn test_serialize() {
        let config = ReflectConfig {
            version: 2,
            validate_signatures: true,
            indent_width: 4,
            debug: true,
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("version = 2"));
        assert!(toml_str.contains("indent_width = 4"));
        assert!(toml_str.contains("validate_signatures = true"));
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let config = ReflectConfig::from_toml_str("debug = true").unwrap();
        assert!(config.debug);
        assert_eq!(config.indent_width, 2);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            ReflectConfig::from_toml_str("indent_width = \"wide\""),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_creates_default_then_reloads() {
        let path = temp_path("load.toml");
        let _ = std::fs::remove_file(&path);

        let created = ReflectConfig::load(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created, ReflectConfig::default());

        let edited = ReflectConfig {
            indent_width: 8,
            ..created.clone()
        };
        edited.save(&path).unwrap();

        let mut reloaded = created;
        reloaded.reload(&path).unwrap();
        assert_eq!(reloaded.indent_width, 8);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_default_follows_env_override() {
        let path = temp_path("from-env.toml");
        ReflectConfig {
            indent_width: 6,
            ..ReflectConfig::default()
        }
        .save(&path)
        .unwrap();

        // No other test reads the override
        std::env::set_var(CONFIG_ENV, &path);
        assert_eq!(config_path(), path);
        let loaded = ReflectConfig::load_default().unwrap();
        std::env::remove_var(CONFIG_ENV);
        assert_eq!(loaded.indent_width, 6);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_current_falls_back_to_default() {
        // Other tests never install, so the defaults are active
        assert_eq!(current().indent_width, 2);
    }
}
