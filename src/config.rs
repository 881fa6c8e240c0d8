use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Persisted user preferences. Anything missing falls back to defaults; a
/// missing or unreadable file is never fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub theme: String,
    pub catalog: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: crate::ui::theme::DEFAULT_THEME.to_string(),
            catalog: None,
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "loopcat").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Default catalog location under the platform data dir.
pub fn default_catalog_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "loopcat").map(|dirs| dirs.data_dir().join("catalog.toml"))
}

impl Config {
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = config_path().context("no config directory available")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let text = toml::to_string_pretty(self)?;
        std::fs::write(&path, text).with_context(|| format!("cannot write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.theme, crate::ui::theme::DEFAULT_THEME);
        assert!(config.catalog.is_none());
    }

    #[test]
    fn roundtrips_through_toml() {
        let config = Config {
            theme: "gruvbox".to_string(),
            catalog: Some(PathBuf::from("/tmp/catalog.toml")),
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.theme, "gruvbox");
        assert_eq!(back.catalog, config.catalog);
    }
}
