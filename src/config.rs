//! YAML configuration file support.
//!
//! A session can be built from a single YAML file covering the stages
//! that have runtime knobs: workspace persistence and the render path.
//!
//! ## Example
//!
//! ```yaml
//! version: "1.0"
//! name: "workstation defaults"
//!
//! library:
//!   persistence_dir: "~/.local/share/xsplot"
//!   scope: "alice"
//!
//! render:
//!   quiet_window_ms: 300
//!   quality: high
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use service::RenderQuality;
use thiserror::Error;

/// Errors that can occur when loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XsplotConfig {
    /// Configuration format version.
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub library: LibraryYamlConfig,

    #[serde(default)]
    pub render: RenderYamlConfig,
}

impl XsplotConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: XsplotConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;
        self.library.validate()?;
        self.render.validate()?;
        Ok(())
    }
}

impl Default for XsplotConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            library: LibraryYamlConfig::default(),
            render: RenderYamlConfig::default(),
        }
    }
}

/// Workspace persistence configuration. Durability is opt-in: both fields
/// must be set, otherwise the session runs as a guest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryYamlConfig {
    #[serde(default)]
    pub persistence_dir: Option<PathBuf>,

    /// Identity scope the summaries are stored under.
    #[serde(default)]
    pub scope: Option<String>,
}

impl LibraryYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.persistence_dir.is_some() != self.scope.is_some() {
            return Err(ConfigLoadError::Validation(
                "library.persistence_dir and library.scope must be set together".to_string(),
            ));
        }
        Ok(())
    }
}

/// Render path configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderYamlConfig {
    #[serde(default = "default_quiet_window_ms")]
    pub quiet_window_ms: u64,

    /// `draft` or `high`.
    #[serde(default = "default_quality")]
    pub quality: String,
}

impl RenderYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.quiet_window_ms == 0 {
            return Err(ConfigLoadError::Validation(
                "render.quiet_window_ms must be >= 1".to_string(),
            ));
        }
        self.parsed_quality().map(|_| ())
    }

    pub fn quiet_window(&self) -> Duration {
        Duration::from_millis(self.quiet_window_ms)
    }

    pub fn parsed_quality(&self) -> Result<RenderQuality, ConfigLoadError> {
        match self.quality.as_str() {
            "draft" => Ok(RenderQuality::Draft),
            "high" => Ok(RenderQuality::High),
            other => Err(ConfigLoadError::Validation(format!(
                "render.quality must be `draft` or `high`, got `{other}`"
            ))),
        }
    }
}

impl Default for RenderYamlConfig {
    fn default() -> Self {
        Self {
            quiet_window_ms: default_quiet_window_ms(),
            quality: default_quality(),
        }
    }
}

fn default_quiet_window_ms() -> u64 {
    300
}

fn default_quality() -> String {
    "draft".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_uses_defaults() {
        let config = XsplotConfig::from_yaml("version: \"1.0\"\n").expect("parse");
        assert!(config.library.persistence_dir.is_none());
        assert_eq!(config.render.quiet_window_ms, 300);
        assert!(matches!(
            config.render.parsed_quality().unwrap(),
            RenderQuality::Draft
        ));
    }

    #[test]
    fn full_yaml_round_trip() {
        let yaml = r#"
version: "1.0"
name: "workstation"
library:
  persistence_dir: "/var/lib/xsplot"
  scope: "alice"
render:
  quiet_window_ms: 150
  quality: high
"#;
        let config = XsplotConfig::from_yaml(yaml).expect("parse");
        assert_eq!(config.name.as_deref(), Some("workstation"));
        assert_eq!(
            config.library.persistence_dir.as_deref(),
            Some(Path::new("/var/lib/xsplot"))
        );
        assert_eq!(config.render.quiet_window(), Duration::from_millis(150));
        assert!(matches!(
            config.render.parsed_quality().unwrap(),
            RenderQuality::High
        ));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let err = XsplotConfig::from_yaml("version: \"2.0\"\n").unwrap_err();
        assert!(matches!(err, ConfigLoadError::UnsupportedVersion(_)));
    }

    #[test]
    fn persistence_fields_must_come_together() {
        let yaml = "version: \"1.0\"\nlibrary:\n  scope: \"alice\"\n";
        let err = XsplotConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Validation(_)));
    }

    #[test]
    fn zero_quiet_window_is_rejected() {
        let yaml = "version: \"1.0\"\nrender:\n  quiet_window_ms: 0\n";
        assert!(XsplotConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn unknown_quality_is_rejected() {
        let yaml = "version: \"1.0\"\nrender:\n  quality: ultra\n";
        assert!(XsplotConfig::from_yaml(yaml).is_err());
    }
}
