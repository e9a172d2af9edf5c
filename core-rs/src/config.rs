//! Report configuration
//!
//! All resolved keys consumed by the reporting core: reports root location,
//! launch history retention, artifacts folder override, auto-download folder,
//! artifact availability timeout, screenshot target dimensions and the
//! shareable report URL base. Loadable from a YAML file or built in code
//! with `Default` + struct update syntax.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{ReportError, Result};

/// Configuration for a launch's report and artifact storage.
///
/// # Example
///
/// ```
/// use tlr_core::config::ReportConfig;
/// use std::path::PathBuf;
///
/// let config = ReportConfig {
///     report_dir: PathBuf::from("reports"),
///     max_history: 3,
///     ..ReportConfig::default()
/// };
/// assert_eq!(config.max_history, 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    /// Reports root; every launch creates one timestamp-named directory here.
    pub report_dir: PathBuf,

    /// Maximum number of launch directories kept under `report_dir`.
    /// `0` disables pruning.
    pub max_history: usize,

    /// Optional override for the artifacts directory. When unset, artifacts
    /// live in `<launch root>/artifacts`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_artifacts_dir: Option<PathBuf>,

    /// Whether the browser session deposits downloads into a local folder.
    pub auto_download: bool,

    /// The local folder the browser downloads into (only meaningful when
    /// `auto_download` is set).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_download_dir: Option<PathBuf>,

    /// How long to poll the remote artifact source before giving up.
    pub artifact_timeout_secs: u64,

    /// Screenshot resize target width; `0` persists unmodified.
    pub big_screen_width: u32,

    /// Screenshot resize target height; `0` persists unmodified.
    pub big_screen_height: u32,

    /// HTTP base for shareable report links. When unset, links are
    /// `file://` URLs to the local paths.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            report_dir: PathBuf::from("reports"),
            max_history: 10,
            custom_artifacts_dir: None,
            auto_download: false,
            auto_download_dir: None,
            artifact_timeout_secs: 60,
            big_screen_width: 0,
            big_screen_height: 0,
            report_url: None,
        }
    }
}

impl ReportConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ReportError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: ReportConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write configuration to a YAML file.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content).map_err(|e| {
            ReportError::Config(format!("Failed to write {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    /// Basic consistency checks.
    pub fn validate(&self) -> Result<()> {
        if self.report_dir.as_os_str().is_empty() {
            return Err(ReportError::Config("report_dir must not be empty".to_string()));
        }
        if let Some(url) = &self.report_url {
            if url.is_empty() {
                return Err(ReportError::Config(
                    "report_url must not be an empty string; omit the key instead".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Artifact availability timeout as a `Duration`.
    pub fn artifact_timeout(&self) -> Duration {
        Duration::from_secs(self.artifact_timeout_secs)
    }

    /// Screenshot resizing is on only when both target dimensions are positive.
    pub fn resize_enabled(&self) -> bool {
        self.big_screen_width > 0 && self.big_screen_height > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ReportConfig::default();
        assert_eq!(config.report_dir, PathBuf::from("reports"));
        assert_eq!(config.max_history, 10);
        assert!(config.custom_artifacts_dir.is_none());
        assert!(!config.auto_download);
        assert_eq!(config.artifact_timeout_secs, 60);
        assert!(!config.resize_enabled());
        assert!(config.report_url.is_none());
    }

    #[test]
    fn test_resize_enabled_requires_both_dimensions() {
        let mut config = ReportConfig::default();
        config.big_screen_width = 1920;
        assert!(!config.resize_enabled());

        config.big_screen_height = 1080;
        assert!(config.resize_enabled());
    }

    #[test]
    fn test_yaml_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tlr.yaml");

        let config = ReportConfig {
            report_dir: PathBuf::from("/var/reports"),
            max_history: 3,
            auto_download: true,
            auto_download_dir: Some(PathBuf::from("/tmp/downloads")),
            report_url: Some("https://ci.example.com/reports".to_string()),
            ..ReportConfig::default()
        };
        config.to_file(&path).unwrap();

        let loaded = ReportConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_from_file_partial_yaml_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tlr.yaml");
        fs::write(&path, "report_dir: out\nmax_history: 2\n").unwrap();

        let loaded = ReportConfig::from_file(&path).unwrap();
        assert_eq!(loaded.report_dir, PathBuf::from("out"));
        assert_eq!(loaded.max_history, 2);
        assert_eq!(loaded.artifact_timeout_secs, 60);
    }

    #[test]
    fn test_from_file_missing() {
        let result = ReportConfig::from_file(Path::new("/nonexistent/tlr.yaml"));
        assert!(result.is_err());
        match result.unwrap_err() {
            ReportError::Config(msg) => assert!(msg.contains("Failed to read")),
            _ => panic!("Expected Config error"),
        }
    }

    #[test]
    fn test_validate_empty_report_url() {
        let config = ReportConfig {
            report_url: Some(String::new()),
            ..ReportConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_artifact_timeout_duration() {
        let config = ReportConfig {
            artifact_timeout_secs: 15,
            ..ReportConfig::default()
        };
        assert_eq!(config.artifact_timeout(), Duration::from_secs(15));
    }
}
