//! Error types for TLR Core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Launch root not created: {0}")]
    RootNotCreated(String),

    #[error("Test directory not created: {0}")]
    TestDirNotCreated(String),

    #[error("Artifacts directory not created: {0}")]
    ArtifactsDirNotCreated(String),

    #[error("Auto download folder not created: {0}")]
    AutoDownloadDirNotCreated(String),

    #[error("Unable to find artifact: {0}")]
    ArtifactNotFound(String),

    #[error("Invalid session id. Something wrong with driver: {0}")]
    InvalidSession(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Report assembly error: {0}")]
    Report(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl ReportError {
    /// True for errors that surface as a failed test assertion rather than
    /// a framework failure.
    pub fn is_test_failure(&self) -> bool {
        matches!(
            self,
            ReportError::ArtifactNotFound(_) | ReportError::InvalidSession(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
