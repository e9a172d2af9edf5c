//! Launch artifact storage
//!
//! The local store lives in the launch's artifacts directory (or the
//! configured override). Names are unique within the directory and saving
//! overwrites. Every mutating operation also offers the artifact to the
//! external attachment sink; the sink is a side effect, never a
//! precondition for local success.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::context::ReportContext;
use crate::errors::{ReportError, Result};

pub mod remote;

pub use remote::{GridSessionHealth, RemoteArtifacts, RemoteSession, SessionHealth};

impl ReportContext {
    /// Save bytes as a named artifact, overwriting any previous file of the
    /// same name. Returns the stored path.
    pub fn save_artifact(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.artifacts_dir()?.join(name);
        fs::write(&path, bytes)?;
        debug!("Artifact saved: {}", path.display());

        self.sink().attach_bytes(name, bytes);
        Ok(path)
    }

    /// Copy an existing file into the artifacts directory under its own
    /// file name.
    pub fn save_artifact_file(&self, source: &Path) -> Result<PathBuf> {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ReportError::Config(format!(
                    "Artifact source has no usable file name: {}",
                    source.display()
                ))
            })?;

        let path = self.artifacts_dir()?.join(name);
        fs::copy(source, &path)?;
        debug!("Artifact copied: {}", path.display());

        self.sink().attach_file(name, &path);
        Ok(path)
    }

    /// Find a stored artifact by name.
    pub fn artifact(&self, name: &str) -> Result<Option<PathBuf>> {
        Ok(self
            .artifacts()?
            .into_iter()
            .find(|path| path.file_name().and_then(|n| n.to_str()) == Some(name)))
    }

    /// All stored artifact files, sorted by name.
    pub fn artifacts(&self) -> Result<Vec<PathBuf>> {
        let dir = self.artifacts_dir()?;
        let mut files: Vec<PathBuf> = fs::read_dir(&dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    /// Delete a stored artifact by name; absent names are a no-op.
    pub fn delete_artifact(&self, name: &str) -> Result<()> {
        if let Some(path) = self.artifact(name)? {
            fs::remove_file(&path)?;
            debug!("Artifact deleted: {}", path.display());
        }
        Ok(())
    }

    /// Delete every stored artifact. Individual failures are logged and do
    /// not stop the sweep.
    pub fn delete_all_artifacts(&self) -> Result<()> {
        for path in self.artifacts()? {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Unable to delete artifact {}: {}", path.display(), e);
            }
        }
        Ok(())
    }
}
