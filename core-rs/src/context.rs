//! Launch-wide report context
//!
//! One `ReportContext` instance owns the on-disk lifecycle of a single test
//! launch: the timestamp-named root directory under the reports root, the
//! retention pruning of previous launches, the bundled gallery assets, the
//! artifacts and temp directories, the screenshot-comment map and the shared
//! image writer pool. Construct it once at launch start and share it
//! (`Arc`) across every test session.

use chrono::Utc;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

use crate::attachment::{AttachmentSink, NoopSink};
use crate::config::ReportConfig;
use crate::errors::{ReportError, Result};
use crate::imaging::{ImageWriter, DEFAULT_IMAGE_WORKERS};

/// Subdirectory of the launch root holding saved/downloaded artifacts.
pub const ARTIFACTS_DIR_NAME: &str = "artifacts";

/// Subdirectory of the launch root for scratch files.
pub const TEMP_DIR_NAME: &str = "temp";

/// Reserved directory under the reports root holding static report assets.
/// Never pruned by retention.
pub const GALLERY_DIR_NAME: &str = "gallery-lib";

/// Name of both the per-test and the aggregate HTML report file.
pub const HTML_REPORT_NAME: &str = "report.html";

/// Static report assets unpacked into the reports root once per launch.
const GALLERY_ARCHIVE: &[u8] = include_bytes!("../resources/gallery-lib.tar.gz");

/// Identity of one launch: monotonic id and its root directory.
#[derive(Debug, Clone)]
pub struct LaunchRoot {
    pub root_id: i64,
    pub dir: PathBuf,
}

/// Launch-wide service owning directories, retention, comments and the
/// screenshot writer pool.
pub struct ReportContext {
    config: ReportConfig,
    sink: Arc<dyn AttachmentSink>,
    image_writer: ImageWriter,
    root: OnceCell<LaunchRoot>,
    artifacts_dir: OnceCell<PathBuf>,
    temp_dir: Mutex<Option<PathBuf>>,
    comments: Mutex<HashMap<String, String>>,
}

impl ReportContext {
    /// Create a context with no external attachment sink.
    ///
    /// Spawns the image worker pool; call from within a tokio runtime.
    pub fn new(config: ReportConfig) -> Arc<Self> {
        Self::with_sink(config, Arc::new(NoopSink))
    }

    /// Create a context forwarding artifacts to the given sink.
    pub fn with_sink(config: ReportConfig, sink: Arc<dyn AttachmentSink>) -> Arc<Self> {
        Arc::new(Self {
            config,
            sink,
            image_writer: ImageWriter::new(DEFAULT_IMAGE_WORKERS),
            root: OnceCell::new(),
            artifacts_dir: OnceCell::new(),
            temp_dir: Mutex::new(None),
            comments: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn sink(&self) -> &Arc<dyn AttachmentSink> {
        &self.sink
    }

    pub fn image_writer(&self) -> &ImageWriter {
        &self.image_writer
    }

    /// Monotonic launch id (millisecond timestamp), assigned on first root
    /// access and stable afterwards.
    pub fn root_id(&self) -> Result<i64> {
        Ok(self.launch_root()?.root_id)
    }

    /// The launch root directory. Created on first call; every later call
    /// (from any thread) returns the same path. Creation failure is
    /// unrecoverable for the launch since nothing can be stored.
    pub fn root_dir(&self) -> Result<PathBuf> {
        Ok(self.launch_root()?.dir.clone())
    }

    pub fn is_root_created(&self) -> bool {
        self.root.get().is_some()
    }

    fn launch_root(&self) -> Result<&LaunchRoot> {
        self.root.get_or_try_init(|| self.create_root())
    }

    fn create_root(&self) -> Result<LaunchRoot> {
        let reports_root = &self.config.report_dir;

        self.remove_old_reports();

        if !reports_root.exists() {
            fs::create_dir_all(reports_root).map_err(|e| {
                ReportError::RootNotCreated(format!("{}: {}", reports_root.display(), e))
            })?;
        }

        let root_id = Utc::now().timestamp_millis();
        let dir = reports_root.join(root_id.to_string());
        fs::create_dir(&dir)
            .map_err(|e| ReportError::RootNotCreated(format!("{}: {}", dir.display(), e)))?;

        self.unpack_gallery();

        info!("Launch root created: {}", dir.display());
        Ok(LaunchRoot { root_id, dir })
    }

    /// Removes the previous aggregate report and prunes old launch
    /// directories down to the configured retention count. Runs once, at
    /// root creation. Individual deletion failures are logged and skipped.
    fn remove_old_reports(&self) {
        let reports_root = &self.config.report_dir;
        if !reports_root.exists() {
            return;
        }

        let report_file = reports_root.join(HTML_REPORT_NAME);
        if report_file.exists() {
            if let Err(e) = fs::remove_file(&report_file) {
                warn!("Unable to remove old aggregate report: {}", e);
            }
        }

        let max_history = self.config.max_history;
        if max_history == 0 {
            return;
        }

        let mut launch_dirs: Vec<PathBuf> = match fs::read_dir(reports_root) {
            Ok(entries) => entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.is_dir())
                .filter(|path| {
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| !n.starts_with('.') && n != GALLERY_DIR_NAME)
                        .unwrap_or(false)
                })
                .collect(),
            Err(e) => {
                warn!("Unable to scan reports root for pruning: {}", e);
                return;
            }
        };

        // Name-descending puts the newest timestamp-named launches first.
        launch_dirs.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

        for dir in launch_dirs.iter().skip(max_history) {
            match fs::remove_dir_all(dir) {
                Ok(()) => debug!("Pruned old launch directory: {}", dir.display()),
                Err(e) => warn!("Unable to prune {}: {}", dir.display(), e),
            }
        }
    }

    /// Unpack the bundled gallery assets into the reports root, once.
    fn unpack_gallery(&self) {
        let reports_root = &self.config.report_dir;
        if reports_root.join(GALLERY_DIR_NAME).exists() {
            return;
        }

        let tar = flate2::read::GzDecoder::new(GALLERY_ARCHIVE);
        let mut archive = tar::Archive::new(tar);
        if let Err(e) = archive.unpack(reports_root) {
            error!("Unable to unpack gallery assets: {}", e);
        }
    }

    /// Scratch directory under the launch root, created on first call.
    pub fn temp_dir(&self) -> Result<PathBuf> {
        let mut guard = self.temp_dir.lock().unwrap();
        if let Some(dir) = guard.as_ref() {
            return Ok(dir.clone());
        }

        let dir = self.root_dir()?.join(TEMP_DIR_NAME);
        fs::create_dir_all(&dir)
            .map_err(|e| ReportError::RootNotCreated(format!("{}: {}", dir.display(), e)))?;
        *guard = Some(dir.clone());
        Ok(dir)
    }

    /// Delete the scratch directory. Failure is logged, not raised.
    pub fn remove_temp_dir(&self) {
        let guard = self.temp_dir.lock().unwrap();
        if let Some(dir) = guard.as_ref() {
            if let Err(e) = fs::remove_dir_all(dir) {
                debug!("Unable to remove temp directory {}: {}", dir.display(), e);
            }
        }
    }

    /// The artifacts directory: the configured override when set, otherwise
    /// `<root>/artifacts`. Resolved once; an existing directory means
    /// already-initialized, not an error.
    pub fn artifacts_dir(&self) -> Result<PathBuf> {
        let dir = self.artifacts_dir.get_or_try_init(|| {
            let dir = match &self.config.custom_artifacts_dir {
                Some(custom) => custom.clone(),
                None => self.root_dir()?.join(ARTIFACTS_DIR_NAME),
            };

            if dir.exists() && dir.is_dir() {
                debug!("Artifacts folder already exists: {}", dir.display());
            } else {
                fs::create_dir_all(&dir).map_err(|e| {
                    ReportError::ArtifactsDirNotCreated(format!("{}: {}", dir.display(), e))
                })?;
                debug!("Artifacts folder created: {}", dir.display());
            }
            Ok::<PathBuf, ReportError>(dir)
        })?;
        Ok(dir.clone())
    }

    /// The folder the browser session deposits downloads into. Falls back to
    /// the artifacts directory when auto-download is off or unconfigured.
    pub fn auto_download_dir(&self) -> Result<PathBuf> {
        let dir = match (&self.config.auto_download, &self.config.auto_download_dir) {
            (true, Some(folder)) => folder.clone(),
            _ => return self.artifacts_dir(),
        };

        if !(dir.exists() && dir.is_dir()) {
            warn!(
                "Auto download folder missing, creating an empty folder: {}",
                dir.display()
            );
            fs::create_dir_all(&dir).map_err(|e| {
                ReportError::AutoDownloadDirNotCreated(format!("{}: {}", dir.display(), e))
            })?;
        }
        Ok(dir)
    }

    /// Store a caption for a screenshot file name. Empty ids are ignored;
    /// the last write for an id wins.
    pub fn add_screenshot_comment(&self, screen_id: &str, msg: &str) {
        if screen_id.is_empty() {
            return;
        }
        self.comments
            .lock()
            .unwrap()
            .insert(screen_id.to_string(), msg.to_string());
    }

    /// Caption for a screenshot file name; empty string when absent.
    pub fn screenshot_comment(&self, screen_id: &str) -> String {
        self.comments
            .lock()
            .unwrap()
            .get(screen_id)
            .cloned()
            .unwrap_or_default()
    }
}
