//! Per-test directory management
//!
//! A `TestSession` is the explicit per-test context object replacing the
//! original ambient thread-local binding: the test owner creates one, and
//! child tasks receive a clone at spawn time, so everything a test spawns
//! writes into the same directory. The bound directory moves through
//! `EMPTY -> AUTO_NAMED -> CUSTOM_NAMED`: it is created lazily with a
//! generated unique name, can be renamed once to a sanitized human-readable
//! name while files inside it stay put, and is detached (never deleted) at
//! test end.

use chrono::Utc;
use image::DynamicImage;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::context::ReportContext;
use crate::errors::{ReportError, Result};
use crate::imaging::{ImageJob, PendingJobs};

/// Per-test log file name inside the test directory.
pub const TEST_LOG_NAME: &str = "test.log";

const RENAME_RETRIES: u32 = 5;
const RENAME_PAUSE: Duration = Duration::from_secs(1);

/// Replace everything outside `[A-Za-z0-9.-]` with `_`.
pub(crate) fn sanitize_dir_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Append-only writer for the per-test `test.log`.
///
/// Held by the session state so renames and teardown can release the file
/// handle deterministically; a rename with an open handle can transiently
/// fail on some filesystems.
struct TestLogWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl TestLogWriter {
    fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(TEST_LOG_NAME);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(
            self.writer,
            "{} {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            line
        )?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and release the file handle.
    fn stop(mut self) {
        if let Err(e) = self.writer.flush() {
            warn!("Unable to flush {}: {}", self.path.display(), e);
        }
    }
}

#[derive(Default)]
struct TestDirState {
    dir: Option<PathBuf>,
    custom_named: bool,
    log: Option<TestLogWriter>,
}

/// Explicit per-test context: directory binding, test log and in-flight
/// screenshot tracking.
///
/// Cloning shares the binding; hand clones to any task the test spawns.
///
/// # Example
///
/// ```no_run
/// use tlr_core::config::ReportConfig;
/// use tlr_core::context::ReportContext;
/// use tlr_core::session::TestSession;
///
/// # async fn demo() -> tlr_core::errors::Result<()> {
/// let ctx = ReportContext::new(ReportConfig::default());
/// let session = TestSession::new(ctx);
/// let dir = session.test_dir()?;
/// session.set_custom_name("Login test (chrome)")?;
/// session.clear();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TestSession {
    ctx: Arc<ReportContext>,
    state: Arc<Mutex<TestDirState>>,
    pending: Arc<PendingJobs>,
}

impl TestSession {
    pub fn new(ctx: Arc<ReportContext>) -> Self {
        Self {
            ctx,
            state: Arc::new(Mutex::new(TestDirState::default())),
            pending: PendingJobs::new(),
        }
    }

    pub fn context(&self) -> &Arc<ReportContext> {
        &self.ctx
    }

    /// The bound test directory, creating one with a generated unique name
    /// on first access. Creation failure is unrecoverable for the test.
    pub fn test_dir(&self) -> Result<PathBuf> {
        let mut state = self.state.lock().unwrap();
        if let Some(dir) = state.dir.as_ref() {
            return Ok(dir.clone());
        }
        let name = Uuid::new_v4().to_string();
        self.create_dir_locked(&mut state, &name)
    }

    /// The bound test directory, creating one with the supplied name on
    /// first access.
    pub fn test_dir_named(&self, name: &str) -> Result<PathBuf> {
        let mut state = self.state.lock().unwrap();
        if let Some(dir) = state.dir.as_ref() {
            return Ok(dir.clone());
        }
        self.create_dir_locked(&mut state, name)
    }

    /// Whether a directory is currently bound.
    pub fn is_bound(&self) -> bool {
        self.state.lock().unwrap().dir.is_some()
    }

    /// Assign the human-readable test name.
    ///
    /// With nothing bound yet, creates the directory directly under the
    /// sanitized name. With an auto-named directory bound, renames it on
    /// disk (up to 5 attempts, releasing the test-log handle before each);
    /// a rename that never succeeds keeps the original path and is logged,
    /// not raised. Once a custom name is set, further calls are no-ops.
    pub fn set_custom_name(&self, name: &str) -> Result<PathBuf> {
        let mut state = self.state.lock().unwrap();
        if state.custom_named {
            if let Some(dir) = state.dir.as_ref() {
                return Ok(dir.clone());
            }
        }

        let sanitized = sanitize_dir_name(name);
        let result = match state.dir.clone() {
            None => {
                debug!("Test dir will be created.");
                self.create_dir_locked(&mut state, &sanitized)?
            }
            Some(current) => {
                debug!("Test dir will be renamed to custom name.");
                self.rename_dir_locked(&mut state, &current, &sanitized)
            }
        };
        state.custom_named = true;
        Ok(result)
    }

    /// Unbind the directory and release the test-log handle. The directory
    /// itself stays on disk.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        if let Some(log) = state.log.take() {
            log.stop();
        }
        state.dir = None;
        state.custom_named = false;
    }

    /// Append a line to the test's `test.log`, binding a directory and
    /// opening the writer on first use.
    pub fn write_log(&self, line: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let dir = match state.dir.clone() {
            Some(dir) => dir,
            None => {
                let name = Uuid::new_v4().to_string();
                self.create_dir_locked(&mut state, &name)?
            }
        };

        if state.log.is_none() {
            state.log = Some(TestLogWriter::open(&dir)?);
        }
        if let Some(log) = state.log.as_mut() {
            log.write_line(line)?;
        }
        Ok(())
    }

    /// Flush buffered test-log output to disk.
    pub fn flush_log(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(log) = state.log.as_mut() {
            log.flush()?;
        }
        Ok(())
    }

    /// Queue a screenshot for background persistence and return its file
    /// name immediately. The file exists only after the writer pool has
    /// processed the job; await [`TestSession::drain_screenshots`] before
    /// reading it back.
    pub fn save_screenshot(&self, image: DynamicImage) -> Result<String> {
        let dir = self.test_dir()?;
        let name = format!("{}.png", Utc::now().timestamp_millis());
        let config = self.ctx.config();

        let job = ImageJob::new(
            image,
            dir.join(&name),
            config.big_screen_width,
            config.big_screen_height,
            Arc::clone(&self.pending),
        );
        self.ctx.image_writer().submit(job);

        Ok(name)
    }

    /// Wait for every screenshot submitted through this session (or a clone
    /// of it) to be persisted. Run at test teardown, before report assembly.
    pub async fn drain_screenshots(&self) {
        self.pending.drain().await;
    }

    /// Number of screenshots still in flight.
    pub fn outstanding_screenshots(&self) -> usize {
        self.pending.outstanding()
    }

    fn create_dir_locked(&self, state: &mut TestDirState, name: &str) -> Result<PathBuf> {
        let dir = self.ctx.root_dir()?.join(name);
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| {
                ReportError::TestDirNotCreated(format!("{}: {}", dir.display(), e))
            })?;
        }
        state.dir = Some(dir.clone());
        Ok(dir)
    }

    fn rename_dir_locked(
        &self,
        state: &mut TestDirState,
        current: &Path,
        sanitized: &str,
    ) -> PathBuf {
        let target = match self.ctx.root_dir() {
            Ok(root) => root.join(sanitized),
            Err(e) => {
                error!("Unable to resolve launch root for rename: {}", e);
                return current.to_path_buf();
            }
        };

        if target == current {
            return current.to_path_buf();
        }
        if target.exists() {
            warn!(
                "Rename target {} already exists, keeping {}",
                target.display(),
                current.display()
            );
            return current.to_path_buf();
        }

        for attempt in 1..=RENAME_RETRIES {
            // Release the log handle so an open test.log cannot block the rename.
            if let Some(log) = state.log.take() {
                log.stop();
            }

            match fs::rename(current, &target) {
                Ok(()) => {
                    info!("Test directory renamed to {}", target.display());
                    state.dir = Some(target.clone());
                    return target;
                }
                Err(e) => {
                    warn!(
                        "Renaming to {} failed (attempt {}/{}): {}",
                        target.display(),
                        attempt,
                        RENAME_RETRIES,
                        e
                    );
                    if attempt < RENAME_RETRIES {
                        std::thread::sleep(RENAME_PAUSE);
                    }
                }
            }
        }

        error!(
            "Unable to rename test directory to {}, keeping {}",
            target.display(),
            current.display()
        );
        current.to_path_buf()
    }
}
