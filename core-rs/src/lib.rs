//! # TLR Core - Test-Launch Report Backbone
//!
//! TLR owns the on-disk lifecycle of a test launch's output: screenshots,
//! logs, downloaded artifacts and the aggregated HTML report, shared across
//! many concurrently executing test threads.
//!
//! ## Core Principle
//!
//! **One launch, one root**: every process-wide run owns exactly one
//! timestamp-named directory under the reports root. Old launches are
//! pruned by retention at root creation; each test binds its own
//! subdirectory and everything else hangs off those two levels.
//!
//! ## Architecture
//!
//! ```text
//! <report_dir>/
//! ├── report.html            aggregate launch report
//! ├── gallery-lib/           static report assets (never pruned)
//! └── <root_id>/             one launch
//!     ├── artifacts/         saved + downloaded artifacts
//!     ├── temp/              scratch space
//!     └── <test name>/       one per test session
//!         ├── <millis>.png   screenshots (async writer)
//!         ├── test.log
//!         └── report.html
//! ```
//!
//! A [`context::ReportContext`] is constructed once at launch start and
//! shared; each test owns a [`session::TestSession`], cloned into any task
//! the test spawns. Remote artifacts resolve through
//! [`artifacts::RemoteArtifacts`] with local fallback.

pub mod artifacts;
pub mod attachment;
pub mod config;
pub mod context;
pub mod errors;
pub mod imaging;
pub mod report;
pub mod session;

pub use artifacts::{GridSessionHealth, RemoteArtifacts, RemoteSession, SessionHealth};
pub use attachment::{AttachmentSink, NoopSink};
pub use config::ReportConfig;
pub use context::{
    LaunchRoot, ReportContext, ARTIFACTS_DIR_NAME, GALLERY_DIR_NAME, HTML_REPORT_NAME,
    TEMP_DIR_NAME,
};
pub use errors::ReportError;
pub use imaging::{ImageJob, ImageWriter, PendingJobs, DEFAULT_IMAGE_WORKERS};
pub use report::{
    assemble_dir, cucumber_report_link, generate_launch_report, generate_test_report,
    test_artifacts_link, test_log_link, test_screenshots_link, MAX_IMAGE_CAPTION,
};
pub use session::{TestSession, TEST_LOG_NAME};

/// Crate version, surfaced by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
