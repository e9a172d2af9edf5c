//! Test-attachment sink
//!
//! Seam to an external test-reporting service: every saved or downloaded
//! artifact is offered to the sink so it shows up in the externally-visible
//! test report. Sink failures are owned by the implementation and must never
//! fail the local save/download.

use std::path::Path;

/// Registers a file as belonging to the currently running test.
pub trait AttachmentSink: Send + Sync {
    /// Attach an on-disk file by name.
    fn attach_file(&self, name: &str, path: &Path);

    /// Attach raw bytes by name.
    fn attach_bytes(&self, name: &str, bytes: &[u8]);
}

/// Sink that drops every attachment. Used when no external reporting
/// service is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl AttachmentSink for NoopSink {
    fn attach_file(&self, _name: &str, _path: &Path) {}

    fn attach_bytes(&self, _name: &str, _bytes: &[u8]) {}
}
