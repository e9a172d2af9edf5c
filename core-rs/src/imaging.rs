//! Asynchronous screenshot persistence
//!
//! A fixed pool of background workers accepts submit-and-forget image jobs
//! so a test thread never blocks on resize/encode. Every job carries a
//! handle to its submitter's pending-jobs counter; awaiting that counter at
//! test teardown guarantees report assembly sees every persisted file.

use image::imageops::FilterType;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::Notify;
use tracing::{debug, error, warn};

use crate::errors::Result;

/// Number of background image workers when not configured otherwise.
pub const DEFAULT_IMAGE_WORKERS: usize = 4;

/// Counter of in-flight image saves for one test directory.
///
/// `add` is called by the submitter before handing the job off, `done` by
/// the worker after the job finished (successfully or not). `drain` parks
/// until the counter reaches zero.
#[derive(Debug, Default)]
pub struct PendingJobs {
    count: AtomicUsize,
    notify: Notify,
}

impl PendingJobs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    pub fn done(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.notify.notify_waiters();
        }
    }

    pub fn outstanding(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Wait until every submitted job has completed.
    pub async fn drain(&self) {
        loop {
            let notified = self.notify.notified();
            if self.count.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// One image-persist unit of work. Owned by the writer pool from submission
/// to completion; the submitter keeps only the destination filename.
pub struct ImageJob {
    pub image: DynamicImage,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pending: Arc<PendingJobs>,
}

impl ImageJob {
    pub fn new(
        image: DynamicImage,
        path: PathBuf,
        width: u32,
        height: u32,
        pending: Arc<PendingJobs>,
    ) -> Self {
        pending.add();
        Self {
            image,
            path,
            width,
            height,
            pending,
        }
    }
}

/// Bounded background worker pool for screenshot persistence.
///
/// Workers run on the ambient tokio runtime; construct inside one.
pub struct ImageWriter {
    tx: mpsc::UnboundedSender<ImageJob>,
}

impl ImageWriter {
    pub fn new(workers: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<ImageJob>();
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        for _ in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            tokio::spawn(async move {
                loop {
                    let job = { rx.lock().await.recv().await };
                    match job {
                        Some(job) => process_job(job).await,
                        None => break,
                    }
                }
            });
        }

        Self { tx }
    }

    /// Hand a job to the pool. Never blocks; if the pool is gone the job is
    /// dropped and its pending counter completed so drains do not hang.
    pub fn submit(&self, job: ImageJob) {
        if let Err(mpsc::error::SendError(job)) = self.tx.send(job) {
            warn!("Image writer pool is shut down, dropping {}", job.path.display());
            job.pending.done();
        }
    }
}

async fn process_job(job: ImageJob) {
    let ImageJob {
        image,
        path,
        width,
        height,
        pending,
    } = job;

    let target = path.clone();
    let outcome =
        tokio::task::spawn_blocking(move || persist_image(image, &target, width, height)).await;

    match outcome {
        Ok(Ok(())) => debug!("Saved screenshot: {}", path.display()),
        Ok(Err(e)) => error!("Unable to save screenshot {}: {}", path.display(), e),
        Err(e) => error!("Image save task panicked for {}: {}", path.display(), e),
    }

    pending.done();
}

/// Resize-and-persist. With both target dimensions positive: scale to the
/// target width preserving aspect ratio, then crop excess height. Otherwise
/// persist unmodified. Always lossless PNG.
fn persist_image(image: DynamicImage, path: &Path, width: u32, height: u32) -> Result<()> {
    let output = if width > 0 && height > 0 {
        let scaled_height = ((image.height() as u64 * width as u64)
            / image.width().max(1) as u64) as u32;
        let mut resized = image.resize_exact(width, scaled_height.max(1), FilterType::Lanczos3);
        if resized.height() > height {
            resized = resized.crop_imm(0, 0, width, height);
        }
        resized
    } else {
        image
    };

    output.save(path)?;
    Ok(())
}
