//! Integration tests for a complete launch lifecycle
//!
//! Exercises the full flow a test framework drives:
//! - Launch root creation with retention pruning and gallery assets
//! - Per-test session directories, custom naming, logs
//! - Asynchronous screenshot persistence with the teardown barrier
//! - Report assembly and link building
//! - Artifact storage

use image::{DynamicImage, RgbaImage};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use tlr_core::{
    generate_launch_report, generate_test_report, test_log_link, test_screenshots_link,
    ReportConfig, ReportContext, TestSession, GALLERY_DIR_NAME, HTML_REPORT_NAME, TEST_LOG_NAME,
};

fn screenshot() -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 48, image::Rgba([120, 40, 40, 255])))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_complete_launch_lifecycle() {
    let temp = TempDir::new().unwrap();
    let reports = temp.path().join("reports");

    // Pre-existing launches from earlier runs, plus the reserved assets dir.
    for id in ["1700000000001", "1700000000002", "1700000000003", "1700000000004"] {
        fs::create_dir_all(reports.join(id)).unwrap();
    }
    fs::create_dir_all(reports.join(GALLERY_DIR_NAME)).unwrap();
    fs::write(reports.join(HTML_REPORT_NAME), "stale aggregate").unwrap();

    // 1. Launch start
    let ctx = ReportContext::new(ReportConfig {
        report_dir: reports.clone(),
        max_history: 2,
        big_screen_width: 32,
        big_screen_height: 24,
        ..ReportConfig::default()
    });
    let root = ctx.root_dir().unwrap();
    assert!(root.is_dir());

    // 2. Retention kept the two newest old launches plus the new root
    let mut launches: Vec<String> = fs::read_dir(&reports)
        .unwrap()
        .flatten()
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n != GALLERY_DIR_NAME)
        .collect();
    launches.sort();
    assert_eq!(launches.len(), 3);
    assert_eq!(&launches[..2], &["1700000000003", "1700000000004"]);

    // Stale aggregate report is gone; gallery survived.
    assert!(!reports.join(HTML_REPORT_NAME).exists());
    assert!(reports.join(GALLERY_DIR_NAME).exists());

    // 3. One test runs: log lines, screenshots, a child task, custom name
    let session = TestSession::new(Arc::clone(&ctx));
    session.write_log("test started").unwrap();

    let first = session.save_screenshot(screenshot()).unwrap();
    assert!(first.ends_with(".png"));

    let child = session.clone();
    let worker = tokio::spawn(async move {
        child.write_log("child task checkpoint").unwrap();
        child.save_screenshot(screenshot()).unwrap()
    });
    let second = worker.await.unwrap();

    // 4. Teardown: drain the writer pool so every capture is on disk, then
    // apply the human-readable name discovered during the test and assemble.
    session.drain_screenshots().await;

    let test_dir = session.set_custom_name("Login flow (chrome 126)").unwrap();
    assert_eq!(test_dir.file_name().unwrap(), "Login_flow__chrome_126_");
    assert!(test_dir.join(&first).exists());
    assert!(test_dir.join(&second).exists());

    // Screenshots were resized to the configured width.
    let persisted = image::open(test_dir.join(&first)).unwrap();
    assert_eq!(persisted.width(), 32);

    ctx.add_screenshot_comment(&first, "login page opened");
    generate_test_report(&session);

    let report = fs::read_to_string(test_dir.join(HTML_REPORT_NAME)).unwrap();
    assert!(report.contains(&first));
    assert!(report.contains(&second));
    assert!(report.contains("login page opened"));
    assert!(!report.contains(TEST_LOG_NAME));

    // 5. Links point into the renamed directory
    let screenshots_link = test_screenshots_link(&session).unwrap();
    assert!(screenshots_link.contains("Login_flow__chrome_126_"));
    let log_link = test_log_link(&session).unwrap();
    assert!(log_link.ends_with(TEST_LOG_NAME));

    // 6. Artifacts and the aggregate report
    ctx.save_artifact("results.json", b"{\"passed\":1}").unwrap();
    assert!(ctx.artifact("results.json").unwrap().is_some());

    generate_launch_report(&ctx, "<html>launch summary</html>");
    assert!(reports.join(HTML_REPORT_NAME).exists());
    assert!(root.join(HTML_REPORT_NAME).exists());

    // 7. Test end: the binding clears, the directory stays
    session.clear();
    assert!(test_dir.is_dir());
    assert!(test_dir.join(TEST_LOG_NAME).exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_sessions_share_one_root() {
    let temp = TempDir::new().unwrap();
    let ctx = ReportContext::new(ReportConfig {
        report_dir: temp.path().join("reports"),
        ..ReportConfig::default()
    });

    let mut handles = Vec::new();
    for i in 0..6 {
        let ctx = Arc::clone(&ctx);
        handles.push(tokio::spawn(async move {
            let session = TestSession::new(ctx);
            let dir = session.test_dir().unwrap();
            session.write_log(&format!("test {}", i)).unwrap();
            session.save_screenshot(screenshot()).unwrap();
            session.drain_screenshots().await;
            generate_test_report(&session);
            session.clear();
            dir
        }));
    }

    let mut dirs = Vec::new();
    for handle in handles {
        dirs.push(handle.await.unwrap());
    }

    // Every session got its own directory under the same root.
    let root = ctx.root_dir().unwrap();
    dirs.sort();
    dirs.dedup();
    assert_eq!(dirs.len(), 6);
    for dir in &dirs {
        assert!(dir.starts_with(&root));
        assert!(dir.join(HTML_REPORT_NAME).exists());
    }
}

#[tokio::test]
async fn test_second_launch_prunes_first() {
    let temp = TempDir::new().unwrap();
    let reports = temp.path().join("reports");

    let first_root = {
        let ctx = ReportContext::new(ReportConfig {
            report_dir: reports.clone(),
            max_history: 1,
            ..ReportConfig::default()
        });
        ctx.root_dir().unwrap()
    };

    // A later process starts a new launch; with max_history 1 the previous
    // launch is the one survivor until the new root joins it.
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let ctx = ReportContext::new(ReportConfig {
        report_dir: reports.clone(),
        max_history: 1,
        ..ReportConfig::default()
    });
    let second_root = ctx.root_dir().unwrap();

    assert_ne!(first_root, second_root);
    assert!(first_root.exists());
    assert!(second_root.exists());

    // A third launch prunes the oldest.
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let ctx = ReportContext::new(ReportConfig {
        report_dir: reports.clone(),
        max_history: 1,
        ..ReportConfig::default()
    });
    let third_root = ctx.root_dir().unwrap();

    assert!(!first_root.exists());
    assert!(second_root.exists());
    assert!(third_root.exists());
}
