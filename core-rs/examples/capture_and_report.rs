//! Minimal end-to-end demo: one launch, one test session, two screenshots,
//! an assembled report.
//!
//! Run with: cargo run --example capture_and_report

use image::{DynamicImage, RgbaImage};
use std::sync::Arc;

use tlr_core::{generate_test_report, ReportConfig, ReportContext, TestSession};

fn frame(shade: u8) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        640,
        480,
        image::Rgba([shade, shade, 200, 255]),
    ))
}

#[tokio::main]
async fn main() -> tlr_core::errors::Result<()> {
    tracing_subscriber::fmt::init();

    let ctx = ReportContext::new(ReportConfig {
        report_dir: "demo-reports".into(),
        max_history: 3,
        big_screen_width: 320,
        big_screen_height: 240,
        ..ReportConfig::default()
    });

    let session = TestSession::new(Arc::clone(&ctx));
    session.write_log("demo test started")?;

    let first = session.save_screenshot(frame(60))?;
    ctx.add_screenshot_comment(&first, "initial page");

    let second = session.save_screenshot(frame(160))?;
    ctx.add_screenshot_comment(&second, "after clicking login");

    let dir = session.set_custom_name("Demo: capture and report")?;

    session.drain_screenshots().await;
    generate_test_report(&session);
    session.clear();

    println!("Report: {}", dir.join("report.html").display());
    Ok(())
}
