//! HTML report assembly and shareable links
//!
//! Screenshots carry millisecond-timestamp names, so a lexicographic sort
//! of the test directory is chronological order; the assembler renders each
//! image plus its caption through an embedded fragment template into one
//! `report.html` per test. The aggregate launch report and the link
//! builders (HTTP base or `file://`) live here too.

use std::fs;
use std::path::Path;
use tracing::{error, warn};

use crate::context::{ReportContext, HTML_REPORT_NAME};
use crate::errors::Result;
use crate::session::{sanitize_dir_name, TestSession, TEST_LOG_NAME};

/// Captions longer than this are cut before rendering.
pub const MAX_IMAGE_CAPTION: usize = 300;

const REPORT_TITLE: &str = "Test steps";
const SQL_LOG_NAME: &str = "sql.log";

const CUCUMBER_REPORT_FOLDER: &str = "cucumber-reports";
const CUCUMBER_REPORT_SUBFOLDER: &str = "cucumber-html-reports";
const CUCUMBER_REPORT_FILE_NAME: &str = "overview-features.html";

const IMAGE_TEMPLATE: &str = r#"    <div class="thumb">
      <a href="${image}" title="${title}" data-zoom><img src="${image}" alt="${image}"/></a>
      <div class="caption">${title}</div>
    </div>
"#;

const CONTAINER_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8"/>
  <title>${title}</title>
  <link rel="stylesheet" href="../gallery-lib/gallery.css"/>
  <script src="../gallery-lib/gallery.js" defer></script>
</head>
<body>
  <div id="container">
${images}  </div>
</body>
</html>
"#;

/// Assemble the per-test `report.html` from the screenshots in the
/// session's directory. Assembly problems degrade the report, never the
/// test: they are logged and swallowed.
pub fn generate_test_report(session: &TestSession) {
    if let Err(e) = try_generate_test_report(session) {
        error!("generate_test_report failure: {}", e);
    }
}

fn try_generate_test_report(session: &TestSession) -> Result<()> {
    let dir = session.test_dir()?;
    let ctx = session.context();
    assemble_dir(&dir, &|name| ctx.screenshot_comment(name))?;
    Ok(())
}

/// Assemble `report.html` for an arbitrary test directory. Returns whether
/// a report was written; a directory without qualifying images is a no-op.
pub fn assemble_dir(dir: &Path, caption: &dyn Fn(&str) -> String) -> Result<bool> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .flatten()
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().to_str().map(|n| n.to_string()))
        .filter(|name| name != TEST_LOG_NAME && name != SQL_LOG_NAME && name != HTML_REPORT_NAME)
        .collect();

    if names.is_empty() {
        return Ok(false);
    }
    names.sort();

    let mut images = String::new();
    for name in &names {
        let title: String = caption(name).chars().take(MAX_IMAGE_CAPTION).collect();
        images.push_str(
            &IMAGE_TEMPLATE
                .replace("${image}", name)
                .replace("${title}", &title),
        );
    }

    let report = CONTAINER_TEMPLATE
        .replace("${images}", &images)
        .replace("${title}", REPORT_TITLE);
    fs::write(dir.join(HTML_REPORT_NAME), report)?;
    Ok(true)
}

/// Write the aggregate launch report to both the reports root and the
/// launch root. Failures are logged, not raised.
pub fn generate_launch_report(ctx: &ReportContext, content: &str) {
    if let Err(e) = try_generate_launch_report(ctx, content) {
        error!("generate_launch_report failure: {}", e);
    }
}

fn try_generate_launch_report(ctx: &ReportContext, content: &str) -> Result<()> {
    let root = ctx.root_dir()?;
    fs::write(ctx.config().report_dir.join(HTML_REPORT_NAME), content)?;
    fs::write(root.join(HTML_REPORT_NAME), content)?;
    Ok(())
}

/// Link to the launch's artifacts folder.
pub fn test_artifacts_link(ctx: &ReportContext) -> Result<String> {
    Ok(match ctx.config().report_url.as_deref() {
        Some(base) => format!("{}/{}/artifacts", base, ctx.root_id()?),
        None => format!("file://{}/artifacts", ctx.root_dir()?.display()),
    })
}

/// Link to the test's screenshot report; empty when the test directory
/// holds no screenshots.
pub fn test_screenshots_link(session: &TestSession) -> Result<String> {
    let dir = session.test_dir()?;

    let has_screenshots = match fs::read_dir(&dir) {
        Ok(entries) => entries
            .flatten()
            .any(|e| e.path().extension().and_then(|s| s.to_str()) == Some("png")),
        Err(e) => {
            error!("Exception during report directory scanning: {}", e);
            true
        }
    };
    if !has_screenshots {
        return Ok(String::new());
    }

    let ctx = session.context();
    Ok(match ctx.config().report_url.as_deref() {
        Some(base) => format!(
            "{}/{}/{}/{}",
            base,
            ctx.root_id()?,
            sanitized_dir_name(&dir),
            HTML_REPORT_NAME
        ),
        None => format!("file://{}/{}", dir.display(), HTML_REPORT_NAME),
    })
}

/// Link to the test's `test.log`; empty when no log was written.
pub fn test_log_link(session: &TestSession) -> Result<String> {
    let dir = session.test_dir()?;
    if !dir.join(TEST_LOG_NAME).exists() {
        return Ok(String::new());
    }

    let ctx = session.context();
    Ok(match ctx.config().report_url.as_deref() {
        Some(base) => format!(
            "{}/{}/{}/{}",
            base,
            ctx.root_id()?,
            sanitized_dir_name(&dir),
            TEST_LOG_NAME
        ),
        None => format!("file://{}/{}", dir.display(), TEST_LOG_NAME),
    })
}

/// Link to the cucumber-style report at its fixed path under the launch.
pub fn cucumber_report_link(ctx: &ReportContext) -> Result<String> {
    Ok(match ctx.config().report_url.as_deref() {
        Some(base) => {
            let base = if base.contains("n/a") {
                warn!("Report url contains n/a, replacing it");
                base.replace("n/a", "")
            } else {
                base.to_string()
            };
            format!(
                "{}/{}/{}/{}/{}",
                base,
                ctx.root_id()?,
                CUCUMBER_REPORT_FOLDER,
                CUCUMBER_REPORT_SUBFOLDER,
                CUCUMBER_REPORT_FILE_NAME
            )
        }
        None => format!(
            "file://{}/{}/{}/{}",
            ctx.root_dir()?.display(),
            CUCUMBER_REPORT_FOLDER,
            CUCUMBER_REPORT_SUBFOLDER,
            CUCUMBER_REPORT_FILE_NAME
        ),
    })
}

fn sanitized_dir_name(dir: &Path) -> String {
    dir.file_name()
        .and_then(|n| n.to_str())
        .map(sanitize_dir_name)
        .unwrap_or_default()
}
