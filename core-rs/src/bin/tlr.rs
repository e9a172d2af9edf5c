//! TLR - test launch reporter CLI
//!
//! Utility surface over the reporting core: create a launch root (running
//! retention pruning), assemble a report for an existing test directory,
//! or list a launch's stored artifacts.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tlr_core::{assemble_dir, ReportConfig, ReportContext, ARTIFACTS_DIR_NAME, HTML_REPORT_NAME};

#[derive(Parser)]
#[command(name = "tlr")]
#[command(version = tlr_core::VERSION)]
#[command(about = "Test launch report utilities", long_about = None)]
struct Cli {
    /// Path to a YAML report configuration (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the launch root, pruning old launches beyond the retention count
    Init,
    /// Assemble report.html for an existing test directory
    Assemble {
        /// Test directory containing screenshots
        dir: PathBuf,
    },
    /// List the artifacts stored under a launch directory
    Artifacts {
        /// Launch root directory (the timestamp-named folder)
        launch_dir: PathBuf,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ReportConfig> {
    Ok(match path {
        Some(path) => ReportConfig::from_file(path)?,
        None => ReportConfig::default(),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let config = load_config(cli.config.as_ref())?;
            let ctx = ReportContext::new(config);
            let root = ctx.root_dir()?;

            println!("✓ Launch root created");
            println!("  Id: {}", ctx.root_id()?);
            println!("  Location: {}", root.display());
        }

        Commands::Assemble { dir } => {
            if !dir.is_dir() {
                anyhow::bail!("Not a directory: {}", dir.display());
            }
            if assemble_dir(&dir, &|_| String::new())? {
                println!("✓ Report written: {}", dir.join(HTML_REPORT_NAME).display());
            } else {
                println!("No screenshots in {}, report skipped", dir.display());
            }
        }

        Commands::Artifacts { launch_dir } => {
            let artifacts_dir = launch_dir.join(ARTIFACTS_DIR_NAME);
            if !artifacts_dir.is_dir() {
                anyhow::bail!("No artifacts folder under {}", launch_dir.display());
            }

            let mut files: Vec<PathBuf> = std::fs::read_dir(&artifacts_dir)?
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .collect();
            files.sort();

            if files.is_empty() {
                println!("No artifacts in {}", artifacts_dir.display());
            }
            for file in files {
                let size = file.metadata().map(|m| m.len()).unwrap_or(0);
                println!(
                    "{:>10}  {}",
                    size,
                    file.file_name().unwrap_or_default().to_string_lossy()
                );
            }
        }
    }

    Ok(())
}
