//! Hardsub - Batch Subtitle Burn-in
//!
//! Entry point: parses arguments, loads configuration, sets up the per-run
//! log and hands the target directory to the workflow.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::{error, info, warn};

use hardsub::cli::Args;
use hardsub::config::Config;
use hardsub::logging::LogSession;
use hardsub::workflow::{RunReport, Workflow};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Try to load hardsub.toml from current directory first
            if Path::new("hardsub.toml").exists() {
                Config::from_file("hardsub.toml")?
            } else {
                Config::default()
            }
        }
    };
    args.apply_overrides(&mut config);
    config.validate()?;

    if let Some(path) = &args.write_config {
        config.save_to_file(path)?;
        println!("Configuration written to {}", path.display());
        return Ok(());
    }

    let Some(root) = args.directory.as_deref() else {
        anyhow::bail!("No directory given");
    };

    // The log file lives next to the media; without a usable directory log to console only
    let log_dir = root.is_dir().then_some(root);
    let _log_session = LogSession::init(log_dir, args.verbose, config.logging.keep_log)?;

    let workflow = Workflow::new(config);

    if args.dry_run {
        let jobs = workflow.preview_directory(root).inspect_err(|e| error!("{}", e))?;
        info!("Dry run: {} pairs would be processed", jobs.len());
        return Ok(());
    }

    let report = workflow.process_directory(root).await.inspect_err(|e| error!("{}", e))?;
    log_summary(&report);

    Ok(())
}

/// Job failures are reported here but do not change the exit status
fn log_summary(report: &RunReport) {
    info!(
        "Finished {}: {} pairs, {} succeeded, {} failed, {} unmatched subtitles",
        report.root.display(),
        report.jobs.len(),
        report.succeeded(),
        report.failed(),
        report.unmatched_subtitles.len()
    );

    for job in report.jobs.iter().filter(|job| !job.result.succeeded) {
        error!(
            "Failed: {} ({})",
            job.result.pair.video.display(),
            job.result.error_detail.as_deref().unwrap_or("no diagnostics")
        );
    }

    for subtitle in &report.unmatched_subtitles {
        warn!("Unmatched subtitle: {}", subtitle.display());
    }

    let cleanup_failures = report.cleanup_failures();
    if cleanup_failures > 0 {
        warn!("{} cleanup steps failed; see messages above", cleanup_failures);
    }
}
