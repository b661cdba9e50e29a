use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;

/// Burn paired subtitle files into their videos with ffmpeg.
///
/// Every `<name>.srt` next to a `<name>.mp4` is burned in; on success the
/// merged video replaces the original and the subtitle file is removed.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory to scan recursively for video/subtitle pairs
    #[arg(required_unless_present = "write_config")]
    pub directory: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of transcodes to run at the same time
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Skip the GPU encoder and use the CPU encoder only
    #[arg(long)]
    pub software_only: bool,

    /// Keep the per-run log file instead of deleting it at exit
    #[arg(long)]
    pub keep_log: bool,

    /// List the pairs that would be processed without touching anything
    #[arg(long)]
    pub dry_run: bool,

    /// Write the effective configuration to this path and exit
    #[arg(long, value_name = "PATH")]
    pub write_config: Option<PathBuf>,
}

impl Args {
    /// Command-line flags take precedence over the configuration file
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(jobs) = self.jobs {
            config.workflow.max_concurrent_jobs = jobs;
        }
        if self.software_only {
            config.media.force_software = true;
        }
        if self.keep_log {
            config.logging.keep_log = true;
        }
    }
}
