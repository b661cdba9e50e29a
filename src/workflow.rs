use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::OnceCell;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::Config;
use crate::error::{HardsubError, Result};
use crate::job::{JobConfig, JobResult, MediaPair};
use crate::media::{MediaProcessorFactory, MediaProcessorTrait};
use crate::pairing::{PairMatcher, PairingOutcome};
use crate::runner::TranscodeRunner;

/// What the post-success step did to the files of one job
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub renamed_to: Option<PathBuf>,
    pub failures: Vec<HardsubError>,
}

#[derive(Debug)]
pub struct JobReport {
    pub result: JobResult,
    /// `None` when the job failed and nothing was touched
    pub cleanup: Option<CleanupReport>,
}

#[derive(Debug)]
pub struct RunReport {
    pub root: PathBuf,
    pub hardware_available: bool,
    pub jobs: Vec<JobReport>,
    pub unmatched_subtitles: Vec<PathBuf>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.jobs.iter().filter(|job| job.result.succeeded).count()
    }

    pub fn failed(&self) -> usize {
        self.jobs.len() - self.succeeded()
    }

    pub fn cleanup_failures(&self) -> usize {
        self.jobs
            .iter()
            .filter_map(|job| job.cleanup.as_ref())
            .map(|cleanup| cleanup.failures.len())
            .sum()
    }
}

pub struct Workflow {
    config: Config,
    media: Box<dyn MediaProcessorTrait>,
    matcher: PairMatcher,
    hardware: OnceCell<bool>,
}

impl Workflow {
    pub fn new(config: Config) -> Self {
        let media = MediaProcessorFactory::create_processor(config.media.clone());
        Self::with_media(config, media)
    }

    pub fn with_media(config: Config, media: Box<dyn MediaProcessorTrait>) -> Self {
        let matcher = PairMatcher::new(
            &config.workflow.video_extensions,
            &config.workflow.subtitle_extensions,
        );

        Self {
            config,
            media,
            matcher,
            hardware: OnceCell::new(),
        }
    }

    pub fn discover<P: AsRef<Path>>(&self, root: P) -> Result<PairingOutcome> {
        self.matcher.find_pairs(root)
    }

    /// Probed at most once per workflow; any failure means software only.
    pub async fn hardware_available(&self) -> bool {
        if self.config.media.force_software {
            return false;
        }

        *self
            .hardware
            .get_or_init(|| async {
                match self.media.hardware_encoder_available().await {
                    Ok(true) => {
                        info!(
                            "{} is available, GPU encoding will be tried first",
                            self.config.media.hardware_encoder
                        );
                        true
                    }
                    Ok(false) => {
                        warn!(
                            "{} not found, using {} (CPU encoding)",
                            self.config.media.hardware_encoder, self.config.media.software_encoder
                        );
                        false
                    }
                    Err(e) => {
                        warn!(
                            "Encoder detection failed: {}, using {} (CPU encoding)",
                            e, self.config.media.software_encoder
                        );
                        false
                    }
                }
            })
            .await
    }

    /// List the jobs a run would create without invoking ffmpeg or touching files.
    pub fn preview_directory<P: AsRef<Path>>(&self, root: P) -> Result<Vec<JobConfig>> {
        let outcome = self.discover(root)?;
        let jobs: Vec<JobConfig> = outcome
            .pairs
            .into_iter()
            .map(|pair| JobConfig::new(pair, &self.config.workflow.output_prefix, false, None))
            .collect();

        for job in &jobs {
            info!(
                "Would burn {} into {} (output {})",
                job.pair.subtitle.display(),
                job.pair.video.display(),
                job.output_path.display()
            );
        }
        Ok(jobs)
    }

    /// Burn every pair found under `root` and replace the originals on success.
    ///
    /// Only an invalid root is an error; job failures are in the report.
    pub async fn process_directory<P: AsRef<Path>>(&self, root: P) -> Result<RunReport> {
        let root = root.as_ref();
        info!("Processing directory: {}", root.display());

        let outcome = self.discover(root)?;
        let hardware_available = self.hardware_available().await;

        if outcome.pairs.is_empty() {
            warn!("No matching video/subtitle pairs found under {}", root.display());
        }

        let width = self.config.workflow.max_concurrent_jobs.max(1);
        let jobs: Vec<JobReport> = stream::iter(outcome.pairs)
            .map(|pair| {
                let span = info_span!("job", video = %pair.video_name());
                self.process_pair(pair, hardware_available).instrument(span)
            })
            .buffer_unordered(width)
            .collect()
            .await;

        Ok(RunReport {
            root: root.to_path_buf(),
            hardware_available,
            jobs,
            unmatched_subtitles: outcome.unmatched_subtitles,
        })
    }

    async fn process_pair(&self, pair: MediaPair, use_hardware_encoder: bool) -> JobReport {
        let duration = match self.media.probe_duration(&pair.video).await {
            Ok(duration) => Some(duration),
            Err(e) => {
                warn!("{}; progress will not be meaningful", e);
                None
            }
        };

        let job = JobConfig::new(
            pair,
            &self.config.workflow.output_prefix,
            use_hardware_encoder,
            duration,
        );
        debug!("Job configured: {:?}", job);

        let result = TranscodeRunner::new(self.media.as_ref()).run(&job).await;
        if !result.succeeded {
            warn!(
                "Leaving {} and {} untouched",
                job.pair.video.display(),
                job.pair.subtitle.display()
            );
            return JobReport { result, cleanup: None };
        }

        let cleanup = replace_originals(&job).await;
        JobReport {
            result,
            cleanup: Some(cleanup),
        }
    }
}

/// Delete the original video and subtitle, then move the output onto the
/// video's path. Each step runs regardless of how the previous one went.
pub async fn replace_originals(job: &JobConfig) -> CleanupReport {
    let mut report = CleanupReport::default();

    for original in [&job.pair.video, &job.pair.subtitle] {
        match fs::remove_file(original).await {
            Ok(()) => {
                info!("Deleted original file: {}", original.display());
                report.removed.push(original.clone());
            }
            Err(e) => {
                let failure = HardsubError::Cleanup {
                    path: original.clone(),
                    reason: e.to_string(),
                };
                error!("{}", failure);
                report.failures.push(failure);
            }
        }
    }

    match fs::rename(&job.output_path, &job.final_path).await {
        Ok(()) => {
            info!("Renamed {} to {}", job.output_path.display(), job.final_path.display());
            report.renamed_to = Some(job.final_path.clone());
        }
        Err(e) => {
            let failure = HardsubError::Cleanup {
                path: job.output_path.clone(),
                reason: e.to_string(),
            };
            error!("{}", failure);
            report.failures.push(failure);
        }
    }

    report
}
