use tracing::{error, info, warn};

use crate::job::{EncoderKind, JobConfig, JobResult};
use crate::media::MediaProcessorTrait;

/// Runs one burn-in job: hardware attempt first when requested, then at most
/// one software attempt.
pub struct TranscodeRunner<'a> {
    media: &'a dyn MediaProcessorTrait,
}

impl<'a> TranscodeRunner<'a> {
    pub fn new(media: &'a dyn MediaProcessorTrait) -> Self {
        Self { media }
    }

    /// Never fails: every error ends up in the returned `JobResult`.
    pub async fn run(&self, job: &JobConfig) -> JobResult {
        let name = job.pair.video_name();

        if job.use_hardware_encoder {
            match self.media.encode(job, EncoderKind::Hardware).await {
                Ok(()) => {
                    info!(
                        "Finished {} -> {} ({})",
                        name,
                        job.output_path.display(),
                        EncoderKind::Hardware
                    );
                    return JobResult::success(job.pair.clone(), EncoderKind::Hardware);
                }
                Err(e) => {
                    warn!("Hardware encoding failed for {}: {}", name, e.detail());
                    info!("Falling back to software encoding for {}", name);
                }
            }
        }

        match self.media.encode(job, EncoderKind::Software).await {
            Ok(()) => {
                info!(
                    "Finished {} -> {} ({})",
                    name,
                    job.output_path.display(),
                    EncoderKind::Software
                );
                JobResult::success(job.pair.clone(), EncoderKind::Software)
            }
            Err(e) => {
                let detail = e.detail();
                error!("Software encoding failed for {}: {}", name, detail);
                JobResult::failure(job.pair.clone(), EncoderKind::Software, detail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HardsubError;
    use crate::job::MediaPair;
    use crate::media::MockMediaProcessorTrait;
    use mockall::Sequence;
    use mockall::predicate::eq;
    use std::path::PathBuf;

    fn job(use_hardware_encoder: bool) -> JobConfig {
        let pair = MediaPair::new(PathBuf::from("/tv/ep1.mp4"), PathBuf::from("/tv/ep1.srt"));
        JobConfig::new(pair, "R", use_hardware_encoder, Some(60.0))
    }

    fn encode_failure(encoder: &str) -> HardsubError {
        HardsubError::Encode {
            encoder: encoder.to_string(),
            reason: "ffmpeg exit status: 1".to_string(),
            diagnostics: "Cannot load nvcuda.dll\n".to_string(),
        }
    }

    #[tokio::test]
    async fn test_hardware_success_runs_once() {
        let mut media = MockMediaProcessorTrait::new();
        media
            .expect_encode()
            .with(mockall::predicate::always(), eq(EncoderKind::Hardware))
            .times(1)
            .returning(|_, _| Ok(()));
        media.expect_encode().with(mockall::predicate::always(), eq(EncoderKind::Software)).never();

        let result = TranscodeRunner::new(&media).run(&job(true)).await;
        assert!(result.succeeded);
        assert_eq!(result.encoder_used, EncoderKind::Hardware);
        assert!(result.error_detail.is_none());
    }

    #[tokio::test]
    async fn test_hardware_failure_falls_back_exactly_once() {
        let mut seq = Sequence::new();
        let mut media = MockMediaProcessorTrait::new();
        media
            .expect_encode()
            .with(mockall::predicate::always(), eq(EncoderKind::Hardware))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(encode_failure("h264_nvenc")));
        media
            .expect_encode()
            .with(mockall::predicate::always(), eq(EncoderKind::Software))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let result = TranscodeRunner::new(&media).run(&job(true)).await;
        assert!(result.succeeded);
        assert_eq!(result.encoder_used, EncoderKind::Software);
    }

    #[tokio::test]
    async fn test_both_attempts_fail_reports_diagnostics() {
        let mut media = MockMediaProcessorTrait::new();
        media
            .expect_encode()
            .times(2)
            .returning(|_, encoder| match encoder {
                EncoderKind::Hardware => Err(encode_failure("h264_nvenc")),
                EncoderKind::Software => Err(HardsubError::Encode {
                    encoder: "libx264".to_string(),
                    reason: "ffmpeg exit status: 1".to_string(),
                    diagnostics: "ep1.srt: No such file or directory\n".to_string(),
                }),
            });

        let result = TranscodeRunner::new(&media).run(&job(true)).await;
        assert!(!result.succeeded);
        assert_eq!(result.encoder_used, EncoderKind::Software);
        let detail = result.error_detail.unwrap();
        assert!(detail.contains("No such file or directory"));
    }

    #[tokio::test]
    async fn test_software_only_job_skips_hardware() {
        let mut media = MockMediaProcessorTrait::new();
        media
            .expect_encode()
            .with(mockall::predicate::always(), eq(EncoderKind::Software))
            .times(1)
            .returning(|_, _| Err(encode_failure("libx264")));
        media.expect_encode().with(mockall::predicate::always(), eq(EncoderKind::Hardware)).never();

        let result = TranscodeRunner::new(&media).run(&job(false)).await;
        assert!(!result.succeeded);
        assert_eq!(result.encoder_used, EncoderKind::Software);
    }
}
