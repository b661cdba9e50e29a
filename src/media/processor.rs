use async_trait::async_trait;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::error::{HardsubError, Result};
use crate::job::{EncoderKind, JobConfig};
use super::{
    EncoderSettings, MediaCommandBuilder, MediaProcessorTrait, ProgressState, StreamedOutput,
    parse_time_marker,
};

/// Concrete implementation of media processor (FFmpeg-based)
pub struct MediaProcessorImpl {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
    progress: MultiProgress,
}

impl MediaProcessorImpl {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.ffmpeg_path, &config.ffprobe_path);

        Self {
            config,
            command_builder,
            progress: MultiProgress::new(),
        }
    }

    pub fn encoder_settings(&self, encoder: EncoderKind) -> EncoderSettings {
        match encoder {
            EncoderKind::Hardware => EncoderSettings {
                codec: self.config.hardware_encoder.clone(),
                options: self.config.hardware_options.clone(),
            },
            EncoderKind::Software => EncoderSettings {
                codec: self.config.software_encoder.clone(),
                options: self.config.software_options.clone(),
            },
        }
    }

    fn progress_bar(&self, job: &JobConfig, encoder: EncoderKind, codec: &str) -> ProgressBar {
        let style = ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos:>3}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        let bar = self.progress.add(ProgressBar::new(100));
        bar.set_style(style);
        bar.set_message(format!("{} ({} {})", job.pair.video_name(), encoder, codec));
        bar
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    async fn probe_duration(&self, video_path: &Path) -> Result<f64> {
        let stdout = self
            .command_builder
            .probe_duration(video_path)
            .capture_stdout()
            .await
            .map_err(|e| HardsubError::Probe {
                path: video_path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let duration = parse_duration(&stdout).ok_or_else(|| HardsubError::Probe {
            path: video_path.to_path_buf(),
            reason: format!("unparsable duration output {:?}", stdout.trim()),
        })?;

        debug!("Duration of {}: {:.2}s", video_path.display(), duration);
        Ok(duration)
    }

    async fn hardware_encoder_available(&self) -> Result<bool> {
        let listing = self.command_builder.list_encoders().capture_stdout().await?;
        Ok(listing.contains(&self.config.hardware_encoder))
    }

    async fn encode(&self, job: &JobConfig, encoder: EncoderKind) -> Result<()> {
        let settings = self.encoder_settings(encoder);
        let command = self.command_builder.burn_subtitles(
            job.pair.video.as_path(),
            job.pair.subtitle.as_path(),
            job.output_path.as_path(),
            &settings,
        );

        info!(
            "Burning {} into {} with {} ({})",
            job.pair.subtitle.display(),
            job.output_path.display(),
            settings.codec,
            encoder
        );

        let bar = self.progress_bar(job, encoder, &settings.codec);
        let mut progress = ProgressState::new(job.duration_seconds);

        let streamed = command
            .execute_streaming(|segment| {
                if let Some(elapsed) = parse_time_marker(segment) {
                    bar.set_position(progress.update(elapsed).round() as u64);
                }
            })
            .await;

        match streamed {
            Ok(output) if output.status.success() && output.read_error.is_none() => {
                bar.finish();
                Ok(())
            }
            Ok(output) => {
                bar.abandon();
                Err(attempt_error(&settings.codec, output))
            }
            Err(e) => {
                bar.abandon();
                Err(HardsubError::Encode {
                    encoder: settings.codec,
                    reason: format!("failed to run {}: {}", self.config.ffmpeg_path, e),
                    diagnostics: String::new(),
                })
            }
        }
    }
}

/// Failed attempt with everything ffmpeg printed before it ended.
fn attempt_error(encoder: &str, output: StreamedOutput) -> HardsubError {
    let reason = match output.read_error {
        Some(e) => format!("reading ffmpeg diagnostics failed ({}): {}", output.status, e),
        None => format!("ffmpeg {}", output.status),
    };
    HardsubError::Encode {
        encoder: encoder.to_string(),
        reason,
        diagnostics: output.diagnostics,
    }
}

/// First line of ffprobe output as a finite, non-negative number of seconds
fn parse_duration(stdout: &str) -> Option<f64> {
    let value: f64 = stdout.lines().next()?.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1425.360000\n"), Some(1425.36));
        assert_eq!(parse_duration("  12.5  "), Some(12.5));
        assert_eq!(parse_duration("N/A\n"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("-3"), None);
    }

    #[test]
    fn test_encoder_settings_follow_config() {
        let processor = MediaProcessorImpl::new(Config::default().media);

        let hardware = processor.encoder_settings(EncoderKind::Hardware);
        assert_eq!(hardware.codec, "h264_nvenc");
        assert_eq!(hardware.options, vec!["-preset", "p7", "-rc", "vbr", "-b:v", "1M"]);

        let software = processor.encoder_settings(EncoderKind::Software);
        assert_eq!(software.codec, "libx264");
        assert_eq!(software.options, vec!["-preset", "medium", "-crf", "23"]);
    }

    #[tokio::test]
    async fn test_missing_tools_degrade_to_errors() {
        let mut media = Config::default().media;
        media.ffmpeg_path = "/nonexistent/ffmpeg".to_string();
        media.ffprobe_path = "/nonexistent/ffprobe".to_string();
        let processor = MediaProcessorImpl::new(media);

        let err = processor.probe_duration(Path::new("/tv/ep1.mp4")).await.unwrap_err();
        assert!(matches!(err, HardsubError::Probe { .. }));
        assert!(processor.hardware_encoder_available().await.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_attempt_error_keeps_partial_diagnostics() {
        use std::os::unix::process::ExitStatusExt;

        let output = StreamedOutput {
            status: std::process::ExitStatus::from_raw(0),
            diagnostics: "Input #0, mov\nframe=1 time=00:00:01.00\n".to_string(),
            read_error: Some(std::io::Error::other("pipe closed")),
        };

        match attempt_error("h264_nvenc", output) {
            HardsubError::Encode { encoder, reason, diagnostics } => {
                assert_eq!(encoder, "h264_nvenc");
                assert!(reason.starts_with("reading ffmpeg diagnostics failed"));
                assert!(reason.contains("pipe closed"));
                assert!(diagnostics.contains("time=00:00:01.00"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_attempt_error_reports_exit_status() {
        use std::os::unix::process::ExitStatusExt;

        let output = StreamedOutput {
            status: std::process::ExitStatus::from_raw(1 << 8),
            diagnostics: "Error while opening encoder\n".to_string(),
            read_error: None,
        };

        let err = attempt_error("libx264", output);
        assert!(err.detail().contains("Error while opening encoder"));
        assert!(err.detail().starts_with("ffmpeg exit status: 1"));
    }
}
