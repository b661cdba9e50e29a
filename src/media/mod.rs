// Media processing layer
//
// - Commands: argument-vector builders for ffmpeg/ffprobe
// - Progress: stderr segment reader and progress state
// - Processor: ffmpeg-backed implementation of the trait below

pub mod commands;
pub mod processor;
pub mod progress;

use async_trait::async_trait;
use std::path::Path;

pub use commands::*;
pub use processor::*;
pub use progress::*;

use crate::config::MediaConfig;
use crate::error::Result;
use crate::job::{EncoderKind, JobConfig};

/// Main trait for media processing operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Duration of a video in seconds
    async fn probe_duration(&self, video_path: &Path) -> Result<f64>;

    /// Whether the configured hardware encoder shows up in the encoder listing
    async fn hardware_encoder_available(&self) -> Result<bool>;

    /// One burn-in attempt with the given encoder, writing to `job.output_path`
    async fn encode(&self, job: &JobConfig, encoder: EncoderKind) -> Result<()>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessorTrait> {
        Box::new(processor::MediaProcessorImpl::new(config))
    }
}
