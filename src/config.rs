use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{Result, HardsubError};

fn default_keep_log() -> bool {
    false
}

fn default_force_software() -> bool {
    false
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub media: MediaConfig,
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary (duration lookup only)
    pub ffprobe_path: String,
    /// GPU encoder tried first when `ffmpeg -encoders` lists it
    pub hardware_encoder: String,
    /// Options passed after `-c:v <hardware_encoder>`
    pub hardware_options: Vec<String>,
    /// CPU encoder used by default and as the fallback
    pub software_encoder: String,
    /// Options passed after `-c:v <software_encoder>`
    /// - preset: encoding speed (ultrafast, fast, medium, slow, veryslow)
    /// - crf: quality (0-51, lower = better quality, 23 is default)
    pub software_options: Vec<String>,
    /// Never attempt the hardware encoder
    #[serde(default = "default_force_software")]
    pub force_software: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Prefix marking an in-progress output file next to its source video
    pub output_prefix: String,
    /// Number of transcodes allowed to run at the same time
    pub max_concurrent_jobs: usize,
    /// Video extensions, matched case-insensitively
    pub video_extensions: Vec<String>,
    /// Subtitle extensions, matched case-insensitively
    pub subtitle_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Keep the per-run log file instead of deleting it at exit
    #[serde(default = "default_keep_log")]
    pub keep_log: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            keep_log: default_keep_log(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            media: MediaConfig {
                ffmpeg_path: "ffmpeg".to_string(),
                ffprobe_path: "ffprobe".to_string(),
                hardware_encoder: "h264_nvenc".to_string(),
                hardware_options: vec![
                    "-preset".to_string(), "p7".to_string(),
                    "-rc".to_string(), "vbr".to_string(),
                    "-b:v".to_string(), "1M".to_string(),
                ],
                software_encoder: "libx264".to_string(),
                software_options: vec![
                    "-preset".to_string(), "medium".to_string(),
                    "-crf".to_string(), "23".to_string(),
                ],
                force_software: false,
            },
            workflow: WorkflowConfig {
                output_prefix: "R".to_string(),
                max_concurrent_jobs: 1,
                video_extensions: vec!["mp4".to_string()],
                subtitle_extensions: vec!["srt".to_string()],
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HardsubError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| HardsubError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| HardsubError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| HardsubError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.workflow.max_concurrent_jobs == 0 {
            return Err(HardsubError::Config(
                "workflow.max_concurrent_jobs must be at least 1".to_string(),
            ));
        }
        if self.workflow.output_prefix.is_empty() {
            return Err(HardsubError::Config(
                "workflow.output_prefix must not be empty".to_string(),
            ));
        }
        if self.workflow.video_extensions.is_empty()
            || self.workflow.subtitle_extensions.is_empty()
        {
            return Err(HardsubError::Config(
                "workflow.video_extensions and workflow.subtitle_extensions must not be empty"
                    .to_string(),
            ));
        }
        Ok(())
    }
}
