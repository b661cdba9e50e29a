use std::fmt;
use std::path::{Path, PathBuf};

/// A video and the subtitle that will be burned into it.
///
/// Both paths live in the same directory and share a file stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPair {
    pub video: PathBuf,
    pub subtitle: PathBuf,
}

impl MediaPair {
    pub fn new(video: PathBuf, subtitle: PathBuf) -> Self {
        Self { video, subtitle }
    }

    pub fn directory(&self) -> &Path {
        self.video.parent().unwrap_or_else(|| Path::new("."))
    }

    /// File name of the video, used for log and progress labels
    pub fn video_name(&self) -> String {
        self.video
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.video.display().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderKind {
    Hardware,
    Software,
}

impl fmt::Display for EncoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncoderKind::Hardware => write!(f, "GPU"),
            EncoderKind::Software => write!(f, "CPU"),
        }
    }
}

/// Everything one transcode job needs, built right before it runs.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub pair: MediaPair,
    /// Where ffmpeg writes; carries the reserved prefix
    pub output_path: PathBuf,
    /// Where the output ends up after a successful run (the original video path)
    pub final_path: PathBuf,
    pub use_hardware_encoder: bool,
    /// `None` when the duration probe failed
    pub duration_seconds: Option<f64>,
}

impl JobConfig {
    pub fn new(
        pair: MediaPair,
        output_prefix: &str,
        use_hardware_encoder: bool,
        duration_seconds: Option<f64>,
    ) -> Self {
        let output_path = reserved_output_path(&pair, output_prefix);
        let final_path = pair.video.clone();

        Self {
            pair,
            output_path,
            final_path,
            use_hardware_encoder,
            duration_seconds,
        }
    }
}

/// Prefix the video name with `prefix`, repeating the prefix while the name is taken.
fn reserved_output_path(pair: &MediaPair, prefix: &str) -> PathBuf {
    let name = pair.video_name();
    let directory = pair.directory();

    let mut marker = prefix.to_string();
    let mut candidate = directory.join(format!("{}{}", marker, name));
    while candidate.exists() {
        marker.push_str(prefix);
        candidate = directory.join(format!("{}{}", marker, name));
    }
    candidate
}

#[derive(Debug, Clone)]
pub struct JobResult {
    pub pair: MediaPair,
    pub succeeded: bool,
    pub encoder_used: EncoderKind,
    pub error_detail: Option<String>,
}

impl JobResult {
    pub fn success(pair: MediaPair, encoder_used: EncoderKind) -> Self {
        Self {
            pair,
            succeeded: true,
            encoder_used,
            error_detail: None,
        }
    }

    pub fn failure(pair: MediaPair, encoder_used: EncoderKind, detail: String) -> Self {
        Self {
            pair,
            succeeded: false,
            encoder_used,
            error_detail: Some(detail),
        }
    }
}
