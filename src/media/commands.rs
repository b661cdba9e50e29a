use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{HardsubError, Result};
use super::progress::DiagnosticLines;

/// Style applied to every burned-in subtitle.
pub const SUBTITLE_STYLE: &str = "FontName=Arial,FontSize=16,PrimaryColour=&HFFFFFF,\
OutlineColour=&H000000,BorderStyle=1,Outline=1,Shadow=0,MarginV=40,BackColour=&H00000000";

/// Abstract media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

/// Exit status and captured stderr of a streamed command
#[derive(Debug)]
pub struct StreamedOutput {
    pub status: ExitStatus,
    pub diagnostics: String,
    /// Set when stderr could not be read to the end
    pub read_error: Option<io::Error>,
}

impl MediaCommand {
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    pub fn hide_banner(self) -> Self {
        self.arg("-hide_banner")
    }

    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Run to completion and return stdout; a non-zero exit is an error.
    pub async fn capture_stdout(&self) -> Result<String> {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.args);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                HardsubError::Media(format!("Failed to execute {}: {}", self.binary_path, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HardsubError::Media(format!(
                "{} failed ({}): {}",
                self.description,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run while feeding every stderr segment to `on_segment`.
    ///
    /// The whole stderr text is returned alongside the exit status; a
    /// non-zero exit or a broken stderr stream is not an error at this level.
    /// Only failing to start or reap the process is returned as `Err`.
    pub async fn execute_streaming<F>(&self, on_segment: F) -> Result<StreamedOutput>
    where
        F: FnMut(&str) + Send,
    {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let mut child = Command::new(&self.binary_path)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child.stderr.take().ok_or_else(|| {
            HardsubError::Media(format!("{}: stderr was not captured", self.description))
        })?;

        let (diagnostics, read_error) =
            drain_segments(DiagnosticLines::new(BufReader::new(stderr)), on_segment).await;

        if let Some(e) = &read_error {
            warn!("{}: reading diagnostics failed: {}", self.description, e);
            if let Err(e) = child.start_kill() {
                debug!("{}: kill after read failure: {}", self.description, e);
            }
        }

        let status = child.wait().await?;
        Ok(StreamedOutput {
            status,
            diagnostics,
            read_error,
        })
    }
}

/// Collect every segment into one newline-joined text. A read error stops the
/// collection and is handed back together with what was read before it.
async fn drain_segments<R, F>(
    mut segments: DiagnosticLines<R>,
    mut on_segment: F,
) -> (String, Option<io::Error>)
where
    R: AsyncBufRead + Unpin,
    F: FnMut(&str),
{
    let mut diagnostics = String::new();
    loop {
        match segments.next_segment().await {
            Ok(Some(segment)) => {
                on_segment(&segment);
                diagnostics.push_str(&segment);
                diagnostics.push('\n');
            }
            Ok(None) => return (diagnostics, None),
            Err(e) => return (diagnostics, Some(e)),
        }
    }
}

/// Encoder selection: `-c:v <codec>` followed by its options
#[derive(Debug, Clone)]
pub struct EncoderSettings {
    pub codec: String,
    pub options: Vec<String>,
}

/// Builder for the ffmpeg/ffprobe invocations the pipeline needs
pub struct MediaCommandBuilder {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl MediaCommandBuilder {
    pub fn new<S1: Into<String>, S2: Into<String>>(ffmpeg_path: S1, ffprobe_path: S2) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Build the subtitle burn-in command
    pub fn burn_subtitles<P: AsRef<Path>>(
        &self,
        video_path: P,
        subtitle_path: P,
        output_path: P,
        encoder: &EncoderSettings,
    ) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, format!("Subtitle burn-in ({})", encoder.codec))
            .hide_banner()
            .input(video_path)
            .video_filter(subtitle_filter(subtitle_path.as_ref()))
            .video_codec(encoder.codec.clone())
            .args(encoder.options.iter().cloned())
            .copy_audio()
            .overwrite()
            .output(output_path)
    }

    /// Build the duration query: prints the bare number of seconds
    pub fn probe_duration<P: AsRef<Path>>(&self, video_path: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Duration probe")
            .args(["-v", "error"])
            .args(["-show_entries", "format=duration"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .output(video_path)
    }

    /// Build the encoder listing command
    pub fn list_encoders(&self) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Encoder listing")
            .hide_banner()
            .arg("-encoders")
    }
}

/// `subtitles=` filter with the fixed style applied.
pub fn subtitle_filter(subtitle_path: &Path) -> String {
    format!(
        "subtitles={}:force_style='{}'",
        escape_filter_path(&subtitle_path.to_string_lossy()),
        SUBTITLE_STYLE
    )
}

/// Escape a path used as an unquoted filter option value.
///
/// ffmpeg unescapes the value twice: once when splitting the filtergraph
/// (`\`, `'`, `[`, `]`, `,` and `;` are special) and once when splitting the
/// filter's options (`\`, `'` and `:`).
pub fn escape_filter_path(path: &str) -> String {
    escape_chars(&escape_chars(path, OPTION_SPECIAL), GRAPH_SPECIAL)
}

const OPTION_SPECIAL: &[char] = &['\\', '\'', ':'];
const GRAPH_SPECIAL: &[char] = &['\\', '\'', '[', ']', ',', ';'];

fn escape_chars(text: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
