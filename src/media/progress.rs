use std::sync::LazyLock;

use regex_lite::Regex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

static TIME_MARKER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"time=(\d{2,}):(\d{2}):(\d{2})\.(\d{2})").ok());

/// Extract the elapsed media time from an ffmpeg stats line (`time=HH:MM:SS.CC`).
pub fn parse_time_marker(line: &str) -> Option<f64> {
    let caps = TIME_MARKER.as_ref()?.captures(line)?;
    let field = |index: usize| -> Option<f64> { caps.get(index)?.as_str().parse::<f64>().ok() };

    let hours = field(1)?;
    let minutes = field(2)?;
    let seconds = field(3)?;
    let centiseconds = field(4)?;

    Some(hours * 3600.0 + minutes * 60.0 + seconds + centiseconds / 100.0)
}

/// Percentage complete for one encoder attempt.
///
/// The value never decreases and stays within `[0, 100]`. An unknown or
/// non-positive duration is treated as one second, so the percentage is
/// meaningless in that case but always defined.
#[derive(Debug, Clone)]
pub struct ProgressState {
    duration_seconds: f64,
    percent: f64,
}

impl ProgressState {
    pub fn new(duration_seconds: Option<f64>) -> Self {
        let duration_seconds = match duration_seconds {
            Some(d) if d.is_finite() && d > 0.0 => d,
            _ => 1.0,
        };
        Self {
            duration_seconds,
            percent: 0.0,
        }
    }

    /// Record a newly parsed elapsed time and return the current percentage.
    pub fn update(&mut self, elapsed_seconds: f64) -> f64 {
        if elapsed_seconds.is_finite() {
            let candidate = (elapsed_seconds / self.duration_seconds * 100.0).clamp(0.0, 100.0);
            if candidate > self.percent {
                self.percent = candidate;
            }
        }
        self.percent
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }
}

/// Splits a diagnostic stream into segments on `\n` and `\r`.
///
/// ffmpeg rewrites its stats line in place with a carriage return, so a plain
/// line reader would only see progress once the process exits.
pub struct DiagnosticLines<R> {
    reader: R,
    pending: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> DiagnosticLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::new(),
        }
    }

    /// Next non-empty segment, or `None` once the stream is exhausted.
    pub async fn next_segment(&mut self) -> std::io::Result<Option<String>> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.take_pending()));
            }

            match available.iter().position(|b| *b == b'\n' || *b == b'\r') {
                Some(pos) => {
                    self.pending.extend_from_slice(&available[..pos]);
                    self.reader.consume(pos + 1);
                    if !self.pending.is_empty() {
                        return Ok(Some(self.take_pending()));
                    }
                }
                None => {
                    let len = available.len();
                    self.pending.extend_from_slice(available);
                    self.reader.consume(len);
                }
            }
        }
    }

    fn take_pending(&mut self) -> String {
        let bytes = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
