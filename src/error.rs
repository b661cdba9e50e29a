use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HardsubError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Duration probe failed for {}: {reason}", path.display())]
    Probe { path: PathBuf, reason: String },

    /// One encoder attempt failed; `diagnostics` holds everything the tool wrote to stderr.
    #[error("Encoding with {encoder} failed ({reason})")]
    Encode {
        encoder: String,
        reason: String,
        diagnostics: String,
    },

    #[error("Cleanup of {} failed: {reason}", path.display())]
    Cleanup { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl HardsubError {
    /// Text to surface in a job report: the tool's own output when there is any.
    pub fn detail(&self) -> String {
        match self {
            HardsubError::Encode {
                reason,
                diagnostics,
                ..
            } if !diagnostics.trim().is_empty() => {
                format!("{}\n{}", reason, diagnostics.trim_end())
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HardsubError>;
