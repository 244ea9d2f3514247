use std::io;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Filtering does not support the {0} platform.")]
    UnsupportedSource(String),
    #[error("could not rewrite the {source_name} url: {reason}")]
    UrlRewrite { source_name: String, reason: String },
    #[error("failed to launch transcoder: {0}")]
    TranscoderStartup(#[source] io::Error),
    #[error("transcoder exited before producing audio ({0})")]
    TranscoderExited(String),
    #[error("failed to read transcoder output: {0}")]
    TranscoderRead(#[source] io::Error),
    #[error("failed to start encoder: {0}")]
    EncoderStartup(#[source] io::Error),
}

impl PipelineError {
    fn cause(&self) -> String {
        match self {
            PipelineError::UnsupportedSource(_) => self.to_string(),
            PipelineError::UrlRewrite { .. } => "Url rewrite failed".to_string(),
            _ => "Unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Fault,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureException {
    pub message: String,
    pub severity: Severity,
    pub cause: String,
}

/// What a caller gets instead of a stream:
/// `{"status": 1, "exception": {"message", "severity", "cause"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{}", .exception.message)]
pub struct ResourceFailure {
    pub status: u8,
    pub exception: FailureException,
}

impl From<PipelineError> for ResourceFailure {
    fn from(err: PipelineError) -> Self {
        Self {
            status: 1,
            exception: FailureException {
                message: err.to_string(),
                severity: Severity::Fault,
                cause: err.cause(),
            },
        }
    }
}
