use thiserror::Error;

use crate::transcript::TranscriptError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Model backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Model backend protocol error: {0}")]
    BackendProtocol(String),

    #[error("Transcript error: {0}")]
    Transcript(#[from] TranscriptError),

    #[error("Cancelled")]
    Cancelled,
}

impl AgentError {
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_) | Self::BackendProtocol(_))
    }
}
