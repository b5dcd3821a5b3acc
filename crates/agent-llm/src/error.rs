use agent_core::AgentError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Transport failure, timeout, rejected credentials, rate limiting or a 5xx.
    #[error("model backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend answered with something that cannot be interpreted.
    #[error("model backend protocol error: {0}")]
    BackendProtocol(String),
}

impl ModelError {
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = format!("HTTP {}: {}", status, body.trim());
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status.is_server_error()
        {
            Self::BackendUnavailable(message)
        } else {
            Self::BackendProtocol(message)
        }
    }
}

impl From<reqwest::Error> for ModelError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::BackendProtocol(error.to_string())
        } else {
            Self::BackendUnavailable(error.to_string())
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(error: serde_json::Error) -> Self {
        Self::BackendProtocol(error.to_string())
    }
}

impl From<ModelError> for AgentError {
    fn from(error: ModelError) -> Self {
        match error {
            ModelError::BackendUnavailable(message) => AgentError::BackendUnavailable(message),
            ModelError::BackendProtocol(message) => AgentError::BackendProtocol(message),
        }
    }
}
