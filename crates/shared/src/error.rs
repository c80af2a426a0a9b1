use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
pub const INVALID_RESPONSE: &str = "INVALID_RESPONSE";
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const ESTIMATE_TIMEOUT: &str = "ESTIMATE_TIMEOUT";
pub const ESTIMATE_FAILED: &str = "ESTIMATE_FAILED";

/// Coarse class of an [`ApiError`], used to pick how a failure is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No response, or a response that could not be understood.
    Transport,
    /// The backend answered with a structured rejection.
    Domain,
    /// A client-side wait bound ran out.
    Timeout,
    /// The request was rejected before it was sent.
    Validation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            details: None,
            status: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Self::new(message)
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::with_code(message, NETWORK_ERROR)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::with_code(message, INVALID_RESPONSE)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_code(message, VALIDATION_ERROR)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_code(message, NOT_FOUND)
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn kind(&self) -> ErrorKind {
        match self.code() {
            Some(NETWORK_ERROR) | Some(INVALID_RESPONSE) => ErrorKind::Transport,
            Some(ESTIMATE_TIMEOUT) => ErrorKind::Timeout,
            Some(VALIDATION_ERROR) if self.status.is_none() => ErrorKind::Validation,
            _ => ErrorKind::Domain,
        }
    }

    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }
}
