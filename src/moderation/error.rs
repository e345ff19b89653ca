//! Moderation provider error types

use thiserror::Error;

/// Moderation provider error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ModerationError {
    pub kind: ModerationErrorKind,
    pub message: String,
}

impl ModerationError {
    pub fn new(kind: ModerationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ModerationErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(ModerationErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(ModerationErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ModerationErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ModerationErrorKind::InvalidRequest, message)
    }

    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::new(ModerationErrorKind::NotConfigured, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ModerationErrorKind::Unknown, message)
    }
}

/// Error classification, used for logging only: the gate never retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationErrorKind {
    /// Network issues, timeouts
    Network,
    /// Rate limited (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Authentication failed (401, 403)
    Auth,
    /// Bad request (400)
    InvalidRequest,
    /// No provider endpoint or key was configured
    NotConfigured,
    /// Unknown error
    Unknown,
}

impl ModerationErrorKind {
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }
}
