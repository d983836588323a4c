//! Error types for mailbox polling and extraction

use crate::types::{MailSearchCriteria, PollStage};
use thiserror::Error;

/// Errors that can occur while locating a message or extracting from it
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Required configuration value is missing or unusable
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No message matched within the final polling stage's wait window
    #[error("No email found for {criteria} (last stage reached: {stage})")]
    NotFound {
        criteria: MailSearchCriteria,
        stage: PollStage,
    },

    /// A message was found but no OTP strategy matched its content
    #[error("OTP not found in email content (html: {html:?}, text: {text:?})")]
    OtpNotFound { html: String, text: String },

    /// A message was found but no reset-link strategy matched its content
    #[error("Reset password token and email not found in email content (html: {html:?}, text: {text:?})")]
    ResetLinkNotFound { html: String, text: String },

    /// Message metadata or content failed a precondition
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Mailbox provider rejected a request
    #[error("Mailbox provider error: {0}")]
    Mailbox(String),

    /// Failed to parse a message returned by the provider
    #[error("Failed to parse message: {0}")]
    Parse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExtractError {
    /// True when no message was delivered in time
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for extraction operations
pub type Result<T> = std::result::Result<T, ExtractError>;
