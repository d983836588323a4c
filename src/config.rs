//! Environment-supplied configuration

use crate::error::{ExtractError, Result};
use crate::mailbox::{DEFAULT_POLL_INTERVAL_SECS, GmailConfig};
use crate::reset_link::{
    DEFAULT_ORIGIN, DEFAULT_PATH_FRAGMENT, DEFAULT_REQUIRED_PHRASE, ResetLinkRules,
};
use crate::types::{DEFAULT_WAIT_SECS, MailSearchCriteria};
use std::path::PathBuf;
use std::time::Duration;

/// Recipient mailbox
pub const ENV_TEST_EMAIL: &str = "TEST_EMAIL";
/// Expected sender substring
pub const ENV_EMAIL_FROM: &str = "EMAIL_FROM";
/// Expected subject substring
pub const ENV_EMAIL_SUBJECT: &str = "EMAIL_SUBJECT";
pub const ENV_CREDENTIALS_PATH: &str = "GMAIL_CREDENTIALS_PATH";
pub const ENV_TOKEN_PATH: &str = "GMAIL_TOKEN_PATH";
pub const ENV_WAIT_TIME_SEC: &str = "EMAIL_WAIT_TIME_SEC";
pub const ENV_RESET_WAIT_TIME_SEC: &str = "RESET_WAIT_TIME_SEC";
pub const ENV_POLL_INTERVAL_SEC: &str = "GMAIL_POLL_INTERVAL_SEC";
pub const ENV_RESET_LINK_ORIGIN: &str = "RESET_LINK_ORIGIN";
pub const ENV_RESET_LINK_PATH: &str = "RESET_LINK_PATH";

const REQUIRED: &[&str] = &[
    ENV_TEST_EMAIL,
    ENV_EMAIL_FROM,
    ENV_EMAIL_SUBJECT,
    ENV_CREDENTIALS_PATH,
    ENV_TOKEN_PATH,
];

pub const DEFAULT_RESET_WAIT_SECS: u64 = 30;

/// Everything needed to locate and read verification emails
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub recipient: String,
    pub sender: String,
    pub subject: String,
    pub credentials_path: PathBuf,
    pub token_path: PathBuf,
    pub otp_wait: Duration,
    pub reset_wait: Duration,
    pub poll_interval: Duration,
    pub reset_origin: String,
    pub reset_path: String,
}

impl ExtractorConfig {
    /// Load from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup; empty values count as missing
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let missing: Vec<&str> = REQUIRED
            .iter()
            .copied()
            .filter(|&key| get(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ExtractError::Configuration(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }
        let required = |key: &str| get(key).unwrap_or_default();

        Ok(Self {
            recipient: required(ENV_TEST_EMAIL),
            sender: required(ENV_EMAIL_FROM),
            subject: required(ENV_EMAIL_SUBJECT),
            credentials_path: PathBuf::from(required(ENV_CREDENTIALS_PATH)),
            token_path: PathBuf::from(required(ENV_TOKEN_PATH)),
            otp_wait: seconds(ENV_WAIT_TIME_SEC, get(ENV_WAIT_TIME_SEC), DEFAULT_WAIT_SECS)?,
            reset_wait: seconds(
                ENV_RESET_WAIT_TIME_SEC,
                get(ENV_RESET_WAIT_TIME_SEC),
                DEFAULT_RESET_WAIT_SECS,
            )?,
            poll_interval: seconds(
                ENV_POLL_INTERVAL_SEC,
                get(ENV_POLL_INTERVAL_SEC),
                DEFAULT_POLL_INTERVAL_SECS,
            )?,
            reset_origin: get(ENV_RESET_LINK_ORIGIN).unwrap_or_else(|| DEFAULT_ORIGIN.to_string()),
            reset_path: get(ENV_RESET_LINK_PATH)
                .unwrap_or_else(|| DEFAULT_PATH_FRAGMENT.to_string()),
        })
    }

    /// Criteria for an OTP email
    #[must_use]
    pub fn otp_criteria(&self) -> MailSearchCriteria {
        MailSearchCriteria::new(&self.recipient)
            .from_sender(&self.sender)
            .subject_contains(&self.subject)
            .max_wait_secs(self.otp_wait.as_secs())
    }

    /// Criteria for a password-reset email
    #[must_use]
    pub fn reset_criteria(&self) -> MailSearchCriteria {
        MailSearchCriteria::new(&self.recipient)
            .from_sender(&self.sender)
            .subject_contains(&self.subject)
            .max_wait_secs(self.reset_wait.as_secs())
    }

    #[must_use]
    pub fn gmail_config(&self) -> GmailConfig {
        GmailConfig::new(&self.credentials_path, &self.token_path)
            .with_poll_interval(self.poll_interval)
    }

    pub fn reset_link_rules(&self) -> Result<ResetLinkRules> {
        ResetLinkRules::new(&self.reset_origin, &self.reset_path, DEFAULT_REQUIRED_PHRASE)
    }
}

fn seconds(key: &str, value: Option<String>, default: u64) -> Result<Duration> {
    value.map_or(Ok(Duration::from_secs(default)), |raw| {
        raw.trim().parse().map(Duration::from_secs).map_err(|_| {
            ExtractError::Configuration(format!("{key} must be a whole number of seconds, got {raw:?}"))
        })
    })
}
