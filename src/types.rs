//! Core types for mailbox searches and extraction results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default wait for the final polling stage, in seconds
pub const DEFAULT_WAIT_SECS: u64 = 60;

/// What to look for in the mailbox and how long to wait for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailSearchCriteria {
    /// Mailbox address the message was delivered to
    pub recipient: String,

    /// Sender substring to filter on
    pub sender: Option<String>,

    /// Subject substring to filter on
    pub subject_contains: Option<String>,

    /// Upper bound on how long the final polling stage waits
    pub max_wait: Duration,
}

impl MailSearchCriteria {
    pub fn new(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            sender: None,
            subject_contains: None,
            max_wait: Duration::from_secs(DEFAULT_WAIT_SECS),
        }
    }

    #[must_use]
    pub fn from_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    #[must_use]
    pub fn subject_contains(mut self, subject: impl Into<String>) -> Self {
        self.subject_contains = Some(subject.into());
        self
    }

    #[must_use]
    pub const fn max_wait_secs(mut self, secs: u64) -> Self {
        self.max_wait = Duration::from_secs(secs);
        self
    }
}

impl fmt::Display for MailSearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "to={}", self.recipient)?;
        if let Some(sender) = &self.sender {
            write!(f, " from={sender}")?;
        }
        if let Some(subject) = &self.subject_contains {
            write!(f, " subject={subject:?}")?;
        }
        write!(f, " wait={}s", self.max_wait.as_secs())
    }
}

/// Stages of the mailbox polling ladder, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PollStage {
    /// Recipient only; tells "no mail at all" apart from "mail not matching"
    AnyRecent,
    /// Recipient plus sender/subject filters with a short wait
    RecipientFiltered,
    /// Full filter set with the caller's wait
    FullFilter,
}

impl PollStage {
    /// Results of this stage are logged, never returned
    #[must_use]
    pub const fn is_diagnostic(self) -> bool {
        matches!(self, Self::AnyRecent)
    }
}

impl fmt::Display for PollStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AnyRecent => "any-recent",
            Self::RecipientFiltered => "recipient-filtered",
            Self::FullFilter => "full-filter",
        };
        f.write_str(name)
    }
}

/// A message snapshot as returned by the mailbox provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedMessage {
    /// Provider message identifier
    pub id: String,

    /// Raw `From` value, e.g. `"Club <noreply@club.example>"`
    pub sender: String,

    /// Raw `To` values
    pub recipients: Vec<String>,

    pub subject: String,

    /// HTML part, empty when the message has none
    pub html_body: String,

    /// Plain text part, empty when the message has none
    pub text_body: String,

    pub received_at: DateTime<Utc>,
}

impl RetrievedMessage {
    /// Case-insensitive check on the sender
    #[must_use]
    pub fn sender_contains(&self, needle: &str) -> bool {
        contains_ignore_case(&self.sender, needle)
    }

    /// Case-insensitive check on the subject
    #[must_use]
    pub fn subject_contains(&self, needle: &str) -> bool {
        contains_ignore_case(&self.subject, needle)
    }

    /// Case-insensitive check on any recipient
    #[must_use]
    pub fn addressed_to(&self, needle: &str) -> bool {
        self.recipients
            .iter()
            .any(|to| contains_ignore_case(to, needle))
    }
}

pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// A 4-digit one-time passcode
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Otp(String);

impl Otp {
    /// Number of digits in a passcode
    pub const LEN: usize = 4;

    /// Accepts exactly four ASCII digits
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        (s.len() == Self::LEN && s.bytes().all(|b| b.is_ascii_digit())).then(|| Self(s.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Otp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Password-reset link extracted from an email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetLink {
    /// 40-character reset token
    pub token: String,

    /// Value of the `email` query parameter
    pub email: String,

    /// Complete link to the reset page
    pub full_url: String,
}

impl ResetLink {
    /// Length of a reset token
    pub const TOKEN_LEN: usize = 40;

    /// Check the token shape and that the URL carries both token and email
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.token.len() == Self::TOKEN_LEN
            && self
                .token
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
            && self.full_url.contains(&self.token)
            && self.full_url.contains(&format!("email={}", self.email))
    }
}
