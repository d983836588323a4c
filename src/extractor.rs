//! Entry points: find the email, then extract from it

use crate::error::{ExtractError, Result};
use crate::mailbox::{Mailbox, fetch_latest};
use crate::otp;
use crate::reset_link::ResetLinkRules;
use crate::types::{MailSearchCriteria, Otp, ResetLink, RetrievedMessage};
use tracing::info;

/// Finds verification emails in a mailbox and extracts their payload
#[derive(Debug, Clone)]
pub struct MailExtractor<M> {
    mailbox: M,
    rules: ResetLinkRules,
}

impl<M: Mailbox> MailExtractor<M> {
    pub const fn new(mailbox: M, rules: ResetLinkRules) -> Self {
        Self { mailbox, rules }
    }

    #[must_use]
    pub const fn mailbox(&self) -> &M {
        &self.mailbox
    }

    /// Wait for the newest OTP email and return its 4-digit code
    pub async fn extract_otp(&self, criteria: &MailSearchCriteria) -> Result<Otp> {
        info!("Searching for OTP email with {}", criteria);
        let message = fetch_latest(&self.mailbox, criteria).await?;
        check_metadata(&message, criteria)?;
        otp::extract_otp(&message)
    }

    /// Wait for the newest password-reset email and return its link
    pub async fn extract_reset_link(&self, criteria: &MailSearchCriteria) -> Result<ResetLink> {
        if is_blank(criteria.sender.as_deref()) {
            return Err(ExtractError::Configuration(
                "expected sender is required for reset-link emails".into(),
            ));
        }
        if is_blank(criteria.subject_contains.as_deref()) {
            return Err(ExtractError::Configuration(
                "expected subject is required for reset-link emails".into(),
            ));
        }

        info!("Searching for reset password email with {}", criteria);
        let message = fetch_latest(&self.mailbox, criteria).await?;
        check_metadata(&message, criteria)?;
        self.rules.extract(&message)
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// The provider's search is fuzzy; confirm sender and subject ourselves
fn check_metadata(message: &RetrievedMessage, criteria: &MailSearchCriteria) -> Result<()> {
    if let Some(sender) = &criteria.sender
        && !message.sender_contains(sender)
    {
        return Err(ExtractError::Validation(format!(
            "sender {:?} does not contain {:?}",
            message.sender, sender
        )));
    }
    if let Some(subject) = &criteria.subject_contains
        && !message.subject_contains(subject)
    {
        return Err(ExtractError::Validation(format!(
            "subject {:?} does not contain {:?}",
            message.subject, subject
        )));
    }
    Ok(())
}
