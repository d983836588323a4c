//! Mailbox providers and the polling ladder

mod gmail;
mod memory;

pub use gmail::{DEFAULT_POLL_INTERVAL_SECS, GmailConfig, GmailMailbox};
pub use memory::InMemoryMailbox;

use crate::error::{ExtractError, Result};
use crate::types::{MailSearchCriteria, PollStage, RetrievedMessage};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// A single inbox search as sent to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxQuery {
    pub to: String,
    pub from: Option<String>,
    pub subject: Option<String>,

    /// How long the provider may keep polling before giving up
    pub wait: Duration,

    /// Whether message bodies are needed
    pub include_body: bool,
}

/// Inbox search capability.
///
/// Implementations poll until at least one message matches or `query.wait`
/// has elapsed, and return matches newest first. A zero wait performs exactly
/// one lookup.
pub trait Mailbox: Send + Sync {
    fn search(
        &self,
        query: &InboxQuery,
    ) -> impl Future<Output = Result<Vec<RetrievedMessage>>> + Send;
}

/// Wait caps for the ladder; `None` means the caller's full wait
const LADDER: &[(PollStage, Option<Duration>)] = &[
    (PollStage::AnyRecent, Some(Duration::from_secs(10))),
    (PollStage::RecipientFiltered, Some(Duration::from_secs(20))),
    (PollStage::FullFilter, None),
];

impl InboxQuery {
    /// Build the query a ladder stage runs; stage waits never exceed the caller's
    #[must_use]
    pub fn for_stage(stage: PollStage, cap: Option<Duration>, criteria: &MailSearchCriteria) -> Self {
        let wait = cap.map_or(criteria.max_wait, |cap| cap.min(criteria.max_wait));
        let (from, subject) = if stage.is_diagnostic() {
            (None, None)
        } else {
            (criteria.sender.clone(), criteria.subject_contains.clone())
        };

        Self {
            to: criteria.recipient.clone(),
            from,
            subject,
            wait,
            include_body: true,
        }
    }

    /// True when `message` satisfies every filter of this query
    #[must_use]
    pub fn matches(&self, message: &RetrievedMessage) -> bool {
        message.addressed_to(&self.to)
            && self.from.as_deref().is_none_or(|from| message.sender_contains(from))
            && self
                .subject
                .as_deref()
                .is_none_or(|subject| message.subject_contains(subject))
    }
}

/// Run the polling ladder and return the newest matching message
pub async fn fetch_latest<M: Mailbox>(
    mailbox: &M,
    criteria: &MailSearchCriteria,
) -> Result<RetrievedMessage> {
    if criteria.recipient.trim().is_empty() {
        return Err(ExtractError::Configuration(
            "recipient mailbox address is required".into(),
        ));
    }

    let mut reached = PollStage::AnyRecent;
    for &(stage, cap) in LADDER {
        reached = stage;
        let query = InboxQuery::for_stage(stage, cap, criteria);
        info!("[{}] searching inbox of {} (wait {}s)", stage, query.to, query.wait.as_secs());

        let found = mailbox.search(&query).await?;

        if stage.is_diagnostic() {
            if found.is_empty() {
                info!("[{}] no recent emails found", stage);
            } else {
                info!("[{}] found {} recent email(s)", stage, found.len());
            }
            continue;
        }

        if let Some(latest) = found.into_iter().next() {
            info!("[{}] matched email {:?} from {}", stage, latest.subject, latest.sender);
            return Ok(latest);
        }
        info!("[{}] no emails found for {}", stage, criteria);
    }

    warn!("No email found for {} after stage {}", criteria, reached);
    Err(ExtractError::NotFound {
        criteria: criteria.clone(),
        stage: reached,
    })
}

/// Repeat `attempt` every `interval` until it yields messages or `wait` runs out
pub(crate) async fn poll_within<F, Fut>(
    wait: Duration,
    interval: Duration,
    mut attempt: F,
) -> Result<Vec<RetrievedMessage>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<RetrievedMessage>>>,
{
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        let found = attempt().await?;
        if !found.is_empty() {
            return Ok(found);
        }

        let now = tokio::time::Instant::now();
        if now >= deadline {
            return Ok(found);
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}
