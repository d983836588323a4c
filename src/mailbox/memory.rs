//! In-process mailbox backed by a shared message list

use super::{InboxQuery, Mailbox, poll_within};
use crate::error::Result;
use crate::types::RetrievedMessage;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Mailbox holding delivered messages in memory.
///
/// Clones share the same inbox, so a clone can keep delivering while the
/// extractor polls. Searches honor `InboxQuery::wait` using tokio time.
#[derive(Debug, Clone)]
pub struct InMemoryMailbox {
    messages: Arc<Mutex<Vec<RetrievedMessage>>>,
    queries: Arc<Mutex<Vec<InboxQuery>>>,
    poll_interval: Duration,
}

impl Default for InMemoryMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMailbox {
    #[must_use]
    pub fn new() -> Self {
        Self {
            messages: Arc::default(),
            queries: Arc::default(),
            poll_interval: Duration::from_secs(1),
        }
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Add a message to the inbox
    pub fn deliver(&self, message: RetrievedMessage) {
        lock(&self.messages).push(message);
    }

    /// Every query received so far, oldest first
    #[must_use]
    pub fn queries(&self) -> Vec<InboxQuery> {
        lock(&self.queries).clone()
    }

    /// Forget recorded queries; long-lived inboxes should call this between runs
    pub fn clear_queries(&self) {
        lock(&self.queries).clear();
    }

    fn matching(&self, query: &InboxQuery) -> Vec<RetrievedMessage> {
        let mut found: Vec<RetrievedMessage> = lock(&self.messages)
            .iter()
            .filter(|message| query.matches(message))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.received_at.cmp(&a.received_at));

        if !query.include_body {
            for message in &mut found {
                message.html_body.clear();
                message.text_body.clear();
            }
        }
        found
    }
}

impl Mailbox for InMemoryMailbox {
    async fn search(&self, query: &InboxQuery) -> Result<Vec<RetrievedMessage>> {
        lock(&self.queries).push(query.clone());
        poll_within(query.wait, self.poll_interval, || async { Ok(self.matching(query)) }).await
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
