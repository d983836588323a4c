//! Gmail REST API mailbox
//!
//! Authenticates with an OAuth client credentials file and a user token file
//! (the pair produced by Google's installed-app consent flow). Both files are
//! read on every search and refreshed tokens are kept in memory only.

use super::{InboxQuery, Mailbox, poll_within};
use crate::error::{ExtractError, Result};
use crate::parser::parse_message;
use crate::types::RetrievedMessage;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{Engine as _, alphabet};
use chrono::Utc;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://gmail.googleapis.com";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_MAX_MESSAGES: usize = 5;

// Refresh a little before Google considers the token expired
const EXPIRY_SKEW_MS: i64 = 60_000;

// Gmail emits URL-safe base64, with or without padding
const RAW_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Settings for the Gmail mailbox
#[derive(Debug, Clone)]
pub struct GmailConfig {
    pub credentials_path: PathBuf,
    pub token_path: PathBuf,
    pub api_base: String,
    pub poll_interval: Duration,

    /// Messages fetched per successful lookup
    pub max_messages: usize,
}

impl GmailConfig {
    pub fn new(credentials_path: impl Into<PathBuf>, token_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            token_path: token_path.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_messages: DEFAULT_MAX_MESSAGES,
        }
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<OAuthClient>,
    web: Option<OAuthClient>,
}

#[derive(Debug, Deserialize)]
struct OAuthClient {
    client_id: String,
    client_secret: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Deserialize)]
struct TokenFile {
    access_token: Option<String>,
    refresh_token: Option<String>,
    /// Milliseconds since the Unix epoch
    expiry_date: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    id: String,
    raw: String,
}

/// Mailbox backed by the Gmail REST API
#[derive(Debug, Clone)]
pub struct GmailMailbox {
    config: GmailConfig,
    client: reqwest::Client,
}

impl GmailMailbox {
    pub fn new(config: GmailConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { config, client })
    }

    #[must_use]
    pub const fn config(&self) -> &GmailConfig {
        &self.config
    }

    /// Open a session: load the token file and refresh the access token if needed
    async fn access_token(&self) -> Result<String> {
        let token: TokenFile = read_json(&self.config.token_path).await?;

        let now_ms = Utc::now().timestamp_millis();
        let fresh = token
            .expiry_date
            .is_none_or(|expiry| expiry - EXPIRY_SKEW_MS > now_ms);
        if let Some(access) = token.access_token.filter(|_| fresh) {
            return Ok(access);
        }

        let refresh_token = token.refresh_token.ok_or_else(|| {
            ExtractError::Configuration(format!(
                "{} has no usable access token and no refresh token",
                self.config.token_path.display()
            ))
        })?;
        let credentials: CredentialsFile = read_json(&self.config.credentials_path).await?;
        let client = credentials
            .installed
            .or(credentials.web)
            .ok_or_else(|| {
                ExtractError::Configuration(format!(
                    "{} has neither an installed nor a web client",
                    self.config.credentials_path.display()
                ))
            })?;

        debug!("Refreshing Gmail access token via {}", client.token_uri);
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
        ];
        let resp = self.client.post(&client.token_uri).form(&form).send().await?;
        let refreshed: RefreshResponse = ensure_success(resp).await?.json().await?;
        Ok(refreshed.access_token)
    }

    async fn lookup(
        &self,
        access_token: &str,
        q: &str,
        include_body: bool,
    ) -> Result<Vec<RetrievedMessage>> {
        let url = format!("{}/gmail/v1/users/me/messages", self.config.api_base);
        let max_results = self.config.max_messages.to_string();
        let resp = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("q", q), ("maxResults", max_results.as_str())])
            .send()
            .await?;
        let list: ListResponse = ensure_success(resp).await?.json().await?;
        debug!("Gmail query {:?} returned {} message(s)", q, list.messages.len());

        let mut messages = Vec::with_capacity(list.messages.len());
        for message_ref in list.messages.iter().take(self.config.max_messages) {
            let mut message = self.fetch_raw(access_token, &message_ref.id).await?;
            if !include_body {
                message.html_body.clear();
                message.text_body.clear();
            }
            messages.push(message);
        }
        Ok(messages)
    }

    async fn fetch_raw(&self, access_token: &str, id: &str) -> Result<RetrievedMessage> {
        let url = format!("{}/gmail/v1/users/me/messages/{}", self.config.api_base, id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("format", "raw")])
            .send()
            .await?;
        let raw: RawMessage = ensure_success(resp).await?.json().await?;

        let bytes = RAW_ENGINE
            .decode(raw.raw.trim())
            .map_err(|e| ExtractError::Parse(format!("message {}: {e}", raw.id)))?;
        parse_message(raw.id, &bytes)
    }
}

impl Mailbox for GmailMailbox {
    async fn search(&self, query: &InboxQuery) -> Result<Vec<RetrievedMessage>> {
        let access_token = self.access_token().await?;
        let q = search_expression(query);
        poll_within(query.wait, self.config.poll_interval, || {
            self.lookup(&access_token, &q, query.include_body)
        })
        .await
    }
}

/// Gmail search syntax for a query; newest messages come first
fn search_expression(query: &InboxQuery) -> String {
    let mut q = format!("in:inbox to:{}", query.to);
    if let Some(from) = &query.from {
        q.push_str(&format!(" from:{}", quote(from)));
    }
    if let Some(subject) = &query.subject {
        q.push_str(&format!(" subject:{}", quote(subject)));
    }
    q
}

fn quote(term: &str) -> String {
    format!("\"{}\"", term.replace('"', ""))
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        ExtractError::Configuration(format!("cannot read {}: {e}", path.display()))
    })?;
    Ok(serde_json::from_str(&content)?)
}

async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ExtractError::Mailbox(format!("unexpected status {status}: {body}")))
}
