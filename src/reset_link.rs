//! Password-reset link extraction

use crate::decode::normalize_body;
use crate::error::{ExtractError, Result};
use crate::types::{ResetLink, RetrievedMessage};
use regex::Regex;
use tracing::{debug, info};

/// Origin used when the link has to be rebuilt from its parts
pub const DEFAULT_ORIGIN: &str = "https://dev.club66.pro";

/// Path segment preceding the token
pub const DEFAULT_PATH_FRAGMENT: &str = "/reset-password/reset/";

/// Sentence every genuine reset email contains
pub const DEFAULT_REQUIRED_PHRASE: &str =
    "To reset your password, please visit the following link";

const EXCERPT_CHARS: usize = 500;

static EMAIL_PARAM_REGEX: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r#"(?i)[?&]email=([^&\s"'<>]+)"#).unwrap());

/// How reset links look in a particular application's emails
#[derive(Debug, Clone)]
pub struct ResetLinkRules {
    origin: String,
    path_fragment: String,
    required_phrase: String,
    full_url: Regex,
    token_only: Regex,
}

impl ResetLinkRules {
    pub fn new(
        origin: impl Into<String>,
        path_fragment: impl Into<String>,
        required_phrase: impl Into<String>,
    ) -> Result<Self> {
        let origin = origin.into().trim_end_matches('/').to_string();
        let path_fragment = path_fragment.into();
        let fragment = regex::escape(&path_fragment);

        let full_url = Regex::new(&format!(
            r#"(?i)(https?://[^\s"'<>]+{fragment}([A-Za-z0-9_-]{{40}})\?email=([^\s"'<>&]+))"#
        ))
        .map_err(|e| ExtractError::Configuration(format!("reset link pattern: {e}")))?;
        let token_only = Regex::new(&format!(r"(?i){fragment}([A-Za-z0-9_-]{{40}})"))
            .map_err(|e| ExtractError::Configuration(format!("reset token pattern: {e}")))?;

        Ok(Self {
            origin,
            path_fragment,
            required_phrase: required_phrase.into(),
            full_url,
            token_only,
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(DEFAULT_ORIGIN, DEFAULT_PATH_FRAGMENT, DEFAULT_REQUIRED_PHRASE)
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    #[must_use]
    pub fn path_fragment(&self) -> &str {
        &self.path_fragment
    }

    /// Validate the body and extract the reset link
    pub fn extract(&self, message: &RetrievedMessage) -> Result<ResetLink> {
        self.check_required_phrase(message)?;

        let html = normalize_body(&message.html_body);
        let text = normalize_body(&message.text_body);

        if let Some(link) = self
            .from_full_url(&html)
            .or_else(|| self.from_full_url(&text))
        {
            info!("Extracted reset password data: {:?}", link);
            return Ok(link);
        }

        if let Some(link) = self.from_parts(&html, &text) {
            info!("Extracted reset password data (separate extraction): {:?}", link);
            return Ok(link);
        }

        let html = excerpt(&html);
        let text = excerpt(&text);
        debug!("Email content searched for reset link: html={:?} text={:?}", html, text);
        Err(ExtractError::ResetLinkNotFound { html, text })
    }

    fn check_required_phrase(&self, message: &RetrievedMessage) -> Result<()> {
        let combined = format!("{}\n{}", message.html_body, message.text_body).to_lowercase();
        if combined.contains(&self.required_phrase.to_lowercase()) {
            Ok(())
        } else {
            Err(ExtractError::Validation(format!(
                "email body does not contain {:?}",
                self.required_phrase
            )))
        }
    }

    fn from_full_url(&self, content: &str) -> Option<ResetLink> {
        let cap = self.full_url.captures(content)?;
        Some(ResetLink {
            full_url: cap.get(1)?.as_str().to_string(),
            token: cap.get(2)?.as_str().to_string(),
            email: cap.get(3)?.as_str().to_string(),
        })
    }

    fn from_parts(&self, html: &str, text: &str) -> Option<ResetLink> {
        let token = first_capture(&self.token_only, html, text)?;
        let email = first_capture(&EMAIL_PARAM_REGEX, html, text)?;
        let full_url = format!("{}{}{}?email={}", self.origin, self.path_fragment, token, email);

        Some(ResetLink {
            token,
            email,
            full_url,
        })
    }
}

fn first_capture(regex: &Regex, html: &str, text: &str) -> Option<String> {
    [html, text]
        .into_iter()
        .find_map(|content| regex.captures(content)?.get(1))
        .map(|m| m.as_str().to_string())
}

fn excerpt(content: &str) -> String {
    let end = content
        .char_indices()
        .nth(EXCERPT_CHARS)
        .map_or(content.len(), |(idx, _)| idx);
    content[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let long = "é".repeat(600);
        let cut = excerpt(&long);
        assert_eq!(cut.chars().count(), EXCERPT_CHARS);
    }

    #[test]
    fn test_origin_trailing_slash_trimmed() {
        let rules = ResetLinkRules::new("https://app.example/", "/reset/", "reset").unwrap();
        assert_eq!(rules.origin(), "https://app.example");
    }

    #[test]
    fn test_fragment_is_matched_literally() {
        let rules = ResetLinkRules::new("https://app.example", "/a.b/", "reset").unwrap();
        let token = "t".repeat(40);
        let content = format!("https://x.example/aXb/{token}?email=a@b.c");
        assert!(rules.from_full_url(&content).is_none());
    }
}
