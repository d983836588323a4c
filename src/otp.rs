//! One-time passcode extraction

use crate::error::{ExtractError, Result};
use crate::types::{Otp, RetrievedMessage};
use regex::Regex;
use tracing::{debug, info};

// Codes are styled as a heading in OTP emails
static HEADING_REGEX: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"<h1[^>]*>([0-9]{4})</h1>").unwrap());

static PHRASE_REGEX: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"(?i)(?:code|OTP|password|verification)[^0-9]*([0-9]{4})").unwrap()
});

// ASCII word boundaries, so digits from other scripts never form a code
static STANDALONE_REGEX: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"(?-u:\b)([0-9]{4})(?-u:\b)").unwrap());

type Strategy = fn(&RetrievedMessage) -> Option<Otp>;

/// Strategies in precedence order; the first match wins
const STRATEGIES: &[(&str, Strategy)] = &[
    ("heading", from_heading),
    ("phrase", after_trigger_phrase),
    ("standalone", standalone_digits),
];

/// Extract the OTP from a message body
pub fn extract_otp(message: &RetrievedMessage) -> Result<Otp> {
    for (name, strategy) in STRATEGIES {
        if let Some(otp) = strategy(message) {
            info!("Found OTP via {} strategy: {}", name, otp);
            return Ok(otp);
        }
    }

    debug!(
        "Email content searched: html={:?} text={:?}",
        message.html_body, message.text_body
    );
    Err(ExtractError::OtpNotFound {
        html: message.html_body.clone(),
        text: message.text_body.clone(),
    })
}

fn from_heading(message: &RetrievedMessage) -> Option<Otp> {
    first_capture(&HEADING_REGEX, &message.html_body)
}

fn after_trigger_phrase(message: &RetrievedMessage) -> Option<Otp> {
    text_then_html(message, &PHRASE_REGEX)
}

fn standalone_digits(message: &RetrievedMessage) -> Option<Otp> {
    text_then_html(message, &STANDALONE_REGEX)
}

fn text_then_html(message: &RetrievedMessage, regex: &Regex) -> Option<Otp> {
    [&message.text_body, &message.html_body]
        .into_iter()
        .find_map(|content| first_capture(regex, content))
}

fn first_capture(regex: &Regex, content: &str) -> Option<Otp> {
    regex
        .captures(content)
        .and_then(|cap| cap.get(1))
        .and_then(|m| Otp::parse(m.as_str()))
}
