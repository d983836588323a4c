//! Raw RFC 5322 message parsing

use crate::error::{ExtractError, Result};
use crate::types::RetrievedMessage;
use chrono::{DateTime, Utc};
use mailparse::{MailHeader, MailHeaderMap, ParsedMail};
use tracing::debug;

/// Parse raw message bytes into a `RetrievedMessage`
pub fn parse_message(id: impl Into<String>, raw: &[u8]) -> Result<RetrievedMessage> {
    let parsed = mailparse::parse_mail(raw).map_err(|e| ExtractError::Parse(e.to_string()))?;

    let sender = parsed
        .headers
        .get_first_value("From")
        .ok_or_else(|| ExtractError::Parse("missing From header".into()))?;
    let recipients = extract_recipients(&parsed.headers);
    let subject = parsed
        .headers
        .get_first_value("Subject")
        .unwrap_or_default();
    let received_at = extract_date(&parsed.headers);

    debug!("Parsed message: {} from {}", subject, sender);

    let mut message = RetrievedMessage {
        id: id.into(),
        sender,
        recipients,
        subject,
        html_body: String::new(),
        text_body: String::new(),
        received_at,
    };
    fill_bodies(&parsed, true, &mut message);
    Ok(message)
}

fn extract_recipients(headers: &[MailHeader]) -> Vec<String> {
    headers
        .get_all_values("To")
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(str::to_string)
        .collect()
}

fn extract_date(headers: &[MailHeader]) -> DateTime<Utc> {
    headers
        .get_first_value("Date")
        .and_then(|value| DateTime::parse_from_rfc2822(&value).ok())
        .map_or_else(Utc::now, |dt| dt.with_timezone(&Utc))
}

/// Keep the first HTML and first plain-text leaf; a lone non-HTML part counts as text
fn fill_bodies(part: &ParsedMail, single_part: bool, message: &mut RetrievedMessage) {
    if !part.subparts.is_empty() {
        for sub in &part.subparts {
            fill_bodies(sub, false, message);
        }
        return;
    }

    let Ok(body) = part.get_body() else {
        return;
    };
    let mimetype = part.ctype.mimetype.to_lowercase();
    if mimetype.contains("text/html") {
        if message.html_body.is_empty() {
            message.html_body = body;
        }
    } else if (single_part || mimetype.contains("text/plain")) && message.text_body.is_empty() {
        message.text_body = body;
    }
}
