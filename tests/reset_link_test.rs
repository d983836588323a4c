use chrono::Utc;
use mailbox_otp::*;

const TOKEN: &str = "Zx9_Kq2-Lm4Np6Rs8Tv0Wy1Ab3Cd5Ef7Gh9Ij2Kl";
const PHRASE: &str = "To reset your password, please visit the following link";

fn message(html: &str, text: &str) -> RetrievedMessage {
    RetrievedMessage {
        id: "reset-1".into(),
        sender: "Club <noreply@club.example>".into(),
        recipients: vec!["tester@example.com".into()],
        subject: "Reset Password Notification".into(),
        html_body: html.into(),
        text_body: text.into(),
        received_at: Utc::now(),
    }
}

/// Returns the same message for every query, like a provider with loose search
struct FixedMailbox(RetrievedMessage);

impl Mailbox for FixedMailbox {
    async fn search(&self, _query: &InboxQuery) -> Result<Vec<RetrievedMessage>> {
        Ok(vec![self.0.clone()])
    }
}

fn rules() -> ResetLinkRules {
    ResetLinkRules::with_defaults().unwrap()
}

#[test]
fn test_full_url_reproduced_exactly() {
    let url = format!("https://dev.club66.pro/reset-password/reset/{TOKEN}?email=user@example.com");
    let html = format!("<p>{PHRASE}:</p><a href=\"{url}\">Reset Password</a>");

    let link = rules().extract(&message(&html, "")).unwrap();

    assert_eq!(link.full_url, url);
    assert_eq!(link.token, TOKEN);
    assert_eq!(link.email, "user@example.com");
    assert!(link.full_url.contains(&link.token));
    assert!(link.full_url.contains(&link.email));
    assert!(link.is_consistent());
}

#[test]
fn test_full_url_found_in_text_when_html_has_none() {
    let text = format!("{PHRASE}: http://localhost:8000/reset-password/reset/{TOKEN}?email=a.b@example.org\n");
    let link = rules().extract(&message("<p>no link here</p>", &text)).unwrap();

    assert_eq!(
        link.full_url,
        format!("http://localhost:8000/reset-password/reset/{TOKEN}?email=a.b@example.org")
    );
}

#[test]
fn test_fallback_synthesizes_url() {
    let text = format!(
        "{PHRASE}: /reset-password/reset/{TOKEN}\n\
         Manage your account at https://club.example/account?email=user@example.com"
    );

    let link = rules().extract(&message("", &text)).unwrap();

    assert_eq!(
        link.full_url,
        format!("{DEFAULT_ORIGIN}{DEFAULT_PATH_FRAGMENT}{TOKEN}?email=user@example.com")
    );
    assert_eq!(link.token, TOKEN);
    assert_eq!(link.email, "user@example.com");
    assert!(link.is_consistent());
}

#[test]
fn test_fallback_uses_configured_origin() {
    let rules = ResetLinkRules::new("https://staging.example/", "/reset-password/reset/", PHRASE)
        .unwrap();
    let html = format!("{PHRASE} <span>/reset-password/reset/{TOKEN}</span> <i>?email=x@y.z</i>");

    let link = rules.extract(&message(&html, "")).unwrap();

    assert_eq!(
        link.full_url,
        format!("https://staging.example/reset-password/reset/{TOKEN}?email=x@y.z")
    );
}

#[test]
fn test_missing_phrase_is_validation_error() {
    let html = format!(
        "<a href=\"https://dev.club66.pro/reset-password/reset/{TOKEN}?email=user@example.com\">Reset</a>"
    );
    let err = rules().extract(&message(&html, "")).unwrap_err();
    assert!(matches!(err, ExtractError::Validation(_)));
}

#[test]
fn test_phrase_match_is_case_insensitive() {
    let text = format!(
        "{}: https://dev.club66.pro/reset-password/reset/{TOKEN}?email=user@example.com",
        PHRASE.to_uppercase()
    );
    assert!(rules().extract(&message("", &text)).is_ok());
}

#[test]
fn test_soft_line_break_inside_token() {
    let (head, tail) = TOKEN.split_at(20);
    let html = format!(
        "<p>{PHRASE}</p>\r\n<a href=3D\"https://dev.club66.pro/reset-password/reset/{head}=\r\n{tail}?email=user@example.com\">Reset</a>"
    );

    let link = rules().extract(&message(&html, "")).unwrap();

    assert_eq!(link.token, TOKEN);
    assert_eq!(link.token.len(), 40);
    assert_eq!(
        link.full_url,
        format!("https://dev.club66.pro/reset-password/reset/{TOKEN}?email=user@example.com")
    );
}

#[test]
fn test_lowercase_hex_in_email_survives_decoding() {
    let html = format!(
        "<p>{PHRASE}</p>\r\n<a href=3D\"https://dev.club66.pro/reset-password/reset/{TOKEN}?email=deb.fa@example.com\">Reset</a>"
    );

    let link = rules().extract(&message(&html, "")).unwrap();

    assert_eq!(link.email, "deb.fa@example.com");
    assert_eq!(
        link.full_url,
        format!("https://dev.club66.pro/reset-password/reset/{TOKEN}?email=deb.fa@example.com")
    );
}

#[test]
fn test_html_escaped_query_string() {
    let html = format!(
        "{PHRASE} <a href=&quot;https://dev.club66.pro/reset-password/reset/{TOKEN}?email=user@example.com&amp;utm_source=mail&quot;>go</a>"
    );

    let link = rules().extract(&message(&html, "")).unwrap();

    assert_eq!(link.email, "user@example.com");
    assert!(!link.full_url.contains("utm_source"));
}

#[test]
fn test_short_token_not_accepted() {
    let text = format!("{PHRASE}: https://dev.club66.pro/reset-password/reset/abc123?email=user@example.com");
    let err = rules().extract(&message("", &text)).unwrap_err();

    match err {
        ExtractError::ResetLinkNotFound { html, text } => {
            assert!(html.is_empty());
            assert!(text.contains("abc123"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_not_found_body_excerpt_is_bounded() {
    let text = format!("{PHRASE}\n{}", "x".repeat(2000));
    match rules().extract(&message("", &text)).unwrap_err() {
        ExtractError::ResetLinkNotFound { text, .. } => assert_eq!(text.chars().count(), 500),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_extract_reset_link_requires_sender() {
    let mailbox = InMemoryMailbox::new();
    let extractor = MailExtractor::new(mailbox, rules());
    let criteria = MailSearchCriteria::new("tester@example.com").max_wait_secs(0);

    let err = tokio_test::block_on(extractor.extract_reset_link(&criteria)).unwrap_err();
    assert!(matches!(err, ExtractError::Configuration(_)));
}

#[test]
fn test_extract_reset_link_from_mailbox() {
    let mailbox = InMemoryMailbox::new();
    let html = format!(
        "<p>{PHRASE}:</p><a href=\"https://dev.club66.pro/reset-password/reset/{TOKEN}?email=tester@example.com\">Reset</a>"
    );
    mailbox.deliver(message(&html, ""));

    let extractor = MailExtractor::new(mailbox, rules());
    let criteria = MailSearchCriteria::new("tester@example.com")
        .from_sender("NOREPLY@club.example")
        .subject_contains("reset password")
        .max_wait_secs(0);
    let link = tokio_test::block_on(extractor.extract_reset_link(&criteria)).unwrap();

    assert_eq!(link.token, TOKEN);
    assert_eq!(link.email, "tester@example.com");
}

#[test]
fn test_extract_reset_link_requires_subject() {
    let extractor = MailExtractor::new(InMemoryMailbox::new(), rules());
    let criteria = MailSearchCriteria::new("tester@example.com")
        .from_sender("noreply@club.example")
        .max_wait_secs(0);

    let err = tokio_test::block_on(extractor.extract_reset_link(&criteria)).unwrap_err();
    match err {
        ExtractError::Configuration(message) => assert!(message.contains("subject")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_subject_mismatch_is_validation_error() {
    let html = format!(
        "<p>{PHRASE}:</p><a href=\"https://dev.club66.pro/reset-password/reset/{TOKEN}?email=tester@example.com\">Reset</a>"
    );
    let mut newsletter = message(&html, "");
    newsletter.subject = "Weekly newsletter".into();

    let extractor = MailExtractor::new(FixedMailbox(newsletter), rules());
    let criteria = MailSearchCriteria::new("tester@example.com")
        .from_sender("noreply@club.example")
        .subject_contains("Reset Password")
        .max_wait_secs(0);

    let err = tokio_test::block_on(extractor.extract_reset_link(&criteria)).unwrap_err();
    match err {
        ExtractError::Validation(message) => assert!(message.contains("Weekly newsletter")),
        other => panic!("unexpected error: {other}"),
    }
}
