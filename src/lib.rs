// Enforce at crate level
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Mailbox OTP and reset-link extraction
//!
//! Polls a mailbox for a verification email and pulls out either a 4-digit
//! one-time passcode or a password-reset token and link.
//!
//! # Features
//!
//! - Three-stage polling ladder that tells "no mail at all" apart from
//!   "mail present but not matching"
//! - Ordered OTP strategies: heading, trigger phrase, standalone digits
//! - Reset links recovered through quoted-printable folding and HTML escaping
//! - Gmail REST API and in-memory mailboxes
//!
//! # Example
//!
//! ```rust
//! use mailbox_otp::{InMemoryMailbox, MailExtractor, MailSearchCriteria, ResetLinkRules};
//!
//! # tokio_test::block_on(async {
//! let mailbox = InMemoryMailbox::new();
//! let extractor = MailExtractor::new(mailbox, ResetLinkRules::with_defaults().unwrap());
//!
//! let criteria = MailSearchCriteria::new("tester@example.com")
//!     .from_sender("noreply@club.example")
//!     .max_wait_secs(0);
//! let err = extractor.extract_otp(&criteria).await.unwrap_err();
//! assert!(err.is_not_found());
//! # });
//! ```

mod config;
mod decode;
mod error;
mod extractor;
pub mod mailbox;
mod otp;
mod parser;
mod reset_link;
mod types;

pub use config::*;
pub use decode::normalize_body;
pub use error::{ExtractError, Result};
pub use extractor::MailExtractor;
pub use mailbox::{GmailConfig, GmailMailbox, InMemoryMailbox, InboxQuery, Mailbox, fetch_latest};
pub use otp::extract_otp;
pub use parser::parse_message;
pub use reset_link::{
    DEFAULT_ORIGIN, DEFAULT_PATH_FRAGMENT, DEFAULT_REQUIRED_PHRASE, ResetLinkRules,
};
pub use types::*;
