//! Mailbox migration client library
//!
//! Clients for the three remote surfaces involved in moving mail
//! between hosted servers:
//!
//! - [`AdminClient`] for a mail server's administration web services
//!   (domains, users, per-user settings), decoded from XML.
//! - [`RestClient`] for a hosted REST mail API, authenticated with a
//!   token issued by [`TokenClient`].
//! - [`MailboxInventory`] for walking an IMAP account and reading every
//!   message keyed by Message-ID.
//!
//! Every failure is an [`Error`] carrying a [`ErrorKind`], the cause,
//! and named diagnostics for post-mortem logging.

pub mod admin;
mod attribute;
mod config;
mod connection;
mod error;
mod folder;
mod http;
mod inventory;
mod message;
pub mod rest;

pub use admin::{AdminClient, Service, ServiceRequest, UserQuery, UserRecord};
pub use attribute::FolderAttribute;
pub use config::{Credentials, ImapConfig, ImapSecurity, RestConfig, parse_port};
pub use connection::{ImapClient, ImapSession, ImapStream, connect, tls_connector};
pub use error::{Diagnostic, Error, ErrorKind, Result};
pub use folder::MailboxFolder;
pub use http::{HttpResponse, Verb};
pub use inventory::{MailboxInventory, MessageMap, SessionStatus};
pub use message::{MessageRecord, extract_message_id};
pub use rest::{RestClient, RestClientBuilder, Token, TokenClient};
