//! Fake IMAP server for integration testing
//!
//! An in-process IMAP server that speaks enough of the protocol to
//! drive `MailboxInventory` end-to-end over plain TCP, STARTTLS or
//! implicit TLS.
//!
//! ## Module layout
//!
//! - `server` -- TCP listener, TLS setup, and command dispatch
//! - `handlers/` -- one file per IMAP command (LIST, SELECT, etc.)
//! - `mailbox` -- test data model (folders, messages, builder)
//! - `io` -- shared write helpers

#![allow(dead_code)]

mod handlers;
mod io;
mod server;

pub use mailbox::MailboxBuilder;
pub use server::{FakeImapServer, Transport};
