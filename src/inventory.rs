//! Mailbox inventory over IMAP
//!
//! [`MailboxInventory`] walks a single account: it lists folders and
//! reads every message of a folder into a map keyed by Message-ID, so
//! the result can be compared against another server after migration.

use crate::config::ImapConfig;
use crate::connection::{self, ImapClient, ImapSession};
use crate::error::{Error, ErrorKind, Result};
use crate::folder::MailboxFolder;
use crate::message::{MessageRecord, extract_message_id};
use async_imap::error::Error as ImapError;
use async_imap::imap_proto::{Response, Status};
use futures::StreamExt;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use tracing::{debug, info, warn};

/// Messages of one mailbox, keyed by Message-ID.
pub type MessageMap = BTreeMap<String, MessageRecord>;

/// Where an inventory session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Disconnected,
    Connected,
    Authenticated,
    Selected,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Authenticated => "authenticated",
            Self::Selected => "selected",
        };
        f.write_str(name)
    }
}

enum State {
    Disconnected,
    Connected(ImapClient),
    Authenticated(ImapSession),
    Selected { session: ImapSession, mailbox: String },
}

/// Stateful IMAP client for listing folders and messages.
pub struct MailboxInventory {
    config: ImapConfig,
    state: State,
}

impl MailboxInventory {
    #[must_use]
    pub const fn new(config: ImapConfig) -> Self {
        Self {
            config,
            state: State::Disconnected,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ImapConfig {
        &self.config
    }

    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        match self.state {
            State::Disconnected => SessionStatus::Disconnected,
            State::Connected(_) => SessionStatus::Connected,
            State::Authenticated(_) => SessionStatus::Authenticated,
            State::Selected { .. } => SessionStatus::Selected,
        }
    }

    /// The currently selected mailbox, if any.
    #[must_use]
    pub fn selected_mailbox(&self) -> Option<&str> {
        match &self.state {
            State::Selected { mailbox, .. } => Some(mailbox),
            _ => None,
        }
    }

    /// Open the connection if none is open.
    ///
    /// # Errors
    ///
    /// Returns an `Io` or `Tls` error if the connection cannot be made.
    pub async fn connect(&mut self) -> Result<()> {
        if matches!(self.state, State::Disconnected) {
            self.state = State::Connected(connection::connect(&self.config).await?);
        } else {
            debug!("Already connected ({})", self.status());
        }
        Ok(())
    }

    /// Log in, falling back to the configured credentials.
    ///
    /// An existing session is logged out first.
    ///
    /// # Errors
    ///
    /// Returns a `Login` error carrying the server's reason if the
    /// server rejects the credentials, or the connection error.
    pub async fn login(&mut self, username: Option<&str>, password: Option<&str>) -> Result<()> {
        let username = username.unwrap_or(&self.config.username).to_string();
        let password = password.unwrap_or(&self.config.password).to_string();

        if matches!(self.state, State::Authenticated(_) | State::Selected { .. }) {
            self.logout().await?;
        }
        self.connect().await?;

        let State::Connected(client) = std::mem::replace(&mut self.state, State::Disconnected)
        else {
            return Err(Error::new(ErrorKind::Imap, "Connection was not established"));
        };

        match client.login(&username, &password).await {
            Ok(session) => {
                info!("Logged in as {}", username);
                self.state = State::Authenticated(session);
                Ok(())
            }
            Err((e, client)) => {
                self.state = State::Connected(client);
                let reason = match &e {
                    ImapError::No(reason) | ImapError::Bad(reason) => reason.trim().to_string(),
                    other => other.to_string(),
                };
                Err(Error::new(ErrorKind::Login, format!("Login failed: {reason}"))
                    .with_source(e)
                    .with_text("username", username))
            }
        }
    }

    /// Log out and close the connection. Does nothing when disconnected.
    ///
    /// # Errors
    ///
    /// Returns an `Imap` error if the server rejects LOGOUT. The
    /// connection is dropped either way.
    pub async fn logout(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Disconnected) {
            State::Authenticated(mut session) | State::Selected { mut session, .. } => {
                session.logout().await.map_err(|e| {
                    Error::new(ErrorKind::Imap, format!("Logout failed: {e}")).with_source(e)
                })?;
                info!("Logged out");
            }
            State::Connected(_) | State::Disconnected => {}
        }
        Ok(())
    }

    fn session_mut(&mut self) -> Result<&mut ImapSession> {
        match &mut self.state {
            State::Authenticated(session) | State::Selected { session, .. } => Ok(session),
            State::Connected(_) | State::Disconnected => Err(not_authenticated()),
        }
    }

    /// Every folder the server lists for `LIST "" "*"`.
    ///
    /// Each untagged `* LIST` response is parsed from its raw line; lines
    /// that do not parse are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` without a session, or an `Imap` error
    /// if the LIST command fails or the connection drops mid-listing.
    pub async fn list_folders(&mut self) -> Result<Vec<MailboxFolder>> {
        let session = self.session_mut()?;
        let tag = session
            .run_command("LIST \"\" \"*\"")
            .await
            .map_err(|e| list_error(&e).with_source(e))?;

        let mut folders = Vec::new();
        loop {
            let response = session
                .read_response()
                .await
                .map_err(|e| list_error(&e).with_source(e))?
                .ok_or_else(|| Error::new(ErrorKind::Imap, "Connection closed during LIST"))?;

            if response.request_id() == Some(&tag) {
                if let Response::Done {
                    status,
                    information,
                    ..
                } = response.parsed()
                    && *status != Status::Ok
                {
                    let reason = information.as_deref().unwrap_or_default();
                    return Err(list_error(&format!("{status:?} {reason}")));
                }
                break;
            }

            let raw = first_line(response.borrow_owner());
            let line: &str = &raw;
            if !line.starts_with("* LIST ") {
                debug!("Ignoring response during LIST: {}", line);
                continue;
            }
            match MailboxFolder::parse(line) {
                Some(folder) => folders.push(folder),
                None => warn!("Skipping unparseable LIST line: {}", line),
            }
        }

        info!("Found {} folders", folders.len());
        Ok(folders)
    }

    /// SELECT `mailbox`.
    ///
    /// On failure the session stays authenticated with no mailbox
    /// selected.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` without a session, or `MailboxSelect`
    /// if the server rejects the mailbox.
    pub async fn select(&mut self, mailbox: &str) -> Result<()> {
        let mut session = match std::mem::replace(&mut self.state, State::Disconnected) {
            State::Authenticated(session) | State::Selected { session, .. } => session,
            other => {
                self.state = other;
                return Err(not_authenticated());
            }
        };

        match session.select(mailbox).await {
            Ok(info) => {
                debug!("Selected {} ({} messages)", mailbox, info.exists);
                self.state = State::Selected {
                    session,
                    mailbox: mailbox.to_string(),
                };
                Ok(())
            }
            Err(e) => {
                self.state = State::Authenticated(session);
                Err(Error::new(
                    ErrorKind::MailboxSelect,
                    format!("Unable to select mailbox \"{mailbox}\": {e}"),
                )
                .with_source(e)
                .with_text("mailbox", mailbox))
            }
        }
    }

    /// Read every message of a mailbox, keyed by Message-ID.
    ///
    /// With `mailbox` set the mailbox is selected first; without it the
    /// currently selected mailbox is used. Messages are fetched one by
    /// one in ascending UID order. A message that cannot be fetched or
    /// has no Message-ID is skipped with a warning, unless the config is
    /// strict. On duplicate Message-IDs the first message wins.
    ///
    /// # Errors
    ///
    /// Returns `NoMailboxSelected` if no mailbox is given or selected,
    /// `MailboxSelect` if selection fails, an `Imap` error if the search
    /// fails, and in strict mode the first per-message failure.
    pub async fn enumerate_messages(&mut self, mailbox: Option<&str>) -> Result<MessageMap> {
        if let Some(mailbox) = mailbox {
            self.select(mailbox).await?;
        }
        let strict = self.config.strict;
        let State::Selected { session, mailbox } = &mut self.state else {
            return Err(Error::new(
                ErrorKind::NoMailboxSelected,
                "No mailbox given and none selected",
            ));
        };

        let mut uids: Vec<u32> = session
            .uid_search("ALL")
            .await
            .map_err(|e| Error::new(ErrorKind::Imap, format!("Search failed: {e}")).with_source(e))?
            .into_iter()
            .collect();
        uids.sort_unstable();
        info!("Fetching {} messages from {}", uids.len(), mailbox);

        let mut messages = MessageMap::new();
        for uid in uids {
            let record = fetch_body(session, uid).await.and_then(|raw| {
                let message_id = extract_message_id(&raw).ok_or_else(|| {
                    Error::new(ErrorKind::Imap, format!("Message UID {uid} has no Message-ID"))
                })?;
                Ok(MessageRecord {
                    handle: uid,
                    message_id,
                    raw,
                })
            });

            let record = match record {
                Ok(record) => record,
                Err(e) if strict => return Err(e.with_text("mailbox", mailbox.as_str())),
                Err(e) => {
                    warn!("Skipping UID {} in {}: {}", uid, mailbox, e);
                    continue;
                }
            };

            match messages.entry(record.message_id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                Entry::Occupied(first) => warn!(
                    "Duplicate Message-ID {} in {} (UID {} kept, UID {} ignored)",
                    first.key(),
                    mailbox,
                    first.get().handle,
                    record.handle
                ),
            }
        }

        Ok(messages)
    }

    /// Enumerate every selectable folder, keyed by folder name.
    ///
    /// A folder that cannot be enumerated is skipped with a warning,
    /// unless the config is strict.
    ///
    /// # Errors
    ///
    /// Returns the LIST error, and in strict mode the first folder
    /// failure.
    pub async fn inventory_all(&mut self) -> Result<BTreeMap<String, MessageMap>> {
        let folders = self.list_folders().await?;
        let mut inventory = BTreeMap::new();

        for folder in folders.iter().filter(|f| f.is_selectable()) {
            match self.enumerate_messages(Some(&folder.name)).await {
                Ok(messages) => {
                    inventory.insert(folder.name.clone(), messages);
                }
                Err(e) if self.config.strict => return Err(e),
                Err(e) => warn!("Skipping folder {}: {}", folder.name, e),
            }
        }

        Ok(inventory)
    }
}

/// The first line of a raw response. The buffer backing a parsed
/// response may also hold bytes of the responses that follow it.
fn first_line(raw: &[u8]) -> Cow<'_, str> {
    let end = raw.iter().position(|&b| b == b'\n').unwrap_or(raw.len());
    let line = raw[..end].strip_suffix(b"\r").unwrap_or(&raw[..end]);
    String::from_utf8_lossy(line)
}

fn list_error(cause: &impl fmt::Display) -> Error {
    Error::new(ErrorKind::Imap, format!("List folders failed: {cause}"))
}

fn not_authenticated() -> Error {
    Error::new(ErrorKind::NotAuthenticated, "Not logged in to the IMAP server")
}

async fn fetch_body(session: &mut ImapSession, uid: u32) -> Result<Vec<u8>> {
    let uid_set = uid.to_string();
    let mut fetches = session
        .uid_fetch(&uid_set, "(BODY.PEEK[])")
        .await
        .map_err(|e| Error::new(ErrorKind::Imap, format!("Fetch failed: {e}")).with_source(e))?;

    let mut body = None;
    while let Some(item) = fetches.next().await {
        let fetch = item
            .map_err(|e| Error::new(ErrorKind::Imap, format!("Fetch error: {e}")).with_source(e))?;
        if body.is_none() {
            body = fetch.body().map(<[u8]>::to_vec);
        }
    }
    drop(fetches);

    body.ok_or_else(|| Error::new(ErrorKind::Imap, format!("No body found for UID {uid}")))
}
