//! Typed records decoded from admin service documents

use super::document::{Node, ParsedDocument};
use crate::error::{Error, ErrorKind, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Settings requested by [`AdminClient::get_user`](super::AdminClient::get_user).
pub const DEFAULT_USER_SETTINGS: [&str; 6] = [
    "isenabled",
    "password",
    "isdomainadmin",
    "enableimapretrieval",
    "displayname",
    "fullname",
];

/// One user's fields, keyed by lower-case field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UserRecord {
    fields: BTreeMap<String, String>,
}

impl UserRecord {
    #[must_use]
    pub fn username(&self) -> &str {
        self.get("username").unwrap_or_default()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    #[must_use]
    pub const fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Merge extra settings into the record, replacing existing keys.
    pub fn merge(&mut self, settings: BTreeMap<String, String>) {
        self.fields.extend(settings);
    }
}

impl FromIterator<(String, String)> for UserRecord {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// How [`AdminClient::list_domain_users`](super::AdminClient::list_domain_users)
/// builds its result.
#[derive(Debug, Clone)]
pub struct UserQuery {
    /// Key users by `user@domain` instead of the bare username.
    pub qualify_addresses: bool,
    /// Settings fetched per user and merged into each record.
    pub extra_settings: Vec<String>,
    /// Abort the whole listing if any per-user lookup fails.
    pub require_extra_info: bool,
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            qualify_addresses: true,
            extra_settings: Vec::new(),
            require_extra_info: false,
        }
    }
}

fn shape_error(doc: &ParsedDocument, message: String) -> Error {
    let mut err = Error::new(ErrorKind::ResponseShape, message);
    if let Some(service_message) = doc.find("message").map(Node::text).filter(|m| !m.is_empty()) {
        err = err.with_text("service_message", service_message);
    }
    err.with_text("document", doc.raw())
}

fn container<'a>(doc: &'a ParsedDocument, name: &str) -> Result<&'a Node> {
    doc.find(name).ok_or_else(|| {
        shape_error(doc, format!("Response has no <{name}> element"))
    })
}

/// Domain names listed under `<domainnames>`, trimmed and lower-cased.
///
/// # Errors
///
/// Returns a `ResponseShape` error if the container is missing.
pub fn decode_domain_names(doc: &ParsedDocument) -> Result<Vec<String>> {
    let names = container(doc, "domainnames")?
        .children()
        .iter()
        .filter(|node| node.name() == "string")
        .map(|node| node.text().trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect();
    Ok(names)
}

/// Users listed as `<userinfo>` elements under `<users>`.
///
/// # Errors
///
/// Returns a `ResponseShape` error if the container is missing or a
/// user has no `username` field.
pub fn decode_users(doc: &ParsedDocument) -> Result<Vec<UserRecord>> {
    let mut users = Vec::new();
    for info in container(doc, "users")?.find_all("userinfo") {
        let record: UserRecord = info
            .children()
            .iter()
            .map(|field| (field.name().to_string(), field.text().trim().to_string()))
            .collect();
        if record.get("username").is_none_or(str::is_empty) {
            return Err(shape_error(doc, "User entry without a username".to_string()));
        }
        users.push(record);
    }
    Ok(users)
}

/// `KEY=VALUE` leaves under `<settingvalues>`, keys lower-cased.
///
/// # Errors
///
/// Returns a `ResponseShape` error if the container is missing or a
/// leaf does not contain exactly one `=`.
pub fn decode_user_settings(doc: &ParsedDocument) -> Result<BTreeMap<String, String>> {
    let mut settings = BTreeMap::new();
    for leaf in container(doc, "settingvalues")?.children() {
        let text = leaf.text();
        let mut parts = text.split('=');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) => {
                settings.insert(key.trim().to_lowercase(), value.trim().to_string());
            }
            _ => {
                return Err(shape_error(doc, format!("Malformed setting value: \"{text}\"")));
            }
        }
    }
    Ok(settings)
}
