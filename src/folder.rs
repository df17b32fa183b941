//! IMAP folder listing types
//!
//! Parses the untagged `LIST` lines returned by `LIST "" "*"` into
//! [`MailboxFolder`] values.

use crate::attribute::FolderAttribute;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

static LIST_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:\* LIST )?\(([^)]*)\)\s+("(?:[^"\\]|\\.)*"|NIL)\s+"((?:[^"\\]|\\.)*)"$"#)
        .expect("valid LIST regex")
});

/// One folder from a `LIST` response.
///
/// # Examples
///
/// ```
/// use mailmigrate::MailboxFolder;
///
/// let folder = MailboxFolder::parse(r#"(\HasNoChildren) "/" "INBOX/Sent""#).unwrap();
/// assert_eq!(folder.name, "INBOX/Sent");
/// assert_eq!(folder.delimiter.as_deref(), Some("/"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailboxFolder {
    #[serde(serialize_with = "attributes_as_strings")]
    pub attributes: Vec<FolderAttribute>,
    /// Hierarchy delimiter, `None` for a flat namespace (`NIL`).
    pub delimiter: Option<String>,
    pub name: String,
}

impl MailboxFolder {
    /// Parse one `LIST` line, with or without the `* LIST ` prefix.
    ///
    /// Returns `None` if the line does not have the expected shape.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let caps = LIST_LINE.captures(line.trim_end_matches(['\r', '\n']))?;

        let attributes = caps[1]
            .split_whitespace()
            .map(FolderAttribute::from)
            .collect();
        let delimiter = match &caps[2] {
            "NIL" => None,
            quoted => Some(unquote(&quoted[1..quoted.len() - 1])),
        };

        Some(Self {
            attributes,
            delimiter,
            name: unquote(&caps[3]),
        })
    }

    /// Whether the folder can be selected.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        !self.attributes.iter().any(FolderAttribute::prevents_select)
    }

    #[must_use]
    pub fn has_attribute(&self, attribute: &FolderAttribute) -> bool {
        self.attributes.contains(attribute)
    }
}

impl fmt::Display for MailboxFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn unquote(quoted: &str) -> String {
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn attributes_as_strings<S: serde::Serializer>(
    attributes: &[FolderAttribute],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(attributes.iter().map(FolderAttribute::as_imap_str))
}
