//! IMAP mailbox attributes
//!
//! Provides a strongly-typed enum for the name attributes returned in
//! `LIST` responses instead of raw strings. Attributes defined by
//! RFC 3501 and RFC 3348 have dedicated variants; anything else uses
//! the `Extension` variant.

use std::fmt;

/// A mailbox name attribute from a `LIST` response.
///
/// # Examples
///
/// ```
/// use mailmigrate::FolderAttribute;
///
/// assert_eq!(FolderAttribute::from("\\Noselect"), FolderAttribute::NoSelect);
/// assert_eq!(FolderAttribute::NoSelect.as_imap_str(), "\\Noselect");
///
/// let ext = FolderAttribute::from("\\Sent");
/// assert_eq!(ext.as_imap_str(), "\\Sent");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FolderAttribute {
    /// No child mailboxes can be created (`\Noinferiors`).
    NoInferiors,
    /// The name is a hierarchy placeholder and cannot be selected (`\Noselect`).
    NoSelect,
    /// The mailbox does not exist (`\NonExistent`).
    NonExistent,
    /// The mailbox has new messages (`\Marked`).
    Marked,
    /// The mailbox has no new messages (`\Unmarked`).
    Unmarked,
    /// The mailbox has child mailboxes (`\HasChildren`).
    HasChildren,
    /// The mailbox has no child mailboxes (`\HasNoChildren`).
    HasNoChildren,
    /// Any other attribute, kept verbatim.
    Extension(String),
}

impl FolderAttribute {
    /// The IMAP wire representation of this attribute.
    #[must_use]
    pub fn as_imap_str(&self) -> &str {
        match self {
            Self::NoInferiors => "\\Noinferiors",
            Self::NoSelect => "\\Noselect",
            Self::NonExistent => "\\NonExistent",
            Self::Marked => "\\Marked",
            Self::Unmarked => "\\Unmarked",
            Self::HasChildren => "\\HasChildren",
            Self::HasNoChildren => "\\HasNoChildren",
            Self::Extension(raw) => raw,
        }
    }

    /// Whether a folder with this attribute can be selected.
    #[must_use]
    pub const fn prevents_select(&self) -> bool {
        matches!(self, Self::NoSelect | Self::NonExistent)
    }
}

impl From<&str> for FolderAttribute {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "\\noinferiors" => Self::NoInferiors,
            "\\noselect" => Self::NoSelect,
            "\\nonexistent" => Self::NonExistent,
            "\\marked" => Self::Marked,
            "\\unmarked" => Self::Unmarked,
            "\\haschildren" => Self::HasChildren,
            "\\hasnochildren" => Self::HasNoChildren,
            _ => Self::Extension(s.to_string()),
        }
    }
}

impl fmt::Display for FolderAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_imap_str())
    }
}
