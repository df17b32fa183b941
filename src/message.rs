//! Fetched messages and Message-ID extraction

use regex::bytes::Regex;
use std::fmt;
use std::sync::LazyLock;

static MESSAGE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^message-id:[ \t]*(?:\r?\n[ \t]+)*<?([^\s<>]+)>?")
        .expect("valid Message-ID regex")
});

/// One message read from a mailbox.
#[derive(Clone, PartialEq, Eq)]
pub struct MessageRecord {
    /// The message UID within its mailbox.
    pub handle: u32,
    /// Message-ID without angle brackets.
    pub message_id: String,
    /// The full RFC 822 message.
    pub raw: Vec<u8>,
}

impl fmt::Debug for MessageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageRecord")
            .field("handle", &self.handle)
            .field("message_id", &self.message_id)
            .field("raw_len", &self.raw.len())
            .finish()
    }
}

/// The header block of a raw message (everything before the first
/// empty line).
fn header_block(raw: &[u8]) -> &[u8] {
    let crlf = raw.windows(4).position(|w| w == b"\r\n\r\n");
    let lf = raw.windows(2).position(|w| w == b"\n\n");
    let end = match (crlf, lf) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => raw.len(),
    };
    &raw[..end]
}

/// Extract the `Message-ID` header value, with angle brackets stripped.
///
/// Only the header block is searched. A value folded onto the next
/// line is still found.
#[must_use]
pub fn extract_message_id(raw: &[u8]) -> Option<String> {
    let caps = MESSAGE_ID.captures(header_block(raw))?;
    let id = String::from_utf8_lossy(&caps[1]).into_owned();
    (!id.is_empty()).then_some(id)
}
