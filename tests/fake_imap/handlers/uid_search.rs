//! UID SEARCH command handler.
//!
//! Only the criteria the inventory sends are honoured: `ALL` matches
//! every UID in the selected folder, `UID <set>` matches the listed
//! UIDs. Anything else matches everything.
//!
//! The response format (RFC 3501 Section 7.2.5):
//!
//! ```text
//! * SEARCH 1 2 3
//! A0003 OK SEARCH completed
//! ```

use crate::fake_imap::io::{complete, write_line};
use crate::fake_imap::mailbox::{Mailbox, TestEmail};
use imap_codec::imap_types::search::SearchKey;
use imap_codec::imap_types::sequence::{SeqOrUid, Sequence};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle the UID SEARCH command. Returns matching UIDs from the
/// selected folder, in folder order.
pub async fn handle_uid_search<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    criteria: &[SearchKey<'_>],
    mailbox: &Mailbox,
    selected_folder: Option<&str>,
    stream: &mut BufReader<S>,
) {
    let Some(folder) = selected_folder.and_then(|name| mailbox.get_folder(name)) else {
        complete(stream, tag, "BAD No folder selected").await;
        return;
    };

    let uids: Vec<String> = folder
        .emails
        .iter()
        .filter(|e| criteria.iter().all(|key| matches_key(e, key)))
        .map(|e| e.uid.to_string())
        .collect();

    // An empty result is still "* SEARCH\r\n".
    let search_line = if uids.is_empty() {
        "* SEARCH\r\n".to_string()
    } else {
        format!("* SEARCH {}\r\n", uids.join(" "))
    };
    let _ = write_line(stream, &search_line).await;
    complete(stream, tag, "OK SEARCH completed").await;
}

fn matches_key(email: &TestEmail, key: &SearchKey<'_>) -> bool {
    match key {
        SearchKey::Uid(set) => set.0.as_ref().iter().any(|seq| match seq {
            Sequence::Single(SeqOrUid::Value(v)) => v.get() == email.uid,
            Sequence::Single(SeqOrUid::Asterisk) => true,
            Sequence::Range(a, b) => {
                let bound = |s: &SeqOrUid| match s {
                    SeqOrUid::Value(v) => v.get(),
                    SeqOrUid::Asterisk => u32::MAX,
                };
                let (lo, hi) = (bound(a).min(bound(b)), bound(a).max(bound(b)));
                (lo..=hi).contains(&email.uid)
            }
        }),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;

    async fn run(criteria: &[SearchKey<'_>], mailbox: &Mailbox, selected: Option<&str>) -> String {
        let (client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);

        handle_uid_search("A1", criteria, mailbox, selected, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn all_includes_unfetchable_uids() {
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .message(3, b"Subject: a\r\n\r\n")
            .missing(7)
            .message(1, b"Subject: b\r\n\r\n")
            .build();

        let output = run(&[SearchKey::All], &mailbox, Some("INBOX")).await;

        assert_eq!(output, "* SEARCH 3 7 1\r\nA1 OK SEARCH completed\r\n");
    }

    #[tokio::test]
    async fn empty_folder_returns_empty_search() {
        let mailbox = MailboxBuilder::new().folder("INBOX").build();
        let output = run(&[SearchKey::All], &mailbox, Some("INBOX")).await;
        assert!(output.starts_with("* SEARCH\r\n"));
    }

    #[tokio::test]
    async fn no_folder_selected_returns_bad() {
        let mailbox = MailboxBuilder::new().folder("INBOX").build();
        let output = run(&[SearchKey::All], &mailbox, None).await;
        assert!(output.contains("A1 BAD No folder selected"));
    }
}
