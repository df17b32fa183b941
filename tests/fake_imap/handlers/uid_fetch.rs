//! UID FETCH command handler.
//!
//! Message bodies travel as **counted literals**:
//!
//! ```text
//! * <seq> FETCH (UID <uid> BODY[] {<length>}
//! <exactly length bytes of raw RFC 822 message>
//! )
//! ```
//!
//! The sequence number is the 1-based index of the message within the
//! folder, per RFC 3501 Section 7.4.2. UIDs without a body (see
//! `MailboxBuilder::missing`) produce no FETCH line at all.

use crate::fake_imap::io::{complete, write_bytes, write_line};
use crate::fake_imap::mailbox::Mailbox;
use imap_codec::imap_types::sequence::{SeqOrUid, Sequence, SequenceSet};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Extract UIDs from a `SequenceSet`. Only single values are
/// supported since the inventory fetches one UID at a time.
fn extract_uids(seq_set: &SequenceSet) -> Vec<u32> {
    seq_set
        .0
        .as_ref()
        .iter()
        .filter_map(|seq| match seq {
            Sequence::Single(SeqOrUid::Value(v)) => Some(v.get()),
            _ => None,
        })
        .collect()
}

/// Handle the UID FETCH command.
pub async fn handle_uid_fetch<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    sequence_set: &SequenceSet,
    mailbox: &Mailbox,
    selected_folder: Option<&str>,
    stream: &mut BufReader<S>,
) {
    let Some(folder) = selected_folder.and_then(|name| mailbox.get_folder(name)) else {
        complete(stream, tag, "BAD No folder selected").await;
        return;
    };

    for uid in extract_uids(sequence_set) {
        let found = folder
            .emails
            .iter()
            .enumerate()
            .find(|(_, e)| e.uid == uid);
        let Some((idx, email)) = found else {
            continue;
        };
        let Some(raw) = &email.raw else {
            continue;
        };

        let seq = idx + 1;
        let header = format!("* {seq} FETCH (UID {uid} BODY[] {{{}}}\r\n", raw.len());
        if write_line(stream, &header).await.is_err()
            || write_bytes(stream, raw).await.is_err()
            || write_line(stream, ")\r\n").await.is_err()
        {
            return;
        }
    }

    complete(stream, tag, "OK FETCH completed").await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;
    use std::num::NonZeroU32;

    fn uid_set(uid: u32) -> SequenceSet {
        SequenceSet(
            vec![Sequence::Single(SeqOrUid::Value(NonZeroU32::new(uid).unwrap()))]
                .try_into()
                .unwrap(),
        )
    }

    async fn run(sequence_set: &SequenceSet, mailbox: &Mailbox) -> String {
        let (client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);

        handle_uid_fetch("A1", sequence_set, mailbox, Some("INBOX"), &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn body_is_sent_as_literal() {
        let raw = b"Message-ID: <a@b>\r\n\r\nBody";
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .message(9, b"Subject: other\r\n\r\n")
            .message(42, raw)
            .build();

        let output = run(&uid_set(42), &mailbox).await;

        let expected = format!("* 2 FETCH (UID 42 BODY[] {{{}}}\r\n", raw.len());
        assert!(output.starts_with(&expected));
        assert!(output.contains("Message-ID: <a@b>"));
        assert!(output.ends_with(")\r\nA1 OK FETCH completed\r\n"));
    }

    #[tokio::test]
    async fn missing_body_returns_only_ok() {
        let mailbox = MailboxBuilder::new().folder("INBOX").missing(3).build();
        let output = run(&uid_set(3), &mailbox).await;
        assert_eq!(output, "A1 OK FETCH completed\r\n");
    }

    #[tokio::test]
    async fn unknown_uid_returns_only_ok() {
        let mailbox = MailboxBuilder::new().folder("INBOX").build();
        let output = run(&uid_set(99), &mailbox).await;
        assert_eq!(output, "A1 OK FETCH completed\r\n");
    }
}
