//! LOGIN command handler.
//!
//! Credentials are checked against `Mailbox::login`. A rejected login
//! gets a tagged NO with the `AUTHENTICATIONFAILED` response code
//! (RFC 5530) and the connection stays open, so the client can retry.

use crate::fake_imap::io::complete;
use crate::fake_imap::mailbox::Mailbox;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Pull `(username, password)` out of a raw `TAG LOGIN u p` line.
///
/// Arguments may be atoms or quoted strings with `\"` / `\\` escapes,
/// which is what `async-imap` sends.
pub fn login_args(line: &str) -> Option<(String, String)> {
    let mut rest = line.trim_end_matches(['\r', '\n']);
    let mut args = Vec::new();
    // skip tag and command name
    for _ in 0..2 {
        rest = rest.trim_start().split_once(' ')?.1;
    }
    while args.len() < 2 {
        rest = rest.trim_start();
        if let Some(quoted) = rest.strip_prefix('"') {
            let mut value = String::new();
            let mut chars = quoted.char_indices();
            let mut end = None;
            while let Some((i, c)) = chars.next() {
                match c {
                    '\\' => value.extend(chars.next().map(|(_, e)| e)),
                    '"' => {
                        end = Some(i + 1);
                        break;
                    }
                    other => value.push(other),
                }
            }
            rest = &quoted[end?..];
            args.push(value);
        } else {
            let (atom, tail) = rest.split_once(' ').unwrap_or((rest, ""));
            if atom.is_empty() {
                return None;
            }
            args.push(atom.to_string());
            rest = tail;
        }
    }
    let password = args.pop()?;
    let username = args.pop()?;
    Some((username, password))
}

/// Handle the LOGIN command. Returns whether the login was accepted.
pub async fn handle_login<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    line: &str,
    mailbox: &Mailbox,
    stream: &mut BufReader<S>,
) -> bool {
    let accepted = login_args(line).is_some_and(|(user, pass)| mailbox.accepts(&user, &pass));
    let status = if accepted {
        "OK LOGIN completed"
    } else {
        "NO [AUTHENTICATIONFAILED] Invalid credentials"
    };
    complete(stream, tag, status).await;
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;

    async fn run(line: &str, mailbox: &Mailbox) -> (String, bool) {
        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);

        let ok = handle_login("A0001", line, mailbox, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        (String::from_utf8(buf).unwrap(), ok)
    }

    #[test]
    fn parses_quoted_and_atom_arguments() {
        assert_eq!(
            login_args("A1 LOGIN \"alice\" \"p a\\\"ss\"\r\n"),
            Some(("alice".to_string(), "p a\"ss".to_string()))
        );
        assert_eq!(
            login_args("A1 LOGIN bob hunter2"),
            Some(("bob".to_string(), "hunter2".to_string()))
        );
        assert_eq!(login_args("A1 LOGIN onlyuser"), None);
    }

    #[tokio::test]
    async fn open_mailbox_accepts_anyone() {
        let mailbox = MailboxBuilder::new().build();
        let (output, ok) = run("A0001 LOGIN \"x\" \"y\"", &mailbox).await;
        assert!(ok);
        assert_eq!(output, "A0001 OK LOGIN completed\r\n");
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let mailbox = MailboxBuilder::new().credentials("alice", "secret").build();
        let (output, ok) = run("A0001 LOGIN \"alice\" \"nope\"", &mailbox).await;
        assert!(!ok);
        assert!(output.starts_with("A0001 NO [AUTHENTICATIONFAILED]"));
    }
}
