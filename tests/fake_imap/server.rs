//! In-process fake IMAP server for integration testing
//!
//! ## Connection lifecycle
//!
//! ```text
//!   Client connects via TCP
//!       |
//!   [Tls]       TLS handshake first, greeting inside TLS
//!   [StartTls]  greeting, STARTTLS, TLS handshake
//!   [Plain]     greeting, no encryption
//!       |
//!   Client sends LOGIN with username and password
//!       |
//!   Client issues commands: LIST, SELECT, UID SEARCH, UID FETCH
//!       |
//!   Client sends LOGOUT
//! ```
//!
//! Every client command starts with a **tag** that the server echoes in
//! its completion response. Lines prefixed with `*` are **untagged**
//! data sent before the final tagged OK/NO/BAD:
//!
//! ```text
//!   Client:  A0002 LIST "" "*"
//!   Server:  * LIST (\HasNoChildren) "/" "INBOX"
//!   Server:  A0002 OK LIST completed
//! ```

use super::handlers::{
    handle_list, handle_login, handle_logout, handle_select, handle_uid_fetch, handle_uid_search,
};
use super::io::write_line;
use super::mailbox::Mailbox;
use imap_codec::CommandCodec;
use imap_codec::decode::Decoder;
use imap_codec::imap_types::command::CommandBody;
use imap_codec::imap_types::mailbox::Mailbox as ImapMailbox;
use rcgen::generate_simple_self_signed;
use rustls::pki_types::PrivatePkcs8KeyDer;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;

const GREETING: &str = "* OK IMAP4rev1 Fake server ready\r\n";

/// How the fake server secures its connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Plain,
    StartTls,
    Tls,
}

/// A fake IMAP server on localhost with an OS-assigned port.
///
/// A self-signed certificate for `127.0.0.1` is generated at startup
/// with `rcgen`, so clients must accept invalid certificates.
pub struct FakeImapServer {
    port: u16,
    commands: Arc<Mutex<Vec<String>>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl FakeImapServer {
    /// Start a STARTTLS server with the given account state.
    pub async fn start(mailbox: Mailbox) -> Self {
        Self::start_with(mailbox, Transport::StartTls).await
    }

    /// Start a server using the given transport.
    ///
    /// The server runs until the `FakeImapServer` is dropped.
    pub async fn start_with(mailbox: Mailbox, transport: Transport) -> Self {
        let _ = rustls::crypto::ring::default_provider().install_default();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind to ephemeral port");
        let port = listener.local_addr().unwrap().port();

        let cert = generate_simple_self_signed(vec!["127.0.0.1".to_string()])
            .expect("generate self-signed cert");
        let cert_der = cert.cert.der().clone();
        let key_der = PrivatePkcs8KeyDer::from(cert.key_pair.serialize_der());
        let tls_config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![cert_der], key_der.into())
            .expect("build server TLS config");

        let acceptor = TlsAcceptor::from(Arc::new(tls_config));
        let mailbox = Arc::new(mailbox);
        let commands = Arc::new(Mutex::new(Vec::new()));

        let server_commands = commands.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _addr)) = listener.accept().await else {
                    break;
                };
                let acceptor = acceptor.clone();
                let mailbox = mailbox.clone();
                let commands = server_commands.clone();
                tokio::spawn(async move {
                    handle_connection(stream, transport, acceptor, &mailbox, &commands).await;
                });
            }
        });

        Self {
            port,
            commands,
            _handle: handle,
        }
    }

    /// The port the server is listening on.
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Command names received so far, across all connections, e.g.
    /// `["LOGIN", "SELECT INBOX", "LOGOUT"]`.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

async fn handle_connection(
    stream: TcpStream,
    transport: Transport,
    acceptor: TlsAcceptor,
    mailbox: &Mailbox,
    commands: &Mutex<Vec<String>>,
) {
    match transport {
        Transport::Plain => handle_imap_session(stream, mailbox, commands).await,
        Transport::Tls => {
            let Ok(tls_stream) = acceptor.accept(stream).await else {
                return;
            };
            handle_imap_session(tls_stream, mailbox, commands).await;
        }
        Transport::StartTls => {
            let Some(tcp) = negotiate_starttls(stream).await else {
                return;
            };
            let Ok(tls_stream) = acceptor.accept(tcp).await else {
                return;
            };
            // RFC 3501 Section 6.2.1: no new greeting after STARTTLS
            run_commands(BufReader::new(tls_stream), mailbox, commands).await;
        }
    }
}

/// Greet on the raw TCP stream and wait for STARTTLS.
async fn negotiate_starttls(stream: TcpStream) -> Option<TcpStream> {
    let mut reader = BufReader::new(stream);
    write_line(&mut reader, GREETING).await.ok()?;

    let mut line = String::new();
    reader.read_line(&mut line).await.ok()?;
    let (tag, command) = line.trim().split_once(' ')?;

    if !command.eq_ignore_ascii_case("STARTTLS") {
        let _ = write_line(&mut reader, &format!("{tag} BAD Expected STARTTLS\r\n")).await;
        return None;
    }
    let resp = format!("{tag} OK Begin TLS negotiation now\r\n");
    write_line(&mut reader, &resp).await.ok()?;
    Some(reader.into_inner())
}

async fn handle_imap_session<S: AsyncRead + AsyncWrite + Unpin>(
    stream: S,
    mailbox: &Mailbox,
    commands: &Mutex<Vec<String>>,
) {
    let mut reader = BufReader::new(stream);
    if write_line(&mut reader, GREETING).await.is_err() {
        return;
    }
    run_commands(reader, mailbox, commands).await;
}

/// Extract the folder name from a parsed `imap_types::Mailbox`.
fn mailbox_name(mb: &ImapMailbox<'_>) -> String {
    match mb {
        ImapMailbox::Inbox => "INBOX".to_string(),
        ImapMailbox::Other(other) => {
            let bytes: &[u8] = other.as_ref();
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Parse each line with `imap-codec` and dispatch on the
/// `CommandBody` variant.
async fn run_commands<S: AsyncRead + AsyncWrite + Unpin>(
    mut reader: BufReader<S>,
    mailbox: &Mailbox,
    commands: &Mutex<Vec<String>>,
) {
    let mut selected_folder: Option<String> = None;
    let codec = CommandCodec::default();

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let Ok((_, command)) = codec.decode(line.as_bytes()) else {
            let tag = trimmed.split_whitespace().next().unwrap_or("*");
            if write_line(&mut reader, &format!("{tag} BAD Parse error\r\n")).await.is_err() {
                break;
            }
            continue;
        };
        let tag = command.tag.inner();
        let record = |name: String| commands.lock().unwrap().push(name);

        match command.body {
            CommandBody::Login { .. } => {
                record("LOGIN".to_string());
                handle_login(tag, &line, mailbox, &mut reader).await;
            }
            CommandBody::List { .. } => {
                record("LIST".to_string());
                handle_list(tag, mailbox, &mut reader).await;
            }
            CommandBody::Select { mailbox: mb, .. } => {
                let name = mailbox_name(&mb);
                record(format!("SELECT {name}"));
                selected_folder = handle_select(tag, &name, mailbox, &mut reader).await;
            }
            CommandBody::Search {
                criteria,
                uid: true,
                ..
            } => {
                record("UID SEARCH".to_string());
                handle_uid_search(
                    tag,
                    criteria.as_ref(),
                    mailbox,
                    selected_folder.as_deref(),
                    &mut reader,
                )
                .await;
            }
            CommandBody::Fetch {
                sequence_set,
                uid: true,
                ..
            } => {
                record("UID FETCH".to_string());
                handle_uid_fetch(
                    tag,
                    &sequence_set,
                    mailbox,
                    selected_folder.as_deref(),
                    &mut reader,
                )
                .await;
            }
            CommandBody::Logout => {
                record("LOGOUT".to_string());
                handle_logout(tag, &mut reader).await;
                break;
            }
            _ => {
                let resp = format!("{tag} BAD Unknown command\r\n");
                if write_line(&mut reader, &resp).await.is_err() {
                    break;
                }
            }
        }
    }
}
