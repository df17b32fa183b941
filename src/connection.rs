//! IMAP transport and TLS helpers
//!
//! Opens the TCP connection and applies the configured
//! [`ImapSecurity`]. The returned client has not logged in yet.

use crate::config::{ImapConfig, ImapSecurity};
use crate::error::{Error, ErrorKind, Result};
use async_imap::{Client, Session};
use rustls::pki_types::ServerName;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{debug, info};

/// A connected, not yet authenticated IMAP client.
pub type ImapClient = Client<Compat<ImapStream>>;

/// An authenticated IMAP session.
pub type ImapSession = Session<Compat<ImapStream>>;

/// Either a plain TCP stream or a TLS stream over TCP.
#[derive(Debug)]
pub enum ImapStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl ImapStream {
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

impl AsyncRead for ImapStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ImapStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

fn tls_error(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::Tls, message)
}

/// Build a TLS connector.
///
/// Verifies certificates against the webpki roots unless
/// `accept_invalid_certs` is set, in which case any certificate is
/// accepted (for self-signed local servers).
///
/// # Errors
///
/// Returns a `Tls` error if no safe protocol version is available.
pub fn tls_connector(accept_invalid_certs: bool) -> Result<TlsConnector> {
    let builder = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| tls_error(format!("TLS setup failed: {e}")).with_source(e))?;

    let config = if accept_invalid_certs {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(DangerousVerifier))
            .with_no_client_auth()
    } else {
        let roots = rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        builder.with_root_certificates(roots).with_no_client_auth()
    };

    Ok(TlsConnector::from(Arc::new(config)))
}

async fn handshake(config: &ImapConfig, tcp: TcpStream) -> Result<ImapStream> {
    let connector = tls_connector(config.accept_invalid_certs)?;
    let server_name = ServerName::try_from(config.host.clone())
        .map_err(|e| tls_error(format!("Invalid server name: {e}")).with_source(e))?;

    let tls = connector
        .connect(server_name, tcp)
        .await
        .map_err(|e| tls_error(format!("TLS handshake failed: {e}")).with_source(e))?;
    Ok(ImapStream::Tls(Box::new(tls)))
}

/// Open an IMAP connection to `config.host:config.port`.
///
/// # Errors
///
/// Returns an `Io` error if the TCP connection fails and a `Tls` error
/// if STARTTLS or the TLS handshake fails.
pub async fn connect(config: &ImapConfig) -> Result<ImapClient> {
    let addr = format!("{}:{}", config.host, config.port);
    debug!("Connecting to IMAP server at {} ({:?})", addr, config.security);

    let tcp = TcpStream::connect(&addr).await.map_err(|e| {
        Error::new(ErrorKind::Io, format!("Unable to connect to {addr}: {e}")).with_source(e)
    })?;

    let stream = match config.security {
        ImapSecurity::Plain => ImapStream::Plain(tcp),
        ImapSecurity::Tls => handshake(config, tcp).await?,
        ImapSecurity::StartTls => {
            let mut client = Client::new(tcp.compat());
            client
                .run_command_and_check_ok("STARTTLS", None)
                .await
                .map_err(|e| tls_error(format!("STARTTLS failed: {e}")).with_source(e))?;
            handshake(config, client.into_inner().into_inner()).await?
        }
    };

    info!("Connected to IMAP server at {} (tls: {})", addr, stream.is_tls());
    Ok(Client::new(stream.compat()))
}

/// Certificate verifier that accepts all certificates.
#[derive(Debug)]
struct DangerousVerifier;

impl rustls::client::danger::ServerCertVerifier for DangerousVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
