//! Write helpers for the fake IMAP server.
//!
//! Every write is flushed immediately so the client sees each response
//! line as soon as the handler produces it.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Write raw bytes (e.g. a literal message body) and flush.
pub async fn write_bytes<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut BufReader<S>,
    data: &[u8],
) -> std::io::Result<()> {
    let inner = stream.get_mut();
    inner.write_all(data).await?;
    inner.flush().await
}

/// Write an already terminated response line.
pub async fn write_line<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut BufReader<S>,
    line: &str,
) -> std::io::Result<()> {
    write_bytes(stream, line.as_bytes()).await
}

/// Finish a command with its tagged status line, e.g.
/// `A0003 OK SEARCH completed`. Write errors are ignored since the
/// connection loop notices a dead peer on its next read.
pub async fn complete<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut BufReader<S>,
    tag: &str,
    status: &str,
) {
    let _ = write_line(stream, &format!("{tag} {status}\r\n")).await;
}
