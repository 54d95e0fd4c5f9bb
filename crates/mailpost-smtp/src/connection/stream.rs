//! Network stream for SMTP connections.

#![allow(clippy::missing_errors_doc)]

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tracing::debug;

use super::{Transport, tls::tls_connector};
use crate::error::{Error, Result};
use crate::options::Options;

/// A TCP stream that is either plaintext or TLS-wrapped.
pub enum SmtpStream {
    /// Plaintext TCP stream.
    Plain(TcpStream),
    /// TLS-encrypted stream (boxed to reduce enum size).
    Tls(Box<TlsStream<TcpStream>>),
}

impl std::fmt::Debug for SmtpStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("SmtpStream::Plain"),
            Self::Tls(_) => f.write_str("SmtpStream::Tls"),
        }
    }
}

/// Connects to the configured server.
///
/// With `secure` set, TLS is negotiated before the greeting is read.
pub async fn connect(options: &Options) -> Result<SmtpStream> {
    let addr = format!("{}:{}", options.host(), options.port());
    debug!(%addr, secure = options.secure(), "connecting");

    let tcp = TcpStream::connect(&addr)
        .await
        .map_err(|e| Error::Connection(format!("{addr}: {e}")))?;

    let stream = SmtpStream::Plain(tcp);
    if options.secure() {
        stream.upgrade_to_tls(options).await
    } else {
        Ok(stream)
    }
}

impl SmtpStream {
    /// Wraps a plaintext stream in TLS.
    pub async fn upgrade_to_tls(self, options: &Options) -> Result<Self> {
        match self {
            Self::Plain(tcp) => {
                let host = options.host();
                let server_name = ServerName::try_from(host.to_string())
                    .map_err(|_| Error::Connection(format!("Invalid hostname: {host}")))?;
                let tls = tls_connector(options.ignore_bad_certificate())
                    .connect(server_name, tcp)
                    .await
                    .map_err(|e| Error::Connection(format!("TLS handshake with {host}: {e}")))?;
                Ok(Self::Tls(Box::new(tls)))
            }
            Self::Tls(_) => Err(Error::InvalidState("Stream is already TLS".to_string())),
        }
    }

    /// Returns true if the stream is TLS-encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

impl Transport for SmtpStream {
    fn is_secure(&self) -> bool {
        self.is_tls()
    }

    async fn upgrade(self, options: &Options) -> Result<Self> {
        self.upgrade_to_tls(options).await
    }
}

impl AsyncRead for SmtpStream {
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

impl AsyncWrite for SmtpStream {
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

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_plain() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let options = Options::builder("127.0.0.1")
            .port(port)
            .secure(false)
            .build();

        let stream = connect(&options).await.unwrap();
        assert!(!stream.is_secure());
    }

    #[tokio::test]
    async fn test_connect_refused_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let options = Options::builder("127.0.0.1")
            .port(port)
            .secure(false)
            .build();

        assert!(matches!(connect(&options).await, Err(Error::Connection(_))));
    }
}
