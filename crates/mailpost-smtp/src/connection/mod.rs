//! Transports and the send driver.

mod client;
mod stream;
mod tls;

pub use client::{Delivery, Mailer};
pub use stream::{SmtpStream, connect};
pub use tls::tls_connector;

use crate::error::Result;
use crate::options::Options;
use std::future::Future;
use tokio::io::{AsyncRead, AsyncWrite};

/// A byte stream the protocol can run over.
///
/// [`SmtpStream`] is the network implementation; tests drive the protocol
/// over scripted in-memory streams.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send + Sized {
    /// Returns true if the stream is TLS-wrapped.
    fn is_secure(&self) -> bool;

    /// Wraps the stream in TLS after the server accepted STARTTLS.
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake fails or the stream is already
    /// secure.
    fn upgrade(self, options: &Options) -> impl Future<Output = Result<Self>> + Send;
}
