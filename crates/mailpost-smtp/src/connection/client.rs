//! Send driver: runs a [`Session`] over a [`Transport`].

use std::future::Future;

use mailpost_mime::Email;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::{Transport, connect};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::options::Options;
use crate::parser::ReplyBuffer;
use crate::protocol::{Action, Session};
use crate::types::Reply;

const READ_CHUNK: usize = 4096;

/// Outcome of an accepted send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// The server's reply to the end of the message data.
    pub reply: Reply,
}

/// Sends emails with a fixed set of connection options.
///
/// Every send opens its own connection and closes it when the transaction
/// ends, successfully or not.
#[derive(Debug, Clone)]
pub struct Mailer {
    options: Options,
}

impl Mailer {
    /// Creates a mailer.
    #[must_use]
    pub const fn new(options: Options) -> Self {
        Self { options }
    }

    /// Returns the connection options.
    #[must_use]
    pub const fn options(&self) -> &Options {
        &self.options
    }

    /// Connects to the configured server and sends `email`.
    ///
    /// Connecting and the whole exchange share one timeout window.
    ///
    /// # Errors
    ///
    /// Returns the first failure: connection, TLS, a rejected reply,
    /// authentication, or the timeout elapsing.
    pub async fn send(&self, email: &Email) -> Result<Delivery> {
        ensure_recipients(email)?;
        self.with_timeout(async {
            let stream = connect(&self.options).await?;
            self.run(stream, email).await
        })
        .await
    }

    /// Sends `email` over an already-open transport.
    ///
    /// The server greeting has not been read yet. The transport is shut
    /// down when the exchange ends.
    ///
    /// # Errors
    ///
    /// Same as [`Mailer::send`], minus connection setup.
    pub async fn send_over<T: Transport>(&self, transport: T, email: &Email) -> Result<Delivery> {
        ensure_recipients(email)?;
        self.with_timeout(self.run(transport, email)).await
    }

    async fn with_timeout<F>(&self, send: F) -> Result<Delivery>
    where
        F: Future<Output = Result<Delivery>>,
    {
        let window = self.options.timeout();
        match tokio::time::timeout(window, send).await {
            Ok(Ok(delivery)) => {
                info!(host = self.options.host(), reply = %delivery.reply, "message accepted");
                Ok(delivery)
            }
            Ok(Err(e)) => {
                warn!(host = self.options.host(), error = %e, "send failed");
                Err(e)
            }
            Err(_) => {
                warn!(host = self.options.host(), ?window, "send timed out");
                Err(Error::Timeout(window))
            }
        }
    }

    async fn run<T: Transport>(&self, transport: T, email: &Email) -> Result<Delivery> {
        let mut conn = Connection::new(transport);
        let result = drive(&mut conn, &self.options, email).await;
        conn.close().await;
        result
    }
}

fn ensure_recipients(email: &Email) -> Result<()> {
    if email.recipients().next().is_none() {
        return Err(Error::Validation("email has no recipients".into()));
    }
    Ok(())
}

async fn drive<T: Transport>(
    conn: &mut Connection<T>,
    options: &Options,
    email: &Email,
) -> Result<Delivery> {
    let mut session = Session::new(options, conn.is_secure());

    loop {
        let reply = conn.read_reply().await?;
        debug!(state = %session.state(), %reply, "S:");

        match session.advance(&reply)? {
            Action::Send(command) => conn.send(&command).await?,
            Action::UpgradeTls => {
                conn.upgrade(options).await?;
                info!(host = options.host(), "connection upgraded to TLS");
                let command = session.secured()?;
                conn.send(&command).await?;
            }
            Action::Ready => {
                let command = session.start_transaction(email)?;
                conn.send(&command).await?;
            }
            Action::Delivered(reply) => return Ok(Delivery { reply }),
        }
    }
}

/// A transport plus the buffer that reassembles replies from it.
struct Connection<T> {
    transport: Option<T>,
    buffer: ReplyBuffer,
}

impl<T: Transport> Connection<T> {
    fn new(transport: T) -> Self {
        Self {
            transport: Some(transport),
            buffer: ReplyBuffer::new(),
        }
    }

    fn is_secure(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| t.is_secure())
    }

    fn transport_mut(&mut self) -> Result<&mut T> {
        self.transport
            .as_mut()
            .ok_or_else(|| Error::InvalidState("transport already released".into()))
    }

    async fn read_reply(&mut self) -> Result<Reply> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = self.transport_mut()?.read(&mut chunk).await?;
            if n == 0 {
                return Err(Error::Connection("connection closed by server".into()));
            }
            if let Some(reply) = self.buffer.push(&chunk[..n])? {
                return Ok(reply);
            }
        }
    }

    async fn send(&mut self, command: &Command) -> Result<()> {
        debug!(%command, "C:");
        let transport = self.transport_mut()?;
        transport.write_all(&command.serialize()).await?;
        transport.flush().await?;
        Ok(())
    }

    async fn upgrade(&mut self, options: &Options) -> Result<()> {
        let transport = self
            .transport
            .take()
            .ok_or_else(|| Error::InvalidState("transport already released".into()))?;
        self.transport = Some(transport.upgrade(options).await?);
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(mut transport) = self.transport.take()
            && let Err(e) = transport.shutdown().await
        {
            debug!(error = %e, "shutdown failed");
        }
    }
}
