//! SMTP command builder.

use std::fmt;

/// SMTP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// HELO - Simple greeting
    Helo {
        /// Client hostname
        hostname: String,
    },
    /// EHLO - Extended greeting
    Ehlo {
        /// Client hostname
        hostname: String,
    },
    /// STARTTLS - Upgrade to TLS
    StartTls,
    /// AUTH LOGIN - Begin challenge/response login
    AuthLogin,
    /// Base64-encoded answer to an AUTH challenge
    AuthResponse(String),
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender addr-spec
        from: String,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Recipient addr-spec
        to: String,
    },
    /// DATA - Begin message data
    Data,
    /// The serialized message, sent verbatim after DATA is accepted
    Payload(Vec<u8>),
}

impl Command {
    /// Serializes the command to bytes, terminated by CRLF.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        match self {
            Self::Helo { hostname } => {
                buf.extend_from_slice(b"HELO ");
                buf.extend_from_slice(hostname.as_bytes());
            }
            Self::Ehlo { hostname } => {
                buf.extend_from_slice(b"EHLO ");
                buf.extend_from_slice(hostname.as_bytes());
            }
            Self::StartTls => {
                buf.extend_from_slice(b"STARTTLS");
            }
            Self::AuthLogin => {
                buf.extend_from_slice(b"AUTH LOGIN");
            }
            Self::AuthResponse(encoded) => {
                buf.extend_from_slice(encoded.as_bytes());
            }
            Self::MailFrom { from } => {
                buf.extend_from_slice(b"MAIL FROM:<");
                buf.extend_from_slice(from.as_bytes());
                buf.push(b'>');
            }
            Self::RcptTo { to } => {
                buf.extend_from_slice(b"RCPT TO:<");
                buf.extend_from_slice(to.as_bytes());
                buf.push(b'>');
            }
            Self::Data => {
                buf.extend_from_slice(b"DATA");
            }
            Self::Payload(payload) => {
                buf.extend_from_slice(payload);
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }
}

/// Log-safe rendering: credentials are redacted and payloads summarized.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthResponse(_) => f.write_str("<credentials redacted>"),
            Self::Payload(payload) => write!(f, "<message, {} bytes>", payload.len()),
            _ => {
                let bytes = self.serialize();
                f.write_str(String::from_utf8_lossy(&bytes).trim_end())
            }
        }
    }
}
