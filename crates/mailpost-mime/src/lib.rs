//! # mailpost-mime
//!
//! Builds the exact RFC 5322 / MIME byte sequence that an SMTP client
//! transmits as its DATA segment.
//!
//! ## Features
//!
//! - **Addresses**: header-safe mailboxes, sanitized on construction
//! - **Seven message kinds**: from empty through text + HTML + attachments
//! - **Headers**: fixed emission order, RFC 2047 encoded and folded subject
//! - **Attachments**: in-memory or lazily read, base64 in 76-column lines
//! - **Deterministic generation**: Message-ID, Date and boundaries come
//!   from an injectable [`Clock`]
//!
//! ## Quick Start
//!
//! ```
//! use mailpost_mime::{Address, Attachment, Email, MessageKind};
//!
//! let email = Email::new(Address::with_name("Alice", "alice@example.com"))
//!     .to(Address::new("bob@example.com"))
//!     .bcc(Address::new("audit@example.com"))
//!     .subject("Quarterly report")
//!     .text("See attached.")
//!     .attach(Attachment::from_bytes("report.csv", b"a,b\n1,2\n".to_vec()));
//!
//! assert_eq!(email.kind(), MessageKind::TextAttach);
//! assert_eq!(email.recipients().count(), 2);
//!
//! let payload = email.serialize()?;
//! assert!(payload.ends_with(b"\n\r\n."));
//! # Ok::<(), mailpost_mime::Error>(())
//! ```
//!
//! ## Payload Layout
//!
//! ```text
//! Message-ID, Date, MIME-Version, X-*, X-Mailer, Subject, From, To, Cc
//! <blank line>
//! body (single part, multipart/alternative or multipart/mixed)
//! LF CR LF "."
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod attachment;
mod clock;
mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use address::Address;
pub use attachment::{
    Attachment, AttachmentSource, DEFAULT_MIME_TYPE, FileSource, guess_mime_type,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{
    BOUNDARY_PREFIX, DATA_TERMINATOR, Email, MAILER, MessageKind, TransferEncoding,
    local_hostname,
};
