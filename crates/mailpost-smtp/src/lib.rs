//! # mailpost-smtp
//!
//! A reply-driven SMTP client that delivers one [`mailpost_mime::Email`]
//! per connection.
//!
//! ## Features
//!
//! - **Explicit state machine**: every server reply is fed to
//!   [`Session::advance`], which decides the next command
//! - **TLS**: implicit TLS (port 465) or in-place STARTTLS upgrade
//! - **Fallbacks**: HELO when EHLO or STARTTLS is refused
//! - **Authentication**: AUTH LOGIN challenge/response
//! - **Fragmented replies**: reads are buffered until a reply is complete
//! - **Hard timeout**: the whole send runs inside one 60 second window
//!
//! ## Quick Start
//!
//! ```no_run
//! use mailpost_mime::{Address, Email};
//! use mailpost_smtp::{Mailer, Options};
//!
//! # async fn run() -> mailpost_smtp::Result<()> {
//! let options = Options::builder("smtp.example.com")
//!     .credentials("alice@example.com", "secret")
//!     .build();
//!
//! let email = Email::new(Address::new("alice@example.com"))
//!     .to(Address::new("bob@example.com"))
//!     .subject("Hello")
//!     .text("Hi Bob!");
//!
//! let delivery = Mailer::new(options).send(&email).await?;
//! println!("accepted: {}", delivery.reply);
//! # Ok(())
//! # }
//! ```
//!
//! ## Session States
//!
//! ```text
//! Greeting ──→ Ehlo ──→ StartTls ──(upgrade)──→ Ehlo
//!                │          │
//!                └─(5xx)──→ Helo ←─(refused)─┘
//!
//! Ehlo/Helo ──→ LoginUser ──→ LoginPassword ──→ AuthComplete ──→ Idle
//!          └────────────── (no credentials) ─────────────────→ Idle
//!
//! Idle ──→ MailFrom ──→ RcptTo × n ──→ Data ──→ FinishEmail ──→ Closed
//! ```
//!
//! ## Modules
//!
//! - [`command`]: SMTP command serialization
//! - [`connection`]: Transports and the [`Mailer`] driver
//! - [`parser`]: Reply parsing and reassembly
//! - [`protocol`]: The [`Session`] state machine
//! - [`types`]: Replies and EHLO capabilities

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
mod options;
pub mod parser;
pub mod protocol;
pub mod types;

pub use connection::{Delivery, Mailer, SmtpStream, Transport};
pub use error::{Error, Result};
pub use options::{
    Credentials, DEFAULT_TIMEOUT, IMPLICIT_TLS_PORT, Options, OptionsBuilder, SUBMISSION_PORT,
};
pub use protocol::{Action, Session, State};
pub use types::{AuthMechanism, Capabilities, Extension, Reply, ReplyCode};
