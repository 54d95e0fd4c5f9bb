//! Protocol state types.

use std::fmt;

/// Where the client is in the SMTP dialog.
///
/// ```text
/// Greeting → Ehlo ─┬──────────────→ (auth) → Idle → MailFrom → RcptTo×N → Data → FinishEmail → Closed
///                  ├→ StartTls → Ehlo
///                  └→ Helo ──────→ (auth)
/// (auth) = LoginUser → LoginPassword → AuthComplete, skipped without credentials
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// Waiting for the server greeting.
    #[default]
    Greeting,
    /// EHLO sent.
    Ehlo,
    /// HELO sent after EHLO or STARTTLS was refused.
    Helo,
    /// STARTTLS sent.
    StartTls,
    /// AUTH LOGIN sent, waiting for the username challenge.
    LoginUser,
    /// Username sent, waiting for the password challenge.
    LoginPassword,
    /// Password sent, waiting for the verdict.
    AuthComplete,
    /// Setup finished, ready for a transaction.
    Idle,
    /// MAIL FROM sent.
    MailFrom,
    /// RCPT TO sent for the current recipient.
    RcptTo,
    /// DATA sent.
    Data,
    /// Payload sent, waiting for acceptance.
    FinishEmail,
    /// Transaction complete.
    Closed,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
