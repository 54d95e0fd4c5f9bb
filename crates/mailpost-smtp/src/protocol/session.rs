//! Transition table for one SMTP send.

use super::State;
use crate::command::Command;
use crate::error::{Error, Result};
use crate::options::{Credentials, Options};
use crate::types::{AuthMechanism, Capabilities, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use mailpost_mime::{Address, Email};
use tracing::{debug, warn};

/// What the driver must do after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Write the command and wait for the next reply.
    Send(Command),
    /// Upgrade the transport to TLS, then call [`Session::secured`].
    UpgradeTls,
    /// Setup is done; call [`Session::start_transaction`].
    Ready,
    /// The server accepted the message.
    Delivered(Reply),
}

/// Protocol state for one send: the current state tag, discovered
/// capabilities and the recipient cursor of the in-flight email.
#[derive(Debug)]
pub struct Session<'a> {
    state: State,
    local_name: &'a str,
    credentials: Option<&'a Credentials>,
    secure: bool,
    capabilities: Capabilities,
    email: Option<&'a Email>,
    recipients: Vec<&'a Address>,
    rcpt_index: usize,
}

impl<'a> Session<'a> {
    /// Creates a session awaiting the server greeting.
    ///
    /// `secure` tells whether the transport is already TLS-wrapped.
    #[must_use]
    pub fn new(options: &'a Options, secure: bool) -> Self {
        Self {
            state: State::Greeting,
            local_name: options.local_name(),
            credentials: options.credentials(),
            secure,
            capabilities: Capabilities::default(),
            email: None,
            recipients: Vec::new(),
            rcpt_index: 0,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    /// Returns the capabilities from the last EHLO.
    #[must_use]
    pub const fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Returns true once the transport is known to be TLS-wrapped.
    #[must_use]
    pub const fn is_secure(&self) -> bool {
        self.secure
    }

    /// Feeds one complete reply to the current state's handler.
    ///
    /// # Errors
    ///
    /// Returns an error if the reply is not acceptable in the current state.
    /// The transaction is over once an error is returned.
    pub fn advance(&mut self, reply: &Reply) -> Result<Action> {
        match self.state {
            State::Greeting => {
                expect_success(reply)?;
                Ok(self.send(State::Ehlo, self.ehlo()))
            }
            State::Ehlo => self.on_ehlo(reply),
            State::Helo => {
                expect_success(reply)?;
                Ok(self.authenticate())
            }
            State::StartTls => {
                if reply.is_success() {
                    Ok(Action::UpgradeTls)
                } else {
                    warn!(code = %reply.code, "STARTTLS refused, falling back to HELO");
                    Ok(self.send(State::Helo, self.helo()))
                }
            }
            State::LoginUser => {
                let credentials = self.require_credentials()?;
                expect_challenge(reply, "Username")?;
                Ok(self.send(
                    State::LoginPassword,
                    Command::AuthResponse(STANDARD.encode(credentials.username())),
                ))
            }
            State::LoginPassword => {
                let credentials = self.require_credentials()?;
                expect_challenge(reply, "Password")?;
                Ok(self.send(
                    State::AuthComplete,
                    Command::AuthResponse(STANDARD.encode(credentials.password())),
                ))
            }
            State::AuthComplete => {
                if !reply.is_success() {
                    return Err(Error::Authentication(reply.to_string()));
                }
                debug!("authenticated");
                self.state = State::Idle;
                Ok(Action::Ready)
            }
            State::Idle => Err(Error::InvalidState(format!(
                "reply received while idle: {reply}"
            ))),
            State::MailFrom => {
                expect_success(reply)?;
                self.rcpt_index = 0;
                self.next_recipient()
            }
            State::RcptTo => {
                expect_success(reply)?;
                self.rcpt_index += 1;
                self.next_recipient()
            }
            State::Data => {
                if !reply.is_success() && !reply.is_intermediate() {
                    return Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()));
                }
                let payload = self.require_email()?.serialize()?;
                if let Some(limit) = self.capabilities.max_message_size()
                    && payload.len() > limit
                {
                    warn!(size = payload.len(), limit, "message exceeds advertised SIZE");
                }
                Ok(self.send(State::FinishEmail, Command::Payload(payload)))
            }
            State::FinishEmail => {
                expect_success(reply)?;
                self.email = None;
                self.recipients.clear();
                self.state = State::Closed;
                Ok(Action::Delivered(reply.clone()))
            }
            State::Closed => Err(Error::InvalidState(format!(
                "reply received after completion: {reply}"
            ))),
        }
    }

    /// Records that the transport was upgraded to TLS and returns the EHLO
    /// to re-issue over it.
    ///
    /// # Errors
    ///
    /// Returns an error unless the server just accepted STARTTLS.
    pub fn secured(&mut self) -> Result<Command> {
        if self.state != State::StartTls {
            return Err(Error::InvalidState(format!(
                "TLS upgrade in state {}",
                self.state
            )));
        }
        self.secure = true;
        self.capabilities = Capabilities::default();
        self.state = State::Ehlo;
        Ok(self.ehlo())
    }

    /// Begins the mail transaction for `email` once setup is done.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not idle or the email has no
    /// recipients.
    pub fn start_transaction(&mut self, email: &'a Email) -> Result<Command> {
        if self.state != State::Idle {
            return Err(Error::InvalidState(format!(
                "transaction started in state {}",
                self.state
            )));
        }

        let recipients: Vec<&Address> = email.recipients().collect();
        if recipients.is_empty() {
            return Err(Error::Validation("email has no recipients".into()));
        }

        self.email = Some(email);
        self.recipients = recipients;
        self.rcpt_index = 0;
        self.state = State::MailFrom;
        Ok(Command::MailFrom {
            from: email.from().addr_spec().to_string(),
        })
    }

    fn on_ehlo(&mut self, reply: &Reply) -> Result<Action> {
        if !reply.is_success() {
            warn!(code = %reply.code, "EHLO refused, falling back to HELO");
            return Ok(self.send(State::Helo, self.helo()));
        }

        self.capabilities = Capabilities::from_ehlo(reply);
        debug!(
            starttls = self.capabilities.supports_starttls(),
            auth = ?self.capabilities.auth_mechanisms(),
            "capabilities"
        );

        if !self.secure && self.capabilities.supports_starttls() {
            return Ok(self.send(State::StartTls, Command::StartTls));
        }
        Ok(self.authenticate())
    }

    fn authenticate(&mut self) -> Action {
        if self.credentials.is_none() {
            self.state = State::Idle;
            return Action::Ready;
        }

        let advertised = self.capabilities.auth_mechanisms();
        if !advertised.contains(&AuthMechanism::Login) {
            warn!(?advertised, "server does not advertise AUTH LOGIN, trying anyway");
        }
        self.send(State::LoginUser, Command::AuthLogin)
    }

    fn next_recipient(&mut self) -> Result<Action> {
        match self.recipients.get(self.rcpt_index).copied() {
            Some(address) => {
                let to = address.addr_spec().to_string();
                Ok(self.send(State::RcptTo, Command::RcptTo { to }))
            }
            None => Ok(self.send(State::Data, Command::Data)),
        }
    }

    fn send(&mut self, next: State, command: Command) -> Action {
        self.state = next;
        Action::Send(command)
    }

    fn ehlo(&self) -> Command {
        Command::Ehlo {
            hostname: self.local_name.to_string(),
        }
    }

    fn helo(&self) -> Command {
        Command::Helo {
            hostname: self.local_name.to_string(),
        }
    }

    fn require_credentials(&self) -> Result<&'a Credentials> {
        self.credentials
            .ok_or_else(|| Error::InvalidState("authenticating without credentials".into()))
    }

    fn require_email(&self) -> Result<&'a Email> {
        self.email
            .ok_or_else(|| Error::InvalidState("no email in flight".into()))
    }
}

fn expect_success(reply: &Reply) -> Result<()> {
    if reply.is_success() {
        Ok(())
    } else {
        Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()))
    }
}

/// Checks for a 334 reply whose base64 text decodes to `prompt`, with an
/// optional trailing colon.
fn expect_challenge(reply: &Reply, prompt: &str) -> Result<()> {
    if reply.code != ReplyCode::AUTH_CONTINUE {
        return Err(Error::Authentication(format!(
            "expected {prompt} challenge, got {reply}"
        )));
    }

    let decoded = STANDARD
        .decode(reply.message_text().trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_default();
    let text = decoded.trim().trim_end_matches(':');

    if text.eq_ignore_ascii_case(prompt) {
        Ok(())
    } else {
        Err(Error::Authentication(format!(
            "expected {prompt} challenge, got {decoded:?}"
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    fn reply(code: u16, lines: &[&str]) -> Reply {
        Reply::new(
            ReplyCode::new(code),
            lines.iter().map(ToString::to_string).collect(),
        )
    }

    fn options() -> Options {
        Options::builder("smtp.example.com")
            .local_name("client.example.com")
            .build()
    }

    fn options_with_login() -> Options {
        Options::builder("smtp.example.com")
            .local_name("client.example.com")
            .credentials("user", "pass")
            .build()
    }

    fn email() -> Email {
        Email::new(Address::new("from@example.com"))
            .to(Address::new("a@example.com"))
            .to(Address::new("b@example.com"))
            .bcc(Address::new("hidden@example.com"))
            .text("hi")
    }

    fn ehlo_cmd() -> Action {
        Action::Send(Command::Ehlo {
            hostname: "client.example.com".into(),
        })
    }

    fn helo_cmd() -> Action {
        Action::Send(Command::Helo {
            hostname: "client.example.com".into(),
        })
    }

    #[test]
    fn greeting_sends_ehlo() {
        let options = options();
        let mut session = Session::new(&options, true);
        assert_eq!(session.advance(&reply(220, &["ready"])).unwrap(), ehlo_cmd());
        assert_eq!(session.state(), State::Ehlo);
    }

    #[test]
    fn bad_greeting_fails() {
        let options = options();
        let mut session = Session::new(&options, true);
        let err = session.advance(&reply(554, &["go away"])).unwrap_err();
        assert!(matches!(err, Error::SmtpError { code: 554, .. }));
    }

    #[test]
    fn ehlo_refused_falls_back_to_helo() {
        let options = options();
        let mut session = Session::new(&options, true);
        session.advance(&reply(220, &["ready"])).unwrap();
        assert_eq!(
            session.advance(&reply(500, &["unrecognized"])).unwrap(),
            helo_cmd()
        );
        assert_eq!(session.state(), State::Helo);
        assert_eq!(session.advance(&reply(250, &["hello"])).unwrap(), Action::Ready);
        assert_eq!(session.state(), State::Idle);
    }

    #[test]
    fn helo_refused_fails() {
        let options = options();
        let mut session = Session::new(&options, true);
        session.advance(&reply(220, &["ready"])).unwrap();
        session.advance(&reply(500, &["no"])).unwrap();
        assert!(session.advance(&reply(502, &["no"])).is_err());
    }

    #[test]
    fn plaintext_with_starttls_upgrades_first() {
        let options = options_with_login();
        let mut session = Session::new(&options, false);
        session.advance(&reply(220, &["ready"])).unwrap();

        let action = session
            .advance(&reply(250, &["host", "STARTTLS", "AUTH LOGIN"]))
            .unwrap();
        assert_eq!(action, Action::Send(Command::StartTls));
        assert_eq!(session.advance(&reply(220, &["go ahead"])).unwrap(), Action::UpgradeTls);

        let ehlo = session.secured().unwrap();
        assert_eq!(ehlo, Command::Ehlo { hostname: "client.example.com".into() });
        assert!(session.is_secure());
        assert!(!session.capabilities().supports_starttls());

        // Second EHLO over TLS still advertises STARTTLS; it must not loop.
        let action = session
            .advance(&reply(250, &["host", "STARTTLS", "AUTH LOGIN"]))
            .unwrap();
        assert_eq!(action, Action::Send(Command::AuthLogin));
    }

    #[test]
    fn secure_transport_skips_starttls() {
        let options = options();
        let mut session = Session::new(&options, true);
        session.advance(&reply(220, &["ready"])).unwrap();
        let action = session.advance(&reply(250, &["host", "STARTTLS"])).unwrap();
        assert_eq!(action, Action::Ready);
    }

    #[test]
    fn starttls_refused_falls_back_to_helo() {
        let options = options();
        let mut session = Session::new(&options, false);
        session.advance(&reply(220, &["ready"])).unwrap();
        session.advance(&reply(250, &["host", "STARTTLS"])).unwrap();
        assert_eq!(session.advance(&reply(454, &["TLS not available"])).unwrap(), helo_cmd());
    }

    #[test]
    fn secured_outside_starttls_is_a_fault() {
        let options = options();
        let mut session = Session::new(&options, false);
        assert!(matches!(session.secured(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn auth_login_exchange() {
        let options = options_with_login();
        let mut session = Session::new(&options, true);
        session.advance(&reply(220, &["ready"])).unwrap();
        assert_eq!(
            session.advance(&reply(250, &["host", "AUTH PLAIN LOGIN"])).unwrap(),
            Action::Send(Command::AuthLogin)
        );
        assert!(session.capabilities().supports_auth(AuthMechanism::Plain));

        assert_eq!(
            session.advance(&reply(334, &["VXNlcm5hbWU6"])).unwrap(),
            Action::Send(Command::AuthResponse("dXNlcg==".into()))
        );
        assert_eq!(
            session.advance(&reply(334, &["UGFzc3dvcmQ6"])).unwrap(),
            Action::Send(Command::AuthResponse("cGFzcw==".into()))
        );
        assert_eq!(session.advance(&reply(235, &["ok"])).unwrap(), Action::Ready);
        assert_eq!(session.state(), State::Idle);
    }

    #[test]
    fn auth_wrong_challenge_fails() {
        let options = options_with_login();
        let mut session = Session::new(&options, true);
        session.advance(&reply(220, &["ready"])).unwrap();
        session.advance(&reply(250, &["host"])).unwrap();
        // "Password:" where "Username:" is expected
        let err = session.advance(&reply(334, &["UGFzc3dvcmQ6"])).unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }

    #[test]
    fn auth_rejected_credentials_fail() {
        let options = options_with_login();
        let mut session = Session::new(&options, true);
        session.advance(&reply(220, &["ready"])).unwrap();
        session.advance(&reply(250, &["host"])).unwrap();
        session.advance(&reply(334, &["VXNlcm5hbWU6"])).unwrap();
        session.advance(&reply(334, &["UGFzc3dvcmQ6"])).unwrap();
        let err = session.advance(&reply(535, &["bad credentials"])).unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }

    #[test]
    fn auth_not_offered_fails_as_authentication() {
        let options = options_with_login();
        let mut session = Session::new(&options, true);
        session.advance(&reply(220, &["ready"])).unwrap();
        session.advance(&reply(250, &["host"])).unwrap();
        let err = session.advance(&reply(504, &["unrecognized"])).unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }

    #[test]
    fn idle_rejects_replies() {
        let options = options();
        let mut session = Session::new(&options, true);
        session.advance(&reply(220, &["ready"])).unwrap();
        session.advance(&reply(250, &["host"])).unwrap();
        assert_eq!(session.state(), State::Idle);
        let err = session.advance(&reply(250, &["unexpected"])).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn transaction_before_idle_is_a_fault() {
        let options = options();
        let email = email();
        let mut session = Session::new(&options, true);
        assert!(matches!(
            session.start_transaction(&email),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn transaction_without_recipients_fails() {
        let options = options();
        let email = Email::new(Address::new("from@example.com")).text("hi");
        let mut session = Session::new(&options, true);
        session.advance(&reply(220, &["ready"])).unwrap();
        session.advance(&reply(250, &["host"])).unwrap();
        assert!(matches!(
            session.start_transaction(&email),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn full_transaction() {
        let options = options();
        let email = email();
        let mut session = Session::new(&options, true);
        session.advance(&reply(220, &["ready"])).unwrap();
        assert_eq!(session.advance(&reply(250, &["host"])).unwrap(), Action::Ready);

        assert_eq!(
            session.start_transaction(&email).unwrap(),
            Command::MailFrom { from: "from@example.com".into() }
        );

        let mut rcpts = Vec::new();
        let mut action = session.advance(&reply(250, &["sender ok"])).unwrap();
        while let Action::Send(Command::RcptTo { to }) = action {
            assert_eq!(session.state(), State::RcptTo);
            rcpts.push(to);
            action = session.advance(&reply(250, &["rcpt ok"])).unwrap();
        }
        assert_eq!(
            rcpts,
            vec!["a@example.com", "b@example.com", "hidden@example.com"]
        );
        assert_eq!(action, Action::Send(Command::Data));

        let Action::Send(Command::Payload(payload)) =
            session.advance(&reply(354, &["go ahead"])).unwrap()
        else {
            panic!("expected payload");
        };
        let text = String::from_utf8(payload).unwrap();
        assert!(text.ends_with("\n\r\n."));
        assert!(!text.contains("hidden@example.com"));
        assert_eq!(session.state(), State::FinishEmail);

        let Action::Delivered(accepted) = session.advance(&reply(250, &["queued"])).unwrap() else {
            panic!("expected delivery");
        };
        assert_eq!(accepted.message_text(), "queued");
        assert_eq!(session.state(), State::Closed);
        assert!(session.advance(&reply(250, &["late"])).is_err());
    }

    #[test]
    fn rejected_recipient_fails() {
        let options = options();
        let email = email();
        let mut session = Session::new(&options, true);
        session.advance(&reply(220, &["ready"])).unwrap();
        session.advance(&reply(250, &["host"])).unwrap();
        session.start_transaction(&email).unwrap();
        session.advance(&reply(250, &["ok"])).unwrap();
        let err = session.advance(&reply(550, &["no such user"])).unwrap_err();
        assert!(err.is_permanent());
    }

    #[test]
    fn data_refused_fails() {
        let options = options();
        let email = Email::new(Address::new("f@x")).to(Address::new("t@x"));
        let mut session = Session::new(&options, true);
        session.advance(&reply(220, &["ready"])).unwrap();
        session.advance(&reply(250, &["host"])).unwrap();
        session.start_transaction(&email).unwrap();
        session.advance(&reply(250, &["ok"])).unwrap();
        assert_eq!(session.advance(&reply(250, &["ok"])).unwrap(), Action::Send(Command::Data));
        assert!(session.advance(&reply(451, &["later"])).unwrap_err().is_transient());
    }

    #[test]
    fn oversized_message_is_still_sent() {
        let options = options();
        let email = Email::new(Address::new("f@x")).to(Address::new("t@x")).text("hi");
        let mut session = Session::new(&options, true);
        session.advance(&reply(220, &["ready"])).unwrap();
        session.advance(&reply(250, &["host", "SIZE 10"])).unwrap();
        assert_eq!(session.capabilities().max_message_size(), Some(10));
        session.start_transaction(&email).unwrap();
        session.advance(&reply(250, &["ok"])).unwrap();
        session.advance(&reply(250, &["ok"])).unwrap();
        assert!(matches!(
            session.advance(&reply(354, &["go"])).unwrap(),
            Action::Send(Command::Payload(payload)) if payload.len() > 10
        ));
    }

    #[test]
    fn data_accepts_2xx_go_ahead() {
        let options = options();
        let email = Email::new(Address::new("f@x")).to(Address::new("t@x"));
        let mut session = Session::new(&options, true);
        session.advance(&reply(220, &["ready"])).unwrap();
        session.advance(&reply(250, &["host"])).unwrap();
        session.start_transaction(&email).unwrap();
        session.advance(&reply(250, &["ok"])).unwrap();
        session.advance(&reply(250, &["ok"])).unwrap();
        assert!(matches!(
            session.advance(&reply(250, &["go"])).unwrap(),
            Action::Send(Command::Payload(_))
        ));
    }
}
