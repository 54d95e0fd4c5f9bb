//! Connection options.

use std::fmt;
use std::time::Duration;

/// Port for implicit TLS (SMTPS).
pub const IMPLICIT_TLS_PORT: u16 = 465;

/// Port for submission with STARTTLS.
pub const SUBMISSION_PORT: u16 = 587;

/// Wall-clock window for one send, from socket connect to final reply.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Username and password for AUTH LOGIN.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// SMTP connection options. Immutable once built.
#[derive(Debug, Clone)]
pub struct Options {
    host: String,
    port: u16,
    secure: bool,
    ignore_bad_certificate: bool,
    local_name: String,
    credentials: Option<Credentials>,
    timeout: Duration,
}

impl Options {
    /// Creates options for implicit TLS on port 465, no credentials.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self::builder(host).build()
    }

    /// Creates an options builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> OptionsBuilder {
        OptionsBuilder::new(host)
    }

    /// Returns the default port for a security mode.
    #[must_use]
    pub const fn default_port(secure: bool) -> u16 {
        if secure {
            IMPLICIT_TLS_PORT
        } else {
            SUBMISSION_PORT
        }
    }

    /// Server hostname, also used for TLS server name verification.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Server port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Whether the connection starts TLS-wrapped.
    #[must_use]
    pub const fn secure(&self) -> bool {
        self.secure
    }

    /// Whether invalid server certificates are accepted.
    #[must_use]
    pub const fn ignore_bad_certificate(&self) -> bool {
        self.ignore_bad_certificate
    }

    /// Name advertised in EHLO/HELO.
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Credentials for AUTH LOGIN, if any.
    #[must_use]
    pub const fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Time allowed for one send.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Builder for [`Options`].
#[derive(Debug, Clone)]
pub struct OptionsBuilder {
    host: String,
    port: Option<u16>,
    secure: bool,
    ignore_bad_certificate: bool,
    local_name: Option<String>,
    credentials: Option<Credentials>,
    timeout: Duration,
}

impl OptionsBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            secure: true,
            ignore_bad_certificate: false,
            local_name: None,
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the port. Defaults to 465.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Chooses implicit TLS (`true`) or plaintext with STARTTLS (`false`).
    #[must_use]
    pub const fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Accepts any server certificate and host name.
    #[must_use]
    pub const fn ignore_bad_certificate(mut self, ignore: bool) -> Self {
        self.ignore_bad_certificate = ignore;
        self
    }

    /// Sets the name advertised in EHLO/HELO. Defaults to the local hostname.
    #[must_use]
    pub fn local_name(mut self, name: impl Into<String>) -> Self {
        self.local_name = Some(name.into());
        self
    }

    /// Sets the AUTH LOGIN credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Sets the send timeout. Defaults to 60 seconds.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the options.
    #[must_use]
    pub fn build(self) -> Options {
        Options {
            host: self.host,
            port: self.port.unwrap_or(IMPLICIT_TLS_PORT),
            secure: self.secure,
            ignore_bad_certificate: self.ignore_bad_certificate,
            local_name: self
                .local_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(mailpost_mime::local_hostname),
            credentials: self.credentials,
            timeout: self.timeout,
        }
    }
}
