//! Email address types.

use crate::encoding::encode_word;
use std::fmt;

/// Characters that can never appear in a sanitized address field.
const FORBIDDEN: [char; 7] = ['\r', '\n', '\t', '"', ',', '<', '>'];

/// Mailbox: an addr-spec plus an optional display name.
///
/// Both fields are sanitized on construction. Characters that could break
/// out of a header or an SMTP envelope command are stripped, never escaped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    addr_spec: String,
    display_name: String,
}

impl Address {
    /// Creates an address without a display name.
    #[must_use]
    pub fn new(addr_spec: impl AsRef<str>) -> Self {
        Self {
            addr_spec: sanitize(addr_spec.as_ref()),
            display_name: String::new(),
        }
    }

    /// Creates an address with a display name.
    #[must_use]
    pub fn with_name(display_name: impl AsRef<str>, addr_spec: impl AsRef<str>) -> Self {
        Self {
            addr_spec: sanitize(addr_spec.as_ref()),
            display_name: sanitize(display_name.as_ref()),
        }
    }

    /// Parses `Display Name <user@example.com>` or a bare addr-spec.
    ///
    /// Surrounding quotes on the display name are dropped.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match (input.find('<'), input.rfind('>')) {
            (Some(open), Some(close)) if open < close => {
                let name = input[..open].trim().trim_matches('"').trim();
                let addr = input[open + 1..close].trim();
                Self::with_name(name, addr)
            }
            _ => Self::new(input),
        }
    }

    /// Returns the sanitized addr-spec (used in the SMTP envelope).
    #[must_use]
    pub fn addr_spec(&self) -> &str {
        &self.addr_spec
    }

    /// Returns the sanitized display name, empty if none.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Checks the addr-spec shape: exactly one `@` with non-empty local
    /// and domain parts.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self.addr_spec.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && !domain.is_empty() && !domain.contains('@')
            }
            None => false,
        }
    }

    /// Renders the address for a header using the given charset.
    ///
    /// An empty display name yields the bare addr-spec; otherwise the name
    /// becomes an RFC 2047 encoded-word followed by `<addr-spec>`.
    #[must_use]
    pub fn to_header(&self, charset: &str) -> String {
        if self.display_name.is_empty() {
            self.addr_spec.clone()
        } else {
            format!(
                "{} <{}>",
                encode_word(&self.display_name, charset),
                self.addr_spec
            )
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header("utf-8"))
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// Strips every character that is not allowed in an address field.
#[must_use]
pub(crate) fn sanitize(input: &str) -> String {
    input.chars().filter(|c| !FORBIDDEN.contains(c)).collect()
}
