//! MIME header handling.

use std::fmt;

/// Ordered collection of email headers.
///
/// Headers are emitted in insertion order, each terminated by CRLF.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    headers: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Sets a header, replacing the first existing value in place
    /// (case-insensitive match) or appending it.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            slot.1 = value;
        } else {
            self.headers.push((name, value));
        }
    }

    /// Returns the number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Returns an iterator over all headers in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Appends every header of `other`.
    pub fn extend(&mut self, other: &Self) {
        self.headers.extend(other.headers.iter().cloned());
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.headers {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

/// Removes characters that would break header syntax from a header name.
pub(crate) fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_graphic() && *c != ':')
        .collect()
}

/// Removes line breaks from a header value.
pub(crate) fn sanitize_value(value: &str) -> String {
    value.chars().filter(|c| *c != '\r' && *c != '\n').collect()
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

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
        assert_eq!(headers.to_string(), "");
    }

    #[test]
    fn test_headers_add() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.to_string(), "Content-Type: text/plain\r\n");
    }

    #[test]
    fn test_headers_keep_insertion_order() {
        let mut headers = Headers::new();
        headers.add("Message-ID", "<1@host>");
        headers.add("Date", "Tue, 05 Mar 2024 07:08:09 +0000");
        headers.add("From", "a@example.com");

        assert_eq!(
            headers.to_string(),
            "Message-ID: <1@host>\r\nDate: Tue, 05 Mar 2024 07:08:09 +0000\r\nFrom: a@example.com\r\n"
        );
    }

    #[test]
    fn test_headers_set_replaces_in_place() {
        let mut headers = Headers::new();
        headers.add("X-First", "1");
        headers.add("X-Second", "2");
        headers.set("x-first", "one");
        headers.set("X-Third", "3");

        let names: Vec<_> = headers.iter().collect();
        assert_eq!(
            names,
            vec![("X-First", "one"), ("X-Second", "2"), ("X-Third", "3")]
        );
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_name("X-Bad Name:\r\n"), "X-BadName");
        assert_eq!(sanitize_value("a\r\nBcc: x"), "aBcc: x");
    }
}
