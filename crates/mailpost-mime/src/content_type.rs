//! MIME content type handling.

use std::fmt;

/// MIME content type with ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters in emission order (e.g., charset=utf-8, boundary=xxx).
    pub parameters: Vec<(String, String)>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: Vec::new(),
        }
    }

    /// Parses a bare `type/subtype` string, ignoring any parameters.
    ///
    /// Falls back to `application/octet-stream` for malformed input.
    #[must_use]
    pub fn parse_essence(s: &str) -> Self {
        let essence = s.split(';').next().unwrap_or_default().trim();
        match essence.split_once('/') {
            Some((main, sub)) if !main.is_empty() && !sub.is_empty() => {
                Self::new(main.to_lowercase(), sub.to_lowercase())
            }
            _ => Self::new("application", "octet-stream"),
        }
    }

    /// Creates a text/plain content type.
    #[must_use]
    pub fn text_plain(charset: &str) -> Self {
        Self::new("text", "plain").with_parameter("charset", charset)
    }

    /// Creates a text/html content type.
    #[must_use]
    pub fn text_html(charset: &str) -> Self {
        Self::new("text", "html").with_parameter("charset", charset)
    }

    /// Creates a multipart/mixed content type with boundary.
    #[must_use]
    pub fn multipart_mixed(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "mixed").with_parameter("boundary", boundary)
    }

    /// Creates a multipart/alternative content type with boundary.
    #[must_use]
    pub fn multipart_alternative(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "alternative").with_parameter("boundary", boundary)
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)?;

        for (key, value) in &self.parameters {
            // charset values are plain tokens; names and boundaries are quoted
            if key.eq_ignore_ascii_case("charset") {
                write!(f, "; {key}={value}")?;
            } else {
                write!(f, "; {key}=\"{value}\"")?;
            }
        }

        Ok(())
    }
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
    fn test_text_plain_display() {
        assert_eq!(
            ContentType::text_plain("utf-8").to_string(),
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn test_multipart_display_quotes_boundary() {
        let ct = ContentType::multipart_mixed("mailpost_1_1");
        assert_eq!(
            ct.to_string(),
            "multipart/mixed; boundary=\"mailpost_1_1\""
        );
    }

    #[test]
    fn test_parameter_order_preserved() {
        let ct = ContentType::new("image", "png")
            .with_parameter("name", "a.png")
            .with_parameter("x-extra", "1");
        assert_eq!(ct.to_string(), "image/png; name=\"a.png\"; x-extra=\"1\"");
    }

    #[test]
    fn test_parse_essence() {
        let ct = ContentType::parse_essence("Image/PNG; name=x");
        assert_eq!(ct.main_type, "image");
        assert_eq!(ct.sub_type, "png");
        assert!(ct.parameters.is_empty());

        let ct = ContentType::parse_essence("garbage");
        assert_eq!(ct.to_string(), "application/octet-stream");
    }
}
