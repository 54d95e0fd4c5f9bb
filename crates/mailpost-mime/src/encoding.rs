//! MIME encoding utilities.
//!
//! Supports Base64 body encoding, RFC 2047 header encoding with folding,
//! and SMTP dot-stuffing.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::borrow::Cow;

/// Maximum line length for encoded bodies and folded headers.
pub const MAX_LINE_LENGTH: usize = 76;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 wrapped into 76-character lines joined by CRLF.
///
/// There is no trailing line break after the last line.
#[must_use]
pub fn encode_base64_lines(data: &[u8]) -> String {
    let encoded = encode_base64(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2);

    // Base64 output is pure ASCII, so byte chunks are valid char boundaries.
    for (i, line) in encoded.as_bytes().chunks(MAX_LINE_LENGTH).enumerate() {
        if i > 0 {
            result.push_str("\r\n");
        }
        result.push_str(&String::from_utf8_lossy(line));
    }

    result
}

/// Encodes text as a single RFC 2047 encoded-word.
///
/// Format: `=?charset?B?encoded-text?=`
#[must_use]
pub fn encode_word(text: &str, charset: &str) -> String {
    format!("=?{charset}?B?{}?=", encode_base64(text.as_bytes()))
}

/// Encodes a header value as RFC 2047 encoded-words folded to fit 76 columns.
///
/// The text is split on character boundaries so each encoded-word decodes
/// on its own. Words are joined with `CRLF SP`. `prefix_len` is the width
/// of whatever precedes the value on the first line (e.g. `"Subject: "`).
#[must_use]
pub fn encode_folded(text: &str, charset: &str, prefix_len: usize) -> String {
    // "=?" + charset + "?B?" + "?="
    let overhead = charset.len() + 7;
    let room = MAX_LINE_LENGTH.saturating_sub(prefix_len.max(1) + overhead);
    // Four bytes always fit one UTF-8 character, so every chunk makes progress.
    let max_bytes = (room / 4 * 3).max(4);

    let mut words = Vec::new();
    let mut start = 0;
    let mut len = 0;

    for (idx, ch) in text.char_indices() {
        let width = ch.len_utf8();
        if len > 0 && len + width > max_bytes {
            words.push(encode_word(&text[start..idx], charset));
            start = idx;
            len = 0;
        }
        len += width;
    }
    if len > 0 {
        words.push(encode_word(&text[start..], charset));
    }

    words.join("\r\n ")
}

/// Doubles the leading `.` of every line so body content cannot end the
/// SMTP DATA segment early.
#[must_use]
pub fn dot_stuff(text: &str) -> Cow<'_, str> {
    if !text.starts_with('.') && !text.contains("\n.") {
        return Cow::Borrowed(text);
    }

    let mut result = String::with_capacity(text.len() + 8);
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            result.push('\n');
        }
        if line.starts_with('.') {
            result.push('.');
        }
        result.push_str(line);
    }

    Cow::Owned(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decode_words(folded: &str) -> String {
        let mut bytes = Vec::new();
        for word in folded.split("\r\n ") {
            let inner = word
                .strip_prefix("=?utf-8?B?")
                .and_then(|w| w.strip_suffix("?="))
                .unwrap();
            bytes.extend(STANDARD.decode(inner).unwrap());
        }
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_base64_encode() {
        assert_eq!(encode_base64(b"Hello, World!"), "SGVsbG8sIFdvcmxkIQ==");
    }

    #[test]
    fn test_base64_lines_wrap_at_76() {
        let data = vec![0xAB_u8; 200];
        let encoded = encode_base64_lines(&data);
        let lines: Vec<&str> = encoded.split("\r\n").collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[..3].iter().all(|l| l.len() == 76));
        assert!(lines[3].len() <= 76);
        assert!(!encoded.ends_with("\r\n"));
        assert_eq!(STANDARD.decode(lines.concat()).unwrap(), data);
    }

    #[test]
    fn test_base64_lines_short_input() {
        assert_eq!(encode_base64_lines(b"hi"), "aGk=");
        assert_eq!(encode_base64_lines(b""), "");
    }

    #[test]
    fn test_encode_word() {
        assert_eq!(encode_word("Héllo", "utf-8"), "=?utf-8?B?SMOpbGxv?=");
    }

    #[test]
    fn test_short_subject_single_word() {
        let folded = encode_folded("Hello", "utf-8", 9);
        assert_eq!(folded, "=?utf-8?B?SGVsbG8=?=");
    }

    #[test]
    fn test_long_subject_folds() {
        let subject = "A fairly long subject line that will certainly need more than one encoded word";
        let folded = encode_folded(subject, "utf-8", 9);

        assert!(folded.contains("\r\n "));
        assert!(folded.split("\r\n ").count() > 1);
        for word in folded.split("\r\n ") {
            assert!(word.starts_with("=?utf-8?B?"));
            assert!(word.ends_with("?="));
        }
        assert_eq!(decode_words(&folded), subject);
    }

    #[test]
    fn test_fold_never_splits_characters() {
        let subject = "日本語のメールの件名はとても長くなることがありますので折り返します";
        let folded = encode_folded(subject, "utf-8", 9);
        for word in folded.split("\r\n ") {
            let inner = &word[10..word.len() - 2];
            assert!(String::from_utf8(STANDARD.decode(inner).unwrap()).is_ok());
        }
        assert_eq!(decode_words(&folded), subject);
    }

    #[test]
    fn test_dot_stuff() {
        assert_eq!(dot_stuff("plain"), "plain");
        assert!(matches!(dot_stuff("plain\ntext"), Cow::Borrowed(_)));
        assert_eq!(dot_stuff(".leading"), "..leading");
        assert_eq!(dot_stuff("a\r\n.\r\nb"), "a\r\n..\r\nb");
    }

    proptest! {
        #[test]
        fn folded_lines_fit_and_round_trip(subject in "\\PC{1,200}") {
            let folded = encode_folded(&subject, "utf-8", 9);
            let mut lines = folded.split("\r\n");
            let first = lines.next().unwrap();
            prop_assert!(first.len() + 9 <= MAX_LINE_LENGTH);
            for line in lines {
                prop_assert!(line.starts_with(' '));
                prop_assert!(line.len() <= MAX_LINE_LENGTH);
            }
            prop_assert_eq!(decode_words(&folded), subject);
        }
    }
}
