//! SMTP reply parser and incremental reassembly.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Parses an SMTP reply from response lines.
///
/// SMTP replies can be single-line or multi-line:
/// - Single: `250 OK\r\n`
/// - Multi: `250-First line\r\n250-Second line\r\n250 Last line\r\n`
///
/// # Errors
///
/// Returns an error if the reply is malformed.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    if lines.is_empty() {
        return Err(Error::Protocol("Empty reply".into()));
    }

    let first = &lines[0];
    let code_str = first
        .get(0..3)
        .ok_or_else(|| Error::Protocol(format!("Reply too short: {first}")))?;
    let code = code_str
        .parse::<u16>()
        .map_err(|_| Error::Protocol(format!("Invalid reply code: {code_str}")))?;

    let mut message = Vec::with_capacity(lines.len());
    for line in lines {
        if line.len() == 3 {
            message.push(String::new());
        } else if line.len() >= 4 && line.is_char_boundary(4) {
            // Skip code and separator (e.g., "250-" or "250 ")
            message.push(line[4..].to_string());
        } else {
            return Err(Error::Protocol(format!("Malformed reply line: {line}")));
        }
    }

    Ok(Reply::new(ReplyCode::new(code), message))
}

/// Checks if a line is the final line of a reply.
///
/// Continuation lines carry `-` after the code; the final line carries a
/// space or ends right after the code.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes.len() >= 3
        && bytes[..3].iter().all(u8::is_ascii_digit)
        && bytes.get(3).is_none_or(|&b| b == b' ')
}

/// Checks if buffered bytes hold a complete reply: they end in a line
/// terminator and the last line is a final reply line.
#[must_use]
pub fn is_complete_reply(buf: &[u8]) -> bool {
    let Some(body) = buf.strip_suffix(b"\n") else {
        return false;
    };
    let body = body.strip_suffix(b"\r").unwrap_or(body);
    let last = body
        .rsplit(|&b| b == b'\n')
        .next()
        .unwrap_or_default();
    is_last_reply_line(&String::from_utf8_lossy(last))
}

/// Accumulates transport reads until a complete reply is available.
#[derive(Debug, Default)]
pub struct ReplyBuffer {
    buf: Vec<u8>,
}

impl ReplyBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends bytes from one read.
    ///
    /// Returns the parsed reply and clears the buffer once the data forms a
    /// complete reply; returns `None` while more data is needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the completed reply is malformed.
    pub fn push(&mut self, data: &[u8]) -> Result<Option<Reply>> {
        self.buf.extend_from_slice(data);
        if !is_complete_reply(&self.buf) {
            return Ok(None);
        }

        let text = String::from_utf8_lossy(&self.buf);
        let lines: Vec<String> = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        self.buf.clear();

        parse_reply(&lines).map(Some)
    }

    /// Returns true if no partial reply is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_single_line_reply() {
        let lines = vec!["250 OK".to_string()];
        let reply = parse_reply(&lines).unwrap();
        assert_eq!(reply.code.as_u16(), 250);
        assert_eq!(reply.message, vec!["OK"]);
        assert!(reply.is_success());
    }

    #[test]
    fn test_parse_multi_line_reply() {
        let lines = vec![
            "250-First line".to_string(),
            "250-Second line".to_string(),
            "250 Last line".to_string(),
        ];
        let reply = parse_reply(&lines).unwrap();
        assert_eq!(reply.code.as_u16(), 250);
        assert_eq!(
            reply.message,
            vec!["First line", "Second line", "Last line"]
        );
    }

    #[test]
    fn test_parse_bare_code() {
        let reply = parse_reply(&["250".to_string()]).unwrap();
        assert_eq!(reply.message, vec![""]);
    }

    #[test]
    fn test_is_last_reply_line() {
        assert!(is_last_reply_line("250 OK"));
        assert!(is_last_reply_line("250"));
        assert!(!is_last_reply_line("250-Continuing"));
        assert!(!is_last_reply_line("25"));
        assert!(!is_last_reply_line("ABC OK"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_reply(&[]).is_err());
        assert!(parse_reply(&["25".to_string()]).is_err());
        assert!(parse_reply(&["ABC OK".to_string()]).is_err());
    }

    #[test]
    fn test_is_complete_reply() {
        assert!(!is_complete_reply(b""));
        assert!(!is_complete_reply(b"220 ready"));
        assert!(is_complete_reply(b"220 ready\r\n"));
        assert!(is_complete_reply(b"220 ready\n"));
        assert!(!is_complete_reply(b"250-host\r\n"));
        assert!(!is_complete_reply(b"250-host\r\n250-STARTTLS\r\n"));
        assert!(is_complete_reply(b"250-host\r\n250 STARTTLS\r\n"));
    }

    #[test]
    fn test_buffer_waits_for_terminator() {
        let mut buffer = ReplyBuffer::new();
        assert!(buffer.push(b"220 smtp.exa").unwrap().is_none());
        assert!(!buffer.is_empty());
        let reply = buffer.push(b"mple.com ready\r\n").unwrap().unwrap();
        assert_eq!(reply.code.as_u16(), 220);
        assert_eq!(reply.message, vec!["smtp.example.com ready"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_buffer_waits_for_final_line() {
        let mut buffer = ReplyBuffer::new();
        assert!(buffer.push(b"250-smtp.example.com\r\n").unwrap().is_none());
        assert!(buffer.push(b"250-STARTTLS\r\n250-AU").unwrap().is_none());
        assert!(buffer.push(b"TH LOGIN\r\n").unwrap().is_none());
        let reply = buffer.push(b"250 SIZE 1000\r\n").unwrap().unwrap();
        assert_eq!(
            reply.message,
            vec!["smtp.example.com", "STARTTLS", "AUTH LOGIN", "SIZE 1000"]
        );
    }

    #[test]
    fn test_buffer_clears_after_malformed_reply() {
        let mut buffer = ReplyBuffer::new();
        assert!(buffer.push(b"xx\r\n250 OK\r\n").is_err());
        assert!(buffer.is_empty());
        assert!(buffer.push(b"250 OK\r\n").unwrap().is_some());
    }

    proptest! {
        #[test]
        fn fragmentation_does_not_change_result(split in proptest::collection::vec(1usize..12, 0..10)) {
            let wire = b"250-smtp.example.com greets you\r\n250-STARTTLS\r\n250-AUTH PLAIN LOGIN\r\n250 8BITMIME\r\n";
            let mut buffer = ReplyBuffer::new();
            let mut rest: &[u8] = wire;
            let mut replies = Vec::new();
            for n in split {
                let n = n.min(rest.len());
                let (chunk, tail) = rest.split_at(n);
                if let Some(reply) = buffer.push(chunk).unwrap() {
                    replies.push(reply);
                }
                rest = tail;
            }
            if let Some(reply) = buffer.push(rest).unwrap() {
                replies.push(reply);
            }
            prop_assert_eq!(replies.len(), 1);
            prop_assert_eq!(replies[0].message.len(), 4);
        }
    }
}
