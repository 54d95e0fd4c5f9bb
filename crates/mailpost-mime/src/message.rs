//! Outgoing email and its MIME serialization.

use crate::address::Address;
use crate::attachment::Attachment;
use crate::clock::{Clock, SystemClock};
use crate::content_type::ContentType;
use crate::encoding::{dot_stuff, encode_folded};
use crate::error::{Error, Result};
use crate::header::{Headers, sanitize_name, sanitize_value};
use std::fmt::{self, Write as _};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Value of the `X-Mailer` header.
pub const MAILER: &str = concat!("mailpost ", env!("CARGO_PKG_VERSION"));

/// Fixed identity at the start of every generated boundary.
pub const BOUNDARY_PREFIX: &str = "mailpost";

/// Sequence every serialized payload ends with.
///
/// The SMTP client appends CRLF when transmitting, which completes the
/// `CRLF "." CRLF` end-of-data marker.
pub const DATA_TERMINATOR: &str = "\n\r\n.";

const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S +0000";

/// Charset encoded-words are emitted in. Rust strings are always UTF-8.
const WORD_CHARSET: &str = "utf-8";

/// Headers the builder writes itself; custom headers may not use them.
const RESERVED_HEADERS: [&str; 9] = [
    "Message-ID",
    "Date",
    "MIME-Version",
    "X-Mailer",
    "Subject",
    "From",
    "To",
    "Cc",
    "Bcc",
];

fn is_reserved_header(name: &str) -> bool {
    RESERVED_HEADERS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
        || name
            .get(..8)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("Content-"))
}

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit text.
    SevenBit,
    /// Base64 encoding.
    Base64,
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::Base64 => write!(f, "base64"),
        }
    }
}

/// Body layout, derived from which parts an email carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Headers only.
    Empty,
    /// Single text/plain part.
    Text,
    /// Single text/html part.
    Html,
    /// multipart/alternative with text then HTML.
    TextHtml,
    /// multipart/mixed with text then attachments.
    TextAttach,
    /// multipart/mixed with HTML then attachments.
    HtmlAttach,
    /// multipart/mixed wrapping a multipart/alternative, then attachments.
    TextHtmlAttach,
}

impl MessageKind {
    /// Classifies by part presence. Attachments with neither text nor HTML
    /// are sent alongside an empty text part.
    #[must_use]
    pub const fn classify(has_text: bool, has_html: bool, has_attachments: bool) -> Self {
        match (has_text, has_html, has_attachments) {
            (false, false, false) => Self::Empty,
            (true, false, false) => Self::Text,
            (false, true, false) => Self::Html,
            (true, true, false) => Self::TextHtml,
            (_, false, true) => Self::TextAttach,
            (false, true, true) => Self::HtmlAttach,
            (true, true, true) => Self::TextHtmlAttach,
        }
    }

    /// Returns true if the body is multipart.
    #[must_use]
    pub const fn is_multipart(self) -> bool {
        !matches!(self, Self::Empty | Self::Text | Self::Html)
    }
}

/// Returns the local host name, or `localhost` if it cannot be determined.
#[must_use]
pub fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// An email ready to be serialized into an SMTP DATA payload.
///
/// Bcc recipients are part of the envelope ([`Email::recipients`]) but never
/// appear in the serialized headers.
#[derive(Debug)]
pub struct Email {
    from: Address,
    to: Vec<Address>,
    cc: Vec<Address>,
    bcc: Vec<Address>,
    subject: String,
    text: Option<String>,
    html: Option<String>,
    attachments: Vec<Attachment>,
    message_id: Option<String>,
    x_headers: Headers,
    charset: String,
    sending_host: String,
    clock: Arc<dyn Clock>,
    boundaries: AtomicU64,
}

impl Email {
    /// Creates an email from `from` with no recipients or content.
    #[must_use]
    pub fn new(from: Address) -> Self {
        Self {
            from,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: String::new(),
            text: None,
            html: None,
            attachments: Vec::new(),
            message_id: None,
            x_headers: Headers::new(),
            charset: "utf-8".to_string(),
            sending_host: local_hostname(),
            clock: Arc::new(SystemClock),
            boundaries: AtomicU64::new(0),
        }
    }

    /// Adds a To recipient.
    #[must_use]
    pub fn to(mut self, address: Address) -> Self {
        self.to.push(address);
        self
    }

    /// Adds a Cc recipient.
    #[must_use]
    pub fn cc(mut self, address: Address) -> Self {
        self.cc.push(address);
        self
    }

    /// Adds a Bcc recipient.
    #[must_use]
    pub fn bcc(mut self, address: Address) -> Self {
        self.bcc.push(address);
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the plain text part.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the HTML part.
    #[must_use]
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Appends an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Uses `id` as the Message-ID instead of generating one.
    ///
    /// CR and LF are stripped; the value is otherwise emitted unchanged.
    #[must_use]
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(sanitize_value(&id.into()));
        self
    }

    /// Sets a custom header, emitted after MIME-Version in insertion order.
    ///
    /// Intended for `X-` extension headers. Setting the same name again
    /// replaces the earlier value in place. Names the builder emits itself
    /// (Message-ID, Date, MIME-Version, X-Mailer, Subject, From, To, Cc,
    /// Bcc and any `Content-*`) make [`Email::serialize`] fail with
    /// [`Error::InvalidHeader`].
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.x_headers
            .set(sanitize_name(name), sanitize_value(value));
        self
    }

    /// Sets the charset declared on text parts (default `utf-8`).
    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Sets the domain used in generated Message-IDs.
    #[must_use]
    pub fn sending_host(mut self, host: impl Into<String>) -> Self {
        self.sending_host = host.into();
        self
    }

    /// Replaces the time and randomness source.
    #[must_use]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Returns the sender.
    #[must_use]
    pub const fn from(&self) -> &Address {
        &self.from
    }

    /// Returns the envelope recipients: To, then Cc, then Bcc.
    pub fn recipients(&self) -> impl Iterator<Item = &Address> {
        self.to.iter().chain(&self.cc).chain(&self.bcc)
    }

    /// Returns the attachments.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Classifies the body layout.
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        MessageKind::classify(
            self.text.is_some(),
            self.html.is_some(),
            !self.attachments.is_empty(),
        )
    }

    /// Serializes the email to the exact bytes sent as SMTP DATA.
    ///
    /// Every call draws fresh boundaries, so repeated serializations of the
    /// same email never share a boundary string.
    ///
    /// # Errors
    ///
    /// Returns an error if an attachment source fails or a custom header
    /// name is empty after sanitization.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut headers = self.message_headers()?;
        let mut out = String::new();

        match self.kind() {
            MessageKind::Empty => {
                let _ = write!(out, "{headers}\r\n");
            }
            MessageKind::Text | MessageKind::Html => {
                let (content_type, body) = self.single_part();
                headers.add("Content-Type", content_type.to_string());
                headers.add(
                    "Content-Transfer-Encoding",
                    TransferEncoding::SevenBit.to_string(),
                );
                let _ = write!(out, "{headers}\r\n{}", dot_stuff(body));
            }
            MessageKind::TextHtml => {
                let boundary = self.next_boundary();
                headers.add(
                    "Content-Type",
                    ContentType::multipart_alternative(&boundary).to_string(),
                );
                let _ = write!(out, "{headers}\r\n");
                self.write_alternative(&mut out, &boundary);
            }
            MessageKind::TextAttach | MessageKind::HtmlAttach => {
                let boundary = self.next_boundary();
                headers.add(
                    "Content-Type",
                    ContentType::multipart_mixed(&boundary).to_string(),
                );
                let _ = write!(out, "{headers}\r\n--{boundary}\r\n");
                let (content_type, body) = self.single_part();
                write_text_part(&mut out, &content_type, body);
                self.write_attachments(&mut out, &boundary)?;
                let _ = write!(out, "--{boundary}--\r\n");
            }
            MessageKind::TextHtmlAttach => {
                let outer = self.next_boundary();
                let inner = self.next_boundary();
                headers.add(
                    "Content-Type",
                    ContentType::multipart_mixed(&outer).to_string(),
                );
                let _ = write!(
                    out,
                    "{headers}\r\n--{outer}\r\nContent-Type: {}\r\n\r\n",
                    ContentType::multipart_alternative(&inner)
                );
                self.write_alternative(&mut out, &inner);
                self.write_attachments(&mut out, &outer)?;
                let _ = write!(out, "--{outer}--\r\n");
            }
        }

        out.push_str(DATA_TERMINATOR);
        Ok(out.into_bytes())
    }

    /// Builds the top-level headers in their fixed order, without the
    /// body's Content-Type.
    fn message_headers(&self) -> Result<Headers> {
        let now = self.clock.now();
        let mut headers = Headers::new();

        let message_id = self.message_id.clone().unwrap_or_else(|| {
            format!(
                "<{:x}.{:x}@{}>",
                now.timestamp_micros(),
                self.clock.random(),
                self.sending_host
            )
        });
        headers.add("Message-ID", message_id);
        headers.add("Date", now.format(DATE_FORMAT).to_string());
        headers.add("MIME-Version", "1.0");

        if let Some((name, _)) = self
            .x_headers
            .iter()
            .find(|(n, _)| n.is_empty() || is_reserved_header(n))
        {
            return Err(Error::InvalidHeader(name.to_string()));
        }
        headers.extend(&self.x_headers);
        headers.add("X-Mailer", MAILER);

        if !self.subject.is_empty() {
            headers.add(
                "Subject",
                encode_folded(&self.subject, WORD_CHARSET, "Subject: ".len()),
            );
        }
        headers.add("From", self.from.to_header(WORD_CHARSET));
        if !self.to.is_empty() {
            headers.add("To", join_addresses(&self.to));
        }
        if !self.cc.is_empty() {
            headers.add("Cc", join_addresses(&self.cc));
        }

        Ok(headers)
    }

    fn single_part(&self) -> (ContentType, &str) {
        match (&self.text, &self.html) {
            (None, Some(html)) => (ContentType::text_html(&self.charset), html.as_str()),
            (text, _) => (
                ContentType::text_plain(&self.charset),
                text.as_deref().unwrap_or_default(),
            ),
        }
    }

    fn write_alternative(&self, out: &mut String, boundary: &str) {
        let text = self.text.as_deref().unwrap_or_default();
        let html = self.html.as_deref().unwrap_or_default();

        let _ = write!(out, "--{boundary}\r\n");
        write_text_part(out, &ContentType::text_plain(&self.charset), text);
        let _ = write!(out, "--{boundary}\r\n");
        write_text_part(out, &ContentType::text_html(&self.charset), html);
        let _ = write!(out, "--{boundary}--\r\n");
    }

    fn write_attachments(&self, out: &mut String, boundary: &str) -> Result<()> {
        for attachment in &self.attachments {
            let file_name = sanitize_file_name(attachment.file_name());
            let content_type = ContentType::parse_essence(attachment.mime_type())
                .with_parameter("name", file_name.as_str());

            let _ = write!(
                out,
                "--{boundary}\r\n\
                 Content-Type: {content_type}\r\n\
                 Content-Transfer-Encoding: {}\r\n\
                 Content-Disposition: attachment; filename=\"{file_name}\"\r\n\
                 \r\n\
                 {}\r\n",
                TransferEncoding::Base64,
                attachment.base64_lines()?
            );
        }
        Ok(())
    }

    fn next_boundary(&self) -> String {
        let n = self.boundaries.fetch_add(1, Ordering::Relaxed) + 1;
        format!(
            "{BOUNDARY_PREFIX}_{}_{n}",
            self.clock.now().timestamp_millis()
        )
    }
}

fn write_text_part(out: &mut String, content_type: &ContentType, body: &str) {
    let _ = write!(
        out,
        "Content-Type: {content_type}\r\n\
         Content-Transfer-Encoding: {}\r\n\
         \r\n\
         {}\r\n",
        TransferEncoding::SevenBit,
        dot_stuff(body)
    );
}

fn join_addresses(addresses: &[Address]) -> String {
    addresses
        .iter()
        .map(|a| a.to_header(WORD_CHARSET))
        .collect::<Vec<_>>()
        .join(", ")
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '\r' | '\n' | '"'))
        .collect()
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
    use crate::attachment::AttachmentSource;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use std::io;

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap(), 0xabc)
    }

    fn base() -> Email {
        Email::new(Address::new("alice@example.com"))
            .sending_host("mail.example.com")
            .clock(clock())
    }

    fn payload(email: &Email) -> String {
        String::from_utf8(email.serialize().unwrap()).unwrap()
    }

    fn boundaries(payload: &str) -> Vec<String> {
        payload
            .match_indices("boundary=\"")
            .map(|(i, m)| {
                let rest = &payload[i + m.len()..];
                rest[..rest.find('"').unwrap()].to_string()
            })
            .collect()
    }

    #[test]
    fn test_classify_all_kinds() {
        assert_eq!(MessageKind::classify(false, false, false), MessageKind::Empty);
        assert_eq!(MessageKind::classify(true, false, false), MessageKind::Text);
        assert_eq!(MessageKind::classify(false, true, false), MessageKind::Html);
        assert_eq!(MessageKind::classify(true, true, false), MessageKind::TextHtml);
        assert_eq!(MessageKind::classify(false, false, true), MessageKind::TextAttach);
        assert_eq!(MessageKind::classify(true, false, true), MessageKind::TextAttach);
        assert_eq!(MessageKind::classify(false, true, true), MessageKind::HtmlAttach);
        assert_eq!(
            MessageKind::classify(true, true, true),
            MessageKind::TextHtmlAttach
        );
    }

    #[test]
    fn test_text_only_payload_is_exact() {
        let email = base().to(Address::new("bob@example.com")).text("hi");
        assert_eq!(email.kind(), MessageKind::Text);

        let at = clock().at;
        let expected = format!(
            "Message-ID: <{:x}.abc@mail.example.com>\r\n\
             Date: Tue, 05 Mar 2024 07:08:09 +0000\r\n\
             MIME-Version: 1.0\r\n\
             X-Mailer: {MAILER}\r\n\
             From: alice@example.com\r\n\
             To: bob@example.com\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             Content-Transfer-Encoding: 7bit\r\n\
             \r\n\
             hi\n\r\n.",
            at.timestamp_micros()
        );
        assert_eq!(payload(&email), expected);
    }

    #[test]
    fn test_empty_payload() {
        let email = base();
        assert_eq!(email.kind(), MessageKind::Empty);
        let p = payload(&email);
        assert!(p.ends_with("From: alice@example.com\r\n\r\n\n\r\n."));
        assert!(!p.contains("Content-Type"));
    }

    #[test]
    fn test_header_order() {
        let email = base()
            .to(Address::new("to@example.com"))
            .cc(Address::new("cc@example.com"))
            .header("X-Priority", "1")
            .header("X-Campaign", "spring")
            .subject("Hello")
            .html("<p>hi</p>");
        let p = payload(&email);

        let order = [
            "Message-ID:",
            "Date:",
            "MIME-Version:",
            "X-Priority:",
            "X-Campaign:",
            "X-Mailer:",
            "Subject:",
            "From:",
            "To:",
            "Cc:",
            "Content-Type: text/html",
        ];
        let positions: Vec<usize> = order.iter().map(|h| p.find(h).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_bcc_never_in_headers() {
        let email = base()
            .to(Address::new("one@example.com"))
            .to(Address::new("two@example.com"))
            .bcc(Address::new("hidden@example.com"))
            .text("hi");

        let recipients: Vec<&str> = email.recipients().map(Address::addr_spec).collect();
        assert_eq!(
            recipients,
            vec!["one@example.com", "two@example.com", "hidden@example.com"]
        );

        let p = payload(&email);
        assert!(p.contains("To: one@example.com, two@example.com\r\n"));
        assert!(!p.contains("hidden@example.com"));
        assert!(!p.contains("Bcc"));
    }

    #[test]
    fn test_recipients_order() {
        let email = base()
            .bcc(Address::new("b@x"))
            .cc(Address::new("c@x"))
            .to(Address::new("t@x"));
        let recipients: Vec<&str> = email.recipients().map(Address::addr_spec).collect();
        assert_eq!(recipients, vec!["t@x", "c@x", "b@x"]);
    }

    #[test]
    fn test_custom_message_id_verbatim() {
        let email = base().message_id("<custom-id@example.org>");
        assert!(payload(&email).starts_with("Message-ID: <custom-id@example.org>\r\n"));
    }

    #[test]
    fn test_named_from_is_encoded() {
        let email = Email::new(Address::with_name("Alice", "alice@example.com")).clock(clock());
        assert!(payload(&email).contains("From: =?utf-8?B?QWxpY2U=?= <alice@example.com>\r\n"));
    }

    #[test]
    fn test_subject_folds() {
        let subject = "This subject is long enough that it has to be split across several encoded words";
        let p = payload(&base().subject(subject));
        let line_start = p.find("Subject: ").unwrap();
        let header_end = p[line_start..].find("\r\nFrom:").unwrap();
        let value = &p[line_start + "Subject: ".len()..line_start + header_end];

        assert!(value.contains("?=\r\n =?utf-8?B?"));
        assert!(value.split("\r\n").all(|l| l.len() <= 76));
    }

    #[test]
    fn test_empty_subject_omitted() {
        assert!(!payload(&base().text("x")).contains("Subject:"));
    }

    #[test]
    fn test_x_header_replaced_in_place() {
        let email = base()
            .header("X-A", "1")
            .header("X-B", "2")
            .header("x-a", "3");
        let p = payload(&email);
        assert!(p.contains("X-A: 3\r\nX-B: 2\r\nX-Mailer:"));
    }

    #[test]
    fn test_invalid_header_name() {
        let email = base().header("\r\n", "value");
        assert!(matches!(email.serialize(), Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_builder_owned_header_names_rejected() {
        for name in ["Bcc", "subject", "FROM", "Message-ID", "Content-Type", "content-transfer-encoding"] {
            let email = base().header(name, "value");
            assert!(
                matches!(email.serialize(), Err(Error::InvalidHeader(ref n)) if n.eq_ignore_ascii_case(name)),
                "{name} accepted"
            );
        }
    }

    #[test]
    fn test_message_id_line_breaks_stripped() {
        let email = base().message_id("<abc@example.org>\r\nBcc: x@evil.test");
        let p = payload(&email);
        assert!(p.starts_with("Message-ID: <abc@example.org>Bcc: x@evil.test\r\n"));
        assert!(!p.contains("\r\nBcc:"));
    }

    #[test]
    fn test_text_html_alternative() {
        let email = base().text("plain").html("<b>rich</b>");
        assert_eq!(email.kind(), MessageKind::TextHtml);
        let p = payload(&email);

        let b = &boundaries(&p)[0];
        assert_eq!(b, &format!("{BOUNDARY_PREFIX}_{}_1", clock().at.timestamp_millis()));
        assert!(p.contains("Content-Type: multipart/alternative; boundary="));
        let text_at = p.find("Content-Type: text/plain").unwrap();
        let html_at = p.find("Content-Type: text/html").unwrap();
        assert!(text_at < html_at);
        assert!(p.contains(&format!("\r\n<b>rich</b>\r\n--{b}--\r\n\n\r\n.")));
    }

    #[test]
    fn test_attachment_part() {
        let email = base()
            .text("see attached")
            .attach(Attachment::from_bytes("notes.txt", b"hello".to_vec()));
        let p = payload(&email);
        let b = &boundaries(&p)[0];

        assert!(p.contains("Content-Type: multipart/mixed; boundary="));
        let part = format!(
            "--{b}\r\n\
             Content-Type: text/plain; name=\"notes.txt\"\r\n\
             Content-Transfer-Encoding: base64\r\n\
             Content-Disposition: attachment; filename=\"notes.txt\"\r\n\
             \r\n\
             aGVsbG8=\r\n\
             --{b}--\r\n"
        );
        assert!(p.contains(&part));
    }

    #[test]
    fn test_attachment_only_gets_empty_text_part() {
        let email = base().attach(Attachment::from_bytes("a.bin", vec![0, 1]));
        assert_eq!(email.kind(), MessageKind::TextAttach);
        let p = payload(&email);
        assert!(p.contains("Content-Type: text/plain; charset=utf-8\r\nContent-Transfer-Encoding: 7bit\r\n\r\n\r\n--"));
        assert!(p.contains("Content-Type: application/octet-stream; name=\"a.bin\""));
    }

    #[test]
    fn test_html_attach() {
        let email = base()
            .html("<i>x</i>")
            .attach(Attachment::from_bytes("a.png", vec![1]));
        assert_eq!(email.kind(), MessageKind::HtmlAttach);
        let p = payload(&email);
        assert!(p.contains("Content-Type: text/html; charset=utf-8"));
        assert!(!p.contains("text/plain"));
    }

    #[test]
    fn test_text_html_attach_nests_boundaries() {
        let email = base()
            .text("t")
            .html("h")
            .attach(Attachment::from_bytes("a.pdf", vec![1, 2]))
            .attach(Attachment::from_bytes("b.pdf", vec![3]));
        assert_eq!(email.kind(), MessageKind::TextHtmlAttach);
        let p = payload(&email);

        let found = boundaries(&p);
        assert_eq!(found.len(), 2);
        let (outer, inner) = (&found[0], &found[1]);
        assert_ne!(outer, inner);

        assert!(p.contains(&format!(
            "--{outer}\r\nContent-Type: multipart/alternative; boundary=\"{inner}\"\r\n\r\n--{inner}\r\n"
        )));
        let inner_close = p.find(&format!("--{inner}--\r\n")).unwrap();
        let first_attachment = p.find("name=\"a.pdf\"").unwrap();
        let outer_close = p.find(&format!("--{outer}--\r\n")).unwrap();
        assert!(inner_close < first_attachment);
        assert!(first_attachment < outer_close);
        assert_eq!(p.matches(&format!("--{outer}\r\n")).count(), 3);
    }

    #[test]
    fn test_repeated_serialization_uses_new_boundaries() {
        let email = base().text("t").html("h");
        let first = boundaries(&payload(&email));
        let second = boundaries(&payload(&email));
        assert_ne!(first, second);
        assert!(second[0].ends_with("_2"));
    }

    #[test]
    fn test_body_is_dot_stuffed() {
        let email = base().text("line\r\n.\r\nmore");
        let p = payload(&email);
        assert!(p.contains("line\r\n..\r\nmore\n\r\n."));
    }

    #[test]
    fn test_attachment_source_error_propagates() {
        #[derive(Debug)]
        struct Failing;
        impl AttachmentSource for Failing {
            fn read(&self) -> io::Result<Vec<u8>> {
                Err(io::Error::other("disk on fire"))
            }
        }

        let email = base().attach(Attachment::from_source("x.txt", Failing));
        assert!(matches!(email.serialize(), Err(Error::Attachment { .. })));
    }

    #[test]
    fn test_file_name_quotes_stripped() {
        let email = base().attach(Attachment::from_bytes("we\"ird\r\n.txt", vec![]));
        assert!(payload(&email).contains("filename=\"weird.txt\""));
    }

    #[test]
    fn test_generated_message_id_with_system_clock() {
        let email = Email::new(Address::new("a@b")).sending_host("host.example");
        let p = payload(&email);
        let line = p.lines().next().unwrap();
        assert!(line.starts_with("Message-ID: <"));
        assert!(line.ends_with("@host.example>"));
    }

    proptest! {
        #[test]
        fn classification_matches_presence(text in any::<bool>(), html in any::<bool>(), attach in any::<bool>()) {
            let mut email = base();
            if text { email = email.text("t"); }
            if html { email = email.html("h"); }
            if attach { email = email.attach(Attachment::from_bytes("f", vec![1])); }
            prop_assert_eq!(email.kind(), MessageKind::classify(text, html, attach));
            prop_assert_eq!(email.kind().is_multipart(), (text && html) || attach);
        }

        #[test]
        fn payload_always_terminated(subject in "\\PC{0,100}", body in "\\PC{0,200}", attach in any::<bool>()) {
            let mut email = base().subject(subject).text(body);
            if attach { email = email.attach(Attachment::from_bytes("f.bin", vec![9; 50])); }
            let bytes = email.serialize().unwrap();
            prop_assert!(bytes.ends_with(DATA_TERMINATOR.as_bytes()));
        }

        #[test]
        fn boundaries_strictly_increase(n in 1usize..8) {
            let email = base().text("t").html("h");
            let counters: Vec<u64> = (0..n)
                .map(|_| {
                    let b = boundaries(&payload(&email)).remove(0);
                    b.rsplit('_').next().unwrap().parse().unwrap()
                })
                .collect();
            prop_assert!(counters.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
