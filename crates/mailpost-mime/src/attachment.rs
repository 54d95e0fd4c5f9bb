//! Attachments and their content sources.

use crate::encoding::encode_base64_lines;
use crate::error::{Error, Result};
use std::borrow::Cow;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Fallback MIME type when none can be determined.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Lazily-read attachment content.
///
/// The source is read each time the message is serialized.
pub trait AttachmentSource: Send + Sync + fmt::Debug {
    /// Reads the full content.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be read.
    fn read(&self) -> io::Result<Vec<u8>>;
}

/// Attachment source backed by a file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Creates a source reading from `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AttachmentSource for FileSource {
    fn read(&self) -> io::Result<Vec<u8>> {
        std::fs::read(&self.path)
    }
}

#[derive(Debug, Clone)]
enum Content {
    Memory(Vec<u8>),
    Source(Arc<dyn AttachmentSource>),
}

/// A file attached to an email.
#[derive(Debug, Clone)]
pub struct Attachment {
    file_name: String,
    mime_type: String,
    content: Content,
}

impl Attachment {
    /// Creates an attachment from an in-memory buffer.
    ///
    /// The MIME type is guessed from the file extension.
    #[must_use]
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        Self {
            mime_type: guess_mime_type(&file_name).to_string(),
            file_name,
            content: Content::Memory(bytes),
        }
    }

    /// Creates an attachment whose content is read from `source` on demand.
    #[must_use]
    pub fn from_source(file_name: impl Into<String>, source: impl AttachmentSource + 'static) -> Self {
        let file_name = file_name.into();
        Self {
            mime_type: guess_mime_type(&file_name).to_string(),
            file_name,
            content: Content::Source(Arc::new(source)),
        }
    }

    /// Creates an attachment that reads `path` when the message is serialized.
    ///
    /// The file name is the last path component.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map_or_else(|| "attachment".to_string(), |n| n.to_string_lossy().into_owned());
        Self::from_source(file_name, FileSource::new(path))
    }

    /// Overrides the MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        self.mime_type = if mime_type.trim().is_empty() {
            DEFAULT_MIME_TYPE.to_string()
        } else {
            mime_type
        };
        self
    }

    /// Returns the file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Returns the MIME type.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Returns the raw content.
    ///
    /// # Errors
    ///
    /// Returns an error if a lazy source fails to read.
    pub fn bytes(&self) -> Result<Cow<'_, [u8]>> {
        match &self.content {
            Content::Memory(bytes) => Ok(Cow::Borrowed(bytes)),
            Content::Source(source) => source.read().map(Cow::Owned).map_err(|source| {
                Error::Attachment {
                    file_name: self.file_name.clone(),
                    source,
                }
            }),
        }
    }

    /// Returns the content as base64 in 76-character lines joined by CRLF.
    ///
    /// # Errors
    ///
    /// Returns an error if a lazy source fails to read.
    pub fn base64_lines(&self) -> Result<String> {
        Ok(encode_base64_lines(&self.bytes()?))
    }
}

/// Guesses a MIME type from a file extension.
#[must_use]
pub fn guess_mime_type(file_name: &str) -> &'static str {
    let Some((_, ext)) = file_name.rsplit_once('.') else {
        return DEFAULT_MIME_TYPE;
    };

    match ext.to_ascii_lowercase().as_str() {
        "txt" | "text" | "log" => "text/plain",
        "htm" | "html" => "text/html",
        "csv" => "text/csv",
        "ics" => "text/calendar",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        _ => DEFAULT_MIME_TYPE,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Broken;

    impl AttachmentSource for Broken {
        fn read(&self) -> io::Result<Vec<u8>> {
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"))
        }
    }

    #[derive(Debug)]
    struct Static(&'static [u8]);

    impl AttachmentSource for Static {
        fn read(&self) -> io::Result<Vec<u8>> {
            Ok(self.0.to_vec())
        }
    }

    #[test]
    fn test_from_bytes_guesses_type() {
        let att = Attachment::from_bytes("photo.JPG", vec![1, 2, 3]);
        assert_eq!(att.file_name(), "photo.JPG");
        assert_eq!(att.mime_type(), "image/jpeg");
        assert_eq!(&*att.bytes().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_unknown_type_defaults() {
        assert_eq!(guess_mime_type("data.bin"), DEFAULT_MIME_TYPE);
        assert_eq!(guess_mime_type("README"), DEFAULT_MIME_TYPE);
    }

    #[test]
    fn test_with_mime_type() {
        let att = Attachment::from_bytes("a", vec![]).with_mime_type("text/x-rust");
        assert_eq!(att.mime_type(), "text/x-rust");

        let att = Attachment::from_bytes("a.txt", vec![]).with_mime_type("  ");
        assert_eq!(att.mime_type(), DEFAULT_MIME_TYPE);
    }

    #[test]
    fn test_lazy_source() {
        let att = Attachment::from_source("hello.txt", Static(b"hello"));
        assert_eq!(att.mime_type(), "text/plain");
        assert_eq!(att.base64_lines().unwrap(), "aGVsbG8=");
    }

    #[test]
    fn test_lazy_source_error() {
        let att = Attachment::from_source("missing.pdf", Broken);
        let err = att.bytes().unwrap_err();
        assert!(matches!(err, Error::Attachment { ref file_name, .. } if file_name == "missing.pdf"));
    }

    #[test]
    fn test_from_path_missing_file() {
        let att = Attachment::from_path("/nonexistent/dir/report.pdf");
        assert_eq!(att.file_name(), "report.pdf");
        assert_eq!(att.mime_type(), "application/pdf");
        assert!(att.bytes().is_err());
    }

    #[test]
    fn test_base64_lines_wrap() {
        let att = Attachment::from_bytes("big.bin", vec![0u8; 120]);
        let lines = att.base64_lines().unwrap();
        assert!(lines.split("\r\n").all(|l| l.len() <= 76));
        assert_eq!(lines.split("\r\n").count(), 3);
    }
}
