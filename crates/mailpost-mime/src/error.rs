//! Error types for message building.

use std::io;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An attachment's content could not be read from its source.
    #[error("Failed to read attachment {file_name}: {source}")]
    Attachment {
        /// File name of the attachment.
        file_name: String,
        /// Underlying read error.
        #[source]
        source: io::Error,
    },

    /// Header name is empty after sanitization or belongs to a header the
    /// builder writes itself.
    #[error("Invalid header name: {0:?}")]
    InvalidHeader(String),
}
