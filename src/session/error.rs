//! Session error types

use thiserror::Error;

/// Errors raised by session commands
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A page command arrived before any document was loaded
    #[error("No file loaded.")]
    NoDocumentLoaded,

    /// Page index outside `[0, page_count)`
    #[error("Invalid page number: {index} (document has {page_count} pages)")]
    InvalidPage { index: i64, page_count: usize },
}

/// Result type alias for session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;
