//! Shared viewing session
//!
//! Holds the single source of truth for what is being presented: the loaded
//! document and the current page. All mutations validate before applying and
//! swap the fields under one write guard, so readers never see a half-applied
//! load or page change.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::error::{SessionError, SessionResult};

/// Filename reported to viewers while nothing is loaded
pub const NO_DOCUMENT_SENTINEL: &str = "No file loaded";

/// A loaded document
///
/// Immutable once created; a new load replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHandle {
    pub name: String,
    pub page_count: usize,
}

impl DocumentHandle {
    pub fn new(name: impl Into<String>, page_count: usize) -> Self {
        Self {
            name: name.into(),
            page_count,
        }
    }
}

/// Point-in-time summary pushed to viewers
///
/// Field names on the wire are the ones the viewer client already reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub current_page: usize,
    pub total_pages: usize,
    #[serde(rename = "filename")]
    pub document_name: String,
    #[serde(rename = "users")]
    pub viewer_count: usize,
}

impl SessionSnapshot {
    /// Serialize to the JSON text frame sent over the push channel
    pub fn to_json(&self) -> String {
        // Plain struct of strings and integers; serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Default)]
struct Inner {
    document: Option<DocumentHandle>,
    current_page: usize,
    version: u64,
}

/// The process-wide session
#[derive(Debug, Default)]
pub struct SessionState {
    inner: RwLock<Inner>,
}

impl SessionState {
    /// Create an empty session (no document loaded)
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the document and rewind to the first page
    pub fn load_document(&self, handle: DocumentHandle) {
        let mut inner = self.inner.write();
        inner.document = Some(handle);
        inner.current_page = 0;
        inner.version += 1;
    }

    /// Move to `index`, rejecting anything outside the loaded document
    pub fn set_page(&self, index: i64) -> SessionResult<()> {
        let mut inner = self.inner.write();
        let page_count = inner
            .document
            .as_ref()
            .map(|doc| doc.page_count)
            .ok_or(SessionError::NoDocumentLoaded)?;

        let page = usize::try_from(index)
            .ok()
            .filter(|page| *page < page_count)
            .ok_or(SessionError::InvalidPage { index, page_count })?;

        inner.current_page = page;
        inner.version += 1;
        Ok(())
    }

    /// Currently loaded document, if any
    pub fn document(&self) -> Option<DocumentHandle> {
        self.inner.read().document.clone()
    }

    /// Current document together with the page being shown
    pub fn current(&self) -> SessionResult<(DocumentHandle, usize)> {
        let inner = self.inner.read();
        let doc = inner
            .document
            .clone()
            .ok_or(SessionError::NoDocumentLoaded)?;
        Ok((doc, inner.current_page))
    }

    /// Number of successful mutations so far
    pub fn version(&self) -> u64 {
        self.inner.read().version
    }

    /// Compute a snapshot with the given live viewer count
    pub fn snapshot(&self, viewer_count: usize) -> SessionSnapshot {
        let inner = self.inner.read();
        match &inner.document {
            Some(doc) => SessionSnapshot {
                current_page: inner.current_page,
                total_pages: doc.page_count,
                document_name: doc.name.clone(),
                viewer_count,
            },
            None => SessionSnapshot {
                current_page: 0,
                total_pages: 0,
                document_name: NO_DOCUMENT_SENTINEL.to_string(),
                viewer_count,
            },
        }
    }
}
