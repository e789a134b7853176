//! Page rendering
//!
//! The session core treats rendering as an opaque, possibly slow function:
//! "render page N of this document to image bytes". Implementations must
//! keep CPU-bound work off the async runtime.

#[cfg(feature = "mupdf")]
mod mupdf_renderer;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

#[cfg(feature = "mupdf")]
pub use mupdf_renderer::MupdfRenderer;

/// Rendering errors
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Rendering is not available in this build")]
    Unavailable,

    #[error("Page {index} out of range (document has {page_count} pages)")]
    PageOutOfRange { index: usize, page_count: usize },

    #[error("Render error: {0}")]
    Backend(String),

    #[error("Render task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// Document rasterizer
#[async_trait]
pub trait RenderPort: Send + Sync {
    /// Number of pages in the document at `path`
    async fn page_count(&self, path: &Path) -> RenderResult<usize>;

    /// Render one page to encoded image bytes (PNG)
    async fn render_page(&self, path: &Path, index: usize) -> RenderResult<Vec<u8>>;
}

/// Renderer used when the server is built without a PDF backend
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableRenderer;

#[async_trait]
impl RenderPort for UnavailableRenderer {
    async fn page_count(&self, _path: &Path) -> RenderResult<usize> {
        Err(RenderError::Unavailable)
    }

    async fn render_page(&self, _path: &Path, _index: usize) -> RenderResult<Vec<u8>> {
        Err(RenderError::Unavailable)
    }
}
