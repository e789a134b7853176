//! MuPDF-backed renderer
//!
//! MuPDF documents are not thread-safe, so every call opens the document
//! fresh inside a blocking task and drops it before returning.

use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use image::DynamicImage;
use mupdf::{Colorspace, Document, Matrix};

use super::{RenderError, RenderPort, RenderResult};

/// Default rasterization scale (1.0 = 72 dpi)
pub const DEFAULT_SCALE: f32 = 1.0;

#[derive(Debug, Clone)]
pub struct MupdfRenderer {
    scale: f32,
}

impl MupdfRenderer {
    pub fn new(scale: f32) -> Self {
        Self {
            scale: scale.clamp(0.1, 4.0),
        }
    }
}

impl Default for MupdfRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_SCALE)
    }
}

#[async_trait]
impl RenderPort for MupdfRenderer {
    async fn page_count(&self, path: &Path) -> RenderResult<usize> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || -> RenderResult<usize> {
            let doc = open(&path)?;
            let count = doc.page_count().map_err(backend)?;
            Ok(count.max(0) as usize)
        })
        .await?
    }

    async fn render_page(&self, path: &Path, index: usize) -> RenderResult<Vec<u8>> {
        let path = path.to_path_buf();
        let scale = self.scale;

        tokio::task::spawn_blocking(move || -> RenderResult<Vec<u8>> {
            let doc = open(&path)?;
            let page_count = doc.page_count().map_err(backend)?.max(0) as usize;
            if index >= page_count {
                return Err(RenderError::PageOutOfRange { index, page_count });
            }

            let page = doc.load_page(index as i32).map_err(backend)?;
            let matrix = Matrix::new_scale(scale, scale);
            let colorspace = Colorspace::device_rgb();
            let pixmap = page
                .to_pixmap(&matrix, &colorspace, false, true)
                .map_err(backend)?;

            encode_png(&pixmap)
        })
        .await?
    }
}

fn open(path: &Path) -> RenderResult<Document> {
    let path_str = path.to_string_lossy();
    Document::open(&*path_str).map_err(backend)
}

fn backend(err: mupdf::Error) -> RenderError {
    RenderError::Backend(err.to_string())
}

fn encode_png(pixmap: &mupdf::Pixmap) -> RenderResult<Vec<u8>> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for pixel in 0..(width as usize * height as usize) {
        let offset = pixel * n;
        for channel in 0..3 {
            rgb.push(samples.get(offset + channel).copied().unwrap_or(0));
        }
    }

    let img = image::RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| RenderError::Backend("Failed to create image buffer".to_string()))?;

    let mut output = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)
        .map_err(|e| RenderError::Backend(e.to_string()))?;

    Ok(output)
}
