//! PDF text layer via Google PDFium, for the position verifier.
//!
//! `PdfiumTextSource` holds only the document bytes. Each page read binds a
//! fresh `Pdfium` because the upstream type is `!Send`; the OS caches the
//! library load, so per-page binding is cheap and pages can be read from
//! parallel blocking tasks.

use pdfium_render::prelude::*;
use tracing::debug;

use super::geometry::BoundingBox;
use super::types::TextSpan;
use super::verifier::PdfTextSource;
use super::VerifierError;

pub struct PdfiumTextSource {
    bytes: Vec<u8>,
    page_count: u32,
}

impl PdfiumTextSource {
    /// Open a PDF, failing fast if PDFium or the document cannot be loaded.
    pub fn new(bytes: Vec<u8>) -> Result<Self, VerifierError> {
        let pdfium = load_pdfium()?;
        let page_count = {
            let document = pdfium
                .load_pdf_from_byte_slice(&bytes, None)
                .map_err(|e| text_layer_error(0, e))?;
            document.pages().len() as u32
        };
        debug!(page_count, "PDF opened for text-layer verification");
        Ok(Self { bytes, page_count })
    }
}

impl PdfTextSource for PdfiumTextSource {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn page_words(&self, page: u32) -> Result<Vec<TextSpan>, VerifierError> {
        if page == 0 || page > self.page_count {
            return Err(VerifierError::PageOutOfRange {
                page,
                page_count: self.page_count,
            });
        }

        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(&self.bytes, None)
            .map_err(|e| text_layer_error(page, e))?;
        let pdf_page = document
            .pages()
            .get((page - 1) as u16)
            .map_err(|e| text_layer_error(page, e))?;
        let page_height = pdf_page.height().value;
        let text = pdf_page.text().map_err(|e| text_layer_error(page, e))?;

        let spans: Vec<TextSpan> = text
            .segments()
            .iter()
            .filter_map(|segment| {
                let content = segment.text();
                if content.trim().is_empty() {
                    return None;
                }
                let rect = segment.bounds();
                // PDF space is bottom-left origin; flip to top-left.
                let bbox = BoundingBox::from_coords(
                    rect.left().value,
                    page_height - rect.top().value,
                    rect.right().value,
                    page_height - rect.bottom().value,
                );
                Some(TextSpan { content, bbox })
            })
            .collect();

        debug!(page, spans = spans.len(), "Read PDF text layer");
        Ok(spans)
    }
}

fn text_layer_error(page: u32, e: PdfiumError) -> VerifierError {
    VerifierError::TextLayer {
        page,
        reason: e.to_string(),
    }
}

/// Bind PDFium: `PDFIUM_DYNAMIC_LIB_PATH`, then next to the executable,
/// then the system library path.
fn load_pdfium() -> Result<Pdfium, VerifierError> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        debug!(path = %path, "Loading PDFium from env var");
        let bindings = Pdfium::bind_to_library(&path).map_err(|e| VerifierError::TextLayer {
            page: 0,
            reason: format!("Failed to load PDFium from {path}: {e}"),
        })?;
        return Ok(Pdfium::new(bindings));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(exe_dir) = exe.parent() {
            let lib_path =
                Pdfium::pdfium_platform_library_name_at_path(exe_dir.to_string_lossy().as_ref());
            if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
                debug!(dir = %exe_dir.display(), "Loaded PDFium next to executable");
                return Ok(Pdfium::new(bindings));
            }
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| VerifierError::TextLayer {
        page: 0,
        reason: format!(
            "PDFium library not found. Set PDFIUM_DYNAMIC_LIB_PATH or install PDFium: {e}"
        ),
    })?;
    Ok(Pdfium::new(bindings))
}
