//! Raw page extraction: the PDF library boundary.
//!
//! The parser needs one thing from a PDF library: open the document once,
//! learn its physical page count, and for the selected pages return the raw
//! text plus the tables found on them. [`PdfBackend`] captures exactly that
//! so the parsing rules can be tested without a native library. [`PdfiumBackend`] is the production
//! implementation over `pdfium-render`.
//!
//! ## Why blocking?
//!
//! pdfium keeps thread-local state and is not async-safe. Backends are plain
//! blocking code; the parser moves calls onto `spawn_blocking`.

use crate::document::Table;
use crate::error::TranslateError;
use crate::pipeline::tables::{TableDetector, TextRun};
use pdfium_render::prelude::*;
use std::ops::Range;
use std::path::Path;
use tracing::{debug, info};

/// What a backend extracts from one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPage {
    /// Text as the library lays it out, tables included inline.
    pub text: String,
    pub tables: Vec<Table>,
}

/// Pages pulled out of one opened document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPages {
    /// Physical page count of the document.
    pub total_pages: usize,
    /// 0-based indices that were extracted.
    pub range: Range<usize>,
    pub pages: Vec<RawPage>,
}

/// Picks the 0-based page range to extract, given the physical page count.
pub type PageSelector<'a> = &'a dyn Fn(usize) -> Result<Range<usize>, TranslateError>;

/// Source of raw page content.
pub trait PdfBackend: Send + Sync {
    /// Open `path`, pass its page count to `select`, and extract the selected
    /// pages in order. An error from `select` is returned unchanged.
    fn extract_pages(
        &self,
        path: &Path,
        password: Option<&str>,
        select: PageSelector<'_>,
    ) -> Result<ExtractedPages, TranslateError>;
}

/// [`PdfBackend`] over pdfium, with geometric table detection.
#[derive(Debug, Clone, Default)]
pub struct PdfiumBackend {
    detector: TableDetector,
}

impl PdfiumBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_detector(detector: TableDetector) -> Self {
        Self { detector }
    }
}

impl PdfBackend for PdfiumBackend {
    fn extract_pages(
        &self,
        path: &Path,
        password: Option<&str>,
        select: PageSelector<'_>,
    ) -> Result<ExtractedPages, TranslateError> {
        let pdfium = bind_pdfium()?;
        let document = load_document(&pdfium, path, password)?;
        let doc_pages = document.pages();
        let total_pages = doc_pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        let range = select(total_pages)?;
        let mut results = Vec::with_capacity(range.len());
        for idx in range.clone() {
            let page = doc_pages
                .get(idx as u16)
                .map_err(|e| TranslateError::ExtractionFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                })?;
            let text = page.text().map_err(|e| TranslateError::ExtractionFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

            let runs: Vec<TextRun> = text
                .segments()
                .iter()
                .map(|segment| {
                    let b = segment.bounds();
                    TextRun::new(
                        segment.text(),
                        b.left().value,
                        b.bottom().value,
                        b.right().value,
                        b.top().value,
                    )
                })
                .collect();
            let tables = self.detector.detect(&runs);

            debug!(
                "Extracted page {}: {} segments, {} tables",
                idx + 1,
                runs.len(),
                tables.len()
            );

            results.push(RawPage {
                text: text.all(),
                tables,
            });
        }

        Ok(ExtractedPages {
            total_pages,
            range,
            pages: results,
        })
    }
}

/// Bind to a pdfium library: `PDFIUM_LIB_PATH`, then the working
/// directory, then the system library path.
pub fn bind_pdfium() -> Result<Pdfium, TranslateError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| TranslateError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn load_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, TranslateError> {
    pdfium.load_pdf_from_file(path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                TranslateError::WrongPassword {
                    path: path.to_path_buf(),
                }
            } else {
                TranslateError::PasswordRequired {
                    path: path.to_path_buf(),
                }
            }
        } else {
            TranslateError::CorruptPdf {
                path: path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}
