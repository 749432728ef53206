//! Error types for the pdf-translate library.
//!
//! Two failure modes are kept apart:
//!
//! * [`TranslateError`] — **Fatal**: the call cannot proceed (bad input file,
//!   page range outside the document, provider not configured, output not
//!   writable). Returned as `Err` from the top-level `translate*` functions.
//!
//! * [`UnitFailure`] — **Non-fatal**: one content unit's model call failed.
//!   The unit keeps its original text in the output and the pass continues;
//!   failures are reported in [`crate::translate::TranslationOutcome`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::document::ContentType;

/// All fatal errors returned by the pdf-translate library.
#[derive(Debug, Error)]
pub enum TranslateError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file name does not carry a `.pdf` extension.
    #[error("Unsupported file type '{path}': only .pdf files can be translated")]
    UnsupportedFileType { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// Requested page lies beyond the end of the document.
    #[error("Page {requested} is out of range (document has {total} pages)")]
    PageOutOfRange { requested: usize, total: usize },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium failed to read text from a specific page.
    #[error("Text extraction failed for page {page}: {detail}")]
    ExtractionFailed { page: usize, detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The font configured for PDF output could not be read.
    #[error("Failed to read PDF font '{path}': {source}\nPass a TrueType (.ttf) file with --font or PDF_TRANSLATE_FONT.")]
    FontLoadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document could not be rendered into the requested format.
    #[error("Failed to render {format} output: {detail}")]
    RenderFailed { format: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium next to the executable, install it system-wide, or set\n\
PDFIUM_LIB_PATH=/path/to/libpdfium to point at an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A content unit whose model call did not succeed.
///
/// The unit is still written (with its original text); this record only
/// tells the caller where the gaps are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    /// 1-based physical page number.
    pub page: usize,
    /// 0-based position of the unit within its page.
    pub index: usize,
    pub content_type: ContentType,
    /// What the model capability returned alongside the failure status.
    pub detail: String,
}

impl std::fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Page {} {} unit {}: translation failed: {}",
            self.page, self.content_type, self.index, self.detail
        )
    }
}
