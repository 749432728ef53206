//! # pdf-translate
//!
//! Translate the text and tables of a PDF with a Large Language Model and
//! write the result as PDF or Markdown.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     validate a local file (or spool bytes to a temp file)
//!  ├─ 2. Parse     pdfium text + geometric tables per page (spawn_blocking)
//!  ├─ 3. Cache     (fingerprint, format, language) → translated document
//!  ├─ 4. Translate one model call per content unit, in page order
//!  ├─ 5. Polish    strip fences / labels / invisible characters
//!  └─ 6. Write     PDF (printpdf) or Markdown, atomically
//! ```
//!
//! Each page yields at most two content units: its prose, and all of its
//! tables merged into one grid. Table cells are cut out of the prose first so
//! nothing is translated twice.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_translate::{OutputFormat, PdfTranslator, TranslatorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / ...
//!     let config = TranslatorConfig::builder().model("gpt-4o-mini").build()?;
//!     let translator = PdfTranslator::from_config(&config)?;
//!     let outcome = translator
//!         .translate("paper.pdf", OutputFormat::Markdown, "Deutsch", None, Some(1), Some(2))
//!         .await?;
//!     eprintln!("wrote {} ({} tokens)", outcome.output_path.display(), outcome.token_count());
//!     Ok(())
//! }
//! ```
//!
//! ## Token Count
//!
//! [`translate_pdf`] returns an integer: the number of prompt and answer
//! tokens spent, `0` when the document came from the cache, or `-1` when
//! nothing was counted (no content units, or no tokenizer for the model).
//! [`TokenUsage`] is the typed form of the same value.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-translate` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-translate = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod translate;
pub mod writer;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cache::{CacheKey, MemoryCache, TranslationCache};
pub use config::{TranslatorConfig, TranslatorConfigBuilder, DEFAULT_TARGET_LANGUAGE};
pub use document::{Content, ContentType, Document, Page, Table, TranslationStatus};
pub use error::{TranslateError, UnitFailure};
pub use model::{LlmModel, TiktokenTokenizer, Tokenizer, TranslationModel};
pub use pipeline::extract::{ExtractedPages, PageSelector, PdfBackend, PdfiumBackend, RawPage};
pub use pipeline::parse::PdfParser;
pub use progress::{NoopProgressCallback, ProgressCallback, TranslationProgressCallback};
pub use translate::{
    translate_pdf, translate_sync, PdfTranslator, TokenUsage, TranslationOutcome,
};
pub use writer::{default_output_path, OutputFormat, Writer};
