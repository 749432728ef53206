//! Output stage: render a translated [`Document`] and write it to disk.
//!
//! Every unit is rendered from [`Content::render_for_output`], so failed
//! units appear with their original text. Files are written to a sibling
//! temp file first and renamed into place.
//!
//! [`Content::render_for_output`]: crate::document::Content::render_for_output

pub mod markdown;
pub mod pdf;

use crate::config::TranslatorConfig;
use crate::document::Document;
use crate::error::TranslateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Output file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pdf,
    Markdown,
}

impl OutputFormat {
    /// File extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Markdown => "md",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Pdf => f.write_str("pdf"),
            OutputFormat::Markdown => f.write_str("markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(OutputFormat::Pdf),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(TranslateError::InvalidConfig(format!(
                "Unknown output format '{}'. Expected 'pdf' or 'markdown'",
                other
            ))),
        }
    }
}

/// `dir/name.pdf` → `dir/name_translated.<ext>`.
pub fn default_output_path(source: &Path, format: OutputFormat) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    source.with_file_name(format!("{}_translated.{}", stem, format.extension()))
}

/// Environment variable naming a TrueType font for PDF output.
pub const FONT_ENV: &str = "PDF_TRANSLATE_FONT";

/// Renders documents and writes them atomically.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    /// TrueType font embedded in PDF output.
    font: Option<PathBuf>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer using `config.pdf_font`, or the font named by [`FONT_ENV`].
    pub fn from_config(config: &TranslatorConfig) -> Self {
        let font = config
            .pdf_font
            .clone()
            .or_else(|| std::env::var_os(FONT_ENV).filter(|v| !v.is_empty()).map(PathBuf::from));
        Self { font }
    }

    pub fn with_font(mut self, path: impl Into<PathBuf>) -> Self {
        self.font = Some(path.into());
        self
    }

    pub fn font(&self) -> Option<&Path> {
        self.font.as_deref()
    }

    /// Render `document` in `format` and write it to `output_path`, or to
    /// [`default_output_path`] when none is given. Returns the written path.
    pub async fn write(
        &self,
        document: &Document,
        output_path: Option<&Path>,
        format: OutputFormat,
    ) -> Result<PathBuf, TranslateError> {
        let path = output_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_output_path(&document.source_path, format));

        let font = match (&self.font, format) {
            (Some(font_path), OutputFormat::Pdf) => {
                let bytes = tokio::fs::read(font_path).await.map_err(|e| {
                    TranslateError::FontLoadFailed {
                        path: font_path.clone(),
                        source: e,
                    }
                })?;
                debug!("Embedding font {} ({} bytes)", font_path.display(), bytes.len());
                Some(bytes)
            }
            _ => None,
        };

        let bytes = render(document, format, font.as_deref())?;
        debug!("Rendered {} bytes of {}", bytes.len(), format);

        write_atomic(&path, &bytes).await?;
        info!("Wrote {}", path.display());
        Ok(path)
    }
}

/// Render `document` to the bytes of a `format` file. `font` is only used
/// for PDF, see [`pdf::render`].
pub fn render(
    document: &Document,
    format: OutputFormat,
    font: Option<&[u8]>,
) -> Result<Vec<u8>, TranslateError> {
    match format {
        OutputFormat::Markdown => Ok(markdown::render(document).into_bytes()),
        OutputFormat::Pdf => pdf::render(document, font),
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), TranslateError> {
    let write_err = |e| TranslateError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let ext = path
        .extension()
        .map(|e| format!("{}.tmp", e.to_string_lossy()))
        .unwrap_or_else(|| "tmp".to_string());
    let tmp_path = path.with_extension(ext);

    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}
