//! Input validation: make sure the source is a readable local PDF.
//!
//! Checks run before any parsing work so callers get a precise error
//! (missing file, wrong extension, not a PDF) instead of a pdfium failure.
//! In-memory input is spooled to a managed temp file because pdfium reads
//! from a path; the file lives as long as the returned [`ResolvedInput`].

use crate::error::TranslateError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// A validated PDF on disk.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a byte buffer written to a temp file, deleted on drop.
    Spooled { path: PathBuf, _file: NamedTempFile },
}

impl ResolvedInput {
    /// Get the path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Spooled { path, .. } => path,
        }
    }
}

/// True when the path ends in `.pdf`, case-insensitively.
pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Validate a local file path: existence, readability, extension, magic bytes.
pub fn resolve_local(path: impl AsRef<Path>) -> Result<ResolvedInput, TranslateError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(TranslateError::FileNotFound { path });
    }
    if !has_pdf_extension(&path) {
        return Err(TranslateError::UnsupportedFileType { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_err() || &magic != b"%PDF" {
                return Err(TranslateError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(TranslateError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(TranslateError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Write PDF bytes to a temp file and validate it.
pub fn spool_bytes(bytes: &[u8]) -> Result<ResolvedInput, TranslateError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(TranslateError::NotAPdf {
            path: PathBuf::from("<memory>"),
            magic,
        });
    }

    let mut file = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| TranslateError::Internal(format!("tempfile: {e}")))?;
    file.write_all(bytes)
        .map_err(|e| TranslateError::Internal(format!("tempfile write: {e}")))?;

    let path = file.path().to_path_buf();
    debug!("Spooled {} bytes to {}", bytes.len(), path.display());
    Ok(ResolvedInput::Spooled { path, _file: file })
}
