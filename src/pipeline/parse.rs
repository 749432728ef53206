//! PDF → [`Document`]: page-range validation, table/prose separation,
//! whitespace cleanup and fingerprinting.
//!
//! PDF libraries render table cells inline in a page's extracted text. To
//! avoid translating those cells twice (once as prose, once as table), the
//! first occurrence of every cell string is cut from the raw text before the
//! remaining prose becomes a `Text` unit.

use crate::document::{Content, Document, Page, Table};
use crate::error::TranslateError;
use crate::pipeline::extract::{PdfBackend, PdfiumBackend, RawPage};
use crate::pipeline::input;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Parses a page range of a PDF into a [`Document`].
#[derive(Clone)]
pub struct PdfParser {
    backend: Arc<dyn PdfBackend>,
    password: Option<String>,
}

impl Default for PdfParser {
    fn default() -> Self {
        Self::new(Arc::new(PdfiumBackend::new()))
    }
}

impl PdfParser {
    pub fn new(backend: Arc<dyn PdfBackend>) -> Self {
        Self {
            backend,
            password: None,
        }
    }

    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }

    /// Parse pages `start..=end` (1-based) of `source`.
    ///
    /// `start` defaults to 1 and is clamped to at least 1; `end` defaults to
    /// `start`. An `end` below `start` selects the single page `start`.
    ///
    /// # Errors
    /// Input validation errors before any parsing, [`TranslateError::PageOutOfRange`]
    /// when the range ends beyond the document, and backend errors.
    pub async fn parse(
        &self,
        source: impl AsRef<Path>,
        start: Option<usize>,
        end: Option<usize>,
    ) -> Result<Document, TranslateError> {
        let resolved = input::resolve_local(source.as_ref())?;
        let path = resolved.path().to_path_buf();
        let backend = Arc::clone(&self.backend);
        let password = self.password.clone();

        tokio::task::spawn_blocking(move || -> Result<Document, TranslateError> {
            let select = |total: usize| resolve_range(start, end, total);
            let extracted = backend.extract_pages(&path, password.as_deref(), &select)?;
            info!(
                "Parsed {}: pages {}-{} of {}",
                path.display(),
                extracted.range.start + 1,
                extracted.range.end,
                extracted.total_pages
            );
            Ok(build_document(
                &path,
                extracted.range.start + 1,
                extracted.pages,
            ))
        })
        .await
        .map_err(|e| TranslateError::Internal(format!("Parse task panicked: {}", e)))?
    }
}

/// Turn optional 1-based bounds into a 0-based index range.
pub fn resolve_range(
    start: Option<usize>,
    end: Option<usize>,
    total_pages: usize,
) -> Result<Range<usize>, TranslateError> {
    let start = start.unwrap_or(1).max(1);
    let requested_end = end.unwrap_or(start);
    if requested_end > total_pages {
        return Err(TranslateError::PageOutOfRange {
            requested: requested_end,
            total: total_pages,
        });
    }

    let end = requested_end.max(start);
    if end > total_pages {
        return Err(TranslateError::PageOutOfRange {
            requested: end,
            total: total_pages,
        });
    }

    Ok(start - 1..end)
}

/// Assemble a [`Document`] from raw pages, computing its fingerprint.
pub fn build_document(source_path: &Path, first_page: usize, raw_pages: Vec<RawPage>) -> Document {
    let mut document = Document::new(source_path);
    document.first_page = first_page;

    let mut all_text = String::new();
    for raw in raw_pages {
        let (page, raw_text) = build_page(raw);
        all_text.push_str(&raw_text);
        document.add_page(page);
    }

    document.fingerprint = fingerprint(&all_text);
    debug!(
        "Built document: {} pages, {} units, fingerprint {:016x}",
        document.pages.len(),
        document.unit_count(),
        document.fingerprint
    );
    document
}

/// Build one page; also returns the raw text (cells removed, not yet
/// cleaned) that feeds the fingerprint.
fn build_page(raw: RawPage) -> (Page, String) {
    let mut page = Page::new();
    let text = remove_table_cells(raw.text, &raw.tables);

    let cleaned = clean_text(&text);
    if !cleaned.is_empty() {
        debug!("[raw_text]\n{}", cleaned);
        page.add_content(Content::text(cleaned));
    }

    if !raw.tables.is_empty() {
        let table = Table::merge(raw.tables);
        debug!("[table]\n{}", table);
        page.add_content(Content::table(table));
    }

    (page, text)
}

/// Remove the first occurrence of every non-empty cell from `text`.
pub fn remove_table_cells(mut text: String, tables: &[Table]) -> String {
    for cell in tables.iter().flat_map(Table::cells) {
        if !cell.is_empty() {
            text = text.replacen(cell, "", 1);
        }
    }
    text
}

/// Trim every line and drop the blank ones.
pub fn clean_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Content-equality fingerprint of the concatenated raw text.
pub fn fingerprint(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ContentType;

    fn table(rows: &[&[&str]]) -> Table {
        Table::new(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn range_defaults_to_first_page() {
        assert_eq!(resolve_range(None, None, 5).unwrap(), 0..1);
    }

    #[test]
    fn range_is_inclusive() {
        assert_eq!(resolve_range(Some(2), Some(4), 5).unwrap(), 1..4);
        assert_eq!(resolve_range(Some(1), Some(5), 5).unwrap(), 0..5);
    }

    #[test]
    fn start_below_one_is_clamped() {
        assert_eq!(resolve_range(Some(0), Some(2), 5).unwrap(), 0..2);
    }

    #[test]
    fn end_below_start_selects_start_page() {
        assert_eq!(resolve_range(Some(3), Some(1), 5).unwrap(), 2..3);
    }

    #[test]
    fn end_beyond_document_is_rejected() {
        match resolve_range(Some(1), Some(6), 5).unwrap_err() {
            TranslateError::PageOutOfRange { requested, total } => {
                assert_eq!((requested, total), (6, 5));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn start_beyond_document_is_rejected() {
        assert!(matches!(
            resolve_range(Some(9), Some(2), 5).unwrap_err(),
            TranslateError::PageOutOfRange { requested: 9, total: 5 }
        ));
    }

    #[test]
    fn clean_text_trims_and_drops_blank_lines() {
        assert_eq!(clean_text("  a  \n\n \t\n b\r\n"), "a\nb");
        assert_eq!(clean_text(" \n \n"), "");
    }

    #[test]
    fn cells_are_removed_once() {
        let t = table(&[&["Name", "Age"], &["Alice", "30"]]);
        let text = "Intro\nName Age\nAlice 30\nAlice left at 30.".to_string();
        let out = remove_table_cells(text, &[t]);
        assert_eq!(out, "Intro\n \n \nAlice left at 30.");
    }

    #[test]
    fn empty_cells_are_ignored() {
        let t = table(&[&["", "x"]]);
        assert_eq!(remove_table_cells("axb".into(), &[t]), "ab");
    }

    #[test]
    fn page_with_text_and_table_has_two_units() {
        let raw = RawPage {
            text: "Heading\nName Age\nAlice 30\n".into(),
            tables: vec![table(&[&["Name", "Age"], &["Alice", "30"]])],
        };
        let doc = build_document(Path::new("a.pdf"), 1, vec![raw]);
        let units = &doc.pages[0].contents;
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].content_type(), ContentType::Text);
        assert_eq!(units[0].original_text(), Some("Heading"));
        assert_eq!(units[1].content_type(), ContentType::Table);
    }

    #[test]
    fn tables_on_one_page_share_a_unit() {
        let raw = RawPage {
            text: String::new(),
            tables: vec![table(&[&["a", "b"]]), table(&[&["c", "d"]])],
        };
        let doc = build_document(Path::new("a.pdf"), 1, vec![raw]);
        assert_eq!(doc.pages[0].contents.len(), 1);
        assert_eq!(doc.pages[0].contents[0].original_table().unwrap().rows.len(), 2);
    }

    #[test]
    fn empty_page_keeps_its_slot() {
        let pages = vec![
            RawPage {
                text: "one".into(),
                tables: vec![],
            },
            RawPage::default(),
        ];
        let doc = build_document(Path::new("a.pdf"), 3, pages);
        assert_eq!(doc.pages.len(), 2);
        assert!(doc.pages[1].is_empty());
        assert_eq!(doc.first_page, 3);
    }

    #[test]
    fn fingerprint_uses_uncleaned_text() {
        let a = build_document(
            Path::new("a.pdf"),
            1,
            vec![RawPage {
                text: "hello  \n".into(),
                tables: vec![],
            }],
        );
        let b = build_document(
            Path::new("b.pdf"),
            1,
            vec![RawPage {
                text: "hello".into(),
                tables: vec![],
            }],
        );
        assert_eq!(a.pages[0].contents, b.pages[0].contents);
        assert_ne!(a.fingerprint, b.fingerprint);
        assert_eq!(a.fingerprint, fingerprint("hello  \n"));
    }

    #[test]
    fn identical_text_collides_across_paths() {
        let raw = || RawPage {
            text: "same text".into(),
            tables: vec![],
        };
        let a = build_document(Path::new("a.pdf"), 1, vec![raw()]);
        let b = build_document(Path::new("elsewhere/b.pdf"), 1, vec![raw()]);
        assert_eq!(a.fingerprint, b.fingerprint);
    }
}
