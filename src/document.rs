//! Content and document model.
//!
//! A [`Document`] is an ordered list of [`Page`]s, each an ordered list of
//! [`Content`] units. Units are either prose ([`Content::Text`]) or tabular
//! ([`Content::Table`]); both carry the extracted original, an optional
//! translation of the same shape, and a [`TranslationStatus`].
//!
//! After parsing the document is structurally frozen: the only mutation is
//! [`Content::set_translation`], which the orchestrator calls exactly once
//! per unit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Structural kind of a content unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Text,
    Table,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Text => f.write_str("text"),
            ContentType::Table => f.write_str("table"),
        }
    }
}

/// Lifecycle of a unit's translation. `Success` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TranslationStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

impl TranslationStatus {
    pub fn is_pending(self) -> bool {
        self == TranslationStatus::Pending
    }
}

/// A grid of cell strings, row-major.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Concatenate the rows of several tables into one grid.
    pub fn merge(tables: impl IntoIterator<Item = Table>) -> Self {
        Self {
            rows: tables.into_iter().flat_map(|t| t.rows).collect(),
        }
    }

    /// Parse a model answer back into rows.
    ///
    /// When any line contains `|`, the answer is read as pipe-delimited (GFM
    /// style, separator rows such as `|---|---|` dropped) and a line without
    /// pipes becomes a single-cell row. Only an answer with no pipes at all
    /// is split on whitespace, so multi-word cells survive whenever the model
    /// kept the delimiters.
    pub fn from_text(text: &str) -> Self {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter(|line| !is_pipe_separator(line))
            .collect();
        let piped = lines.iter().any(|line| line.contains('|'));

        let rows = lines
            .into_iter()
            .map(|line| {
                if piped {
                    line.trim_matches('|')
                        .split('|')
                        .map(|cell| cell.trim().to_string())
                        .collect()
                } else {
                    line.split_whitespace().map(str::to_string).collect()
                }
            })
            .collect();
        Self { rows }
    }

    /// Stable textual form used in prompts: cells joined by a single space,
    /// rows joined by newlines.
    pub fn to_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.join(" "))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(String::as_str)
    }

    /// Width of the widest row.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.is_empty())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

fn is_pipe_separator(line: &str) -> bool {
    line.contains('-')
        && line
            .chars()
            .all(|c| matches!(c, '|' | '-' | ':' | ' ' | '\t'))
}

/// A prose block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    pub original: String,
    translation: Option<String>,
    status: TranslationStatus,
}

/// All tables found on one page, merged into a single grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableContent {
    pub original: Table,
    translation: Option<Table>,
    status: TranslationStatus,
}

/// One translatable unit of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text(TextContent),
    Table(TableContent),
}

impl Content {
    pub fn text(original: impl Into<String>) -> Self {
        Content::Text(TextContent {
            original: original.into(),
            translation: None,
            status: TranslationStatus::Pending,
        })
    }

    pub fn table(original: Table) -> Self {
        Content::Table(TableContent {
            original,
            translation: None,
            status: TranslationStatus::Pending,
        })
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            Content::Text(_) => ContentType::Text,
            Content::Table(_) => ContentType::Table,
        }
    }

    pub fn status(&self) -> TranslationStatus {
        match self {
            Content::Text(c) => c.status,
            Content::Table(c) => c.status,
        }
    }

    /// Record the model's answer. The only mutator of a unit.
    ///
    /// A table answer is parsed back into rows with [`Table::from_text`].
    /// Passing [`TranslationStatus::Pending`] stores the unit as `Failed`.
    pub fn set_translation(&mut self, text: impl Into<String>, status: TranslationStatus) {
        let text = text.into();
        let status = if status.is_pending() {
            warn!("set_translation called with Pending status; recording as Failed");
            TranslationStatus::Failed
        } else {
            status
        };
        match self {
            Content::Text(c) => {
                c.translation = Some(text);
                c.status = status;
            }
            Content::Table(c) => {
                c.translation = Some(Table::from_text(&text));
                c.status = status;
            }
        }
    }

    /// The original payload as prompt text (tables via [`Table::to_text`]).
    pub fn render_for_prompt(&self) -> String {
        match self {
            Content::Text(c) => c.original.clone(),
            Content::Table(c) => c.original.to_text(),
        }
    }

    /// What a writer should emit: the translation when it succeeded,
    /// otherwise the original.
    pub fn render_for_output(&self) -> RenderedContent<'_> {
        match self {
            Content::Text(c) => match (&c.translation, c.status) {
                (Some(t), TranslationStatus::Success) => RenderedContent::Text(t),
                _ => RenderedContent::Text(&c.original),
            },
            Content::Table(c) => match (&c.translation, c.status) {
                (Some(t), TranslationStatus::Success) if !t.is_empty() => {
                    RenderedContent::Table(t)
                }
                _ => RenderedContent::Table(&c.original),
            },
        }
    }

    pub fn original_text(&self) -> Option<&str> {
        match self {
            Content::Text(c) => Some(&c.original),
            Content::Table(_) => None,
        }
    }

    pub fn original_table(&self) -> Option<&Table> {
        match self {
            Content::Text(_) => None,
            Content::Table(c) => Some(&c.original),
        }
    }

    pub fn translated_text(&self) -> Option<&str> {
        match self {
            Content::Text(c) => c.translation.as_deref(),
            Content::Table(_) => None,
        }
    }

    pub fn translated_table(&self) -> Option<&Table> {
        match self {
            Content::Text(_) => None,
            Content::Table(c) => c.translation.as_ref(),
        }
    }

    pub fn has_translation(&self) -> bool {
        match self {
            Content::Text(c) => c.translation.is_some(),
            Content::Table(c) => c.translation.is_some(),
        }
    }
}

/// Borrowed view of a unit's effective output payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderedContent<'a> {
    Text(&'a str),
    Table(&'a Table),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub contents: Vec<Content>,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_content(&mut self, content: Content) {
        self.contents.push(content);
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

/// A parsed PDF page range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub source_path: PathBuf,
    pub pages: Vec<Page>,
    /// Hash of the concatenated raw text of all included pages.
    pub fingerprint: u64,
    /// 1-based physical page number of `pages[0]`.
    pub first_page: usize,
}

impl Document {
    pub fn new(source_path: impl AsRef<Path>) -> Self {
        Self {
            source_path: source_path.as_ref().to_path_buf(),
            pages: Vec::new(),
            fingerprint: 0,
            first_page: 1,
        }
    }

    pub fn add_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    /// Total number of content units across all pages.
    pub fn unit_count(&self) -> usize {
        self.pages.iter().map(|p| p.contents.len()).sum()
    }

    pub fn contents(&self) -> impl Iterator<Item = &Content> {
        self.pages.iter().flat_map(|p| p.contents.iter())
    }

    /// True when every unit has reached a terminal status.
    pub fn is_fully_translated(&self) -> bool {
        self.contents().all(|c| !c.status().is_pending())
    }

    pub fn failed_units(&self) -> usize {
        self.contents()
            .filter(|c| c.status() == TranslationStatus::Failed)
            .count()
    }
}
