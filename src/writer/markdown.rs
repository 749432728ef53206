//! Markdown rendering.
//!
//! Prose units become paragraphs, table units become GFM pipe tables with the
//! first row as header. Pages are separated by a horizontal rule.

use crate::document::{Document, RenderedContent, Table};

const PAGE_SEPARATOR: &str = "\n\n---\n\n";

pub fn render(document: &Document) -> String {
    let pages: Vec<String> = document
        .pages
        .iter()
        .map(|page| {
            page.contents
                .iter()
                .map(|content| match content.render_for_output() {
                    RenderedContent::Text(text) => text.trim().to_string(),
                    RenderedContent::Table(table) => render_table(table),
                })
                .filter(|block| !block.is_empty())
                .collect::<Vec<_>>()
                .join("\n\n")
        })
        .collect();

    let mut out = pages.join(PAGE_SEPARATOR);
    out.push('\n');
    out
}

/// GFM pipe table. Short rows are padded with empty cells.
pub fn render_table(table: &Table) -> String {
    let columns = table.column_count();
    if columns == 0 {
        return String::new();
    }

    let row_line = |row: &[String]| {
        let mut cells: Vec<String> = row.iter().map(|c| escape_cell(c)).collect();
        cells.resize(columns, String::new());
        format!("| {} |", cells.join(" | "))
    };

    let mut lines = Vec::with_capacity(table.rows.len() + 1);
    let mut rows = table.rows.iter();
    if let Some(header) = rows.next() {
        lines.push(row_line(header));
        lines.push(format!("|{}", " --- |".repeat(columns)));
    }
    lines.extend(rows.map(|row| row_line(row)));
    lines.join("\n")
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', " ")
}
