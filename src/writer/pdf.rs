//! PDF rendering with `printpdf`.
//!
//! Each source page starts a new A4 page; long content overflows onto
//! continuation pages. Prose is wrapped at an estimated character width.
//! Tables are a padded column grid, with the font size reduced until the
//! widest row fits the text block.
//!
//! ## Fonts
//!
//! Without an embedded font, prose is set in Helvetica and grids in Courier.
//! Those builtin fonts only have WinAnsi glyphs, so any line outside that set
//! (CJK, Cyrillic, Greek, ...) fails with [`TranslateError::RenderFailed`]
//! rather than producing blank glyphs. With an embedded TrueType font, prose
//! uses it throughout; grid rows stay in Courier when they can, for column
//! alignment, and fall back to the embedded font otherwise.

use crate::document::{Document, RenderedContent, Table};
use crate::error::TranslateError;
use printpdf::{
    BuiltinFont, FontId, Mm, Op, ParsedFont, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg,
    Point, Pt, TextItem,
};
use tracing::debug;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;

const BODY_SIZE_PT: f32 = 11.0;
const BODY_LEADING_PT: f32 = 14.0;
const GRID_MAX_SIZE_PT: f32 = 10.0;
const GRID_MIN_SIZE_PT: f32 = 5.0;
const BLOCK_GAP_PT: f32 = 8.0;

/// Average Helvetica advance, as a fraction of the font size.
const HELVETICA_ADVANCE: f32 = 0.5;
/// Courier advance, as a fraction of the font size.
const COURIER_ADVANCE: f32 = 0.6;

/// Font a line is set in.
#[derive(Clone)]
enum LineFont {
    Builtin(BuiltinFont),
    Embedded(FontId),
}

/// Fonts available to the layout.
struct Fonts {
    embedded: Option<FontId>,
}

impl Fonts {
    fn prose(&self, line: &str) -> Result<LineFont, TranslateError> {
        match &self.embedded {
            Some(id) => Ok(LineFont::Embedded(id.clone())),
            None => builtin_or_fail(line, BuiltinFont::Helvetica),
        }
    }

    fn grid(&self, line: &str) -> Result<LineFont, TranslateError> {
        match &self.embedded {
            Some(id) if !is_win_ansi(line) => Ok(LineFont::Embedded(id.clone())),
            _ => builtin_or_fail(line, BuiltinFont::Courier),
        }
    }
}

fn builtin_or_fail(line: &str, font: BuiltinFont) -> Result<LineFont, TranslateError> {
    match line.chars().find(|c| !is_win_ansi_char(*c)) {
        None => Ok(LineFont::Builtin(font)),
        Some(c) => Err(TranslateError::RenderFailed {
            format: "pdf".to_string(),
            detail: format!(
                "character '{}' (U+{:04X}) has no glyph in the builtin PDF fonts; \
                 embed a TrueType font (--font / PDF_TRANSLATE_FONT) or write Markdown",
                c, c as u32
            ),
        }),
    }
}

/// WinAnsi (cp1252) coverage of the builtin fonts.
fn is_win_ansi_char(c: char) -> bool {
    matches!(c, '\t' | ' '..='~' | '\u{A0}'..='\u{FF}')
        || "€‚ƒ„…†‡ˆ‰Š‹ŒŽ‘’“”•–—˜™š›œžŸ".contains(c)
}

fn is_win_ansi(text: &str) -> bool {
    text.chars().all(is_win_ansi_char)
}

/// One positioned line of output, before pagination.
enum LayoutItem {
    Line {
        text: String,
        font: LineFont,
        size: f32,
        leading: f32,
    },
    Gap(f32),
}

impl LayoutItem {
    fn height(&self) -> f32 {
        match self {
            LayoutItem::Line { leading, .. } => *leading,
            LayoutItem::Gap(h) => *h,
        }
    }
}

struct Geometry {
    width_pt: f32,
    height_pt: f32,
    margin_pt: f32,
}

impl Geometry {
    fn a4() -> Self {
        Self {
            width_pt: Mm(PAGE_WIDTH_MM).into_pt().0,
            height_pt: Mm(PAGE_HEIGHT_MM).into_pt().0,
            margin_pt: Mm(MARGIN_MM).into_pt().0,
        }
    }

    fn text_width(&self) -> f32 {
        self.width_pt - 2.0 * self.margin_pt
    }

    fn text_height(&self) -> f32 {
        self.height_pt - 2.0 * self.margin_pt
    }
}

/// Render `document` as PDF bytes. `font` is the content of a TrueType /
/// OpenType file to embed; without it only WinAnsi text can be rendered.
pub fn render(document: &Document, font: Option<&[u8]>) -> Result<Vec<u8>, TranslateError> {
    let geometry = Geometry::a4();
    let title = document
        .source_path
        .file_stem()
        .map(|s| format!("{} (translated)", s.to_string_lossy()))
        .unwrap_or_else(|| "Translated document".to_string());

    let mut doc = PdfDocument::new(&title);
    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let embedded = match font {
        Some(bytes) => {
            let parsed = ParsedFont::from_bytes(bytes, 0, &mut warnings).ok_or_else(|| {
                TranslateError::RenderFailed {
                    format: "pdf".to_string(),
                    detail: "font data is not a readable TrueType/OpenType font".to_string(),
                }
            })?;
            Some(doc.add_font(&parsed))
        }
        None => None,
    };
    let fonts = Fonts { embedded };

    let mut pages: Vec<PdfPage> = Vec::new();
    for page in &document.pages {
        let items = layout_page(
            page.contents.iter().map(|c| c.render_for_output()),
            &geometry,
            &fonts,
        )?;
        pages.extend(paginate(&items, &geometry));
    }
    if pages.is_empty() {
        pages.push(PdfPage::new(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), Vec::new()));
    }

    let page_count = pages.len();
    doc.with_pages(pages);

    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    debug!(
        "PDF layout complete: {} pages, {} warnings",
        page_count,
        warnings.len()
    );

    if !bytes.starts_with(b"%PDF") {
        return Err(TranslateError::RenderFailed {
            format: "pdf".to_string(),
            detail: "serialiser produced no PDF header".to_string(),
        });
    }
    Ok(bytes)
}

fn layout_page<'a>(
    contents: impl Iterator<Item = RenderedContent<'a>>,
    geometry: &Geometry,
    fonts: &Fonts,
) -> Result<Vec<LayoutItem>, TranslateError> {
    let mut items = Vec::new();
    for content in contents {
        if !items.is_empty() {
            items.push(LayoutItem::Gap(BLOCK_GAP_PT));
        }
        match content {
            RenderedContent::Text(text) => layout_text(text, geometry, fonts, &mut items)?,
            RenderedContent::Table(table) => layout_table(table, geometry, fonts, &mut items)?,
        }
    }
    Ok(items)
}

fn layout_text(
    text: &str,
    geometry: &Geometry,
    fonts: &Fonts,
    items: &mut Vec<LayoutItem>,
) -> Result<(), TranslateError> {
    let max_columns = (geometry.text_width() / (HELVETICA_ADVANCE * BODY_SIZE_PT)) as usize;
    for line in wrap_text(text, max_columns.max(1)) {
        let font = fonts.prose(&line)?;
        items.push(LayoutItem::Line {
            text: line,
            font,
            size: BODY_SIZE_PT,
            leading: BODY_LEADING_PT,
        });
    }
    Ok(())
}

fn layout_table(
    table: &Table,
    geometry: &Geometry,
    fonts: &Fonts,
    items: &mut Vec<LayoutItem>,
) -> Result<(), TranslateError> {
    let lines = grid_lines(table);
    let widest = lines.iter().map(|l| display_width(l)).max().unwrap_or(0);
    if widest == 0 {
        return Ok(());
    }

    let fitting = geometry.text_width() / (COURIER_ADVANCE * widest as f32);
    let size = fitting.clamp(GRID_MIN_SIZE_PT, GRID_MAX_SIZE_PT);
    for line in lines {
        let font = fonts.grid(&line)?;
        items.push(LayoutItem::Line {
            text: line,
            font,
            size,
            leading: size * 1.3,
        });
    }
    Ok(())
}

/// Fixed-width rows: every cell padded to its column's widest entry,
/// columns separated by ` | `, a dashed rule under the first row.
fn grid_lines(table: &Table) -> Vec<String> {
    let columns = table.column_count();
    let mut widths = vec![0usize; columns];
    for row in &table.rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    let mut lines = Vec::with_capacity(table.rows.len() + 1);
    for (r, row) in table.rows.iter().enumerate() {
        let cells: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, &w)| {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                let pad = w.saturating_sub(display_width(cell));
                format!("{}{}", cell, " ".repeat(pad))
            })
            .collect();
        lines.push(cells.join(" | ").trim_end().to_string());

        if r == 0 && table.rows.len() > 1 {
            let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
            lines.push(rule.join("-+-"));
        }
    }
    lines
}

fn paginate(items: &[LayoutItem], geometry: &Geometry) -> Vec<PdfPage> {
    let page_w = Mm(PAGE_WIDTH_MM);
    let page_h = Mm(PAGE_HEIGHT_MM);
    let top = geometry.height_pt - geometry.margin_pt;

    let mut pages = Vec::new();
    let mut ops: Vec<Op> = Vec::new();
    let mut used = 0.0_f32;

    for item in items {
        if used > 0.0 && used + item.height() > geometry.text_height() {
            pages.push(PdfPage::new(page_w, page_h, std::mem::take(&mut ops)));
            used = 0.0;
            if matches!(item, LayoutItem::Gap(_)) {
                continue;
            }
        }
        used += item.height();

        if let LayoutItem::Line {
            text, font, size, ..
        } = item
        {
            push_line(&mut ops, text, font, *size, geometry.margin_pt, top - used);
        }
    }

    if !ops.is_empty() || pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, ops));
    }
    pages
}

fn push_line(ops: &mut Vec<Op>, text: &str, font: &LineFont, size: f32, x: f32, y: f32) {
    if text.is_empty() {
        return;
    }
    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point { x: Pt(x), y: Pt(y) },
    });
    let items = vec![TextItem::Text(text.to_string())];
    match font {
        LineFont::Builtin(font) => {
            ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(size),
                font: *font,
            });
            ops.push(Op::WriteTextBuiltinFont { items, font: *font });
        }
        LineFont::Embedded(id) => {
            ops.push(Op::SetFontSize {
                size: Pt(size),
                font: id.clone(),
            });
            ops.push(Op::WriteText {
                items,
                font: id.clone(),
            });
        }
    }
    ops.push(Op::EndTextSection);
}

/// Columns a character occupies; East Asian wide characters take two.
fn char_width(c: char) -> usize {
    let cp = c as u32;
    let wide = (0x1100..=0x115F).contains(&cp)
        || (0x2E80..=0xA4CF).contains(&cp)
        || (0xAC00..=0xD7A3).contains(&cp)
        || (0xF900..=0xFAFF).contains(&cp)
        || (0xFE30..=0xFE4F).contains(&cp)
        || (0xFF00..=0xFF60).contains(&cp)
        || (0xFFE0..=0xFFE6).contains(&cp);
    if wide {
        2
    } else {
        1
    }
}

fn display_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Wrap `text` to lines of at most `max_columns` display columns.
///
/// Breaks at whitespace when a line has any; words longer than a line (and
/// unspaced scripts) are broken between characters. Source line breaks are
/// kept; blank source lines become empty lines.
fn wrap_text(text: &str, max_columns: usize) -> Vec<String> {
    let mut out = Vec::new();
    for source_line in text.lines() {
        let source_line = source_line.trim_end();
        if source_line.is_empty() {
            out.push(String::new());
            continue;
        }

        let mut line = String::new();
        let mut width = 0usize;
        for word in source_line.split(' ') {
            let word_width = display_width(word);
            let sep = usize::from(!line.is_empty());

            if width + sep + word_width <= max_columns {
                if sep == 1 {
                    line.push(' ');
                }
                line.push_str(word);
                width += sep + word_width;
                continue;
            }

            if word_width <= max_columns {
                out.push(std::mem::take(&mut line));
                line.push_str(word);
                width = word_width;
                continue;
            }

            // Oversized word: fill the current line, then break by character.
            if sep == 1 && width + 1 < max_columns {
                line.push(' ');
                width += 1;
            }
            for c in word.chars() {
                let w = char_width(c);
                if width + w > max_columns && !line.is_empty() {
                    out.push(std::mem::take(&mut line));
                    width = 0;
                }
                line.push(c);
                width += w;
            }
        }
        if !line.is_empty() {
            out.push(line);
        }
    }
    out
}
