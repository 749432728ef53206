//! Table detection from positioned text runs.
//!
//! pdfium exposes text as segments with bounding boxes but has no notion of
//! tables. This module rebuilds them geometrically:
//!
//! 1. Runs are clustered into visual lines by vertical centre.
//! 2. Within a line, runs separated by less than `column_gap` × line height
//!    are merged into one cell; wider gaps start a new cell.
//! 3. Consecutive lines with the same number of cells (≥ `min_columns`),
//!    whose cells overlap column-wise and whose spacing stays within
//!    `max_row_gap` × line height, form a table of ≥ `min_rows` rows.
//!
//! Coordinates follow PDF conventions: origin bottom-left, y grows upward.

use crate::document::Table;

/// A piece of text with its bounding box in page points.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl TextRun {
    pub fn new(text: impl Into<String>, left: f32, bottom: f32, right: f32, top: f32) -> Self {
        Self {
            text: text.into(),
            left,
            right,
            top,
            bottom,
        }
    }

    fn height(&self) -> f32 {
        (self.top - self.bottom).max(0.0)
    }

    fn center_y(&self) -> f32 {
        (self.top + self.bottom) * 0.5
    }
}

/// Tunables for [`TableDetector::detect`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableDetector {
    pub min_rows: usize,
    pub min_columns: usize,
    /// Horizontal gap, in line heights, that separates two cells.
    pub column_gap: f32,
    /// Largest vertical distance, in line heights, between two rows of one table.
    pub max_row_gap: f32,
}

impl Default for TableDetector {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            column_gap: 1.0,
            max_row_gap: 2.5,
        }
    }
}

/// A visual line split into cells.
#[derive(Debug, Clone)]
struct Row {
    cells: Vec<Cell>,
    center_y: f32,
    height: f32,
}

#[derive(Debug, Clone)]
struct Cell {
    text: String,
    left: f32,
    right: f32,
}

/// Detect tables with the default tunables.
pub fn detect_tables(runs: &[TextRun]) -> Vec<Table> {
    TableDetector::default().detect(runs)
}

impl TableDetector {
    /// Return every table found among `runs`, top to bottom.
    pub fn detect(&self, runs: &[TextRun]) -> Vec<Table> {
        let rows = self.build_rows(runs);
        let mut tables = Vec::new();
        let mut block: Vec<&Row> = Vec::new();

        for row in &rows {
            let continues = match block.last() {
                Some(prev) => self.is_tabular(row) && self.aligns_with(prev, row),
                None => false,
            };
            if continues {
                block.push(row);
                continue;
            }
            self.flush(&mut block, &mut tables);
            if self.is_tabular(row) {
                block.push(row);
            }
        }
        self.flush(&mut block, &mut tables);
        tables
    }

    fn flush(&self, block: &mut Vec<&Row>, tables: &mut Vec<Table>) {
        if block.len() >= self.min_rows {
            tables.push(Table::new(
                block
                    .iter()
                    .map(|r| r.cells.iter().map(|c| c.text.clone()).collect())
                    .collect(),
            ));
        }
        block.clear();
    }

    fn is_tabular(&self, row: &Row) -> bool {
        row.cells.len() >= self.min_columns
    }

    fn aligns_with(&self, prev: &Row, row: &Row) -> bool {
        if prev.cells.len() != row.cells.len() {
            return false;
        }
        let line_height = prev.height.max(row.height).max(1.0);
        if (prev.center_y - row.center_y).abs() > self.max_row_gap * line_height {
            return false;
        }
        let slack = line_height * 0.5;
        prev.cells
            .iter()
            .zip(&row.cells)
            .all(|(a, b)| a.left <= b.right + slack && b.left <= a.right + slack)
    }

    fn build_rows(&self, runs: &[TextRun]) -> Vec<Row> {
        let mut runs: Vec<&TextRun> = runs.iter().filter(|r| !r.text.trim().is_empty()).collect();
        // Top of the page first, then left to right.
        runs.sort_by(|a, b| {
            b.center_y()
                .total_cmp(&a.center_y())
                .then(a.left.total_cmp(&b.left))
        });

        let mut lines: Vec<Vec<&TextRun>> = Vec::new();
        for run in runs {
            let joined = lines.last_mut().is_some_and(|line| {
                let center = line.iter().map(|r| r.center_y()).sum::<f32>() / line.len() as f32;
                let height = line.iter().map(|r| r.height()).fold(run.height(), f32::max);
                (center - run.center_y()).abs() <= height * 0.5
            });
            if joined {
                if let Some(line) = lines.last_mut() {
                    line.push(run);
                }
            } else {
                lines.push(vec![run]);
            }
        }

        lines
            .into_iter()
            .map(|mut line| {
                line.sort_by(|a, b| a.left.total_cmp(&b.left));
                self.split_cells(&line)
            })
            .collect()
    }

    fn split_cells(&self, line: &[&TextRun]) -> Row {
        let height = line.iter().map(|r| r.height()).fold(0.0, f32::max).max(1.0);
        let center_y = line.iter().map(|r| r.center_y()).sum::<f32>() / line.len() as f32;
        let mut cells: Vec<Cell> = Vec::new();

        for run in line {
            let text = run.text.trim();
            let max_gap = self.column_gap * height;
            if let Some(cell) = cells.last_mut().filter(|c| run.left - c.right < max_gap) {
                if run.left - cell.right > height * 0.15 {
                    cell.text.push(' ');
                }
                cell.text.push_str(text);
                cell.right = cell.right.max(run.right);
                continue;
            }
            cells.push(Cell {
                text: text.to_string(),
                left: run.left,
                right: run.right,
            });
        }

        Row {
            cells,
            center_y,
            height,
        }
    }
}
