//! Column width allocation for the console table.
//!
//! A column's *requested* width is its widest cell (header included) plus one
//! space of padding on each side. When the requests fit the terminal they
//! are granted as-is. Otherwise space is handed out by iterative fair share:
//! every column asking for no more than `remaining / unsatisfied` gets its
//! full request, which frees slack for the wide ones; once a pass satisfies
//! nobody, the remaining wide columns split what is left evenly.

use tracing::debug;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Terminal width assumed when the output is not an interactive terminal.
pub const FALLBACK_TERMINAL_WIDTH: usize = 80;

/// One space left and one right of every cell.
pub const CELL_PADDING: usize = 2;

/// Terminal display width of the widest line of `text`. Wide characters
/// count as two columns, the same measure `tabled` lays the grid out with.
pub fn display_width(text: &str) -> usize {
    text.lines().map(UnicodeWidthStr::width).max().unwrap_or(0)
}

/// Requested width per column: widest of header and cells, plus padding.
///
/// Rows shorter than the header are measured only within bounds; extra
/// cells beyond the column count are ignored.
pub fn requested_widths(columns: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = columns.iter().map(|c| display_width(c)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(cell));
        }
    }
    widths.iter().map(|w| w + CELL_PADDING).collect()
}

/// Width left for cell content once the `columns + 1` border characters are
/// taken out. Never less than one character per column.
pub fn available_width(terminal_width: usize, column_count: usize) -> usize {
    terminal_width
        .saturating_sub(column_count + 1)
        .max(column_count)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidthPlan {
    widths: Vec<usize>,
}

impl WidthPlan {
    pub fn allocate(requested: &[usize], terminal_width: usize) -> Self {
        let available = available_width(terminal_width, requested.len());
        let total: usize = requested.iter().sum();

        if total <= available {
            return Self {
                widths: requested.to_vec(),
            };
        }

        let widths = fair_share(requested, available);
        debug!(
            terminal_width,
            available,
            requested = total,
            allocated = widths.iter().sum::<usize>(),
            "Columns shrunk to fit terminal"
        );
        Self { widths }
    }

    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    pub fn width(&self, column: usize) -> usize {
        self.widths[column]
    }

    pub fn total(&self) -> usize {
        self.widths.iter().sum()
    }

    /// Width available to the text of a cell in `column`, padding excluded.
    pub fn content_width(&self, column: usize) -> usize {
        self.widths[column].saturating_sub(CELL_PADDING).max(1)
    }
}

fn fair_share(requested: &[usize], available: usize) -> Vec<usize> {
    let mut allocated = vec![0; requested.len()];
    let mut satisfied = vec![false; requested.len()];
    let mut remaining_width = available;
    let mut remaining_cols = requested.len();

    while remaining_cols > 0 {
        let share = remaining_width / remaining_cols;

        let mut progress = false;
        for (i, &request) in requested.iter().enumerate() {
            if !satisfied[i] && request <= share {
                allocated[i] = request;
                satisfied[i] = true;
                remaining_width -= request;
                remaining_cols -= 1;
                progress = true;
            }
        }

        if !progress {
            for (i, done) in satisfied.iter_mut().enumerate() {
                if !*done {
                    allocated[i] = share;
                    *done = true;
                }
            }
            break;
        }
    }

    allocated
}

/// Word-wrap `text` to lines at most `width` display columns wide.
///
/// Only line breaks are inserted: whitespace is kept as-is, so joining the
/// lines of one input line gives it back unchanged. Lines break before a
/// word that does not fit; a word or whitespace run wider than a whole line
/// is hard-broken.
pub fn wrap(text: &str, width: usize) -> String {
    let width = width.max(1);
    let mut out: Vec<String> = Vec::new();

    for line in text.split('\n') {
        if UnicodeWidthStr::width(line) <= width {
            out.push(line.to_string());
            continue;
        }

        let mut current = String::new();
        let mut current_width = 0;
        for token in tokens(line) {
            let token_width = UnicodeWidthStr::width(token);
            if current_width + token_width <= width {
                current.push_str(token);
                current_width += token_width;
                continue;
            }

            let is_word = !token.starts_with(char::is_whitespace);
            if is_word && current_width > 0 {
                out.push(std::mem::take(&mut current));
                current_width = 0;
            }
            if is_word && token_width <= width {
                current.push_str(token);
                current_width = token_width;
                continue;
            }

            for c in token.chars() {
                let char_width = c.width().unwrap_or(0);
                if current_width > 0 && current_width + char_width > width {
                    out.push(std::mem::take(&mut current));
                    current_width = 0;
                }
                current.push(c);
                current_width += char_width;
            }
        }
        out.push(current);
    }

    out.join("\n")
}

/// Split a line into alternating runs of whitespace and non-whitespace.
fn tokens(line: &str) -> impl Iterator<Item = &str> {
    let mut rest = line;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let blank = first.is_whitespace();
        let end = rest
            .find(|c: char| c.is_whitespace() != blank)
            .unwrap_or(rest.len());
        let (token, tail) = rest.split_at(end);
        rest = tail;
        Some(token)
    })
}
