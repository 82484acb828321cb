use super::width::{requested_widths, wrap, WidthPlan, FALLBACK_TERMINAL_WIDTH};
use super::{ColumnSet, ResultRenderer};
use crate::error::Result;
use crate::value::Value;
use std::io::Write;
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing::debug;

/// Shown in place of NULL cells. Text cells are rendered verbatim, so a
/// string that literally reads `<nil>` looks the same as a NULL.
pub const NULL_MARKER: &str = "<nil>";

/// Width of stdout when it is an interactive terminal, otherwise
/// [`FALLBACK_TERMINAL_WIDTH`].
pub fn terminal_width() -> usize {
    if !atty::is(atty::Stream::Stdout) {
        return FALLBACK_TERMINAL_WIDTH;
    }
    term_size::dimensions()
        .map(|(w, _h)| w)
        .filter(|w| *w > 0)
        .unwrap_or(FALLBACK_TERMINAL_WIDTH)
}

/// Renders the result set as a bordered table fitted to the terminal.
///
/// Rows are buffered as display strings until [`ResultRenderer::end`], which
/// computes the [`WidthPlan`] and writes the whole table at once.
pub struct ConsoleRenderer<W: Write> {
    out: W,
    terminal_width: usize,
    columns: ColumnSet,
    rows: Vec<Vec<String>>,
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W, terminal_width: usize) -> Self {
        Self {
            out,
            terminal_width,
            columns: ColumnSet::default(),
            rows: Vec::new(),
        }
    }

    pub fn buffered_rows(&self) -> usize {
        self.rows.len()
    }

    fn build_table(&self, plan: &WidthPlan) -> String {
        let mut builder = Builder::default();

        let header = self.columns.get().iter().enumerate();
        builder.push_record(header.map(|(i, h)| wrap(h, plan.content_width(i))));

        for row in &self.rows {
            let cells = row.iter().enumerate();
            builder.push_record(cells.map(|(i, cell)| wrap(cell, plan.content_width(i))));
        }

        let mut table = builder.build();
        table.with(Style::sharp());
        table.to_string()
    }
}

impl<W: Write> ResultRenderer for ConsoleRenderer<W> {
    fn begin(&mut self, columns: &[String]) -> Result<()> {
        self.columns.set(columns)?;
        self.rows.clear();
        Ok(())
    }

    fn accept(&mut self, values: &[Value]) -> Result<()> {
        self.columns.check(values)?;
        let row = values
            .iter()
            .map(|v| match v {
                Value::Null => NULL_MARKER.to_string(),
                v => v.to_string(),
            })
            .collect();
        self.rows.push(row);
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        let columns = self.columns.get();
        if columns.is_empty() {
            return Ok(());
        }

        let requested = requested_widths(columns, &self.rows);
        let plan = WidthPlan::allocate(&requested, self.terminal_width);
        debug!(
            columns = columns.len(),
            rows = self.rows.len(),
            widths = ?plan.widths(),
            "Rendering console table"
        );

        let table = self.build_table(&plan);
        self.rows = Vec::new();

        writeln!(self.out, "{}", table)?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::width::display_width;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn render(columns: &[String], rows: &[Vec<Value>], width: usize) -> String {
        let mut buf = Vec::new();
        {
            let mut renderer = ConsoleRenderer::new(&mut buf, width);
            renderer.begin(columns).unwrap();
            for row in rows {
                renderer.accept(row).unwrap();
            }
            renderer.end().unwrap();
        }
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_renders_cells_and_null_marker() {
        let out = render(
            &cols(&["ID", "NAME"]),
            &[
                vec![Value::Int(1), Value::from("Alice")],
                vec![Value::Int(2), Value::Null],
            ],
            80,
        );
        assert!(out.contains("ID"));
        assert!(out.contains("Alice"));
        assert!(out.contains(NULL_MARKER));
        assert!(out.contains("│ 1  │ Alice │"), "{out}");
    }

    #[test]
    fn test_nothing_written_before_end() {
        let mut buf = Vec::new();
        let mut renderer = ConsoleRenderer::new(&mut buf, 80);
        renderer.begin(&cols(&["A"])).unwrap();
        renderer.accept(&[Value::from("x")]).unwrap();
        assert_eq!(renderer.buffered_rows(), 1);
        drop(renderer);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_header_only_when_no_rows() {
        let out = render(&cols(&["ONLY"]), &[], 80);
        assert!(out.contains("ONLY"));
        assert_eq!(out.lines().count(), 3);
    }

    #[test]
    fn test_zero_columns_writes_nothing() {
        assert_eq!(render(&[], &[], 80), "");
    }

    #[test]
    fn test_wide_content_wraps_within_terminal() {
        let long_text = "A very long string ".repeat(10);
        let out = render(
            &cols(&["ID", "DESCRIPTION"]),
            &[vec![Value::Int(1), Value::from(long_text)]],
            80,
        );
        assert!(out.contains("DESCRIPTION"));
        assert!(out.lines().count() > 4);
        for line in out.lines() {
            assert!(display_width(line) <= 80, "line too wide: {line:?}");
        }
    }

    #[test]
    fn test_many_wide_columns_fit_narrow_terminal() {
        let columns = cols(&["FIRST", "SECOND", "THIRD", "FOURTH"]);
        let row: Vec<Value> = (0..4)
            .map(|i| Value::from(format!("value{i} ").repeat(8)))
            .collect();
        let out = render(&columns, &[row], 50);
        for line in out.lines() {
            assert!(display_width(line) <= 50, "line too wide: {line:?}");
        }
    }

    #[test]
    fn test_wide_characters_fit_terminal() {
        let out = render(
            &cols(&["WIDE", "NARROW"]),
            &[vec![Value::from("漢字".repeat(20)), Value::from("x".repeat(40))]],
            40,
        );
        assert!(out.lines().count() > 4);
        for line in out.lines() {
            assert!(display_width(line) <= 40, "line too wide: {line:?}");
        }
    }

    #[test]
    fn test_null_differs_from_empty_string() {
        let out = render(
            &cols(&["A", "B"]),
            &[vec![Value::Null, Value::from("")]],
            80,
        );
        assert!(out.contains("│ <nil> │   │"), "{out}");
    }

    #[test]
    fn test_fast_path_does_not_wrap() {
        let out = render(
            &cols(&["K", "V"]),
            &[vec![Value::from("key"), Value::from("some value")]],
            80,
        );
        assert!(out.contains("some value"));
        assert_eq!(out.lines().count(), 5);
    }
}
