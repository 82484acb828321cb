//! Result renderers.
//!
//! Every renderer follows the same call protocol: one [`ResultRenderer::begin`],
//! zero or more [`ResultRenderer::accept`], one [`ResultRenderer::end`].
//! CSV and JSON stream each row straight to their sink; the console renderer
//! buffers the whole result set because column widths depend on every cell.

mod console;
mod csv;
mod json;
pub mod width;

pub use self::console::{terminal_width, ConsoleRenderer, NULL_MARKER};
pub use self::csv::CsvRenderer;
pub use self::json::JsonRenderer;
pub use self::width::{WidthPlan, FALLBACK_TERMINAL_WIDTH};

use crate::error::{BqCatError, Result};
use crate::value::Value;
use std::fmt;
use std::io::Write;

pub trait ResultRenderer {
    fn begin(&mut self, columns: &[String]) -> Result<()>;
    fn accept(&mut self, values: &[Value]) -> Result<()>;
    fn end(&mut self) -> Result<()>;
}

impl<R: ResultRenderer + ?Sized> ResultRenderer for Box<R> {
    fn begin(&mut self, columns: &[String]) -> Result<()> {
        (**self).begin(columns)
    }

    fn accept(&mut self, values: &[Value]) -> Result<()> {
        (**self).accept(values)
    }

    fn end(&mut self) -> Result<()> {
        (**self).end()
    }
}

/// Column set bookkeeping shared by the renderers.
#[derive(Debug, Default)]
pub(crate) struct ColumnSet {
    columns: Option<Vec<String>>,
}

impl ColumnSet {
    pub(crate) fn set(&mut self, columns: &[String]) -> Result<()> {
        if self.columns.is_some() {
            return Err(BqCatError::RendererState("begin called twice".to_string()));
        }
        self.columns = Some(columns.to_vec());
        Ok(())
    }

    pub(crate) fn get(&self) -> &[String] {
        self.columns.as_deref().unwrap_or(&[])
    }

    /// Arity check for an incoming row. A renderer that never saw `begin`
    /// has zero columns, so any non-empty row is rejected.
    pub(crate) fn check(&self, values: &[Value]) -> Result<()> {
        let expected = self.get().len();
        if values.len() != expected {
            return Err(BqCatError::ColumnCountMismatch {
                expected,
                actual: values.len(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Console,
    Csv,
    Json,
}

impl OutputFormat {
    /// Build the renderer for this format over `out`. `terminal_width` only
    /// matters for the console table.
    pub fn renderer<'a>(
        self,
        out: Box<dyn Write + 'a>,
        terminal_width: usize,
    ) -> Box<dyn ResultRenderer + 'a> {
        match self {
            OutputFormat::Console => Box::new(ConsoleRenderer::new(out, terminal_width)),
            OutputFormat::Csv => Box::new(CsvRenderer::new(out)),
            OutputFormat::Json => Box::new(JsonRenderer::new(out)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Console => write!(f, "console"),
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
