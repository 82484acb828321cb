use super::{ColumnSet, ResultRenderer};
use crate::error::Result;
use crate::value::Value;
use std::io::Write;

/// Streams rows as RFC 4180 CSV with a header line. NULL becomes an empty
/// field.
pub struct CsvRenderer<W: Write> {
    writer: ::csv::Writer<W>,
    columns: ColumnSet,
}

impl<W: Write> CsvRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            writer: ::csv::Writer::from_writer(out),
            columns: ColumnSet::default(),
        }
    }
}

impl<W: Write> ResultRenderer for CsvRenderer<W> {
    fn begin(&mut self, columns: &[String]) -> Result<()> {
        self.columns.set(columns)?;
        if columns.is_empty() {
            return Ok(());
        }
        self.writer.write_record(columns)?;
        Ok(())
    }

    fn accept(&mut self, values: &[Value]) -> Result<()> {
        self.columns.check(values)?;
        if values.is_empty() {
            return Ok(());
        }
        self.writer.write_record(values.iter().map(|v| v.to_string()))?;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
