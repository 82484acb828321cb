mod bigquery;
mod memory;

pub use bigquery::{BigQueryConfig, BigQuerySource, ColumnKind};
pub use memory::MemorySource;

use crate::error::Result;
use crate::value::Value;

/// Outcome of a single [`RowSource::next`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    /// The buffer was filled with the next row.
    Row,
    /// No more rows. Not an error.
    Exhausted,
}

/// An ordered, finite stream of result rows with a fixed column set.
pub trait RowSource {
    fn columns(&self) -> &[String];

    /// Fill `buffer` (sized to the column count) with the next row.
    fn next(&mut self, buffer: &mut [Value]) -> Result<Fetch>;

    /// Release underlying resources. Calling it more than once is a no-op.
    fn close(&mut self) -> Result<()>;
}
