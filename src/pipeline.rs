use crate::error::Result;
use crate::render::ResultRenderer;
use crate::source::{Fetch, RowSource};
use crate::value::Value;
use indicatif::ProgressBar;
use tracing::debug;

/// Pull every row from `source` into `renderer`, advancing `progress` once
/// per row. Returns the number of rows rendered.
///
/// The first error from either side aborts the loop and is returned as-is;
/// whatever the renderer already wrote stays written. Closing the source is
/// the caller's job.
pub fn process_results<S, R>(
    source: &mut S,
    renderer: &mut R,
    progress: Option<&ProgressBar>,
) -> Result<u64>
where
    S: RowSource + ?Sized,
    R: ResultRenderer + ?Sized,
{
    let columns = source.columns().to_vec();
    let mut values = vec![Value::Null; columns.len()];

    renderer.begin(&columns)?;

    let mut rows = 0u64;
    while source.next(&mut values)? == Fetch::Row {
        renderer.accept(&values)?;
        rows += 1;
        if let Some(bar) = progress {
            bar.inc(1);
        }
    }

    renderer.end()?;
    debug!(rows, columns = columns.len(), "Result set rendered");
    Ok(rows)
}
