use crate::config::{OutputTarget, Settings};
use crate::error::{BqCatError, Result};
use crate::pipeline::process_results;
use crate::render::{terminal_width, OutputFormat, FALLBACK_TERMINAL_WIDTH};
use crate::source::{BigQuerySource, RowSource};
use crate::sql::SqlLoader;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;
use tracing::{info, warn};

/// Build-time identity of the binary, handed to [`run`] explicitly.
#[derive(Debug, Clone, Copy)]
pub struct AppInfo {
    pub name: &'static str,
    pub version: &'static str,
}

impl AppInfo {
    pub const fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Run the configured query against BigQuery and render its result set.
/// The row source is closed on every path out of here.
pub fn run(settings: &Settings, app: &AppInfo) -> Result<u64> {
    info!(
        app = app.name,
        version = app.version,
        project = %settings.bigquery.project_id,
        format = %settings.format,
        "Starting"
    );

    let sql = SqlLoader::load(&settings.query)?;
    let mut source = BigQuerySource::open(&settings.bigquery, &sql)?;

    let result = export(&mut source, &settings.target, settings.format);

    if let Err(e) = source.close() {
        warn!(error = %e, "Error closing row source");
    }
    result
}

/// Render everything `source` yields to `target` in `format`.
pub fn export<S>(source: &mut S, target: &OutputTarget, format: OutputFormat) -> Result<u64>
where
    S: RowSource + ?Sized,
{
    match target {
        OutputTarget::Stdout => {
            let mut renderer = format.renderer(Box::new(io::stdout().lock()), terminal_width());
            process_results(source, &mut renderer, None)
        }
        OutputTarget::File(path) => {
            let file = File::create(path).map_err(|e| BqCatError::CreateFile {
                path: path.clone(),
                source: e,
            })?;
            let mut renderer =
                format.renderer(Box::new(BufWriter::new(file)), FALLBACK_TERMINAL_WIDTH);

            let bar = export_progress(path);
            let result = process_results(source, &mut renderer, Some(&bar));
            match &result {
                Ok(rows) => {
                    bar.finish_with_message(format!("Exported {} rows to {}", rows, path.display()))
                }
                Err(_) => bar.abandon(),
            }
            result
        }
    }
}

fn export_progress(path: &Path) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg} {pos} rows [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(format!("Exporting to {}...", path.display()));
    bar
}
