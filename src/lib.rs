pub mod app;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod source;
pub mod sql;
pub mod value;

pub use app::{export, run, AppInfo};
pub use config::{expand_env, resolve_format, Cli, OutputTarget, QuerySource, Settings};
pub use error::{BqCatError, Result};
pub use pipeline::process_results;
pub use render::{
    ConsoleRenderer, CsvRenderer, JsonRenderer, OutputFormat, ResultRenderer, WidthPlan,
};
pub use source::{BigQueryConfig, BigQuerySource, ColumnKind, Fetch, MemorySource, RowSource};
pub use sql::{ensure_single_statement, SqlLoader};
pub use value::Value;
