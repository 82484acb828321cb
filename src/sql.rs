use crate::config::QuerySource;
use crate::error::{BqCatError, Result};
use sqlparser::dialect::BigQueryDialect;
use sqlparser::parser::Parser;
use std::path::Path;
use tracing::{debug, warn};

pub struct SqlLoader;

impl SqlLoader {
    pub fn load_file(path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        std::fs::read_to_string(path).map_err(|e| {
            BqCatError::Config(format!("failed to read {}: {}", path.display(), e))
        })
    }

    /// Load the query text and make sure it is a single statement.
    pub fn load(source: &QuerySource) -> Result<String> {
        let sql = match source {
            QuerySource::Inline(sql) => sql.clone(),
            QuerySource::File(path) => Self::load_file(path)?,
        };
        ensure_single_statement(&sql)?;
        Ok(sql)
    }
}

/// Reject empty input and scripts with more than one statement.
///
/// SQL the parser cannot handle is let through with a warning; the server
/// has the final word on what BigQuery accepts.
pub fn ensure_single_statement(sql: &str) -> Result<()> {
    if sql.trim().trim_end_matches(';').trim().is_empty() {
        return Err(BqCatError::Query("query is empty".to_string()));
    }

    match Parser::parse_sql(&BigQueryDialect {}, sql) {
        Ok(statements) if statements.len() > 1 => Err(BqCatError::Query(format!(
            "expected a single statement, found {}",
            statements.len()
        ))),
        Ok(_) => {
            debug!("Query parsed as a single statement");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Could not parse query locally, sending it as-is");
            Ok(())
        }
    }
}
