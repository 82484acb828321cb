use crate::error::{BqCatError, Result};
use crate::render::OutputFormat;
use crate::source::BigQueryConfig;
use clap::Parser;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use tracing::warn;

const EXAMPLES: &str = r#"Examples:
  bqcat --project my-project "select * from dataset.my_table"
  bqcat --project my-project --file out.csv "select * from dataset.my_table"
  bqcat --project my-project --file out.json "select * from dataset.my_table"
  bqcat --project my-project --json "select * from dataset.my_table"
  bqcat --project '$GCP_PROJECT' --csv --sql-file report.sql"#;

static ENV_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([^}]*)\}|\$([A-Za-z0-9_]+)").expect("env pattern regex is valid")
});

/// Query BigQuery, optionally export to CSV or JSON.
#[derive(Parser, Debug)]
#[command(name = "bqcat", version, after_help = EXAMPLES)]
pub struct Cli {
    /// SQL query to execute
    #[arg(
        value_name = "QUERY",
        required_unless_present = "sql_file",
        conflicts_with = "sql_file"
    )]
    pub query: Option<String>,

    /// Read the SQL query from a file
    #[arg(long, value_name = "PATH")]
    pub sql_file: Option<PathBuf>,

    /// Project that runs the query job ($VAR references are expanded)
    #[arg(short, long, env = "BQCAT_PROJECT")]
    pub project: Option<String>,

    /// Service account key file; application default credentials when omitted
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS", value_name = "PATH")]
    pub credentials: Option<String>,

    /// Location the query job runs in (e.g. US, EU)
    #[arg(long)]
    pub location: Option<String>,

    /// Target file (JSON if the extension is .json, CSV otherwise)
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<String>,

    /// Output in JSON format (default if the target file ends in .json)
    #[arg(long, conflicts_with = "csv")]
    pub json: bool,

    /// Output in CSV format
    #[arg(long)]
    pub csv: bool,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Expand `$VAR` and `${VAR}` from the process environment. Unset variables
/// expand to the empty string.
pub fn expand_env(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

pub fn expand_with<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_PATTERN
        .replace_all(input, |caps: &Captures| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            lookup(name).unwrap_or_default()
        })
        .into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySource {
    Inline(String),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

/// Pick the output format from the flags and the target file.
///
/// Writing to a file defaults to CSV unless the extension is `.json`;
/// stdout defaults to the console table. A flag that contradicts the file
/// extension wins but is warned about.
pub fn resolve_format(json: bool, csv: bool, file: Option<&Path>) -> OutputFormat {
    let Some(path) = file else {
        return if json {
            OutputFormat::Json
        } else if csv {
            OutputFormat::Csv
        } else {
            OutputFormat::Console
        };
    };

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    if json && ext == "csv" {
        warn!(file = %path.display(), "--json specified but output file has .csv extension");
    } else if csv && ext == "json" {
        warn!(file = %path.display(), "--csv specified but output file has .json extension");
    }

    if json || (!csv && ext == "json") {
        OutputFormat::Json
    } else {
        OutputFormat::Csv
    }
}

/// Fully resolved run configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub query: QuerySource,
    pub bigquery: BigQueryConfig,
    pub target: OutputTarget,
    pub format: OutputFormat,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        if cli.json && cli.csv {
            return Err(BqCatError::Config(
                "cannot specify both --json and --csv".to_string(),
            ));
        }

        let project_id = cli
            .project
            .as_deref()
            .map(expand_env)
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                BqCatError::Config("missing --project (or BQCAT_PROJECT)".to_string())
            })?;

        let credentials = cli
            .credentials
            .as_deref()
            .map(expand_env)
            .filter(|c| !c.is_empty())
            .map(PathBuf::from);

        let target = match cli.file.as_deref().map(expand_env) {
            Some(f) if !f.is_empty() => OutputTarget::File(PathBuf::from(f)),
            _ => OutputTarget::Stdout,
        };

        let query = match (&cli.query, &cli.sql_file) {
            (Some(q), None) => QuerySource::Inline(q.clone()),
            (None, Some(path)) => QuerySource::File(path.clone()),
            (Some(_), Some(_)) => {
                return Err(BqCatError::Config(
                    "give either a QUERY argument or --sql-file, not both".to_string(),
                ))
            }
            (None, None) => return Err(BqCatError::Config("missing query".to_string())),
        };

        let file = match &target {
            OutputTarget::File(path) => Some(path.as_path()),
            OutputTarget::Stdout => None,
        };
        let format = resolve_format(cli.json, cli.csv, file);

        Ok(Self {
            query,
            bigquery: BigQueryConfig {
                project_id,
                credentials,
                location: cli.location.clone(),
            },
            target,
            format,
        })
    }
}
