use super::{Fetch, RowSource};
use crate::error::{BqCatError, Result};
use crate::value::Value;
use chrono::{DateTime, Utc};
use gcp_bigquery_client::model::field_type::FieldType;
use gcp_bigquery_client::model::get_query_results_parameters::GetQueryResultsParameters;
use gcp_bigquery_client::model::get_query_results_response::GetQueryResultsResponse;
use gcp_bigquery_client::model::query_request::QueryRequest;
use gcp_bigquery_client::model::query_response::QueryResponse;
use gcp_bigquery_client::model::table_field_schema::TableFieldSchema;
use gcp_bigquery_client::model::table_row::TableRow;
use gcp_bigquery_client::model::table_schema::TableSchema;
use gcp_bigquery_client::Client;
use serde_json::{Map, Value as JsonValue};
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Connection settings for a BigQuery-backed row source.
#[derive(Debug, Clone)]
pub struct BigQueryConfig {
    pub project_id: String,
    /// Service account key file. `None` uses application default credentials.
    pub credentials: Option<PathBuf>,
    pub location: Option<String>,
}

/// How a BigQuery column's REST-encoded cells are decoded.
///
/// RECORD and REPEATED columns arrive in the REST `f`/`v` wire shape; they
/// carry the kinds of their children so they can be unwrapped into plain
/// JSON objects and arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Timestamp,
    Text,
    Record(Vec<(String, ColumnKind)>),
    Repeated(Box<ColumnKind>),
}

impl ColumnKind {
    fn from_field(field: &TableFieldSchema) -> Self {
        let children = field
            .fields
            .iter()
            .flatten()
            .map(|f| (f.name.clone(), ColumnKind::from_field(f)))
            .collect();
        Self::from_parts(&field.r#type, field.mode.as_deref(), children)
    }

    fn from_parts(
        field_type: &FieldType,
        mode: Option<&str>,
        children: Vec<(String, ColumnKind)>,
    ) -> Self {
        let kind = match field_type {
            FieldType::Integer | FieldType::Int64 => ColumnKind::Integer,
            FieldType::Float | FieldType::Float64 => ColumnKind::Float,
            FieldType::Boolean | FieldType::Bool => ColumnKind::Boolean,
            FieldType::Timestamp => ColumnKind::Timestamp,
            FieldType::Record | FieldType::Struct => ColumnKind::Record(children),
            _ => ColumnKind::Text,
        };
        if mode.is_some_and(|m| m.eq_ignore_ascii_case("REPEATED")) {
            ColumnKind::Repeated(Box::new(kind))
        } else {
            kind
        }
    }

    /// Decode one cell. The REST API ships scalars as strings; they are
    /// turned back into native values here so JSON output keeps numbers as
    /// numbers.
    pub fn decode(&self, raw: Option<JsonValue>) -> Value {
        match raw {
            None | Some(JsonValue::Null) => Value::Null,
            Some(raw) => match self {
                ColumnKind::Record(_) | ColumnKind::Repeated(_) => Value::Json(self.to_json(raw)),
                _ => self.decode_scalar(raw),
            },
        }
    }

    fn decode_scalar(&self, raw: JsonValue) -> Value {
        let text = match raw {
            JsonValue::String(s) => s,
            other => return Value::from_json(other),
        };
        match self {
            ColumnKind::Integer => text.parse().map(Value::Int).unwrap_or(Value::Text(text)),
            ColumnKind::Float => text.parse().map(Value::Float).unwrap_or(Value::Text(text)),
            ColumnKind::Boolean => match text.to_ascii_lowercase().as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::Text(text),
            },
            ColumnKind::Timestamp => match format_timestamp(&text) {
                Some(formatted) => Value::Text(formatted),
                None => Value::Text(text),
            },
            _ => Value::Text(text),
        }
    }

    fn to_json(&self, raw: JsonValue) -> JsonValue {
        match (self, raw) {
            (_, JsonValue::Null) => JsonValue::Null,
            (ColumnKind::Repeated(inner), JsonValue::Array(items)) => items
                .into_iter()
                .map(|item| inner.to_json(cell_value(item)))
                .collect(),
            (ColumnKind::Record(fields), JsonValue::Object(mut object)) => {
                let cells = match object.remove("f") {
                    Some(JsonValue::Array(cells)) => cells,
                    _ => Vec::new(),
                };
                let mut decoded = Map::new();
                for ((name, kind), cell) in fields.iter().zip(cells) {
                    decoded.insert(name.clone(), kind.to_json(cell_value(cell)));
                }
                JsonValue::Object(decoded)
            }
            (kind, raw) => kind.decode_scalar(raw).into_json(),
        }
    }
}

/// Unwrap a `{"v": ...}` cell.
fn cell_value(cell: JsonValue) -> JsonValue {
    match cell {
        JsonValue::Object(mut object) => object.remove("v").unwrap_or(JsonValue::Null),
        other => other,
    }
}

/// BigQuery encodes TIMESTAMP cells as fractional epoch seconds.
fn format_timestamp(epoch: &str) -> Option<String> {
    let seconds: f64 = epoch.parse().ok()?;
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let micros = (((seconds - whole) * 1_000_000.0).round() as u32).min(999_999);
    let ts: DateTime<Utc> = DateTime::from_timestamp(whole as i64, micros * 1_000)?;
    Some(ts.format("%Y-%m-%d %H:%M:%S%.f UTC").to_string())
}

struct Page {
    complete: bool,
    schema: Option<TableSchema>,
    rows: Vec<TableRow>,
    page_token: Option<String>,
}

impl From<QueryResponse> for Page {
    fn from(r: QueryResponse) -> Self {
        Self {
            complete: r.job_complete.unwrap_or(true),
            schema: r.schema,
            rows: r.rows.unwrap_or_default(),
            page_token: r.page_token,
        }
    }
}

impl From<GetQueryResultsResponse> for Page {
    fn from(r: GetQueryResultsResponse) -> Self {
        Self {
            complete: r.job_complete.unwrap_or(true),
            schema: r.schema,
            rows: r.rows.unwrap_or_default(),
            page_token: r.page_token,
        }
    }
}

/// Runs one query job and streams its rows page by page.
///
/// The source owns a current-thread Tokio runtime and blocks on each REST
/// call, so callers drive it synchronously.
pub struct BigQuerySource {
    runtime: Option<Runtime>,
    client: Client,
    project_id: String,
    location: Option<String>,
    job_id: Option<String>,
    columns: Vec<String>,
    kinds: Vec<ColumnKind>,
    rows: std::vec::IntoIter<TableRow>,
    page_token: Option<String>,
    fetched: u64,
}

impl BigQuerySource {
    pub fn open(config: &BigQueryConfig, sql: &str) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let client = runtime.block_on(connect(config.credentials.as_deref()))?;

        let mut request = QueryRequest::new(sql);
        request.location = config.location.clone();

        let response = runtime.block_on(client.job().query(&config.project_id, request))?;
        let job_ref = response.job_reference.clone();
        let job_id = job_ref.as_ref().and_then(|r| r.job_id.clone());
        let location = job_ref
            .and_then(|r| r.location)
            .or_else(|| config.location.clone());

        info!(
            project = %config.project_id,
            job_id = job_id.as_deref().unwrap_or("-"),
            "Query job submitted"
        );

        let mut source = Self {
            runtime: Some(runtime),
            client,
            project_id: config.project_id.clone(),
            location,
            job_id,
            columns: Vec::new(),
            kinds: Vec::new(),
            rows: Vec::new().into_iter(),
            page_token: None,
            fetched: 0,
        };

        let mut page = Page::from(response);
        while !page.complete {
            debug!("Query job still running, polling for results");
            page = source.fetch_page(None)?;
        }
        source.install_schema(page.schema.as_ref());
        source.install_page(page);
        Ok(source)
    }

    fn install_schema(&mut self, schema: Option<&TableSchema>) {
        let fields = schema.and_then(|s| s.fields.as_ref());
        let Some(fields) = fields else {
            return;
        };
        self.columns = fields.iter().map(|f| f.name.clone()).collect();
        self.kinds = fields
            .iter()
            .map(ColumnKind::from_field)
            .collect();
    }

    fn install_page(&mut self, page: Page) {
        debug!(rows = page.rows.len(), more = page.page_token.is_some(), "Result page received");
        self.rows = page.rows.into_iter();
        self.page_token = page.page_token;
    }

    fn fetch_page(&self, page_token: Option<String>) -> Result<Page> {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| BqCatError::Source("row source is closed".to_string()))?;
        let job_id = self
            .job_id
            .as_deref()
            .ok_or_else(|| BqCatError::Source("query response carried no job id".to_string()))?;

        let params = GetQueryResultsParameters {
            location: self.location.clone(),
            page_token,
            ..Default::default()
        };
        let response = runtime.block_on(self.client.job().get_query_results(
            &self.project_id,
            job_id,
            params,
        ))?;
        Ok(Page::from(response))
    }
}

async fn connect(credentials: Option<&Path>) -> Result<Client> {
    match credentials {
        Some(path) => {
            let path = path.to_str().ok_or_else(|| {
                BqCatError::Config(format!(
                    "credentials path is not valid UTF-8: {}",
                    path.display()
                ))
            })?;
            Ok(Client::from_service_account_key_file(path).await?)
        }
        None => Ok(Client::from_application_default_credentials().await?),
    }
}

impl RowSource for BigQuerySource {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next(&mut self, buffer: &mut [Value]) -> Result<Fetch> {
        loop {
            if let Some(row) = self.rows.next() {
                let cells = row.columns.unwrap_or_default();
                let mut cells = cells.into_iter();
                for (i, slot) in buffer.iter_mut().enumerate() {
                    let raw = cells.next().and_then(|c| c.value);
                    *slot = match self.kinds.get(i) {
                        Some(kind) => kind.decode(raw),
                        None => ColumnKind::Text.decode(raw),
                    };
                }
                self.fetched += 1;
                return Ok(Fetch::Row);
            }

            let Some(token) = self.page_token.take() else {
                return Ok(Fetch::Exhausted);
            };
            let page = self.fetch_page(Some(token))?;
            self.install_page(page);
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
            debug!(rows = self.fetched, "BigQuery source closed");
        }
        self.page_token = None;
        Ok(())
    }
}

impl Drop for BigQuerySource {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_null() {
        assert_eq!(ColumnKind::Integer.decode(None), Value::Null);
        assert_eq!(ColumnKind::Text.decode(Some(json!(null))), Value::Null);
    }

    #[test]
    fn test_decode_scalars_from_strings() {
        assert_eq!(ColumnKind::Integer.decode(Some(json!("42"))), Value::Int(42));
        assert_eq!(ColumnKind::Float.decode(Some(json!("2.5"))), Value::Float(2.5));
        assert_eq!(ColumnKind::Boolean.decode(Some(json!("true"))), Value::Bool(true));
        assert_eq!(ColumnKind::Text.decode(Some(json!("007"))), Value::from("007"));
    }

    #[test]
    fn test_decode_unparseable_falls_back_to_text() {
        assert_eq!(
            ColumnKind::Integer.decode(Some(json!("12345678901234567890123"))),
            Value::from("12345678901234567890123")
        );
    }

    #[test]
    fn test_decode_timestamp() {
        assert_eq!(
            ColumnKind::Timestamp.decode(Some(json!("1.7040672E9"))),
            Value::from("2024-01-01 00:00:00 UTC")
        );
        assert_eq!(
            ColumnKind::Timestamp.decode(Some(json!("1704067200.5"))),
            Value::from("2024-01-01 00:00:00.500 UTC")
        );
    }

    #[test]
    fn test_decode_repeated_scalars() {
        let kind = ColumnKind::Repeated(Box::new(ColumnKind::Integer));
        let raw = json!([{"v": "1"}, {"v": "2"}]);
        assert_eq!(kind.decode(Some(raw)), Value::Json(json!([1, 2])));
    }

    #[test]
    fn test_decode_record_keyed_by_field_name() {
        let kind = ColumnKind::Record(vec![
            ("name".to_string(), ColumnKind::Text),
            ("age".to_string(), ColumnKind::Integer),
            ("active".to_string(), ColumnKind::Boolean),
        ]);
        let raw = json!({"f": [{"v": "Alice"}, {"v": "30"}, {"v": null}]});
        assert_eq!(
            kind.decode(Some(raw)),
            Value::Json(json!({"name": "Alice", "age": 30, "active": null}))
        );
    }

    #[test]
    fn test_decode_repeated_records() {
        let kind = ColumnKind::Repeated(Box::new(ColumnKind::Record(vec![
            ("key".to_string(), ColumnKind::Text),
            ("scores".to_string(), ColumnKind::Repeated(Box::new(ColumnKind::Float))),
        ])));
        let raw = json!([
            {"v": {"f": [{"v": "a"}, {"v": [{"v": "1.5"}, {"v": "2"}]}]}},
            {"v": {"f": [{"v": "b"}, {"v": []}]}}
        ]);
        assert_eq!(
            kind.decode(Some(raw)),
            Value::Json(json!([
                {"key": "a", "scores": [1.5, 2.0]},
                {"key": "b", "scores": []}
            ]))
        );
    }

    #[test]
    fn test_column_kind_from_parts() {
        assert_eq!(
            ColumnKind::from_parts(&FieldType::Int64, None, Vec::new()),
            ColumnKind::Integer
        );
        assert_eq!(
            ColumnKind::from_parts(&FieldType::String, None, Vec::new()),
            ColumnKind::Text
        );
        assert_eq!(
            ColumnKind::from_parts(&FieldType::Int64, Some("REPEATED"), Vec::new()),
            ColumnKind::Repeated(Box::new(ColumnKind::Integer))
        );

        let children = vec![("id".to_string(), ColumnKind::Integer)];
        assert_eq!(
            ColumnKind::from_parts(&FieldType::Record, Some("NULLABLE"), children.clone()),
            ColumnKind::Record(children)
        );
    }
}
