use super::{ColumnSet, ResultRenderer};
use crate::error::Result;
use crate::value::Value;
use serde_json::Map;
use std::io::Write;

/// Streams rows as one compact JSON array of objects keyed by column name.
///
/// When a column name repeats, the last value wins. An empty column set
/// produces no output at all.
pub struct JsonRenderer<W: Write> {
    out: W,
    columns: ColumnSet,
    first: bool,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            columns: ColumnSet::default(),
            first: true,
        }
    }
}

impl<W: Write> ResultRenderer for JsonRenderer<W> {
    fn begin(&mut self, columns: &[String]) -> Result<()> {
        self.columns.set(columns)?;
        self.first = true;
        if !columns.is_empty() {
            self.out.write_all(b"[")?;
        }
        Ok(())
    }

    fn accept(&mut self, values: &[Value]) -> Result<()> {
        self.columns.check(values)?;
        if values.is_empty() {
            return Ok(());
        }

        let mut object = Map::new();
        for (name, value) in self.columns.get().iter().zip(values) {
            object.insert(name.clone(), serde_json::to_value(value)?);
        }
        let encoded = serde_json::to_vec(&object)?;

        if !self.first {
            self.out.write_all(b",")?;
        }
        self.first = false;
        self.out.write_all(&encoded)?;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if !self.columns.get().is_empty() {
            self.out.write_all(b"]")?;
        }
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(columns: &[&str], rows: &[Vec<Value>]) -> String {
        let columns: Vec<String> = columns.iter().map(|s| s.to_string()).collect();
        let mut buf = Vec::new();
        {
            let mut renderer = JsonRenderer::new(&mut buf);
            renderer.begin(&columns).unwrap();
            for row in rows {
                renderer.accept(row).unwrap();
            }
            renderer.end().unwrap();
        }
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_exact_output() {
        let out = render(
            &["ID", "NAME"],
            &[
                vec![Value::Int(1), Value::from("Alice")],
                vec![Value::Int(2), Value::from("Bob")],
            ],
        );
        assert_eq!(out, r#"[{"ID":1,"NAME":"Alice"},{"ID":2,"NAME":"Bob"}]"#);

        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.as_array().map(|a| a.len()), Some(2));
    }

    #[test]
    fn test_null_stays_null() {
        let out = render(&["ID", "NAME"], &[vec![Value::Int(2), Value::Null]]);
        assert_eq!(out, r#"[{"ID":2,"NAME":null}]"#);
    }

    #[test]
    fn test_no_rows() {
        assert_eq!(render(&["ID"], &[]), "[]");
    }

    #[test]
    fn test_zero_columns_writes_nothing() {
        let out = render(&[], &[vec![], vec![]]);
        assert_eq!(out, "");
    }

    #[test]
    fn test_duplicate_column_keeps_last() {
        let out = render(&["X", "X"], &[vec![Value::Int(1), Value::Int(2)]]);
        assert_eq!(out, r#"[{"X":2}]"#);
    }

    #[test]
    fn test_nested_values_pass_through() {
        let nested = serde_json::json!({"tags": ["a", "b"]});
        let out = render(&["DOC"], &[vec![Value::Json(nested)]]);
        assert_eq!(out, r#"[{"DOC":{"tags":["a","b"]}}]"#);
    }
}
