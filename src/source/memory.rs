use super::{Fetch, RowSource};
use crate::error::{BqCatError, Result};
use crate::value::Value;

/// A row source backed by rows already held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    cursor: usize,
    closed: bool,
}

impl MemorySource {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            cursor: 0,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

impl RowSource for MemorySource {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next(&mut self, buffer: &mut [Value]) -> Result<Fetch> {
        if self.closed {
            return Err(BqCatError::Source("row source is closed".to_string()));
        }
        let Some(row) = self.rows.get(self.cursor) else {
            return Ok(Fetch::Exhausted);
        };
        // Short rows leave trailing cells NULL; long rows are clipped.
        let padded = row.iter().chain(std::iter::repeat(&Value::Null));
        for (slot, value) in buffer.iter_mut().zip(padded) {
            *slot = value.clone();
        }
        self.cursor += 1;
        Ok(Fetch::Row)
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemorySource {
        MemorySource::new(
            vec!["ID".to_string(), "NAME".to_string()],
            vec![
                vec![Value::Int(1), Value::from("Alice")],
                vec![Value::Int(2)],
            ],
        )
    }

    #[test]
    fn test_iterates_then_exhausts() {
        let mut source = sample();
        let mut buf = vec![Value::Null; 2];

        assert_eq!(source.next(&mut buf).unwrap(), Fetch::Row);
        assert_eq!(buf, vec![Value::Int(1), Value::from("Alice")]);

        assert_eq!(source.next(&mut buf).unwrap(), Fetch::Row);
        assert_eq!(buf, vec![Value::Int(2), Value::Null]);

        assert_eq!(source.next(&mut buf).unwrap(), Fetch::Exhausted);
        assert_eq!(source.next(&mut buf).unwrap(), Fetch::Exhausted);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut source = sample();
        source.close().unwrap();
        source.close().unwrap();
        assert!(source.is_closed());

        let mut buf = vec![Value::Null; 2];
        assert!(matches!(source.next(&mut buf), Err(BqCatError::Source(_))));
    }
}
