use serde_json::Value;

use crate::Error;

/// One result row, columns in the order the query selected them.
///
/// The warehouse serializes every cell as JSON, with 64-bit integers encoded
/// as strings to survive lossy JSON readers. Accessors decode both encodings.
/// SQL NULL collapses to the zero value of the requested type: the queries in
/// this crate only produce NULL where the aggregate saw no input rows.
#[derive(Clone, Debug, PartialEq)]
pub struct Row(Vec<Value>);

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Row(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn text(&self, column: usize) -> Result<&str, Error> {
        match self.value(column)? {
            Value::String(s) => Ok(s),
            other => Err(type_error(column, "STRING", other)),
        }
    }

    pub fn int(&self, column: usize) -> Result<i64, Error> {
        match self.value(column)? {
            Value::Null => Ok(0),
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| type_error(column, "INT64", &Value::Number(n.clone()))),
            Value::String(s) => s.parse().map_err(|_| type_error(column, "INT64", &Value::String(s.clone()))),
            other => Err(type_error(column, "INT64", other)),
        }
    }

    pub fn float(&self, column: usize) -> Result<f64, Error> {
        match self.value(column)? {
            Value::Null => Ok(0.0),
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| type_error(column, "FLOAT64", &Value::Number(n.clone()))),
            Value::String(s) => s.parse().map_err(|_| type_error(column, "FLOAT64", &Value::String(s.clone()))),
            other => Err(type_error(column, "FLOAT64", other)),
        }
    }

    fn value(&self, column: usize) -> Result<&Value, Error> {
        self.0
            .get(column)
            .ok_or_else(|| Error::MalformedResponse(format!("row has {} columns, wanted column {column}", self.len())))
    }
}

fn type_error(column: usize, expected: &str, found: &Value) -> Error {
    Error::MalformedResponse(format!("column {column}: expected {expected}, found {found}"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn integers_decode_from_both_encodings() {
        let row = Row::new(vec![json!("8675309"), json!(42)]);

        assert_eq!(row.int(0).unwrap(), 8_675_309);
        assert_eq!(row.int(1).unwrap(), 42);
    }

    #[test]
    fn null_aggregates_collapse_to_zero() {
        let row = Row::new(vec![json!(null)]);

        assert_eq!(row.int(0).unwrap(), 0);
        assert_eq!(row.float(0).unwrap(), 0.0);
    }

    #[test]
    fn floats_decode_from_strings() {
        let row = Row::new(vec![json!("0.8125")]);

        assert_eq!(row.float(0).unwrap(), 0.8125);
    }

    #[test]
    fn missing_column_is_reported() {
        let row = Row::new(vec![json!("3.7")]);

        let err = row.int(1).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn type_mismatch_is_reported() {
        let row = Row::new(vec![json!("not-a-number")]);

        assert!(row.int(0).is_err());
        assert!(row.text(0).is_ok());
    }
}
