use crate::{ExportError, Exporter};
use std::io::Write;
use tabula_core::{ColumnMeta, Row, TablePage};

pub struct JsonExporter {
    pub pretty: bool,
}

impl Exporter for JsonExporter {
    fn name(&self) -> &'static str {
        if self.pretty { "JSON (pretty)" } else { "JSON (compact)" }
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn export(&self, page: &TablePage, writer: &mut dyn Write) -> Result<(), ExportError> {
        let json_value = rows_to_json_array(&page.columns, &page.rows);

        if self.pretty {
            serde_json::to_writer_pretty(writer, &json_value)?;
        } else {
            serde_json::to_writer(writer, &json_value)?;
        }

        Ok(())
    }
}

fn rows_to_json_array(columns: &[ColumnMeta], rows: &[Row]) -> serde_json::Value {
    serde_json::Value::Array(
        rows.iter()
            .map(|row| row_to_json_object(columns, row))
            .collect(),
    )
}

fn row_to_json_object(columns: &[ColumnMeta], row: &Row) -> serde_json::Value {
    let mut map = serde_json::Map::new();

    for (col, value) in columns.iter().zip(row.iter()) {
        map.insert(col.name.clone(), value.to_json());
    }

    serde_json::Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tabula_core::Value;

    fn make_page(columns: Vec<&str>, rows: Vec<Row>) -> TablePage {
        TablePage {
            columns: columns
                .into_iter()
                .map(|name| ColumnMeta::new(name, "text"))
                .collect(),
            rows,
            primary_key: None,
            page: 1,
            total_rows: 0,
            total_pages: 1,
            execution_time: Duration::from_millis(10),
        }
    }

    #[test]
    fn exports_rows_as_json_array() {
        let page = make_page(
            vec!["id", "name"],
            vec![
                vec![Value::Int(1), Value::Text("Alice".to_string())],
                vec![Value::Int(2), Value::Null],
            ],
        );

        let mut buf = Vec::new();
        JsonExporter { pretty: false }.export(&page, &mut buf).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&String::from_utf8(buf).unwrap()).unwrap();
        let arr = parsed.as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[0]["id"], 1);
        assert_eq!(arr[0]["name"], "Alice");
        assert_eq!(arr[1]["name"], serde_json::Value::Null);
    }

    #[test]
    fn preserves_structured_values() {
        let page = make_page(
            vec!["payload"],
            vec![vec![Value::Json(serde_json::json!({"city": "NYC"}))]],
        );

        let mut buf = Vec::new();
        JsonExporter { pretty: false }.export(&page, &mut buf).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&String::from_utf8(buf).unwrap()).unwrap();
        assert_eq!(parsed[0]["payload"]["city"], "NYC");
    }

    #[test]
    fn pretty_output_contains_newlines() {
        let page = make_page(vec!["x"], vec![vec![Value::Int(1)], vec![Value::Int(2)]]);

        let mut buf = Vec::new();
        JsonExporter { pretty: true }.export(&page, &mut buf).unwrap();

        let output = String::from_utf8(buf).unwrap();
        assert!(output.contains('\n'));
    }

    #[test]
    fn handles_empty_page() {
        let page = make_page(vec!["id"], vec![]);

        let mut buf = Vec::new();
        JsonExporter { pretty: false }.export(&page, &mut buf).unwrap();

        assert_eq!(String::from_utf8(buf).unwrap(), "[]");
    }
}
