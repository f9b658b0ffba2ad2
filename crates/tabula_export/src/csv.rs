use crate::{ExportError, Exporter};
use csv::{ReaderBuilder, Writer};
use std::io::Write;
use tabula_core::{Row, TablePage, Value};

/// Exports a full page (all columns, header included) to a writer.
pub struct CsvExporter;

impl Exporter for CsvExporter {
    fn name(&self) -> &'static str {
        "CSV"
    }

    fn extension(&self) -> &'static str {
        "csv"
    }

    fn export(&self, page: &TablePage, writer: &mut dyn Write) -> Result<(), ExportError> {
        if page.columns.is_empty() {
            return Ok(());
        }

        let mut csv_writer = Writer::from_writer(writer);

        let headers: Vec<&str> = page.columns.iter().map(|c| c.name.as_str()).collect();
        csv_writer.write_record(&headers)?;

        for row in &page.rows {
            write_row(&mut csv_writer, row, page.columns.len())?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

/// Encode rows to CSV text, one field per column in the given order.
///
/// Each row's cells correspond positionally to `columns`; rows shorter
/// than the column list pad with empty fields. Fields containing commas,
/// quotes, or newlines are quoted with internal quotes doubled. `Null`
/// encodes as the empty string, structured values as compact JSON.
pub fn rows_to_csv(
    columns: &[String],
    rows: &[Row],
    include_header: bool,
) -> Result<String, ExportError> {
    if columns.is_empty() {
        return Ok(String::new());
    }

    let mut csv_writer = Writer::from_writer(Vec::new());

    if include_header {
        csv_writer.write_record(columns)?;
    }

    for row in rows {
        write_row(&mut csv_writer, row, columns.len())?;
    }

    let bytes = csv_writer
        .into_inner()
        .map_err(|e| ExportError::Failed(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Failed(e.to_string()))
}

fn write_row<W: Write>(
    csv_writer: &mut Writer<W>,
    row: &Row,
    column_count: usize,
) -> Result<(), ExportError> {
    for idx in 0..column_count {
        let field = row.get(idx).map(Value::canonical_text).unwrap_or_default();
        csv_writer.write_field(&field)?;
    }
    csv_writer.write_record(None::<&[u8]>)?;
    Ok(())
}

/// Decoded CSV text: header-defined column order plus string-form rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Decode CSV text. The first non-blank record is the header, defining
/// column order; the rest are data rows.
///
/// Quoting rules match the encoder: escaped quotes and embedded commas
/// are supported, and newlines round-trip inside quoted fields. The
/// decoder is record-oriented, so a raw newline inside an unquoted field
/// terminates the record. This is a known format limitation, kept as-is.
///
/// Never fails: short rows keep fewer fields than the header, and
/// unreadable records are dropped. Best-effort by contract.
pub fn parse_csv(text: &str) -> CsvTable {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut table = CsvTable::default();

    for record in reader.records() {
        let Ok(record) = record else {
            continue;
        };

        let fields: Vec<String> = record.iter().map(str::to_string).collect();

        // The csv reader skips truly empty lines; a record of one empty
        // field can still appear from a line holding only whitespace.
        if table.columns.is_empty() && fields.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        if table.columns.is_empty() {
            table.columns = fields;
        } else {
            table.rows.push(fields);
        }
    }

    table
}
