mod csv;
mod json;

use std::io::Write;
use tabula_core::TablePage;
use thiserror::Error;

pub use crate::csv::{CsvExporter, CsvTable, parse_csv, rows_to_csv};
pub use json::JsonExporter;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Export failed: {0}")]
    Failed(String),
}

/// Serializes a fetched page to an output stream.
pub trait Exporter {
    fn name(&self) -> &'static str;
    fn extension(&self) -> &'static str;
    fn export(&self, page: &TablePage, writer: &mut dyn Write) -> Result<(), ExportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    JsonPretty,
    JsonCompact,
}

impl ExportFormat {
    pub fn name(self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::JsonPretty => "JSON (pretty)",
            Self::JsonCompact => "JSON (compact)",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::JsonPretty | Self::JsonCompact => "json",
        }
    }
}

pub fn export(
    page: &TablePage,
    format: ExportFormat,
    writer: &mut dyn Write,
) -> Result<(), ExportError> {
    match format {
        ExportFormat::Csv => CsvExporter.export(page, writer),
        ExportFormat::JsonPretty => JsonExporter { pretty: true }.export(page, writer),
        ExportFormat::JsonCompact => JsonExporter { pretty: false }.export(page, writer),
    }
}
