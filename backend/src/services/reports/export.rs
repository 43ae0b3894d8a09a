//! # Collection Exporter
//!
//! Reads each configured collection in full and flattens its documents into
//! worksheet rows.
//!
//! ## Row rules
//!
//! - Every row starts with an `id` key holding the document identifier. A
//!   stored field called `id` is ignored in favour of the identifier.
//! - A sheet's columns are the keys of its *first* row. Later rows are written
//!   with those columns only: missing keys leave an empty cell and keys the
//!   first row does not have are dropped.
//! - Objects and arrays are written as their JSON text.
//! - An empty collection produces a single placeholder cell instead of headers.

use crate::clients::firestore::DocumentStore;
use crate::error::ReportError;
use crate::xlsx::CellValue;
use common::model::document::Document;
use log::info;
use serde_json::{Map, Value};

/// Collections exported into every report, in sheet order.
pub(crate) const COLLECTIONS: [&str; 5] = [
    "actividades",
    "productores",
    "riegos",
    "fertilizaciones",
    "cosechas",
];

/// Sole cell of the sheet of an empty collection.
pub(crate) const EMPTY_PLACEHOLDER: &str = "(sin datos)";

const ID_KEY: &str = "id";

/// One flattened document: field name to value, `id` first.
pub(crate) type Row = Map<String, Value>;

/// What ends up in one worksheet.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SheetContent {
    /// The collection had no documents.
    Placeholder,
    /// Header names and one cell list per document, aligned with the headers.
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SheetData {
    pub(crate) name: String,
    pub(crate) content: SheetContent,
}

/// Flatten a document into a row with the identifier under `id`.
pub(crate) fn to_row(doc: Document) -> Row {
    let mut row = Row::with_capacity(doc.fields.len() + 1);
    row.insert(ID_KEY.to_string(), Value::String(doc.id));
    for (key, value) in doc.fields {
        if key != ID_KEY {
            row.insert(key, value);
        }
    }
    row
}

/// Convert a field value into a cell. Objects and arrays become JSON text.
pub(crate) fn cell_value(value: &Value) -> CellValue {
    match value {
        Value::Null => CellValue::Empty,
        Value::Bool(b) => CellValue::Bool(*b),
        Value::Number(n) => match n.as_f64() {
            Some(f) => CellValue::Number(f),
            None => CellValue::String(n.to_string()),
        },
        Value::String(s) => CellValue::String(s.clone()),
        Value::Array(_) | Value::Object(_) => CellValue::String(value.to_string()),
    }
}

/// Lay out the rows of one collection using the first row's keys as columns.
pub(crate) fn build_sheet(name: &str, rows: Vec<Row>) -> SheetData {
    let Some(first) = rows.first() else {
        return SheetData {
            name: name.to_string(),
            content: SheetContent::Placeholder,
        };
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let cells = rows
        .iter()
        .map(|row| {
            headers
                .iter()
                .map(|key| row.get(key).map(cell_value).unwrap_or(CellValue::Empty))
                .collect()
        })
        .collect();

    SheetData {
        name: name.to_string(),
        content: SheetContent::Table {
            headers,
            rows: cells,
        },
    }
}

/// Read every collection in `names`, one after the other, and lay each out as a sheet.
///
/// The first failing read aborts the export.
pub(crate) async fn export_collections(
    store: &dyn DocumentStore,
    names: &[&str],
) -> Result<Vec<SheetData>, ReportError> {
    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let documents = store.list_documents(name).await?;
        info!("Exporting {} documents from '{}'", documents.len(), name);
        let rows = documents.into_iter().map(to_row).collect();
        sheets.push(build_sheet(name, rows));
    }
    Ok(sheets)
}
