//! Turns exported sheets into an `.xlsx` workbook.
//!
//! Sheets keep the order they were exported in. A table sheet gets its header
//! row first and then one row per document. A placeholder sheet holds the
//! single placeholder cell at `A1`.

use super::export::{SheetContent, SheetData, EMPTY_PLACEHOLDER};
use crate::error::ReportError;
use crate::xlsx::Workbook;
use chrono::{DateTime, Utc};

/// Build one worksheet per exported sheet.
pub(crate) fn assemble(sheets: &[SheetData], created: DateTime<Utc>) -> Workbook {
    let mut workbook = Workbook::new(created);
    for sheet in sheets {
        let ws = workbook.add_worksheet(&sheet.name);
        match &sheet.content {
            SheetContent::Placeholder => ws.append_row([EMPTY_PLACEHOLDER]),
            SheetContent::Table { headers, rows } => {
                ws.append_row(headers.iter().map(String::as_str));
                for row in rows {
                    ws.append_row(row.iter().cloned());
                }
            }
        }
    }
    workbook
}

/// Serialize the workbook off the async runtime.
pub(crate) async fn serialize(workbook: Workbook) -> Result<Vec<u8>, ReportError> {
    tokio::task::spawn_blocking(move || workbook.to_bytes())
        .await
        .map_err(|e| ReportError::Internal(format!("Task join error: {}", e)))?
        .map_err(ReportError::from)
}
