//! # XLSX Writer
//!
//! A small Office Open XML spreadsheet writer. It covers what the report
//! export needs and nothing more: ordered worksheets of plain cells (text,
//! numbers, booleans), a shared strings table, and the package parts Excel
//! and LibreOffice require to open the file.
//!
//! ## Sub-modules:
//! - `strings`: Deduplicated shared strings table (`xl/sharedStrings.xml`).
//! - `sheet`: Worksheet model and `xl/worksheets/sheetN.xml` generation.
//! - `workbook`: Workbook model, sheet naming rules and ZIP packaging.

mod sheet;
mod strings;
mod workbook;

pub use sheet::CellValue;
pub use workbook::Workbook;

/// Most characters Excel accepts in one cell. Longer text is still written in
/// full, and Excel offers to repair the file when opening it.
pub const MAX_CELL_CHARS: usize = 32_767;

/// MIME type of a serialized workbook.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Errors raised while serializing a workbook.
#[derive(Debug, thiserror::Error)]
pub enum XlsxError {
    #[error("workbook has no worksheets")]
    NoWorksheets,

    #[error("XML write error: {0}")]
    Fmt(#[from] std::fmt::Error),

    #[error("ZIP write error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, XlsxError>;

/// Escape XML special characters.
///
/// Control characters other than tab, line feed and carriage return are not
/// allowed in XML 1.0 and are dropped.
pub(crate) fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}

/// Convert a 0-based column index to its letter form (`0` -> `A`, `26` -> `AA`).
pub(crate) fn col_to_letter(col: u32) -> String {
    let mut n = col + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push(b'A' + rem);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// A1-style reference for a 0-based row/column pair.
pub(crate) fn cell_ref(row: u32, col: u32) -> String {
    format!("{}{}", col_to_letter(col), row + 1)
}
