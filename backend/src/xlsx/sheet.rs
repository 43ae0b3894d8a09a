//! Worksheet model and worksheet XML generation.

use super::strings::SharedStrings;
use super::{cell_ref, col_to_letter, Result, MAX_CELL_CHARS};
use log::warn;
use std::fmt::Write as FmtWrite;

/// Value of a single worksheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    /// Text, stored in the shared strings table. Control characters other
    /// than tab, line feed and carriage return cannot appear in XML and are
    /// dropped when written. JSON text never contains raw control characters,
    /// so composite values survive intact.
    String(String),
    Number(f64),
    Bool(bool),
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// An ordered grid of rows. Rows may have different lengths.
#[derive(Debug, Clone)]
pub struct Worksheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
}

impl Worksheet {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a row after the last one.
    pub fn append_row<I, V>(&mut self, cells: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    #[cfg(test)]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn max_col(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Render `xl/worksheets/sheetN.xml`, registering text cells in `strings`.
    pub(crate) fn to_xml(&self, strings: &mut SharedStrings) -> Result<String> {
        let mut xml = String::with_capacity(256 + self.rows.len() * 64);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
        );
        xml.push_str(
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
        );

        let max_col = self.max_col();
        if self.rows.is_empty() || max_col == 0 {
            xml.push_str(r#"<dimension ref="A1"/>"#);
        } else {
            write!(
                xml,
                r#"<dimension ref="A1:{}{}"/>"#,
                col_to_letter(max_col as u32 - 1),
                self.rows.len()
            )?;
        }

        xml.push_str("<sheetData>");
        for (row_idx, row) in self.rows.iter().enumerate() {
            let row_idx = row_idx as u32;
            write!(xml, r#"<row r="{}">"#, row_idx + 1)?;
            for (col_idx, value) in row.iter().enumerate() {
                write_cell(&mut xml, &cell_ref(row_idx, col_idx as u32), value, strings)?;
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData>");
        xml.push_str("</worksheet>");

        Ok(xml)
    }
}

fn exceeds_cell_limit(s: &str) -> bool {
    s.len() > MAX_CELL_CHARS && s.chars().count() > MAX_CELL_CHARS
}

fn write_cell(
    xml: &mut String,
    cell_ref: &str,
    value: &CellValue,
    strings: &mut SharedStrings,
) -> Result<()> {
    match value {
        CellValue::Empty => {}
        CellValue::String(s) => {
            if exceeds_cell_limit(s) {
                warn!(
                    "Cell {} holds {} characters, more than Excel's {} per cell",
                    cell_ref,
                    s.chars().count(),
                    MAX_CELL_CHARS
                );
            }
            let index = strings.add_string(s);
            write!(xml, r#"<c r="{}" t="s"><v>{}</v></c>"#, cell_ref, index)?;
        }
        CellValue::Number(n) if n.is_finite() => {
            write!(xml, r#"<c r="{}"><v>{}</v></c>"#, cell_ref, n)?;
        }
        CellValue::Number(n) => {
            // NaN and infinities have no numeric cell representation.
            let index = strings.add_string(&n.to_string());
            write!(xml, r#"<c r="{}" t="s"><v>{}</v></c>"#, cell_ref, index)?;
        }
        CellValue::Bool(b) => {
            write!(
                xml,
                r#"<c r="{}" t="b"><v>{}</v></c>"#,
                cell_ref,
                if *b { "1" } else { "0" }
            )?;
        }
    }
    Ok(())
}
