//! Shared strings table for XLSX workbooks.

use super::{escape_xml, Result};
use std::collections::HashMap;
use std::fmt::Write as FmtWrite;

/// Excel stores text cells as indices into one workbook-wide table of unique
/// strings. Indices are handed out in first-seen order.
#[derive(Debug, Default)]
pub(crate) struct SharedStrings {
    strings: Vec<String>,
    string_to_index: HashMap<String, usize>,
    /// Number of references, including duplicates (`count` attribute).
    references: usize,
}

impl SharedStrings {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a string and return its index. Existing strings keep their index.
    pub(crate) fn add_string(&mut self, s: &str) -> usize {
        self.references += 1;
        if let Some(&index) = self.string_to_index.get(s) {
            return index;
        }
        let index = self.strings.len();
        self.strings.push(s.to_string());
        self.string_to_index.insert(s.to_string(), index);
        index
    }

    #[cfg(test)]
    pub(crate) fn unique_count(&self) -> usize {
        self.strings.len()
    }

    pub(crate) fn to_xml(&self) -> Result<String> {
        let mut xml = String::with_capacity(64 + self.strings.len() * 16);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        write!(
            xml,
            r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{}" uniqueCount="{}">"#,
            self.references,
            self.strings.len()
        )?;
        for s in &self.strings {
            // Leading/trailing whitespace is dropped by Excel unless preserved.
            if s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace) {
                write!(xml, r#"<si><t xml:space="preserve">{}</t></si>"#, escape_xml(s))?;
            } else {
                write!(xml, "<si><t>{}</t></si>", escape_xml(s))?;
            }
        }
        xml.push_str("</sst>");
        Ok(xml)
    }
}
