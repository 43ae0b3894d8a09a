//! Workbook model and XLSX packaging.

use super::sheet::Worksheet;
use super::strings::SharedStrings;
use super::{escape_xml, Result, XlsxError};
use chrono::{DateTime, Datelike, Timelike, Utc};
use regex::Regex;
use std::collections::HashSet;
use std::fmt::Write as FmtWrite;
use std::io::{Cursor, Write};
use std::sync::LazyLock;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Longest sheet name Excel accepts.
const MAX_SHEET_NAME_CHARS: usize = 31;

/// Characters Excel rejects in sheet names.
static INVALID_SHEET_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\[\]:*?/\\]").expect("valid sheet name regex"));

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const STYLES_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<fonts count="1"><font><sz val="11"/><name val="Calibri"/><family val="2"/></font></fonts>"#,
    r#"<fills count="2"><fill><patternFill patternType="none"/></fill>"#,
    r#"<fill><patternFill patternType="gray125"/></fill></fills>"#,
    r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#,
    r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
    r#"<cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>"#,
    r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#,
    r#"</styleSheet>"#
);

const ROOT_RELS_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>"#,
    r#"<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>"#,
    r#"</Relationships>"#
);

/// An ordered set of worksheets serialized together into one `.xlsx` file.
///
/// `created` is written to the document properties and used as the ZIP entry
/// timestamp, so identical content and creation time give identical bytes.
#[derive(Debug, Clone)]
pub struct Workbook {
    worksheets: Vec<Worksheet>,
    created: DateTime<Utc>,
    application: String,
}

impl Workbook {
    pub fn new(created: DateTime<Utc>) -> Self {
        Self {
            worksheets: Vec::new(),
            created,
            application: env!("CARGO_PKG_NAME").to_string(),
        }
    }

    /// Add a worksheet at the end of the workbook.
    ///
    /// The name is adjusted to Excel's rules: forbidden characters become `_`,
    /// it is cut to 31 characters, and a numeric suffix is added when another
    /// sheet already uses it (compared case-insensitively).
    pub fn add_worksheet(&mut self, name: &str) -> &mut Worksheet {
        let name = self.unique_sheet_name(name);
        self.worksheets.push(Worksheet::new(name));
        let last = self.worksheets.len() - 1;
        &mut self.worksheets[last]
    }

    #[cfg(test)]
    pub fn worksheets(&self) -> &[Worksheet] {
        &self.worksheets
    }

    #[cfg(test)]
    pub fn worksheet(&self, name: &str) -> Option<&Worksheet> {
        self.worksheets.iter().find(|ws| ws.name() == name)
    }

    fn unique_sheet_name(&self, requested: &str) -> String {
        let base = sanitize_sheet_name(requested, self.worksheets.len() + 1);
        let taken: HashSet<String> = self
            .worksheets
            .iter()
            .map(|ws| ws.name().to_lowercase())
            .collect();
        if !taken.contains(&base.to_lowercase()) {
            return base;
        }

        let mut n = 2;
        loop {
            let suffix = format!(" ({})", n);
            let keep = MAX_SHEET_NAME_CHARS - suffix.chars().count();
            let candidate: String = base.chars().take(keep).collect::<String>() + &suffix;
            if !taken.contains(&candidate.to_lowercase()) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Serialize the workbook to `.xlsx` bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.worksheets.is_empty() {
            return Err(XlsxError::NoWorksheets);
        }

        // Sheets first: they fill the shared strings table.
        let mut strings = SharedStrings::new();
        let mut sheet_xml = Vec::with_capacity(self.worksheets.len());
        for ws in &self.worksheets {
            sheet_xml.push(ws.to_xml(&mut strings)?);
        }

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(self.zip_timestamp());

        let mut put = |name: &str, content: &str| -> Result<()> {
            writer.start_file(name, options)?;
            writer.write_all(content.as_bytes())?;
            Ok(())
        };

        put("[Content_Types].xml", &self.content_types_xml()?)?;
        put("_rels/.rels", ROOT_RELS_XML)?;
        put("docProps/core.xml", &self.core_xml())?;
        put("docProps/app.xml", &self.app_xml())?;
        put("xl/workbook.xml", &self.workbook_xml()?)?;
        put("xl/_rels/workbook.xml.rels", &self.workbook_rels_xml()?)?;
        put("xl/styles.xml", STYLES_XML)?;
        put("xl/sharedStrings.xml", &strings.to_xml()?)?;
        for (index, xml) in sheet_xml.iter().enumerate() {
            put(&format!("xl/worksheets/sheet{}.xml", index + 1), xml)?;
        }

        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }

    fn zip_timestamp(&self) -> zip::DateTime {
        let c = self.created;
        zip::DateTime::from_date_and_time(
            c.year().clamp(1980, 2107) as u16,
            c.month() as u8,
            c.day() as u8,
            c.hour() as u8,
            c.minute() as u8,
            c.second() as u8,
        )
        .unwrap_or_default()
    }

    fn content_types_xml(&self) -> Result<String> {
        let mut xml = String::with_capacity(1024);
        xml.push_str(XML_DECLARATION);
        xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
        xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
        xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
        xml.push_str(r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
        for index in 1..=self.worksheets.len() {
            write!(
                xml,
                r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                index
            )?;
        }
        xml.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
        xml.push_str(r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#);
        xml.push_str(r#"<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#);
        xml.push_str(r#"<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#);
        xml.push_str("</Types>");
        Ok(xml)
    }

    fn core_xml(&self) -> String {
        let created = self.created.format("%Y-%m-%dT%H:%M:%SZ");
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
                r#"xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" "#,
                r#"xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
                r#"<dc:creator>{app}</dc:creator>"#,
                r#"<dcterms:created xsi:type="dcterms:W3CDTF">{created}</dcterms:created>"#,
                r#"<dcterms:modified xsi:type="dcterms:W3CDTF">{created}</dcterms:modified>"#,
                r#"</cp:coreProperties>"#
            ),
            app = escape_xml(&self.application),
            created = created,
        )
    }

    fn app_xml(&self) -> String {
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" "#,
                r#"xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">"#,
                r#"<Application>{}</Application>"#,
                r#"</Properties>"#
            ),
            escape_xml(&self.application)
        )
    }

    fn workbook_xml(&self) -> Result<String> {
        let mut xml = String::with_capacity(512);
        xml.push_str(XML_DECLARATION);
        xml.push_str(
            r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
        );
        xml.push_str(
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
        );
        xml.push_str("<sheets>");
        for (index, ws) in self.worksheets.iter().enumerate() {
            write!(
                xml,
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape_xml(ws.name()),
                index + 1,
                index + 1
            )?;
        }
        xml.push_str("</sheets>");
        xml.push_str("</workbook>");
        Ok(xml)
    }

    fn workbook_rels_xml(&self) -> Result<String> {
        let sheet_count = self.worksheets.len();
        let mut xml = String::with_capacity(512);
        xml.push_str(XML_DECLARATION);
        xml.push_str(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for index in 1..=sheet_count {
            write!(
                xml,
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                index, index
            )?;
        }
        write!(
            xml,
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
            sheet_count + 1
        )?;
        write!(
            xml,
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#,
            sheet_count + 2
        )?;
        xml.push_str("</Relationships>");
        Ok(xml)
    }
}

/// Apply Excel's sheet naming rules to `name`. `position` (1-based) names
/// the sheet when nothing usable is left.
fn sanitize_sheet_name(name: &str, position: usize) -> String {
    let cleaned = INVALID_SHEET_CHARS.replace_all(name, "_");
    // Excel also rejects a leading or trailing apostrophe.
    let trimmed = cleaned.trim().trim_matches('\'');
    let truncated: String = trimmed.chars().take(MAX_SHEET_NAME_CHARS).collect();
    if truncated.is_empty() {
        format!("Sheet{}", position)
    } else {
        truncated
    }
}
