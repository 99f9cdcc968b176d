//! XLSX reader

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::styles::read_styles_xml;
use sheetwise_core::style::Style;
use sheetwise_core::{
    CellAddress, CellComment, CellRange, CellValue, DataValidation, Workbook, Worksheet,
};

/// Decode Excel's `_xHHHH_` escape sequences (`_x000a_` is a line feed)
fn decode_excel_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find("_x") {
        result.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        let decoded = candidate
            .get(2..6)
            .filter(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
            .filter(|_| candidate.as_bytes().get(6) == Some(&b'_'))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);

        match decoded {
            Some(c) => {
                result.push(c);
                rest = &candidate[7..];
            }
            None => {
                result.push_str("_x");
                rest = &candidate[2..];
            }
        }
    }

    result.push_str(rest);
    result
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.to_string()))
}

/// Resolve a relationship target relative to the folder of the part that owns it
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut parts: Vec<&str> = base_dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            ".." => {
                parts.pop();
            }
            "." | "" => {}
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// One `<c>` element while it is being read
#[derive(Default)]
struct PendingCell {
    reference: Option<String>,
    cell_type: Option<String>,
    style: Option<u32>,
    value: Option<String>,
}

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
        let file = File::open(path)?;
        Self::read(file)
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Workbook> {
        let mut archive = zip::ZipArchive::new(reader)?;

        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        let shared_strings = Self::read_shared_strings(&mut archive)?;
        let cell_styles = match archive.by_name("xl/styles.xml") {
            Ok(file) => read_styles_xml(file)?,
            Err(_) => vec![Style::default()],
        };
        let sheet_info = Self::read_workbook_xml(&mut archive)?;
        let sheet_paths = Self::read_relationships(&mut archive, "xl/_rels/workbook.xml.rels", "xl", "/worksheet")?
            .ok_or_else(|| XlsxError::MissingPart("xl/_rels/workbook.xml.rels".into()))?;

        let mut workbook = Workbook::empty();

        for (name, r_id) in &sheet_info {
            let Some(path) = sheet_paths.get(r_id) else {
                log::warn!("sheet '{}' has no worksheet part, skipping", name);
                continue;
            };

            let mut worksheet = Worksheet::new(name.as_str());
            Self::read_worksheet(&mut archive, path, &mut worksheet, &shared_strings, &cell_styles)?;

            let (dir, file_name) = path.rsplit_once('/').unwrap_or(("", path.as_str()));
            let rels_path = format!("{}/_rels/{}.rels", dir, file_name);
            if let Some(targets) = Self::read_relationships(&mut archive, &rels_path, dir, "/comments")? {
                for comments_path in targets.values() {
                    Self::read_worksheet_comments(&mut archive, comments_path, &mut worksheet)?;
                }
            }

            workbook.add_existing_worksheet(worksheet)?;
        }

        Ok(workbook)
    }

    fn read_shared_strings<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<String>> {
        let mut strings = Vec::new();

        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(strings),
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut current = String::new();
        let mut in_si = false;
        let mut in_t = false;
        // Phonetic hints (<rPh>) carry their own <t> that is not part of the value
        let mut in_phonetic = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current.clear();
                    }
                    b"rPh" => in_phonetic = true,
                    b"t" if in_si && !in_phonetic => in_t = true,
                    _ => {}
                },
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"si" => {
                        strings.push(decode_excel_escapes(&current));
                        in_si = false;
                    }
                    b"rPh" => in_phonetic = false,
                    b"t" => in_t = false,
                    _ => {}
                },
                Ok(Event::Text(e)) if in_t => {
                    if let Ok(text) = e.unescape() {
                        current.push_str(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    /// Sheet names and relationship ids in workbook order
    fn read_workbook_xml<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<(String, String)>> {
        let file = archive
            .by_name("xl/workbook.xml")
            .map_err(|_| XlsxError::MissingPart("xl/workbook.xml".into()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut sheets = Vec::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"sheet" => {
                    if let (Some(name), Some(r_id)) = (attr(&e, b"name"), attr(&e, b"r:id")) {
                        sheets.push((name, r_id));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(sheets)
    }

    /// Relationship id -> archive path for relationships whose type ends with
    /// `type_suffix`; `None` when the rels part does not exist
    fn read_relationships<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        rels_path: &str,
        base_dir: &str,
        type_suffix: &str,
    ) -> XlsxResult<Option<HashMap<String, String>>> {
        let file = match archive.by_name(rels_path) {
            Ok(f) => f,
            Err(_) => return Ok(None),
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut rels = HashMap::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    let id = attr(&e, b"Id");
                    let target = attr(&e, b"Target");
                    let rel_type = attr(&e, b"Type");
                    if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                        if rel_type.ends_with(type_suffix) {
                            rels.insert(id, resolve_target(base_dir, &target));
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(Some(rels))
    }

    fn read_worksheet<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
        worksheet: &mut Worksheet,
        shared_strings: &[String],
        cell_styles: &[Style],
    ) -> XlsxResult<()> {
        let file = archive
            .by_name(path)
            .map_err(|_| XlsxError::MissingPart(path.to_string()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();

        let mut cell: Option<PendingCell> = None;
        let mut in_value = false;
        let mut in_inline_text = false;

        let mut validation: Option<DataValidation> = None;
        let mut in_formula1 = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"c" => cell = Some(Self::pending_cell(&e)),
                    b"v" if cell.is_some() => in_value = true,
                    b"t" if cell.is_some() => in_inline_text = true,
                    b"dataValidation" => validation = Self::parse_validation_attrs(&e),
                    b"formula1" if validation.is_some() => in_formula1 = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"c" => {
                        Self::process_cell(worksheet, Self::pending_cell(&e), shared_strings, cell_styles)?
                    }
                    b"col" => Self::apply_column_width(worksheet, &e),
                    _ => {}
                },
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"c" => {
                        if let Some(pending) = cell.take() {
                            Self::process_cell(worksheet, pending, shared_strings, cell_styles)?;
                        }
                    }
                    b"v" => in_value = false,
                    b"t" => in_inline_text = false,
                    b"formula1" => in_formula1 = false,
                    b"dataValidation" => {
                        if let Some(dv) = validation.take() {
                            worksheet.add_data_validation(dv);
                        }
                    }
                    _ => {}
                },
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map_err(XlsxError::Xml)?;
                    if in_value || in_inline_text {
                        if let Some(pending) = cell.as_mut() {
                            pending.value.get_or_insert_with(String::new).push_str(&text);
                        }
                    } else if in_formula1 {
                        if let Some(dv) = validation.as_mut() {
                            match DataValidation::parse_list_formula(&text) {
                                Some(items) => dv.items = items,
                                None => {
                                    log::warn!(
                                        "dropdown in '{}' references a range ({}); items not loaded",
                                        worksheet.name(),
                                        text
                                    );
                                }
                            }
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }

    fn pending_cell(e: &BytesStart<'_>) -> PendingCell {
        PendingCell {
            reference: attr(e, b"r"),
            cell_type: attr(e, b"t"),
            style: attr(e, b"s").and_then(|s| s.parse().ok()),
            value: None,
        }
    }

    fn process_cell(
        worksheet: &mut Worksheet,
        cell: PendingCell,
        shared_strings: &[String],
        styles: &[Style],
    ) -> XlsxResult<()> {
        let Some(cell_ref) = cell.reference else {
            return Err(XlsxError::Parse(format!(
                "cell without a reference in sheet '{}'",
                worksheet.name()
            )));
        };
        let addr = CellAddress::parse(&cell_ref).map_err(|e| {
            XlsxError::Parse(format!("Invalid cell reference '{}': {}", cell_ref, e))
        })?;

        if let Some(value) = cell.value {
            let cell_value = match cell.cell_type.as_deref() {
                Some("s") => {
                    let idx: usize = value.parse().map_err(|_| {
                        XlsxError::Parse(format!("Invalid shared string index: {}", value))
                    })?;
                    let s = shared_strings.get(idx).ok_or_else(|| {
                        XlsxError::Parse(format!("Shared string index {} out of bounds", idx))
                    })?;
                    CellValue::String(s.clone())
                }
                Some("b") => CellValue::Boolean(value == "1" || value.eq_ignore_ascii_case("true")),
                Some("inlineStr") | Some("str") => CellValue::String(decode_excel_escapes(&value)),
                None | Some("n") => match value.parse::<f64>() {
                    Ok(n) => CellValue::Number(n),
                    Err(_) => CellValue::String(value),
                },
                // Errors (#N/A) and ISO dates (t="d") are kept as their text
                Some(_) => CellValue::String(value),
            };
            worksheet.set_cell_value_at(addr.row, addr.col, cell_value)?;
        }

        if let Some(s) = cell.style.filter(|s| *s != 0) {
            match styles.get(s as usize) {
                Some(style) => worksheet.set_cell_style_at(addr.row, addr.col, style)?,
                None => log::warn!("cell {} refers to unknown style {}", cell_ref, s),
            }
        }

        Ok(())
    }

    fn apply_column_width(worksheet: &mut Worksheet, e: &BytesStart<'_>) {
        let parse = |key: &[u8]| attr(e, key).and_then(|v| v.parse::<f64>().ok());
        let (Some(min), Some(max), Some(width)) = (parse(b"min"), parse(b"max"), parse(b"width"))
        else {
            return;
        };
        // Excel emits min=1 max=16384 for "all columns"; only record explicit spans
        if max - min > 255.0 {
            return;
        }
        for col in (min as u32)..=(max as u32) {
            if let Ok(col) = u16::try_from(col.saturating_sub(1)) {
                worksheet.set_column_width(col, width);
            }
        }
    }

    /// Only list dropdowns are modelled; other validation types are skipped
    fn parse_validation_attrs(e: &BytesStart<'_>) -> Option<DataValidation> {
        if attr(e, b"type").as_deref() != Some("list") {
            return None;
        }
        let mut dv = DataValidation::list(Vec::<String>::new());
        dv.allow_blank = attr(e, b"allowBlank").as_deref() == Some("1");
        dv.show_error_alert = attr(e, b"showErrorMessage").as_deref() == Some("1");
        dv.ranges = attr(e, b"sqref")
            .map(|sqref| {
                sqref
                    .split_whitespace()
                    .filter_map(|s| CellRange::parse(s).ok())
                    .collect()
            })
            .unwrap_or_default();
        Some(dv)
    }

    fn read_worksheet_comments<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        comments_path: &str,
        worksheet: &mut Worksheet,
    ) -> XlsxResult<()> {
        let file = match archive.by_name(comments_path) {
            Ok(f) => f,
            Err(_) => {
                log::warn!("notes part {} is referenced but missing", comments_path);
                return Ok(());
            }
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut authors: Vec<String> = Vec::new();

        let mut in_author = false;
        let mut in_t = false;
        let mut current: Option<(Option<String>, Option<usize>)> = None;
        let mut text = String::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"author" => in_author = true,
                    b"comment" => {
                        current = Some((
                            attr(&e, b"ref"),
                            attr(&e, b"authorId").and_then(|s| s.parse().ok()),
                        ));
                        text.clear();
                    }
                    b"t" if current.is_some() => in_t = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.name().as_ref() == b"author" => {
                    authors.push(String::new());
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"author" => in_author = false,
                    b"t" => in_t = false,
                    b"comment" => {
                        if let Some((Some(cell_ref), author_id)) = current.take() {
                            if let Ok(addr) = CellAddress::parse(&cell_ref) {
                                let author = author_id
                                    .and_then(|id| authors.get(id))
                                    .cloned()
                                    .unwrap_or_default();
                                worksheet.set_comment_at(
                                    addr.row,
                                    addr.col,
                                    CellComment::new(author, decode_excel_escapes(&text)),
                                );
                            }
                        }
                    }
                    _ => {}
                },
                Ok(Event::Text(e)) => {
                    let value = e.unescape().map_err(XlsxError::Xml)?;
                    if in_author {
                        authors.push(value.to_string());
                    } else if in_t {
                        // Rich text runs are contiguous pieces of one note
                        text.push_str(&value);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn test_decode_excel_escapes() {
        assert_eq!(decode_excel_escapes("a_x000a_b"), "a\nb");
        assert_eq!(decode_excel_escapes("_x005F_x"), "_x");
        assert_eq!(decode_excel_escapes("plain"), "plain");
        assert_eq!(decode_excel_escapes("_x00"), "_x00");
        assert_eq!(decode_excel_escapes("_xZZZZ_"), "_xZZZZ_");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("xl", "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("xl/worksheets", "../comments1.xml"), "xl/comments1.xml");
        assert_eq!(resolve_target("xl", "/xl/worksheets/s.xml"), "xl/worksheets/s.xml");
    }

    fn minimal_package(sheet_xml: &str, shared_strings: Option<&str>) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = zip::write::SimpleFileOptions::default();

            zip.start_file("[Content_Types].xml", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#).unwrap();

            zip.start_file("xl/workbook.xml", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="people" sheetId="1" r:id="rId1"/></sheets></workbook>"#).unwrap();

            zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#).unwrap();

            if let Some(sst) = shared_strings {
                zip.start_file("xl/sharedStrings.xml", options).unwrap();
                zip.write_all(sst.as_bytes()).unwrap();
            }

            zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
            zip.write_all(sheet_xml.as_bytes()).unwrap();

            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn test_read_shared_strings_and_types() {
        let sst = r#"<sst><si><t>name</t></si><si><r><t>Jo</t></r><r><t>an</t></r></si></sst>"#;
        let sheet = r#"<worksheet><cols><col min="1" max="2" width="14.5" customWidth="1"/></cols><sheetData>
            <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="b"><v>1</v></c></row>
            <row r="2"><c r="A2" t="s"><v>1</v></c><c r="B2"><v>35</v></c><c r="C2" t="e"><v>#N/A</v></c><c r="D2" s="0"/></row>
        </sheetData></worksheet>"#;

        let workbook = XlsxReader::read(Cursor::new(minimal_package(sheet, Some(sst)))).unwrap();
        let ws = workbook.worksheet(0).unwrap();

        assert_eq!(ws.name(), "people");
        assert_eq!(ws.get_value_at(0, 0), CellValue::string("name"));
        assert_eq!(ws.get_value_at(0, 1), CellValue::Boolean(true));
        assert_eq!(ws.get_value_at(1, 0), CellValue::string("Joan"));
        assert_eq!(ws.get_value_at(1, 1), CellValue::Number(35.0));
        assert_eq!(ws.get_value_at(1, 2), CellValue::string("#N/A"));
        assert!(ws.cell_at(1, 3).is_none());
        assert_eq!(ws.column_width(1), 14.5);
    }

    #[test]
    fn test_missing_content_types() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file("xl/workbook.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"<workbook/>").unwrap();
            zip.finish().unwrap();
        }
        assert!(matches!(
            XlsxReader::read(Cursor::new(buf)),
            Err(XlsxError::InvalidFormat(_))
        ));
    }
}
