use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use anyhow::{Context, Result, bail};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use zip::ZipArchive;
use zip::result::ZipError;

use super::model::{CellValue, RecordList, dedupe_field_names};

const DEFAULT_SHEET: &str = "xl/worksheets/sheet1.xml";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Read the first worksheet of an `.xlsx` workbook as records: the first
/// non-empty row is the header, every following non-empty row one record.
pub fn read_first_sheet(path: &Path) -> Result<RecordList> {
    let file = File::open(path).context("opening workbook")?;
    let mut archive = ZipArchive::new(file).context("reading xlsx archive")?;

    let shared = match read_part(&mut archive, "xl/sharedStrings.xml")? {
        Some(xml) => parse_shared_strings(&xml).context("parsing shared strings")?,
        None => Vec::new(),
    };

    let sheet_path = first_sheet_path(&mut archive)?;
    let sheet_xml = read_part(&mut archive, &sheet_path)?
        .with_context(|| format!("workbook has no part {sheet_path}"))?;
    let rows = parse_sheet(&sheet_xml, &shared).with_context(|| format!("parsing {sheet_path}"))?;

    records_from_rows(rows)
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    match archive.by_name(name) {
        Ok(mut part) => {
            let mut xml = String::new();
            part.read_to_string(&mut xml)
                .with_context(|| format!("reading {name}"))?;
            Ok(Some(xml))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("opening {name}")),
    }
}

// ---------------------------------------------------------------------------
// Workbook → first sheet part
// ---------------------------------------------------------------------------

/// Follow `xl/workbook.xml` → `xl/_rels/workbook.xml.rels` to the part of the
/// first `<sheet>`. Falls back to `sheet1.xml` when either is missing.
fn first_sheet_path<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String> {
    let Some(workbook) = read_part(archive, "xl/workbook.xml")? else {
        return Ok(DEFAULT_SHEET.to_string());
    };
    let Some(rel_id) = first_sheet_rel_id(&workbook)? else {
        return Ok(DEFAULT_SHEET.to_string());
    };
    let Some(rels) = read_part(archive, "xl/_rels/workbook.xml.rels")? else {
        return Ok(DEFAULT_SHEET.to_string());
    };

    Ok(relationship_target(&rels, &rel_id)?
        .map(|target| match target.strip_prefix('/') {
            Some(absolute) => absolute.to_string(),
            None => format!("xl/{target}"),
        })
        .unwrap_or_else(|| DEFAULT_SHEET.to_string()))
}

fn first_sheet_rel_id(workbook_xml: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(workbook_xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                return attr_value(&e, b"id");
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn relationship_target(rels_xml: &str, rel_id: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(rels_xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e)
                if e.local_name().as_ref() == b"Relationship"
                    && attr_value(&e, b"Id")?.as_deref() == Some(rel_id) =>
            {
                return attr_value(&e, b"Target");
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Attribute value by local name (`r:id` matches `id`).
fn attr_value(e: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == local {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

// ---------------------------------------------------------------------------
// Shared strings
// ---------------------------------------------------------------------------

/// Every `<si>` becomes one string; rich-text runs are concatenated and
/// phonetic hints (`<rPh>`) dropped.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_text && !in_phonetic => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.extend(current.take()),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

// ---------------------------------------------------------------------------
// Worksheet cells
// ---------------------------------------------------------------------------

/// Cells of one row as `(zero-based column, value)`.
type SheetRow = Vec<(u32, CellValue)>;

struct PendingCell {
    column: u32,
    kind: Option<String>,
    raw: String,
}

fn parse_sheet(xml: &str, shared: &[String]) -> Result<Vec<SheetRow>> {
    let mut reader = Reader::from_str(xml);
    let mut rows = Vec::new();
    let mut row: SheetRow = Vec::new();
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => row = Vec::new(),
                b"c" => cell = Some(pending_cell(&e, &row)?),
                b"v" | b"t" => in_value = cell.is_some(),
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"row" => rows.push(Vec::new()),
            Event::Text(t) if in_value => {
                if let Some(c) = cell.as_mut() {
                    c.raw.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let Some(c) = cell.take() {
                        let value = typed_cell(&c, shared)?;
                        if !value.is_null() {
                            row.push((c.column, value));
                        }
                    }
                }
                b"row" => rows.push(std::mem::take(&mut row)),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rows)
}

fn pending_cell(e: &BytesStart<'_>, row: &SheetRow) -> Result<PendingCell> {
    let column = match attr_value(e, b"r")? {
        Some(reference) => column_index(&reference)
            .with_context(|| format!("bad cell reference {reference:?}"))?,
        None => row.last().map(|(col, _)| col + 1).unwrap_or(0),
    };
    Ok(PendingCell {
        column,
        kind: attr_value(e, b"t")?,
        raw: String::new(),
    })
}

/// `"C7"` → 2, `"AA1"` → 26.
fn column_index(reference: &str) -> Option<u32> {
    let letters: Vec<u8> = reference
        .bytes()
        .take_while(u8::is_ascii_alphabetic)
        .collect();
    if letters.is_empty() {
        return None;
    }
    let one_based = letters.iter().try_fold(0u32, |acc, b| {
        acc.checked_mul(26)?
            .checked_add(u32::from(b.to_ascii_uppercase() - b'A' + 1))
    })?;
    Some(one_based - 1)
}

fn typed_cell(cell: &PendingCell, shared: &[String]) -> Result<CellValue> {
    let raw = cell.raw.as_str();
    if raw.is_empty() {
        return Ok(CellValue::Null);
    }
    let value = match cell.kind.as_deref() {
        Some("s") => {
            let idx: usize = raw
                .trim()
                .parse()
                .with_context(|| format!("bad shared string index {raw:?}"))?;
            match shared.get(idx) {
                Some(s) => CellValue::String(s.clone()),
                None => bail!("shared string {idx} out of range ({} strings)", shared.len()),
            }
        }
        Some("b") => CellValue::Bool(raw.trim() == "1"),
        Some("str") | Some("inlineStr") | Some("e") | Some("d") => CellValue::String(raw.to_string()),
        _ => {
            let raw = raw.trim();
            if let Ok(i) = raw.parse::<i64>() {
                CellValue::Integer(i)
            } else if let Ok(f) = raw.parse::<f64>() {
                CellValue::Float(f)
            } else {
                CellValue::String(raw.to_string())
            }
        }
    };
    Ok(value)
}

// ---------------------------------------------------------------------------
// Rows → records
// ---------------------------------------------------------------------------

fn records_from_rows(rows: Vec<SheetRow>) -> Result<RecordList> {
    let mut rows = rows.into_iter().filter(|r| !r.is_empty());
    let Some(header) = rows.next() else {
        return Ok(RecordList::default());
    };

    let header_columns: Vec<u32> = header.iter().map(|(col, _)| *col).collect();
    let names = dedupe_field_names(header.iter().map(|(_, v)| v.to_string()).collect());

    let records = rows
        .map(|row| {
            header_columns
                .iter()
                .map(|col| {
                    row.iter()
                        .find(|(c, _)| c == col)
                        .map(|(_, v)| v.clone())
                        .unwrap_or(CellValue::Null)
                })
                .collect()
        })
        .collect();

    Ok(RecordList::new(names, records)?)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use super::*;

    const SHARED: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="4" uniqueCount="4">
  <si><t>month</t></si>
  <si><t>sales</t></si>
  <si><r><t>Ja</t></r><r><t>n</t></r><rPh><t>x</t></rPh></si>
  <si><t>Feb &amp; Mar</t></si>
</sst>"#;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="inlineStr"><is><t>ok</t></is></c></row>
    <row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2"><v>10</v></c><c r="C2" t="b"><v>1</v></c></row>
    <row r="3"/>
    <row r="4"><c r="A4" t="s"><v>3</v></c><c r="B4"><v>12.5</v></c></row>
  </sheetData>
</worksheet>"#;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"
          xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets><sheet name="Data" sheetId="1" r:id="rId3"/></sheets>
</workbook>"#;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/data.xml"/>
</Relationships>"#;

    #[test]
    fn shared_strings_concatenate_runs() {
        let strings = parse_shared_strings(SHARED).unwrap();
        assert_eq!(strings, ["month", "sales", "Jan", "Feb & Mar"]);
    }

    #[test]
    fn column_letters_map_to_indices() {
        assert_eq!(column_index("A1"), Some(0));
        assert_eq!(column_index("C7"), Some(2));
        assert_eq!(column_index("AA10"), Some(26));
        assert_eq!(column_index("12"), None);
        assert_eq!(column_index("ZZZZZZZZ1"), None);
    }

    #[test]
    fn sheet_rows_become_records() {
        let shared = parse_shared_strings(SHARED).unwrap();
        let records = records_from_rows(parse_sheet(SHEET, &shared).unwrap()).unwrap();

        assert_eq!(records.columns(), ["month", "sales", "ok"]);
        assert_eq!(
            records.rows(),
            [
                vec![
                    CellValue::String("Jan".into()),
                    CellValue::Integer(10),
                    CellValue::Bool(true),
                ],
                vec![
                    CellValue::String("Feb & Mar".into()),
                    CellValue::Float(12.5),
                    CellValue::Null,
                ],
            ]
        );
    }

    #[test]
    fn reads_first_sheet_through_workbook_relationships() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        {
            let file = File::create(&path).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            for (name, body) in [
                ("xl/workbook.xml", WORKBOOK),
                ("xl/_rels/workbook.xml.rels", RELS),
                ("xl/sharedStrings.xml", SHARED),
                ("xl/worksheets/data.xml", SHEET),
            ] {
                zip.start_file(name, SimpleFileOptions::default()).unwrap();
                zip.write_all(body.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }

        let records = read_first_sheet(&path).unwrap();
        assert_eq!(records.columns(), ["month", "sales", "ok"]);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn non_zip_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.xlsx");
        std::fs::write(&path, b"not a zip").unwrap();
        assert!(read_first_sheet(&path).is_err());
    }
}
