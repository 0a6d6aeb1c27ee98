use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::Value as JsonValue;

use super::model::{CanonicalData, CellValue, RecordList, dedupe_field_names};
use super::normalize::{from_json_value, normalize_records};
use super::xlsx;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load chart data from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.json` – `{"labels": [...], "values": [...]}` or `[{...}, ...]`
/// * `.csv`  – header row + one record per line
/// * `.xlsx` – first worksheet, first row is the header
pub fn load_file(path: &Path) -> Result<CanonicalData> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "json" => load_json(path),
        "csv" => load_csv(path).map(normalize_records),
        "xlsx" => xlsx::read_first_sheet(path).map(normalize_records),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Either canonical shape, decoded as-is (no backslash unescaping, unlike
/// typed-in JSON text).
fn load_json(path: &Path) -> Result<CanonicalData> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;
    from_json_value(root).with_context(|| format!("{} does not hold chart data", path.display()))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with field names, then one record per row.
/// Field order follows the header.
fn load_csv(path: &Path) -> Result<RecordList> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers = dedupe_field_names(
        reader
            .headers()
            .context("reading CSV headers")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect(),
    );

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(guess_cell_type).collect());
    }

    log::debug!("CSV {}: {} rows, columns {:?}", path.display(), rows.len(), headers);
    Ok(RecordList::new(headers, rows)?)
}

fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    match s {
        "true" | "True" | "TRUE" => CellValue::Bool(true),
        "false" | "False" | "FALSE" => CellValue::Bool(false),
        _ => CellValue::String(s.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::data::model::{Scalar, SeriesValues};
    use crate::data::normalize::{SourceKind, normalize};
    use crate::error::ChartError;

    fn write_temp(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn csv_rows_become_typed_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(
            &dir,
            "sales.csv",
            "month,sales,margin,open\nJan,10,0.5,true\nFeb,,1.25,false\n",
        );

        let CanonicalData::Records(records) = load_file(&path).unwrap() else {
            panic!("csv must load as records");
        };
        assert_eq!(records.columns(), ["month", "sales", "margin", "open"]);
        assert_eq!(
            records.rows()[0],
            vec![
                CellValue::String("Jan".into()),
                CellValue::Integer(10),
                CellValue::Float(0.5),
                CellValue::Bool(true),
            ]
        );
        assert_eq!(records.rows()[1][1], CellValue::Null);
    }

    #[test]
    fn csv_duplicate_headers_keep_every_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "dup.csv", "month,sales,sales\nJan,10,11\n");

        let data = load_file(&path).unwrap();
        let CanonicalData::Records(records) = &data else {
            panic!("csv must load as records");
        };
        assert_eq!(records.columns(), ["month", "sales", "sales.1"]);

        let text = data.to_pretty_json();
        let again = normalize(&text, SourceKind::Json).unwrap();
        assert_eq!(again, data);
    }

    #[test]
    fn json_file_accepts_labeled_series() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "data.JSON", r#"{"labels":["A","B"],"values":[1,2]}"#);

        let CanonicalData::Labeled(series) = load_file(&path).unwrap() else {
            panic!("expected labeled series");
        };
        assert_eq!(
            series.values(),
            &SeriesValues::Single(vec![Scalar::Number(1.0), Scalar::Number(2.0)])
        );
    }

    #[test]
    fn json_file_with_wrong_shape_reports_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "bad.json", r#"{"hello": "world"}"#);

        let err = load_file(&path).unwrap_err();
        assert!(err.root_cause().downcast_ref::<ChartError>().is_some());
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "notes.txt", "A:1");
        let err = load_file(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported file extension: .txt"));
    }

    #[test]
    fn missing_file_is_an_io_failure() {
        let err = load_file(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(err
            .chain()
            .any(|e| e.is::<std::io::Error>() || e.is::<csv::Error>()));
    }
}
