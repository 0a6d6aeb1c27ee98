use serde_json::{Map, Value as JsonValue};

use super::model::{CanonicalData, CellValue, LabeledSeries, RecordList, Scalar, SeriesValues};
use crate::error::{ChartError, Result};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// How a block of typed-in text should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// `label:value` pairs separated by commas and/or newlines.
    Shorthand,
    /// A JSON labeled series or record list.
    Json,
}

/// Guess how typed-in text is meant: anything with a colon that is not
/// clearly JSON (containing both `{` and `[`) is shorthand.
pub fn detect_source_kind(text: &str) -> SourceKind {
    let has_colon = text.contains(':') || text.contains('：');
    let looks_like_json = text.contains('{') && text.contains('[');
    if has_colon && !looks_like_json {
        SourceKind::Shorthand
    } else {
        SourceKind::Json
    }
}

/// Normalize typed-in text into canonical data.
pub fn normalize(raw: &str, kind: SourceKind) -> Result<CanonicalData> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ChartError::format("empty input"));
    }
    match kind {
        SourceKind::Shorthand => parse_shorthand(text),
        SourceKind::Json => parse_json_text(text),
    }
}

/// Records already parsed by a file reader pass through untouched.
pub fn normalize_records(records: RecordList) -> CanonicalData {
    CanonicalData::Records(records)
}

// ---------------------------------------------------------------------------
// Shorthand text
// ---------------------------------------------------------------------------

/// `A:10, B:20.5` / one pair per line. Fragments without a colon are skipped.
fn parse_shorthand(text: &str) -> Result<CanonicalData> {
    let text = text.replace('：', ":").replace('，', ",");

    let mut labels = Vec::new();
    let mut values = Vec::new();

    let fragments = text
        .lines()
        .flat_map(|line| line.split(','))
        .map(str::trim)
        .filter(|frag| !frag.is_empty());

    for fragment in fragments {
        let Some((label, value)) = fragment.split_once(':') else {
            log::debug!("skipping shorthand fragment without a colon: {fragment:?}");
            continue;
        };
        labels.push(label.trim().to_string());
        values.push(coerce_value(value.trim()));
    }

    LabeledSeries::new(labels, SeriesValues::Single(values)).map(CanonicalData::Labeled)
}

/// Digits with at most one decimal point become a number, anything else
/// (signs and exponents included) stays text.
fn coerce_value(s: &str) -> Scalar {
    let digits = s.replacen('.', "", 1);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(v) = s.parse::<f64>() {
            return Scalar::Number(v);
        }
    }
    Scalar::Text(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON text
// ---------------------------------------------------------------------------

fn parse_json_text(text: &str) -> Result<CanonicalData> {
    let unescaped = unescape_backslashes(text)?;
    let root: JsonValue =
        serde_json::from_str(&unescaped).map_err(|e| ChartError::format(e.to_string()))?;
    from_json_value(root)
}

/// Resolve backslash escapes (`\n`, `\t`, `\\`, `\"`, `\xHH`, `\uXXXX`, ...)
/// before JSON decoding. Unknown escapes are kept verbatim.
pub fn unescape_backslashes(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(esc) = chars.next() else {
            return Err(ChartError::format("\\ at end of input"));
        };
        match esc {
            '\n' => {}
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\x0b'),
            '0'..='7' => {
                let mut code = esc.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char_from_code(code, "octal")?);
            }
            'x' => out.push(read_hex_escape(&mut chars, 2, "\\xXX")?),
            'u' => out.push(read_hex_escape(&mut chars, 4, "\\uXXXX")?),
            'U' => out.push(read_hex_escape(&mut chars, 8, "\\UXXXXXXXX")?),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Ok(out)
}

fn read_hex_escape(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    width: usize,
    what: &str,
) -> Result<char> {
    let mut code = 0u32;
    for _ in 0..width {
        let digit = chars
            .next()
            .and_then(|d| d.to_digit(16))
            .ok_or_else(|| ChartError::format(format!("truncated {what} escape")))?;
        code = code * 16 + digit;
    }
    char_from_code(code, what)
}

fn char_from_code(code: u32, what: &str) -> Result<char> {
    char::from_u32(code)
        .ok_or_else(|| ChartError::format(format!("invalid {what} escape: {code:#x}")))
}

/// Decode an already-parsed JSON document into one of the canonical shapes.
pub fn from_json_value(root: JsonValue) -> Result<CanonicalData> {
    match root {
        JsonValue::Object(obj) if obj.contains_key("labels") && obj.contains_key("values") => {
            labeled_from_json(&obj).map(CanonicalData::Labeled)
        }
        JsonValue::Array(items) => records_from_json(items).map(CanonicalData::Records),
        other => Err(ChartError::format(format!(
            "expected {{\"labels\": [...], \"values\": [...]}} or a list of records, got {}",
            json_kind(&other)
        ))),
    }
}

fn labeled_from_json(obj: &Map<String, JsonValue>) -> Result<LabeledSeries> {
    let labels: Vec<String> = obj
        .get("labels")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| ChartError::format("\"labels\" must be an array"))?
        .iter()
        .map(|label| match label {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();

    let raw_values = obj
        .get("values")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| ChartError::format("\"values\" must be an array"))?;

    let values = if raw_values.first().is_some_and(JsonValue::is_array) {
        let series = raw_values
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let inner = s.as_array().ok_or_else(|| {
                    ChartError::format(format!("values[{i}] is not an array of numbers"))
                })?;
                inner
                    .iter()
                    .enumerate()
                    .map(|(j, v)| {
                        v.as_f64().ok_or_else(|| {
                            ChartError::format(format!("values[{i}][{j}] is not a number"))
                        })
                    })
                    .collect::<Result<Vec<f64>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        SeriesValues::Multi(series)
    } else {
        let vals = raw_values
            .iter()
            .enumerate()
            .map(|(i, v)| match v {
                JsonValue::Number(n) => n
                    .as_f64()
                    .map(Scalar::Number)
                    .ok_or_else(|| ChartError::format(format!("values[{i}] is out of range"))),
                JsonValue::String(s) => Ok(Scalar::Text(s.clone())),
                other => Err(ChartError::format(format!(
                    "values[{i}] must be a number or string, got {}",
                    json_kind(other)
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        SeriesValues::Single(vals)
    };

    LabeledSeries::new(labels, values)
}

fn records_from_json(items: Vec<JsonValue>) -> Result<RecordList> {
    let mut columns: Option<Vec<String>> = None;
    let mut rows = Vec::with_capacity(items.len());

    for (i, item) in items.into_iter().enumerate() {
        let JsonValue::Object(obj) = item else {
            return Err(ChartError::format(format!("record {i} is not a JSON object")));
        };
        let cols = columns.get_or_insert_with(|| obj.keys().cloned().collect());

        if obj.len() != cols.len() || cols.iter().any(|c| !obj.contains_key(c)) {
            return Err(ChartError::format(format!(
                "record {i} has fields {:?}, expected {:?}",
                obj.keys().collect::<Vec<_>>(),
                cols
            )));
        }
        rows.push(cols.iter().map(|c| CellValue::from_json(&obj[c])).collect());
    }

    RecordList::new(columns.unwrap_or_default(), rows)
}

fn json_kind(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled(data: CanonicalData) -> LabeledSeries {
        match data {
            CanonicalData::Labeled(s) => s,
            other => panic!("expected labeled series, got {other:?}"),
        }
    }

    #[test]
    fn shorthand_mixes_numbers_and_text() {
        let s = labeled(normalize("A:10, B:20.5, C:hello", SourceKind::Shorthand).unwrap());
        assert_eq!(s.labels(), ["A", "B", "C"]);
        assert_eq!(
            s.values(),
            &SeriesValues::Single(vec![
                Scalar::Number(10.0),
                Scalar::Number(20.5),
                Scalar::Text("hello".into()),
            ])
        );
    }

    #[test]
    fn shorthand_full_width_punctuation_matches_ascii() {
        let wide = normalize("A：10，B：20", SourceKind::Shorthand).unwrap();
        let ascii = normalize("A:10, B:20", SourceKind::Shorthand).unwrap();
        assert_eq!(wide, ascii);
    }

    #[test]
    fn shorthand_newlines_duplicates_and_colonless_fragments() {
        let s = labeled(
            normalize("A:10\nB:2, junk\n\nA:3:4\n", SourceKind::Shorthand).unwrap(),
        );
        assert_eq!(s.labels(), ["A", "B", "A"]);
        assert_eq!(
            s.values(),
            &SeriesValues::Single(vec![
                Scalar::Number(10.0),
                Scalar::Number(2.0),
                Scalar::Text("3:4".into()),
            ])
        );
    }

    #[test]
    fn shorthand_numeric_coercion_is_strict() {
        assert_eq!(coerce_value("1.5"), Scalar::Number(1.5));
        assert_eq!(coerce_value(".5"), Scalar::Number(0.5));
        assert_eq!(coerce_value("-3"), Scalar::Text("-3".into()));
        assert_eq!(coerce_value("1.2.3"), Scalar::Text("1.2.3".into()));
        assert_eq!(coerce_value("1e3"), Scalar::Text("1e3".into()));
        assert_eq!(coerce_value("."), Scalar::Text(".".into()));
        assert_eq!(coerce_value(""), Scalar::Text(String::new()));
    }

    #[test]
    fn empty_input_is_a_format_error() {
        for kind in [SourceKind::Shorthand, SourceKind::Json] {
            let err = normalize("  \n\t ", kind).unwrap_err();
            assert!(matches!(err, ChartError::Format(ref m) if m == "empty input"));
        }
    }

    #[test]
    fn json_decode_failure_carries_decoder_message() {
        let err = normalize("{\"labels\": [1,", SourceKind::Json).unwrap_err();
        assert!(matches!(err, ChartError::Format(ref m) if m.contains("EOF")));
    }

    #[test]
    fn json_wrong_shape_is_rejected() {
        assert!(normalize("42", SourceKind::Json).is_err());
        assert!(normalize("{\"a\": 1}", SourceKind::Json).is_err());
        assert!(normalize("[1, 2]", SourceKind::Json).is_err());
        assert!(normalize(r#"[{"a":1},{"b":2}]"#, SourceKind::Json).is_err());
        assert!(normalize(r#"{"labels":["X"],"values":[1,2]}"#, SourceKind::Json).is_err());
    }

    #[test]
    fn json_multi_series() {
        let s = labeled(
            normalize(r#"{"labels":["X","Y"],"values":[[1,2],[3,4]]}"#, SourceKind::Json)
                .unwrap(),
        );
        assert_eq!(
            s.values(),
            &SeriesValues::Multi(vec![vec![1.0, 2.0], vec![3.0, 4.0]])
        );
    }

    #[test]
    fn json_round_trip_is_idempotent() {
        let inputs = [
            r#"[{"month":"Jan","sales":10,"cost":2.5},{"month":"Feb","sales":12,"cost":null}]"#,
            r#"{"labels":["X","Y"],"values":[[1.5,2],[3,4]]}"#,
            r#"{"labels":["A","B"],"values":[10,"n/a"]}"#,
        ];
        for input in inputs {
            let first = normalize(input, SourceKind::Json).unwrap();
            let again = normalize(&first.to_pretty_json(), SourceKind::Json).unwrap();
            assert_eq!(first, again, "round trip of {input}");
        }
    }

    #[test]
    fn record_list_keeps_field_order() {
        let data = normalize(r#"[{"z":1,"a":2,"m":3}]"#, SourceKind::Json).unwrap();
        let CanonicalData::Records(records) = data else {
            panic!("expected records");
        };
        assert_eq!(records.columns(), ["z", "a", "m"]);
    }

    #[test]
    fn backslash_sequences_are_unescaped_before_decoding() {
        assert_eq!(unescape_backslashes(r"a\tb\\c\x41é").unwrap(), "a\tb\\cAé");
        assert_eq!(unescape_backslashes(r"keep \q").unwrap(), r"keep \q");
        assert_eq!(unescape_backslashes("中文").unwrap(), "中文");
        assert!(unescape_backslashes(r"bad \x4").is_err());

        let s = labeled(
            normalize(r#"{"labels":["A"],"values":[1]}"#, SourceKind::Json).unwrap(),
        );
        assert_eq!(s.labels(), ["A"]);
    }

    #[test]
    fn detection_follows_colon_and_brackets() {
        assert_eq!(detect_source_kind("A:1, B:2"), SourceKind::Shorthand);
        assert_eq!(detect_source_kind("A：1"), SourceKind::Shorthand);
        assert_eq!(
            detect_source_kind(r#"{"labels":["A"],"values":[1]}"#),
            SourceKind::Json
        );
        assert_eq!(detect_source_kind("[1, 2]"), SourceKind::Json);
    }
}
