use std::collections::HashSet;
use std::fmt;

use serde_json::{Map, Number, Value as JsonValue};

use crate::error::{ChartError, Result};

// ---------------------------------------------------------------------------
// CellValue – a single cell in a record-list column
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring what CSV / JSON / Excel sources hold.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Numeric view used when a column is plotted as a series.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn from_json(val: &JsonValue) -> Self {
        match val {
            JsonValue::String(s) => CellValue::String(s.clone()),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CellValue::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    CellValue::Float(f)
                } else {
                    CellValue::String(n.to_string())
                }
            }
            JsonValue::Bool(b) => CellValue::Bool(*b),
            JsonValue::Null => CellValue::Null,
            other => CellValue::String(other.to_string()),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            CellValue::String(s) => JsonValue::String(s.clone()),
            CellValue::Integer(i) => JsonValue::from(*i),
            CellValue::Float(f) => float_to_json(*f),
            CellValue::Bool(b) => JsonValue::Bool(*b),
            CellValue::Null => JsonValue::Null,
        }
    }
}

fn float_to_json(v: f64) -> JsonValue {
    Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

// ---------------------------------------------------------------------------
// Scalar – one value of a single labeled series
// ---------------------------------------------------------------------------

/// Shorthand input keeps values it cannot read as numbers, so a single
/// series may carry text next to numbers. Rendering rejects the text.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(v) => Some(*v),
            Scalar::Text(_) => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Scalar::Number(v) => float_to_json(*v),
            Scalar::Text(s) => JsonValue::String(s.clone()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(v) => write!(f, "{v}"),
            Scalar::Text(s) => write!(f, "{s}"),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordList – tabular rows sharing one ordered set of fields
// ---------------------------------------------------------------------------

/// One mapping per row, all rows sharing `columns`. Column 0 is the category
/// axis, the remaining columns are series.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordList {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl RecordList {
    /// Build a record list, checking every row has one cell per column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self> {
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(ChartError::format(format!(
                "row {i} has {} fields but the header has {}",
                row.len(),
                columns.len()
            )));
        }
        Ok(RecordList { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows.iter().map(move |row| &row[idx])
    }

    fn to_json(&self) -> JsonValue {
        let records = self
            .rows
            .iter()
            .map(|row| {
                let obj: Map<String, JsonValue> = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(col, cell)| (col.clone(), cell.to_json()))
                    .collect();
                JsonValue::Object(obj)
            })
            .collect();
        JsonValue::Array(records)
    }
}

/// Header names made distinct the way spreadsheet readers do it: a repeated
/// `x` becomes `x.1`, `x.2`, ... so no column collapses into another key.
pub fn dedupe_field_names(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(|name| {
            let mut unique = name.clone();
            let mut n = 0;
            while seen.contains(&unique) {
                n += 1;
                unique = format!("{name}.{n}");
            }
            seen.insert(unique.clone());
            unique
        })
        .collect()
}

// ---------------------------------------------------------------------------
// LabeledSeries – category labels with one or more aligned series
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum SeriesValues {
    /// One value per label.
    Single(Vec<Scalar>),
    /// Several series, each aligned 1:1 with the labels.
    Multi(Vec<Vec<f64>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSeries {
    labels: Vec<String>,
    values: SeriesValues,
}

impl LabeledSeries {
    /// Build a labeled series, enforcing label/value alignment.
    pub fn new(labels: Vec<String>, values: SeriesValues) -> Result<Self> {
        match &values {
            SeriesValues::Single(vals) if vals.len() != labels.len() => {
                return Err(ChartError::format(format!(
                    "{} labels but {} values",
                    labels.len(),
                    vals.len()
                )));
            }
            SeriesValues::Multi(series) => {
                if let Some((i, s)) = series
                    .iter()
                    .enumerate()
                    .find(|(_, s)| s.len() != labels.len())
                {
                    return Err(ChartError::format(format!(
                        "series {} has {} values but there are {} labels",
                        i + 1,
                        s.len(),
                        labels.len()
                    )));
                }
            }
            SeriesValues::Single(_) => {}
        }
        Ok(LabeledSeries { labels, values })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn values(&self) -> &SeriesValues {
        &self.values
    }

    fn to_json(&self) -> JsonValue {
        let values = match &self.values {
            SeriesValues::Single(vals) => vals.iter().map(Scalar::to_json).collect(),
            SeriesValues::Multi(series) => series
                .iter()
                .map(|s| JsonValue::Array(s.iter().map(|v| float_to_json(*v)).collect()))
                .collect(),
        };
        let mut obj = Map::new();
        obj.insert(
            "labels".to_string(),
            JsonValue::Array(self.labels.iter().cloned().map(JsonValue::String).collect()),
        );
        obj.insert("values".to_string(), JsonValue::Array(values));
        JsonValue::Object(obj)
    }
}

// ---------------------------------------------------------------------------
// CanonicalData – the one shape the dispatcher accepts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalData {
    Records(RecordList),
    Labeled(LabeledSeries),
}

impl CanonicalData {
    /// JSON in the shape it was entered: `[{...}, ...]` or
    /// `{"labels": [...], "values": [...]}`, field order preserved.
    pub fn to_json(&self) -> JsonValue {
        match self {
            CanonicalData::Records(records) => records.to_json(),
            CanonicalData::Labeled(series) => series.to_json(),
        }
    }

    /// Indented JSON used for the preview pane and the summary prompt.
    pub fn to_pretty_json(&self) -> String {
        format!("{:#}", self.to_json())
    }

    /// Short human description for the status line.
    pub fn describe(&self) -> String {
        match self {
            CanonicalData::Records(r) => {
                format!("{} records, fields {:?}", r.len(), r.columns())
            }
            CanonicalData::Labeled(s) => match s.values() {
                SeriesValues::Single(_) => format!("{} labels, 1 series", s.labels().len()),
                SeriesValues::Multi(series) => {
                    format!("{} labels, {} series", s.labels().len(), series.len())
                }
            },
        }
    }
}
