use super::figure::{Annotation, ChartKind, ChartLabels, Figure, LegendEntry, Mark, PieSlice};
use crate::color::{cycle_color, sample_palette};
use crate::data::model::{CanonicalData, CellValue, RecordList, Scalar, SeriesValues};
use crate::error::{ChartError, Result};

/// Total width of one category slot taken by (grouped) bars.
const BAR_SLOT_WIDTH: f64 = 0.8;
/// Record-list bars are grouped side by side inside a narrower slot.
const GROUPED_SLOT_WIDTH: f64 = 0.5;
const OVERLAID_BAR_ALPHA: f64 = 0.7;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Turn canonical data into a figure of the requested kind.
///
/// * record lists: column 0 is the category axis, the other columns are
///   series sharing one set of axes (pie draws nothing)
/// * single labeled series: bars / lines carry `{:.1}` value labels, pie
///   slices carry `{:.1}%` labels
/// * multi-series: bars and lines per series with a `series N` legend
///   (pie, scatter and area draw nothing)
pub fn render(data: Option<&CanonicalData>, kind: ChartKind, labels: &ChartLabels) -> Result<Figure> {
    let data = data.ok_or_else(|| ChartError::render("no data"))?;

    let mut figure = match data {
        CanonicalData::Records(records) => render_records(records, kind)?,
        CanonicalData::Labeled(series) => match series.values() {
            SeriesValues::Single(values) => render_single(series.labels(), values, kind)?,
            SeriesValues::Multi(values) => render_multi(series.labels(), values, kind),
        },
    };

    figure.title = non_blank(&labels.title);
    figure.x_label = non_blank(&labels.x_label);
    figure.y_label = non_blank(&labels.y_label);
    figure.grid = true;

    log::debug!(
        "rendered {kind} chart: {} marks, {} annotations",
        figure.marks.len(),
        figure.annotations.len()
    );
    Ok(figure)
}

fn non_blank(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

// ---------------------------------------------------------------------------
// Record lists
// ---------------------------------------------------------------------------

fn render_records(records: &RecordList, kind: ChartKind) -> Result<Figure> {
    let columns = records.columns();
    if columns.is_empty() {
        return Err(ChartError::render("record list has no fields"));
    }

    let mut figure = Figure {
        categories: records.column(0).map(CellValue::to_string).collect(),
        ..Figure::default()
    };

    if kind == ChartKind::Pie {
        log::warn!("pie charts are not drawn for record lists");
        return Ok(figure);
    }

    let (names, series): (Vec<&String>, Vec<Vec<Option<f64>>>) = (1..columns.len())
        .filter_map(|idx| Some((&columns[idx], numeric_column(records, idx)?)))
        .unzip();
    if series.is_empty() {
        return Err(ChartError::render(format!(
            "nothing to plot: no numeric field besides {:?}",
            columns[0]
        )));
    }

    let per_bar = GROUPED_SLOT_WIDTH / series.len() as f64;
    let mut stacked = vec![0.0; records.len()];

    for (i, (name, values)) in names.into_iter().zip(&series).enumerate() {
        let name = Some(name.clone());
        let color = cycle_color(i);
        let mark = match kind {
            ChartKind::Bar => Mark::Bars {
                name,
                color,
                alpha: 1.0,
                offset: -GROUPED_SLOT_WIDTH / 2.0 + per_bar * (i as f64 + 0.5),
                width: per_bar,
                heights: values.iter().map(|v| v.unwrap_or(f64::NAN)).collect(),
            },
            ChartKind::Line => Mark::Line {
                name,
                color,
                marker: false,
                points: present_points(values),
            },
            ChartKind::Scatter => Mark::Scatter {
                name,
                color,
                points: present_points(values),
            },
            ChartKind::Area => {
                let lower = stacked.clone();
                for (total, v) in stacked.iter_mut().zip(values) {
                    *total += v.unwrap_or(0.0);
                }
                Mark::Area {
                    name,
                    color,
                    lower,
                    upper: stacked.clone(),
                }
            }
            ChartKind::Pie => unreachable!("handled above"),
        };
        figure.marks.push(mark);
    }

    figure.legend = Some(legend_for(&figure.marks));
    Ok(figure)
}

/// Cells of a series column with nulls as gaps; `None` when any cell is
/// non-numeric, so the column is left out of the chart.
fn numeric_column(records: &RecordList, idx: usize) -> Option<Vec<Option<f64>>> {
    let values: Option<Vec<Option<f64>>> = records
        .column(idx)
        .map(|cell| match cell {
            CellValue::Null => Some(None),
            other => other.as_f64().map(Some),
        })
        .collect();
    if values.is_none() {
        log::debug!("skipping non-numeric field {:?}", records.columns()[idx]);
    }
    values
}

fn present_points(values: &[Option<f64>]) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|y| (i as f64, y)))
        .collect()
}

// ---------------------------------------------------------------------------
// Single labeled series
// ---------------------------------------------------------------------------

fn render_single(labels: &[String], values: &[Scalar], kind: ChartKind) -> Result<Figure> {
    let numbers = labels
        .iter()
        .zip(values)
        .map(|(label, v)| {
            v.as_f64().ok_or_else(|| {
                ChartError::render(format!("value {:?} for label {label:?} is not a number", v.to_string()))
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    let color = cycle_color(0);
    let mut figure = Figure {
        categories: labels.to_vec(),
        ..Figure::default()
    };

    match kind {
        ChartKind::Bar => {
            figure.annotations = value_annotations(&numbers);
            figure.marks.push(Mark::Bars {
                name: None,
                color,
                alpha: 1.0,
                offset: 0.0,
                width: BAR_SLOT_WIDTH,
                heights: numbers,
            });
        }
        ChartKind::Line => {
            figure.annotations = value_annotations(&numbers);
            figure.marks.push(Mark::Line {
                name: None,
                color,
                marker: true,
                points: indexed(&numbers),
            });
        }
        ChartKind::Pie => {
            figure.categories.clear();
            figure.marks.push(pie(labels, &numbers)?);
        }
        ChartKind::Scatter => figure.marks.push(Mark::Scatter {
            name: None,
            color,
            points: indexed(&numbers),
        }),
        ChartKind::Area => figure.marks.push(Mark::Area {
            name: None,
            color,
            lower: vec![0.0; numbers.len()],
            upper: numbers,
        }),
    }
    Ok(figure)
}

fn pie(labels: &[String], values: &[f64]) -> Result<Mark> {
    if let Some(v) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
        return Err(ChartError::render(format!(
            "pie slices must be non-negative numbers, got {v}"
        )));
    }
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return Err(ChartError::render("pie needs a positive total"));
    }

    let slices = labels
        .iter()
        .zip(values)
        .enumerate()
        .map(|(i, (label, &value))| {
            let fraction = value / total;
            PieSlice {
                label: label.clone(),
                value,
                fraction,
                color: cycle_color(i),
                percent_label: format!("{:.1}%", fraction * 100.0),
            }
        })
        .collect();
    Ok(Mark::Pie { slices })
}

// ---------------------------------------------------------------------------
// Multi-series
// ---------------------------------------------------------------------------

fn render_multi(labels: &[String], series: &[Vec<f64>], kind: ChartKind) -> Figure {
    let mut figure = Figure {
        categories: labels.to_vec(),
        ..Figure::default()
    };

    if !matches!(kind, ChartKind::Bar | ChartKind::Line) {
        log::warn!("{kind} charts are not drawn for multi-series data");
        return figure;
    }

    let colors = sample_palette(series.len());
    for (i, (values, &color)) in series.iter().zip(&colors).enumerate() {
        let name = Some(format!("series {}", i + 1));
        let mark = if kind == ChartKind::Bar {
            Mark::Bars {
                name,
                color,
                alpha: OVERLAID_BAR_ALPHA,
                offset: 0.0,
                width: BAR_SLOT_WIDTH,
                heights: values.clone(),
            }
        } else {
            Mark::Line {
                name,
                color,
                marker: true,
                points: indexed(values),
            }
        };
        figure.marks.push(mark);
        figure.annotations.extend(value_annotations(values));
    }

    figure.legend = Some(legend_for(&figure.marks));
    figure
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn indexed(values: &[f64]) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .map(|(i, &y)| (i as f64, y))
        .collect()
}

/// `{:.1}` label at each value.
fn value_annotations(values: &[f64]) -> Vec<Annotation> {
    values
        .iter()
        .enumerate()
        .map(|(i, &y)| Annotation {
            x: i as f64,
            y,
            text: format!("{y:.1}"),
        })
        .collect()
}

fn legend_for(marks: &[Mark]) -> Vec<LegendEntry> {
    marks
        .iter()
        .filter_map(|m| {
            Some(LegendEntry {
                label: m.name()?.to_string(),
                color: m.color()?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::normalize::{SourceKind, normalize};

    fn data(json: &str) -> CanonicalData {
        normalize(json, SourceKind::Json).unwrap()
    }

    fn texts(figure: &Figure) -> Vec<&str> {
        figure.annotations.iter().map(|a| a.text.as_str()).collect()
    }

    #[test]
    fn missing_data_is_a_render_error() {
        let err = render(None, ChartKind::Bar, &ChartLabels::default()).unwrap_err();
        assert!(matches!(err, ChartError::Render(ref m) if m == "no data"));
    }

    #[test]
    fn single_series_bar_is_annotated() {
        let d = data(r#"{"labels":["X","Y"],"values":[1,2]}"#);
        let fig = render(Some(&d), ChartKind::Bar, &ChartLabels::default()).unwrap();

        assert_eq!(fig.marks.len(), 1);
        let Mark::Bars { heights, .. } = &fig.marks[0] else {
            panic!("expected bars, got {:?}", fig.marks[0]);
        };
        assert_eq!(heights, &[1.0, 2.0]);
        assert_eq!(texts(&fig), ["1.0", "2.0"]);
        assert_eq!(fig.categories, ["X", "Y"]);
        assert!(fig.legend.is_none());
        assert!(fig.grid);
    }

    #[test]
    fn single_series_line_has_markers_and_labels() {
        let d = data(r#"{"labels":["X","Y","Z"],"values":[1.24,2,3.76]}"#);
        let fig = render(Some(&d), ChartKind::Line, &ChartLabels::default()).unwrap();
        assert!(matches!(fig.marks[..], [Mark::Line { marker: true, .. }]));
        assert_eq!(texts(&fig), ["1.2", "2.0", "3.8"]);
    }

    #[test]
    fn single_series_pie_has_percentages() {
        let d = data(r#"{"labels":["A","B"],"values":[1,3]}"#);
        let fig = render(Some(&d), ChartKind::Pie, &ChartLabels::default()).unwrap();
        let Mark::Pie { slices } = &fig.marks[0] else {
            panic!("expected a pie");
        };
        let labels: Vec<_> = slices.iter().map(|s| s.percent_label.as_str()).collect();
        assert_eq!(labels, ["25.0%", "75.0%"]);
        assert!(fig.is_pie());
    }

    #[test]
    fn pie_rejects_negative_or_zero_totals() {
        for json in [
            r#"{"labels":["A","B"],"values":[1,-3]}"#,
            r#"{"labels":["A"],"values":[0]}"#,
        ] {
            let d = data(json);
            assert!(render(Some(&d), ChartKind::Pie, &ChartLabels::default()).is_err());
        }
    }

    #[test]
    fn single_series_scatter_and_area_are_plain() {
        let d = data(r#"{"labels":["X","Y"],"values":[1,2]}"#);
        for kind in [ChartKind::Scatter, ChartKind::Area] {
            let fig = render(Some(&d), kind, &ChartLabels::default()).unwrap();
            assert_eq!(fig.marks.len(), 1);
            assert!(fig.annotations.is_empty());
        }
    }

    #[test]
    fn text_values_cannot_be_plotted() {
        let d = normalize("A:10, B:20.5, C:hello", SourceKind::Shorthand).unwrap();
        let err = render(Some(&d), ChartKind::Bar, &ChartLabels::default()).unwrap_err();
        assert!(matches!(err, ChartError::Render(ref m) if m.contains("hello")));
    }

    #[test]
    fn multi_series_line_gets_colours_and_legend() {
        let d = data(r#"{"labels":["X","Y"],"values":[[1,2],[3,4]]}"#);
        let fig = render(Some(&d), ChartKind::Line, &ChartLabels::default()).unwrap();

        let lines: Vec<_> = fig
            .marks
            .iter()
            .filter(|m| matches!(m, Mark::Line { .. }))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_ne!(lines[0].color(), lines[1].color());

        let legend: Vec<_> = fig
            .legend
            .as_ref()
            .unwrap()
            .iter()
            .map(|e| e.label.as_str())
            .collect();
        assert_eq!(legend, ["series 1", "series 2"]);
        assert_eq!(texts(&fig), ["1.0", "2.0", "3.0", "4.0"]);
    }

    #[test]
    fn multi_series_bars_overlay() {
        let d = data(r#"{"labels":["X","Y"],"values":[[1,2],[3,4]]}"#);
        let fig = render(Some(&d), ChartKind::Bar, &ChartLabels::default()).unwrap();
        assert_eq!(fig.marks.len(), 2);
        for mark in &fig.marks {
            let Mark::Bars { alpha, offset, .. } = mark else {
                panic!("expected bars");
            };
            assert_eq!(*alpha, OVERLAID_BAR_ALPHA);
            assert_eq!(*offset, 0.0);
        }
    }

    #[test]
    fn multi_series_pie_scatter_area_draw_nothing() {
        let d = data(r#"{"labels":["X","Y"],"values":[[1,2],[3,4]]}"#);
        for kind in [ChartKind::Pie, ChartKind::Scatter, ChartKind::Area] {
            let fig = render(Some(&d), kind, &ChartLabels::default()).unwrap();
            assert!(fig.is_empty(), "{kind} should be empty");
            assert!(fig.legend.is_none());
        }
    }

    #[test]
    fn pie_of_record_list_is_empty() {
        let d = data(r#"[{"month":"Jan","sales":10},{"month":"Feb","sales":12}]"#);
        let fig = render(Some(&d), ChartKind::Pie, &ChartLabels::default()).unwrap();
        assert!(fig.is_empty());
        assert!(fig.annotations.is_empty());
        assert!(fig.legend.is_none());
    }

    #[test]
    fn record_list_bars_are_grouped_by_field() {
        let d = data(
            r#"[{"month":"Jan","sales":10,"cost":4},{"month":"Feb","sales":12,"cost":null}]"#,
        );
        let fig = render(Some(&d), ChartKind::Bar, &ChartLabels::default()).unwrap();

        assert_eq!(fig.categories, ["Jan", "Feb"]);
        assert_eq!(fig.marks.len(), 2);
        let offsets: Vec<f64> = fig
            .marks
            .iter()
            .map(|m| match m {
                Mark::Bars { offset, .. } => *offset,
                other => panic!("expected bars, got {other:?}"),
            })
            .collect();
        assert!(offsets[0] < 0.0 && offsets[1] > 0.0);

        let legend: Vec<_> = fig.legend.unwrap().into_iter().map(|e| e.label).collect();
        assert_eq!(legend, ["sales", "cost"]);
    }

    #[test]
    fn record_list_area_is_stacked() {
        let d = data(r#"[{"k":"a","x":1,"y":2},{"k":"b","x":3,"y":null}]"#);
        let fig = render(Some(&d), ChartKind::Area, &ChartLabels::default()).unwrap();
        let Mark::Area { lower, upper, .. } = &fig.marks[1] else {
            panic!("expected area");
        };
        assert_eq!(lower, &[1.0, 3.0]);
        assert_eq!(upper, &[3.0, 3.0]);
    }

    #[test]
    fn record_list_skips_text_fields() {
        let d = data(
            r#"[{"month":"Jan","region":"N","sales":10},{"month":"Feb","region":"S","sales":12}]"#,
        );
        let fig = render(Some(&d), ChartKind::Bar, &ChartLabels::default()).unwrap();

        assert_eq!(fig.marks.len(), 1);
        assert_eq!(fig.marks[0].name(), Some("sales"));
        let Mark::Bars { heights, .. } = &fig.marks[0] else {
            panic!("expected bars");
        };
        assert_eq!(heights, &[10.0, 12.0]);
        let legend: Vec<_> = fig.legend.unwrap().into_iter().map(|e| e.label).collect();
        assert_eq!(legend, ["sales"]);
    }

    #[test]
    fn record_list_needs_a_numeric_series() {
        let d = data(r#"[{"k":"a","x":"oops"}]"#);
        let err = render(Some(&d), ChartKind::Line, &ChartLabels::default()).unwrap_err();
        assert!(matches!(err, ChartError::Render(ref m) if m.contains("no numeric field")));

        let d = data(r#"[{"k":"a"}]"#);
        assert!(render(Some(&d), ChartKind::Line, &ChartLabels::default()).is_err());

        let d = data("[]");
        assert!(render(Some(&d), ChartKind::Line, &ChartLabels::default()).is_err());
    }

    #[test]
    fn blank_labels_are_dropped_and_others_trimmed() {
        let d = data(r#"{"labels":["X"],"values":[1]}"#);
        let labels = ChartLabels::new("  Sales  ", "   ", "units");
        let fig = render(Some(&d), ChartKind::Bar, &labels).unwrap();
        assert_eq!(fig.title.as_deref(), Some("Sales"));
        assert_eq!(fig.x_label, None);
        assert_eq!(fig.y_label.as_deref(), Some("units"));
    }
}
