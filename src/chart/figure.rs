use std::fmt;
use std::str::FromStr;

use crate::color::Rgb;
use crate::error::ChartError;

// ---------------------------------------------------------------------------
// ChartKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartKind {
    #[default]
    Bar,
    Line,
    Pie,
    Scatter,
    Area,
}

impl ChartKind {
    pub const ALL: [ChartKind; 5] = [
        ChartKind::Bar,
        ChartKind::Line,
        ChartKind::Pie,
        ChartKind::Scatter,
        ChartKind::Area,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::Scatter => "scatter",
            ChartKind::Area => "area",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ChartError::render(format!("unknown chart kind {s:?}")))
    }
}

// ---------------------------------------------------------------------------
// Title / axis labels
// ---------------------------------------------------------------------------

/// Optional texts typed next to the chart; blank ones are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartLabels {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
}

impl ChartLabels {
    pub fn new(title: &str, x_label: &str, y_label: &str) -> Self {
        ChartLabels {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Figure – backend-neutral chart description
// ---------------------------------------------------------------------------

/// Everything needed to draw one chart, independent of egui or plotters.
/// X positions are category indices (`0.0` is the first category).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Figure {
    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub grid: bool,
    /// Category names along the x axis.
    pub categories: Vec<String>,
    pub marks: Vec<Mark>,
    pub annotations: Vec<Annotation>,
    pub legend: Option<Vec<LegendEntry>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mark {
    /// One bar per category, shifted by `offset` from the category centre.
    Bars {
        name: Option<String>,
        color: Rgb,
        alpha: f64,
        offset: f64,
        width: f64,
        heights: Vec<f64>,
    },
    Line {
        name: Option<String>,
        color: Rgb,
        marker: bool,
        points: Vec<(f64, f64)>,
    },
    Scatter {
        name: Option<String>,
        color: Rgb,
        points: Vec<(f64, f64)>,
    },
    /// Filled band between `lower` and `upper`, one entry per category.
    Area {
        name: Option<String>,
        color: Rgb,
        lower: Vec<f64>,
        upper: Vec<f64>,
    },
    Pie { slices: Vec<PieSlice> },
}

impl Mark {
    pub fn name(&self) -> Option<&str> {
        match self {
            Mark::Bars { name, .. }
            | Mark::Line { name, .. }
            | Mark::Scatter { name, .. }
            | Mark::Area { name, .. } => name.as_deref(),
            Mark::Pie { .. } => None,
        }
    }

    pub fn color(&self) -> Option<Rgb> {
        match self {
            Mark::Bars { color, .. }
            | Mark::Line { color, .. }
            | Mark::Scatter { color, .. }
            | Mark::Area { color, .. } => Some(*color),
            Mark::Pie { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
    /// Share of the whole pie, `0.0..=1.0`.
    pub fraction: f64,
    pub color: Rgb,
    /// e.g. `"33.3%"`.
    pub percent_label: String,
}

/// Text placed at a data position (value labels over bars and points).
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub color: Rgb,
}

impl Figure {
    /// A figure with axes but nothing drawn on them.
    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn is_pie(&self) -> bool {
        self.marks.iter().any(|m| matches!(m, Mark::Pie { .. }))
    }

    /// Lowest and highest y value over all cartesian marks, always spanning 0.
    pub fn y_extent(&self) -> (f64, f64) {
        let mut lo = 0.0_f64;
        let mut hi = 0.0_f64;
        let mut take = |v: f64| {
            if v.is_finite() {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        };
        for mark in &self.marks {
            match mark {
                Mark::Bars { heights, .. } => heights.iter().copied().for_each(&mut take),
                Mark::Line { points, .. } | Mark::Scatter { points, .. } => {
                    points.iter().for_each(|&(_, y)| take(y))
                }
                Mark::Area { lower, upper, .. } => {
                    lower.iter().chain(upper).copied().for_each(&mut take)
                }
                Mark::Pie { .. } => {}
            }
        }
        if (hi - lo).abs() < f64::EPSILON {
            hi = lo + 1.0;
        }
        (lo, hi)
    }
}
