use std::f64::consts::TAU;
use std::io::Cursor;
use std::path::Path;

use image::{ImageError, ImageFormat, RgbImage};
use plotters::chart::SeriesAnno;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::figure::{Figure, Mark, PieSlice};
use crate::color::{self, text_color_on};
use crate::error::{ChartError, Result};

/// Pixel size of exported charts.
pub const EXPORT_SIZE: (u32, u32) = (1000, 700);

const FONT: &str = "sans-serif";

// ---------------------------------------------------------------------------
// Output format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Jpeg,
    Pdf,
    Svg,
}

impl ExportFormat {
    /// Format implied by the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpeg),
            "pdf" => Ok(ExportFormat::Pdf),
            "svg" => Ok(ExportFormat::Svg),
            other => Err(ChartError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("unsupported export format: .{other} (use png, jpg, pdf or svg)"),
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Draw `figure` and write it to `path` in the format its extension names.
pub fn export(figure: &Figure, path: &Path) -> Result<()> {
    let format = ExportFormat::from_path(path)?;
    match format {
        ExportFormat::Svg => std::fs::write(path, render_svg(figure)?)?,
        ExportFormat::Png => rasterize(figure)?
            .save_with_format(path, ImageFormat::Png)
            .map_err(image_error)?,
        ExportFormat::Jpeg => rasterize(figure)?
            .save_with_format(path, ImageFormat::Jpeg)
            .map_err(image_error)?,
        ExportFormat::Pdf => {
            let image = rasterize(figure)?;
            let mut jpeg = Vec::new();
            image
                .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
                .map_err(image_error)?;
            std::fs::write(path, single_image_pdf(&jpeg, image.width(), image.height()))?;
        }
    }
    log::info!("exported chart as {format:?} to {}", path.display());
    Ok(())
}

/// SVG document of the figure.
pub fn render_svg(figure: &Figure) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, EXPORT_SIZE).into_drawing_area();
        draw_figure(figure, &root)?;
        root.present().map_err(drawing_error)?;
    }
    Ok(svg)
}

fn rasterize(figure: &Figure) -> Result<RgbImage> {
    let (w, h) = EXPORT_SIZE;
    let mut buf = vec![0u8; (w * h * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buf, EXPORT_SIZE).into_drawing_area();
        draw_figure(figure, &root)?;
        root.present().map_err(drawing_error)?;
    }
    RgbImage::from_raw(w, h, buf).ok_or_else(|| ChartError::render("bitmap size mismatch"))
}

fn drawing_error(e: impl std::fmt::Display) -> ChartError {
    ChartError::render(format!("drawing failed: {e}"))
}

fn image_error(e: ImageError) -> ChartError {
    match e {
        ImageError::IoError(io) => ChartError::Io(io),
        other => ChartError::Io(std::io::Error::other(other)),
    }
}

fn rgb(c: color::Rgb) -> RGBColor {
    RGBColor(c.red, c.green, c.blue)
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

/// Draw onto any plotters backend.
pub fn draw_figure<DB: DrawingBackend>(figure: &Figure, root: &DrawingArea<DB, Shift>) -> Result<()> {
    root.fill(&WHITE).map_err(drawing_error)?;
    let area = match &figure.title {
        Some(title) => root.titled(title, (FONT, 28)).map_err(drawing_error)?,
        None => root.clone(),
    };

    let slices = figure.marks.iter().find_map(|m| match m {
        Mark::Pie { slices } => Some(slices),
        _ => None,
    });
    match slices {
        Some(slices) => draw_pie(slices, &area),
        None => draw_cartesian(figure, &area),
    }
}

fn draw_cartesian<DB: DrawingBackend>(figure: &Figure, area: &DrawingArea<DB, Shift>) -> Result<()> {
    let categories = &figure.categories;
    let n = categories.len().max(1);
    let (lo, hi) = figure.y_extent();
    let pad = (hi - lo) * 0.1;
    let y_range = if lo < 0.0 { lo - pad } else { lo }..hi + pad;

    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5..n as f64 - 0.5, y_range)
        .map_err(drawing_error)?;

    let category_at = |x: &f64| {
        let idx = x.round();
        if (x - idx).abs() < 1e-6 && idx >= 0.0 && (idx as usize) < categories.len() {
            categories[idx as usize].clone()
        } else {
            String::new()
        }
    };

    {
        let mut mesh = chart.configure_mesh();
        mesh.x_labels(n).x_label_formatter(&category_at).y_labels(10);
        if !figure.grid {
            mesh.disable_mesh();
        }
        if let Some(x_label) = &figure.x_label {
            mesh.x_desc(x_label.as_str());
        }
        if let Some(y_label) = &figure.y_label {
            mesh.y_desc(y_label.as_str());
        }
        mesh.draw().map_err(drawing_error)?;
    }

    for mark in &figure.marks {
        match mark {
            Mark::Bars {
                name,
                color,
                alpha,
                offset,
                width,
                heights,
            } => {
                let style = rgb(*color).mix(*alpha).filled();
                let bars = heights
                    .iter()
                    .enumerate()
                    .filter(|(_, h)| h.is_finite())
                    .map(|(i, &h)| {
                        let left = i as f64 + offset - width / 2.0;
                        Rectangle::new([(left, 0.0), (left + width, h)], style)
                    });
                let anno = chart.draw_series(bars).map_err(drawing_error)?;
                label_series(anno, name.as_deref(), rgb(*color));
            }
            Mark::Line {
                name,
                color,
                marker,
                points,
            } => {
                let c = rgb(*color);
                let anno = chart
                    .draw_series(LineSeries::new(points.iter().copied(), c.stroke_width(2)))
                    .map_err(drawing_error)?;
                label_series(anno, name.as_deref(), c);
                if *marker {
                    chart
                        .draw_series(points.iter().map(|&p| Circle::new(p, 4, c.filled())))
                        .map_err(drawing_error)?;
                }
            }
            Mark::Scatter {
                name,
                color,
                points,
            } => {
                let c = rgb(*color);
                let anno = chart
                    .draw_series(points.iter().map(|&p| Circle::new(p, 4, c.filled())))
                    .map_err(drawing_error)?;
                label_series(anno, name.as_deref(), c);
            }
            Mark::Area {
                name,
                color,
                lower,
                upper,
            } => {
                let c = rgb(*color);
                let outline: Vec<(f64, f64)> = upper
                    .iter()
                    .enumerate()
                    .map(|(i, &y)| (i as f64, y))
                    .chain(lower.iter().enumerate().rev().map(|(i, &y)| (i as f64, y)))
                    .collect();
                let anno = chart
                    .draw_series(std::iter::once(Polygon::new(outline, c.mix(0.6).filled())))
                    .map_err(drawing_error)?;
                label_series(anno, name.as_deref(), c);
            }
            Mark::Pie { .. } => {}
        }
    }

    let value_style = TextStyle::from((FONT, 14).into_font())
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    chart
        .draw_series(
            figure
                .annotations
                .iter()
                .filter(|a| a.y.is_finite())
                .map(|a| Text::new(a.text.clone(), (a.x, a.y), value_style.clone())),
        )
        .map_err(drawing_error)?;

    if figure.legend.as_ref().is_some_and(|entries| !entries.is_empty()) {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(drawing_error)?;
    }
    Ok(())
}

fn label_series<'a, DB: DrawingBackend + 'a>(
    anno: &mut SeriesAnno<'a, DB>,
    name: Option<&str>,
    color: RGBColor,
) {
    if let Some(name) = name {
        anno.label(name)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
    }
}

/// Slices run counter-clockwise from three o'clock, names outside the rim
/// and percentages inside.
fn draw_pie<DB: DrawingBackend>(slices: &[PieSlice], area: &DrawingArea<DB, Shift>) -> Result<()> {
    let (w, h) = area.dim_in_pixel();
    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
    let radius = w.min(h) as f64 * 0.35;
    let at = |angle: f64, r: f64| {
        (
            (cx + r * angle.cos()).round() as i32,
            (cy - r * angle.sin()).round() as i32,
        )
    };

    let mut start = 0.0_f64;
    for slice in slices {
        let sweep = slice.fraction * TAU;
        let steps = ((sweep / 0.02).ceil() as usize).max(2);
        let mut outline = vec![at(0.0, 0.0)];
        outline.extend((0..=steps).map(|s| at(start + sweep * s as f64 / steps as f64, radius)));
        area.draw(&Polygon::new(outline, rgb(slice.color).filled()))
            .map_err(drawing_error)?;

        let mid = start + sweep / 2.0;
        let centered = Pos::new(HPos::Center, VPos::Center);
        let name_style = TextStyle::from((FONT, 16).into_font()).color(&BLACK).pos(centered);
        area.draw(&Text::new(slice.label.clone(), at(mid, radius * 1.15), name_style))
            .map_err(drawing_error)?;

        let pct_color = rgb(text_color_on(slice.color));
        let pct_style = TextStyle::from((FONT, 14).into_font()).color(&pct_color).pos(centered);
        area.draw(&Text::new(slice.percent_label.clone(), at(mid, radius * 0.6), pct_style))
            .map_err(drawing_error)?;

        start += sweep;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// PDF wrapper
// ---------------------------------------------------------------------------

/// One-page PDF showing a JPEG at 72/96 scale.
fn single_image_pdf(jpeg: &[u8], px_w: u32, px_h: u32) -> Vec<u8> {
    let (pt_w, pt_h) = (px_w as f64 * 0.75, px_h as f64 * 0.75);
    let content = format!("q {pt_w:.2} 0 0 {pt_h:.2} 0 0 cm /Im0 Do Q");

    let objects: Vec<Vec<u8>> = vec![
        b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
        b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_vec(),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {pt_w:.2} {pt_h:.2}] \
             /Resources << /XObject << /Im0 4 0 R >> >> /Contents 5 0 R >>"
        )
        .into_bytes(),
        stream_object(
            &format!(
                "<< /Type /XObject /Subtype /Image /Width {px_w} /Height {px_h} \
                 /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /DCTDecode /Length {} >>",
                jpeg.len()
            ),
            jpeg,
        ),
        stream_object(&format!("<< /Length {} >>", content.len()), content.as_bytes()),
    ];

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    out
}

fn stream_object(dict: &str, data: &[u8]) -> Vec<u8> {
    let mut obj = Vec::with_capacity(dict.len() + data.len() + 32);
    obj.extend_from_slice(dict.as_bytes());
    obj.extend_from_slice(b"\nstream\n");
    obj.extend_from_slice(data);
    obj.extend_from_slice(b"\nendstream");
    obj
}
