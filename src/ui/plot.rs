use std::f64::consts::{FRAC_PI_2, TAU};

use eframe::egui::{Align2, Color32, RichText, Stroke, Ui};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoint, PlotPoints, PlotUi, Points, Polygon, Text};

use rusty_charts::chart::figure::{Figure, Mark, PieSlice};
use rusty_charts::color::{Rgb, text_color_on};
use rusty_charts::state::AppState;

// ---------------------------------------------------------------------------
// Chart preview (central panel)
// ---------------------------------------------------------------------------

/// Render the current figure in the central panel.
pub fn chart_view(ui: &mut Ui, state: &AppState) {
    let figure = match &state.figure {
        Some(fig) => fig,
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Enter or import data, then press Generate");
            });
            return;
        }
    };

    if let Some(title) = &figure.title {
        ui.vertical_centered(|ui: &mut Ui| {
            ui.heading(title);
        });
    }

    if figure.is_pie() {
        pie_plot(ui, figure);
    } else {
        cartesian_plot(ui, figure);
    }
}

fn color32(c: Rgb, alpha: f64) -> Color32 {
    Color32::from_rgba_unmultiplied(c.red, c.green, c.blue, (alpha.clamp(0.0, 1.0) * 255.0) as u8)
}

fn cartesian_plot(ui: &mut Ui, figure: &Figure) {
    let categories = figure.categories.clone();
    let mut plot = Plot::new("chart_plot")
        .show_grid(figure.grid)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .x_axis_formatter(move |mark, _range| {
            let idx = mark.value.round();
            if (mark.value - idx).abs() < 1e-6 && idx >= 0.0 && (idx as usize) < categories.len() {
                categories[idx as usize].clone()
            } else {
                String::new()
            }
        });
    if figure.legend.is_some() {
        plot = plot.legend(Legend::default());
    }
    if let Some(x) = &figure.x_label {
        plot = plot.x_axis_label(x.clone());
    }
    if let Some(y) = &figure.y_label {
        plot = plot.y_axis_label(y.clone());
    }

    plot.show(ui, |plot_ui| {
        for mark in &figure.marks {
            draw_mark(plot_ui, mark);
        }
        for a in figure.annotations.iter().filter(|a| a.y.is_finite()) {
            plot_ui.text(
                Text::new(PlotPoint::new(a.x, a.y), RichText::new(&a.text).size(12.0))
                    .anchor(Align2::CENTER_BOTTOM),
            );
        }
    });
}

fn draw_mark(plot_ui: &mut PlotUi, mark: &Mark) {
    let name = mark.name().unwrap_or_default().to_string();
    match mark {
        Mark::Bars {
            color,
            alpha,
            offset,
            width,
            heights,
            ..
        } => {
            let fill = color32(*color, *alpha);
            let bars: Vec<Bar> = heights
                .iter()
                .enumerate()
                .filter(|(_, h)| h.is_finite())
                .map(|(i, &h)| Bar::new(i as f64 + offset, h).width(*width).fill(fill))
                .collect();
            plot_ui.bar_chart(BarChart::new(bars).name(name).color(fill));
        }
        Mark::Line {
            color,
            marker,
            points,
            ..
        } => {
            let c = color32(*color, 1.0);
            let pts: PlotPoints = points.iter().map(|&(x, y)| [x, y]).collect();
            plot_ui.line(Line::new(pts).name(&name).color(c).width(2.0));
            if *marker {
                let pts: PlotPoints = points.iter().map(|&(x, y)| [x, y]).collect();
                plot_ui.points(Points::new(pts).name(&name).color(c).radius(4.0));
            }
        }
        Mark::Scatter { color, points, .. } => {
            let pts: PlotPoints = points.iter().map(|&(x, y)| [x, y]).collect();
            plot_ui.points(Points::new(pts).name(&name).color(color32(*color, 1.0)).radius(4.0));
        }
        Mark::Area {
            color, lower, upper, ..
        } => {
            // One convex quad per category interval keeps the fill well-formed.
            let fill = color32(*color, 0.6);
            for i in 1..upper.len().min(lower.len()) {
                let quad: PlotPoints = vec![
                    [(i - 1) as f64, lower[i - 1]],
                    [i as f64, lower[i]],
                    [i as f64, upper[i]],
                    [(i - 1) as f64, upper[i - 1]],
                ]
                .into();
                plot_ui.polygon(
                    Polygon::new(quad)
                        .name(&name)
                        .fill_color(fill)
                        .stroke(Stroke::NONE),
                );
            }
            let top: PlotPoints = upper.iter().enumerate().map(|(i, &y)| [i as f64, y]).collect();
            plot_ui.line(Line::new(top).name(&name).color(color32(*color, 1.0)));
        }
        Mark::Pie { .. } => {}
    }
}

fn pie_plot(ui: &mut Ui, figure: &Figure) {
    let slices: &[PieSlice] = figure
        .marks
        .iter()
        .find_map(|m| match m {
            Mark::Pie { slices } => Some(slices.as_slice()),
            _ => None,
        })
        .unwrap_or_default();

    Plot::new("pie_plot")
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .legend(Legend::default())
        .show(ui, |plot_ui| {
            let mut start = 0.0_f64;
            for slice in slices {
                let sweep = slice.fraction * TAU;
                let fill = color32(slice.color, 1.0);
                // Wedges wider than a quarter turn are split to stay convex.
                let pieces = (sweep / FRAC_PI_2).ceil().max(1.0) as usize;
                for p in 0..pieces {
                    let a0 = start + sweep * p as f64 / pieces as f64;
                    let a1 = start + sweep * (p + 1) as f64 / pieces as f64;
                    plot_ui.polygon(
                        Polygon::new(wedge(a0, a1))
                            .name(&slice.label)
                            .fill_color(fill)
                            .stroke(Stroke::new(1.0, Color32::WHITE)),
                    );
                }

                let mid = start + sweep / 2.0;
                plot_ui.text(Text::new(
                    PlotPoint::new(1.15 * mid.cos(), 1.15 * mid.sin()),
                    RichText::new(&slice.label).size(14.0),
                ));
                let t = text_color_on(slice.color);
                plot_ui.text(
                    Text::new(
                        PlotPoint::new(0.6 * mid.cos(), 0.6 * mid.sin()),
                        RichText::new(&slice.percent_label).size(13.0),
                    )
                    .color(color32(t, 1.0)),
                );
                start += sweep;
            }
        });
}

fn wedge(a0: f64, a1: f64) -> PlotPoints<'static> {
    let steps = (((a1 - a0) / 0.05).ceil() as usize).max(2);
    std::iter::once([0.0, 0.0])
        .chain((0..=steps).map(|s| {
            let a = a0 + (a1 - a0) * s as f64 / steps as f64;
            [a.cos(), a.sin()]
        }))
        .collect()
}
