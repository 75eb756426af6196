use eframe::egui::{Align2, Color32, Stroke, Ui};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, HLine, Legend, LineStyle, Plot, PlotPoint,
    Points, Text,
};
use fair_lending::chart::{ChartKind, ChartSpec};

use crate::color::ColorMap;

// ---------------------------------------------------------------------------
// Chart rendering (central panel)
// ---------------------------------------------------------------------------

const BAR_WIDTH: f64 = 0.6;

/// Render a chart description with `egui_plot`. Categories sit at x = 0, 1, 2…
pub fn disparity_chart(ui: &mut Ui, spec: &ChartSpec, colors: &ColorMap) {
    if spec.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label("Nothing to plot for the current selection.");
        });
        return;
    }

    ui.strong(spec.title.as_str());

    let tick_labels: Vec<String> = spec
        .categories
        .iter()
        .map(|c| {
            if spec.wrap_labels {
                wrap_label(c, spec.wrap_width)
            } else {
                c.clone()
            }
        })
        .collect();

    // Build plot items up front; the plot closure only places them.
    let boxes = box_plot(spec, colors);
    let outliers = outlier_points(spec);
    let bars = bar_charts(spec, colors);

    Plot::new("disparity_plot")
        .legend(Legend::default())
        .height(380.0)
        .x_axis_label(spec.x_axis_title.clone())
        .y_axis_label(spec.y_axis_title.clone())
        .x_axis_formatter(move |mark, _range| {
            let idx = mark.value.round();
            if (mark.value - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            tick_labels.get(idx as usize).cloned().unwrap_or_default()
        })
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(false)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            if let Some(boxes) = boxes {
                plot_ui.box_plot(boxes);
            }
            if let Some(points) = outliers {
                plot_ui.points(points);
            }
            for chart in bars {
                plot_ui.bar_chart(chart);
            }

            if let Some(line) = &spec.reference_line {
                plot_ui.hline(
                    HLine::new(line.value)
                        .name(&line.label)
                        .color(Color32::RED)
                        .style(LineStyle::Dashed { length: 8.0 }),
                );
            }

            for (i, label) in spec.value_labels.iter().enumerate() {
                plot_ui.text(
                    Text::new(PlotPoint::new(i as f64, label.value), label.text.as_str())
                        .anchor(Align2::CENTER_BOTTOM),
                );
            }
        });
}

fn box_plot(spec: &ChartSpec, colors: &ColorMap) -> Option<BoxPlot> {
    if spec.kind != ChartKind::BoxPlot {
        return None;
    }
    let elems = spec
        .boxes
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let color = colors.color_for(&b.category);
            BoxElem::new(
                i as f64,
                BoxSpread::new(b.lower_whisker, b.q1, b.median, b.q3, b.upper_whisker),
            )
            .name(&b.category)
            .box_width(BAR_WIDTH)
            .fill(color.gamma_multiply(0.5))
            .stroke(Stroke::new(1.5, color))
        })
        .collect();
    Some(BoxPlot::new(elems).name(spec.y_axis_title.as_str()))
}

fn outlier_points(spec: &ChartSpec) -> Option<Points> {
    let points: Vec<[f64; 2]> = spec
        .boxes
        .iter()
        .enumerate()
        .flat_map(|(i, b)| b.outliers.iter().map(move |&y| [i as f64, y]))
        .collect();
    if points.is_empty() {
        return None;
    }
    Some(
        Points::new(points)
            .name("Outliers")
            .radius(2.5)
            .color(Color32::DARK_GRAY),
    )
}

/// One chart per series; stacked charts are stacked in series order.
fn bar_charts(spec: &ChartSpec, colors: &ColorMap) -> Vec<BarChart> {
    let mut charts: Vec<BarChart> = Vec::new();
    for series in &spec.series {
        let bars: Vec<Bar> = series
            .values
            .iter()
            .zip(&spec.categories)
            .enumerate()
            .map(|(i, (&v, category))| {
                let color = match spec.kind {
                    ChartKind::StackedBar => colors.color_for(&series.name),
                    _ => colors.color_for(category),
                };
                Bar::new(i as f64, v)
                    .name(category)
                    .width(BAR_WIDTH)
                    .fill(color)
            })
            .collect();

        let mut chart = BarChart::new(bars).name(&series.name);
        if spec.kind == ChartKind::StackedBar {
            chart = chart.color(colors.color_for(&series.name));
            if !charts.is_empty() {
                let below: Vec<&BarChart> = charts.iter().collect();
                chart = chart.stack_on(&below);
            }
        }
        charts.push(chart);
    }
    charts
}

/// Greedy word wrap of a category label to lines of at most `width` chars.
/// Single words longer than `width` are kept whole.
pub fn wrap_label(label: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in label.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_breaks_on_word_boundaries() {
        assert_eq!(
            wrap_label("Native Hawaiian or Other Pacific Islander", 12),
            "Native\nHawaiian or\nOther\nPacific\nIslander"
        );
        assert_eq!(wrap_label("White", 12), "White");
        assert_eq!(wrap_label("Supercalifragilistic", 5), "Supercalifragilistic");
    }
}
