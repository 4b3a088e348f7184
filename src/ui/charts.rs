use std::collections::BTreeMap;

use chrono::NaiveDate;
use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, Legend, Line, Plot, PlotPoints, Points,
};

use crate::color::ColorMap;
use crate::data::metrics::Kpi;
use crate::data::model::{ColumnType, Table, Value};
use crate::data::pipeline::{ChartKind, ChartSpec};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Central panel – KPI tiles and charts
// ---------------------------------------------------------------------------

/// Render the active dashboard's KPI row and chart list.
pub fn central_panel(ui: &mut Ui, state: &AppState) {
    let Some(active) = &state.active else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Pick a dataset from the Dataset menu to get started.");
        });
        return;
    };
    let Some(output) = &active.output else {
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            kpi_row(ui, &output.kpis);
            ui.separator();
            for chart in &output.charts {
                ui.heading(&chart.title);
                render_chart(ui, chart, &active.colors);
                ui.add_space(16.0);
            }
        });
}

fn kpi_row(ui: &mut Ui, kpis: &[Kpi]) {
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for kpi in kpis {
            egui::Frame::group(ui.style()).show(ui, |ui: &mut Ui| {
                ui.vertical(|ui: &mut Ui| {
                    ui.label(RichText::new(&kpi.label).small());
                    ui.label(RichText::new(&kpi.text).heading());
                });
            });
        }
    });
}

// ---------------------------------------------------------------------------
// Chart rendering
// ---------------------------------------------------------------------------

/// Horizontal scale of a chart: numeric values plot as-is, dates plot as
/// days since the epoch, strings plot at integer positions with labels.
enum AxisScale {
    Numeric,
    Date,
    Categorical(Vec<String>),
}

const DEFAULT_COLOR: Color32 = Color32::LIGHT_BLUE;

fn render_chart(ui: &mut Ui, chart: &ChartSpec, colors: &BTreeMap<String, ColorMap>) {
    let table = &chart.table;
    if table.is_empty() {
        ui.weak("No data for the current filters.");
        return;
    }
    let Some(xi) = table.schema().index_of(&chart.x) else {
        return;
    };

    let (positions, scale) = x_positions(table, xi);

    let mut plot = Plot::new(&chart.title)
        .legend(Legend::default())
        .height(280.0)
        .x_axis_label(&chart.x)
        .y_axis_label(&chart.y);
    match &scale {
        AxisScale::Categorical(labels) => {
            let labels = labels.clone();
            plot = plot.x_axis_formatter(move |mark, _range| {
                let rounded = mark.value.round();
                if (mark.value - rounded).abs() > 1e-6 || rounded < 0.0 {
                    return String::new();
                }
                labels
                    .get(rounded as usize)
                    .cloned()
                    .unwrap_or_default()
            });
        }
        AxisScale::Date => {
            plot = plot.x_axis_formatter(|mark, _range| format_days(mark.value));
        }
        AxisScale::Numeric => {}
    }

    match chart.kind {
        ChartKind::Box => render_box(plot, ui, table, xi, &positions),
        // A pie has no egui_plot mark; the shares render as a bar ranking.
        ChartKind::Bar | ChartKind::Pie => render_bars(plot, ui, chart, &positions, &scale),
        ChartKind::Line | ChartKind::Scatter => render_series(plot, ui, chart, colors, &positions),
    }
}

/// Per-row x coordinates plus the scale the axis formatter needs.
fn x_positions(table: &Table, xi: usize) -> (Vec<f64>, AxisScale) {
    let is_date = matches!(
        table.schema().columns()[xi].1,
        ColumnType::Date
    );
    let numeric = table.rows().iter().all(|row| row[xi].as_f64().is_some());
    if numeric {
        let positions = table
            .rows()
            .iter()
            .map(|row| row[xi].as_f64().unwrap_or(0.0))
            .collect();
        let scale = if is_date {
            AxisScale::Date
        } else {
            AxisScale::Numeric
        };
        return (positions, scale);
    }

    // Categorical: one slot per distinct label, in row order.
    let mut slots: BTreeMap<String, usize> = BTreeMap::new();
    let mut labels = Vec::new();
    let mut positions = Vec::with_capacity(table.len());
    for row in table.rows() {
        let label = row[xi].to_string();
        let slot = *slots.entry(label.clone()).or_insert_with(|| {
            labels.push(label);
            labels.len() - 1
        });
        positions.push(slot as f64);
    }
    (positions, AxisScale::Categorical(labels))
}

fn format_days(days: f64) -> String {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    epoch
        .checked_add_signed(chrono::Duration::days(days as i64))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn render_bars(plot: Plot<'_>, ui: &mut Ui, chart: &ChartSpec, positions: &[f64], scale: &AxisScale) {
    let table = &chart.table;
    let Some(yi) = table.schema().index_of(&chart.y) else {
        return;
    };

    let mut bars = Vec::with_capacity(table.len());
    for (row, &x) in table.rows().iter().zip(positions) {
        let Some(y) = row[yi].as_f64() else {
            continue;
        };
        let mut bar = Bar::new(x, y).width(0.7);
        if let AxisScale::Categorical(labels) = scale {
            if let Some(label) = labels.get(x as usize) {
                bar = bar.name(label);
            }
        }
        bars.push(bar);
    }

    plot.show(ui, |plot_ui| {
        plot_ui.bar_chart(BarChart::new(bars).color(DEFAULT_COLOR));
    });
}

fn render_series(
    plot: Plot<'_>,
    ui: &mut Ui,
    chart: &ChartSpec,
    colors: &BTreeMap<String, ColorMap>,
    positions: &[f64],
) {
    let table = &chart.table;
    let Some(yi) = table.schema().index_of(&chart.y) else {
        return;
    };
    let si = chart
        .series
        .as_ref()
        .and_then(|s| table.schema().index_of(s));
    let color_map = chart.series.as_ref().and_then(|s| colors.get(s));

    // Row indices per series value. A chart without a series column is one
    // anonymous group.
    let mut groups: BTreeMap<Option<&Value>, Vec<usize>> = BTreeMap::new();
    for (i, row) in table.rows().iter().enumerate() {
        let key = si.map(|s| &row[s]);
        groups.entry(key).or_default().push(i);
    }

    plot.show(ui, |plot_ui| {
        for (key, rows) in &groups {
            let points: PlotPoints = rows
                .iter()
                .filter_map(|&i| {
                    let y = table.rows()[i][yi].as_f64()?;
                    Some([positions[i], y])
                })
                .collect();

            let label = key.map(|v| v.to_string());
            let color = match (&label, color_map) {
                (Some(label), Some(cm)) => cm.color_for(label),
                _ => DEFAULT_COLOR,
            };
            let name = label.unwrap_or_else(|| chart.y.clone());

            match chart.kind {
                ChartKind::Scatter => {
                    plot_ui.points(Points::new(points).name(&name).color(color).radius(2.0));
                }
                _ => {
                    plot_ui.line(Line::new(points).name(&name).color(color).width(1.5));
                }
            }
        }
    });
}

fn render_box(plot: Plot<'_>, ui: &mut Ui, table: &Table, xi: usize, positions: &[f64]) {
    let indices: Option<Vec<usize>> = ["Min", "Q1", "Median", "Q3", "Max"]
        .iter()
        .map(|name| table.schema().index_of(name))
        .collect();
    let Some(indices) = indices else {
        return;
    };

    let mut boxes = Vec::with_capacity(table.len());
    for (row, &x) in table.rows().iter().zip(positions) {
        let stats: Option<Vec<f64>> = indices.iter().map(|&i| row[i].as_f64()).collect();
        let Some(s) = stats else {
            continue;
        };
        boxes.push(
            BoxElem::new(x, BoxSpread::new(s[0], s[1], s[2], s[3], s[4]))
                .name(row[xi].to_string()),
        );
    }

    plot.show(ui, |plot_ui| {
        plot_ui.box_plot(BoxPlot::new(boxes).color(DEFAULT_COLOR));
    });
}
