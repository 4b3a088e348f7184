use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::color::ColorMap;
use crate::dashboards::{self, filters_from, init_controls, ControlContext, ControlValue, Dashboard};
use crate::data::load::{self, Dataset, LoadReport};
use crate::data::pipeline::{self, DashboardOutput};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// The available dashboard definitions.
    pub dashboards: Vec<Dashboard>,

    /// Currently opened dashboard (None until the user picks a dataset).
    pub active: Option<ActiveDashboard>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

/// One opened dashboard: the memoized base table plus the live widget state
/// and the latest pipeline output.
pub struct ActiveDashboard {
    pub index: usize,
    pub paths: Vec<PathBuf>,

    /// Immutable loaded dataset; interactions re-run the pipeline over this
    /// instead of re-reading the files.
    pub dataset: Dataset,
    pub report: LoadReport,

    /// Widget state: current values plus the data-derived bounds/options.
    pub ctx: ControlContext,

    /// Per-series-column colour maps, built lazily from the base table.
    pub colors: BTreeMap<String, ColorMap>,

    /// Latest pipeline output (KPIs + chart tables).
    pub output: Option<DashboardOutput>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            dashboards: dashboards::all(),
            active: None,
            status_message: None,
        }
    }
}

impl AppState {
    /// Load a dataset and make its dashboard active. A load failure leaves
    /// the previous dashboard in place and surfaces the error; no partial
    /// dashboard is shown.
    pub fn open_dashboard(&mut self, index: usize, paths: Vec<PathBuf>) {
        let dashboard = &self.dashboards[index];
        let spec = (dashboard.load)(&paths);
        let (dataset, report) = match load::load(&spec) {
            Ok(loaded) => loaded,
            Err(e) => {
                log::error!("failed to load {}: {e}", dashboard.name);
                self.status_message = Some(format!("Error: {e}"));
                return;
            }
        };
        log::info!("{}: {} rows loaded", dashboard.name, dataset.base.len());

        let ctx = match init_controls(&dashboard.controls, &dataset.base) {
            Ok(ctx) => ctx,
            Err(e) => {
                self.status_message = Some(format!("Error: {e}"));
                return;
            }
        };

        self.active = Some(ActiveDashboard {
            index,
            paths,
            dataset,
            report,
            ctx,
            colors: BTreeMap::new(),
            output: None,
        });
        self.status_message = None;
        self.rerun();
    }

    /// Re-run the filter → aggregate → summarize pipeline after a control
    /// change. The base table is untouched.
    pub fn rerun(&mut self) {
        let Some(active) = &mut self.active else {
            return;
        };
        let dashboard = &self.dashboards[active.index];
        let filters = filters_from(&dashboard.controls, &active.ctx.values);
        let view = (dashboard.view)(&active.ctx.values);

        match pipeline::run(&active.dataset, &filters, &view) {
            Ok(output) => {
                for chart in &output.charts {
                    if let Some(series) = &chart.series {
                        if !active.colors.contains_key(series) {
                            if let Ok(values) = active.dataset.base.unique_values(series) {
                                let map = ColorMap::new(values.iter().map(|v| v.to_string()));
                                active.colors.insert(series.clone(), map);
                            }
                        }
                    }
                }
                active.output = Some(output);
                self.status_message = None;
            }
            Err(e) => {
                log::error!("pipeline failed: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }
}

impl ActiveDashboard {
    /// Select every option of a multiselect / tag control.
    pub fn select_all(&mut self, id: &'static str) {
        if let Some(options) = self.ctx.options.get(id) {
            self.ctx
                .values
                .0
                .insert(id, ControlValue::Selected(options.clone()));
        } else if let Some(tags) = self.ctx.tag_options.get(id) {
            self.ctx.values.0.insert(id, ControlValue::Tags(tags.clone()));
        }
    }

    /// Deselect every option, which filters the table down to nothing.
    pub fn select_none(&mut self, id: &'static str) {
        if self.ctx.options.contains_key(id) {
            self.ctx
                .values
                .0
                .insert(id, ControlValue::Selected(Default::default()));
        } else if self.ctx.tag_options.contains_key(id) {
            self.ctx.values.0.insert(id, ControlValue::Tags(Default::default()));
        }
    }
}
