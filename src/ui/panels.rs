use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::dashboards::{Control, ControlValue, SourcePicker};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – dashboard controls
// ---------------------------------------------------------------------------

/// Render the control panel for the active dashboard.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Controls");
    ui.separator();

    let Some(active) = &mut state.active else {
        ui.label("No dataset loaded.\nPick one from the Dataset menu.");
        return;
    };
    let dashboard = &state.dashboards[active.index];

    // Clone the data-derived bounds and option sets so the widget loop can
    // mutate the values freely.
    let bounds = active.ctx.bounds.clone();
    let options = active.ctx.options.clone();
    let tag_options = active.ctx.tag_options.clone();

    let mut changed = false;
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for control in &dashboard.controls {
                match control {
                    Control::Range { id, label, integer, .. } => {
                        let (lo_bound, hi_bound) = bounds.get(id).copied().unwrap_or((0.0, 0.0));
                        let Some(ControlValue::Range(lo, hi)) = active.ctx.values.0.get_mut(id)
                        else {
                            continue;
                        };
                        ui.strong(*label);
                        let mut min_slider = egui::Slider::new(lo, lo_bound..=hi_bound).text("min");
                        let mut max_slider = egui::Slider::new(hi, lo_bound..=hi_bound).text("max");
                        if *integer {
                            min_slider = min_slider.integer();
                            max_slider = max_slider.integer();
                        }
                        changed |= ui.add(min_slider).changed();
                        changed |= ui.add(max_slider).changed();
                        // Keep the pair ordered; the filter is min ..= max.
                        if changed && *hi < *lo {
                            *hi = *lo;
                        }
                    }

                    Control::MultiSelect { id, label, .. } => {
                        let Some(all) = options.get(id) else {
                            continue;
                        };
                        let n_selected = match active.ctx.values.0.get(id) {
                            Some(ControlValue::Selected(s)) => s.len(),
                            _ => 0,
                        };
                        let header = format!("{label}  ({n_selected}/{})", all.len());
                        egui::CollapsingHeader::new(RichText::new(header).strong())
                            .id_salt(*id)
                            .default_open(false)
                            .show(ui, |ui: &mut Ui| {
                                ui.horizontal(|ui: &mut Ui| {
                                    if ui.small_button("All").clicked() {
                                        active.select_all(*id);
                                        changed = true;
                                    }
                                    if ui.small_button("None").clicked() {
                                        active.select_none(*id);
                                        changed = true;
                                    }
                                });
                                let Some(ControlValue::Selected(selected)) =
                                    active.ctx.values.0.get_mut(id)
                                else {
                                    return;
                                };
                                for val in all {
                                    let mut checked = selected.contains(val);
                                    if ui.checkbox(&mut checked, val.to_string()).changed() {
                                        if checked {
                                            selected.insert(val.clone());
                                        } else {
                                            selected.remove(val);
                                        }
                                        changed = true;
                                    }
                                }
                            });
                    }

                    Control::TagSelect { id, label, .. } => {
                        let Some(all) = tag_options.get(id) else {
                            continue;
                        };
                        let n_selected = match active.ctx.values.0.get(id) {
                            Some(ControlValue::Tags(s)) => s.len(),
                            _ => 0,
                        };
                        let header = format!("{label}  ({n_selected}/{})", all.len());
                        egui::CollapsingHeader::new(RichText::new(header).strong())
                            .id_salt(*id)
                            .default_open(false)
                            .show(ui, |ui: &mut Ui| {
                                ui.horizontal(|ui: &mut Ui| {
                                    if ui.small_button("All").clicked() {
                                        active.select_all(*id);
                                        changed = true;
                                    }
                                    if ui.small_button("None").clicked() {
                                        active.select_none(*id);
                                        changed = true;
                                    }
                                });
                                let Some(ControlValue::Tags(selected)) =
                                    active.ctx.values.0.get_mut(id)
                                else {
                                    return;
                                };
                                for tag in all {
                                    let mut checked = selected.contains(tag);
                                    if ui.checkbox(&mut checked, tag).changed() {
                                        if checked {
                                            selected.insert(tag.clone());
                                        } else {
                                            selected.remove(tag);
                                        }
                                        changed = true;
                                    }
                                }
                            });
                    }

                    Control::Choice { id, label, options: names } => {
                        let Some(ControlValue::Choice(current)) = active.ctx.values.0.get_mut(id)
                        else {
                            continue;
                        };
                        ui.strong(*label);
                        for (i, name) in names.iter().enumerate() {
                            if ui.radio_value(current, i, *name).changed() {
                                changed = true;
                            }
                        }
                    }

                    Control::Count { id, label, min, max, .. } => {
                        let Some(ControlValue::Count(n)) = active.ctx.values.0.get_mut(id) else {
                            continue;
                        };
                        ui.strong(*label);
                        changed |= ui.add(egui::Slider::new(n, *min..=*max)).changed();
                    }
                }
                ui.add_space(8.0);
            }
        });

    // Re-run the pipeline once per frame after any widget change.
    if changed {
        state.rerun();
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / status bar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("Dataset", |ui: &mut Ui| {
            for index in 0..state.dashboards.len() {
                if ui.button(state.dashboards[index].name).clicked() {
                    open_dataset_dialog(state, index);
                    ui.close_menu();
                }
            }
        });

        ui.separator();

        if let Some(active) = &state.active {
            ui.label(format!(
                "{}: {} rows loaded",
                state.dashboards[active.index].name,
                active.dataset.base.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Dataset picker dialog
// ---------------------------------------------------------------------------

pub fn open_dataset_dialog(state: &mut AppState, index: usize) {
    let name = state.dashboards[index].name;
    let paths = match &state.dashboards[index].picker {
        SourcePicker::File { extensions } => rfd::FileDialog::new()
            .set_title(format!("Open {name} data"))
            .add_filter("Supported files", extensions)
            .pick_file()
            .map(|path| vec![path]),
        SourcePicker::Folder { files } => rfd::FileDialog::new()
            .set_title(format!("Open {name} data folder"))
            .pick_folder()
            .map(|dir| files.iter().map(|f| dir.join(f)).collect()),
    };

    if let Some(paths) = paths {
        state.open_dashboard(index, paths);
    }
}
