//! The five dashboard instantiations of the generic pipeline. Each module
//! supplies a [`LoadSpec`] recipe, its sidebar controls, and a view builder
//! mapping the current control values to a [`ViewConfig`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::data::error::Result;
use crate::data::filter::Filter;
use crate::data::load::LoadSpec;
use crate::data::model::{Table, Value};
use crate::data::pipeline::ViewConfig;

pub mod climate;
pub mod ecommerce;
pub mod energy;
pub mod movies;
pub mod realty;

pub fn all() -> Vec<Dashboard> {
    vec![
        ecommerce::dashboard(),
        movies::dashboard(),
        climate::dashboard(),
        energy::dashboard(),
        realty::dashboard(),
    ]
}

// ---------------------------------------------------------------------------
// Dashboard definition
// ---------------------------------------------------------------------------

/// How a dashboard's source files are chosen in the UI.
pub enum SourcePicker {
    /// One file picked directly.
    File {
        extensions: &'static [&'static str],
    },
    /// A folder expected to contain the named files.
    Folder { files: &'static [&'static str] },
}

pub struct Dashboard {
    pub name: &'static str,
    pub picker: SourcePicker,
    pub controls: Vec<Control>,
    pub load: fn(&[PathBuf]) -> LoadSpec,
    pub view: fn(&ControlValues) -> ViewConfig,
}

// ---------------------------------------------------------------------------
// Sidebar controls
// ---------------------------------------------------------------------------

/// One sidebar widget. `Range`, `MultiSelect` and `TagSelect` become row
/// filters; `Choice` and `Count` parameterise the view instead.
pub enum Control {
    /// Min / max slider pair over a numeric column, bounds from the data.
    Range {
        id: &'static str,
        label: &'static str,
        column: &'static str,
        integer: bool,
    },
    /// Checkbox list over the distinct values of a column.
    MultiSelect {
        id: &'static str,
        label: &'static str,
        column: &'static str,
    },
    /// Checkbox list over the tags of a multi-valued column ("any match").
    TagSelect {
        id: &'static str,
        label: &'static str,
        column: &'static str,
        separator: char,
    },
    /// Radio choice, e.g. Monthly / Daily.
    Choice {
        id: &'static str,
        label: &'static str,
        options: &'static [&'static str],
    },
    /// Top-N slider.
    Count {
        id: &'static str,
        label: &'static str,
        min: usize,
        max: usize,
        default: usize,
    },
}

impl Control {
    pub fn id(&self) -> &'static str {
        match self {
            Control::Range { id, .. }
            | Control::MultiSelect { id, .. }
            | Control::TagSelect { id, .. }
            | Control::Choice { id, .. }
            | Control::Count { id, .. } => id,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Control::Range { label, .. }
            | Control::MultiSelect { label, .. }
            | Control::TagSelect { label, .. }
            | Control::Choice { label, .. }
            | Control::Count { label, .. } => label,
        }
    }
}

/// Current value of one control.
#[derive(Debug, Clone)]
pub enum ControlValue {
    Range(f64, f64),
    Selected(BTreeSet<Value>),
    Tags(BTreeSet<String>),
    Choice(usize),
    Count(usize),
}

/// Widget state for a whole dashboard, rebuilt into filters and view
/// parameters on every interaction.
#[derive(Debug, Clone, Default)]
pub struct ControlValues(pub BTreeMap<&'static str, ControlValue>);

impl ControlValues {
    pub fn choice(&self, id: &str) -> usize {
        match self.0.get(id) {
            Some(ControlValue::Choice(i)) => *i,
            _ => 0,
        }
    }

    pub fn count(&self, id: &str, default: usize) -> usize {
        match self.0.get(id) {
            Some(ControlValue::Count(n)) => *n,
            _ => default,
        }
    }
}

/// Data-dependent widget state: slider bounds and the full option sets the
/// checkbox lists offer.
#[derive(Debug, Clone, Default)]
pub struct ControlContext {
    pub values: ControlValues,
    pub bounds: BTreeMap<&'static str, (f64, f64)>,
    pub options: BTreeMap<&'static str, BTreeSet<Value>>,
    pub tag_options: BTreeMap<&'static str, BTreeSet<String>>,
}

/// Initialise every control to "show everything": ranges at their data
/// bounds, selections full.
pub fn init_controls(controls: &[Control], table: &Table) -> Result<ControlContext> {
    let mut ctx = ControlContext::default();
    for control in controls {
        match control {
            Control::Range { id, column, .. } => {
                let (lo, hi) = table.numeric_range(column)?.unwrap_or((0.0, 0.0));
                ctx.bounds.insert(*id, (lo, hi));
                ctx.values.0.insert(*id, ControlValue::Range(lo, hi));
            }
            Control::MultiSelect { id, column, .. } => {
                let options = table.unique_values(column)?;
                ctx.values
                    .0
                    .insert(*id, ControlValue::Selected(options.clone()));
                ctx.options.insert(*id, options);
            }
            Control::TagSelect {
                id,
                column,
                separator,
                ..
            } => {
                let mut tags = BTreeSet::new();
                for v in table.column(column)? {
                    if let Value::String(s) = v {
                        tags.extend(
                            s.split(*separator)
                                .map(str::trim)
                                .filter(|t| !t.is_empty())
                                .map(str::to_string),
                        );
                    }
                }
                ctx.values.0.insert(*id, ControlValue::Tags(tags.clone()));
                ctx.tag_options.insert(*id, tags);
            }
            Control::Choice { id, .. } => {
                ctx.values.0.insert(*id, ControlValue::Choice(0));
            }
            Control::Count { id, default, .. } => {
                ctx.values.0.insert(*id, ControlValue::Count(*default));
            }
        }
    }
    Ok(ctx)
}

/// Translate the filtering controls into row-filter predicates; `Choice`
/// and `Count` contribute nothing here.
pub fn filters_from(controls: &[Control], values: &ControlValues) -> Vec<Filter> {
    let mut filters = Vec::new();
    for control in controls {
        match (control, values.0.get(control.id())) {
            (Control::Range { column, .. }, Some(ControlValue::Range(min, max))) => {
                filters.push(Filter::Range {
                    column: column.to_string(),
                    min: *min,
                    max: *max,
                });
            }
            (Control::MultiSelect { column, .. }, Some(ControlValue::Selected(selected))) => {
                filters.push(Filter::OneOf {
                    column: column.to_string(),
                    selected: selected.clone(),
                });
            }
            (
                Control::TagSelect {
                    column, separator, ..
                },
                Some(ControlValue::Tags(selected)),
            ) => {
                filters.push(Filter::AnyTag {
                    column: column.to_string(),
                    separator: *separator,
                    selected: selected.clone(),
                });
            }
            _ => {}
        }
    }
    filters
}
