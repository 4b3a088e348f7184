use std::collections::BTreeSet;

use super::error::Result;
use super::model::{Table, Value};

// ---------------------------------------------------------------------------
// Filter – one sidebar predicate over one column
// ---------------------------------------------------------------------------

/// A named predicate over one column, rebuilt from the widget state on every
/// interaction and applied fresh each time.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Closed numeric range, inclusive on both ends (slider semantics).
    Range { column: String, min: f64, max: f64 },
    /// Exact membership in the selected set. An empty selection matches
    /// nothing, mirroring a multiselect with everything unticked.
    OneOf {
        column: String,
        selected: BTreeSet<Value>,
    },
    /// Multi-valued cell such as `"Action|Comedy"`: the row passes when its
    /// tag set intersects the selection (OR within this filter, AND across
    /// filters).
    AnyTag {
        column: String,
        separator: char,
        selected: BTreeSet<String>,
    },
}

impl Filter {
    fn column(&self) -> &str {
        match self {
            Filter::Range { column, .. }
            | Filter::OneOf { column, .. }
            | Filter::AnyTag { column, .. } => column,
        }
    }

    fn passes(&self, value: &Value) -> bool {
        match self {
            Filter::Range { min, max, .. } => match value.as_f64() {
                Some(v) => *min <= v && v <= *max,
                None => false,
            },
            Filter::OneOf { selected, .. } => selected.contains(value),
            Filter::AnyTag {
                separator,
                selected,
                ..
            } => match value {
                Value::String(s) => s.split(*separator).any(|tag| selected.contains(tag)),
                _ => false,
            },
        }
    }
}

/// Keep the rows satisfying every filter. Filters compose by logical AND,
/// so the result is independent of their order. An empty result is valid
/// and flows through to aggregation unchanged.
pub fn apply(table: &Table, filters: &[Filter]) -> Result<Table> {
    let indices: Vec<usize> = filters
        .iter()
        .map(|f| table.schema().require(f.column()))
        .collect::<Result<_>>()?;

    let mut out = Table::new(table.schema().clone());
    for row in table.rows() {
        if filters
            .iter()
            .zip(&indices)
            .all(|(f, &idx)| f.passes(&row[idx]))
        {
            out.push_row(row.clone());
        }
    }
    Ok(out)
}
