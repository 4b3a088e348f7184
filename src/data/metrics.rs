use super::aggregate::{reduce_column, Reducer};
use super::error::{DataError, Result};
use super::model::{Table, Value};

// ---------------------------------------------------------------------------
// KPI definitions
// ---------------------------------------------------------------------------

/// Which table a KPI or chart reads: the filtered view, the full base
/// dataset, or one pre-join source table by its position in the load spec.
/// The movies tiles count the whole catalog from the raw files, so movies
/// the join dropped still count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Filtered,
    Full,
    Source(usize),
}

#[derive(Debug, Clone)]
pub enum MetricKind {
    /// Plain row count of the table.
    RowCount,
    /// One column reduced to a scalar.
    Reduce { column: String, reducer: Reducer },
    /// Quotient of two reductions, e.g. average order value = revenue sum
    /// over distinct invoice count.
    Ratio {
        numerator: (String, Reducer),
        denominator: (String, Reducer),
    },
}

/// Presentation format for a KPI tile.
#[derive(Debug, Clone, Copy)]
pub enum NumberFormat {
    /// Integer with thousands separators.
    Count,
    /// Two decimals with thousands separators.
    Decimal,
}

/// A single top-level scalar metric shown as a dashboard tile, recomputed
/// on every filter change.
#[derive(Debug, Clone)]
pub struct MetricDef {
    pub label: String,
    pub kind: MetricKind,
    pub format: NumberFormat,
    pub scope: Scope,
}

impl MetricDef {
    pub fn new(label: &str, kind: MetricKind, format: NumberFormat, scope: Scope) -> Self {
        MetricDef {
            label: label.to_string(),
            kind,
            format,
            scope,
        }
    }

    pub fn reduce(label: &str, column: &str, reducer: Reducer, format: NumberFormat) -> Self {
        MetricDef::new(
            label,
            MetricKind::Reduce {
                column: column.to_string(),
                reducer,
            },
            format,
            Scope::Filtered,
        )
    }

    pub fn row_count(label: &str) -> Self {
        MetricDef::new(label, MetricKind::RowCount, NumberFormat::Count, Scope::Filtered)
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }
}

/// An evaluated KPI: raw value plus tile-ready text.
#[derive(Debug, Clone)]
pub struct Kpi {
    pub label: String,
    pub value: Value,
    pub text: String,
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Evaluate every metric over the table its scope names. Empty inputs
/// degrade to zero counts and null means; a ratio with a zero (or missing)
/// denominator yields null rather than an arithmetic fault.
pub fn summarize(
    full: &Table,
    filtered: &Table,
    sources: &[Table],
    metrics: &[MetricDef],
) -> Result<Vec<Kpi>> {
    metrics
        .iter()
        .map(|m| {
            let table = match m.scope {
                Scope::Filtered => filtered,
                Scope::Full => full,
                Scope::Source(i) => sources.get(i).ok_or(DataError::SourceTable(i))?,
            };
            let value = evaluate(table, &m.kind)?;
            Ok(Kpi {
                label: m.label.clone(),
                text: format_value(&value, m.format),
                value,
            })
        })
        .collect()
}

fn evaluate(table: &Table, kind: &MetricKind) -> Result<Value> {
    match kind {
        MetricKind::RowCount => Ok(Value::Integer(table.len() as i64)),
        MetricKind::Reduce { column, reducer } => {
            Ok(reduce_column(table, column, *reducer)?.unwrap_or(Value::Null))
        }
        MetricKind::Ratio {
            numerator: (nc, nr),
            denominator: (dc, dr),
        } => {
            let num = reduce_column(table, nc, *nr)?.and_then(|v| v.as_f64());
            let den = reduce_column(table, dc, *dr)?.and_then(|v| v.as_f64());
            Ok(match (num, den) {
                (Some(n), Some(d)) if d != 0.0 => Value::Float(n / d),
                _ => Value::Null,
            })
        }
    }
}

fn format_value(value: &Value, format: NumberFormat) -> String {
    let x = match value.as_f64() {
        Some(x) => x,
        None => return "–".to_string(),
    };
    match format {
        NumberFormat::Count => group_thousands(x, 0),
        NumberFormat::Decimal => group_thousands(x, 2),
    }
}

/// `1234567.891` → `"1,234,567.89"`, matching the source's `:,.2f` tiles.
fn group_thousands(x: f64, decimals: usize) -> String {
    let formatted = format!("{x:.decimals$}");
    let (sign, rest) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted.as_str()),
    };
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rest, None),
    };

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}
