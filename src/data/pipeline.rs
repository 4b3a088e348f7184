use super::aggregate::{self, ReduceSpec};
use super::error::{DataError, Result};
use super::filter::{self, Filter};
use super::load::Dataset;
use super::metrics::{self, Kpi, MetricDef, Scope};
use super::model::{Schema, Table};

// ---------------------------------------------------------------------------
// View configuration – what one dashboard computes per interaction
// ---------------------------------------------------------------------------

/// Chart mark the presentation layer should use for a result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Bar,
    Scatter,
    Pie,
    Box,
}

/// How a chart's result table is computed from the (filtered) dataset.
pub enum ChartQuery {
    /// Group-by + reduce, optionally post-filtered ("more than 10 ratings"),
    /// sorted descending by a result column and truncated to the top N.
    Aggregate {
        group_by: Vec<String>,
        reduce: Vec<ReduceSpec>,
        having: Vec<Filter>,
        sort_desc_by: Option<String>,
        top: Option<usize>,
    },
    /// Tag frequencies of a multi-valued column, sorted descending.
    TagCounts { column: String, separator: char },
    /// Equal-width bin counts of a numeric column.
    Histogram { column: String, bins: usize },
    /// Five-number summary per group (box charts).
    Distribution { group_by: String, value: String },
    /// The rows themselves (scatter plots), capped at `max_points` with an
    /// even stride so repeated runs pick the same rows.
    Rows { max_points: usize },
}

/// One chart: its query plus the axis bindings the renderer needs.
pub struct ChartDef {
    pub title: String,
    pub kind: ChartKind,
    pub query: ChartQuery,
    pub x: String,
    pub y: String,
    /// Column whose values split the chart into colored series.
    pub series: Option<String>,
    pub scope: Scope,
}

impl ChartDef {
    pub fn new(title: &str, kind: ChartKind, query: ChartQuery, x: &str, y: &str) -> Self {
        ChartDef {
            title: title.to_string(),
            kind,
            query,
            x: x.to_string(),
            y: y.to_string(),
            series: None,
            scope: Scope::Filtered,
        }
    }

    pub fn with_series(mut self, column: &str) -> Self {
        self.series = Some(column.to_string());
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }
}

/// Everything one dashboard computes: KPI tiles plus charts.
pub struct ViewConfig {
    pub kpis: Vec<MetricDef>,
    pub charts: Vec<ChartDef>,
}

/// An evaluated chart: the result table plus the bindings it was defined
/// with. Rendering is the UI layer's concern.
pub struct ChartSpec {
    pub title: String,
    pub kind: ChartKind,
    pub x: String,
    pub y: String,
    pub series: Option<String>,
    pub table: Table,
}

pub struct DashboardOutput {
    pub kpis: Vec<Kpi>,
    pub charts: Vec<ChartSpec>,
}

// ---------------------------------------------------------------------------
// The pipeline – one pure function per interaction
// ---------------------------------------------------------------------------

/// Run the full filter → aggregate → summarize pass. Pure: the dataset is
/// only read, every interaction calls this once, and there is no other
/// state. Empty filter results flow through and degrade to empty charts
/// and zero/null KPIs.
pub fn run(dataset: &Dataset, filters: &[Filter], view: &ViewConfig) -> Result<DashboardOutput> {
    let base = &dataset.base;
    let filtered = filter::apply(base, filters)?;
    log::debug!(
        "pipeline: {} of {} rows pass {} filters",
        filtered.len(),
        base.len(),
        filters.len()
    );

    let kpis = metrics::summarize(base, &filtered, &dataset.sources, &view.kpis)?;

    let mut charts = Vec::with_capacity(view.charts.len());
    for def in &view.charts {
        let input = match def.scope {
            Scope::Filtered => &filtered,
            Scope::Full => base,
            Scope::Source(i) => dataset
                .sources
                .get(i)
                .ok_or(DataError::SourceTable(i))?,
        };
        charts.push(ChartSpec {
            title: def.title.clone(),
            kind: def.kind,
            x: def.x.clone(),
            y: def.y.clone(),
            series: def.series.clone(),
            table: eval_chart(def, input)?,
        });
    }

    Ok(DashboardOutput { kpis, charts })
}

fn eval_chart(def: &ChartDef, input: &Table) -> Result<Table> {
    match &def.query {
        ChartQuery::Aggregate {
            group_by,
            reduce,
            having,
            sort_desc_by,
            top,
        } => {
            let mut result = aggregate::aggregate(input, group_by, reduce)?;
            if !having.is_empty() {
                result = filter::apply(&result, having)?;
            }
            if let Some(col) = sort_desc_by {
                let n = top.unwrap_or(result.len());
                result = aggregate::top_n(&result, col, n)?;
            }
            Ok(result)
        }
        ChartQuery::TagCounts { column, separator } => {
            let counts = aggregate::tag_counts(input, column, *separator)?;
            aggregate::top_n(&counts, "Count", counts.len())
        }
        ChartQuery::Histogram { column, bins } => aggregate::histogram(input, column, *bins),
        ChartQuery::Distribution { group_by, value } => {
            aggregate::five_number_summary(input, group_by, value)
        }
        ChartQuery::Rows { max_points } => {
            let mut columns = vec![def.x.clone()];
            if !columns.contains(&def.y) {
                columns.push(def.y.clone());
            }
            if let Some(series) = &def.series {
                if !columns.contains(series) {
                    columns.push(series.clone());
                }
            }
            project_strided(input, &columns, *max_points)
        }
    }
}

/// Copy the named columns, taking every k-th row when the table exceeds
/// `max_points`.
fn project_strided(table: &Table, columns: &[String], max_points: usize) -> Result<Table> {
    let indices: Vec<usize> = columns
        .iter()
        .map(|c| table.schema().require(c))
        .collect::<Result<_>>()?;
    let schema = Schema::new(
        indices
            .iter()
            .map(|&i| table.schema().columns()[i].clone())
            .collect(),
    );

    let stride = if max_points == 0 {
        1
    } else {
        table.len().div_ceil(max_points).max(1)
    };
    let mut out = Table::new(schema);
    for row in table.rows().iter().step_by(stride) {
        out.push_row(indices.iter().map(|&i| row[i].clone()).collect());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aggregate::Reducer;
    use crate::data::metrics::{MetricKind, NumberFormat};
    use crate::data::model::{ColumnType, Value};

    fn transactions() -> Table {
        let schema = Schema::new(vec![
            ("InvoiceNo".to_string(), ColumnType::Str),
            ("Country".to_string(), ColumnType::Str),
            ("TotalPrice".to_string(), ColumnType::Float),
        ]);
        let mut t = Table::new(schema);
        let rows = [
            ("A1", "UK", 10.0),
            ("A2", "UK", 20.0),
            ("A3", "France", 40.0),
            ("A4", "Japan", 1.0),
        ];
        for (inv, country, total) in rows {
            t.push_row(vec![
                Value::String(inv.to_string()),
                Value::String(country.to_string()),
                Value::Float(total),
            ]);
        }
        t
    }

    fn view() -> ViewConfig {
        ViewConfig {
            kpis: vec![
                MetricDef::reduce("Revenue", "TotalPrice", Reducer::Sum, NumberFormat::Decimal),
                MetricDef::new(
                    "AOV",
                    MetricKind::Ratio {
                        numerator: ("TotalPrice".into(), Reducer::Sum),
                        denominator: ("InvoiceNo".into(), Reducer::CountDistinct),
                    },
                    NumberFormat::Decimal,
                    Scope::Filtered,
                ),
            ],
            charts: vec![ChartDef::new(
                "Sales by Country",
                ChartKind::Bar,
                ChartQuery::Aggregate {
                    group_by: vec!["Country".to_string()],
                    reduce: vec![ReduceSpec::new("TotalPrice", Reducer::Sum, "Revenue")],
                    having: vec![],
                    sort_desc_by: Some("Revenue".to_string()),
                    top: Some(2),
                },
                "Country",
                "Revenue",
            )],
        }
    }

    #[test]
    fn end_to_end_filtered_run() {
        let base = Dataset::new(transactions());
        let filters = [Filter::Range {
            column: "TotalPrice".into(),
            min: 5.0,
            max: 100.0,
        }];
        let out = run(&base, &filters, &view()).unwrap();

        assert_eq!(out.kpis[0].value, Value::Float(70.0));
        let chart = &out.charts[0];
        assert_eq!(chart.table.len(), 2);
        // France (40) first, UK (30) second; Japan filtered out.
        assert_eq!(chart.table.rows()[0][0], Value::String("France".into()));
        assert_eq!(chart.table.rows()[1][0], Value::String("UK".into()));
    }

    #[test]
    fn filters_to_empty_yield_empty_charts_and_null_ratio() {
        let base = Dataset::new(transactions());
        let filters = [Filter::Range {
            column: "TotalPrice".into(),
            min: 1e9,
            max: 2e9,
        }];
        let out = run(&base, &filters, &view()).unwrap();
        assert_eq!(out.kpis[0].value, Value::Float(0.0));
        assert_eq!(out.kpis[1].value, Value::Null);
        assert!(out.charts[0].table.is_empty());
    }

    #[test]
    fn having_clause_drops_small_groups() {
        let base = transactions();
        let def = ChartDef::new(
            "Countries with two invoices",
            ChartKind::Bar,
            ChartQuery::Aggregate {
                group_by: vec!["Country".to_string()],
                reduce: vec![
                    ReduceSpec::new("TotalPrice", Reducer::Mean, "MeanPrice"),
                    ReduceSpec::new("InvoiceNo", Reducer::Count, "N"),
                ],
                having: vec![Filter::Range {
                    column: "N".into(),
                    min: 2.0,
                    max: f64::INFINITY,
                }],
                sort_desc_by: None,
                top: None,
            },
            "Country",
            "MeanPrice",
        );
        let result = eval_chart(&def, &base).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.rows()[0][0], Value::String("UK".into()));
    }

    #[test]
    fn strided_projection_caps_points() {
        let base = transactions();
        let def = ChartDef::new(
            "Scatter",
            ChartKind::Scatter,
            ChartQuery::Rows { max_points: 2 },
            "Country",
            "TotalPrice",
        );
        let result = eval_chart(&def, &base).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.schema().len(), 2);
    }
}
