//! E-commerce transactions dashboard: revenue over time, top products,
//! sales by country.

use std::path::PathBuf;

use crate::data::aggregate::{ReduceSpec, Reducer};
use crate::data::load::{Derived, LoadSpec, SourceFormat, SourceSpec};
use crate::data::metrics::{MetricDef, MetricKind, NumberFormat, Scope};
use crate::data::model::ColumnType;
use crate::data::pipeline::{ChartDef, ChartKind, ChartQuery, ViewConfig};

use super::{Control, ControlValues, Dashboard, SourcePicker};

pub fn dashboard() -> Dashboard {
    Dashboard {
        name: "E-Commerce",
        picker: SourcePicker::File {
            extensions: &["csv", "json", "parquet", "pq"],
        },
        controls: vec![
            Control::Choice {
                id: "time",
                label: "Time Period",
                options: &["Monthly", "Daily"],
            },
            Control::Count {
                id: "top_products",
                label: "Top products to display",
                min: 5,
                max: 20,
                default: 10,
            },
            Control::Count {
                id: "top_countries",
                label: "Top countries to display",
                min: 5,
                max: 20,
                default: 10,
            },
        ],
        load: load_spec,
        view,
    }
}

fn load_spec(paths: &[PathBuf]) -> LoadSpec {
    let path = paths[0].clone();
    let format = SourceFormat::from_path(&path).unwrap_or(SourceFormat::Csv { delimiter: b',' });
    LoadSpec {
        sources: vec![SourceSpec::new(
            path,
            format,
            vec![
                ("InvoiceNo", ColumnType::Str),
                ("StockCode", ColumnType::Str),
                ("Quantity", ColumnType::Int),
                ("InvoiceDate", ColumnType::Date),
                ("UnitPrice", ColumnType::Float),
                ("CustomerID", ColumnType::Str),
                ("Country", ColumnType::Str),
            ],
        )],
        join_keys: vec![],
        derived: vec![
            Derived::product("TotalPrice", "Quantity", "UnitPrice"),
            Derived::month_start("InvoiceMonth", "InvoiceDate"),
        ],
        clean: vec![],
    }
}

fn view(values: &ControlValues) -> ViewConfig {
    // Monthly groups on the month-truncated date, Daily on the raw date;
    // both were derived at load time.
    let time_column = match values.choice("time") {
        0 => "InvoiceMonth",
        _ => "InvoiceDate",
    };

    ViewConfig {
        kpis: vec![
            MetricDef::reduce(
                "Total Sales Revenue ($)",
                "TotalPrice",
                Reducer::Sum,
                NumberFormat::Decimal,
            ),
            MetricDef::new(
                "Average Order Value ($)",
                MetricKind::Ratio {
                    numerator: ("TotalPrice".into(), Reducer::Sum),
                    denominator: ("InvoiceNo".into(), Reducer::CountDistinct),
                },
                NumberFormat::Decimal,
                Scope::Filtered,
            ),
            MetricDef::reduce(
                "Total Number of Orders",
                "InvoiceNo",
                Reducer::CountDistinct,
                NumberFormat::Count,
            ),
            MetricDef::reduce(
                "Total Number of Customers",
                "CustomerID",
                Reducer::CountDistinct,
                NumberFormat::Count,
            ),
        ],
        charts: vec![
            ChartDef::new(
                "Sales Revenue Over Time",
                ChartKind::Line,
                ChartQuery::Aggregate {
                    group_by: vec![time_column.to_string()],
                    reduce: vec![ReduceSpec::new("TotalPrice", Reducer::Sum, "Revenue")],
                    having: vec![],
                    sort_desc_by: None,
                    top: None,
                },
                time_column,
                "Revenue",
            ),
            ChartDef::new(
                "Top Selling Products",
                ChartKind::Bar,
                ChartQuery::Aggregate {
                    group_by: vec!["StockCode".to_string()],
                    reduce: vec![ReduceSpec::new("Quantity", Reducer::Sum, "Quantity Sold")],
                    having: vec![],
                    sort_desc_by: Some("Quantity Sold".to_string()),
                    top: Some(values.count("top_products", 10)),
                },
                "StockCode",
                "Quantity Sold",
            ),
            ChartDef::new(
                "Sales by Country",
                ChartKind::Bar,
                ChartQuery::Aggregate {
                    group_by: vec!["Country".to_string()],
                    reduce: vec![ReduceSpec::new("TotalPrice", Reducer::Sum, "Revenue")],
                    having: vec![],
                    sort_desc_by: Some("Revenue".to_string()),
                    top: Some(values.count("top_countries", 10)),
                },
                "Country",
                "Revenue",
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::load::Dataset;
    use crate::data::model::{Schema, Table, Value};
    use crate::data::pipeline;
    use chrono::NaiveDate;

    fn base() -> Table {
        let spec = load_spec(&[PathBuf::from("data.csv")]);
        // Build the post-load shape by hand: source schema plus derived
        // columns in declared order.
        let mut columns: Vec<(String, ColumnType)> = spec.sources[0].schema.clone();
        columns.push(("TotalPrice".to_string(), ColumnType::Float));
        columns.push(("InvoiceMonth".to_string(), ColumnType::Date));
        let mut t = Table::new(Schema::new(columns));
        let d = NaiveDate::from_ymd_opt(2011, 3, 14).unwrap();
        let m = NaiveDate::from_ymd_opt(2011, 3, 1).unwrap();
        for (inv, qty, price) in [("A1", 2, 5.0), ("A2", 1, 20.0)] {
            t.push_row(vec![
                Value::String(inv.into()),
                Value::String("P1".into()),
                Value::Integer(qty),
                Value::Date(d),
                Value::Float(price),
                Value::String("C1".into()),
                Value::String("UK".into()),
                Value::Float(qty as f64 * price),
                Value::Date(m),
            ]);
        }
        t
    }

    #[test]
    fn kpis_match_the_reference_numbers() {
        let t = base();
        let ctx = super::super::init_controls(&dashboard().controls, &t).unwrap();
        let out = pipeline::run(&Dataset::new(t), &[], &view(&ctx.values)).unwrap();

        assert_eq!(out.kpis[0].value, Value::Float(30.0)); // revenue
        assert_eq!(out.kpis[1].value, Value::Float(15.0)); // AOV
        assert_eq!(out.kpis[2].value, Value::Integer(2)); // orders
    }

    #[test]
    fn daily_choice_switches_the_time_column() {
        let mut values = ControlValues::default();
        values
            .0
            .insert("time", super::super::ControlValue::Choice(1));
        let v = view(&values);
        assert_eq!(v.charts[0].x, "InvoiceDate");
    }
}
