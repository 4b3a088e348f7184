//! USA real-estate dashboard: price distribution, price by state and city,
//! top states by listing count.

use std::path::PathBuf;

use crate::data::aggregate::{ReduceSpec, Reducer};
use crate::data::load::{CleanRule, LoadSpec, SourceFormat, SourceSpec};
use crate::data::metrics::{MetricDef, NumberFormat};
use crate::data::model::ColumnType;
use crate::data::pipeline::{ChartDef, ChartKind, ChartQuery, ViewConfig};

use super::{Control, ControlValues, Dashboard, SourcePicker};

pub fn dashboard() -> Dashboard {
    Dashboard {
        name: "Real Estate",
        picker: SourcePicker::File {
            extensions: &["csv", "json", "parquet", "pq"],
        },
        controls: vec![
            Control::Range {
                id: "price",
                label: "Price",
                column: "price",
                integer: true,
            },
            Control::MultiSelect {
                id: "states",
                label: "State",
                column: "state",
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
                ("price", ColumnType::Float),
                ("bed", ColumnType::Float),
                ("bath", ColumnType::Float),
                ("state", ColumnType::Str),
                ("city", ColumnType::Str),
            ],
        )],
        join_keys: vec![],
        derived: vec![],
        // Listing scrapes are noisy; the bounds below mirror the cleaning
        // the source dashboard applied before charting.
        clean: vec![
            CleanRule::drop_null(&["price", "bed", "bath"]),
            CleanRule::retain("realistic price", |row| {
                row.f64("price").is_some_and(|p| p > 0.0 && p < 1e8)
            }),
            CleanRule::retain("realistic beds", |row| {
                row.f64("bed").is_some_and(|b| b > 0.0 && b < 10.0)
            }),
            CleanRule::retain("realistic baths", |row| {
                row.f64("bath").is_some_and(|b| (0.0..10.0).contains(&b))
            }),
        ],
    }
}

fn view(_values: &ControlValues) -> ViewConfig {
    ViewConfig {
        kpis: vec![
            MetricDef::row_count("Total Properties"),
            MetricDef::reduce("Average Price ($)", "price", Reducer::Mean, NumberFormat::Decimal),
            MetricDef::reduce("Median Price ($)", "price", Reducer::Median, NumberFormat::Decimal),
            MetricDef::reduce("Total Listings", "price", Reducer::Count, NumberFormat::Count),
        ],
        charts: vec![
            ChartDef::new(
                "Distribution of Property Prices",
                ChartKind::Line,
                ChartQuery::Histogram {
                    column: "price".to_string(),
                    bins: 100,
                },
                "price",
                "Count",
            ),
            ChartDef::new(
                "Property Prices by State and City",
                ChartKind::Scatter,
                ChartQuery::Aggregate {
                    group_by: vec!["state".to_string(), "city".to_string()],
                    reduce: vec![ReduceSpec::new("price", Reducer::Mean, "price")],
                    having: vec![],
                    sort_desc_by: None,
                    top: None,
                },
                "state",
                "price",
            )
            .with_series("state"),
            ChartDef::new(
                "Top States by Listings",
                ChartKind::Bar,
                ChartQuery::Aggregate {
                    group_by: vec!["state".to_string()],
                    reduce: vec![ReduceSpec::new("price", Reducer::Count, "Listings")],
                    having: vec![],
                    sort_desc_by: Some("Listings".to_string()),
                    top: None,
                },
                "state",
                "Listings",
            ),
        ],
    }
}
