//! Climate dashboard over the major-city temperature records: trends,
//! monthly averages, anomalies, and per-city variability.

use std::path::PathBuf;

use crate::data::aggregate::{ReduceSpec, Reducer};
use crate::data::load::{Derived, LoadSpec, SourceFormat, SourceSpec};
use crate::data::metrics::{MetricDef, NumberFormat};
use crate::data::model::ColumnType;
use crate::data::pipeline::{ChartDef, ChartKind, ChartQuery, ViewConfig};

use super::{Control, ControlValues, Dashboard, SourcePicker};

pub fn dashboard() -> Dashboard {
    Dashboard {
        name: "Climate",
        picker: SourcePicker::File {
            extensions: &["csv", "json", "parquet", "pq"],
        },
        controls: vec![
            Control::Range {
                id: "years",
                label: "Year",
                column: "Year",
                integer: true,
            },
            Control::MultiSelect {
                id: "countries",
                label: "Country",
                column: "Country",
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
                ("dt", ColumnType::Date),
                ("AverageTemperature", ColumnType::Float),
                ("City", ColumnType::Str),
                ("Country", ColumnType::Str),
            ],
        )],
        join_keys: vec![],
        derived: vec![
            Derived::year("Year", "dt"),
            Derived::month_number("Month", "dt"),
            // Deviation from the all-time global mean, fixed at load.
            Derived::deviation_from_mean("Anomaly", "AverageTemperature"),
        ],
        clean: vec![],
    }
}

fn view(_values: &ControlValues) -> ViewConfig {
    let mean_temperature = |output: &str| ReduceSpec::new("AverageTemperature", Reducer::Mean, output);

    ViewConfig {
        kpis: vec![
            MetricDef::reduce(
                "Total Cities",
                "City",
                Reducer::CountDistinct,
                NumberFormat::Count,
            ),
            MetricDef::reduce(
                "Total Countries",
                "Country",
                Reducer::CountDistinct,
                NumberFormat::Count,
            ),
            MetricDef::row_count("Total Records"),
        ],
        charts: vec![
            ChartDef::new(
                "Average Global Temperature Over Time",
                ChartKind::Line,
                ChartQuery::Aggregate {
                    group_by: vec!["Year".to_string()],
                    reduce: vec![mean_temperature("AverageTemperature")],
                    having: vec![],
                    sort_desc_by: None,
                    top: None,
                },
                "Year",
                "AverageTemperature",
            ),
            ChartDef::new(
                "Average Temperature by Month",
                ChartKind::Bar,
                ChartQuery::Aggregate {
                    group_by: vec!["Month".to_string()],
                    reduce: vec![mean_temperature("AverageTemperature")],
                    having: vec![],
                    sort_desc_by: None,
                    top: None,
                },
                "Month",
                "AverageTemperature",
            ),
            ChartDef::new(
                "Temperature Anomalies Over Time",
                ChartKind::Scatter,
                ChartQuery::Rows { max_points: 5000 },
                "Year",
                "Anomaly",
            )
            .with_series("Country"),
            ChartDef::new(
                "Average Temperature by Country",
                ChartKind::Pie,
                ChartQuery::Aggregate {
                    group_by: vec!["Country".to_string()],
                    reduce: vec![mean_temperature("AverageTemperature")],
                    having: vec![],
                    sort_desc_by: None,
                    top: None,
                },
                "Country",
                "AverageTemperature",
            ),
            ChartDef::new(
                "Temperature Variability by City",
                ChartKind::Box,
                ChartQuery::Distribution {
                    group_by: "City".to_string(),
                    value: "AverageTemperature".to_string(),
                },
                "City",
                "AverageTemperature",
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::load;
    use crate::data::model::Value;
    use crate::data::pipeline;

    #[test]
    fn anomaly_is_deviation_from_global_mean() {
        let path = std::env::temp_dir().join(format!(
            "tiledash-climate-{}.csv",
            std::process::id()
        ));
        std::fs::write(
            &path,
            "dt,AverageTemperature,City,Country\n\
             2000-01-01,10.0,Oslo,Norway\n\
             2000-06-01,20.0,Lima,Peru\n\
             2001-01-01,,Oslo,Norway\n",
        )
        .unwrap();

        let spec = load_spec(&[path.clone()]);
        let (dataset, _) = load::load(&spec).unwrap();
        std::fs::remove_file(path).ok();

        let table = &dataset.base;
        let anomaly = table.schema().index_of("Anomaly").unwrap();
        assert_eq!(table.rows()[0][anomaly], Value::Float(-5.0));
        assert_eq!(table.rows()[1][anomaly], Value::Float(5.0));
        assert!(table.rows()[2][anomaly].is_null());

        // The whole view evaluates without filters.
        let ctx = super::super::init_controls(&dashboard().controls, table).unwrap();
        let filters = super::super::filters_from(&dashboard().controls, &ctx.values);
        let out = pipeline::run(&dataset, &filters, &view(&ctx.values)).unwrap();
        assert_eq!(out.kpis[0].value, Value::Integer(2)); // cities
        assert_eq!(out.charts.len(), 5);
    }
}
