//! Sustainable-energy dashboard: electricity and clean-fuel access over
//! time per country, renewable capacity and financial flows.

use std::path::PathBuf;

use crate::data::aggregate::{ReduceSpec, Reducer};
use crate::data::load::{LoadSpec, SourceFormat, SourceSpec};
use crate::data::metrics::{MetricDef, NumberFormat};
use crate::data::model::ColumnType;
use crate::data::pipeline::{ChartDef, ChartKind, ChartQuery, ViewConfig};

use super::{Control, ControlValues, Dashboard, SourcePicker};

// The published CSV really does use these header spellings.
const ELECTRICITY: &str = "Access to electricity (% of population)";
const CLEAN_FUELS: &str = "Access to clean fuels for cooking";
const RENEWABLE_CAPACITY: &str = "Renewable-electricity-generating-capacity-per-capita";
const FINANCIAL_FLOWS: &str = "Financial flows to developing countries (US $)";

pub fn dashboard() -> Dashboard {
    Dashboard {
        name: "Sustainable Energy",
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
                column: "Entity",
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
                ("Entity", ColumnType::Str),
                ("Year", ColumnType::Int),
                (ELECTRICITY, ColumnType::Float),
                (CLEAN_FUELS, ColumnType::Float),
                (RENEWABLE_CAPACITY, ColumnType::Float),
                (FINANCIAL_FLOWS, ColumnType::Float),
            ],
        )],
        join_keys: vec![],
        derived: vec![],
        clean: vec![],
    }
}

fn access_over_time(title: &str, column: &str) -> ChartDef {
    ChartDef::new(
        title,
        ChartKind::Line,
        ChartQuery::Aggregate {
            group_by: vec!["Year".to_string(), "Entity".to_string()],
            reduce: vec![ReduceSpec::new(column, Reducer::Mean, column)],
            having: vec![],
            sort_desc_by: None,
            top: None,
        },
        "Year",
        column,
    )
    .with_series("Entity")
}

fn total_by_country(title: &str, column: &str) -> ChartDef {
    ChartDef::new(
        title,
        ChartKind::Bar,
        ChartQuery::Aggregate {
            group_by: vec!["Entity".to_string()],
            reduce: vec![ReduceSpec::new(column, Reducer::Sum, column)],
            having: vec![],
            sort_desc_by: Some(column.to_string()),
            top: None,
        },
        "Entity",
        column,
    )
}

fn view(_values: &ControlValues) -> ViewConfig {
    ViewConfig {
        kpis: vec![
            MetricDef::reduce(
                "Total Countries",
                "Entity",
                Reducer::CountDistinct,
                NumberFormat::Count,
            ),
            MetricDef::reduce(
                "Avg. Access to Electricity (%)",
                ELECTRICITY,
                Reducer::Mean,
                NumberFormat::Decimal,
            ),
            MetricDef::reduce(
                "Avg. Access to Clean Fuels (%)",
                CLEAN_FUELS,
                Reducer::Mean,
                NumberFormat::Decimal,
            ),
        ],
        charts: vec![
            access_over_time("Access to Electricity Over Time", ELECTRICITY),
            access_over_time("Access to Clean Fuels Over Time", CLEAN_FUELS),
            total_by_country(
                "Renewable Electricity Generation by Country",
                RENEWABLE_CAPACITY,
            ),
            total_by_country("Financial Aid Distribution by Country", FINANCIAL_FLOWS),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::load;
    use crate::data::model::Value;
    use crate::data::pipeline;
    use crate::dashboards::{filters_from, init_controls, ControlValue};

    fn write_sample() -> PathBuf {
        let path =
            std::env::temp_dir().join(format!("tiledash-energy-{}.csv", std::process::id()));
        let mut w = csv::Writer::from_path(&path).unwrap();
        w.write_record(["Entity", "Year", ELECTRICITY, CLEAN_FUELS, RENEWABLE_CAPACITY, FINANCIAL_FLOWS])
            .unwrap();
        for (entity, year, elec) in [
            ("Kenya", "2000", "20.0"),
            ("Kenya", "2001", "25.0"),
            ("Norway", "2000", "100.0"),
        ] {
            w.write_record([entity, year, elec, "50.0", "10.0", "1000.0"])
                .unwrap();
        }
        w.flush().unwrap();
        path
    }

    #[test]
    fn per_country_series_respect_the_year_filter() {
        let path = write_sample();
        let (dataset, _) = load::load(&load_spec(&[path.clone()])).unwrap();
        std::fs::remove_file(path).ok();

        let dash = dashboard();
        let mut ctx = init_controls(&dash.controls, &dataset.base).unwrap();
        ctx.values
            .0
            .insert("years", ControlValue::Range(2000.0, 2000.0));
        let filters = filters_from(&dash.controls, &ctx.values);
        let out = pipeline::run(&dataset, &filters, &view(&ctx.values)).unwrap();

        assert_eq!(out.kpis[0].value, Value::Integer(2));
        // One (Year, Entity) group per country in 2000.
        assert_eq!(out.charts[0].table.len(), 2);
        // Both countries have one 2000 row, so the ranking keeps both.
        assert_eq!(out.charts[2].table.len(), 2);
    }
}
