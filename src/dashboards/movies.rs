//! Movie ratings dashboard over the three `::`-separated MovieLens files,
//! inner-joined movies → ratings → users.

use std::path::PathBuf;

use crate::data::aggregate::{ReduceSpec, Reducer};
use crate::data::filter::Filter;
use crate::data::load::{CleanRule, Derived, LoadSpec, SourceFormat, SourceSpec};
use crate::data::metrics::{MetricDef, NumberFormat, Scope};
use crate::data::model::{ColumnType, Value};
use crate::data::pipeline::{ChartDef, ChartKind, ChartQuery, ViewConfig};

use super::{Control, ControlValues, Dashboard, SourcePicker};

pub fn dashboard() -> Dashboard {
    Dashboard {
        name: "Movies",
        picker: SourcePicker::Folder {
            files: &["movies.dat", "ratings.dat", "users.dat"],
        },
        controls: vec![
            Control::Range {
                id: "rating",
                label: "Rating",
                column: "Rating",
                integer: true,
            },
            Control::TagSelect {
                id: "genres",
                label: "Genres",
                column: "Genres",
                separator: '|',
            },
        ],
        load: load_spec,
        view,
    }
}

// Source positions in the load spec, for whole-catalog scopes.
const MOVIES: usize = 0;
const RATINGS: usize = 1;
const USERS: usize = 2;

fn separated() -> SourceFormat {
    SourceFormat::Separated {
        separator: "::".to_string(),
    }
}

fn load_spec(paths: &[PathBuf]) -> LoadSpec {
    LoadSpec {
        sources: vec![
            SourceSpec::new(
                paths[0].clone(),
                separated(),
                vec![
                    ("MovieID", ColumnType::Int),
                    ("Title", ColumnType::Str),
                    ("Genres", ColumnType::Str),
                ],
            ),
            SourceSpec::new(
                paths[1].clone(),
                separated(),
                vec![
                    ("UserID", ColumnType::Int),
                    ("MovieID", ColumnType::Int),
                    ("Rating", ColumnType::Int),
                ],
            ),
            SourceSpec::new(
                paths[2].clone(),
                separated(),
                vec![
                    ("UserID", ColumnType::Int),
                    ("Gender", ColumnType::Str),
                    ("Age", ColumnType::Int),
                ],
            ),
        ],
        join_keys: vec!["MovieID".to_string(), "UserID".to_string()],
        derived: vec![Derived::map("AgeGroup", ColumnType::Str, |row| {
            match row.f64("Age") {
                Some(age) => Value::String(age_group(age as i64).to_string()),
                None => Value::Null,
            }
        })],
        clean: vec![CleanRule::drop_null(&["Rating"])],
    }
}

/// MovieLens age codes are already bucket lower bounds.
fn age_group(age: i64) -> &'static str {
    match age {
        i64::MIN..=17 => "Under 18",
        18..=24 => "18-24",
        25..=34 => "25-34",
        35..=44 => "35-44",
        45..=49 => "45-49",
        50..=55 => "50-55",
        _ => "56+",
    }
}

fn view(_values: &ControlValues) -> ViewConfig {
    ViewConfig {
        // The tiles describe the whole catalog, read from the raw files:
        // the inner join drops unrated movies and users without ratings,
        // and those still count here.
        kpis: vec![
            MetricDef::reduce(
                "Total Movies",
                "MovieID",
                Reducer::CountDistinct,
                NumberFormat::Count,
            )
            .with_scope(Scope::Source(MOVIES)),
            MetricDef::reduce(
                "Total Users",
                "UserID",
                Reducer::CountDistinct,
                NumberFormat::Count,
            )
            .with_scope(Scope::Source(USERS)),
            MetricDef::reduce("Total Ratings", "Rating", Reducer::Count, NumberFormat::Count)
                .with_scope(Scope::Source(RATINGS)),
            MetricDef::reduce("Average Rating", "Rating", Reducer::Mean, NumberFormat::Decimal)
                .with_scope(Scope::Source(RATINGS)),
        ],
        charts: vec![
            // Over the movies file, so each movie counts its genres once
            // no matter how many ratings it has.
            ChartDef::new(
                "Genre Distribution",
                ChartKind::Bar,
                ChartQuery::TagCounts {
                    column: "Genres".to_string(),
                    separator: '|',
                },
                "Genres",
                "Count",
            )
            .with_scope(Scope::Source(MOVIES)),
            ChartDef::new(
                "Top Rated Movies",
                ChartKind::Bar,
                ChartQuery::Aggregate {
                    group_by: vec!["Title".to_string()],
                    reduce: vec![
                        ReduceSpec::new("Rating", Reducer::Mean, "Rating"),
                        ReduceSpec::new("Rating", Reducer::Count, "RatingCount"),
                    ],
                    // Averages over a handful of ratings are noise.
                    having: vec![Filter::Range {
                        column: "RatingCount".to_string(),
                        min: 11.0,
                        max: f64::INFINITY,
                    }],
                    sort_desc_by: Some("Rating".to_string()),
                    top: Some(10),
                },
                "Title",
                "Rating",
            ),
            ChartDef::new(
                "Average Rating by Age Group",
                ChartKind::Bar,
                ChartQuery::Aggregate {
                    group_by: vec!["AgeGroup".to_string()],
                    reduce: vec![ReduceSpec::new("Rating", Reducer::Mean, "Rating")],
                    having: vec![],
                    sort_desc_by: None,
                    top: None,
                },
                "AgeGroup",
                "Rating",
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::load;
    use crate::data::pipeline;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path =
            std::env::temp_dir().join(format!("tiledash-movies-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn age_groups_match_the_movielens_buckets() {
        assert_eq!(age_group(1), "Under 18");
        assert_eq!(age_group(25), "25-34");
        assert_eq!(age_group(56), "56+");
    }

    #[test]
    fn three_way_join_drops_unmatched_ratings() {
        let movies = write_temp("movies.dat", "1::Toy Story (1995)::Animation|Comedy\n");
        let ratings = write_temp(
            "ratings.dat",
            "10::1::5::978300760\n10::999::4::978300761\n11::1::3::978300762\n",
        );
        let users = write_temp("users.dat", "10::F::25::15::55117\n");

        let spec = load_spec(&[movies.clone(), ratings.clone(), users.clone()]);
        let (dataset, report) = load::load(&spec).unwrap();
        for p in [movies, ratings, users] {
            std::fs::remove_file(p).ok();
        }

        // Only user 10's rating of movie 1 survives both joins.
        let table = &dataset.base;
        assert_eq!(table.len(), 1);
        assert_eq!(report.joins[0].dropped_right, 1); // rating of unknown movie
        assert_eq!(report.joins[1].dropped_left, 1); // rating by unknown user
        assert_eq!(
            table.rows()[0][table.schema().index_of("AgeGroup").unwrap()],
            Value::String("25-34".into())
        );
        // The raw source tables are kept for the whole-catalog scopes.
        assert_eq!(dataset.sources.len(), 3);
        assert_eq!(dataset.sources[RATINGS].len(), 3);
    }

    #[test]
    fn catalog_tiles_and_genre_counts_read_the_raw_files() {
        // Movie 2 is unrated and user 12 never rated anything; the join
        // drops both rows, but the catalog tiles must still count them.
        let movies = write_temp(
            "catalog-movies.dat",
            "1::Toy Story (1995)::Animation|Comedy\n2::Jumanji (1995)::Comedy\n",
        );
        let ratings = write_temp("catalog-ratings.dat", "10::1::5\n11::1::3\n");
        let users = write_temp(
            "catalog-users.dat",
            "10::F::25\n11::M::35\n12::M::50\n",
        );

        let spec = load_spec(&[movies.clone(), ratings.clone(), users.clone()]);
        let (dataset, _) = load::load(&spec).unwrap();
        for p in [movies, ratings, users] {
            std::fs::remove_file(p).ok();
        }

        let out = pipeline::run(&dataset, &[], &view(&ControlValues::default())).unwrap();
        assert_eq!(out.kpis[0].value, Value::Integer(2)); // movies, incl. unrated
        assert_eq!(out.kpis[1].value, Value::Integer(3)); // users, incl. user 12
        assert_eq!(out.kpis[2].value, Value::Integer(2)); // ratings
        assert_eq!(out.kpis[3].value, Value::Float(4.0));

        // Genres count once per movie, not once per rating: Toy Story's two
        // ratings must not double its genres.
        let genres = &out.charts[0].table;
        assert_eq!(genres.rows()[0][0], Value::String("Comedy".into()));
        assert_eq!(genres.rows()[0][1], Value::Integer(2));
        assert_eq!(genres.rows()[1][0], Value::String("Animation".into()));
        assert_eq!(genres.rows()[1][1], Value::Integer(1));
    }
}
