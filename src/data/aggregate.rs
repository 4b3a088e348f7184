use std::collections::{BTreeMap, BTreeSet};

use super::error::Result;
use super::model::{ColumnType, Schema, Table, Value};

// ---------------------------------------------------------------------------
// Reducers
// ---------------------------------------------------------------------------

/// A function collapsing the values of one column within a group to one
/// scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Sum,
    Mean,
    /// Number of non-null values.
    Count,
    /// Number of distinct non-null values, exact set semantics.
    CountDistinct,
    Median,
}

impl Reducer {
    fn output_type(self) -> ColumnType {
        match self {
            Reducer::Sum | Reducer::Mean | Reducer::Median => ColumnType::Float,
            Reducer::Count | Reducer::CountDistinct => ColumnType::Int,
        }
    }
}

/// One reduction: which column, how, and what to call the result.
#[derive(Debug, Clone)]
pub struct ReduceSpec {
    pub column: String,
    pub reducer: Reducer,
    pub output: String,
}

impl ReduceSpec {
    pub fn new(column: &str, reducer: Reducer, output: &str) -> Self {
        ReduceSpec {
            column: column.to_string(),
            reducer,
            output: output.to_string(),
        }
    }
}

enum Acc {
    Sum(f64),
    Mean { sum: f64, n: usize },
    Count(usize),
    Distinct(BTreeSet<Value>),
    Median(Vec<f64>),
}

impl Acc {
    fn new(reducer: Reducer) -> Self {
        match reducer {
            Reducer::Sum => Acc::Sum(0.0),
            Reducer::Mean => Acc::Mean { sum: 0.0, n: 0 },
            Reducer::Count => Acc::Count(0),
            Reducer::CountDistinct => Acc::Distinct(BTreeSet::new()),
            Reducer::Median => Acc::Median(Vec::new()),
        }
    }

    fn update(&mut self, value: &Value) {
        if value.is_null() {
            return;
        }
        match self {
            Acc::Sum(total) => {
                if let Some(x) = value.as_f64() {
                    *total += x;
                }
            }
            Acc::Mean { sum, n } => {
                if let Some(x) = value.as_f64() {
                    *sum += x;
                    *n += 1;
                }
            }
            Acc::Count(n) => *n += 1,
            Acc::Distinct(set) => {
                set.insert(value.clone());
            }
            Acc::Median(values) => {
                if let Some(x) = value.as_f64() {
                    values.push(x);
                }
            }
        }
    }

    /// `None` when the reducer has nothing to report, which omits the whole
    /// group from the result.
    fn finish(self) -> Option<Value> {
        match self {
            Acc::Sum(total) => Some(Value::Float(total)),
            Acc::Mean { sum, n } => {
                if n == 0 {
                    None
                } else {
                    Some(Value::Float(sum / n as f64))
                }
            }
            Acc::Count(n) => Some(Value::Integer(n as i64)),
            Acc::Distinct(set) => Some(Value::Integer(set.len() as i64)),
            Acc::Median(mut values) => {
                if values.is_empty() {
                    None
                } else {
                    values.sort_by(f64::total_cmp);
                    Some(Value::Float(quantile(&values, 0.5)))
                }
            }
        }
    }
}

/// Linear-interpolation quantile over an already-sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

// ---------------------------------------------------------------------------
// Group-by aggregation
// ---------------------------------------------------------------------------

/// Group the table by exact value equality on `group_by` and reduce the
/// named columns. One output row per group present in the input; absent
/// groups produce no row. Rows with a null group key are dropped, and a
/// group is omitted entirely when a Mean/Median reducer saw no values.
/// Output rows follow the natural order of the group keys; any
/// presentation ordering is a separate [`top_n`] step.
pub fn aggregate(table: &Table, group_by: &[String], reduces: &[ReduceSpec]) -> Result<Table> {
    let key_indices: Vec<usize> = group_by
        .iter()
        .map(|c| table.schema().require(c))
        .collect::<Result<_>>()?;
    let value_indices: Vec<usize> = reduces
        .iter()
        .map(|r| table.schema().require(&r.column))
        .collect::<Result<_>>()?;

    let mut groups: BTreeMap<Vec<Value>, Vec<Acc>> = BTreeMap::new();
    for row in table.rows() {
        let key: Vec<Value> = key_indices.iter().map(|&i| row[i].clone()).collect();
        if key.iter().any(Value::is_null) {
            continue;
        }
        let accs = groups
            .entry(key)
            .or_insert_with(|| reduces.iter().map(|r| Acc::new(r.reducer)).collect());
        for (acc, &vi) in accs.iter_mut().zip(&value_indices) {
            acc.update(&row[vi]);
        }
    }

    let mut columns: Vec<(String, ColumnType)> = group_by
        .iter()
        .map(|c| (c.clone(), table.schema().column_type(c).unwrap()))
        .collect();
    for r in reduces {
        columns.push((r.output.clone(), r.reducer.output_type()));
    }

    let mut out = Table::new(Schema::new(columns));
    'groups: for (key, accs) in groups {
        let mut row = key;
        for acc in accs {
            match acc.finish() {
                Some(v) => row.push(v),
                None => continue 'groups,
            }
        }
        out.push_row(row);
    }
    Ok(out)
}

/// Reduce one whole column to a scalar, the ungrouped case used by KPI
/// tiles. `None` when the reducer has no inputs (mean/median of nothing).
pub fn reduce_column(table: &Table, column: &str, reducer: Reducer) -> Result<Option<Value>> {
    let idx = table.schema().require(column)?;
    let mut acc = Acc::new(reducer);
    for row in table.rows() {
        acc.update(&row[idx]);
    }
    Ok(acc.finish())
}

/// Sort descending by `value_column` and keep the first `n` rows. Ties are
/// broken by ascending natural order of the remaining columns so repeated
/// runs are deterministic.
pub fn top_n(table: &Table, value_column: &str, n: usize) -> Result<Table> {
    let vi = table.schema().require(value_column)?;
    let key_cols: Vec<usize> = (0..table.schema().len()).filter(|&i| i != vi).collect();

    let mut rows: Vec<&Vec<Value>> = table.rows().iter().collect();
    rows.sort_by(|a, b| {
        b[vi].cmp(&a[vi]).then_with(|| {
            key_cols
                .iter()
                .map(|&i| a[i].cmp(&b[i]))
                .find(|o| !o.is_eq())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    });

    let mut out = Table::new(table.schema().clone());
    for row in rows.into_iter().take(n) {
        out.push_row(row.clone());
    }
    Ok(out)
}

/// Equal-width histogram of a numeric column: (bin lower edge, count).
/// Empty bins are backfilled with zero so line rendering stays continuous.
pub fn histogram(table: &Table, column: &str, bins: usize) -> Result<Table> {
    let schema = Schema::new(vec![
        (column.to_string(), ColumnType::Float),
        ("Count".to_string(), ColumnType::Int),
    ]);
    let mut out = Table::new(schema);

    if bins == 0 {
        return Ok(out);
    }
    let (min, max) = match table.numeric_range(column)? {
        Some(range) => range,
        None => return Ok(out),
    };
    let width = if max > min {
        (max - min) / bins as f64
    } else {
        1.0
    };

    let mut counts = vec![0i64; bins];
    for v in table.column(column)? {
        if let Some(x) = v.as_f64() {
            let bin = (((x - min) / width) as usize).min(bins - 1);
            counts[bin] += 1;
        }
    }
    for (i, count) in counts.into_iter().enumerate() {
        out.push_row(vec![
            Value::Float(min + i as f64 * width),
            Value::Integer(count),
        ]);
    }
    Ok(out)
}

/// Five-number summary (min, quartiles, max) of `value` per group, feeding
/// box charts. Groups without numeric values are omitted.
pub fn five_number_summary(table: &Table, group_by: &str, value: &str) -> Result<Table> {
    let ki = table.schema().require(group_by)?;
    let vi = table.schema().require(value)?;

    let mut groups: BTreeMap<Value, Vec<f64>> = BTreeMap::new();
    for row in table.rows() {
        if row[ki].is_null() {
            continue;
        }
        if let Some(x) = row[vi].as_f64() {
            groups.entry(row[ki].clone()).or_default().push(x);
        }
    }

    let key_type = table.schema().column_type(group_by).unwrap();
    let mut columns = vec![(group_by.to_string(), key_type)];
    for name in ["Min", "Q1", "Median", "Q3", "Max"] {
        columns.push((name.to_string(), ColumnType::Float));
    }

    let mut out = Table::new(Schema::new(columns));
    for (key, mut values) in groups {
        values.sort_by(f64::total_cmp);
        out.push_row(vec![
            key,
            Value::Float(values[0]),
            Value::Float(quantile(&values, 0.25)),
            Value::Float(quantile(&values, 0.5)),
            Value::Float(quantile(&values, 0.75)),
            Value::Float(values[values.len() - 1]),
        ]);
    }
    Ok(out)
}

/// Explode a multi-valued column (e.g. `"Action|Comedy"`) and count rows per
/// tag. Output order follows the tags' natural order; sort separately.
pub fn tag_counts(table: &Table, column: &str, separator: char) -> Result<Table> {
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    for v in table.column(column)? {
        if let Value::String(s) = v {
            for tag in s.split(separator) {
                let tag = tag.trim();
                if !tag.is_empty() {
                    *counts.entry(tag.to_string()).or_default() += 1;
                }
            }
        }
    }

    let schema = Schema::new(vec![
        (column.to_string(), ColumnType::Str),
        ("Count".to_string(), ColumnType::Int),
    ]);
    let mut out = Table::new(schema);
    for (tag, count) in counts {
        out.push_row(vec![Value::String(tag), Value::Integer(count)]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_of(cols: Vec<(&str, ColumnType)>, rows: Vec<Vec<Value>>) -> Table {
        let schema = Schema::new(
            cols.into_iter()
                .map(|(n, t)| (n.to_string(), t))
                .collect(),
        );
        let mut t = Table::new(schema);
        for row in rows {
            t.push_row(row);
        }
        t
    }

    fn sales() -> Table {
        table_of(
            vec![
                ("Country", ColumnType::Str),
                ("TotalPrice", ColumnType::Float),
            ],
            vec![
                vec![Value::String("UK".into()), Value::Float(10.0)],
                vec![Value::String("UK".into()), Value::Float(20.0)],
                vec![Value::String("France".into()), Value::Float(5.0)],
                vec![Value::Null, Value::Float(99.0)],
            ],
        )
    }

    #[test]
    fn grouped_sums_preserve_the_total() {
        let t = sales();
        let agg = aggregate(
            &t,
            &["Country".to_string()],
            &[ReduceSpec::new("TotalPrice", Reducer::Sum, "Revenue")],
        )
        .unwrap();

        // Null group keys are dropped, so compare against the non-null rows.
        assert_eq!(agg.len(), 2);
        let grouped_total: f64 = agg
            .column("Revenue")
            .unwrap()
            .filter_map(Value::as_f64)
            .sum();
        assert!((grouped_total - 35.0).abs() < 1e-9);
    }

    #[test]
    fn mean_over_all_null_group_is_omitted() {
        let t = table_of(
            vec![("K", ColumnType::Str), ("V", ColumnType::Float)],
            vec![
                vec![Value::String("a".into()), Value::Float(2.0)],
                vec![Value::String("b".into()), Value::Null],
            ],
        );
        let agg = aggregate(
            &t,
            &["K".to_string()],
            &[ReduceSpec::new("V", Reducer::Mean, "MeanV")],
        )
        .unwrap();
        assert_eq!(agg.len(), 1);
        assert_eq!(agg.rows()[0][0], Value::String("a".into()));
        assert_eq!(agg.rows()[0][1], Value::Float(2.0));
    }

    #[test]
    fn count_and_count_distinct() {
        let t = table_of(
            vec![("K", ColumnType::Str), ("Invoice", ColumnType::Str)],
            vec![
                vec![Value::String("a".into()), Value::String("A1".into())],
                vec![Value::String("a".into()), Value::String("A1".into())],
                vec![Value::String("a".into()), Value::String("A2".into())],
                vec![Value::String("a".into()), Value::Null],
            ],
        );
        let agg = aggregate(
            &t,
            &["K".to_string()],
            &[
                ReduceSpec::new("Invoice", Reducer::Count, "N"),
                ReduceSpec::new("Invoice", Reducer::CountDistinct, "Distinct"),
            ],
        )
        .unwrap();
        assert_eq!(agg.rows()[0][1], Value::Integer(3));
        assert_eq!(agg.rows()[0][2], Value::Integer(2));
    }

    #[test]
    fn median_interpolates() {
        let t = table_of(
            vec![("K", ColumnType::Str), ("V", ColumnType::Float)],
            vec![
                vec![Value::String("a".into()), Value::Float(1.0)],
                vec![Value::String("a".into()), Value::Float(2.0)],
                vec![Value::String("a".into()), Value::Float(10.0)],
                vec![Value::String("a".into()), Value::Float(20.0)],
            ],
        );
        let agg = aggregate(
            &t,
            &["K".to_string()],
            &[ReduceSpec::new("V", Reducer::Median, "MedV")],
        )
        .unwrap();
        assert_eq!(agg.rows()[0][1], Value::Float(6.0));
    }

    #[test]
    fn top_n_breaks_ties_by_ascending_key() {
        let t = table_of(
            vec![("Key", ColumnType::Str), ("V", ColumnType::Float)],
            vec![
                vec![Value::String("B".into()), Value::Float(7.0)],
                vec![Value::String("A".into()), Value::Float(7.0)],
                vec![Value::String("C".into()), Value::Float(3.0)],
            ],
        );
        let top = top_n(&t, "V", 2).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top.rows()[0][0], Value::String("A".into()));
        assert_eq!(top.rows()[1][0], Value::String("B".into()));
    }

    #[test]
    fn histogram_backfills_empty_bins() {
        let t = table_of(
            vec![("price", ColumnType::Float)],
            vec![
                vec![Value::Float(0.0)],
                vec![Value::Float(1.0)],
                vec![Value::Float(10.0)],
            ],
        );
        let h = histogram(&t, "price", 5).unwrap();
        assert_eq!(h.len(), 5);
        let counts: Vec<i64> = h
            .column("Count")
            .unwrap()
            .map(|v| v.as_f64().unwrap() as i64)
            .collect();
        assert_eq!(counts.iter().sum::<i64>(), 3);
        assert_eq!(counts[0], 2); // 0.0 and 1.0 share the first bin
        assert_eq!(counts[4], 1); // max value lands in the last bin
    }

    #[test]
    fn five_number_summary_per_group() {
        let t = table_of(
            vec![("City", ColumnType::Str), ("Temp", ColumnType::Float)],
            vec![
                vec![Value::String("Oslo".into()), Value::Float(1.0)],
                vec![Value::String("Oslo".into()), Value::Float(3.0)],
                vec![Value::String("Oslo".into()), Value::Float(5.0)],
                vec![Value::String("Lima".into()), Value::Null],
            ],
        );
        let s = five_number_summary(&t, "City", "Temp").unwrap();
        // Lima has no numeric values and is omitted.
        assert_eq!(s.len(), 1);
        assert_eq!(s.rows()[0][0], Value::String("Oslo".into()));
        assert_eq!(s.rows()[0][1], Value::Float(1.0)); // min
        assert_eq!(s.rows()[0][3], Value::Float(3.0)); // median
        assert_eq!(s.rows()[0][5], Value::Float(5.0)); // max
    }

    #[test]
    fn tag_counts_explode_multivalued_cells() {
        let t = table_of(
            vec![("Genres", ColumnType::Str)],
            vec![
                vec![Value::String("Action|Comedy".into())],
                vec![Value::String("Comedy".into())],
                vec![Value::Null],
            ],
        );
        let counts = tag_counts(&t, "Genres", '|').unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts.rows()[0][0], Value::String("Action".into()));
        assert_eq!(counts.rows()[0][1], Value::Integer(1));
        assert_eq!(counts.rows()[1][1], Value::Integer(2));
    }

    #[test]
    fn empty_input_degrades_to_empty_output() {
        let t = table_of(
            vec![("K", ColumnType::Str), ("V", ColumnType::Float)],
            vec![],
        );
        let agg = aggregate(
            &t,
            &["K".to_string()],
            &[ReduceSpec::new("V", Reducer::Sum, "S")],
        )
        .unwrap();
        assert!(agg.is_empty());
        assert!(histogram(&t, "V", 10).unwrap().is_empty());
        assert!(five_number_summary(&t, "K", "V").unwrap().is_empty());
    }
}
