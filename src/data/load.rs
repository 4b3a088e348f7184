use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use arrow::array::{
    Array, Date32Array, Float32Array, Float64Array, Int32Array, Int64Array, LargeStringArray,
    StringArray,
};
use arrow::datatypes::DataType;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::error::{DataError, Result};
use super::model::{ColumnType, Row, RowRef, Schema, Table, Value};

// ---------------------------------------------------------------------------
// Load specification
// ---------------------------------------------------------------------------

/// How a source file is parsed into rows.
#[derive(Debug, Clone)]
pub enum SourceFormat {
    /// Delimited text with a header row (csv crate).
    Csv { delimiter: u8 },
    /// Headerless text split on a literal (possibly multi-byte) separator;
    /// fields arrive in declared schema order. Used for the `::` files.
    Separated { separator: String },
    /// JSON array of records.
    Json,
    /// Flat-column Parquet.
    Parquet,
}

impl SourceFormat {
    /// Dispatch by file extension, defaulting CSV to a comma delimiter.
    pub fn from_path(path: &Path) -> Result<SourceFormat> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Ok(SourceFormat::Csv { delimiter: b',' }),
            "json" => Ok(SourceFormat::Json),
            "parquet" | "pq" => Ok(SourceFormat::Parquet),
            other => Err(DataError::UnsupportedExtension(other.to_string())),
        }
    }
}

/// One source file: where it is, how to split it, and which columns to
/// ingest with which declared types. Columns not listed are ignored.
pub struct SourceSpec {
    pub path: PathBuf,
    pub format: SourceFormat,
    pub schema: Vec<(String, ColumnType)>,
}

impl SourceSpec {
    pub fn new(path: PathBuf, format: SourceFormat, schema: Vec<(&str, ColumnType)>) -> Self {
        SourceSpec {
            path,
            format,
            schema: schema
                .into_iter()
                .map(|(n, t)| (n.to_string(), t))
                .collect(),
        }
    }
}

/// A column computed at load time, in declared order; each one may read any
/// column already present, including earlier derived columns. Computed once,
/// never re-evaluated on filter changes.
pub enum Derived {
    /// Pure per-row function.
    Map {
        name: String,
        ty: ColumnType,
        f: Box<dyn Fn(RowRef) -> Value>,
    },
    /// `value − mean(source)`, the anomaly column. Needs the whole column,
    /// so it cannot be a per-row map.
    DeviationFromMean { name: String, source: String },
}

impl Derived {
    pub fn map(
        name: &str,
        ty: ColumnType,
        f: impl Fn(RowRef) -> Value + 'static,
    ) -> Self {
        Derived::Map {
            name: name.to_string(),
            ty,
            f: Box::new(f),
        }
    }

    /// `name = a × b` over two numeric columns (null if either is null).
    pub fn product(name: &str, a: &'static str, b: &'static str) -> Self {
        Derived::map(name, ColumnType::Float, move |row| {
            match (row.f64(a), row.f64(b)) {
                (Some(x), Some(y)) => Value::Float(x * y),
                _ => Value::Null,
            }
        })
    }

    /// Calendar year of a date column, as an integer.
    pub fn year(name: &str, source: &'static str) -> Self {
        Derived::map(name, ColumnType::Int, move |row| match row.date(source) {
            Some(d) => Value::Integer(d.year() as i64),
            None => Value::Null,
        })
    }

    /// Month number (1–12) of a date column.
    pub fn month_number(name: &str, source: &'static str) -> Self {
        Derived::map(name, ColumnType::Int, move |row| match row.date(source) {
            Some(d) => Value::Integer(d.month() as i64),
            None => Value::Null,
        })
    }

    /// Date truncated to the first of its month. Pre-normalising the time
    /// bucket here keeps the aggregator free of any time handling.
    pub fn month_start(name: &str, source: &'static str) -> Self {
        Derived::map(name, ColumnType::Date, move |row| match row.date(source) {
            Some(d) => Value::Date(NaiveDate::from_ymd_opt(d.year(), d.month(), 1).unwrap()),
            None => Value::Null,
        })
    }

    pub fn deviation_from_mean(name: &str, source: &str) -> Self {
        Derived::DeviationFromMean {
            name: name.to_string(),
            source: source.to_string(),
        }
    }

    fn name(&self) -> &str {
        match self {
            Derived::Map { name, .. } => name,
            Derived::DeviationFromMean { name, .. } => name,
        }
    }
}

/// Post-load cleaning policy, configured per dataset (never hard-coded in
/// the loader).
pub enum CleanRule {
    /// Drop rows where any of the named columns is null.
    DropNull { columns: Vec<String> },
    /// Keep only rows the predicate accepts.
    Retain {
        name: String,
        f: Box<dyn Fn(RowRef) -> bool>,
    },
}

impl CleanRule {
    pub fn drop_null(columns: &[&str]) -> Self {
        CleanRule::DropNull {
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn retain(name: &str, f: impl Fn(RowRef) -> bool + 'static) -> Self {
        CleanRule::Retain {
            name: name.to_string(),
            f: Box::new(f),
        }
    }
}

/// Full recipe for one dataset: sources, inner joins, derived columns and
/// cleaning rules, applied in that order.
pub struct LoadSpec {
    pub sources: Vec<SourceSpec>,
    /// `join_keys[i]` joins `sources[i + 1]` onto the accumulated table.
    pub join_keys: Vec<String>,
    pub derived: Vec<Derived>,
    pub clean: Vec<CleanRule>,
}

// ---------------------------------------------------------------------------
// Load report – dropped-row diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize)]
pub struct SourceReport {
    pub file: String,
    pub rows_read: usize,
    pub rows_skipped: usize,
    /// Per-column count of cells that failed coercion to the declared type
    /// (stored as null downstream).
    pub coercion_failures: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize)]
pub struct JoinReport {
    pub key: String,
    /// Left rows with no match on the right; dropped by inner-join
    /// semantics. Whether that is data cleaning or a latent bug in the
    /// source dashboards is an open question, so it is surfaced here.
    pub dropped_left: usize,
    pub dropped_right: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct LoadReport {
    pub sources: Vec<SourceReport>,
    pub joins: Vec<JoinReport>,
    pub rows_cleaned: usize,
    pub rows: usize,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// A loaded dataset: the base table plus, when sources were joined, the
/// pre-join source tables in spec order. Whole-catalog statistics read the
/// sources so rows the inner join dropped (an unrated movie, a user with no
/// ratings) still count.
pub struct Dataset {
    pub base: Table,
    pub sources: Vec<Table>,
}

impl Dataset {
    /// A dataset without retained sources (single-source loads, tests).
    pub fn new(base: Table) -> Self {
        Dataset {
            base,
            sources: Vec::new(),
        }
    }
}

/// Load a dataset: read every source, inner-join them in order, apply
/// derived columns, then cleaning rules. The returned base table is
/// immutable for all downstream filtering and aggregation.
pub fn load(spec: &LoadSpec) -> Result<(Dataset, LoadReport)> {
    let mut report = LoadReport::default();

    let mut tables = Vec::with_capacity(spec.sources.len());
    for source in &spec.sources {
        let (table, source_report) = read_source(source)?;
        report.sources.push(source_report);
        tables.push(table);
    }

    // Joins drop unmatched rows, so only joined datasets need the raw
    // source tables kept around.
    let sources = if spec.join_keys.is_empty() {
        Vec::new()
    } else {
        tables.clone()
    };

    let mut iter = tables.into_iter();
    let mut table = iter.next().unwrap_or_default();
    for (right, key) in iter.zip(&spec.join_keys) {
        let (joined, join_report) = inner_join(&table, &right, key)?;
        if join_report.dropped_left > 0 || join_report.dropped_right > 0 {
            log::warn!(
                "inner join on '{}' dropped {} left / {} right unmatched rows",
                key,
                join_report.dropped_left,
                join_report.dropped_right
            );
        }
        report.joins.push(join_report);
        table = joined;
    }

    apply_derived(&mut table, &spec.derived)?;
    report.rows_cleaned = apply_clean(&mut table, &spec.clean);
    report.rows = table.len();

    log::info!(
        "load report: {}",
        serde_json::to_string(&report).unwrap_or_default()
    );
    Ok((Dataset { base: table, sources }, report))
}

// ---------------------------------------------------------------------------
// Source readers
// ---------------------------------------------------------------------------

fn read_source(source: &SourceSpec) -> Result<(Table, SourceReport)> {
    let mut report = SourceReport {
        file: source.path.display().to_string(),
        ..SourceReport::default()
    };

    let table = match &source.format {
        SourceFormat::Csv { delimiter } => read_csv(source, *delimiter, &mut report)?,
        SourceFormat::Separated { separator } => read_separated(source, separator, &mut report)?,
        SourceFormat::Json => read_json(source, &mut report)?,
        SourceFormat::Parquet => read_parquet(source, &mut report)?,
    };

    // A declared numeric/date column that failed coercion in every row means
    // the schema is wrong, not the rows.
    for (name, ty) in &source.schema {
        if *ty == ColumnType::Str {
            continue;
        }
        let failures = report.coercion_failures.get(name).copied().unwrap_or(0);
        if report.rows_read > 0 && failures == report.rows_read {
            return Err(DataError::Schema {
                column: name.clone(),
                ty: *ty,
                rows: report.rows_read,
            });
        }
    }

    log::debug!(
        "{}: {} rows read, {} skipped",
        report.file,
        report.rows_read,
        report.rows_skipped
    );
    Ok((table, report))
}

fn read_csv(source: &SourceSpec, delimiter: u8, report: &mut SourceReport) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(&source.path)
        .map_err(|e| DataError::Csv(source.path.clone(), e))?;

    // Headers are decoded lossily: the transaction export is latin-1.
    let headers: Vec<String> = reader
        .byte_headers()
        .map_err(|e| DataError::Csv(source.path.clone(), e))?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();

    let mut positions = Vec::with_capacity(source.schema.len());
    for (name, _) in &source.schema {
        let pos = headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DataError::MissingColumn(name.clone()))?;
        positions.push(pos);
    }

    let mut table = Table::new(Schema::new(source.schema.clone()));
    for record in reader.byte_records() {
        let record = match record {
            Ok(r) => r,
            Err(_) => {
                report.rows_skipped += 1;
                continue;
            }
        };
        if positions.iter().any(|&p| p >= record.len()) {
            report.rows_skipped += 1;
            continue;
        }
        report.rows_read += 1;
        let row = source
            .schema
            .iter()
            .zip(&positions)
            .map(|((name, ty), &pos)| {
                let raw = String::from_utf8_lossy(&record[pos]);
                coerce_str(raw.trim(), *ty)
                    .unwrap_or_else(|| fail(report, name))
            })
            .collect();
        table.push_row(row);
    }
    Ok(table)
}

fn read_separated(
    source: &SourceSpec,
    separator: &str,
    report: &mut SourceReport,
) -> Result<Table> {
    let bytes =
        std::fs::read(&source.path).map_err(|e| DataError::Io(source.path.clone(), e))?;
    let text = String::from_utf8_lossy(&bytes);

    let mut table = Table::new(Schema::new(source.schema.clone()));
    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(separator).collect();
        if fields.len() < source.schema.len() {
            report.rows_skipped += 1;
            continue;
        }
        report.rows_read += 1;
        let row = source
            .schema
            .iter()
            .zip(&fields)
            .map(|((name, ty), raw)| {
                coerce_str(raw.trim(), *ty).unwrap_or_else(|| fail(report, name))
            })
            .collect();
        table.push_row(row);
    }
    Ok(table)
}

fn read_json(source: &SourceSpec, report: &mut SourceReport) -> Result<Table> {
    let text = std::fs::read_to_string(&source.path)
        .map_err(|e| DataError::Io(source.path.clone(), e))?;
    let root: JsonValue =
        serde_json::from_str(&text).map_err(|e| DataError::Json(source.path.clone(), e))?;
    let records = match root.as_array() {
        Some(r) => r,
        None => return Err(DataError::MissingColumn("<records array>".into())),
    };

    let mut table = Table::new(Schema::new(source.schema.clone()));
    for record in records {
        let obj = match record.as_object() {
            Some(o) => o,
            None => {
                report.rows_skipped += 1;
                continue;
            }
        };
        report.rows_read += 1;
        let row = source
            .schema
            .iter()
            .map(|(name, ty)| match obj.get(name) {
                None | Some(JsonValue::Null) => Value::Null,
                Some(v) => coerce_json(v, *ty).unwrap_or_else(|| fail(report, name)),
            })
            .collect();
        table.push_row(row);
    }
    Ok(table)
}

fn read_parquet(source: &SourceSpec, report: &mut SourceReport) -> Result<Table> {
    let file =
        std::fs::File::open(&source.path).map_err(|e| DataError::Io(source.path.clone(), e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| DataError::Parquet(source.path.clone(), e))?;
    let reader = builder
        .build()
        .map_err(|e| DataError::Parquet(source.path.clone(), e))?;

    let mut table = Table::new(Schema::new(source.schema.clone()));
    for batch in reader {
        let batch = batch.map_err(|e| DataError::Arrow(source.path.clone(), e))?;
        let schema = batch.schema();

        let mut columns = Vec::with_capacity(source.schema.len());
        for (name, _) in &source.schema {
            let idx = schema
                .index_of(name)
                .map_err(|_| DataError::MissingColumn(name.clone()))?;
            columns.push(batch.column(idx).clone());
        }

        for row in 0..batch.num_rows() {
            report.rows_read += 1;
            let values = source
                .schema
                .iter()
                .zip(&columns)
                .map(|((name, ty), col)| {
                    let raw = arrow_cell(col.as_ref(), row);
                    coerce_value(raw, *ty).unwrap_or_else(|| fail(report, name))
                })
                .collect();
            table.push_row(values);
        }
    }
    Ok(table)
}

/// Extract one scalar from an Arrow column. Unsupported types degrade to
/// their debug rendering as a string, like unknown metadata cells do.
fn arrow_cell(col: &dyn Array, row: usize) -> Value {
    if col.is_null(row) {
        return Value::Null;
    }
    match col.data_type() {
        DataType::Utf8 => {
            let arr = col.as_any().downcast_ref::<StringArray>().unwrap();
            Value::String(arr.value(row).to_string())
        }
        DataType::LargeUtf8 => {
            let arr = col.as_any().downcast_ref::<LargeStringArray>().unwrap();
            Value::String(arr.value(row).to_string())
        }
        DataType::Int32 => {
            let arr = col.as_any().downcast_ref::<Int32Array>().unwrap();
            Value::Integer(arr.value(row) as i64)
        }
        DataType::Int64 => {
            let arr = col.as_any().downcast_ref::<Int64Array>().unwrap();
            Value::Integer(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col.as_any().downcast_ref::<Float32Array>().unwrap();
            Value::Float(arr.value(row) as f64)
        }
        DataType::Float64 => {
            let arr = col.as_any().downcast_ref::<Float64Array>().unwrap();
            Value::Float(arr.value(row))
        }
        DataType::Date32 => {
            let arr = col.as_any().downcast_ref::<Date32Array>().unwrap();
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
            Value::Date(epoch + chrono::Duration::days(arr.value(row) as i64))
        }
        other => Value::String(format!("{other:?}")),
    }
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// Record a coercion failure for a column and produce the null placeholder.
fn fail(report: &mut SourceReport, column: &str) -> Value {
    *report
        .coercion_failures
        .entry(column.to_string())
        .or_default() += 1;
    Value::Null
}

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

fn parse_date(raw: &str) -> Option<NaiveDate> {
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }
    None
}

/// Coerce a raw text cell to the declared type. Empty cells are null (not a
/// failure); `None` means the cell is malformed.
fn coerce_str(raw: &str, ty: ColumnType) -> Option<Value> {
    if raw.is_empty() {
        return Some(Value::Null);
    }
    match ty {
        ColumnType::Str => Some(Value::String(raw.to_string())),
        ColumnType::Int => raw.parse::<i64>().ok().map(Value::Integer),
        ColumnType::Float => raw.parse::<f64>().ok().map(Value::Float),
        ColumnType::Date => parse_date(raw).map(Value::Date),
    }
}

fn coerce_json(v: &JsonValue, ty: ColumnType) -> Option<Value> {
    match (ty, v) {
        (ColumnType::Str, JsonValue::String(s)) => Some(Value::String(s.clone())),
        (ColumnType::Str, JsonValue::Number(n)) => Some(Value::String(n.to_string())),
        (ColumnType::Int, JsonValue::Number(n)) => n.as_i64().map(Value::Integer),
        (ColumnType::Float, JsonValue::Number(n)) => n.as_f64().map(Value::Float),
        (_, JsonValue::String(s)) => coerce_str(s, ty),
        _ => None,
    }
}

/// Re-coerce an already-typed value (from Parquet) to the declared type.
fn coerce_value(v: Value, ty: ColumnType) -> Option<Value> {
    match (ty, v) {
        (_, Value::Null) => Some(Value::Null),
        (ColumnType::Str, v) => Some(Value::String(v.to_string())),
        (ColumnType::Int, Value::Integer(i)) => Some(Value::Integer(i)),
        (ColumnType::Float, Value::Integer(i)) => Some(Value::Float(i as f64)),
        (ColumnType::Float, Value::Float(f)) => Some(Value::Float(f)),
        (ColumnType::Date, Value::Date(d)) => Some(Value::Date(d)),
        (_, Value::String(s)) => coerce_str(&s, ty),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Join, derived columns, cleaning
// ---------------------------------------------------------------------------

/// Inner join on a shared key column: output has the left columns followed
/// by the right columns minus the key. Unmatched rows on either side are
/// dropped and counted.
fn inner_join(left: &Table, right: &Table, key: &str) -> Result<(Table, JoinReport)> {
    let lkey = left
        .schema()
        .index_of(key)
        .ok_or_else(|| DataError::JoinKey(key.to_string()))?;
    let rkey = right
        .schema()
        .index_of(key)
        .ok_or_else(|| DataError::JoinKey(key.to_string()))?;

    let mut by_key: HashMap<&Value, Vec<usize>> = HashMap::new();
    for (i, row) in right.rows().iter().enumerate() {
        if !row[rkey].is_null() {
            by_key.entry(&row[rkey]).or_default().push(i);
        }
    }

    let mut schema = left.schema().clone();
    let right_cols: Vec<usize> = (0..right.schema().len()).filter(|&i| i != rkey).collect();
    for &i in &right_cols {
        let (name, ty) = &right.schema().columns()[i];
        schema.push(name.clone(), *ty);
    }

    let mut out = Table::new(schema);
    let mut matched_right = vec![false; right.len()];
    let mut dropped_left = 0;
    for lrow in left.rows() {
        match by_key.get(&lrow[lkey]) {
            Some(matches) => {
                for &ri in matches {
                    matched_right[ri] = true;
                    let rrow = &right.rows()[ri];
                    let mut row = lrow.clone();
                    row.extend(right_cols.iter().map(|&c| rrow[c].clone()));
                    out.push_row(row);
                }
            }
            None => dropped_left += 1,
        }
    }

    let report = JoinReport {
        key: key.to_string(),
        dropped_left,
        dropped_right: matched_right.iter().filter(|m| !**m).count(),
    };
    Ok((out, report))
}

fn apply_derived(table: &mut Table, derived: &[Derived]) -> Result<()> {
    for d in derived {
        let values: Vec<Value> = match d {
            Derived::Map { f, .. } => table
                .rows()
                .iter()
                .map(|row| f(RowRef::new(table.schema(), row)))
                .collect(),
            Derived::DeviationFromMean { source, .. } => {
                let (sum, n) = table.column(source)?.filter_map(Value::as_f64).fold(
                    (0.0, 0usize),
                    |(s, n), x| (s + x, n + 1),
                );
                let mean = if n > 0 { sum / n as f64 } else { 0.0 };
                table
                    .column(source)?
                    .map(|v| match v.as_f64() {
                        Some(x) => Value::Float(x - mean),
                        None => Value::Null,
                    })
                    .collect()
            }
        };
        let ty = match d {
            Derived::Map { ty, .. } => *ty,
            Derived::DeviationFromMean { .. } => ColumnType::Float,
        };
        table.push_column(d.name().to_string(), ty, values);
    }
    Ok(())
}

/// Apply cleaning rules in order; returns the number of rows removed.
fn apply_clean(table: &mut Table, rules: &[CleanRule]) -> usize {
    let before = table.len();
    for rule in rules {
        let schema = table.schema().clone();
        let rows: Vec<Row> = table
            .rows()
            .iter()
            .filter(|row| match rule {
                CleanRule::DropNull { columns } => columns
                    .iter()
                    .all(|c| !RowRef::new(&schema, row).get(c).is_null()),
                CleanRule::Retain { f, .. } => f(RowRef::new(&schema, row)),
            })
            .cloned()
            .collect();
        let mut next = Table::new(schema);
        for row in rows {
            next.push_row(row);
        }
        *table = next;
    }
    before - table.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("tiledash-test-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn str_val(s: &str) -> Value {
        Value::String(s.to_string())
    }

    #[test]
    fn csv_coercion_and_skip_counts() {
        let path = write_temp(
            "basic.csv",
            "Name,Price,When\nwidget,5.5,2011-01-03\ngadget,oops,2011-01-04\n,,\n",
        );
        let spec = SourceSpec::new(
            path.clone(),
            SourceFormat::Csv { delimiter: b',' },
            vec![
                ("Name", ColumnType::Str),
                ("Price", ColumnType::Float),
                ("When", ColumnType::Date),
            ],
        );
        let (table, report) = read_source(&spec).unwrap();
        std::fs::remove_file(path).ok();

        assert_eq!(table.len(), 3);
        assert_eq!(report.rows_read, 3);
        assert_eq!(report.coercion_failures.get("Price"), Some(&1));
        // Malformed price becomes null, row survives.
        assert!(table.rows()[1][1].is_null());
        // Fully empty cells are null without counting as failures.
        assert!(table.rows()[2][0].is_null());
        assert_eq!(
            table.rows()[0][2],
            Value::Date(NaiveDate::from_ymd_opt(2011, 1, 3).unwrap())
        );
    }

    #[test]
    fn fully_non_coercible_column_is_schema_error() {
        let path = write_temp("bad.csv", "A,B\nx,foo\ny,bar\n");
        let spec = SourceSpec::new(
            path.clone(),
            SourceFormat::Csv { delimiter: b',' },
            vec![("A", ColumnType::Str), ("B", ColumnType::Float)],
        );
        let err = read_source(&spec).unwrap_err();
        std::fs::remove_file(path).ok();
        assert!(matches!(err, DataError::Schema { .. }));
    }

    #[test]
    fn missing_declared_column_fails() {
        let path = write_temp("missing.csv", "A\nx\n");
        let spec = SourceSpec::new(
            path.clone(),
            SourceFormat::Csv { delimiter: b',' },
            vec![("B", ColumnType::Str)],
        );
        let err = read_source(&spec).unwrap_err();
        std::fs::remove_file(path).ok();
        assert!(matches!(err, DataError::MissingColumn(c) if c == "B"));
    }

    #[test]
    fn double_colon_separated_format() {
        let path = write_temp("movies.dat", "1::Toy Story (1995)::Animation|Comedy\n2::Jumanji (1995)::Adventure\nbroken line\n");
        let spec = SourceSpec::new(
            path.clone(),
            SourceFormat::Separated {
                separator: "::".into(),
            },
            vec![
                ("MovieID", ColumnType::Int),
                ("Title", ColumnType::Str),
                ("Genres", ColumnType::Str),
            ],
        );
        let (table, report) = read_source(&spec).unwrap();
        std::fs::remove_file(path).ok();

        assert_eq!(table.len(), 2);
        assert_eq!(report.rows_skipped, 1);
        assert_eq!(table.rows()[0][1], str_val("Toy Story (1995)"));
    }

    #[test]
    fn json_records() {
        let path = write_temp(
            "rows.json",
            r#"[{"a": 1, "b": "x"}, {"a": 2.5, "b": "y"}, {"b": "z"}]"#,
        );
        let spec = SourceSpec::new(
            path.clone(),
            SourceFormat::Json,
            vec![("a", ColumnType::Float), ("b", ColumnType::Str)],
        );
        let (table, report) = read_source(&spec).unwrap();
        std::fs::remove_file(path).ok();

        assert_eq!(table.len(), 3);
        assert_eq!(report.rows_read, 3);
        assert_eq!(table.rows()[0][0], Value::Float(1.0));
        assert!(table.rows()[2][0].is_null());
    }

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

    #[test]
    fn inner_join_drops_unmatched_and_counts() {
        let movies = table_of(
            vec![("MovieID", ColumnType::Int), ("Title", ColumnType::Str)],
            vec![
                vec![Value::Integer(1), str_val("One")],
                vec![Value::Integer(2), str_val("Two")],
                vec![Value::Integer(3), str_val("Three")],
            ],
        );
        let ratings = table_of(
            vec![("MovieID", ColumnType::Int), ("Rating", ColumnType::Int)],
            vec![
                vec![Value::Integer(1), Value::Integer(5)],
                vec![Value::Integer(1), Value::Integer(3)],
                vec![Value::Integer(9), Value::Integer(4)],
            ],
        );
        let (joined, report) = inner_join(&movies, &ratings, "MovieID").unwrap();

        // Exactly the matched pairs survive.
        assert_eq!(joined.len(), 2);
        assert_eq!(report.dropped_left, 2); // movies 2 and 3
        assert_eq!(report.dropped_right, 1); // rating for movie 9
        assert_eq!(
            joined.schema().names().collect::<Vec<_>>(),
            vec!["MovieID", "Title", "Rating"]
        );
    }

    #[test]
    fn join_keys_match_across_integer_and_float_cells() {
        // Key matching uses Value equality, which identifies Integer(1)
        // and Float(1.0) just like the ordered containers do.
        let left = table_of(
            vec![("ID", ColumnType::Int), ("Name", ColumnType::Str)],
            vec![vec![Value::Integer(1), str_val("One")]],
        );
        let right = table_of(
            vec![("ID", ColumnType::Float), ("Score", ColumnType::Int)],
            vec![vec![Value::Float(1.0), Value::Integer(7)]],
        );
        let (joined, report) = inner_join(&left, &right, "ID").unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(report.dropped_left, 0);
        assert_eq!(report.dropped_right, 0);
    }

    #[test]
    fn derived_product_and_order() {
        let mut t = table_of(
            vec![
                ("Quantity", ColumnType::Int),
                ("UnitPrice", ColumnType::Float),
            ],
            vec![
                vec![Value::Integer(2), Value::Float(5.0)],
                vec![Value::Integer(1), Value::Float(20.0)],
            ],
        );
        let derived = vec![
            Derived::product("TotalPrice", "Quantity", "UnitPrice"),
            // May reference the column derived just before it.
            Derived::map("Double", ColumnType::Float, |row| {
                match row.f64("TotalPrice") {
                    Some(x) => Value::Float(x * 2.0),
                    None => Value::Null,
                }
            }),
        ];
        apply_derived(&mut t, &derived).unwrap();

        assert_eq!(t.rows()[0][2], Value::Float(10.0));
        assert_eq!(t.rows()[1][2], Value::Float(20.0));
        assert_eq!(t.rows()[1][3], Value::Float(40.0));
    }

    #[test]
    fn deviation_from_mean() {
        let mut t = table_of(
            vec![("Temp", ColumnType::Float)],
            vec![
                vec![Value::Float(10.0)],
                vec![Value::Float(20.0)],
                vec![Value::Null],
            ],
        );
        apply_derived(&mut t, &[Derived::deviation_from_mean("Anomaly", "Temp")]).unwrap();
        assert_eq!(t.rows()[0][1], Value::Float(-5.0));
        assert_eq!(t.rows()[1][1], Value::Float(5.0));
        assert!(t.rows()[2][1].is_null());
    }

    #[test]
    fn clean_rules_drop_rows() {
        let mut t = table_of(
            vec![("price", ColumnType::Float), ("bed", ColumnType::Float)],
            vec![
                vec![Value::Float(100_000.0), Value::Float(3.0)],
                vec![Value::Null, Value::Float(2.0)],
                vec![Value::Float(-5.0), Value::Float(2.0)],
                vec![Value::Float(5e9), Value::Float(2.0)],
            ],
        );
        let rules = vec![
            CleanRule::drop_null(&["price", "bed"]),
            CleanRule::retain("realistic price", |row| {
                row.f64("price").is_some_and(|p| p > 0.0 && p < 1e8)
            }),
        ];
        let removed = apply_clean(&mut t, &rules);
        assert_eq!(removed, 3);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn month_start_truncates() {
        let mut t = table_of(
            vec![("dt", ColumnType::Date)],
            vec![vec![Value::Date(
                NaiveDate::from_ymd_opt(2011, 5, 17).unwrap(),
            )]],
        );
        apply_derived(
            &mut t,
            &[
                Derived::month_start("Month", "dt"),
                Derived::year("Year", "dt"),
            ],
        )
        .unwrap();
        assert_eq!(
            t.rows()[0][1],
            Value::Date(NaiveDate::from_ymd_opt(2011, 5, 1).unwrap())
        );
        assert_eq!(t.rows()[0][2], Value::Integer(2011));
    }
}
