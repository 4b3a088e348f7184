use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;

use super::error::{DataError, Result};

// ---------------------------------------------------------------------------
// Value – a single table cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring the handful of dtypes the source
/// datasets use. Using `BTreeMap` / `BTreeSet` downstream so `Value` must be
/// `Ord`.
#[derive(Debug, Clone)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --
//
// Equality goes through `cmp` so it agrees with the ordering: an integer
// equals the float of the same magnitude, everywhere a Value is compared,
// hashed or used as a map key.

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Integer(_) => 1,
                Float(_) => 2,
                Date(_) => 3,
                String(_) => 4,
            }
        }
        // Integers and floats compare numerically with each other so mixed
        // columns still sort sensibly.
        if let (Integer(_) | Float(_), Integer(_) | Float(_)) = (self, other) {
            let a = self.as_f64().unwrap_or(f64::NAN);
            let b = other.as_f64().unwrap_or(f64::NAN);
            return a.total_cmp(&b);
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Date(a), Date(b)) => a.cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            // Integers hash through the f64 representation so they collide
            // with equal floats, matching the numeric ordering above.
            Value::Integer(i) => (*i as f64).to_bits().hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::Date(d) => d.hash(state),
            Value::Null => 0u8.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v:.2}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Value {
    /// Try to interpret the value as an `f64` for range filters, reducers
    /// and plot coordinates. Dates map to days since the Unix epoch so they
    /// can serve as a plot axis.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            Value::Date(d) => {
                let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
                Some((*d - epoch).num_days() as f64)
            }
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Schema – declared column names and types
// ---------------------------------------------------------------------------

/// Declared semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Str,
    Int,
    Float,
    Date,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Str => "string",
            ColumnType::Int => "integer",
            ColumnType::Float => "float",
            ColumnType::Date => "date",
        };
        write!(f, "{name}")
    }
}

/// Ordered column name → type mapping with index lookup, validated once at
/// load time. All by-name column access goes through this.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    columns: Vec<(String, ColumnType)>,
    by_name: BTreeMap<String, usize>,
}

impl Schema {
    pub fn new(columns: Vec<(String, ColumnType)>) -> Self {
        let by_name = columns
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.clone(), i))
            .collect();
        Schema { columns, by_name }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Index lookup that fails with [`DataError::UnknownColumn`].
    pub fn require(&self, name: &str) -> Result<usize> {
        self.index_of(name)
            .ok_or_else(|| DataError::UnknownColumn(name.to_string()))
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.index_of(name).map(|i| self.columns[i].1)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn columns(&self) -> &[(String, ColumnType)] {
        &self.columns
    }

    /// Append a column (derived columns, join output, aggregate results).
    pub fn push(&mut self, name: String, ty: ColumnType) {
        self.by_name.insert(name.clone(), self.columns.len());
        self.columns.push((name, ty));
    }
}

// ---------------------------------------------------------------------------
// Table – rows sharing one schema
// ---------------------------------------------------------------------------

pub type Row = Vec<Value>;

/// In-memory ordered set of typed rows sharing one schema. The loader owns
/// the base table; filters and aggregations consume it by reference and
/// produce new, independently-owned tables.
#[derive(Debug, Clone, Default)]
pub struct Table {
    schema: Schema,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(schema: Schema) -> Self {
        Table {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Row) {
        debug_assert_eq!(row.len(), self.schema.len());
        self.rows.push(row);
    }

    /// Append a fully materialised column. `values` must have one entry per
    /// existing row.
    pub fn push_column(&mut self, name: String, ty: ColumnType, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.rows.len());
        self.schema.push(name, ty);
        for (row, v) in self.rows.iter_mut().zip(values) {
            row.push(v);
        }
    }

    /// Iterate the values of one column.
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Value>> {
        let idx = self.schema.require(name)?;
        Ok(self.rows.iter().map(move |r| &r[idx]))
    }

    /// Sorted set of distinct values in a column (nulls excluded). Drives
    /// multiselect widgets and per-series color maps.
    pub fn unique_values(&self, name: &str) -> Result<BTreeSet<Value>> {
        Ok(self
            .column(name)?
            .filter(|v| !v.is_null())
            .cloned()
            .collect())
    }

    /// (min, max) over the numeric values of a column; `None` when the
    /// column has no numeric values.
    pub fn numeric_range(&self, name: &str) -> Result<Option<(f64, f64)>> {
        let mut range: Option<(f64, f64)> = None;
        for v in self.column(name)? {
            if let Some(x) = v.as_f64() {
                range = Some(match range {
                    Some((lo, hi)) => (lo.min(x), hi.max(x)),
                    None => (x, x),
                });
            }
        }
        Ok(range)
    }
}

/// Borrowed view of one row with by-name access, handed to derived-column
/// and cleaning closures.
#[derive(Clone, Copy)]
pub struct RowRef<'a> {
    schema: &'a Schema,
    row: &'a [Value],
}

impl<'a> RowRef<'a> {
    pub fn new(schema: &'a Schema, row: &'a [Value]) -> Self {
        RowRef { schema, row }
    }

    /// Value of the named column; `Null` when the column does not exist.
    pub fn get(&self, name: &str) -> &'a Value {
        static NULL: Value = Value::Null;
        match self.schema.index_of(name) {
            Some(i) => &self.row[i],
            None => &NULL,
        }
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name).as_f64()
    }

    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        match self.get(name) {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_lookup() {
        let schema = Schema::new(vec![
            ("a".into(), ColumnType::Int),
            ("b".into(), ColumnType::Str),
        ]);
        assert_eq!(schema.index_of("b"), Some(1));
        assert_eq!(schema.column_type("a"), Some(ColumnType::Int));
        assert!(schema.require("missing").is_err());
    }

    #[test]
    fn mixed_numeric_ordering() {
        assert_eq!(
            Value::Integer(3).cmp(&Value::Float(3.0)),
            std::cmp::Ordering::Equal
        );
        assert!(Value::Integer(2) < Value::Float(2.5));
    }

    #[test]
    fn equality_agrees_with_ordering_and_hashing() {
        // Eq, Ord and Hash must all identify Integer(3) and Float(3.0),
        // so ordered and hashed containers key them identically.
        assert_eq!(Value::Integer(3), Value::Float(3.0));
        assert_ne!(Value::Integer(3), Value::Float(3.5));
        assert_ne!(Value::Integer(3), Value::String("3".into()));

        let ordered: BTreeSet<Value> = [Value::Integer(3), Value::Float(3.0)].into();
        assert_eq!(ordered.len(), 1);
        let hashed: std::collections::HashSet<Value> =
            [Value::Integer(3), Value::Float(3.0)].into();
        assert_eq!(hashed.len(), 1);
    }

    #[test]
    fn date_as_f64_is_days_since_epoch() {
        let d = NaiveDate::from_ymd_opt(1970, 1, 11).unwrap();
        assert_eq!(Value::Date(d).as_f64(), Some(10.0));
    }

    #[test]
    fn unique_values_skip_nulls() {
        let schema = Schema::new(vec![("c".into(), ColumnType::Str)]);
        let mut t = Table::new(schema);
        t.push_row(vec![Value::String("x".into())]);
        t.push_row(vec![Value::Null]);
        t.push_row(vec![Value::String("x".into())]);
        assert_eq!(t.unique_values("c").unwrap().len(), 1);
    }

    #[test]
    fn push_column_extends_rows() {
        let schema = Schema::new(vec![("a".into(), ColumnType::Int)]);
        let mut t = Table::new(schema);
        t.push_row(vec![Value::Integer(1)]);
        t.push_row(vec![Value::Integer(2)]);
        t.push_column(
            "b".into(),
            ColumnType::Float,
            vec![Value::Float(0.5), Value::Null],
        );
        assert_eq!(t.schema().len(), 2);
        assert_eq!(t.rows()[0][1], Value::Float(0.5));
    }
}
