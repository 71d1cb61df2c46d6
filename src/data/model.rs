use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// CellValue – a single cell in a column
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring common Pandas dtypes.
/// Using `BTreeMap` / `BTreeSet` downstream so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// ISO-8601 date string kept as text for simplicity.
    Date(String),
    /// The missing marker.
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) | (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) | CellValue::Date(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{d}"),
            CellValue::Null => write!(f, "<NA>"),
        }
    }
}

impl CellValue {
    /// Try to interpret the value as an `f64` for statistics.
    /// NaN counts as missing, so it is never returned.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) if v.is_nan() => None,
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// `Null`, or a float NaN that slipped in from a source that stores
    /// missing numbers that way.
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    /// A float cell, with NaN mapped to `Null`.
    pub fn float(v: f64) -> Self {
        if v.is_nan() {
            CellValue::Null
        } else {
            CellValue::Float(v)
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Integer(i)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::float(v)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(CellValue::Null, Into::into)
    }
}

// ---------------------------------------------------------------------------
// ColumnType – the tag every operator consults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    Text,
    Boolean,
    Temporal,
}

impl ColumnType {
    /// Infer the column type from its cells. Missing cells are ignored; a
    /// column with no present values is numeric, like an empty upload column.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a CellValue>) -> Self {
        let mut seen: Option<ColumnType> = None;
        for v in values {
            let kind = match v {
                CellValue::Null => continue,
                CellValue::Float(f) if f.is_nan() => continue,
                CellValue::Integer(_) | CellValue::Float(_) => ColumnType::Numeric,
                CellValue::Bool(_) => ColumnType::Boolean,
                CellValue::Date(_) => ColumnType::Temporal,
                CellValue::String(_) => return ColumnType::Text,
            };
            match seen {
                None => seen = Some(kind),
                Some(prev) if prev != kind => return ColumnType::Text,
                Some(_) => {}
            }
        }
        seen.unwrap_or(ColumnType::Numeric)
    }

    pub fn is_numeric(self) -> bool {
        self == ColumnType::Numeric
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Text => "text",
            ColumnType::Boolean => "boolean",
            ColumnType::Temporal => "temporal",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Column / Table
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),
    #[error("column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}

/// One named, typed column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    dtype: ColumnType,
    values: Vec<CellValue>,
}

impl Column {
    /// Build a column, inferring its type from the values.
    pub fn new(name: impl Into<String>, values: Vec<CellValue>) -> Self {
        let dtype = ColumnType::infer(&values);
        Self::with_type(name, dtype, values)
    }

    /// Build a column with a type declared by the source (e.g. a Parquet schema).
    pub fn with_type(name: impl Into<String>, dtype: ColumnType, values: Vec<CellValue>) -> Self {
        Column {
            name: name.into(),
            dtype,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> ColumnType {
        self.dtype
    }

    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Present numeric values, in row order.
    pub fn numbers(&self) -> Vec<f64> {
        self.values.iter().filter_map(CellValue::as_f64).collect()
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_missing()).count()
    }

    /// Sorted set of distinct non-missing values.
    pub fn unique_values(&self) -> BTreeSet<CellValue> {
        self.values
            .iter()
            .filter(|v| !v.is_missing())
            .cloned()
            .collect()
    }

    /// Counts of each non-missing value.
    pub fn value_counts(&self) -> BTreeMap<&CellValue, usize> {
        let mut counts = BTreeMap::new();
        for v in self.values.iter().filter(|v| !v.is_missing()) {
            *counts.entry(v).or_insert(0) += 1;
        }
        counts
    }

    /// A copy of this column with every missing cell replaced by `fill`.
    pub fn fill_missing(&self, fill: &CellValue, dtype: ColumnType) -> Column {
        let values = self
            .values
            .iter()
            .map(|v| if v.is_missing() { fill.clone() } else { v.clone() })
            .collect();
        Column::with_type(self.name.clone(), dtype, values)
    }

    fn take(&self, indices: &[usize]) -> Column {
        Column {
            name: self.name.clone(),
            dtype: self.dtype,
            values: indices.iter().map(|&i| self.values[i].clone()).collect(),
        }
    }
}

/// An immutable table: ordered, uniquely named columns of equal length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Validate and assemble columns into a table.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, TableError> {
        let mut names: BTreeSet<&str> = BTreeSet::new();
        let n_rows = columns.first().map_or(0, Column::len);
        for col in &columns {
            if !names.insert(col.name()) {
                return Err(TableError::DuplicateColumn(col.name.clone()));
            }
            if col.len() != n_rows {
                return Err(TableError::LengthMismatch {
                    column: col.name.clone(),
                    expected: n_rows,
                    actual: col.len(),
                });
            }
        }
        Ok(Table { columns, n_rows })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    /// Whether both tables carry the same set of column names.
    pub fn same_columns(&self, other: &Table) -> bool {
        let mine: BTreeSet<&str> = self.columns.iter().map(|c| c.name()).collect();
        let theirs: BTreeSet<&str> = other.columns.iter().map(|c| c.name()).collect();
        mine == theirs
    }

    /// Cell at (row, column name).
    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        self.column(column).and_then(|c| c.values.get(row))
    }

    /// Total number of missing cells.
    pub fn missing_cells(&self) -> usize {
        self.columns.iter().map(Column::missing_count).sum()
    }

    /// New table holding only the given rows, in the given order.
    ///
    /// # Panics
    ///
    /// Panics if any index is `>= self.n_rows()`.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
            n_rows: indices.len(),
        }
    }

    /// New table holding the rows for which `keep(row)` is true.
    pub fn filter_rows(&self, mut keep: impl FnMut(usize) -> bool) -> Table {
        let indices: Vec<usize> = (0..self.n_rows).filter(|&i| keep(i)).collect();
        self.take_rows(&indices)
    }

    /// New table with the named column swapped for `column`. The replacement
    /// must have the same name and length; otherwise the table is returned as is.
    pub fn with_column(&self, column: Column) -> Table {
        let mut columns = self.columns.clone();
        if column.len() == self.n_rows {
            if let Some(slot) = columns.iter_mut().find(|c| c.name == column.name) {
                *slot = column;
            }
        }
        Table {
            columns,
            n_rows: self.n_rows,
        }
    }

    /// Display projection: keep only the named columns that exist, in the
    /// order given. An empty selection keeps every column.
    pub fn project(&self, names: &[&str]) -> Table {
        if names.is_empty() {
            return self.clone();
        }
        let columns = names
            .iter()
            .filter_map(|n| self.column(n).cloned())
            .collect();
        Table {
            columns,
            n_rows: self.n_rows,
        }
    }

    /// Iterate row-wise as slices of cells, one `Vec` per row.
    pub fn rows(&self) -> impl Iterator<Item = Vec<&CellValue>> + '_ {
        (0..self.n_rows).map(move |i| self.columns.iter().map(|c| &c.values[i]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_column_types() {
        let num = [CellValue::Integer(1), CellValue::Null, CellValue::Float(2.5)];
        assert_eq!(ColumnType::infer(&num), ColumnType::Numeric);

        let mixed = [CellValue::Integer(1), CellValue::Bool(true)];
        assert_eq!(ColumnType::infer(&mixed), ColumnType::Text);

        let dates = [CellValue::Date("2024-01-01".into()), CellValue::Null];
        assert_eq!(ColumnType::infer(&dates), ColumnType::Temporal);

        assert_eq!(ColumnType::infer(&[CellValue::Null]), ColumnType::Numeric);
    }

    #[test]
    fn rejects_ragged_and_duplicate_columns() {
        let a = Column::new("a", vec![1i64.into(), 2i64.into()]);
        let b = Column::new("b", vec![1i64.into()]);
        let err = Table::from_columns(vec![a.clone(), b]).unwrap_err();
        assert!(matches!(err, TableError::LengthMismatch { expected: 2, actual: 1, .. }));

        let err = Table::from_columns(vec![a.clone(), a]).unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("a".into()));
    }

    #[test]
    fn filter_and_project_leave_source_untouched() {
        let t = Table::from_columns(vec![
            Column::new("x", vec![1i64.into(), 2i64.into(), 3i64.into()]),
            Column::new("y", vec!["a".into(), CellValue::Null, "c".into()]),
        ])
        .unwrap();

        let odd = t.filter_rows(|i| i != 1);
        assert_eq!(odd.n_rows(), 2);
        assert_eq!(odd.cell(1, "x"), Some(&CellValue::Integer(3)));
        assert_eq!(t.n_rows(), 3);

        let only_y = t.project(&["y", "missing"]);
        assert_eq!(only_y.column_names(), vec!["y"]);
        assert_eq!(t.missing_cells(), 1);
    }

    #[test]
    fn null_sorts_first_and_counts_skip_missing() {
        let col = Column::new(
            "c",
            vec!["b".into(), "a".into(), "b".into(), CellValue::Null],
        );
        let counts = col.value_counts();
        assert_eq!(counts.get(&CellValue::from("b")), Some(&2));
        assert_eq!(col.unique_values().len(), 2);
        assert!(CellValue::Null < CellValue::Bool(false));
    }

    #[test]
    fn nan_is_missing() {
        let col = Column::new(
            "x",
            vec![1.0f64.into(), CellValue::Float(f64::NAN), CellValue::Null, 3.0f64.into()],
        );
        assert_eq!(col.dtype(), ColumnType::Numeric);
        assert_eq!(col.missing_count(), 2);
        assert_eq!(col.numbers(), vec![1.0, 3.0]);
        assert_eq!(CellValue::from(f64::NAN), CellValue::Null);

        let filled = col.fill_missing(&CellValue::Float(2.0), ColumnType::Numeric);
        assert_eq!(filled.missing_count(), 0);
    }

    #[test]
    #[should_panic]
    fn take_rows_panics_past_the_end() {
        let t = Table::from_columns(vec![Column::new("x", vec![1i64.into()])]).unwrap();
        t.take_rows(&[1]);
    }
}
