//! Read-only exploration helpers: search, per-column metrics, value counts,
//! group-by aggregation and correlation. None of these touch session state.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::model::{CellValue, ColumnType, Table};
use crate::stats;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("no such column '{0}'")]
    UnknownColumn(String),
    #[error("cannot compute {agg} of '{column}': column is {dtype}, not numeric")]
    NotNumeric {
        column: String,
        dtype: ColumnType,
        agg: Aggregation,
    },
    #[error("unknown aggregation '{0}'")]
    UnknownAggregation(String),
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Rows where any present cell contains `query`, ignoring case.
pub fn search(table: &Table, query: &str) -> Table {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return table.clone();
    }
    let cols = table.columns();
    table.filter_rows(|row| {
        cols.iter().any(|c| {
            let v = &c.values()[row];
            !v.is_missing() && v.to_string().to_lowercase().contains(&needle)
        })
    })
}

// ---------------------------------------------------------------------------
// Column metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnMetrics {
    Numeric {
        mean: Option<f64>,
        median: Option<f64>,
        min: Option<f64>,
        max: Option<f64>,
        std: Option<f64>,
    },
    Categorical {
        unique: usize,
        most_frequent: Option<CellValue>,
        most_frequent_count: usize,
        missing: usize,
    },
}

pub fn column_metrics(table: &Table, column: &str) -> Result<ColumnMetrics, AnalysisError> {
    let col = table
        .column(column)
        .ok_or_else(|| AnalysisError::UnknownColumn(column.to_string()))?;

    if col.dtype().is_numeric() {
        let nums = col.numbers();
        return Ok(ColumnMetrics::Numeric {
            mean: stats::mean(&nums),
            median: stats::median(&nums),
            min: stats::min(&nums),
            max: stats::max(&nums),
            std: stats::std_dev(&nums),
        });
    }

    let counts = col.value_counts();
    let most_frequent = stats::mode(col.values());
    let most_frequent_count = most_frequent
        .as_ref()
        .and_then(|v| counts.get(v).copied())
        .unwrap_or(0);
    Ok(ColumnMetrics::Categorical {
        unique: counts.len(),
        most_frequent,
        most_frequent_count,
        missing: col.missing_count(),
    })
}

/// Present values of `column` by descending frequency, at most `limit` of them.
pub fn value_counts(
    table: &Table,
    column: &str,
    limit: usize,
) -> Result<Vec<(CellValue, usize)>, AnalysisError> {
    let col = table
        .column(column)
        .ok_or_else(|| AnalysisError::UnknownColumn(column.to_string()))?;
    let mut counts: Vec<(CellValue, usize)> = col
        .value_counts()
        .into_iter()
        .map(|(v, n)| (v.clone(), n))
        .collect();
    // Stable sort keeps value order among ties.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(limit);
    Ok(counts)
}

// ---------------------------------------------------------------------------
// Group-by
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Mean,
    Sum,
    Count,
    Min,
    Max,
    Std,
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Aggregation::Mean => "mean",
            Aggregation::Sum => "sum",
            Aggregation::Count => "count",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::Std => "std",
        };
        f.write_str(s)
    }
}

impl FromStr for Aggregation {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Aggregation::Mean),
            "sum" => Ok(Aggregation::Sum),
            "count" => Ok(Aggregation::Count),
            "min" => Ok(Aggregation::Min),
            "max" => Ok(Aggregation::Max),
            "std" => Ok(Aggregation::Std),
            other => Err(AnalysisError::UnknownAggregation(other.to_string())),
        }
    }
}

impl Aggregation {
    fn apply(self, present: &[&CellValue]) -> Option<f64> {
        let nums: Vec<f64> = present.iter().filter_map(|v| v.as_f64()).collect();
        match self {
            Aggregation::Count => Some(present.len() as f64),
            Aggregation::Mean => stats::mean(&nums),
            Aggregation::Sum => Some(nums.iter().sum()),
            Aggregation::Min => stats::min(&nums),
            Aggregation::Max => stats::max(&nums),
            Aggregation::Std => stats::std_dev(&nums),
        }
    }
}

/// One output row of [`group_by`].
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub key: CellValue,
    /// `None` where the aggregate is undefined for the group (e.g. std of one value).
    pub value: Option<f64>,
}

/// Aggregate `value_col` per distinct value of `group_col`. Rows with a
/// missing group key are dropped; groups are sorted by the aggregate,
/// largest first, with undefined aggregates last.
pub fn group_by(
    table: &Table,
    group_col: &str,
    value_col: &str,
    agg: Aggregation,
) -> Result<Vec<GroupRow>, AnalysisError> {
    let keys = table
        .column(group_col)
        .ok_or_else(|| AnalysisError::UnknownColumn(group_col.to_string()))?;
    let values = table
        .column(value_col)
        .ok_or_else(|| AnalysisError::UnknownColumn(value_col.to_string()))?;
    if agg != Aggregation::Count && !values.dtype().is_numeric() {
        return Err(AnalysisError::NotNumeric {
            column: value_col.to_string(),
            dtype: values.dtype(),
            agg,
        });
    }

    let mut groups: BTreeMap<&CellValue, Vec<&CellValue>> = BTreeMap::new();
    for (k, v) in keys.values().iter().zip(values.values()) {
        if k.is_missing() {
            continue;
        }
        let bucket = groups.entry(k).or_default();
        if !v.is_missing() {
            bucket.push(v);
        }
    }

    let mut rows: Vec<GroupRow> = groups
        .into_iter()
        .map(|(key, present)| GroupRow {
            key: key.clone(),
            value: agg.apply(&present),
        })
        .collect();
    rows.sort_by(|a, b| match (a.value, b.value) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

/// Pearson correlations between every pair of numeric columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major, `columns.len()` squared. `None` where undefined.
    pub values: Vec<Option<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i * self.columns.len() + j]
    }
}

/// `None` when the table has fewer than two numeric columns.
pub fn correlation_matrix(table: &Table) -> Option<CorrelationMatrix> {
    let numeric: Vec<_> = table
        .columns()
        .iter()
        .filter(|c| c.dtype().is_numeric())
        .collect();
    if numeric.len() < 2 {
        return None;
    }
    let mut values = Vec::with_capacity(numeric.len() * numeric.len());
    for a in &numeric {
        for b in &numeric {
            values.push(stats::pearson(a.values(), b.values()));
        }
    }
    Some(CorrelationMatrix {
        columns: numeric.iter().map(|c| c.name().to_string()).collect(),
        values,
    })
}
