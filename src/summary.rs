use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::data::model::{ColumnType, Table};
use crate::stats;

// ---------------------------------------------------------------------------
// Per-column summary
// ---------------------------------------------------------------------------

/// Descriptive record for one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub dtype: ColumnType,
    pub non_missing: usize,
    pub missing: usize,
    /// Share of missing cells, in percent, rounded to two decimals.
    pub missing_pct: f64,
    pub unique: usize,
    /// Only present for numeric columns with at least one value.
    pub numeric: Option<NumericSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericSummary {
    pub mean: f64,
    /// Undefined with fewer than two values.
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
}

/// Summarise every column of `table`, in display order.
pub fn summary(table: &Table) -> Vec<ColumnSummary> {
    let rows = table.n_rows();
    table
        .columns()
        .iter()
        .map(|col| {
            let missing = col.missing_count();
            let numeric = if col.dtype().is_numeric() {
                let nums = col.numbers();
                match (stats::mean(&nums), stats::min(&nums), stats::max(&nums)) {
                    (Some(mean), Some(min), Some(max)) => Some(NumericSummary {
                        mean,
                        std: stats::std_dev(&nums),
                        min,
                        max,
                    }),
                    _ => None,
                }
            } else {
                None
            };
            ColumnSummary {
                name: col.name().to_string(),
                dtype: col.dtype(),
                non_missing: rows - missing,
                missing,
                missing_pct: percent(missing, rows),
                unique: col.unique_values().len(),
                numeric,
            }
        })
        .collect()
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 10_000.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Whole-table metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatasetMetrics {
    pub rows: usize,
    pub columns: usize,
    pub missing_cells: usize,
}

impl DatasetMetrics {
    pub fn of(table: &Table) -> Self {
        DatasetMetrics {
            rows: table.n_rows(),
            columns: table.n_cols(),
            missing_cells: table.missing_cells(),
        }
    }
}

/// Before/after comparison of the working table against the original upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FinalReport {
    pub original_rows: usize,
    pub final_rows: usize,
    pub rows_removed: usize,
    pub columns: usize,
    pub missing_remaining: usize,
    pub distinct_types: usize,
}

impl FinalReport {
    pub fn new(original: &Table, current: &Table) -> Self {
        let types: BTreeSet<ColumnType> = current.columns().iter().map(|c| c.dtype()).collect();
        FinalReport {
            original_rows: original.n_rows(),
            final_rows: current.n_rows(),
            rows_removed: original.n_rows().saturating_sub(current.n_rows()),
            columns: current.n_cols(),
            missing_remaining: current.missing_cells(),
            distinct_types: types.len(),
        }
    }
}

impl fmt::Display for FinalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Original rows:            {}", self.original_rows)?;
        writeln!(f, "Final rows:               {}", self.final_rows)?;
        writeln!(f, "Rows removed (cleaned):   {}", self.rows_removed)?;
        writeln!(f, "Total columns:            {}", self.columns)?;
        writeln!(f, "Missing cells remaining:  {}", self.missing_remaining)?;
        write!(f, "Column types in use:      {}", self.distinct_types)
    }
}

/// Render a summary as a fixed-width text table.
pub fn render(summaries: &[ColumnSummary]) -> String {
    fn opt(v: Option<f64>) -> String {
        v.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
    }

    let width = summaries
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(0)
        .max("Column".len());

    let mut out = format!(
        "{:<width$}  {:<8}  {:>8}  {:>8}  {:>9}  {:>7}  {:>12}  {:>12}  {:>12}  {:>12}\n",
        "Column", "Type", "Non-Null", "Missing", "% Missing", "Unique", "mean", "std", "min", "max"
    );
    for s in summaries {
        let n = s.numeric;
        out.push_str(&format!(
            "{:<width$}  {:<8}  {:>8}  {:>8}  {:>9.2}  {:>7}  {:>12}  {:>12}  {:>12}  {:>12}\n",
            s.name,
            s.dtype.to_string(),
            s.non_missing,
            s.missing,
            s.missing_pct,
            s.unique,
            opt(n.map(|n| n.mean)),
            opt(n.and_then(|n| n.std)),
            opt(n.map(|n| n.min)),
            opt(n.map(|n| n.max)),
        ));
    }
    out
}
