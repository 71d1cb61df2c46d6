use super::report::{Cleaned, CleaningReport, ColumnOutcome, SkipReason};
use super::resolve_columns;
use crate::data::model::Table;
use crate::stats;

/// Tukey fence multiplier.
pub const IQR_FACTOR: f64 = 1.5;

/// Closed interval outside of which a value counts as an outlier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    /// Fences from the quartiles of `values`; `None` when there are no values.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let q1 = stats::quantile(values, 0.25)?;
        let q3 = stats::quantile(values, 0.75)?;
        let iqr = q3 - q1;
        Some(Bounds {
            q1,
            q3,
            lower: q1 - IQR_FACTOR * iqr,
            upper: q3 + IQR_FACTOR * iqr,
        })
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.lower && v <= self.upper
    }
}

/// Remove rows that fall outside the IQR fences of any target column.
///
/// Columns are processed in the order given and each one's fences are
/// computed from the table as already filtered by the previous columns, so
/// the result can depend on column order. Missing cells never mark a row as
/// an outlier. Unknown and non-numeric columns are skipped with a warning.
pub fn remove_outliers<S: AsRef<str>>(table: &Table, columns: &[S]) -> Cleaned {
    if columns.is_empty() {
        return Cleaned {
            table: table.clone(),
            report: CleaningReport::nothing_selected("outlier removal", table.n_rows()),
        };
    }

    let mut report = CleaningReport::new("IQR", table.n_rows());
    let (targets, unknown) = resolve_columns(table, columns);
    report.columns.extend(unknown);

    let mut out = table.clone();
    for name in targets {
        let Some(col) = out.column(&name) else { continue };
        if !col.dtype().is_numeric() {
            let reason = SkipReason::NotNumeric(col.dtype());
            report.columns.push(ColumnOutcome::Skipped { column: name, reason });
            continue;
        }
        let Some(bounds) = Bounds::from_values(&col.numbers()) else {
            report.columns.push(ColumnOutcome::Skipped {
                column: name,
                reason: SkipReason::NoData,
            });
            continue;
        };

        let before = out.n_rows();
        let values = col.values();
        let filtered = out.filter_rows(|row| values[row].as_f64().map_or(true, |v| bounds.contains(v)));
        let removed = before - filtered.n_rows();
        log::debug!(
            "IQR on '{name}': q1={} q3={} bounds=[{}, {}], removed {removed}",
            bounds.q1,
            bounds.q3,
            bounds.lower,
            bounds.upper
        );

        report.columns.push(ColumnOutcome::Filtered {
            column: name,
            lower: bounds.lower,
            upper: bounds.upper,
            removed,
        });
        out = filtered;
    }

    report.rows_after = out.n_rows();
    Cleaned { table: out, report }
}
