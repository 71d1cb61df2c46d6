use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::report::{Cleaned, CleaningReport, ColumnOutcome, SkipReason};
use super::{resolve_columns, DROP_ROWS_LABEL};
use crate::data::model::{CellValue, Column, ColumnType, Table};
use crate::stats;

/// Fallback used by mode fill when a column has no present values at all.
pub const UNKNOWN_MARKER: &str = "Unknown";

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[serde(alias = "drop-rows")]
    DropRows,
    #[serde(rename = "mean", alias = "fill-mean")]
    FillMean,
    #[serde(rename = "median", alias = "fill-median")]
    FillMedian,
    #[serde(rename = "mode", alias = "fill-mode")]
    FillMode,
}

impl Strategy {
    pub fn label(self) -> &'static str {
        match self {
            Strategy::DropRows => DROP_ROWS_LABEL,
            Strategy::FillMean => "mean",
            Strategy::FillMedian => "median",
            Strategy::FillMode => "mode",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown missing-value strategy '{0}' (expected drop_rows, mean, median or mode)")]
pub struct ParseStrategyError(pub String);

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop_rows" | "drop-rows" => Ok(Strategy::DropRows),
            "mean" | "fill-mean" | "fill_mean" => Ok(Strategy::FillMean),
            "median" | "fill-median" | "fill_median" => Ok(Strategy::FillMedian),
            "mode" | "fill-mode" | "fill_mode" => Ok(Strategy::FillMode),
            other => Err(ParseStrategyError(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Operator
// ---------------------------------------------------------------------------

/// Handle missing values in `columns` with `strategy`, returning a new table.
///
/// Unknown columns and columns the strategy does not apply to are skipped
/// with a warning; the rest are processed. An empty selection returns an
/// unchanged copy flagged as `nothing_selected`.
pub fn handle_missing<S: AsRef<str>>(table: &Table, strategy: Strategy, columns: &[S]) -> Cleaned {
    if columns.is_empty() {
        return Cleaned {
            table: table.clone(),
            report: CleaningReport::nothing_selected("missing value imputation", table.n_rows()),
        };
    }

    let mut report = CleaningReport::new(strategy.label(), table.n_rows());
    let (targets, unknown) = resolve_columns(table, columns);
    report.columns.extend(unknown);

    let out = match strategy {
        Strategy::DropRows => drop_rows(table, &targets),
        Strategy::FillMean | Strategy::FillMedian => {
            let mut out = table.clone();
            for name in &targets {
                let Some(col) = out.column(name) else { continue };
                let (outcome, filled) = fill_numeric(col, strategy);
                if let Some(filled) = filled {
                    out = out.with_column(filled);
                }
                report.columns.push(outcome);
            }
            out
        }
        Strategy::FillMode => {
            let mut out = table.clone();
            for name in &targets {
                let Some(col) = out.column(name) else { continue };
                let (outcome, filled) = fill_mode(col);
                out = out.with_column(filled);
                report.columns.push(outcome);
            }
            out
        }
    };

    report.rows_after = out.n_rows();
    log::debug!(
        "missing-value {} on {:?}: {} -> {} rows",
        strategy,
        targets,
        report.rows_before,
        report.rows_after
    );
    Cleaned { table: out, report }
}

/// Keep only rows with a present value in every target column.
fn drop_rows(table: &Table, targets: &[String]) -> Table {
    let cols: Vec<&Column> = targets.iter().filter_map(|n| table.column(n)).collect();
    table.filter_rows(|row| cols.iter().all(|c| !c.values()[row].is_missing()))
}

fn fill_numeric(col: &Column, strategy: Strategy) -> (ColumnOutcome, Option<Column>) {
    let column = col.name().to_string();
    if !col.dtype().is_numeric() {
        let reason = SkipReason::NotNumeric(col.dtype());
        return (ColumnOutcome::Skipped { column, reason }, None);
    }

    let numbers = col.numbers();
    let stat = match strategy {
        Strategy::FillMean => stats::mean(&numbers),
        _ => stats::median(&numbers),
    };
    let Some(stat) = stat else {
        let reason = SkipReason::NoData;
        return (ColumnOutcome::Skipped { column, reason }, None);
    };

    let value = numeric_cell(col, stat);
    let cells = col.missing_count();
    let filled = col.fill_missing(&value, ColumnType::Numeric);
    (
        ColumnOutcome::Filled {
            column,
            value,
            cells,
        },
        Some(filled),
    )
}

/// Keep integer columns integer when the fill value allows it.
fn numeric_cell(col: &Column, stat: f64) -> CellValue {
    let all_int = col
        .values()
        .iter()
        .filter(|v| !v.is_missing())
        .all(|v| matches!(v, CellValue::Integer(_)));
    if all_int && stat.fract() == 0.0 && stat.abs() < i64::MAX as f64 {
        CellValue::Integer(stat as i64)
    } else {
        CellValue::Float(stat)
    }
}

fn fill_mode(col: &Column) -> (ColumnOutcome, Column) {
    let (value, dtype) = match stats::mode(col.values()) {
        Some(v) => (v, col.dtype()),
        None => (CellValue::String(UNKNOWN_MARKER.to_string()), ColumnType::Text),
    };
    let cells = col.missing_count();
    let filled = col.fill_missing(&value, dtype);
    (
        ColumnOutcome::Filled {
            column: col.name().to_string(),
            value,
            cells,
        },
        filled,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::report::Level;

    fn ages() -> Table {
        Table::from_columns(vec![
            Column::new(
                "age",
                vec![25i64.into(), 30i64.into(), CellValue::Null, 200i64.into(), 28i64.into()],
            ),
            Column::new(
                "city",
                vec!["Oslo".into(), CellValue::Null, "Rome".into(), "Oslo".into(), CellValue::Null],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn median_fill_uses_present_values() {
        let out = handle_missing(&ages(), Strategy::FillMedian, &["age"]);
        assert_eq!(out.table.cell(2, "age"), Some(&CellValue::Integer(29)));
        assert_eq!(out.table.cell(3, "age"), Some(&CellValue::Integer(200)));
        assert_eq!(out.table.n_rows(), 5);
        assert!(!out.report.has_warnings());
    }

    #[test]
    fn mean_fill_keeps_fractional_result() {
        let out = handle_missing(&ages(), Strategy::FillMean, &["age"]);
        assert_eq!(out.table.cell(2, "age"), Some(&CellValue::Float(70.75)));
    }

    #[test]
    fn mean_on_text_column_warns_and_continues() {
        let out = handle_missing(&ages(), Strategy::FillMean, &["city", "age"]);
        assert_eq!(out.table.column("city"), ages().column("city"));
        assert_eq!(out.table.column("age").unwrap().missing_count(), 0);

        let warnings: Vec<_> = out
            .report
            .messages()
            .into_iter()
            .filter(|m| m.level == Level::Warning)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].text.contains("city"));
    }

    #[test]
    fn drop_rows_removes_rows_missing_in_any_target() {
        let out = handle_missing(&ages(), Strategy::DropRows, &["age", "city"]);
        assert_eq!(out.table.n_rows(), 2);
        assert_eq!(out.report.rows_removed(), 3);
        assert_eq!(out.table.missing_cells(), 0);
    }

    #[test]
    fn mode_fill_on_text_and_empty_column() {
        let table = Table::from_columns(vec![
            Column::new("city", vec!["b".into(), CellValue::Null, "b".into(), "a".into()]),
            Column::new("blank", vec![CellValue::Null; 4]),
        ])
        .unwrap();
        let out = handle_missing(&table, Strategy::FillMode, &["city", "blank"]);
        assert_eq!(out.table.cell(1, "city"), Some(&CellValue::from("b")));

        let blank = out.table.column("blank").unwrap();
        assert!(blank.values().iter().all(|v| *v == CellValue::from(UNKNOWN_MARKER)));
        assert_eq!(blank.dtype(), ColumnType::Text);
    }

    #[test]
    fn all_missing_numeric_column_reports_no_data() {
        let table = Table::from_columns(vec![Column::with_type(
            "score",
            ColumnType::Numeric,
            vec![CellValue::Null, CellValue::Null],
        )])
        .unwrap();
        let out = handle_missing(&table, Strategy::FillMean, &["score"]);
        assert_eq!(out.table, table);
        assert_eq!(
            out.report.columns,
            vec![ColumnOutcome::Skipped {
                column: "score".into(),
                reason: SkipReason::NoData,
            }]
        );
    }

    #[test]
    fn empty_selection_is_informational_noop() {
        let none: [&str; 0] = [];
        let out = handle_missing(&ages(), Strategy::FillMean, &none);
        assert_eq!(out.table, ages());
        assert!(out.report.nothing_selected);
        let msgs = out.report.messages();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].level, Level::Info);
    }

    #[test]
    fn unknown_column_is_skipped() {
        let out = handle_missing(&ages(), Strategy::DropRows, &["nope", "age"]);
        assert_eq!(out.table.n_rows(), 4);
        assert!(out.report.columns.iter().any(|c| matches!(
            c,
            ColumnOutcome::Skipped { reason: SkipReason::UnknownColumn, .. }
        )));
    }

    #[test]
    fn parses_strategy_tags() {
        assert_eq!("drop-rows".parse(), Ok(Strategy::DropRows));
        assert_eq!("fill-median".parse(), Ok(Strategy::FillMedian));
        assert_eq!("Mode".parse(), Ok(Strategy::FillMode));
        assert!("zero".parse::<Strategy>().is_err());
    }
}
