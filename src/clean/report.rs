use std::fmt;

use crate::data::model::{CellValue, ColumnType, Table};

// ---------------------------------------------------------------------------
// Outcome messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Info,
    Success,
    Warning,
}

/// A human-readable line for the caller to show next to the result.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub level: Level,
    pub text: String,
}

impl Message {
    fn new(level: Level, text: impl Into<String>) -> Self {
        Message {
            level,
            text: text.into(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            Level::Info => "info",
            Level::Success => "ok",
            Level::Warning => "warning",
        };
        write!(f, "[{tag}] {}", self.text)
    }
}

// ---------------------------------------------------------------------------
// Per-column outcomes
// ---------------------------------------------------------------------------

/// Why a requested column was left alone.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The table has no column by that name.
    UnknownColumn,
    /// The operation needs numbers and the column holds something else.
    NotNumeric(ColumnType),
    /// No present values to compute the statistic from.
    NoData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnOutcome {
    /// Missing cells replaced with `value`.
    Filled {
        column: String,
        value: CellValue,
        cells: usize,
    },
    /// Rows outside `[lower, upper]` removed.
    Filtered {
        column: String,
        lower: f64,
        upper: f64,
        removed: usize,
    },
    Skipped {
        column: String,
        reason: SkipReason,
    },
}

impl ColumnOutcome {
    pub fn column(&self) -> &str {
        match self {
            ColumnOutcome::Filled { column, .. }
            | ColumnOutcome::Filtered { column, .. }
            | ColumnOutcome::Skipped { column, .. } => column,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ColumnOutcome::Skipped { .. })
    }
}

// ---------------------------------------------------------------------------
// CleaningReport
// ---------------------------------------------------------------------------

/// What an operator did to the table it was given.
#[derive(Debug, Clone, PartialEq)]
pub struct CleaningReport {
    /// Short operation label used in messages ("drop rows", "median", "IQR").
    pub operation: String,
    pub rows_before: usize,
    pub rows_after: usize,
    pub columns: Vec<ColumnOutcome>,
    /// No target columns were requested; the table is an unchanged copy.
    pub nothing_selected: bool,
}

impl CleaningReport {
    pub(crate) fn new(operation: impl Into<String>, rows_before: usize) -> Self {
        CleaningReport {
            operation: operation.into(),
            rows_before,
            rows_after: rows_before,
            columns: Vec::new(),
            nothing_selected: false,
        }
    }

    pub(crate) fn nothing_selected(operation: impl Into<String>, rows: usize) -> Self {
        CleaningReport {
            nothing_selected: true,
            ..CleaningReport::new(operation, rows)
        }
    }

    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &ColumnOutcome> {
        self.columns.iter().filter(|c| c.is_skipped())
    }

    pub fn has_warnings(&self) -> bool {
        self.skipped().next().is_some()
    }

    /// Render the report as leveled messages: one warning per skipped
    /// column, then a single summary line.
    pub fn messages(&self) -> Vec<Message> {
        if self.nothing_selected {
            return vec![Message::new(
                Level::Info,
                format!("No columns selected for {}.", self.operation),
            )];
        }

        let mut out: Vec<Message> = self
            .columns
            .iter()
            .filter_map(|c| match c {
                ColumnOutcome::Skipped { column, reason } => {
                    Some(Message::new(Level::Warning, self.skip_text(column, reason)))
                }
                _ => None,
            })
            .collect();

        let filled = self
            .columns
            .iter()
            .filter(|c| matches!(c, ColumnOutcome::Filled { .. }))
            .count();
        let filtered = self
            .columns
            .iter()
            .any(|c| matches!(c, ColumnOutcome::Filtered { .. }));

        if filtered {
            let removed = self.rows_removed();
            out.push(if removed > 0 {
                Message::new(
                    Level::Success,
                    format!("Removed {removed} outlier rows across selected numerical columns."),
                )
            } else {
                Message::new(
                    Level::Info,
                    format!(
                        "No outliers removed by the {} method for the selected columns.",
                        self.operation
                    ),
                )
            });
        } else if filled > 0 {
            out.push(Message::new(
                Level::Success,
                format!(
                    "Filled missing values in {filled} column(s) using {}.",
                    self.operation
                ),
            ));
        } else if self.operation == super::DROP_ROWS_LABEL {
            out.push(Message::new(
                Level::Success,
                format!(
                    "Dropped {} rows with missing values in selected columns.",
                    self.rows_removed()
                ),
            ));
        } else if !out.is_empty() {
            out.push(Message::new(
                Level::Info,
                format!("No columns were changed by {}.", self.operation),
            ));
        } else {
            out.push(Message::new(
                Level::Info,
                format!("Nothing to change for {}.", self.operation),
            ));
        }
        out
    }

    fn skip_text(&self, column: &str, reason: &SkipReason) -> String {
        match reason {
            SkipReason::UnknownColumn => format!("Skipping {column}: no such column."),
            SkipReason::NotNumeric(dtype) => format!(
                "Skipping {column}: {} only applies to numerical columns ({column} is {dtype}).",
                self.operation
            ),
            SkipReason::NoData => {
                format!("Skipping {column}: no data to compute the {} value.", self.operation)
            }
        }
    }
}

/// An operator's result: the new table plus what happened.
#[derive(Debug, Clone)]
pub struct Cleaned {
    pub table: Table,
    pub report: CleaningReport,
}
