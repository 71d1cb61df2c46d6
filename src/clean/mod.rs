//! Cleaning operators.
//!
//! Each operator takes a table and parameters and returns a brand-new
//! table plus a [`CleaningReport`]. Operators know nothing about the
//! session; [`crate::state::DatasetState`] wires their output back in.

pub mod missing;
pub mod outliers;
pub mod report;

pub use missing::{handle_missing, Strategy};
pub use outliers::{remove_outliers, Bounds};
pub use report::{Cleaned, CleaningReport, ColumnOutcome, Level, Message, SkipReason};

use crate::data::model::Table;

pub(crate) const DROP_ROWS_LABEL: &str = "drop rows";

/// Split requested names into columns present in `table` (deduplicated,
/// request order kept) and skip outcomes for the unknown ones.
pub(crate) fn resolve_columns<S: AsRef<str>>(
    table: &Table,
    requested: &[S],
) -> (Vec<String>, Vec<ColumnOutcome>) {
    let mut found: Vec<String> = Vec::new();
    let mut unknown = Vec::new();
    for name in requested.iter().map(AsRef::as_ref) {
        if table.column(name).is_some() {
            if !found.iter().any(|f| f == name) {
                found.push(name.to_string());
            }
        } else {
            log::warn!("requested column '{name}' does not exist");
            unknown.push(ColumnOutcome::Skipped {
                column: name.to_string(),
                reason: SkipReason::UnknownColumn,
            });
        }
    }
    (found, unknown)
}
