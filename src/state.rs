use std::sync::Arc;

use thiserror::Error;

use crate::clean::{handle_missing, remove_outliers, CleaningReport, Strategy};
use crate::data::model::Table;
use crate::summary::{summary, ColumnSummary, FinalReport};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("no dataset loaded; upload a file first")]
    NotLoaded,
    #[error("cleaning may drop rows but not columns; column set differs from the original")]
    ColumnsChanged,
}

/// Result of [`DatasetState::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The table became both current and original.
    Loaded,
    /// Same source as last time; nothing changed.
    Unchanged,
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Per-session dataset state: the working table, the snapshot taken at
/// upload, and the id of the upload it came from.
///
/// Tables are shared as `Arc<Table>` and never mutated, so a reader holding
/// an older `current()` keeps a consistent view while the holder swaps in a
/// new one.
#[derive(Debug, Default)]
pub struct DatasetState {
    current: Option<Arc<Table>>,
    original: Option<Arc<Table>>,
    source_id: Option<String>,
}

impl DatasetState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest a newly uploaded table unless it comes from the source that is
    /// already loaded.
    pub fn load(&mut self, table: Table, source_id: &str) -> LoadOutcome {
        if self.original.is_some() && self.source_id.as_deref() == Some(source_id) {
            log::debug!("source '{source_id}' already loaded, ignoring");
            return LoadOutcome::Unchanged;
        }
        log::info!(
            "loaded '{source_id}': {} rows x {} columns",
            table.n_rows(),
            table.n_cols()
        );
        let snapshot = Arc::new(table);
        self.current = Some(Arc::clone(&snapshot));
        self.original = Some(snapshot);
        self.source_id = Some(source_id.to_string());
        LoadOutcome::Loaded
    }

    pub fn is_loaded(&self) -> bool {
        self.original.is_some()
    }

    pub fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    pub fn current(&self) -> Option<Arc<Table>> {
        self.current.clone()
    }

    pub fn original(&self) -> Option<Arc<Table>> {
        self.original.clone()
    }

    /// Swap in a new working table. The original is untouched.
    pub fn replace_current(&mut self, table: Table) -> Result<(), StateError> {
        let original = self.original.as_ref().ok_or(StateError::NotLoaded)?;
        if !table.same_columns(original) {
            return Err(StateError::ColumnsChanged);
        }
        self.current = Some(Arc::new(table));
        Ok(())
    }

    /// Restore the working table to the upload snapshot.
    pub fn reset(&mut self) -> Result<Arc<Table>, StateError> {
        let original = self.original.clone().ok_or(StateError::NotLoaded)?;
        self.current = Some(Arc::clone(&original));
        log::info!("reset to original ({} rows)", original.n_rows());
        Ok(original)
    }

    /// Run the missing-value operator on the working table and keep its result.
    pub fn apply_missing_strategy<S: AsRef<str>>(
        &mut self,
        strategy: Strategy,
        columns: &[S],
    ) -> Result<CleaningReport, StateError> {
        let current = self.require_current()?;
        let cleaned = handle_missing(&current, strategy, columns);
        self.accept(cleaned.table, cleaned.report)
    }

    /// Run IQR outlier removal on the working table and keep its result.
    pub fn apply_outlier_removal<S: AsRef<str>>(
        &mut self,
        columns: &[S],
    ) -> Result<CleaningReport, StateError> {
        let current = self.require_current()?;
        let cleaned = remove_outliers(&current, columns);
        self.accept(cleaned.table, cleaned.report)
    }

    pub fn summary(&self) -> Result<Vec<ColumnSummary>, StateError> {
        let current = self.require_current()?;
        Ok(summary(&current))
    }

    /// Compare the working table against the original upload.
    pub fn report(&self) -> Result<FinalReport, StateError> {
        let current = self.require_current()?;
        let original = self.original.as_ref().ok_or(StateError::NotLoaded)?;
        Ok(FinalReport::new(original, &current))
    }

    fn require_current(&self) -> Result<Arc<Table>, StateError> {
        self.current.clone().ok_or(StateError::NotLoaded)
    }

    fn accept(&mut self, table: Table, report: CleaningReport) -> Result<CleaningReport, StateError> {
        for msg in report.messages() {
            log::info!("{msg}");
        }
        self.replace_current(table)?;
        Ok(report)
    }
}
