//! Dataset cleaning core.
//!
//! A session loads a [`Table`](data::model::Table) into a
//! [`DatasetState`](state::DatasetState), applies cleaning operators from
//! [`clean`] to the working copy, inspects it with [`summary`] and
//! [`analysis`], and can always reset to the snapshot taken at load.

pub mod analysis;
pub mod clean;
pub mod data;
pub mod recipe;
pub mod state;
pub mod stats;
pub mod summary;

pub use clean::{CleaningReport, Strategy};
pub use data::model::{CellValue, Column, ColumnType, Table, TableError};
pub use state::{DatasetState, LoadOutcome, StateError};
