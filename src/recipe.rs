//! JSON cleaning recipes: an input file, an ordered list of cleaning steps,
//! and an optional output path.
//!
//! ```json
//! {
//!   "input": "survey.csv",
//!   "output": "survey_clean.csv",
//!   "steps": [
//!     { "op": "missing", "strategy": "median", "columns": ["age"] },
//!     { "op": "outliers", "columns": ["age", "income"] },
//!     { "op": "reset" }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::clean::{CleaningReport, Strategy};
use crate::state::{DatasetState, StateError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    pub input: PathBuf,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    Missing {
        strategy: Strategy,
        #[serde(default)]
        columns: Vec<String>,
    },
    Outliers {
        #[serde(default)]
        columns: Vec<String>,
    },
    Reset,
}

/// What running one step produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Cleaned(CleaningReport),
    Reset { rows: usize },
}

impl Step {
    pub fn apply(&self, state: &mut DatasetState) -> Result<StepOutcome, StateError> {
        match self {
            Step::Missing { strategy, columns } => state
                .apply_missing_strategy(*strategy, columns.as_slice())
                .map(StepOutcome::Cleaned),
            Step::Outliers { columns } => state
                .apply_outlier_removal(columns.as_slice())
                .map(StepOutcome::Cleaned),
            Step::Reset => state.reset().map(|t| StepOutcome::Reset { rows: t.n_rows() }),
        }
    }
}

impl Recipe {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading recipe {}", path.display()))?;
        let mut recipe: Recipe = serde_json::from_str(&text)
            .with_context(|| format!("parsing recipe {}", path.display()))?;

        // Relative data paths are relative to the recipe file.
        if let Some(dir) = path.parent() {
            recipe.input = dir.join(&recipe.input);
            recipe.output = recipe.output.map(|o| dir.join(o));
        }
        Ok(recipe)
    }

    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("parsing recipe")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, Column, Table};

    #[test]
    fn parses_steps_with_strategy_aliases() {
        let recipe = Recipe::parse(
            r#"{
                "input": "data.csv",
                "steps": [
                    {"op": "missing", "strategy": "fill-median", "columns": ["age"]},
                    {"op": "missing", "strategy": "drop_rows"},
                    {"op": "outliers", "columns": ["age"]},
                    {"op": "reset"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(recipe.output, None);
        assert_eq!(
            recipe.steps,
            vec![
                Step::Missing {
                    strategy: Strategy::FillMedian,
                    columns: vec!["age".into()],
                },
                Step::Missing {
                    strategy: Strategy::DropRows,
                    columns: vec![],
                },
                Step::Outliers {
                    columns: vec!["age".into()],
                },
                Step::Reset,
            ]
        );
    }

    #[test]
    fn rejects_unknown_ops() {
        assert!(Recipe::parse(r#"{"input": "x.csv", "steps": [{"op": "pivot"}]}"#).is_err());
    }

    #[test]
    fn relative_paths_resolve_against_recipe_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipe.json");
        std::fs::write(&path, r#"{"input": "in.csv", "output": "out.csv"}"#).unwrap();
        let recipe = Recipe::from_path(&path).unwrap();
        assert_eq!(recipe.input, dir.path().join("in.csv"));
        assert_eq!(recipe.output, Some(dir.path().join("out.csv")));
    }

    #[test]
    fn steps_drive_the_state() {
        let mut state = DatasetState::new();
        let t = Table::from_columns(vec![Column::new(
            "v",
            vec![1i64.into(), CellValue::Null],
        )])
        .unwrap();
        state.load(t, "t.csv");

        let step = Step::Missing {
            strategy: Strategy::DropRows,
            columns: vec!["v".into()],
        };
        match step.apply(&mut state).unwrap() {
            StepOutcome::Cleaned(r) => assert_eq!(r.rows_removed(), 1),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(Step::Reset.apply(&mut state).unwrap(), StepOutcome::Reset { rows: 2 });
    }
}
