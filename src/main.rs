use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use data_viz::data::{export, loader};
use data_viz::recipe::{Recipe, StepOutcome};
use data_viz::summary::{self, DatasetMetrics};
use data_viz::DatasetState;

#[derive(Parser)]
#[command(name = "data-viz")]
#[command(about = "Run a JSON cleaning recipe over a CSV, JSON, Parquet or Excel file")]
#[command(version)]
struct Cli {
    #[arg(help = "Recipe file (input, steps, optional output)")]
    recipe: PathBuf,

    #[arg(short, long, help = "Write the cleaned table here instead of the recipe's output (.csv or .xlsx)")]
    output: Option<PathBuf>,

    #[arg(short, long, help = "Verbose output")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let recipe = Recipe::from_path(&cli.recipe)?;

    let table = loader::load_file(&recipe.input)?;
    let mut state = DatasetState::new();
    state.load(table, &loader::source_id(&recipe.input));

    for (i, step) in recipe.steps.iter().enumerate() {
        match step.apply(&mut state) {
            Ok(StepOutcome::Cleaned(report)) => {
                for msg in report.messages() {
                    println!("step {}: {msg}", i + 1);
                }
            }
            Ok(StepOutcome::Reset { rows }) => {
                println!("step {}: [ok] Data reset to original state ({rows} rows).", i + 1);
            }
            Err(e) => {
                log::error!("step {} failed: {e}", i + 1);
                println!("step {}: [error] {e}", i + 1);
            }
        }
    }

    let current = state.current().context("dataset missing after load")?;
    let metrics = DatasetMetrics::of(&current);
    println!(
        "\nCurrent dataset: {} rows x {} columns, {} missing cells\n",
        metrics.rows, metrics.columns, metrics.missing_cells
    );
    print!("{}", summary::render(&summary::summary(&current)));
    println!("\n{}", state.report()?);

    if let Some(output) = cli.output.as_ref().or(recipe.output.as_ref()) {
        export::save(&current, output)?;
        log::info!("wrote {}", output.display());
        println!("\nSaved cleaned data to {}", output.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn help_is_not_taken_as_a_recipe_path() {
        let err = Cli::try_parse_from(["data-viz", "--help"]).err().unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);

        let cli = Cli::try_parse_from(["data-viz", "clean.json", "-o", "out.xlsx"]).unwrap();
        assert_eq!(cli.recipe, PathBuf::from("clean.json"));
        assert_eq!(cli.output, Some(PathBuf::from("out.xlsx")));
        assert!(!cli.verbose);

        assert!(Cli::try_parse_from(["data-viz"]).is_err());
    }
}
