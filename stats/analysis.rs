// ========================================================================================
//
//                                  PLAN EXECUTION
//
// ========================================================================================
//
// Runs every analysis of a plan against one AuthorSignal table. Each analysis narrows
// the table in a fixed order (years, datasets, initial-only first names, periods,
// journal tiers) and then bootstraps the remaining rows by its grouping columns.

use crate::filters::{assign_periods, exclude_initial_first, filter_datasets, filter_years};
use crate::frame::TableError;
use crate::grouped::{BootstrapProgress, estimate_grouped_with_progress};
use crate::plan::{Analysis, AnalysisPlan, PlanError};
use crate::quartile::JournalQuartiles;
use crate::results::ResultTable;
use polars::prelude::DataFrame;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("Analysis '{name}' failed: {source}")]
    Table {
        name: String,
        #[source]
        source: TableError,
    },
}

/// Outcome of one analysis in a plan.
#[derive(Debug)]
pub struct AnalysisOutput {
    pub name: String,
    pub table: ResultTable,
}

/// Narrows `df` to the rows `analysis` covers.
pub fn prepare_rows(
    df: &DataFrame,
    analysis: &Analysis,
    quartiles: Option<&JournalQuartiles>,
) -> Result<DataFrame, TableError> {
    let mut rows = df.clone();
    if let Some(range) = analysis.years {
        rows = filter_years(&rows, range)?;
    }
    if !analysis.datasets.is_empty() {
        rows = filter_datasets(&rows, &analysis.datasets)?;
    }
    if analysis.exclude_initial_first {
        rows = exclude_initial_first(&rows)?;
    }
    if !analysis.periods.is_empty() {
        rows = assign_periods(&rows, &analysis.periods)?;
    }
    if analysis.requires_quartile {
        if let Some(quartiles) = quartiles {
            rows = quartiles.attach(&rows)?;
        }
    }
    Ok(rows)
}

/// Runs a single analysis with an explicit seed.
pub fn run_analysis<P: BootstrapProgress + ?Sized>(
    df: &DataFrame,
    analysis: &Analysis,
    plan: &AnalysisPlan,
    seed: Option<u64>,
    quartiles: Option<&JournalQuartiles>,
    progress: &P,
) -> Result<ResultTable, TableError> {
    let rows = prepare_rows(df, analysis, quartiles)?;
    log::info!(
        "Analysis '{}': {} of {} rows selected",
        analysis.name,
        rows.height(),
        df.height()
    );
    let mut config = plan.bootstrap_config();
    config.seed = seed;
    let mut table = estimate_grouped_with_progress(
        &rows,
        &analysis.group_columns,
        &plan.value_column,
        &config,
        progress,
    )?;
    table.sort_canonical();
    Ok(table)
}

/// Runs every analysis of `plan`, in plan order.
///
/// A seeded plan gives analysis `i` the seed `seed + i`, so adding an analysis at the
/// end leaves the earlier results unchanged. Analyses that need journal tiers are
/// skipped with a warning when `quartiles` is `None`.
pub fn run_plan<P: BootstrapProgress + ?Sized>(
    df: &DataFrame,
    plan: &AnalysisPlan,
    quartiles: Option<&JournalQuartiles>,
    progress: &P,
) -> Result<Vec<AnalysisOutput>, AnalysisError> {
    plan.validate()?;
    let mut outputs = Vec::with_capacity(plan.analyses.len());
    for (index, analysis) in plan.analyses.iter().enumerate() {
        if analysis.requires_quartile && quartiles.is_none() {
            log::warn!(
                "Skipping analysis '{}': it needs a journal quartile table",
                analysis.name
            );
            continue;
        }
        let seed = plan.seed.map(|s| s.wrapping_add(index as u64));
        let table = run_analysis(df, analysis, plan, seed, quartiles, progress)
            .map_err(|source| AnalysisError::Table {
                name: analysis.name.clone(),
                source,
            })?;
        outputs.push(AnalysisOutput {
            name: analysis.name.clone(),
            table,
        });
    }
    Ok(outputs)
}
