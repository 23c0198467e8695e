//! Reading AuthorSignal tables from delimited text.
//!
//! Files ending in `.tsv` or `.tab` are tab separated; everything else is read as
//! comma separated. Empty cells load as nulls, which is how missing `p_female`
//! values arrive from upstream.

use crate::frame::{TableError, probability_column, require_column};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Field separator implied by a file's extension.
pub fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("tab") => b'\t',
        _ => b',',
    }
}

/// Reads a delimited table with a header row.
pub fn read_table(path: &Path) -> Result<DataFrame, TableError> {
    let df = CsvReader::new(File::open(path)?)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_parse_options(
                    CsvParseOptions::default().with_separator(delimiter_for(path)),
                ),
        )
        .finish()?;
    Ok(df)
}

/// Reads an AuthorSignal table and checks its probability column up front, so a
/// malformed file is rejected before any analysis starts.
pub fn read_signals(path: &Path, value_column: &str) -> Result<DataFrame, TableError> {
    log::info!("Loading author signals from '{}'", path.display());
    let df = read_table(path)?;
    require_column(&df, value_column)?;
    let values = probability_column(&df, value_column)?;
    let observed = values.iter().filter(|v| v.is_some()).count();
    log::info!(
        "Loaded {} author rows ({} with an observed {value_column})",
        df.height(),
        observed
    );
    Ok(df)
}
