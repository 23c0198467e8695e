//! # Column Access and Validation
//!
//! Every read of an AuthorSignal table goes through this module. A requested
//! column that is absent is a caller error and fails immediately; probability
//! columns are range-checked on the way out so nothing downstream ever sees a
//! value outside [0, 1].

use crate::bootstrap::EstimateError;
use crate::grouped::KeyValue;
use polars::prelude::*;
use thiserror::Error;

/// A comprehensive error type for reading and analysing tabular input.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Delimited-text error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("{0}")]
    EstimateError(#[from] EstimateError),
    #[error(
        "The requested column '{0}' was not found in the input table. Please check spelling and case."
    )]
    ColumnNotFound(String),
    #[error(
        "The column '{column_name}' could not be converted to the expected type '{expected_type}'. (Found type: {found_type})"
    )]
    ColumnWrongType {
        column_name: String,
        expected_type: &'static str,
        found_type: String,
    },
    #[error("Row {row} of column '{column}' holds {value}, which lies outside [0, 1].")]
    InvalidProbability {
        column: String,
        row: usize,
        value: f64,
    },
    #[error("At least one grouping column is required.")]
    NoGroupColumns,
}

pub fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, TableError> {
    df.column(name)
        .map_err(|_| TableError::ColumnNotFound(name.to_string()))
}

/// Fails on the first name in `names` that `df` does not carry.
pub fn require_columns<S: AsRef<str>>(df: &DataFrame, names: &[S]) -> Result<(), TableError> {
    for name in names {
        require_column(df, name.as_ref())?;
    }
    Ok(())
}

/// Reads a numeric column, keeping nulls as `None`.
///
/// Entries that are present but cannot be read as numbers are a type error, not
/// missing data.
pub fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, TableError> {
    let column = require_column(df, name)?;
    let casted = column.cast(&DataType::Float64)?;
    if casted.null_count() > column.null_count() {
        return Err(TableError::ColumnWrongType {
            column_name: name.to_string(),
            expected_type: "f64 (numeric)",
            found_type: format!("{:?}", column.dtype()),
        });
    }
    Ok(casted.f64()?.into_iter().collect())
}

/// Reads a probability column. NaN cells come back as `None`, like nulls; every
/// other value must lie in [0, 1].
pub fn probability_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, TableError> {
    let values: Vec<Option<f64>> = float_column(df, name)?
        .into_iter()
        .map(|value| value.filter(|v| !v.is_nan()))
        .collect();
    for (row, value) in values.iter().enumerate() {
        if let Some(value) = *value {
            if !(0.0..=1.0).contains(&value) {
                return Err(TableError::InvalidProbability {
                    column: name.to_string(),
                    row,
                    value,
                });
            }
        }
    }
    Ok(values)
}

pub fn integer_column(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>, TableError> {
    let column = require_column(df, name)?;
    let casted = column.cast(&DataType::Int64)?;
    if casted.null_count() > column.null_count() {
        return Err(TableError::ColumnWrongType {
            column_name: name.to_string(),
            expected_type: "i64 (integer)",
            found_type: format!("{:?}", column.dtype()),
        });
    }
    Ok(casted.i64()?.into_iter().collect())
}

pub fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, TableError> {
    let column = require_column(df, name)?;
    let casted = column.cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

/// A grouping column materialized as row-aligned key values.
///
/// Integer columns keep their integer keys so that years sort and echo back as
/// numbers; everything else is keyed by its text rendering.
#[derive(Debug)]
pub enum KeyColumn {
    Int(Vec<Option<i64>>),
    Text(Vec<Option<String>>),
}

impl KeyColumn {
    pub fn read(df: &DataFrame, name: &str) -> Result<Self, TableError> {
        let column = require_column(df, name)?;
        if column.dtype().is_integer() {
            Ok(Self::Int(integer_column(df, name)?))
        } else {
            Ok(Self::Text(text_column(df, name)?))
        }
    }

    /// Key at `row`, or `None` when the cell is null.
    pub fn value_at(&self, row: usize) -> Option<KeyValue> {
        match self {
            Self::Int(values) => values.get(row).copied().flatten().map(KeyValue::Int),
            Self::Text(values) => values
                .get(row)
                .and_then(|v| v.as_deref())
                .map(|v| KeyValue::Text(v.to_string())),
        }
    }
}
