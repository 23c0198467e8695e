//! Row selection applied before an analysis is bootstrapped.

use crate::frame::{TableError, integer_column, require_column, text_column};
use crate::signal::columns;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Inclusive range of publication years.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i64,
    pub end: i64,
}

impl YearRange {
    pub fn contains(&self, year: i64) -> bool {
        self.start <= year && year <= self.end
    }
}

/// A named, inclusive span of years such as "Pandemic (2020-2021)".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub label: String,
    pub start: i64,
    pub end: i64,
}

impl Period {
    pub fn new(label: &str, start: i64, end: i64) -> Self {
        Self {
            label: label.to_string(),
            start,
            end,
        }
    }

    pub fn range(&self) -> YearRange {
        YearRange {
            start: self.start,
            end: self.end,
        }
    }
}

/// Keeps rows whose year lies in `range`. Rows without a year are dropped.
pub fn filter_years(df: &DataFrame, range: YearRange) -> Result<DataFrame, TableError> {
    require_column(df, columns::YEAR)?;
    let filtered = df
        .clone()
        .lazy()
        .filter(
            col(columns::YEAR)
                .gt_eq(lit(range.start))
                .and(col(columns::YEAR).lt_eq(lit(range.end))),
        )
        .collect()?;
    Ok(filtered)
}

/// Keeps rows whose dataset is one of `datasets`.
pub fn filter_datasets<S: AsRef<str>>(
    df: &DataFrame,
    datasets: &[S],
) -> Result<DataFrame, TableError> {
    let values = text_column(df, columns::DATASET)?;
    let keep: Vec<bool> = values
        .iter()
        .map(|v| {
            v.as_deref()
                .is_some_and(|v| datasets.iter().any(|d| d.as_ref() == v))
        })
        .collect();
    Ok(df.filter(&BooleanChunked::from_slice("keep".into(), &keep))?)
}

/// Whether the first word of `name` is a single letter, as in "J Smith".
///
/// A punctuated initial such as "J." is two characters and does not count.
pub fn is_initial_first(name: &str) -> bool {
    let Some(first) = name.split_whitespace().next() else {
        return false;
    };
    let mut chars = first.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_alphabetic())
}

/// Drops rows whose author name starts with an initial. Rows without a name are kept.
pub fn exclude_initial_first(df: &DataFrame) -> Result<DataFrame, TableError> {
    let names = text_column(df, columns::AUTHOR_NAME)?;
    let keep: Vec<bool> = names
        .iter()
        .map(|name| !name.as_deref().is_some_and(is_initial_first))
        .collect();
    let dropped = keep.iter().filter(|&&k| !k).count();
    log::info!("Excluded {dropped} author rows with an initial as first name");
    Ok(df.filter(&BooleanChunked::from_slice("keep".into(), &keep))?)
}

/// Adds a `period` column naming the period each row's year falls into.
///
/// The first matching period wins. Rows outside every period, or without a year,
/// get a null period and therefore join no group keyed on it.
pub fn assign_periods(df: &DataFrame, periods: &[Period]) -> Result<DataFrame, TableError> {
    let years = integer_column(df, columns::YEAR)?;
    let labels: Vec<Option<&str>> = years
        .iter()
        .map(|year| {
            year.and_then(|y| {
                periods
                    .iter()
                    .find(|p| p.range().contains(y))
                    .map(|p| p.label.as_str())
            })
        })
        .collect();
    let mut out = df.clone();
    out.with_column(Column::new(columns::PERIOD.into(), labels))?;
    Ok(out)
}
