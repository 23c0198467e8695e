//! Ordinary least-squares trend of a probability signal against publication year.
//!
//! Descriptive only: the slope summarizes direction and pace of change, no model
//! claims are attached to it.

use crate::frame::{TableError, float_column, integer_column};
use crate::grouped::{GroupKey, partition_rows, read_key_columns};
use crate::results::{format_cell, write_records};
use ndarray::Array1;
use polars::prelude::DataFrame;
use std::path::Path;

/// Fewer points than this leaves the trend undefined.
pub const MINIMUM_TREND_POINTS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trend {
    /// Change in the signal per year.
    pub slope: f64,
    pub intercept: f64,
    pub n_points: usize,
}

/// Fits `value = slope * year + intercept`, ignoring pairs without a value or
/// with a NaN value.
///
/// Returns `None` with fewer than two usable points, or when every point falls in
/// the same year so that no slope is identifiable.
pub fn fit_trend(points: &[(i64, Option<f64>)]) -> Option<Trend> {
    let (years, values): (Vec<f64>, Vec<f64>) = points
        .iter()
        .filter_map(|&(year, value)| {
            value.filter(|v| !v.is_nan()).map(|v| (year as f64, v))
        })
        .unzip();
    let n = years.len();
    if n < MINIMUM_TREND_POINTS {
        return None;
    }

    let x = Array1::from_vec(years);
    let y = Array1::from_vec(values);
    let x_mean = x.sum() / n as f64;
    let y_mean = y.sum() / n as f64;
    let dx = &x - x_mean;
    let dy = &y - y_mean;
    let sxx = dx.dot(&dx);
    if sxx == 0.0 {
        return None;
    }

    let slope = dx.dot(&dy) / sxx;
    Some(Trend {
        slope,
        intercept: y_mean - slope * x_mean,
        n_points: n,
    })
}

/// Trends fitted per group, in first-encounter order.
#[derive(Clone, Debug, PartialEq)]
pub struct TrendTable {
    pub group_columns: Vec<String>,
    pub rows: Vec<(GroupKey, Option<Trend>)>,
}

impl TrendTable {
    pub fn header(&self) -> Vec<String> {
        self.group_columns
            .iter()
            .cloned()
            .chain(["slope", "intercept", "n_points"].map(String::from))
            .collect()
    }

    pub fn write_delimited(&self, path: &Path, delimiter: u8) -> Result<(), csv::Error> {
        let records = self.rows.iter().map(|(key, trend)| {
            key.values()
                .iter()
                .map(|v| v.to_string())
                .chain([
                    format_cell(trend.map(|t| t.slope)),
                    format_cell(trend.map(|t| t.intercept)),
                    trend.map(|t| t.n_points).unwrap_or(0).to_string(),
                ])
                .collect::<Vec<String>>()
        });
        write_records(path, delimiter, &self.header(), records)
    }
}

/// Fits one trend per combination of `group_columns`. Rows with a null year are
/// skipped along with rows whose value is missing.
pub fn fit_trend_grouped<S: AsRef<str>>(
    df: &DataFrame,
    group_columns: &[S],
    year_column: &str,
    value_column: &str,
) -> Result<TrendTable, TableError> {
    let keys = read_key_columns(df, group_columns)?;
    let years = integer_column(df, year_column)?;
    let values = float_column(df, value_column)?;

    let names: Vec<String> = group_columns.iter().map(|s| s.as_ref().to_string()).collect();

    let (partitions, excluded) = partition_rows(&keys, years.into_iter().zip(values));
    log::info!(
        "Partitioned {} rows by [{}] into {} trend groups ({} rows with null keys excluded)",
        df.height(),
        names.join(", "),
        partitions.len(),
        excluded
    );
    let rows = partitions
        .into_iter()
        .map(|(key, pairs)| {
            let points: Vec<(i64, Option<f64>)> = pairs
                .into_iter()
                .filter_map(|(year, value)| year.map(|y| (y, value)))
                .collect();
            let trend = fit_trend(&points);
            if trend.is_none() {
                log::warn!("Group {key} has too few points for a trend; it is undefined.");
            }
            (key, trend)
        })
        .collect();

    Ok(TrendTable {
        group_columns: names,
        rows,
    })
}
