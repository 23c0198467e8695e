//! # Result Assembly
//!
//! Shapes per-group estimates into a table with one column per grouping column
//! followed by `mean`, `ci_lower`, `ci_upper` and `n_samples`. Undefined
//! estimates stay undefined: null in a `DataFrame`, an empty cell in text.

use crate::bootstrap::Estimate;
use crate::grouped::{GroupKey, KeyValue};
use crate::positions::Position;
use polars::prelude::*;
use std::cmp::Ordering;
use std::path::Path;

pub const ESTIMATE_COLUMNS: [&str; 4] = ["mean", "ci_lower", "ci_upper", "n_samples"];

/// Name of the grouping column whose values sort in canonical position order.
pub const POSITION_COLUMN: &str = "position";

#[derive(Clone, Debug, PartialEq)]
pub struct ResultRow {
    pub key: GroupKey,
    pub estimate: Estimate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResultTable {
    group_columns: Vec<String>,
    rows: Vec<ResultRow>,
}

impl ResultTable {
    /// Builds the table from estimates keyed by group, keeping their order.
    ///
    /// Keys are expected to carry one value per grouping column. A shorter key
    /// leaves its trailing cells empty and sorts ahead of complete keys.
    pub fn assemble(group_columns: Vec<String>, estimates: Vec<(GroupKey, Estimate)>) -> Self {
        let rows = estimates
            .into_iter()
            .map(|(key, estimate)| ResultRow { key, estimate })
            .collect();
        Self {
            group_columns,
            rows,
        }
    }

    pub fn group_columns(&self) -> &[String] {
        &self.group_columns
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Estimate for the group whose key equals `key`.
    pub fn get(&self, key: &[KeyValue]) -> Option<&Estimate> {
        self.rows
            .iter()
            .find(|row| row.key.values() == key)
            .map(|row| &row.estimate)
    }

    pub fn header(&self) -> Vec<String> {
        self.group_columns
            .iter()
            .cloned()
            .chain(ESTIMATE_COLUMNS.iter().map(|c| c.to_string()))
            .collect()
    }

    /// Orders rows by their keys, column by column. Position keys follow the
    /// canonical first → last order, integers sort numerically, and other text
    /// sorts lexically.
    pub fn sort_canonical(&mut self) {
        let columns = &self.group_columns;
        self.rows.sort_by(|a, b| {
            for (i, column) in columns.iter().enumerate() {
                let ordering = match (a.key.values().get(i), b.key.values().get(i)) {
                    (Some(x), Some(y)) => compare_key(column, x, y),
                    (x, y) => x.is_some().cmp(&y.is_some()),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.group_columns.len() + 4);

        for (i, name) in self.group_columns.iter().enumerate() {
            let ints: Option<Vec<i64>> = if self.rows.is_empty() {
                None
            } else {
                self.rows
                    .iter()
                    .map(|row| match row.key.0.get(i) {
                        Some(KeyValue::Int(v)) => Some(*v),
                        _ => None,
                    })
                    .collect()
            };
            let column = match ints {
                Some(values) => Column::new(name.as_str().into(), values),
                None => {
                    let values: Vec<Option<String>> = self
                        .rows
                        .iter()
                        .map(|row| row.key.0.get(i).map(|v| v.to_string()))
                        .collect();
                    Column::new(name.as_str().into(), values)
                }
            };
            columns.push(column);
        }

        let estimate_column = |f: fn(&Estimate) -> Option<f64>| -> Vec<Option<f64>> {
            self.rows.iter().map(|row| f(&row.estimate)).collect()
        };
        columns.push(Column::new("mean".into(), estimate_column(Estimate::mean)));
        columns.push(Column::new("ci_lower".into(), estimate_column(Estimate::ci_lower)));
        columns.push(Column::new("ci_upper".into(), estimate_column(Estimate::ci_upper)));
        let counts: Vec<u64> = self
            .rows
            .iter()
            .map(|row| row.estimate.n_samples as u64)
            .collect();
        columns.push(Column::new("n_samples".into(), counts));

        DataFrame::new(columns)
    }

    /// Writes the table as delimited text with a header row.
    pub fn write_delimited(&self, path: &Path, delimiter: u8) -> Result<(), csv::Error> {
        let records = self.rows.iter().map(|row| {
            row.key
                .values()
                .iter()
                .map(|v| v.to_string())
                .chain([
                    format_cell(row.estimate.mean()),
                    format_cell(row.estimate.ci_lower()),
                    format_cell(row.estimate.ci_upper()),
                    row.estimate.n_samples.to_string(),
                ])
                .collect::<Vec<String>>()
        });
        write_records(path, delimiter, &self.header(), records)
    }
}

fn compare_key(column: &str, a: &KeyValue, b: &KeyValue) -> Ordering {
    if column == POSITION_COLUMN {
        if let (KeyValue::Text(a), KeyValue::Text(b)) = (a, b) {
            if let (Ok(a), Ok(b)) = (a.parse::<Position>(), b.parse::<Position>()) {
                return a.cmp(&b);
            }
        }
    }
    a.cmp(b)
}

/// Undefined values become empty cells.
pub fn format_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub(crate) fn write_records<I>(
    path: &Path,
    delimiter: u8,
    header: &[String],
    records: I,
) -> Result<(), csv::Error>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)?;
    writer.write_record(header)?;
    for record in records {
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::Interval;
    use std::fs;
    use tempfile::tempdir;

    fn defined(mean: f64, n: usize) -> Estimate {
        Estimate {
            interval: Some(Interval {
                mean,
                ci_lower: mean - 0.1,
                ci_upper: mean + 0.1,
            }),
            n_samples: n,
        }
    }

    fn key(values: &[KeyValue]) -> GroupKey {
        GroupKey(values.to_vec())
    }

    fn position_table() -> ResultTable {
        ResultTable::assemble(
            vec!["dataset".to_string(), "position".to_string()],
            vec![
                (key(&["Bio".into(), "last".into()]), defined(0.2, 10)),
                (key(&["Bio".into(), "first".into()]), defined(0.4, 12)),
                (key(&["Bio".into(), "other".into()]), Estimate::undefined()),
                (key(&["Bio".into(), "second".into()]), defined(0.35, 8)),
            ],
        )
    }

    #[test]
    fn header_lists_keys_then_estimates() {
        assert_eq!(
            position_table().header(),
            vec!["dataset", "position", "mean", "ci_lower", "ci_upper", "n_samples"]
        );
    }

    #[test]
    fn single_column_keys_are_projected_under_their_name() {
        let table = ResultTable::assemble(
            vec!["year".to_string()],
            vec![
                (key(&[KeyValue::Int(2016)]), defined(0.3, 4)),
                (key(&[KeyValue::Int(2015)]), defined(0.5, 2)),
            ],
        );
        let df = table.to_dataframe().unwrap();
        assert_eq!(df.width(), 5);
        let years: Vec<Option<i64>> = df.column("year").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(years, vec![Some(2016), Some(2015)]);
    }

    #[test]
    fn undefined_estimates_become_nulls() {
        let df = position_table().to_dataframe().unwrap();
        let means: Vec<Option<f64>> = df.column("mean").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(means, vec![Some(0.2), Some(0.4), None, Some(0.35)]);
        assert_eq!(df.column("n_samples").unwrap().null_count(), 0);
    }

    #[test]
    fn canonical_sort_orders_positions() {
        let mut table = position_table();
        table.sort_canonical();
        let positions: Vec<String> = table.rows().iter().map(|r| r.key.0[1].to_string()).collect();
        assert_eq!(positions, vec!["first", "second", "other", "last"]);
    }

    #[test]
    fn canonical_sort_tolerates_short_keys() {
        let mut table = ResultTable::assemble(
            vec!["dataset".to_string(), "position".to_string()],
            vec![
                (key(&["Bio".into(), "last".into()]), defined(0.2, 10)),
                (key(&["Bio".into()]), defined(0.3, 3)),
                (key(&["Bio".into(), "first".into()]), defined(0.4, 12)),
            ],
        );
        table.sort_canonical();
        let lengths: Vec<usize> = table.rows().iter().map(|r| r.key.values().len()).collect();
        assert_eq!(lengths, vec![1, 2, 2]);
        assert_eq!(table.rows()[1].key.values()[1], KeyValue::from("first"));
        let df = table.to_dataframe().unwrap();
        assert_eq!(df.column("position").unwrap().null_count(), 1);
    }

    #[test]
    fn delimited_snapshot_leaves_undefined_cells_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("positions.csv");
        position_table().write_delimited(&path, b',').unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "dataset,position,mean,ci_lower,ci_upper,n_samples");
        assert_eq!(lines[3], "Bio,other,,,,0");
        assert_eq!(lines.len(), 5);
    }
}
