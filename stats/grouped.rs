// ========================================================================================
//
//                          GROUPED BOOTSTRAP ESTIMATION
//
// ========================================================================================
//
// Partitions an AuthorSignal table by the combinations of values that actually occur in
// the grouping columns and bootstraps every partition on its own.
//
//   - Partitions are emitted in the order their first row appears in the input.
//   - Rows with a null in any grouping column belong to no partition.
//   - Every partition gets its own generator, seeded from a single seeder before any
//     work starts. Partitions therefore share no random state, and a seeded run is
//     reproducible no matter how rayon schedules the groups.
//   - All partitions of one call use the same iteration count.

use crate::bootstrap::{BootstrapConfig, EstimateError, Estimate};
use crate::frame::{KeyColumn, TableError, probability_column, require_columns};
use crate::results::ResultTable;
use ahash::AHashMap;
use polars::prelude::DataFrame;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;
use std::fmt;

/// One grouping-column value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyValue {
    Int(i64),
    Text(String),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// The values of all grouping columns for one partition, in grouping-column order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupKey(pub Vec<KeyValue>);

impl GroupKey {
    pub fn values(&self) -> &[KeyValue] {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str(")")
    }
}

/// Observer notified as partitions finish.
///
/// Methods take `&self` because partitions complete on rayon worker threads.
pub trait BootstrapProgress: Sync {
    fn on_start(&self, total_groups: usize) {
        let _ = total_groups;
    }
    fn on_group_finished(&self, key: &GroupKey, estimate: &Estimate) {
        let _ = (key, estimate);
    }
    fn on_finish(&self) {}
}

#[derive(Default)]
pub struct NoopProgress;

impl BootstrapProgress for NoopProgress {}

/// Splits row-aligned `payload` by the keys in `keys`, in first-encounter order.
///
/// Rows whose key has a null component are dropped. Returns the partitions and the
/// number of dropped rows.
pub fn partition_rows<T>(
    keys: &[KeyColumn],
    payload: impl IntoIterator<Item = T>,
) -> (Vec<(GroupKey, Vec<T>)>, usize) {
    let mut index: AHashMap<GroupKey, usize> = AHashMap::new();
    let mut partitions: Vec<(GroupKey, Vec<T>)> = Vec::new();
    let mut excluded = 0usize;

    'rows: for (row, item) in payload.into_iter().enumerate() {
        let mut values = Vec::with_capacity(keys.len());
        for column in keys {
            match column.value_at(row) {
                Some(value) => values.push(value),
                None => {
                    excluded += 1;
                    continue 'rows;
                }
            }
        }
        let key = GroupKey(values);
        match index.get(&key) {
            Some(&slot) => partitions[slot].1.push(item),
            None => {
                index.insert(key.clone(), partitions.len());
                partitions.push((key, vec![item]));
            }
        }
    }

    (partitions, excluded)
}

/// Reads the grouping columns of `df`, failing fast on the first absent one.
pub fn read_key_columns<S: AsRef<str>>(
    df: &DataFrame,
    group_columns: &[S],
) -> Result<Vec<KeyColumn>, TableError> {
    if group_columns.is_empty() {
        return Err(TableError::NoGroupColumns);
    }
    require_columns(df, group_columns)?;
    group_columns
        .iter()
        .map(|name| KeyColumn::read(df, name.as_ref()))
        .collect()
}

/// Bootstraps already partitioned probability vectors.
///
/// Output order matches input order.
pub fn estimate_partitions<P: BootstrapProgress + ?Sized>(
    partitions: Vec<(GroupKey, Vec<Option<f64>>)>,
    config: &BootstrapConfig,
    progress: &P,
) -> Result<Vec<(GroupKey, Estimate)>, EstimateError> {
    let estimator = config.estimator()?;

    let mut seeder = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let seeds: Vec<u64> = partitions.iter().map(|_| seeder.next_u64()).collect();

    progress.on_start(partitions.len());
    let estimates = partitions
        .into_par_iter()
        .zip(seeds.into_par_iter())
        .map(|((key, values), seed)| {
            let mut rng = StdRng::seed_from_u64(seed);
            let estimate = estimator.estimate(&values, &mut rng)?;
            log::debug!(
                "Group {key}: n = {}, mean = {:?}",
                estimate.n_samples,
                estimate.mean()
            );
            progress.on_group_finished(&key, &estimate);
            Ok((key, estimate))
        })
        .collect::<Result<Vec<_>, EstimateError>>()?;
    progress.on_finish();

    for (key, estimate) in &estimates {
        if !estimate.is_defined() {
            log::warn!("Group {key} has no observed values; its estimate is undefined.");
        }
    }

    Ok(estimates)
}

/// Bootstraps `value_column` of `df` separately for every combination of
/// `group_columns` present in the data.
pub fn estimate_grouped<S: AsRef<str>>(
    df: &DataFrame,
    group_columns: &[S],
    value_column: &str,
    config: &BootstrapConfig,
) -> Result<ResultTable, TableError> {
    estimate_grouped_with_progress(df, group_columns, value_column, config, &NoopProgress)
}

pub fn estimate_grouped_with_progress<S: AsRef<str>, P: BootstrapProgress + ?Sized>(
    df: &DataFrame,
    group_columns: &[S],
    value_column: &str,
    config: &BootstrapConfig,
    progress: &P,
) -> Result<ResultTable, TableError> {
    let keys = read_key_columns(df, group_columns)?;
    let values = probability_column(df, value_column)?;
    let names: Vec<String> = group_columns.iter().map(|s| s.as_ref().to_string()).collect();

    let (partitions, excluded) = partition_rows(&keys, values);
    log::info!(
        "Partitioned {} rows by [{}] into {} groups ({} rows with null keys excluded)",
        df.height(),
        names.join(", "),
        partitions.len(),
        excluded
    );

    let estimates = estimate_partitions(partitions, config, progress)?;
    Ok(ResultTable::assemble(names, estimates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn signals() -> DataFrame {
        DataFrame::new(vec![
            Column::new(
                "dataset".into(),
                &[Some("B"), Some("A"), Some("B"), None, Some("C"), Some("A")],
            ),
            Column::new("year".into(), &[2016i64, 2015, 2016, 2015, 2017, 2016]),
            Column::new(
                "p_female".into(),
                &[Some(0.9), Some(0.1), None, Some(0.5), None, Some(0.3)],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn partitions_follow_first_encounter_order() {
        let table = estimate_grouped(&signals(), &["dataset"], "p_female", &BootstrapConfig::seeded(200, 1))
            .unwrap();
        let keys: Vec<String> = table.rows().iter().map(|r| r.key.to_string()).collect();
        assert_eq!(keys, vec!["(B)", "(A)", "(C)"]);
    }

    #[test]
    fn null_keys_are_excluded_and_empty_groups_are_undefined() {
        let table = estimate_grouped(&signals(), &["dataset"], "p_female", &BootstrapConfig::seeded(200, 1))
            .unwrap();
        let c = table.get(&[KeyValue::from("C")]).unwrap();
        assert!(!c.is_defined());
        assert_eq!(c.n_samples, 0);
        let total: usize = table.rows().iter().map(|r| r.estimate.n_samples).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn multiple_columns_form_combined_keys() {
        let table = estimate_grouped(
            &signals(),
            &["dataset", "year"],
            "p_female",
            &BootstrapConfig::seeded(200, 9),
        )
        .unwrap();
        assert_eq!(table.len(), 4);
        let a_2016 = table
            .get(&[KeyValue::from("A"), KeyValue::from(2016)])
            .unwrap();
        assert_eq!(a_2016.n_samples, 1);
        assert_eq!(a_2016.ci_lower(), Some(0.3));
    }

    #[test]
    fn missing_group_column_fails_fast() {
        let err = estimate_grouped(&signals(), &["quartile"], "p_female", &BootstrapConfig::default())
            .unwrap_err();
        assert!(matches!(err, TableError::ColumnNotFound(ref c) if c == "quartile"));
        let err = estimate_grouped(&signals(), &["dataset"], "score", &BootstrapConfig::default())
            .unwrap_err();
        assert!(matches!(err, TableError::ColumnNotFound(ref c) if c == "score"));
    }

    #[test]
    fn empty_group_list_is_rejected() {
        let none: [&str; 0] = [];
        let err = estimate_grouped(&signals(), &none, "p_female", &BootstrapConfig::default())
            .unwrap_err();
        assert!(matches!(err, TableError::NoGroupColumns));
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let config = BootstrapConfig::seeded(500, 1234);
        let a = estimate_grouped(&signals(), &["year"], "p_female", &config).unwrap();
        let b = estimate_grouped(&signals(), &["year"], "p_female", &config).unwrap();
        assert_eq!(a, b);
    }

    #[derive(Default)]
    struct Counting {
        started: AtomicUsize,
        finished: AtomicUsize,
    }

    impl BootstrapProgress for Counting {
        fn on_start(&self, total_groups: usize) {
            self.started.store(total_groups, Ordering::SeqCst);
        }
        fn on_group_finished(&self, key: &GroupKey, estimate: &Estimate) {
            let _ = (key, estimate);
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn progress_sees_every_group() {
        let progress = Counting::default();
        estimate_grouped_with_progress(
            &signals(),
            &["dataset"],
            "p_female",
            &BootstrapConfig::seeded(50, 2),
            &progress,
        )
        .unwrap();
        assert_eq!(progress.started.load(Ordering::SeqCst), 3);
        assert_eq!(progress.finished.load(Ordering::SeqCst), 3);
    }
}
