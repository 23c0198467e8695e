// ========================================================================================
//
//                          THE BOOTSTRAP ESTIMATOR
//
// ========================================================================================
//
// ### Purpose ###
//
// Estimates the mean of a bounded probability signal together with a 95% percentile
// confidence interval. Missing observations are absence of evidence and are dropped
// before resampling; they are never read as 0.5.
//
// ### The Contract ###
//
//   - The reported `mean` is the mean of the resampled means, not the sample mean.
//     The two converge, but historical results were produced with the former.
//
//   - Percentiles interpolate linearly between the two nearest order statistics.
//
//   - A group with no observations yields no interval at all. It is neither zero
//     nor NaN, and it is not an error.
//
//   - NaN marks a missing observation, the same as an absent value.
//
//   - Values outside [0, 1] are rejected, never clamped.
//
//   - The random source is always supplied by the caller.
//
// ----------------------------------------------------------------------------------------

use ndarray::Array1;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of resamples used when the caller does not say otherwise.
pub const DEFAULT_ITERATIONS: usize = 1000;

pub const CI_LOWER_PERCENTILE: f64 = 2.5;
pub const CI_UPPER_PERCENTILE: f64 = 97.5;

#[derive(Error, Debug, PartialEq)]
pub enum EstimateError {
    #[error("Observation {index} has p_female = {value}, which lies outside [0, 1].")]
    InvalidProbability { index: usize, value: f64 },
    #[error("The bootstrap needs at least one iteration.")]
    ZeroIterations,
}

/// Caller-facing knobs for a bootstrap run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub iterations: usize,
    /// `None` seeds from the operating system; `Some` makes runs bit-reproducible.
    pub seed: Option<u64>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            seed: None,
        }
    }
}

impl BootstrapConfig {
    pub fn seeded(iterations: usize, seed: u64) -> Self {
        Self {
            iterations,
            seed: Some(seed),
        }
    }

    pub fn estimator(&self) -> Result<BootstrapEstimator, EstimateError> {
        BootstrapEstimator::new(self.iterations)
    }
}

/// Point estimate and 95% percentile interval of a group mean.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub mean: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Estimate {
    /// `None` when the group had no observations.
    pub interval: Option<Interval>,
    /// Observations that contributed, not the number of resamples.
    pub n_samples: usize,
}

impl Estimate {
    pub fn undefined() -> Self {
        Self {
            interval: None,
            n_samples: 0,
        }
    }

    pub fn is_defined(&self) -> bool {
        self.interval.is_some()
    }

    pub fn mean(&self) -> Option<f64> {
        self.interval.map(|i| i.mean)
    }

    pub fn ci_lower(&self) -> Option<f64> {
        self.interval.map(|i| i.ci_lower)
    }

    pub fn ci_upper(&self) -> Option<f64> {
        self.interval.map(|i| i.ci_upper)
    }
}

/// Nonparametric bootstrap of the mean with a fixed resample count.
///
/// The iteration count is fixed at construction so that every group estimated
/// by one estimator has comparable interval widths.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BootstrapEstimator {
    iterations: usize,
}

impl BootstrapEstimator {
    pub fn new(iterations: usize) -> Result<Self, EstimateError> {
        if iterations == 0 {
            return Err(EstimateError::ZeroIterations);
        }
        Ok(Self { iterations })
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Estimates the mean of `values`, ignoring missing entries.
    pub fn estimate<R: Rng>(
        &self,
        values: &[Option<f64>],
        rng: &mut R,
    ) -> Result<Estimate, EstimateError> {
        let observed = retain_observed(values)?;
        Ok(self.estimate_observed(&observed, rng))
    }

    /// Estimates the mean of already validated observations.
    pub(crate) fn estimate_observed<R: Rng>(&self, observed: &[f64], rng: &mut R) -> Estimate {
        let n = observed.len();
        if n == 0 {
            return Estimate::undefined();
        }

        let means = resampled_means(observed, self.iterations, rng);
        let mut sorted = means.to_vec();
        sorted.sort_unstable_by(|a, b| a.total_cmp(b));
        // Summation rounding must not push the mean outside the resampled range.
        let mean =
            (means.sum() / self.iterations as f64).clamp(sorted[0], sorted[sorted.len() - 1]);

        Estimate {
            interval: Some(Interval {
                mean,
                ci_lower: percentile(&sorted, CI_LOWER_PERCENTILE),
                ci_upper: percentile(&sorted, CI_UPPER_PERCENTILE),
            }),
            n_samples: n,
        }
    }
}

/// Drops missing values, `None` or NaN, and checks the rest lie in [0, 1].
pub fn retain_observed(values: &[Option<f64>]) -> Result<Vec<f64>, EstimateError> {
    let mut observed = Vec::with_capacity(values.len());
    for (index, value) in values.iter().enumerate() {
        let Some(value) = value.filter(|v| !v.is_nan()) else {
            continue;
        };
        if !(0.0..=1.0).contains(&value) {
            return Err(EstimateError::InvalidProbability { index, value });
        }
        observed.push(value);
    }
    Ok(observed)
}

/// Means of `iterations` resamples of `observed`, each drawn with replacement and of
/// the same size as `observed`.
fn resampled_means<R: Rng>(observed: &[f64], iterations: usize, rng: &mut R) -> Array1<f64> {
    let n = observed.len();
    let inv_n = 1.0 / n as f64;
    Array1::from_shape_fn(iterations, |_| {
        let mut sum = 0.0;
        for _ in 0..n {
            sum += observed[rng.gen_range(0..n)];
        }
        sum * inv_n
    })
}

/// Percentile `pct` (0–100) of an ascending slice, interpolating linearly between
/// the two nearest ranks.
///
/// # Panics
///
/// Panics if `sorted` is empty.
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    assert!(!sorted.is_empty(), "Cannot compute a percentile of an empty slice");
    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let lower = sorted[lo];
    lower + (sorted[hi] - lower) * (rank - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn estimator() -> BootstrapEstimator {
        BootstrapEstimator::new(DEFAULT_ITERATIONS).unwrap()
    }

    #[test]
    fn empty_input_is_undefined() {
        let mut rng = StdRng::seed_from_u64(1);
        let est = estimator().estimate(&[], &mut rng).unwrap();
        assert_eq!(est.mean(), None);
        assert_eq!(est.ci_lower(), None);
        assert_eq!(est.ci_upper(), None);
        assert_eq!(est.n_samples, 0);
    }

    #[test]
    fn all_missing_is_undefined() {
        let mut rng = StdRng::seed_from_u64(1);
        let est = estimator().estimate(&[None, None], &mut rng).unwrap();
        assert!(!est.is_defined());
        assert_eq!(est.n_samples, 0);
    }

    #[test]
    fn single_value_collapses_the_interval() {
        let mut rng = StdRng::seed_from_u64(7);
        let est = estimator().estimate(&[Some(0.7)], &mut rng).unwrap();
        let interval = est.interval.unwrap();
        assert_abs_diff_eq!(interval.mean, 0.7, epsilon = 1e-9);
        assert_eq!(interval.ci_lower, 0.7);
        assert_eq!(interval.ci_upper, 0.7);
        assert_eq!(est.n_samples, 1);
    }

    #[test]
    fn missing_values_are_ignored() {
        let with_missing = estimator()
            .estimate(&[Some(0.2), None, Some(0.8)], &mut StdRng::seed_from_u64(11))
            .unwrap();
        let without = estimator()
            .estimate(&[Some(0.2), Some(0.8)], &mut StdRng::seed_from_u64(11))
            .unwrap();
        assert_eq!(with_missing, without);
        assert_eq!(with_missing.n_samples, 2);
    }

    #[test]
    fn estimates_stay_in_range_and_bracket_the_mean() {
        let values: Vec<Option<f64>> = (0..40).map(|i| Some((i % 10) as f64 / 9.0)).collect();
        let mut rng = StdRng::seed_from_u64(3);
        let interval = estimator().estimate(&values, &mut rng).unwrap().interval.unwrap();
        assert!((0.0..=1.0).contains(&interval.mean));
        assert!(interval.ci_lower <= interval.mean);
        assert!(interval.mean <= interval.ci_upper);
        assert!(interval.ci_lower >= 0.0 && interval.ci_upper <= 1.0);
    }

    #[test]
    fn same_seed_gives_identical_results() {
        let values: Vec<Option<f64>> = (0..25).map(|i| Some(i as f64 / 24.0)).collect();
        let a = estimator().estimate(&values, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = estimator().estimate(&values, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a.interval.unwrap().mean.to_bits(), b.interval.unwrap().mean.to_bits());
        assert_eq!(a.interval.unwrap().ci_lower.to_bits(), b.interval.unwrap().ci_lower.to_bits());
        assert_eq!(a.interval.unwrap().ci_upper.to_bits(), b.interval.unwrap().ci_upper.to_bits());
    }

    #[test]
    fn different_seeds_agree_within_bootstrap_noise() {
        let values: Vec<Option<f64>> = (0..500).map(|i| Some((i % 5) as f64 / 4.0)).collect();
        let a = estimator().estimate(&values, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = estimator().estimate(&values, &mut StdRng::seed_from_u64(2)).unwrap();
        let (a, b) = (a.interval.unwrap(), b.interval.unwrap());
        assert_ne!(a.mean.to_bits(), b.mean.to_bits());
        assert_abs_diff_eq!(a.mean, b.mean, epsilon = 0.01);
        assert_abs_diff_eq!(a.ci_lower, b.ci_lower, epsilon = 0.02);
        assert_abs_diff_eq!(a.ci_upper, b.ci_upper, epsilon = 0.02);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = estimator()
            .estimate(&[Some(0.5), None, Some(1.5)], &mut rng)
            .unwrap_err();
        assert_eq!(err, EstimateError::InvalidProbability { index: 2, value: 1.5 });
        let err = estimator().estimate(&[Some(-0.1)], &mut rng).unwrap_err();
        assert_eq!(err, EstimateError::InvalidProbability { index: 0, value: -0.1 });
    }

    #[test]
    fn nan_counts_as_missing() {
        let with_nan = estimator()
            .estimate(&[Some(0.2), Some(f64::NAN), Some(0.8)], &mut StdRng::seed_from_u64(11))
            .unwrap();
        let without = estimator()
            .estimate(&[Some(0.2), Some(0.8)], &mut StdRng::seed_from_u64(11))
            .unwrap();
        assert_eq!(with_nan, without);
        assert_eq!(with_nan.n_samples, 2);

        let only_nan = estimator()
            .estimate(&[Some(f64::NAN)], &mut StdRng::seed_from_u64(1))
            .unwrap();
        assert!(!only_nan.is_defined());
    }

    #[test]
    fn single_values_are_bracketed_exactly() {
        for value in [0.0, 0.1, 0.3, 0.7, 0.9, 1.0] {
            for iterations in [1, 7, 300, 1000, 2500] {
                let est = BootstrapEstimator::new(iterations)
                    .unwrap()
                    .estimate(&[Some(value)], &mut StdRng::seed_from_u64(iterations as u64))
                    .unwrap();
                let interval = est.interval.unwrap();
                assert!(
                    interval.ci_lower <= interval.mean && interval.mean <= interval.ci_upper,
                    "value {value}, {iterations} iterations: {interval:?}"
                );
                assert_eq!(interval.mean, value);
            }
        }
    }

    #[test]
    fn constant_groups_are_bracketed_exactly() {
        let values = vec![Some(0.1); 7];
        let est = estimator()
            .estimate(&values, &mut StdRng::seed_from_u64(5))
            .unwrap();
        let interval = est.interval.unwrap();
        assert!(interval.ci_lower <= interval.mean && interval.mean <= interval.ci_upper);
    }

    #[test]
    fn zero_iterations_is_rejected() {
        assert_eq!(BootstrapEstimator::new(0), Err(EstimateError::ZeroIterations));
        assert_eq!(
            BootstrapConfig::seeded(0, 1).estimator(),
            Err(EstimateError::ZeroIterations)
        );
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 100.0), 5.0);
        assert_eq!(percentile(&sorted, 50.0), 3.0);
        assert_abs_diff_eq!(percentile(&sorted, 2.5), 1.1, epsilon = 1e-12);
        assert_abs_diff_eq!(percentile(&sorted, 97.5), 4.9, epsilon = 1e-12);
        assert_eq!(percentile(&[0.3], 97.5), 0.3);
    }
}
