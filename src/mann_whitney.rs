//! Mann-Whitney U test (Wilcoxon rank-sum test).
//!
//! H₀: both samples are drawn from the same distribution.
//!
//! # Pipeline
//!
//! 1. Validate: both samples present and non-empty.
//! 2. Pool: `x` followed by `y`; index `i < n₁` belongs to `x`.
//! 3. Rank the pooled values (natural ranking, average ties, NaN fixed).
//! 4. R₁ = Σ ranks of `x`, U₁ = R₁ − n₁(n₁+1)/2, U₂ = n₁n₂ − U₁,
//!    R₂ = U₂ + n₂(n₂+1)/2.
//! 5. Normal approximation on U_min = min(U₁, U₂):
//!    z = (U_min − n₁n₂/2) / √(n₁n₂(n₁+n₂+1)/12), p = 2·Φ(z).
//!
//! The variance carries no tie correction and no continuity correction is
//! applied. Because U_min is the smaller statistic, z ≤ 0 and 2·Φ(z) is
//! the two-sided p-value.
//!
//! # References
//!
//! - Mann & Whitney (1947). "On a test of whether one of two random
//!   variables is stochastically larger than the other". Annals of
//!   Mathematical Statistics, 18(1), 50–60.
//!
//! # Examples
//!
//! ```
//! use u_ranktest::mann_whitney::mann_whitney_u_test;
//!
//! let x = [1.0, 2.0, 3.0];
//! let y = [4.0, 5.0, 6.0];
//! let r = mann_whitney_u_test(&x, &y).unwrap();
//! assert_eq!(r.u1, 0.0);
//! assert_eq!(r.u2, 9.0);
//! assert!(r.p_value < 0.05);
//! ```

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, trace};

use crate::distributions::{DistributionError, Normal};
use crate::ranking::{NaturalRanking, Ranking, RankingError};
use crate::stats::kahan_sum;

/// Error raised by the Mann-Whitney U test.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MannWhitneyError {
    /// A sample was not supplied.
    #[error("sample is missing")]
    NullInput,
    /// A sample has no observations.
    #[error("sample has no observations")]
    EmptyInput,
    /// The ranking rejected the pooled data.
    #[error(transparent)]
    Ranking(#[from] RankingError),
    /// The ranking did not return one rank per pooled value.
    #[error("ranking returned {actual} ranks for {expected} pooled values")]
    RankLengthMismatch { expected: usize, actual: usize },
    /// The normal CDF could not be evaluated.
    #[error("p-value computation failed: {0}")]
    DistributionComputation(#[from] DistributionError),
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Rank sums and U statistics for two samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MannWhitneyStatistics {
    pub n1: usize,
    pub n2: usize,
    /// U statistic of `x`.
    pub u1: f64,
    /// U statistic of `y`; `u1 + u2 = n1·n2`.
    pub u2: f64,
    /// Rank sum of `x`.
    pub r1: f64,
    /// Rank sum of `y`.
    pub r2: f64,
    pub mean_rank1: f64,
    pub mean_rank2: f64,
}

impl MannWhitneyStatistics {
    /// The smaller of the two U statistics.
    pub fn u_min(&self) -> f64 {
        self.u1.min(self.u2)
    }
}

/// Full result of the Mann-Whitney U test.
///
/// Fields are declared in key order (`R1, R2, U1, U2, Umin, meanr1,
/// meanr2, n1, n2, p`) so every presentation of the record, including
/// serialization, is deterministic.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MannWhitneyResult {
    #[cfg_attr(feature = "serde", serde(rename = "R1"))]
    pub r1: f64,
    #[cfg_attr(feature = "serde", serde(rename = "R2"))]
    pub r2: f64,
    #[cfg_attr(feature = "serde", serde(rename = "U1"))]
    pub u1: f64,
    #[cfg_attr(feature = "serde", serde(rename = "U2"))]
    pub u2: f64,
    #[cfg_attr(feature = "serde", serde(rename = "Umin"))]
    pub u_min: f64,
    #[cfg_attr(feature = "serde", serde(rename = "meanr1"))]
    pub mean_rank1: f64,
    #[cfg_attr(feature = "serde", serde(rename = "meanr2"))]
    pub mean_rank2: f64,
    pub n1: usize,
    pub n2: usize,
    /// Two-sided asymptotic p-value.
    #[cfg_attr(feature = "serde", serde(rename = "p"))]
    pub p_value: f64,
}

impl MannWhitneyResult {
    /// Statistic names in presentation order.
    pub const KEYS: [&'static str; 10] = [
        "R1", "R2", "U1", "U2", "Umin", "meanr1", "meanr2", "n1", "n2", "p",
    ];

    fn from_statistics(stats: MannWhitneyStatistics, u_min: f64, p_value: f64) -> Self {
        Self {
            r1: stats.r1,
            r2: stats.r2,
            u1: stats.u1,
            u2: stats.u2,
            u_min,
            mean_rank1: stats.mean_rank1,
            mean_rank2: stats.mean_rank2,
            n1: stats.n1,
            n2: stats.n2,
            p_value,
        }
    }

    /// Looks up a statistic by name (`"U1"`, `"meanr2"`, `"p"`, ...).
    pub fn get(&self, key: &str) -> Option<f64> {
        let value = match key {
            "R1" => self.r1,
            "R2" => self.r2,
            "U1" => self.u1,
            "U2" => self.u2,
            "Umin" => self.u_min,
            "meanr1" => self.mean_rank1,
            "meanr2" => self.mean_rank2,
            "n1" => self.n1 as f64,
            "n2" => self.n2 as f64,
            "p" => self.p_value,
            _ => return None,
        };
        Some(value)
    }

    /// Iterates `(name, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        Self::KEYS
            .into_iter()
            .filter_map(move |key| self.get(key).map(|v| (key, v)))
    }

    /// The record as a sorted name → value map.
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        self.iter().collect()
    }

    /// The rank statistics without the significance fields.
    pub fn statistics(&self) -> MannWhitneyStatistics {
        MannWhitneyStatistics {
            n1: self.n1,
            n2: self.n2,
            u1: self.u1,
            u2: self.u2,
            r1: self.r1,
            r2: self.r2,
            mean_rank1: self.mean_rank1,
            mean_rank2: self.mean_rank2,
        }
    }
}

// ---------------------------------------------------------------------------
// Test
// ---------------------------------------------------------------------------

/// Mann-Whitney U test bound to a ranking.
///
/// The ranking is fixed at construction; one instance can serve any
/// number of calls, including concurrent ones when `R: Sync`.
#[derive(Debug, Clone, Default)]
pub struct MannWhitneyUTest<R = NaturalRanking> {
    ranking: R,
}

impl MannWhitneyUTest<NaturalRanking> {
    /// Test with natural ranking, average ties and NaNs kept in place.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: Ranking> MannWhitneyUTest<R> {
    /// Test using a custom ranking.
    pub fn with_ranking(ranking: R) -> Self {
        Self { ranking }
    }

    pub fn ranking(&self) -> &R {
        &self.ranking
    }

    /// Runs the test on two samples.
    ///
    /// # Errors
    /// - [`MannWhitneyError::EmptyInput`] if either sample is empty.
    /// - [`MannWhitneyError::Ranking`] / [`MannWhitneyError::RankLengthMismatch`]
    ///   if the ranking rejects or drops values.
    /// - [`MannWhitneyError::DistributionComputation`] if the normal CDF
    ///   fails to converge.
    pub fn test(&self, x: &[f64], y: &[f64]) -> Result<MannWhitneyResult, MannWhitneyError> {
        self.test_optional(Some(x), Some(y))
    }

    /// Runs the test on samples that may be absent.
    ///
    /// # Errors
    /// [`MannWhitneyError::NullInput`] if either sample is `None`, checked
    /// before emptiness; otherwise as [`test`](Self::test).
    ///
    /// # Examples
    /// ```
    /// use u_ranktest::mann_whitney::{MannWhitneyError, MannWhitneyUTest};
    ///
    /// let test = MannWhitneyUTest::new();
    /// let err = test.test_optional(None, Some(&[1.0, 2.0])).unwrap_err();
    /// assert_eq!(err, MannWhitneyError::NullInput);
    /// ```
    pub fn test_optional(
        &self,
        x: Option<&[f64]>,
        y: Option<&[f64]>,
    ) -> Result<MannWhitneyResult, MannWhitneyError> {
        let (x, y) = ensure_data_conformance(x, y)?;

        let stats = self.statistics(x, y)?;
        let u_min = stats.u_min();
        let p_value = asymptotic_p_value(u_min, stats.n1, stats.n2)?;

        Ok(MannWhitneyResult::from_statistics(stats, u_min, p_value))
    }

    /// Computes rank sums and U statistics without the p-value.
    ///
    /// # Errors
    /// As [`test`](Self::test), minus the distribution failure.
    pub fn statistics(
        &self,
        x: &[f64],
        y: &[f64],
    ) -> Result<MannWhitneyStatistics, MannWhitneyError> {
        let (x, y) = ensure_data_conformance(Some(x), Some(y))?;

        let pooled = concatenate_samples(x, y);
        trace!(n1 = x.len(), n2 = y.len(), "pooled samples");

        let ranks = self.ranking.rank(&pooled)?;
        if ranks.len() != pooled.len() {
            return Err(MannWhitneyError::RankLengthMismatch {
                expected: pooled.len(),
                actual: ranks.len(),
            });
        }

        let n1 = x.len() as f64;
        let n2 = y.len() as f64;

        let r1 = kahan_sum(&ranks[..x.len()]);
        let u1 = r1 - n1 * (n1 + 1.0) / 2.0;
        let u2 = n1 * n2 - u1;
        let r2 = u2 + n2 * (n2 + 1.0) / 2.0;

        debug!(n1 = x.len(), n2 = y.len(), r1, r2, u1, u2, "rank statistics");

        Ok(MannWhitneyStatistics {
            n1: x.len(),
            n2: y.len(),
            u1,
            u2,
            r1,
            r2,
            mean_rank1: r1 / n1,
            mean_rank2: r2 / n2,
        })
    }
}

/// Runs the Mann-Whitney U test with the default ranking.
///
/// # Errors
/// See [`MannWhitneyUTest::test`].
pub fn mann_whitney_u_test(x: &[f64], y: &[f64]) -> Result<MannWhitneyResult, MannWhitneyError> {
    MannWhitneyUTest::new().test(x, y)
}

/// Two-sided asymptotic p-value for the smaller U statistic.
///
/// ```text
/// E[U] = n₁n₂/2,  Var[U] = n₁n₂(n₁+n₂+1)/12,  z = (U_min − E[U]) / √Var[U]
/// p = 2·Φ(z)
/// ```
///
/// `u_min` must be `min(U₁, U₂)`; for a larger value z is positive and
/// the result exceeds 1.
///
/// # Errors
/// [`DistributionError::ConvergenceFailure`] if Φ cannot be evaluated.
///
/// # Examples
/// ```
/// use u_ranktest::mann_whitney::asymptotic_p_value;
/// // U_min at its expectation gives p = 1
/// assert_eq!(asymptotic_p_value(4.5, 3, 3).unwrap(), 1.0);
/// ```
pub fn asymptotic_p_value(u_min: f64, n1: usize, n2: usize) -> Result<f64, DistributionError> {
    let n1n2 = n1 as f64 * n2 as f64;

    let expected = n1n2 / 2.0;
    let variance = n1n2 * (n1 as f64 + n2 as f64 + 1.0) / 12.0;

    let z = (u_min - expected) / variance.sqrt();
    let p_value = 2.0 * Normal::standard().cdf(z)?;

    debug!(u_min, z, p_value, "asymptotic p-value");
    Ok(p_value)
}

// ---------------------------------------------------------------------------
// Pipeline steps
// ---------------------------------------------------------------------------

fn ensure_data_conformance<'a>(
    x: Option<&'a [f64]>,
    y: Option<&'a [f64]>,
) -> Result<(&'a [f64], &'a [f64]), MannWhitneyError> {
    let (Some(x), Some(y)) = (x, y) else {
        return Err(MannWhitneyError::NullInput);
    };
    if x.is_empty() || y.is_empty() {
        return Err(MannWhitneyError::EmptyInput);
    }
    Ok((x, y))
}

fn concatenate_samples(x: &[f64], y: &[f64]) -> Vec<f64> {
    let mut pooled = Vec::with_capacity(x.len() + y.len());
    pooled.extend_from_slice(x);
    pooled.extend_from_slice(y);
    pooled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::{NanStrategy, TiesStrategy};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_separated_samples() {
        let r = mann_whitney_u_test(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
        assert_eq!(r.n1, 3);
        assert_eq!(r.n2, 3);
        assert_eq!(r.r1, 6.0);
        assert_eq!(r.r2, 15.0);
        assert_eq!(r.u1, 0.0);
        assert_eq!(r.u2, 9.0);
        assert_eq!(r.u_min, 0.0);
        assert_eq!(r.mean_rank1, 2.0);
        assert_eq!(r.mean_rank2, 5.0);
        // z = -4.5 / √5.25
        assert_abs_diff_eq!(r.p_value, 0.049533, epsilon = 1e-4);
    }

    #[test]
    fn test_all_tied_gives_p_one() {
        let r = mann_whitney_u_test(&[1.0, 1.0, 1.0], &[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(r.r1, 10.5);
        assert_eq!(r.r2, 10.5);
        assert_eq!(r.u1, 4.5);
        assert_eq!(r.u2, 4.5);
        assert_eq!(r.u_min, 4.5);
        assert_eq!(r.mean_rank1, 3.5);
        assert_eq!(r.p_value, 1.0);
    }

    #[test]
    fn test_single_element_sample() {
        let r = mann_whitney_u_test(&[5.0], &[1.0, 2.0, 3.0, 4.0, 6.0]).unwrap();
        assert_eq!(r.n1, 1);
        assert_eq!(r.n2, 5);
        assert_eq!(r.r1, 5.0);
        assert_eq!(r.u1, 4.0);
        assert_eq!(r.u2, 1.0);
        assert_eq!(r.r2, 16.0);
        assert_eq!(r.mean_rank1, 5.0);
        assert_eq!(r.mean_rank2, 3.2);
        assert_eq!(r.u_min, 1.0);
        // z = -1.5 / √(35/12)
        assert_abs_diff_eq!(r.p_value, 0.37976, epsilon = 1e-3);
    }

    #[test]
    fn test_empty_sample_rejected() {
        let err = mann_whitney_u_test(&[], &[1.0, 2.0]).unwrap_err();
        assert_eq!(err, MannWhitneyError::EmptyInput);
        let err = mann_whitney_u_test(&[1.0], &[]).unwrap_err();
        assert_eq!(err, MannWhitneyError::EmptyInput);
    }

    #[test]
    fn test_missing_sample_rejected() {
        let test = MannWhitneyUTest::new();
        assert_eq!(
            test.test_optional(None, Some(&[1.0, 2.0])).unwrap_err(),
            MannWhitneyError::NullInput
        );
        assert_eq!(
            test.test_optional(Some(&[1.0]), None).unwrap_err(),
            MannWhitneyError::NullInput
        );
        // Absence wins over emptiness.
        assert_eq!(
            test.test_optional(None, Some(&[])).unwrap_err(),
            MannWhitneyError::NullInput
        );
    }

    #[test]
    fn test_validation_precedes_ranking() {
        // A ranking that rejects everything must never be reached.
        let ranking = NaturalRanking::new(NanStrategy::Failed, TiesStrategy::Average);
        let test = MannWhitneyUTest::with_ranking(ranking);
        let err = test.test(&[], &[f64::NAN]).unwrap_err();
        assert_eq!(err, MannWhitneyError::EmptyInput);
    }

    #[test]
    fn test_swapping_samples() {
        let x = [1.2, 3.4, 3.4, 0.5, 7.0];
        let y = [2.2, 3.4, 9.1];
        let a = mann_whitney_u_test(&x, &y).unwrap();
        let b = mann_whitney_u_test(&y, &x).unwrap();
        assert_eq!(a.u1, b.u2);
        assert_eq!(a.u2, b.u1);
        assert_eq!(a.r1, b.r2);
        assert_eq!(a.r2, b.r1);
        assert_eq!(a.u_min, b.u_min);
        assert_eq!(a.p_value, b.p_value);
    }

    #[test]
    fn test_statistics_only() {
        let test = MannWhitneyUTest::new();
        let stats = test.statistics(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
        assert_eq!(stats.u_min(), 0.0);
        let full = test.test(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
        assert_eq!(full.statistics(), stats);
        assert_eq!(
            test.statistics(&[1.0], &[]).unwrap_err(),
            MannWhitneyError::EmptyInput
        );
    }

    #[test]
    fn test_nan_in_first_sample_propagates() {
        let r = mann_whitney_u_test(&[1.0, f64::NAN], &[2.0, 3.0]).unwrap();
        assert!(r.r1.is_nan());
        assert!(r.u1.is_nan());
        assert!(r.p_value.is_nan());
    }

    #[test]
    fn test_nan_in_second_sample_keeps_first_ranks() {
        // Pooled ranks: [1, 2, NaN, 3]
        let r = mann_whitney_u_test(&[1.0, 2.0], &[f64::NAN, 3.0]).unwrap();
        assert_eq!(r.r1, 3.0);
        assert_eq!(r.u1, 0.0);
        assert_eq!(r.u2, 4.0);
        assert_eq!(r.r2, 7.0);
        assert!(r.p_value.is_finite());
    }

    #[test]
    fn test_failed_nan_strategy_surfaces_ranking_error() {
        let ranking = NaturalRanking::new(NanStrategy::Failed, TiesStrategy::Average);
        let err = MannWhitneyUTest::with_ranking(ranking)
            .test(&[1.0, f64::NAN], &[2.0])
            .unwrap_err();
        assert_eq!(
            err,
            MannWhitneyError::Ranking(RankingError::InvalidValue { index: 1 })
        );
    }

    #[test]
    fn test_removed_nan_strategy_breaks_alignment() {
        let ranking = NaturalRanking::new(NanStrategy::Removed, TiesStrategy::Average);
        let test = MannWhitneyUTest::with_ranking(ranking);
        let err = test.test(&[1.0, f64::NAN], &[2.0]).unwrap_err();
        assert_eq!(
            err,
            MannWhitneyError::RankLengthMismatch {
                expected: 3,
                actual: 2
            }
        );
        // Without NaNs the removal policy is harmless.
        assert!(test.test(&[1.0, 4.0], &[2.0]).is_ok());
    }

    #[test]
    fn test_custom_ranking() {
        // Descending ranks mirror every statistic.
        struct Descending;
        impl Ranking for Descending {
            fn rank(&self, data: &[f64]) -> Result<Vec<f64>, RankingError> {
                let n = data.len() as f64;
                let ascending = NaturalRanking::default().rank(data)?;
                Ok(ascending.into_iter().map(|r| n + 1.0 - r).collect())
            }
        }
        let r = MannWhitneyUTest::with_ranking(Descending)
            .test(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0])
            .unwrap();
        assert_eq!(r.r1, 15.0);
        assert_eq!(r.u1, 9.0);
        assert_eq!(r.u2, 0.0);
        assert_eq!(r.u_min, 0.0);
    }

    #[test]
    fn test_record_keys_in_order() {
        let r = mann_whitney_u_test(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
        let keys: Vec<&str> = r.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, MannWhitneyResult::KEYS.to_vec());
        let map = r.to_map();
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), keys);
        assert_eq!(map["U2"], 9.0);
        assert_eq!(r.get("n1"), Some(3.0));
        assert_eq!(r.get("p"), Some(r.p_value));
        assert_eq!(r.get("W"), None);
    }

    #[test]
    fn test_asymptotic_p_value_direct() {
        assert_eq!(asymptotic_p_value(4.5, 3, 3).unwrap(), 1.0);
        let p = asymptotic_p_value(0.0, 3, 3).unwrap();
        assert_abs_diff_eq!(p, 0.049533, epsilon = 1e-4);
        // Far tail saturates instead of failing.
        assert_eq!(asymptotic_p_value(0.0, 100_000, 100_000).unwrap(), 0.0);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(MannWhitneyError::NullInput.to_string(), "sample is missing");
        let err = MannWhitneyError::from(RankingError::InvalidValue { index: 3 });
        assert_eq!(
            err.to_string(),
            "value at index 3 is NaN and missing values are rejected"
        );
        let err = MannWhitneyError::from(DistributionError::ConvergenceFailure {
            function: "regularized gamma series",
            iterations: 10_000,
        });
        assert!(err.to_string().starts_with("p-value computation failed"));
    }

    #[test]
    fn test_convergence_failure_wrapped() {
        let cause = crate::special::regularized_lower_gamma(1e8, 1e8).unwrap_err();
        let err = MannWhitneyError::from(cause.clone());
        assert_eq!(err, MannWhitneyError::DistributionComputation(cause));
        assert!(err.to_string().starts_with("p-value computation failed"));
    }

    #[test]
    fn test_negative_zero_ranks_below_zero() {
        let r = mann_whitney_u_test(&[0.0], &[-0.0]).unwrap();
        assert_eq!(r.r1, 2.0);
        assert_eq!(r.r2, 1.0);
        assert_eq!(r.u1, 1.0);
        assert_eq!(r.u2, 0.0);
        assert_eq!(r.u_min, 0.0);
    }

    #[test]
    fn test_shared_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MannWhitneyUTest>();

        let test = MannWhitneyUTest::new();
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|k| {
                    let test = &test;
                    s.spawn(move || {
                        let x: Vec<f64> = (0..10).map(|i| (i + k) as f64).collect();
                        test.test(&x, &[3.0, 4.0, 20.0]).unwrap()
                    })
                })
                .collect();
            for h in handles {
                let r = h.join().unwrap();
                assert_eq!(r.u1 + r.u2, 30.0);
            }
        });
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_result_serializes_in_key_order() {
        let r = mann_whitney_u_test(&[1.0, 1.0, 1.0], &[1.0, 1.0, 1.0]).unwrap();
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(
            json,
            r#"{"R1":10.5,"R2":10.5,"U1":4.5,"U2":4.5,"Umin":4.5,"meanr1":3.5,"meanr2":3.5,"n1":3,"n2":3,"p":1.0}"#
        );
    }
}
