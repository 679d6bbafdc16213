//! Natural ranking of real-valued data.
//!
//! Assigns each value its 1-based position in ascending order, with two
//! independent policies:
//!
//! | Policy | Variants | Default |
//! |---|---|---|
//! | [`NanStrategy`] | minimal, maximal, removed, fixed, failed | fixed |
//! | [`TiesStrategy`] | sequential, minimum, maximum, average, random | average |
//!
//! # Algorithm
//!
//! Stable sort of `(value, position)` pairs, sequential ranks `1..=n`,
//! then every maximal run of equal values is resolved by the ties policy
//! and the ranks are written back in the original order. Numbers follow
//! the IEEE total order (`-0.0` sorts below `0.0`); NaN compares above
//! every number and equal to other NaNs.
//!
//! Time: O(n log n), Space: O(n).
//!
//! # Examples
//!
//! ```
//! use u_ranktest::ranking::{NaturalRanking, Ranking};
//!
//! let ranks = NaturalRanking::default().rank(&[10.0, 20.0, 20.0, 30.0]).unwrap();
//! assert_eq!(ranks, vec![1.0, 2.5, 2.5, 4.0]);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::trace;

use crate::random::{create_rng, uniform_rank, DEFAULT_SEED};

/// Error raised by a ranking or while parsing its configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankingError {
    /// A NaN was found and the NaN policy is [`NanStrategy::Failed`].
    #[error("value at index {index} is NaN and missing values are rejected")]
    InvalidValue { index: usize },
    /// A strategy name did not match any known variant.
    #[error("unknown ranking strategy `{0}`")]
    UnknownStrategy(String),
}

/// Converts a sequence of values into ranks.
///
/// Implementations must be pure with respect to `&self`: the same input
/// always yields the same output. The `Send + Sync` bound lets one
/// instance serve concurrent callers.
pub trait Ranking: Send + Sync {
    /// Ranks `data`, returning one rank per retained value in input order.
    fn rank(&self, data: &[f64]) -> Result<Vec<f64>, RankingError>;
}

// ============================================================================
// Strategies
// ============================================================================

/// Treatment of NaN values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum NanStrategy {
    /// NaNs are treated as −∞.
    Minimal,
    /// NaNs are treated as +∞.
    Maximal,
    /// NaNs are dropped; the output is shorter than the input.
    Removed,
    /// NaNs stay in place and are ranked NaN.
    #[default]
    Fixed,
    /// Any NaN is an error.
    Failed,
}

/// Treatment of runs of equal values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TiesStrategy {
    /// Ranks are assigned in order of appearance.
    Sequential,
    /// Every member receives the lowest rank of the run.
    Minimum,
    /// Every member receives the highest rank of the run.
    Maximum,
    /// Every member receives the mean rank of the run.
    #[default]
    Average,
    /// Every member receives an independent uniform integral rank from the run.
    Random,
}

impl NanStrategy {
    pub const ALL: [NanStrategy; 5] = [
        NanStrategy::Minimal,
        NanStrategy::Maximal,
        NanStrategy::Removed,
        NanStrategy::Fixed,
        NanStrategy::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NanStrategy::Minimal => "minimal",
            NanStrategy::Maximal => "maximal",
            NanStrategy::Removed => "removed",
            NanStrategy::Fixed => "fixed",
            NanStrategy::Failed => "failed",
        }
    }
}

impl TiesStrategy {
    pub const ALL: [TiesStrategy; 5] = [
        TiesStrategy::Sequential,
        TiesStrategy::Minimum,
        TiesStrategy::Maximum,
        TiesStrategy::Average,
        TiesStrategy::Random,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TiesStrategy::Sequential => "sequential",
            TiesStrategy::Minimum => "minimum",
            TiesStrategy::Maximum => "maximum",
            TiesStrategy::Average => "average",
            TiesStrategy::Random => "random",
        }
    }
}

impl fmt::Display for NanStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TiesStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NanStrategy {
    type Err = RankingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        NanStrategy::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| RankingError::UnknownStrategy(s.to_string()))
    }
}

impl FromStr for TiesStrategy {
    type Err = RankingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        TiesStrategy::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| RankingError::UnknownStrategy(s.to_string()))
    }
}

/// Ranking configuration.
///
/// `seed` only affects [`TiesStrategy::Random`]; without one,
/// [`DEFAULT_SEED`] is used so rankings stay reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RankingConfig {
    pub nan_strategy: NanStrategy,
    pub ties_strategy: TiesStrategy,
    pub seed: Option<u64>,
}

// ============================================================================
// Natural Ranking
// ============================================================================

/// Ranking by natural (ascending numeric) order.
///
/// Immutable once built; share one instance freely between callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NaturalRanking {
    config: RankingConfig,
}

impl NaturalRanking {
    pub fn new(nan_strategy: NanStrategy, ties_strategy: TiesStrategy) -> Self {
        Self::from_config(RankingConfig {
            nan_strategy,
            ties_strategy,
            seed: None,
        })
    }

    pub fn from_config(config: RankingConfig) -> Self {
        Self { config }
    }

    /// Returns a copy that seeds randomized tie breaking with `seed`.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    pub fn nan_strategy(&self) -> NanStrategy {
        self.config.nan_strategy
    }

    pub fn ties_strategy(&self) -> TiesStrategy {
        self.config.ties_strategy
    }

    /// Applies the NaN policy to `(value, position)` pairs.
    ///
    /// Returns the positions that must be restored to NaN afterwards.
    fn apply_nan_strategy(
        &self,
        pairs: &mut Vec<(f64, usize)>,
    ) -> Result<Vec<usize>, RankingError> {
        match self.config.nan_strategy {
            NanStrategy::Minimal => recode_nans(pairs, f64::NEG_INFINITY),
            NanStrategy::Maximal => recode_nans(pairs, f64::INFINITY),
            NanStrategy::Removed => {
                pairs.retain(|(v, _)| !v.is_nan());
                for (i, pair) in pairs.iter_mut().enumerate() {
                    pair.1 = i;
                }
            }
            NanStrategy::Fixed => {
                return Ok(pairs
                    .iter()
                    .filter(|(v, _)| v.is_nan())
                    .map(|&(_, i)| i)
                    .collect());
            }
            NanStrategy::Failed => {
                if let Some(&(_, index)) = pairs.iter().find(|(v, _)| v.is_nan()) {
                    return Err(RankingError::InvalidValue { index });
                }
            }
        }
        Ok(Vec::new())
    }
}

impl Ranking for NaturalRanking {
    fn rank(&self, data: &[f64]) -> Result<Vec<f64>, RankingError> {
        let mut pairs: Vec<(f64, usize)> = data.iter().copied().zip(0..).collect();
        let nan_positions = self.apply_nan_strategy(&mut pairs)?;

        // `sort_by` is stable: equal values keep their input order.
        pairs.sort_by(|a, b| compare_values(a.0, b.0));

        let n = pairs.len();
        let mut ranks = vec![0.0; n];
        let mut rng = (self.config.ties_strategy == TiesStrategy::Random)
            .then(|| create_rng(self.config.seed.unwrap_or(DEFAULT_SEED)));

        let mut runs = 0_usize;
        let mut start = 0;
        while start < n {
            let mut end = start + 1;
            while end < n && compare_values(pairs[end].0, pairs[start].0) == Ordering::Equal {
                end += 1;
            }
            let first = start + 1;
            let last = end;
            for (offset, &(_, position)) in pairs[start..end].iter().enumerate() {
                ranks[position] = match self.config.ties_strategy {
                    TiesStrategy::Sequential => (first + offset) as f64,
                    TiesStrategy::Minimum => first as f64,
                    TiesStrategy::Maximum => last as f64,
                    TiesStrategy::Average => (first + last) as f64 / 2.0,
                    TiesStrategy::Random => match rng.as_mut() {
                        Some(rng) => uniform_rank(first, last, rng),
                        None => first as f64,
                    },
                };
            }
            if end - start > 1 {
                runs += 1;
            }
            start = end;
        }

        for position in nan_positions {
            ranks[position] = f64::NAN;
        }

        trace!(
            len = data.len(),
            ranked = n,
            tied_runs = runs,
            nan_strategy = %self.config.nan_strategy,
            ties_strategy = %self.config.ties_strategy,
            "ranked values"
        );
        Ok(ranks)
    }
}

impl<R: Ranking + ?Sized> Ranking for &R {
    fn rank(&self, data: &[f64]) -> Result<Vec<f64>, RankingError> {
        (**self).rank(data)
    }
}

fn recode_nans(pairs: &mut [(f64, usize)], value: f64) {
    for pair in pairs.iter_mut().filter(|(v, _)| v.is_nan()) {
        pair.0 = value;
    }
}

/// Ascending order with NaN above every number and equal to other NaNs.
///
/// Numbers follow the IEEE total order, so signed zeros do not tie.
fn compare_values(a: f64, b: f64) -> Ordering {
    if a.is_nan() || b.is_nan() {
        return a.is_nan().cmp(&b.is_nan());
    }
    // -0.0 sorts strictly below 0.0.
    a.total_cmp(&b)
}
