//! # u-ranktest
//!
//! Mann-Whitney U rank-sum test for the U-Engine ecosystem.
//!
//! Compares two independent samples without assuming normality: the
//! samples are pooled, ranked with tie averaging, reduced to rank sums and
//! U statistics, and tested with the normal approximation.
//!
//! ## Modules
//!
//! - [`mann_whitney`] — The test pipeline and its result record
//! - [`ranking`] — Natural ranking with configurable tie and NaN policies
//! - [`special`] — Incomplete gamma, error function, normal CDF
//! - [`distributions`] — Normal distribution and numerical error type
//! - [`stats`] — Compensated summation
//! - [`random`] — Seeded RNG for randomized tie breaking
//!
//! ## Design Philosophy
//!
//! - **Typed errors**: every failure is a variant the caller can match;
//!   nothing is logged or retried internally
//! - **Swappable ranking**: the test is generic over [`ranking::Ranking`]
//! - **Property-based testing**: rank-sum and U invariants verified via proptest
//!
//! ## Example
//!
//! ```
//! use u_ranktest::mann_whitney_u_test;
//!
//! let r = mann_whitney_u_test(&[1.0, 1.0, 1.0], &[1.0, 1.0, 1.0]).unwrap();
//! assert_eq!(r.u_min, 4.5);
//! assert_eq!(r.p_value, 1.0);
//! ```

pub mod distributions;
pub mod mann_whitney;
pub mod random;
pub mod ranking;
pub mod special;
pub mod stats;

pub use mann_whitney::{
    asymptotic_p_value, mann_whitney_u_test, MannWhitneyError, MannWhitneyResult,
    MannWhitneyStatistics, MannWhitneyUTest,
};
pub use ranking::{NanStrategy, NaturalRanking, Ranking, RankingConfig, RankingError, TiesStrategy};
