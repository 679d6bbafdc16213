//! Probability distributions.
//!
//! The normal distribution used for asymptotic significance levels, and
//! the error type shared by every numerical routine that evaluates a
//! distribution function.

use thiserror::Error;

use crate::special;

/// Error raised while constructing or evaluating a distribution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistributionError {
    /// Parameters violate distribution constraints.
    #[error("invalid distribution parameters: {0}")]
    InvalidParameters(String),
    /// An iterative evaluation did not reach its tolerance.
    #[error("{function} failed to converge within {iterations} iterations")]
    ConvergenceFailure {
        function: &'static str,
        iterations: usize,
    },
}

// ============================================================================
// Normal Distribution
// ============================================================================

/// Normal (Gaussian) distribution N(μ, σ²).
///
/// # Mathematical Definition
/// - CDF: Φ((x−μ)/σ) (via the standard normal CDF)
/// - Mean: μ
/// - Variance: σ²
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normal {
    mu: f64,
    sigma: f64,
}

impl Normal {
    /// Creates a new normal distribution N(μ, σ).
    ///
    /// # Errors
    /// Returns `Err` if `sigma ≤ 0` or parameters are not finite.
    pub fn new(mu: f64, sigma: f64) -> Result<Self, DistributionError> {
        if !mu.is_finite() || !sigma.is_finite() || sigma <= 0.0 {
            return Err(DistributionError::InvalidParameters(format!(
                "Normal requires finite μ and σ > 0, got μ={mu}, σ={sigma}"
            )));
        }
        Ok(Self { mu, sigma })
    }

    /// The standard normal N(0, 1).
    pub fn standard() -> Self {
        Self {
            mu: 0.0,
            sigma: 1.0,
        }
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn mean(&self) -> f64 {
        self.mu
    }

    pub fn variance(&self) -> f64 {
        self.sigma * self.sigma
    }

    /// CDF: Φ((x−μ)/σ).
    ///
    /// Deviations beyond 40σ saturate to 0 or 1.
    ///
    /// # Errors
    /// [`DistributionError::ConvergenceFailure`] if the underlying
    /// incomplete gamma evaluation does not converge.
    pub fn cdf(&self, x: f64) -> Result<f64, DistributionError> {
        special::standard_normal_cdf((x - self.mu) / self.sigma)
    }
}

impl Default for Normal {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// Tests
// ============================================================================
