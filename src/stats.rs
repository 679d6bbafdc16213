//! Summation with numerical stability guarantees.
//!
//! Rank sums are accumulated with compensated summation so that long
//! vectors of half-integral ranks add up without drift.

/// Neumaier compensated summation for O(ε) error independent of `n`.
///
/// An improved variant of Kahan summation that also handles the case
/// where the addend is larger in magnitude than the running sum.
///
/// Reference: Neumaier (1974), "Rundungsfehleranalyse einiger Verfahren
/// zur Summation endlicher Summen", *Zeitschrift für Angewandte
/// Mathematik und Mechanik* 54(1), pp. 39–51.
///
/// # Complexity
/// Time: O(n), Space: O(1)
///
/// # Returns
/// `0.0` for an empty slice; NaN if any element is NaN.
///
/// # Examples
/// ```
/// use u_ranktest::stats::kahan_sum;
/// assert_eq!(kahan_sum(&[1.0, 2.5, 2.5, 4.0]), 10.0);
/// ```
pub fn kahan_sum(data: &[f64]) -> f64 {
    let mut sum = 0.0_f64;
    let mut c = 0.0_f64;
    for &x in data {
        let t = sum + x;
        if sum.abs() >= x.abs() {
            c += (sum - t) + x;
        } else {
            c += (x - t) + sum;
        }
        sum = t;
    }
    sum + c
}
