//! Distribution engine: binomial CDF and chi-square goodness-of-fit
//!
//! Built on `special`. The goodness-of-fit test assumes a uniform null:
//! every category is expected to receive `total / category_count`
//! observations.

use crate::error::{QcError, Result};
use crate::special;
use std::collections::BTreeMap;

/// Observed counts keyed by category index; absent keys mean zero
pub type CategoryCounts = BTreeMap<usize, u64>;

/// P(X <= x) for X ~ Binomial(n, p), rounded to 5 decimal places
///
/// Uses P(X <= x) = 1 - I_p(x + 1, n - x). The rounding is part of the
/// contract: downstream threshold comparisons rely on it.
///
/// # Errors
/// - `InvalidSampleSize` when `n <= 0`
/// - `InvalidProbability` when `p` is outside [0, 1] or NaN
/// - `DidNotConverge` if the incomplete beta fails to converge
///
/// # Example
/// ```
/// use screener::distribution::binomial_cdf;
///
/// assert_eq!(binomial_cdf(-1, 10, 0.5).unwrap(), 0.0);
/// assert_eq!(binomial_cdf(10, 10, 0.5).unwrap(), 1.0);
/// assert!((binomial_cdf(5, 10, 0.5).unwrap() - 0.62305).abs() < 1e-4);
/// ```
pub fn binomial_cdf(x: i64, n: i64, p: f64) -> Result<f64> {
    if n <= 0 {
        return Err(QcError::InvalidSampleSize(n));
    }
    if !(0.0..=1.0).contains(&p) {
        return Err(QcError::InvalidProbability(p));
    }
    if x < 0 {
        return Ok(0.0);
    }
    if x >= n {
        return Ok(1.0);
    }

    let successes = (x + 1) as f64;
    let failures = (n - x) as f64;
    let beta_cdf = special::incomplete_beta(p, successes, failures)?;

    Ok(round_to_places(1.0 - beta_cdf, 5))
}

fn round_to_places(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Chi-square statistic of `counts` against a uniform expectation
///
/// Sums `(observed - expected)^2 / expected` over categories
/// `0..category_count`; categories missing from `counts` contribute
/// `expected`.
///
/// # Errors
/// `InsufficientData` when `category_count` or `total` is zero (the
/// expected count would be zero).
pub fn chi_square_statistic(
    counts: &CategoryCounts,
    total: u64,
    category_count: usize,
) -> Result<f64> {
    if category_count == 0 {
        return Err(QcError::insufficient(
            "chi-square test needs at least one category",
        ));
    }
    if total == 0 {
        return Err(QcError::insufficient(
            "chi-square test needs at least one observation",
        ));
    }

    let expected = total as f64 / category_count as f64;
    let statistic = (0..category_count)
        .map(|category| {
            let observed = counts.get(&category).copied().unwrap_or(0) as f64;
            (observed - expected).powi(2) / expected
        })
        .sum();

    Ok(statistic)
}

/// Goodness-of-fit p-value of `counts` against a uniform distribution
///
/// Degrees of freedom are `category_count - 1`. A p-value near 1 means the
/// tally is indistinguishable from uniform; near 0 means strongly skewed.
///
/// # Example
/// ```
/// use screener::distribution::{chi_square_goodness_of_fit_p_value, CategoryCounts};
///
/// let counts = CategoryCounts::from([(0, 25), (1, 25), (2, 25), (3, 25)]);
/// let p = chi_square_goodness_of_fit_p_value(&counts, 100, 4).unwrap();
/// assert!((p - 1.0).abs() < 1e-9);
/// ```
pub fn chi_square_goodness_of_fit_p_value(
    counts: &CategoryCounts,
    total: u64,
    category_count: usize,
) -> Result<f64> {
    let statistic = chi_square_statistic(counts, total, category_count)?;
    let degrees_of_freedom = u32::try_from(category_count - 1).unwrap_or(u32::MAX);
    let p_value = special::chi_square_upper_tail(statistic, degrees_of_freedom);

    tracing::debug!(
        statistic,
        degrees_of_freedom,
        p_value,
        total,
        "chi-square goodness of fit"
    );

    Ok(p_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binomial_cdf_rejects_bad_sample_size() {
        assert_eq!(
            binomial_cdf(1, 0, 0.5),
            Err(QcError::InvalidSampleSize(0))
        );
        assert_eq!(
            binomial_cdf(1, -4, 0.5),
            Err(QcError::InvalidSampleSize(-4))
        );
    }

    #[test]
    fn test_binomial_cdf_rejects_bad_probability() {
        assert!(matches!(
            binomial_cdf(1, 10, 1.5),
            Err(QcError::InvalidProbability(_))
        ));
        assert!(matches!(
            binomial_cdf(1, 10, -0.1),
            Err(QcError::InvalidProbability(_))
        ));
        assert!(matches!(
            binomial_cdf(1, 10, f64::NAN),
            Err(QcError::InvalidProbability(_))
        ));
    }

    #[test]
    fn test_binomial_cdf_bounds() {
        assert_eq!(binomial_cdf(-1, 20, 0.3).unwrap(), 0.0);
        assert_eq!(binomial_cdf(20, 20, 0.3).unwrap(), 1.0);
        assert_eq!(binomial_cdf(25, 20, 0.3).unwrap(), 1.0);
    }

    #[test]
    fn test_binomial_cdf_reference_values() {
        // Binomial(10, 0.5): P(X <= 5) = 638/1024, P(X <= 2) = 56/1024
        assert!((binomial_cdf(5, 10, 0.5).unwrap() - 0.623_05).abs() < 1e-4);
        assert!((binomial_cdf(2, 10, 0.5).unwrap() - 0.054_69).abs() < 1e-4);
        // Binomial(4, 0.25): P(X <= 0) = 0.75^4
        assert!((binomial_cdf(0, 4, 0.25).unwrap() - 0.316_41).abs() < 1e-4);
    }

    #[test]
    fn test_binomial_cdf_degenerate_probabilities() {
        assert_eq!(binomial_cdf(3, 10, 0.0).unwrap(), 1.0);
        assert_eq!(binomial_cdf(3, 10, 1.0).unwrap(), 0.0);
    }

    #[test]
    fn test_binomial_cdf_is_rounded() {
        let value = binomial_cdf(7, 23, 0.37).unwrap();
        assert_eq!(value, round_to_places(value, 5));
    }

    #[test]
    fn test_chi_square_statistic_uniform_is_zero() {
        let counts = CategoryCounts::from([(0, 10), (1, 10), (2, 10)]);
        assert_eq!(chi_square_statistic(&counts, 30, 3).unwrap(), 0.0);
    }

    #[test]
    fn test_chi_square_statistic_absent_categories_count_as_zero() {
        // expected = 10 per category; observed {20, 0}
        let counts = CategoryCounts::from([(0, 20)]);
        assert_eq!(chi_square_statistic(&counts, 20, 2).unwrap(), 20.0);
    }

    #[test]
    fn test_chi_square_statistic_guards_division_by_zero() {
        let counts = CategoryCounts::new();
        assert!(matches!(
            chi_square_statistic(&counts, 0, 4),
            Err(QcError::InsufficientData { .. })
        ));
        assert!(matches!(
            chi_square_statistic(&counts, 10, 0),
            Err(QcError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_goodness_of_fit_uniform_tally() {
        let counts = CategoryCounts::from([(0, 50), (1, 50)]);
        let p = chi_square_goodness_of_fit_p_value(&counts, 100, 2).unwrap();
        assert_eq!(p, 1.0);
    }

    #[test]
    fn test_goodness_of_fit_skewed_tally() {
        let counts = CategoryCounts::from([(2, 60)]);
        let p = chi_square_goodness_of_fit_p_value(&counts, 60, 4).unwrap();
        assert!(p < 1e-6, "p = {}", p);
    }

    #[test]
    fn test_goodness_of_fit_single_category() {
        // df = 0: no evidence against uniformity is possible
        let counts = CategoryCounts::from([(0, 12)]);
        let p = chi_square_goodness_of_fit_p_value(&counts, 12, 1).unwrap();
        assert_eq!(p, 1.0);
    }
}
