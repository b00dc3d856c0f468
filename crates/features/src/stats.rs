//! Statistical helpers shared by the indicator engines.
//!
//! Moments come from `statrs`; percentiles use linear interpolation between
//! closest ranks so results match the common spreadsheet / numpy convention.

use ordered_float::OrderedFloat;
use statrs::statistics::Statistics;
use tradyx_core::{Error, Result};

/// Log returns `ln(p[i] / p[i-1])` over consecutive pairs where both prices are positive.
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .filter_map(|w| {
            if w[0] > 0.0 && w[1] > 0.0 {
                Some((w[1] / w[0]).ln())
            } else {
                None
            }
        })
        .collect()
}

/// Simple returns `(p[i] - p[i-1]) / p[i-1]` over consecutive pairs with a non-zero base.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .filter_map(|w| {
            if w[0] != 0.0 {
                Some((w[1] - w[0]) / w[0])
            } else {
                None
            }
        })
        .collect()
}

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(Error::degenerate("mean of empty series"));
    }
    Ok(values.iter().mean())
}

/// Population standard deviation (n denominator).
pub fn population_std(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(Error::degenerate("std of empty series"));
    }
    Ok(values.iter().population_std_dev())
}

/// Sample standard deviation (n-1 denominator).
pub fn sample_std(values: &[f64]) -> Result<f64> {
    if values.len() < 2 {
        return Err(Error::degenerate("sample std needs two points"));
    }
    Ok(values.iter().std_dev())
}

/// Annualize a per-session standard deviation and express it in percent.
#[inline]
pub fn annualize_pct(std: f64, trading_days: f64) -> f64 {
    std * trading_days.sqrt() * 100.0
}

/// Percentile `q` in `[0, 1]` with linear interpolation.
pub fn percentile(values: &[f64], q: f64) -> Result<f64> {
    let mut sorted: Vec<OrderedFloat<f64>> = values.iter().copied().map(OrderedFloat).collect();
    sorted.sort();
    percentile_sorted(&sorted, q)
}

/// Several percentiles of one series, sorting once.
pub fn percentiles<const N: usize>(values: &[f64], qs: [f64; N]) -> Result<[f64; N]> {
    let mut sorted: Vec<OrderedFloat<f64>> = values.iter().copied().map(OrderedFloat).collect();
    sorted.sort();
    let mut out = [0.0; N];
    for (slot, q) in out.iter_mut().zip(qs) {
        *slot = percentile_sorted(&sorted, q)?;
    }
    Ok(out)
}

fn percentile_sorted(sorted: &[OrderedFloat<f64>], q: f64) -> Result<f64> {
    if sorted.is_empty() {
        return Err(Error::degenerate("percentile of empty series"));
    }
    if !(0.0..=1.0).contains(&q) {
        return Err(Error::degenerate(format!("percentile {q} outside [0, 1]")));
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Ok(sorted[lo].0 + (sorted[hi].0 - sorted[lo].0) * frac)
}

/// Pearson correlation of two equally long series.
pub fn pearson(x: &[f64], y: &[f64]) -> Result<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return Err(Error::degenerate("correlation needs two aligned points"));
    }
    let sx = x.iter().population_std_dev();
    let sy = y.iter().population_std_dev();
    if sx == 0.0 || sy == 0.0 || !sx.is_finite() || !sy.is_finite() {
        return Err(Error::degenerate("correlation of a constant series"));
    }
    let cov = x.iter().population_covariance(y.iter());
    Ok((cov / (sx * sy)).clamp(-1.0, 1.0))
}

/// Result of an ordinary-least-squares fit of `y = alpha + beta * x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub beta: f64,
    pub alpha: f64,
    pub r_squared: f64,
}

/// Fit `y` on `x` by ordinary least squares.
pub fn linear_fit(x: &[f64], y: &[f64]) -> Result<LinearFit> {
    if x.len() != y.len() || x.len() < 2 {
        return Err(Error::degenerate("regression needs two aligned points"));
    }
    let var_x = x.iter().population_variance();
    if var_x == 0.0 || !var_x.is_finite() {
        return Err(Error::degenerate("regressor has zero variance"));
    }
    let beta = x.iter().population_covariance(y.iter()) / var_x;
    let mean_x = x.iter().mean();
    let mean_y = y.iter().mean();
    let alpha = mean_y - beta * mean_x;

    let ss_res: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (yi - (alpha + beta * xi)).powi(2))
        .sum();
    let ss_tot: f64 = y.iter().map(|yi| (yi - mean_y).powi(2)).sum();
    let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    Ok(LinearFit {
        beta,
        alpha,
        r_squared,
    })
}

/// Exponential moving average seeded with the first value, `alpha = 2 / (span + 1)`.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        let next = match prev {
            Some(p) => alpha * v + (1.0 - alpha) * p,
            None => v,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

/// The trailing `n` elements (or all, if shorter).
#[inline]
pub fn tail<T>(values: &[T], n: usize) -> &[T] {
    &values[values.len().saturating_sub(n)..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_log_returns_skip_non_positive() {
        let r = log_returns(&[100.0, 110.0, 0.0, 121.0]);
        assert_eq!(r.len(), 1);
        assert_abs_diff_eq!(r[0], (1.1f64).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_std_variants() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_abs_diff_eq!(population_std(&v).unwrap(), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sample_std(&v).unwrap(), (32.0f64 / 7.0).sqrt(), epsilon = 1e-12);
        assert!(population_std(&[]).is_err());
        assert!(sample_std(&[1.0]).is_err());
    }

    #[test]
    fn test_percentile_linear() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_abs_diff_eq!(percentile(&v, 0.5).unwrap(), 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(percentile(&v, 0.0).unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(percentile(&v, 1.0).unwrap(), 4.0, epsilon = 1e-12);
        // 0.05 * 3 = 0.15 -> 1 + 0.15
        assert_abs_diff_eq!(percentile(&[4.0, 3.0, 2.0, 1.0], 0.05).unwrap(), 1.15, epsilon = 1e-12);

        let [q25, q75] = percentiles(&v, [0.25, 0.75]).unwrap();
        assert_abs_diff_eq!(q25, 1.75, epsilon = 1e-12);
        assert_abs_diff_eq!(q75, 3.25, epsilon = 1e-12);
    }

    #[test]
    fn test_pearson() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert_abs_diff_eq!(pearson(&x, &[2.0, 4.0, 6.0, 8.0]).unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pearson(&x, &[8.0, 6.0, 4.0, 2.0]).unwrap(), -1.0, epsilon = 1e-12);
        assert!(pearson(&x, &[1.0, 1.0, 1.0, 1.0]).is_err());
    }

    #[test]
    fn test_linear_fit_exact() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y: Vec<f64> = x.iter().map(|v| 0.5 + 1.5 * v).collect();
        let fit = linear_fit(&x, &y).unwrap();
        assert_abs_diff_eq!(fit.beta, 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(fit.alpha, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(fit.r_squared, 1.0, epsilon = 1e-12);
        assert!(linear_fit(&[1.0, 1.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_ema_seeded_with_first_value() {
        let e = ema(&[10.0, 20.0], 3);
        assert_abs_diff_eq!(e[0], 10.0);
        // alpha = 0.5
        assert_abs_diff_eq!(e[1], 15.0);
    }

    #[test]
    fn test_tail() {
        assert_eq!(tail(&[1.0, 2.0, 3.0], 2), &[2.0, 3.0]);
        assert_eq!(tail(&[1.0], 5), &[1.0]);
    }
}
